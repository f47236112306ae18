//! Core types and traits for the Pitrix application import system
//!
//! This crate provides the records the importer reconciles and the seams
//! behind which every external system sits.
//!
//! # Architecture
//!
//! - **Records**: `CategoryRecord`, `ApplicationRecord`, `VersionRecord` as stored
//!   in the declarative resource store
//! - **Bundle**: `BundleDescriptor`, the decoded metadata of a chart archive
//! - **Traits**: `ResourceStore`, `ContentStore`, `BundleDecoder`, `IdGenerator`
//! - **Errors**: `ImportError`, shared by every crate in the workspace
//!
//! # Usage
//!
//! Store and decoder implementations (e.g., `pitrix-store`, `pitrix-chart`) depend
//! on this crate and implement its traits; `pitrix-import` drives them.

pub mod bundle;
pub mod constants;
pub mod error;
pub mod ids;
pub mod records;
pub mod store;

pub use bundle::{BundleDecoder, BundleDescriptor, Maintainer};
pub use error::{ImportError, ImportResult};
pub use ids::{IdGenerator, UuidIdGenerator};
pub use records::{
    ApplicationRecord, ApplicationSpec, Audit, CategoryRecord, CategorySpec, ChartMetadata,
    ObjectMeta, OwnerReference, Resource, VersionRecord, VersionSpec, VersionState,
    VersionStatus,
};
pub use store::{ContentStore, LabelSelector, ResourceStore};
