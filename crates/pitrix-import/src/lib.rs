//! Pitrix application import
//!
//! Reconciles a directory of packaged application bundles into the resource
//! store: one application record per distinct application, one version
//! record per distinct version, one payload per version in the content
//! store, however often the import runs.
//!
//! # Architecture
//!
//! - **Workflow**: category, application and version resolution
//! - **Retry**: retry-on-conflict for compare-and-swap writes
//! - **Config**: the `import-config.yaml` overlay
//! - **Runner**: per-bundle isolation over a directory
//!
//! # Usage
//!
//! The `pitrix-jobs import` command builds the stores, loads the config and
//! hands an [`ImportWorkflow`] to an [`ImportRunner`].

pub mod config;
pub mod retry;
pub mod runner;
pub mod workflow;

pub use config::ImportConfig;
pub use retry::{with_retry, RetryBudget};
pub use runner::{BundleFailure, ImportRunner, ImportStage, ImportSummary};
pub use workflow::{payload_object_key, ImportStores, ImportWorkflow};
