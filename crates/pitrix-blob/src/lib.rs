//! pitrix-blob: content store for imported bundle payloads
//!
//! `S3ContentStore` writes payloads to any S3-compatible object store
//! (MinIO included). `MemoryContentStore` keeps them in process for tests
//! and dry runs.

pub mod error;
pub mod memory;
pub mod s3;

pub use error::BlobError;
pub use memory::{MemoryContentStore, StoredObject};
pub use s3::{S3Config, S3ContentStore};
