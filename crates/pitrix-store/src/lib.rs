//! pitrix-store: resource store clients
//!
//! - [`HttpResourceStore`]: talks to the resource API over HTTP
//! - [`MemoryStore`]: in-process store with the same compare-and-swap rules

pub mod error;
pub mod http;
pub mod memory;

pub use error::StoreError;
pub use http::{ApiClient, HttpResourceStore, StoreConfig};
pub use memory::{MemoryStore, StoreCounters};
