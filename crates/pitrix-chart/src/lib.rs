//! pitrix-chart: chart archive decoding for the importer
//!
//! Reads gzip-compressed tar archives (`*.tgz`) and extracts the chart
//! metadata from the top-level `<chart>/Chart.yaml`.

pub mod error;
pub mod loader;
pub mod metadata;

pub use error::ChartError;
pub use loader::ChartLoader;
pub use metadata::ChartFile;
