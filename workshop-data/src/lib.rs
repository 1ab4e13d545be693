//! Bulk import of reference data into a workshop repository.

pub mod loader;

pub use loader::{LoadSummary, ProductCatalogLoader, ProductCatalogLoaderError, ProductRecord};
