pub mod repository;

#[cfg(test)]
pub(crate) mod memory;

pub use repository::{RepositoryError, WorkshopRepository};
