//! Service order lifecycle for a vehicle repair workshop.
//!
//! A lead moves through inspection, estimate, parts, job, invoice and
//! delivery. This crate holds the models for each stage, the pure
//! calculations that decide whether the next stage is allowed, the
//! repository boundary, and the workflow actions built on both.

pub mod calculations;
pub mod db;
pub mod models;
pub mod workflow;

pub use db::repository::{RepositoryError, WorkshopRepository};
pub use models::*;
pub use workflow::WorkflowError;
