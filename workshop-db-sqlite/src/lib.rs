//! SQLite backend for [`workshop_core::WorkshopRepository`].
//!
//! Schema lives in `migrations/`, demo data in `seeds/`.
//! [`SqliteRepository::open_seeded`] opens a database ready for the
//! workshop commands.

pub mod bootstrap;
mod decimal;
pub mod repository;

pub use repository::SqliteRepository;
