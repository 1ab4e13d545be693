//! Readiness gates deciding whether the next workflow action is allowed.
//!
//! Gates are recomputed from the latest draft on every call and never cached.

pub mod invoice;
pub mod job_card;
pub mod parts;

pub use invoice::{InvoiceReadiness, can_create_invoice};
pub use job_card::{JobCardReadiness, can_start_job_card};
pub use parts::{
    approved_spare_parts, is_parts_ready, is_spare_part, normalize_product_type, resolve_product_type,
};
