//! Pure calculations over the workshop models.
//!
//! Nothing in here performs I/O or returns errors. Invalid input degrades to
//! an unchanged value or a `false` gate.

pub mod common;
pub mod gates;
pub mod ledger;
pub mod phases;
pub mod totals;
pub mod wallet;

pub use gates::{
    InvoiceReadiness, JobCardReadiness, can_create_invoice, can_start_job_card, is_parts_ready,
    is_spare_part,
};
pub use ledger::{ItemEdit, can_remove, update_item};
pub use phases::{LeadProgress, PhaseStatus, phase_index, phase_status};
pub use totals::{Bucket, EstimateTotals, compute_totals};
pub use wallet::{PaymentDecision, can_pay_from_wallet, decide_payment};
