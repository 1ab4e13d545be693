//! Boundary actions driven by the pure calculations.
//!
//! Every action checks its gate first, then calls the repository once and
//! maps failures onto [`WorkflowError`]. Nothing here retries.

pub mod error;
pub mod estimate_session;
pub mod invoicing;
pub mod job_cards;

pub use error::{Action, Precondition, WorkflowError};
pub use estimate_session::{EstimateSession, JobCardOutcome};
pub use invoicing::{LeadOverview, PaymentOutcome, create_invoice, pay_invoice, top_up_wallet};
pub use job_cards::{complete_job_card, start_job_card};
