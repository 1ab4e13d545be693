//! Starting and completing job cards.

use tracing::info;

use super::error::{Action, Precondition, WorkflowError};
use crate::db::WorkshopRepository;
use crate::models::{JobCard, JobCardAction, JobCardStatus};

pub const REMARKS_REQUIRED: &str = "Remarks are required before completing.";

pub async fn start_job_card<R: WorkshopRepository + ?Sized>(
    repo: &R,
    card: &mut JobCard,
) -> Result<(), WorkflowError> {
    if card.is_completed() {
        return Err(Precondition::JobCardAlreadyCompleted.into());
    }
    if card.is_started() {
        return Err(Precondition::JobCardAlreadyStarted.into());
    }

    let stamps = repo
        .update_job_card(card.id, &JobCardAction::Start)
        .await
        .map_err(|e| WorkflowError::transport(Action::StartJobCard, e))?;

    card.status = JobCardStatus::InProgress;
    card.start_at = stamps.start_at;
    info!(job_card_id = card.id, "job card started");
    Ok(())
}

/// Completes a started job card. `remarks` must be non-blank.
pub async fn complete_job_card<R: WorkshopRepository + ?Sized>(
    repo: &R,
    card: &mut JobCard,
    remarks: &str,
) -> Result<(), WorkflowError> {
    let remarks = remarks.trim();
    if remarks.is_empty() {
        return Err(WorkflowError::validation("remarks", REMARKS_REQUIRED));
    }
    if card.is_completed() {
        return Err(Precondition::JobCardAlreadyCompleted.into());
    }
    if !card.is_started() {
        return Err(Precondition::JobCardNotStarted.into());
    }

    let action = JobCardAction::Complete {
        remarks: remarks.to_string(),
    };
    let stamps = repo
        .update_job_card(card.id, &action)
        .await
        .map_err(|e| WorkflowError::transport(Action::CompleteJobCard, e))?;

    card.status = JobCardStatus::Completed;
    card.complete_at = stamps.complete_at;
    card.remarks = Some(remarks.to_string());
    info!(job_card_id = card.id, "job card completed");
    Ok(())
}
