use thiserror::Error;

use crate::db::RepositoryError;

/// A gate or state check that refused an action. The message is shown to the
/// operator as is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Precondition {
    #[error("Estimate must be created before invoicing.")]
    EstimateMissing,

    #[error("Inspection is still pending.")]
    InspectionPending,

    #[error("Job is still pending.")]
    JobPending,

    #[error("Spare parts are still pending.")]
    SparePartsPending,

    #[error("No approved items to start a job card.")]
    NoApprovedItems,

    #[error("Spare parts must be ordered before starting the job card.")]
    SparePartsNotOrdered,

    #[error("Inspection not found for this estimate.")]
    InspectionMissing,

    #[error("Job card has already been started.")]
    JobCardAlreadyStarted,

    #[error("Job card must be started before completing.")]
    JobCardNotStarted,

    #[error("Job card is already completed.")]
    JobCardAlreadyCompleted,

    #[error("Invoice is already paid.")]
    InvoiceAlreadyPaid,

    #[error("Customer is required for topup.")]
    CustomerMissing,
}

/// Boundary action, named for the generic failure message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    LoadLead,
    LoadEstimate,
    SaveEstimate,
    OrderApprovedParts,
    CreateJobCard,
    StartJobCard,
    CompleteJobCard,
    CreateInvoice,
    PayInvoice,
    TopUpWallet,
    LoadWallet,
}

impl Action {
    pub fn failure_message(&self) -> &'static str {
        match self {
            Self::LoadLead => "Failed to load lead.",
            Self::LoadEstimate => "Failed to load estimate.",
            Self::SaveEstimate => "Failed to save estimate.",
            Self::OrderApprovedParts => "Failed to order approved parts.",
            Self::CreateJobCard => "Failed to create job card.",
            Self::StartJobCard => "Failed to start job card.",
            Self::CompleteJobCard => "Failed to complete job card.",
            Self::CreateInvoice => "Failed to create invoice.",
            Self::PayInvoice => "Failed to record payment.",
            Self::TopUpWallet => "Failed to create wallet topup.",
            Self::LoadWallet => "Failed to load wallet.",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.write_str(self.failure_message())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// Rejected before any boundary call.
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: &'static str,
    },

    #[error(transparent)]
    Precondition(#[from] Precondition),

    /// A boundary call failed. Only the action's generic message is shown;
    /// `source` is logged.
    #[error("{action}")]
    Transport {
        action: Action,
        #[source]
        source: RepositoryError,
    },
}

impl WorkflowError {
    /// Logs the underlying error and wraps it for `action`.
    pub fn transport(
        action: Action,
        source: RepositoryError,
    ) -> Self {
        tracing::error!(error = %source, "{}", action.failure_message());
        Self::Transport { action, source }
    }

    pub fn validation(
        field: &'static str,
        message: &'static str,
    ) -> Self {
        Self::Validation { field, message }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn transport_error_shows_generic_message() {
        let err = WorkflowError::transport(
            Action::SaveEstimate,
            RepositoryError::Database("disk full".to_string()),
        );

        assert_eq!(err.to_string(), "Failed to save estimate.");
    }

    #[test]
    fn precondition_error_shows_its_message() {
        let err = WorkflowError::from(Precondition::JobPending);

        assert_eq!(err.to_string(), "Job is still pending.");
    }

    #[test]
    fn validation_error_shows_its_message() {
        let err = WorkflowError::validation("remarks", "Remarks are required before completing.");

        assert_eq!(err.to_string(), "Remarks are required before completing.");
    }
}
