use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A lead stage string that does not belong to any known phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown lead stage '{0}'")]
pub struct UnknownStageError(pub String);

/// The six canonical workflow phases, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Inspection,
    Estimate,
    Parts,
    Job,
    Invoice,
    Delivery,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::Inspection,
        Phase::Estimate,
        Phase::Parts,
        Phase::Job,
        Phase::Invoice,
        Phase::Delivery,
    ];

    /// Zero-based position of this phase in the progress bar.
    pub fn index(&self) -> usize {
        match self {
            Self::Inspection => 0,
            Self::Estimate => 1,
            Self::Parts => 2,
            Self::Job => 3,
            Self::Invoice => 4,
            Self::Delivery => 5,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inspection => "inspection",
            Self::Estimate => "estimate",
            Self::Parts => "parts",
            Self::Job => "job",
            Self::Invoice => "invoice",
            Self::Delivery => "delivery",
        }
    }

    /// Every stage that counts as "inside" this phase.
    pub fn stages(&self) -> &'static [LeadStage] {
        use LeadStage::*;
        match self {
            Self::Inspection => &[
                Checkin,
                InspectionQueue,
                InspectionStarted,
                InspectionCompleted,
                Inspection,
            ],
            Self::Estimate => &[
                EstimatePending,
                EstimateApproved,
                RfqPending,
                EstimateApprovalPending,
            ],
            Self::Parts => &[PartsPending],
            Self::Job => &[
                AssignedForWork,
                WorkorderQueue,
                WorkStarted,
                WorkCompleted,
                QcQueue,
                QcStarted,
                QcCompleted,
            ],
            Self::Invoice => &[InvoiceIssued],
            Self::Delivery => &[HandoverPending, Completed, Closed],
        }
    }
}

/// Closed set of lead stages the server can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStage {
    Checkin,
    InspectionQueue,
    InspectionStarted,
    InspectionCompleted,
    Inspection,
    EstimatePending,
    EstimateApproved,
    RfqPending,
    EstimateApprovalPending,
    PartsPending,
    AssignedForWork,
    WorkorderQueue,
    WorkStarted,
    WorkCompleted,
    QcQueue,
    QcStarted,
    QcCompleted,
    InvoiceIssued,
    HandoverPending,
    Completed,
    Closed,
}

impl LeadStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Checkin => "checkin",
            Self::InspectionQueue => "inspection_queue",
            Self::InspectionStarted => "inspection_started",
            Self::InspectionCompleted => "inspection_completed",
            Self::Inspection => "inspection",
            Self::EstimatePending => "estimate_pending",
            Self::EstimateApproved => "estimate_approved",
            Self::RfqPending => "rfq_pending",
            Self::EstimateApprovalPending => "estimate_approval_pending",
            Self::PartsPending => "parts_pending",
            Self::AssignedForWork => "assigned_for_work",
            Self::WorkorderQueue => "workorder_queue",
            Self::WorkStarted => "work_started",
            Self::WorkCompleted => "work_completed",
            Self::QcQueue => "qc_queue",
            Self::QcStarted => "qc_started",
            Self::QcCompleted => "qc_completed",
            Self::InvoiceIssued => "invoice_issued",
            Self::HandoverPending => "handover_pending",
            Self::Completed => "completed",
            Self::Closed => "closed",
        }
    }

    /// Parses a raw stage string. Matching is exact; the server sends
    /// lower-case snake_case values.
    pub fn parse(s: &str) -> Result<Self, UnknownStageError> {
        Phase::ALL
            .iter()
            .flat_map(|phase| phase.stages().iter())
            .find(|stage| stage.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownStageError(s.to_string()))
    }

    /// Every stage in workflow order.
    pub fn all() -> impl Iterator<Item = LeadStage> {
        Phase::ALL
            .into_iter()
            .flat_map(|phase| phase.stages().iter().copied())
    }

    /// Stages that come before this one in workflow order.
    pub fn predecessors(&self) -> Vec<LeadStage> {
        Self::all().take_while(|stage| stage != self).collect()
    }

    pub fn phase(&self) -> Phase {
        Phase::ALL
            .into_iter()
            .find(|phase| phase.stages().contains(self))
            .unwrap_or(Phase::Inspection)
    }
}

impl std::fmt::Display for LeadStage {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn every_stage_round_trips_through_parse() {
        for phase in Phase::ALL {
            for stage in phase.stages() {
                assert_eq!(LeadStage::parse(stage.as_str()), Ok(*stage));
                assert_eq!(stage.phase(), phase);
            }
        }
    }

    #[test]
    fn parse_rejects_unknown_stage() {
        assert_eq!(
            LeadStage::parse("awaiting_tow"),
            Err(UnknownStageError("awaiting_tow".to_string()))
        );
    }

    #[test]
    fn parse_is_case_sensitive() {
        assert!(LeadStage::parse("Work_Started").is_err());
    }

    #[test]
    fn predecessors_span_earlier_phases() {
        let before = LeadStage::PartsPending.predecessors();

        assert_eq!(before.len(), 9);
        assert!(before.contains(&LeadStage::Checkin));
        assert!(before.contains(&LeadStage::EstimateApproved));
        assert!(!before.contains(&LeadStage::AssignedForWork));
        assert!(LeadStage::Checkin.predecessors().is_empty());
    }

    #[test]
    fn phase_indices_follow_declaration_order() {
        let indices: Vec<usize> = Phase::ALL.iter().map(Phase::index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(Phase::from_index(3), Some(Phase::Job));
        assert_eq!(Phase::from_index(6), None);
    }
}
