//! Lead phase tracking.
//!
//! A lead's raw stage string is mapped onto one of six ordered phases. A
//! phase before the current one is completed, the current one is in
//! progress, later ones are pending. Unknown stages put every phase in
//! pending.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::{Inspection, LeadStage, Phase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Completed,
    InProgress,
    Pending,
}

impl PhaseStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed => "Completed",
            Self::InProgress => "In Progress",
            Self::Pending => "Pending",
        }
    }
}

/// Phase index of a raw stage, or -1 when the stage is unknown.
pub fn phase_index(stage: &str) -> i32 {
    LeadStage::parse(stage)
        .map(|stage| stage.phase().index() as i32)
        .unwrap_or(-1)
}

pub fn phase_status(
    stage: &str,
    phase_index_to_check: usize,
) -> PhaseStatus {
    let current = phase_index(stage);
    if current < 0 {
        return PhaseStatus::Pending;
    }
    let current = current as usize;
    match current.cmp(&phase_index_to_check) {
        std::cmp::Ordering::Greater => PhaseStatus::Completed,
        std::cmp::Ordering::Equal => PhaseStatus::InProgress,
        std::cmp::Ordering::Less => PhaseStatus::Pending,
    }
}

/// Status of all six phases for one lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadProgress {
    pub statuses: [PhaseStatus; 6],
    /// The raw stage, when it did not match any known stage.
    pub unrecognized_stage: Option<String>,
}

impl LeadProgress {
    /// Derives progress from the raw stage. The inspection phase counts as
    /// completed once the inspection itself has a completion time, whatever
    /// the stage says.
    pub fn derive(
        raw_stage: &str,
        inspection: Option<&Inspection>,
    ) -> Self {
        let unrecognized_stage = match LeadStage::parse(raw_stage) {
            Ok(_) => None,
            Err(err) => {
                warn!(%err, "lead stage not recognized; all phases reported pending");
                Some(raw_stage.to_string())
            }
        };

        let mut statuses = Phase::ALL.map(|phase| phase_status(raw_stage, phase.index()));
        if inspection.is_some_and(Inspection::is_completed) {
            statuses[Phase::Inspection.index()] = PhaseStatus::Completed;
        }

        Self {
            statuses,
            unrecognized_stage,
        }
    }

    pub fn status(
        &self,
        phase: Phase,
    ) -> PhaseStatus {
        self.statuses[phase.index()]
    }

    pub fn current_phase(&self) -> Option<Phase> {
        self.statuses
            .iter()
            .position(|status| *status == PhaseStatus::InProgress)
            .and_then(Phase::from_index)
    }
}
