//! Whether an invoice may be created for a lead.

use serde::{Deserialize, Serialize};

use crate::workflow::Precondition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InvoiceReadiness {
    /// Inspection phase completed.
    pub inspection_ready: bool,
    /// Job card completed.
    pub job_ready: bool,
    /// No approved spare part is still pending procurement.
    pub parts_ready: bool,
    /// An estimate exists.
    pub estimate_ready: bool,
}

impl InvoiceReadiness {
    pub fn can_create(&self) -> bool {
        can_create_invoice(
            self.inspection_ready,
            self.job_ready,
            self.parts_ready,
            self.estimate_ready,
        )
    }

    /// First unmet precondition, checked estimate, inspection, job, parts.
    pub fn blocker(&self) -> Option<Precondition> {
        if !self.estimate_ready {
            Some(Precondition::EstimateMissing)
        } else if !self.inspection_ready {
            Some(Precondition::InspectionPending)
        } else if !self.job_ready {
            Some(Precondition::JobPending)
        } else if !self.parts_ready {
            Some(Precondition::SparePartsPending)
        } else {
            None
        }
    }
}

pub fn can_create_invoice(
    inspection_ready: bool,
    job_ready: bool,
    parts_ready: bool,
    estimate_ready: bool,
) -> bool {
    inspection_ready && job_ready && parts_ready && estimate_ready
}
