//! Whether a job card may be created and started for an estimate.
//!
//! With approved spare parts, labour waits until every one of them has been
//! procured. Without any, a single approved line is enough.

use serde::{Deserialize, Serialize};

use super::parts::{approved_spare_parts, is_parts_ready};
use crate::models::{EstimateItem, ItemStatus, ProductCatalog};
use crate::workflow::Precondition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JobCardReadiness {
    pub has_any_items: bool,
    pub has_approved_items: bool,
    pub has_approved_spare_parts: bool,
    pub parts_ready: bool,
}

impl JobCardReadiness {
    pub fn evaluate(
        items: &[EstimateItem],
        catalog: &ProductCatalog,
    ) -> Self {
        Self {
            has_any_items: !items.is_empty(),
            has_approved_items: items.iter().any(|item| item.status == ItemStatus::Approved),
            has_approved_spare_parts: approved_spare_parts(items, catalog).next().is_some(),
            parts_ready: is_parts_ready(items, catalog),
        }
    }

    pub fn can_start(&self) -> bool {
        if !self.has_any_items {
            return false;
        }
        if self.has_approved_spare_parts {
            self.parts_ready
        } else {
            self.has_approved_items
        }
    }

    /// The unmet precondition, if any.
    pub fn blocker(&self) -> Option<Precondition> {
        if self.can_start() {
            None
        } else if self.has_approved_spare_parts {
            Some(Precondition::SparePartsNotOrdered)
        } else {
            Some(Precondition::NoApprovedItems)
        }
    }
}

pub fn can_start_job_card(
    items: &[EstimateItem],
    catalog: &ProductCatalog,
) -> bool {
    JobCardReadiness::evaluate(items, catalog).can_start()
}
