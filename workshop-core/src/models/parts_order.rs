use serde::{Deserialize, Serialize};

/// Procurement-side summary of the spare parts drawn from a lead's
/// inspection and estimate lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartsOrderLine {
    pub lead_id: i64,
    /// Set when the summary is for a single inspection line.
    pub inspection_item_id: Option<i64>,
    pub ordered_count: u32,
    pub received_count: u32,
    /// Approved spare parts that have not left "pending procurement".
    pub approved_spare_pending_count: u32,
}

impl PartsOrderLine {
    pub fn is_ready(&self) -> bool {
        self.approved_spare_pending_count == 0
    }
}
