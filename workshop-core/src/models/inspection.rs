use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::estimate_item::OrderStatus;

/// Inspection record owned by the external inspection module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inspection {
    pub id: i64,
    pub lead_id: i64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Inspection {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// A finding recorded during inspection. Source of estimate lines and of the
/// procurement flags (`part_ordered`, `order_status`) merged into them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionLineItem {
    pub id: i64,
    pub inspection_id: i64,
    pub product_name: String,
    pub quantity: Decimal,
    pub part_ordered: bool,
    pub order_status: Option<OrderStatus>,
}
