use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::estimate_item::{EstimateItem, ItemSource, ItemStatus, ItemType};
use super::inspection::InspectionLineItem;
use crate::calculations::ledger::{ItemEdit, can_remove, update_item};

/// VAT applied to new estimates when the company has not configured one.
pub const DEFAULT_VAT_RATE: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateStatus {
    #[default]
    Draft,
    PendingApproval,
    Approved,
    Rejected,
    Invoiced,
}

impl EstimateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Invoiced => "invoiced",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "pending_approval" => Some(Self::PendingApproval),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "invoiced" => Some(Self::Invoiced),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Estimate {
    pub id: i64,
    pub company_id: i64,
    pub lead_id: Option<i64>,
    pub inspection_id: Option<i64>,
    pub customer_id: Option<i64>,
    pub car_id: Option<i64>,
    pub status: EstimateStatus,
    /// Percent.
    pub vat_rate: Decimal,
    /// Header-level discount amount.
    pub discount_amount: Decimal,
}

/// An estimate as loaded from the server: header plus lines in line order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateRecord {
    pub estimate: Estimate,
    pub items: Vec<EstimateItem>,
}

/// The locally-held working copy of an estimate.
///
/// One draft belongs to one editing session. It is only written out through
/// [`EstimateDraft::to_save`]; everything else reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EstimateDraft {
    pub estimate: Estimate,
    pub items: Vec<EstimateItem>,
}

impl From<EstimateRecord> for EstimateDraft {
    fn from(record: EstimateRecord) -> Self {
        Self {
            estimate: record.estimate,
            items: record.items,
        }
    }
}

impl EstimateDraft {
    /// Applies one field edit to the line at `index`.
    ///
    /// Returns `false` when nothing changed: index out of range, the line is
    /// locked, or the edit was a no-op.
    pub fn edit_item(
        &mut self,
        index: usize,
        edit: ItemEdit,
    ) -> bool {
        let Some(current) = self.items.get(index) else {
            warn!(index, "edit for missing estimate line ignored");
            return false;
        };
        let updated = update_item(current, edit);
        if &updated == current {
            return false;
        }
        self.items[index] = updated;
        true
    }

    /// Appends a blank line and returns its index.
    pub fn add_item(&mut self) -> usize {
        let line_no = self.next_line_no();
        self.items.push(EstimateItem::blank(line_no));
        self.items.len() - 1
    }

    /// Removes the line at `index` if it is eligible for removal.
    pub fn remove_item(
        &mut self,
        index: usize,
    ) -> bool {
        match self.items.get(index) {
            Some(item) if can_remove(item) => {
                self.items.remove(index);
                true
            }
            Some(item) => {
                debug!(index, part_name = %item.part_name, "estimate line is not removable");
                false
            }
            None => false,
        }
    }

    pub fn next_line_no(&self) -> u32 {
        self.items.iter().map(|item| item.line_no).max().unwrap_or(0) + 1
    }

    /// Merges procurement flags from inspection line items into the lines
    /// that originated from them. Returns how many lines changed.
    pub fn merge_order_state(
        &mut self,
        line_items: &[InspectionLineItem],
    ) -> usize {
        let mut changed = 0;
        for item in &mut self.items {
            let Some(source_id) = item.inspection_item_id else {
                continue;
            };
            let Some(line) = line_items.iter().find(|line| line.id == source_id) else {
                continue;
            };
            if item.part_ordered != line.part_ordered || item.order_status != line.order_status {
                item.part_ordered = line.part_ordered;
                item.order_status = line.order_status;
                changed += 1;
            }
        }
        changed
    }

    /// Records the row ids a save assigned, so the next save updates those
    /// lines in place instead of inserting them again. `ids` is in
    /// [`to_save`](Self::to_save) order.
    pub fn apply_saved_ids(
        &mut self,
        ids: &[i64],
    ) {
        for (idx, (item, id)) in self.items.iter_mut().zip(ids).enumerate() {
            if item.id.is_none() {
                item.id = Some(*id);
                item.source = if item.inspection_item_id.is_some() {
                    ItemSource::Inspection
                } else {
                    ItemSource::Estimate
                };
            }
            if item.line_no == 0 {
                item.line_no = idx as u32 + 1;
            }
        }
    }

    /// Builds the PATCH payload for the server.
    pub fn to_save(&self) -> EstimateSave {
        EstimateSave {
            status: self.estimate.status,
            vat_rate: self.estimate.vat_rate,
            discount_amount: self.estimate.discount_amount,
            items: self
                .items
                .iter()
                .enumerate()
                .map(|(idx, item)| EstimateItemSave {
                    id: item.id,
                    line_no: if item.line_no == 0 {
                        idx as u32 + 1
                    } else {
                        item.line_no
                    },
                    inspection_item_id: item.inspection_item_id,
                    part_name: item.part_name.clone(),
                    description: item.description.clone(),
                    item_type: item.item_type.clone(),
                    quantity: item.quantity,
                    cost: item.cost,
                    // Approved lines are persisted at the price actually authorized.
                    sale: if item.status == ItemStatus::Approved {
                        item.sale_base()
                    } else {
                        item.sale
                    },
                    approved_sale: item.approved_sale,
                    discount: item.discount,
                    gp_percent: item.gp_percent,
                    status: item.status,
                })
                .collect(),
        }
    }
}

/// Save payload: `{status, vatRate, discountAmount, items[]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateSave {
    pub status: EstimateStatus,
    pub vat_rate: Decimal,
    pub discount_amount: Decimal,
    pub items: Vec<EstimateItemSave>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateItemSave {
    pub id: Option<i64>,
    pub line_no: u32,
    pub inspection_item_id: Option<i64>,
    pub part_name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub quantity: Decimal,
    pub cost: Decimal,
    pub sale: Decimal,
    pub approved_sale: Option<Decimal>,
    pub discount: Decimal,
    pub gp_percent: Option<Decimal>,
    pub status: ItemStatus,
}
