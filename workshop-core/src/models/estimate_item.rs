use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::inspection::InspectionLineItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Pending,
    /// Line sent out for a vendor quote; counted with pending lines.
    Inquiry,
    Approved,
    Rejected,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Inquiry => "inquiry",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "inquiry" => Some(Self::Inquiry),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn is_pending_like(&self) -> bool {
        matches!(self, Self::Pending | Self::Inquiry)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemSource {
    Inspection,
    #[default]
    Estimate,
}

impl ItemSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inspection => "inspection",
            Self::Estimate => "estimate",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "inspection" => Some(Self::Inspection),
            "estimate" => Some(Self::Estimate),
            _ => None,
        }
    }
}

/// Line classification. Anything that is not `repair` is treated as a
/// physical part by the spare-part heuristic, so unknown values are kept
/// verbatim instead of being rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ItemType {
    #[default]
    Genuine,
    Repair,
    Other(String),
}

impl ItemType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Genuine => "genuine",
            Self::Repair => "repair",
            Self::Other(other) => other,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "genuine" => Self::Genuine,
            "repair" => Self::Repair,
            _ => Self::Other(s.to_string()),
        }
    }
}

impl From<String> for ItemType {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<ItemType> for String {
    fn from(value: ItemType) -> Self {
        value.as_str().to_string()
    }
}

/// Procurement state of a part as reported by the parts module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "Order Pending")]
    OrderPending,
    Ordered,
    Received,
    Returned,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrderPending => "Order Pending",
            Self::Ordered => "Ordered",
            Self::Received => "Received",
            Self::Returned => "Returned",
        }
    }

    /// Case-insensitive; blank input means "no status".
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "order pending" | "order_pending" => Some(Self::OrderPending),
            "ordered" => Some(Self::Ordered),
            "received" => Some(Self::Received),
            "returned" => Some(Self::Returned),
            _ => None,
        }
    }

    /// The part has left "pending procurement".
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ordered | Self::Received | Self::Returned)
    }
}

/// One financial line of an estimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateItem {
    /// `None` until the line has been persisted.
    pub id: Option<i64>,
    pub line_no: u32,
    pub inspection_item_id: Option<i64>,
    pub part_name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub product_type: Option<String>,
    pub quantity: Decimal,
    /// Unit cost.
    pub cost: Decimal,
    /// Unit sale price as quoted.
    pub sale: Decimal,
    /// Unit sale price actually authorized. Unset (or zero) means "same as sale".
    pub approved_sale: Option<Decimal>,
    /// Percent, 0 to 100.
    pub discount: Decimal,
    pub gp_percent: Option<Decimal>,
    pub status: ItemStatus,
    pub source: ItemSource,
    pub part_ordered: bool,
    pub order_status: Option<OrderStatus>,
}

impl EstimateItem {
    /// A blank estimate-sourced line, as added by hand.
    pub fn blank(line_no: u32) -> Self {
        Self {
            id: None,
            line_no,
            inspection_item_id: None,
            part_name: String::new(),
            description: None,
            item_type: ItemType::Genuine,
            product_type: None,
            quantity: Decimal::ONE,
            cost: Decimal::ZERO,
            sale: Decimal::ZERO,
            approved_sale: None,
            discount: Decimal::ZERO,
            gp_percent: None,
            status: ItemStatus::Pending,
            source: ItemSource::Estimate,
            part_ordered: false,
            order_status: None,
        }
    }

    /// A pending line seeded from an inspection finding.
    pub fn from_inspection_line(
        line_no: u32,
        line: &InspectionLineItem,
    ) -> Self {
        Self {
            inspection_item_id: Some(line.id),
            part_name: line.product_name.clone(),
            quantity: line.quantity,
            source: ItemSource::Inspection,
            part_ordered: line.part_ordered,
            order_status: line.order_status,
            ..Self::blank(line_no)
        }
    }

    /// Ordered and approved lines are frozen.
    pub fn is_locked(&self) -> bool {
        self.part_ordered && self.status == ItemStatus::Approved
    }

    /// Only hand-added lines that were never ordered may be removed.
    pub fn is_removable(&self) -> bool {
        self.source != ItemSource::Inspection
            && self.inspection_item_id.is_none()
            && !self.part_ordered
    }

    /// Unit price used for totals: the approved sale when positive, else the
    /// quoted sale.
    pub fn sale_base(&self) -> Decimal {
        match self.approved_sale {
            Some(approved) if approved > Decimal::ZERO => approved,
            _ => self.sale,
        }
    }

    /// Part has been ordered or reached a terminal order status.
    pub fn is_procured(&self) -> bool {
        self.part_ordered || self.order_status.is_some_and(|s| s.is_terminal())
    }
}
