use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Issued,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Issued => "issued",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "issued" => Some(Self::Issued),
            "paid" => Some(Self::Paid),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Label shown to operators. A draft invoice is still unpaid.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Draft => "Unpaid",
            Self::Issued => "Issued",
            Self::Paid => "Paid",
            Self::Cancelled => "Cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub lead_id: Option<i64>,
    pub estimate_id: i64,
    pub customer_id: Option<i64>,
    pub status: InvoiceStatus,
    pub invoice_number: String,
    pub grand_total: Decimal,
}

/// Next number in the `INV-<year>-NNNN` sequence given the highest number
/// already issued this year.
pub fn next_invoice_number(
    year: i32,
    last_issued: Option<&str>,
) -> String {
    let prefix = format!("INV-{year}-");
    let last = last_issued
        .and_then(|number| number.strip_prefix(&prefix))
        .and_then(|digits| digits.parse::<u32>().ok())
        .unwrap_or(0);
    format!("{prefix}{:04}", last + 1)
}
