use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::stage::{LeadStage, UnknownStageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadType {
    Rsa,
    Recovery,
    Workshop,
}

impl LeadType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rsa => "rsa",
            Self::Recovery => "recovery",
            Self::Workshop => "workshop",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "rsa" => Some(Self::Rsa),
            "recovery" => Some(Self::Recovery),
            "workshop" => Some(Self::Workshop),
            _ => None,
        }
    }
}

/// One vehicle service intake.
///
/// `lead_stage` is kept exactly as the server reported it; use
/// [`Lead::stage`] to validate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: i64,
    pub company_id: i64,
    pub lead_type: LeadType,
    pub lead_stage: String,
    pub lead_status: String,
    pub customer_id: Option<i64>,
    pub car_id: Option<i64>,
    pub checkin_at: Option<DateTime<Utc>>,
    pub customer_wallet_amount: Decimal,
}

impl Lead {
    pub fn stage(&self) -> Result<LeadStage, UnknownStageError> {
        LeadStage::parse(&self.lead_stage)
    }
}
