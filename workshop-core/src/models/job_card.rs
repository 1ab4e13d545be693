use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::estimate_item::OrderStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JobCardStatus {
    #[default]
    #[serde(rename = "not started")]
    NotStarted,
    #[serde(rename = "in progress")]
    InProgress,
    Completed,
}

impl JobCardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not started",
            Self::InProgress => "in progress",
            Self::Completed => "Completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not started" => Some(Self::NotStarted),
            "in progress" => Some(Self::InProgress),
            "Completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// A part to fit, with photographic evidence of the new and the scrapped part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCardLineItem {
    pub id: i64,
    pub part_name: String,
    pub order_status: Option<OrderStatus>,
    pub part_pic: Option<String>,
    pub scrap_pic: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCard {
    pub id: i64,
    pub estimate_id: i64,
    pub lead_id: Option<i64>,
    pub status: JobCardStatus,
    pub start_at: Option<DateTime<Utc>>,
    pub complete_at: Option<DateTime<Utc>>,
    pub remarks: Option<String>,
    pub line_items: Vec<JobCardLineItem>,
}

impl JobCard {
    pub fn is_started(&self) -> bool {
        self.start_at.is_some() || self.status != JobCardStatus::NotStarted
    }

    pub fn is_completed(&self) -> bool {
        self.status == JobCardStatus::Completed
    }

    /// An estimate may have at most one active job card.
    pub fn is_active(&self) -> bool {
        !self.is_completed()
    }
}

/// PATCH body for a job card: `{action: "start" | "complete", remarks}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum JobCardAction {
    Start,
    Complete { remarks: String },
}

/// Timestamps returned by the server after a start/complete action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JobCardTimestamps {
    pub start_at: Option<DateTime<Utc>>,
    pub complete_at: Option<DateTime<Utc>>,
}
