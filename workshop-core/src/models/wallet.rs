use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Prepaid balance a customer holds with one company. Shared by every open
/// lead of that customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerWallet {
    pub customer_id: i64,
    pub company_id: i64,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    BankTransfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Card => "card",
            Self::BankTransfer => "bank_transfer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Some(Self::Cash),
            "card" => Some(Self::Card),
            "bank_transfer" | "bank transfer" | "bank" => Some(Self::BankTransfer),
            _ => None,
        }
    }
}

/// A deposit into a customer's wallet: `{amount, method, date, proofFileId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletTopUp {
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub date: Option<NaiveDate>,
    pub proof_file_id: Option<String>,
}
