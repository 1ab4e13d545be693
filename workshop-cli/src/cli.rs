use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use workshop_core::{ItemStatus, ItemType, PaymentMethod};

use crate::config::Overrides;

// ─── top level ───────────────────────────────────────────────────────────────

/// Service order lifecycle for a vehicle repair workshop.
///
/// Reads settings from `workshop.toml` when present; flags given here win.
#[derive(Debug, Parser)]
#[command(name = "workshop", version)]
pub struct Cli {
    /// Config file to read instead of `workshop.toml`.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database backend to use.
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Database connection string.
    /// For SQLite this is a file path (e.g. `workshop.db`) or `:memory:`.
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Log level or filter directive; `RUST_LOG` takes priority.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            backend: self.backend.clone(),
            connection_string: self.db.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Show a lead's phases, invoice readiness and wallet.
    Lead { lead_id: i64 },

    /// Show an estimate's lines and totals.
    Estimate { estimate_id: i64 },

    /// Edit one estimate line and save the estimate.
    EstimateLine(EstimateLineArgs),

    /// Approve an estimate, order its approved parts and open a job card.
    Approve { estimate_id: i64 },

    /// Order the approved parts of an estimate.
    OrderParts { estimate_id: i64 },

    #[command(subcommand)]
    JobCard(JobCardCommand),

    #[command(subcommand)]
    Invoice(InvoiceCommand),

    #[command(subcommand)]
    Wallet(WalletCommand),
}

// ─── subcommands ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Args)]
pub struct EstimateLineArgs {
    pub estimate_id: i64,

    /// 1-based position of the line in the estimate.
    pub line: usize,

    #[arg(long)]
    pub quantity: Option<Decimal>,

    /// `genuine`, `repair` or any other label.
    #[arg(long = "type", value_parser = parse_item_type)]
    pub item_type: Option<ItemType>,

    /// Unit cost.
    #[arg(long)]
    pub cost: Option<Decimal>,

    /// Unit sale price.
    #[arg(long)]
    pub sale: Option<Decimal>,

    /// Discount percent.
    #[arg(long)]
    pub discount: Option<Decimal>,

    /// `pending`, `inquiry`, `approved` or `rejected`.
    #[arg(long, value_parser = parse_item_status)]
    pub status: Option<ItemStatus>,
}

/// Job card transitions.
#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum JobCardCommand {
    Start {
        job_card_id: i64,
    },
    Complete {
        job_card_id: i64,

        #[arg(long, default_value = "")]
        remarks: String,
    },
}

/// Invoice creation and payment.
#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum InvoiceCommand {
    Create {
        #[arg(long = "lead")]
        lead_id: i64,
    },
    /// Pay from the customer's wallet.
    Pay { invoice_id: i64 },
}

/// Customer wallet.
#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum WalletCommand {
    Balance {
        customer_id: i64,
    },
    TopUp {
        customer_id: i64,

        #[arg(long)]
        amount: Decimal,

        /// `cash`, `card` or `bank_transfer`.
        #[arg(long, value_parser = parse_payment_method)]
        method: PaymentMethod,

        /// Transaction date, `YYYY-MM-DD`.
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Identifier of an uploaded proof of payment.
        #[arg(long = "proof")]
        proof_file_id: Option<String>,
    },
}

fn parse_payment_method(s: &str) -> Result<PaymentMethod, String> {
    PaymentMethod::parse(s).ok_or_else(|| format!("unknown payment method '{s}'"))
}

fn parse_item_status(s: &str) -> Result<ItemStatus, String> {
    ItemStatus::parse(&s.trim().to_lowercase()).ok_or_else(|| format!("unknown item status '{s}'"))
}

fn parse_item_type(s: &str) -> Result<ItemType, String> {
    if s.trim().is_empty() {
        return Err("item type is empty".to_string());
    }
    Ok(ItemType::parse(s))
}
