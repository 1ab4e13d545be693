//! Command dispatch: each command runs one workflow action and renders the
//! result as text.

use tracing::{debug, info};
use workshop_core::calculations::ItemEdit;
use workshop_core::workflow::{
    self, Action, EstimateSession, JobCardOutcome, LeadOverview, PaymentOutcome,
};
use workshop_core::{RepositoryError, WalletTopUp, WorkflowError, WorkshopRepository};
use workshop_db_sqlite::SqliteRepository;

use crate::cli::{Command, EstimateLineArgs, InvoiceCommand, JobCardCommand, WalletCommand};
use crate::config::DbConfig;
use crate::report;

/// Backends this binary can open.
pub const BACKENDS: &[&str] = &["sqlite"];

/// Opens the backend named in `config`, migrated and seeded.
///
/// # Errors
/// * [`RepositoryError::Configuration`] for a backend not in [`BACKENDS`].
/// * Whatever the backend returns while connecting or migrating.
pub async fn open_repository(
    config: &DbConfig,
) -> Result<Box<dyn WorkshopRepository>, RepositoryError> {
    match config.backend.as_str() {
        "sqlite" => {
            let repo = SqliteRepository::open_seeded(&config.connection_string).await?;
            Ok(Box::new(repo))
        }
        other => Err(RepositoryError::Configuration(format!(
            "unknown backend '{other}'; available: {}",
            BACKENDS.join(", ")
        ))),
    }
}

/// Runs `command` and returns what to print.
pub async fn run(
    repo: &dyn WorkshopRepository,
    command: Command,
) -> Result<String, WorkflowError> {
    debug!(?command, "running command");
    match command {
        Command::Lead { lead_id } => show_lead(repo, lead_id).await,
        Command::Estimate { estimate_id } => show_estimate(repo, estimate_id).await,
        Command::EstimateLine(args) => edit_estimate_line(repo, args).await,
        Command::Approve { estimate_id } => approve_estimate(repo, estimate_id).await,
        Command::OrderParts { estimate_id } => order_parts(repo, estimate_id).await,
        Command::JobCard(JobCardCommand::Start { job_card_id }) => {
            start_job(repo, job_card_id).await
        }
        Command::JobCard(JobCardCommand::Complete {
            job_card_id,
            remarks,
        }) => complete_job(repo, job_card_id, &remarks).await,
        Command::Invoice(InvoiceCommand::Create { lead_id }) => {
            create_invoice(repo, lead_id).await
        }
        Command::Invoice(InvoiceCommand::Pay { invoice_id }) => {
            pay_invoice(repo, invoice_id).await
        }
        Command::Wallet(WalletCommand::Balance { customer_id }) => {
            wallet_balance(repo, customer_id).await
        }
        Command::Wallet(WalletCommand::TopUp {
            customer_id,
            amount,
            method,
            date,
            proof_file_id,
        }) => {
            let top_up = WalletTopUp {
                amount,
                method,
                date,
                proof_file_id,
            };
            top_up_wallet(repo, customer_id, &top_up).await
        }
    }
}

// ─── lead & estimate ─────────────────────────────────────────────────────────

pub async fn show_lead(
    repo: &dyn WorkshopRepository,
    lead_id: i64,
) -> Result<String, WorkflowError> {
    let overview = LeadOverview::load(repo, lead_id).await?;
    Ok(report::lead_overview(&overview))
}

pub async fn show_estimate(
    repo: &dyn WorkshopRepository,
    estimate_id: i64,
) -> Result<String, WorkflowError> {
    let session = EstimateSession::load(repo, estimate_id).await?;
    Ok(report::estimate(&session))
}

/// Applies the given edits to one line, in a fixed order, then saves.
/// Edits the ledger refuses, such as price changes on an ordered line, are
/// counted in the output. Nothing is saved when every edit was refused.
pub async fn edit_estimate_line(
    repo: &dyn WorkshopRepository,
    args: EstimateLineArgs,
) -> Result<String, WorkflowError> {
    let mut session = EstimateSession::load(repo, args.estimate_id).await?;
    let index = args
        .line
        .checked_sub(1)
        .filter(|index| *index < session.draft().items.len())
        .ok_or_else(|| WorkflowError::validation("line", "No such estimate line."))?;

    let edits: Vec<ItemEdit> = [
        args.quantity.map(ItemEdit::Quantity),
        args.item_type.map(ItemEdit::ItemType),
        args.cost.map(ItemEdit::Cost),
        args.sale.map(ItemEdit::Sale),
        args.discount.map(ItemEdit::Discount),
        args.status.map(ItemEdit::Status),
    ]
    .into_iter()
    .flatten()
    .collect();
    if edits.is_empty() {
        return Err(WorkflowError::validation("line", "Nothing to change."));
    }

    let requested = edits.len();
    let mut applied = 0;
    for edit in edits {
        if session.edit_item(index, edit) {
            applied += 1;
        }
    }
    if applied == 0 {
        return Ok(format!("Line {} was not changed.", args.line));
    }

    session.save(repo).await?;
    let mut out = report::estimate(&session);
    if applied < requested {
        out.push_str(&format!(
            "\n{} of {requested} edits to line {} were ignored.",
            requested - applied,
            args.line
        ));
    }
    Ok(out)
}

pub async fn approve_estimate(
    repo: &dyn WorkshopRepository,
    estimate_id: i64,
) -> Result<String, WorkflowError> {
    let mut session = EstimateSession::load(repo, estimate_id).await?;
    let outcome = session.approve(repo).await?;
    Ok(match &outcome {
        JobCardOutcome::Created(card) => {
            format!("{}\n{}", outcome.message(), report::job_card(card))
        }
        JobCardOutcome::AlreadyActive => outcome.message().to_string(),
    })
}

pub async fn order_parts(
    repo: &dyn WorkshopRepository,
    estimate_id: i64,
) -> Result<String, WorkflowError> {
    let mut session = EstimateSession::load(repo, estimate_id).await?;
    let updated = session.order_approved_parts(repo).await?;
    Ok(match updated {
        0 => "No new parts to order.".to_string(),
        1 => "Ordered 1 inspection line.".to_string(),
        n => format!("Ordered {n} inspection lines."),
    })
}

// ─── job cards ───────────────────────────────────────────────────────────────

pub async fn start_job(
    repo: &dyn WorkshopRepository,
    job_card_id: i64,
) -> Result<String, WorkflowError> {
    let mut card = repo
        .get_job_card(job_card_id)
        .await
        .map_err(|e| WorkflowError::transport(Action::StartJobCard, e))?;
    workflow::start_job_card(repo, &mut card).await?;
    Ok(report::job_card(&card))
}

pub async fn complete_job(
    repo: &dyn WorkshopRepository,
    job_card_id: i64,
    remarks: &str,
) -> Result<String, WorkflowError> {
    let mut card = repo
        .get_job_card(job_card_id)
        .await
        .map_err(|e| WorkflowError::transport(Action::CompleteJobCard, e))?;
    workflow::complete_job_card(repo, &mut card, remarks).await?;
    Ok(report::job_card(&card))
}

// ─── invoices & wallet ───────────────────────────────────────────────────────

pub async fn create_invoice(
    repo: &dyn WorkshopRepository,
    lead_id: i64,
) -> Result<String, WorkflowError> {
    let overview = LeadOverview::load(repo, lead_id).await?;
    let invoice = workflow::create_invoice(repo, &overview).await?;
    Ok(report::invoice(&invoice))
}

pub async fn pay_invoice(
    repo: &dyn WorkshopRepository,
    invoice_id: i64,
) -> Result<String, WorkflowError> {
    let mut invoice = repo
        .get_invoice(invoice_id)
        .await
        .map_err(|e| WorkflowError::transport(Action::PayInvoice, e))?;
    let outcome = workflow::pay_invoice(repo, &mut invoice).await?;
    info!(invoice_id, ?outcome, "payment attempted");
    Ok(match outcome {
        PaymentOutcome::Paid => format!("{}\n{}", outcome.message(), report::invoice(&invoice)),
        PaymentOutcome::TopUpRequired {
            customer_id,
            shortfall,
        } => format!(
            "{}\nCustomer {customer_id} needs {} more.",
            outcome.message(),
            report::money(shortfall)
        ),
    })
}

pub async fn wallet_balance(
    repo: &dyn WorkshopRepository,
    customer_id: i64,
) -> Result<String, WorkflowError> {
    let wallet = repo
        .get_wallet(customer_id)
        .await
        .map_err(|e| WorkflowError::transport(Action::LoadWallet, e))?;
    Ok(report::wallet(&wallet))
}

pub async fn top_up_wallet(
    repo: &dyn WorkshopRepository,
    customer_id: i64,
    top_up: &WalletTopUp,
) -> Result<String, WorkflowError> {
    let wallet = workflow::top_up_wallet(repo, Some(customer_id), top_up).await?;
    Ok(report::wallet(&wallet))
}
