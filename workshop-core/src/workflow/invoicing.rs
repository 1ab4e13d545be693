//! Lead overview, invoice creation and wallet payment.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::{Action, Precondition, WorkflowError};
use crate::calculations::wallet::is_valid_top_up_amount;
use crate::calculations::{
    InvoiceReadiness, LeadProgress, PaymentDecision, PhaseStatus, decide_payment,
};
use crate::db::{RepositoryError, WorkshopRepository};
use crate::models::{
    CustomerWallet, Estimate, Inspection, Invoice, InvoiceStatus, JobCard, Lead, PartsOrderLine,
    Phase, WalletTopUp,
};

pub const INVALID_AMOUNT: &str = "Enter a valid amount.";

/// Everything known about one lead, with derived progress and invoice
/// readiness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadOverview {
    pub lead: Lead,
    pub inspection: Option<Inspection>,
    pub estimate: Option<Estimate>,
    pub job_card: Option<JobCard>,
    pub parts_status: Option<PartsOrderLine>,
    pub invoice: Option<Invoice>,
    pub wallet: Option<CustomerWallet>,
    pub progress: LeadProgress,
    pub invoice_readiness: InvoiceReadiness,
}

impl LeadOverview {
    pub async fn load<R: WorkshopRepository + ?Sized>(
        repo: &R,
        lead_id: i64,
    ) -> Result<Self, WorkflowError> {
        let load_err = |e| WorkflowError::transport(Action::LoadLead, e);

        let lead = repo.get_lead(lead_id).await.map_err(load_err)?;
        let inspection = repo.get_inspection_for_lead(lead_id).await.map_err(load_err)?;
        let estimate = repo.find_estimate_for_lead(lead_id).await.map_err(load_err)?;
        let job_card = match &estimate {
            Some(estimate) => repo
                .find_job_card_for_estimate(estimate.id)
                .await
                .map_err(load_err)?,
            None => None,
        };
        let parts_status = repo.get_parts_status(lead_id).await.map_err(load_err)?;
        let invoice = repo.find_invoice_for_lead(lead_id).await.map_err(load_err)?;
        let wallet = match lead.customer_id {
            Some(customer_id) => match repo.get_wallet(customer_id).await {
                Ok(wallet) => Some(wallet),
                Err(RepositoryError::NotFound) => None,
                Err(e) => return Err(WorkflowError::transport(Action::LoadWallet, e)),
            },
            None => None,
        };

        let progress = LeadProgress::derive(&lead.lead_stage, inspection.as_ref());
        let invoice_readiness = InvoiceReadiness {
            inspection_ready: progress.status(Phase::Inspection) == PhaseStatus::Completed,
            job_ready: job_card.as_ref().is_some_and(JobCard::is_completed),
            parts_ready: parts_status.as_ref().is_none_or(PartsOrderLine::is_ready),
            estimate_ready: estimate.is_some(),
        };

        Ok(Self {
            lead,
            inspection,
            estimate,
            job_card,
            parts_status,
            invoice,
            wallet,
            progress,
            invoice_readiness,
        })
    }
}

/// Creates the invoice for the lead's estimate once every precondition holds.
pub async fn create_invoice<R: WorkshopRepository + ?Sized>(
    repo: &R,
    overview: &LeadOverview,
) -> Result<Invoice, WorkflowError> {
    if let Some(blocker) = overview.invoice_readiness.blocker() {
        return Err(blocker.into());
    }
    let estimate = overview
        .estimate
        .as_ref()
        .ok_or(Precondition::EstimateMissing)?;

    let invoice = repo
        .create_invoice(estimate.id)
        .await
        .map_err(|e| WorkflowError::transport(Action::CreateInvoice, e))?;
    info!(
        lead_id = overview.lead.id,
        invoice_id = invoice.id,
        invoice_number = %invoice.invoice_number,
        "Invoice created successfully."
    );
    Ok(invoice)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentOutcome {
    Paid,
    /// The wallet does not cover the invoice; the operator should top up
    /// `customer_id`'s wallet by at least `shortfall`.
    TopUpRequired { customer_id: i64, shortfall: Decimal },
}

impl PaymentOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Paid => "Payment recorded.",
            Self::TopUpRequired { .. } => "Insufficient wallet balance. Please topup.",
        }
    }
}

/// Settles an invoice from the customer's wallet, or routes to a top-up.
///
/// The balance is read fresh. If it changes between the read and the
/// settlement and no longer covers the invoice, the backend refuses with a
/// conflict and the result is still a top-up request.
pub async fn pay_invoice<R: WorkshopRepository + ?Sized>(
    repo: &R,
    invoice: &mut Invoice,
) -> Result<PaymentOutcome, WorkflowError> {
    if invoice.status == InvoiceStatus::Paid {
        return Err(Precondition::InvoiceAlreadyPaid.into());
    }
    let customer_id = invoice.customer_id.ok_or(Precondition::CustomerMissing)?;

    let wallet = load_wallet(repo, customer_id).await?;
    if let PaymentDecision::TopUpRequired { shortfall } =
        decide_payment(wallet.balance, invoice.grand_total)
    {
        info!(invoice_id = invoice.id, customer_id, %shortfall, "wallet short; top-up required");
        return Ok(PaymentOutcome::TopUpRequired {
            customer_id,
            shortfall,
        });
    }

    match repo.pay_invoice(invoice.id).await {
        Ok(()) => {
            invoice.status = InvoiceStatus::Paid;
            info!(
                invoice_id = invoice.id,
                customer_id,
                amount = %invoice.grand_total,
                "invoice paid from wallet"
            );
            Ok(PaymentOutcome::Paid)
        }
        Err(RepositoryError::Conflict(reason)) => {
            let wallet = load_wallet(repo, customer_id).await?;
            let shortfall = (invoice.grand_total - wallet.balance).max(Decimal::ZERO);
            info!(invoice_id = invoice.id, customer_id, %reason, "wallet drawn down concurrently");
            Ok(PaymentOutcome::TopUpRequired {
                customer_id,
                shortfall,
            })
        }
        Err(e) => Err(WorkflowError::transport(Action::PayInvoice, e)),
    }
}

/// Posts a top-up and returns the reloaded wallet.
pub async fn top_up_wallet<R: WorkshopRepository + ?Sized>(
    repo: &R,
    customer_id: Option<i64>,
    top_up: &WalletTopUp,
) -> Result<CustomerWallet, WorkflowError> {
    let customer_id = customer_id.ok_or(Precondition::CustomerMissing)?;
    if !is_valid_top_up_amount(top_up.amount) {
        return Err(WorkflowError::validation("amount", INVALID_AMOUNT));
    }

    repo.create_wallet_transaction(customer_id, top_up)
        .await
        .map_err(|e| WorkflowError::transport(Action::TopUpWallet, e))?;
    info!(customer_id, amount = %top_up.amount, method = top_up.method.as_str(), "wallet topped up");

    load_wallet(repo, customer_id).await
}

async fn load_wallet<R: WorkshopRepository + ?Sized>(
    repo: &R,
    customer_id: i64,
) -> Result<CustomerWallet, WorkflowError> {
    repo.get_wallet(customer_id)
        .await
        .map_err(|e| WorkflowError::transport(Action::LoadWallet, e))
}
