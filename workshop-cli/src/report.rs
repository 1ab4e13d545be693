//! Plain-text rendering of workflow results for the terminal.

use std::fmt::Write;

use rust_decimal::Decimal;
use workshop_core::calculations::Bucket;
use workshop_core::calculations::common::round_half_up;
use workshop_core::workflow::{EstimateSession, LeadOverview};
use workshop_core::{CustomerWallet, Invoice, JobCard, Phase};

/// Two decimal places, rounded half-up.
pub fn money(amount: Decimal) -> String {
    format!("{:.2}", round_half_up(amount))
}

pub fn lead_overview(overview: &LeadOverview) -> String {
    let lead = &overview.lead;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Lead {} ({}) stage {}",
        lead.id,
        lead.lead_type.as_str(),
        lead.lead_stage
    );
    for phase in Phase::ALL {
        let _ = writeln!(
            out,
            "  {:<12}{}",
            phase.as_str(),
            overview.progress.status(phase).label()
        );
    }
    if let Some(stage) = &overview.progress.unrecognized_stage {
        let _ = writeln!(out, "  stage '{stage}' is not recognised");
    }

    if let Some(parts) = &overview.parts_status {
        let _ = writeln!(
            out,
            "Parts: {} ordered, {} received, {} pending",
            parts.ordered_count, parts.received_count, parts.approved_spare_pending_count
        );
    }
    if let Some(card) = &overview.job_card {
        let _ = writeln!(out, "{}", job_card(card));
    }

    match (&overview.invoice, overview.invoice_readiness.blocker()) {
        (Some(existing), _) => {
            let _ = writeln!(out, "{}", invoice(existing));
        }
        (None, Some(blocker)) => {
            let _ = writeln!(out, "Invoice: blocked ({blocker})");
        }
        (None, None) => {
            let _ = writeln!(out, "Invoice: ready to create");
        }
    }

    match &overview.wallet {
        Some(found) => {
            let _ = write!(out, "{}", wallet(found));
        }
        None => {
            let _ = write!(out, "Wallet: none");
        }
    }
    out
}

pub fn estimate(session: &EstimateSession) -> String {
    let draft = session.draft();
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Estimate {} ({}) VAT {}%",
        draft.estimate.id,
        draft.estimate.status.as_str(),
        draft.estimate.vat_rate.normalize()
    );
    for (index, item) in draft.items.iter().enumerate() {
        let lock = if item.is_locked() { " [ordered]" } else { "" };
        let _ = writeln!(
            out,
            "  {:>2}. {:<28} {:<8} x{:<5} cost {:>9} sale {:>9}  {}{}",
            index + 1,
            item.part_name,
            item.item_type.as_str(),
            item.quantity.normalize(),
            money(item.cost),
            money(item.sale),
            item.status.as_str(),
            lock
        );
    }

    let totals = session.totals();
    let _ = writeln!(out, "{}", bucket("Approved", &totals.approved));
    let _ = write!(out, "{}", bucket("Pending", &totals.pending));
    out
}

fn bucket(
    label: &str,
    bucket: &Bucket,
) -> String {
    let bucket = bucket.rounded();
    format!(
        "{label:<9} sub total {:>9}  VAT {:>8}  grand total {:>9}",
        money(bucket.sub_total),
        money(bucket.vat),
        money(bucket.grand_total)
    )
}

pub fn job_card(card: &JobCard) -> String {
    format!(
        "Job card {} for estimate {}: {} ({} line{})",
        card.id,
        card.estimate_id,
        card.status.as_str(),
        card.line_items.len(),
        if card.line_items.len() == 1 { "" } else { "s" }
    )
}

pub fn invoice(invoice: &Invoice) -> String {
    format!(
        "Invoice {} (#{}): {} total {}",
        invoice.invoice_number,
        invoice.id,
        invoice.status.label(),
        money(invoice.grand_total)
    )
}

pub fn wallet(wallet: &CustomerWallet) -> String {
    format!(
        "Customer {} wallet balance: {}",
        wallet.customer_id,
        money(wallet.balance)
    )
}
