//! Per-line financial ledger for estimate items.
//!
//! Cost, sale and gross-profit percent are mutually derived. Which field is
//! recomputed depends on which field the operator edited:
//!
//! | Edit            | Recomputed                                              |
//! |-----------------|---------------------------------------------------------|
//! | cost            | gp = (sale - cost) / sale * 100, when sale > 0          |
//! | gp %            | sale = cost * 100 / (100 - gp), when gp != 0            |
//! | sale            | gp = (sale - cost) / sale * 100, or none when sale is 0 |
//! | approved sale   | sale, when the line is pending and has no sale yet      |
//! | status          | approved sale defaults to sale on first approval        |
//! | discount, qty   | nothing                                                 |
//!
//! A line that is both approved and ordered is locked: every edit returns it
//! unchanged.

use rust_decimal::Decimal;
use tracing::debug;

use super::common::{HUNDRED, clamp_percent, non_negative};
use crate::models::{EstimateItem, ItemStatus, ItemType};

/// A single field edit on an estimate line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemEdit {
    Cost(Decimal),
    GpPercent(Decimal),
    Sale(Decimal),
    ApprovedSale(Decimal),
    Discount(Decimal),
    Quantity(Decimal),
    Status(ItemStatus),
    PartName(String),
    Description(Option<String>),
    ItemType(ItemType),
    ProductType(Option<String>),
}

/// Gross-profit percent for a sale and cost. `None` when there is no sale
/// or the percent is out of decimal range.
pub fn gp_percent(
    cost: Decimal,
    sale: Decimal,
) -> Option<Decimal> {
    if sale <= Decimal::ZERO {
        return None;
    }
    (sale - cost)
        .checked_div(sale)
        .and_then(|ratio| ratio.checked_mul(HUNDRED))
}

/// Sale price that yields `gp` percent over `cost`.
///
/// `None` for gp = 0 (sale is left as is), for gp >= 100, which has no
/// finite non-negative sale, and when the sale would overflow.
pub fn sale_for_gp(
    cost: Decimal,
    gp: Decimal,
) -> Option<Decimal> {
    if gp.is_zero() || gp >= HUNDRED {
        return None;
    }
    HUNDRED
        .checked_div(HUNDRED - gp)
        .and_then(|factor| cost.checked_mul(factor))
}

/// Applies one edit to a line and returns the updated line.
pub fn update_item(
    item: &EstimateItem,
    edit: ItemEdit,
) -> EstimateItem {
    if item.is_locked() {
        debug!(
            line_no = item.line_no,
            part_name = %item.part_name,
            "edit on locked estimate line ignored"
        );
        return item.clone();
    }

    let mut next = item.clone();
    match edit {
        ItemEdit::Cost(cost) => {
            next.cost = non_negative(cost);
            if next.sale > Decimal::ZERO {
                next.gp_percent = gp_percent(next.cost, next.sale);
            }
        }
        ItemEdit::GpPercent(gp) => {
            next.gp_percent = Some(gp);
            if let Some(sale) = sale_for_gp(next.cost, gp) {
                debug!(line_no = next.line_no, %gp, %sale, "sale recomputed from gp");
                next.sale = sale;
                if next.status == ItemStatus::Approved {
                    next.approved_sale = Some(sale);
                }
            }
        }
        ItemEdit::Sale(sale) => {
            next.sale = non_negative(sale);
            next.gp_percent = gp_percent(next.cost, next.sale);
        }
        ItemEdit::ApprovedSale(approved) => {
            let approved = non_negative(approved);
            next.approved_sale = Some(approved);
            if next.status == ItemStatus::Pending && next.sale.is_zero() {
                next.sale = approved;
            }
        }
        ItemEdit::Discount(discount) => next.discount = clamp_percent(discount),
        ItemEdit::Quantity(quantity) => next.quantity = non_negative(quantity),
        ItemEdit::Status(status) => {
            let first_approval =
                status == ItemStatus::Approved && item.status != ItemStatus::Approved;
            next.status = status;
            let approved_unset = next.approved_sale.is_none_or(|a| a.is_zero());
            if first_approval && approved_unset {
                next.approved_sale = Some(next.sale);
            }
        }
        ItemEdit::PartName(name) => next.part_name = name,
        ItemEdit::Description(description) => next.description = description,
        ItemEdit::ItemType(item_type) => next.item_type = item_type,
        ItemEdit::ProductType(product_type) => next.product_type = product_type,
    }
    next
}

/// A line may be removed only if it was added by hand and never ordered.
pub fn can_remove(item: &EstimateItem) -> bool {
    item.is_removable()
}
