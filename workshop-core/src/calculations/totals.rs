//! Estimate totals split into an approved bucket and a pending bucket.
//!
//! For every non-rejected line:
//!
//! | Quantity        | Formula                                    |
//! |-----------------|--------------------------------------------|
//! | sale base       | approved sale when positive, else sale     |
//! | cost total      | cost * quantity                            |
//! | sale total      | sale base * quantity                       |
//! | discount amount | sale total * discount / 100                |
//! | sub total       | sale total - discount amount               |
//!
//! Per bucket, vat = sub total * vat rate / 100 and grand total = sub total + vat.
//! Rejected lines contribute to neither bucket. Sums saturate at the decimal
//! bounds instead of overflowing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::common::{percent_of, round_half_up};
use crate::models::{EstimateItem, ItemStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bucket {
    pub cost: Decimal,
    pub sale: Decimal,
    pub discount: Decimal,
    pub sub_total: Decimal,
    pub vat: Decimal,
    pub grand_total: Decimal,
}

impl Bucket {
    fn add_line(
        &mut self,
        item: &EstimateItem,
    ) {
        let sale_total = item.sale_base().saturating_mul(item.quantity);
        let discount_amount = percent_of(sale_total, item.discount);
        self.cost = self.cost.saturating_add(item.cost.saturating_mul(item.quantity));
        self.sale = self.sale.saturating_add(sale_total);
        self.discount = self.discount.saturating_add(discount_amount);
        self.sub_total = self.sub_total.saturating_add(sale_total - discount_amount);
    }

    fn apply_vat(
        &mut self,
        vat_rate: Decimal,
    ) {
        self.vat = percent_of(self.sub_total, vat_rate);
        self.grand_total = self.sub_total.saturating_add(self.vat);
    }

    /// Copy with every amount rounded half-up to two places, for display.
    pub fn rounded(&self) -> Self {
        Self {
            cost: round_half_up(self.cost),
            sale: round_half_up(self.sale),
            discount: round_half_up(self.discount),
            sub_total: round_half_up(self.sub_total),
            vat: round_half_up(self.vat),
            grand_total: round_half_up(self.grand_total),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateTotals {
    pub approved: Bucket,
    pub pending: Bucket,
    pub vat_rate: Decimal,
}

pub fn compute_totals(
    items: &[EstimateItem],
    vat_rate: Decimal,
) -> EstimateTotals {
    let mut approved = Bucket::default();
    let mut pending = Bucket::default();

    for item in items {
        match item.status {
            ItemStatus::Approved => approved.add_line(item),
            status if status.is_pending_like() => pending.add_line(item),
            _ => {}
        }
    }

    approved.apply_vat(vat_rate);
    pending.apply_vat(vat_rate);

    EstimateTotals {
        approved,
        pending,
        vat_rate,
    }
}
