//! Wallet payment guard.
//!
//! Paying an invoice from the customer's wallet is allowed only when the
//! balance covers the full amount. A short balance is not an error: the
//! caller routes the operator to a top-up for the same customer. There are
//! no partial payments and no retries here.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{CustomerWallet, WalletTopUp};

pub fn can_pay_from_wallet(
    balance: Decimal,
    amount: Decimal,
) -> bool {
    balance >= amount
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentDecision {
    Settle,
    TopUpRequired { shortfall: Decimal },
}

pub fn decide_payment(
    balance: Decimal,
    amount: Decimal,
) -> PaymentDecision {
    if can_pay_from_wallet(balance, amount) {
        PaymentDecision::Settle
    } else {
        PaymentDecision::TopUpRequired {
            shortfall: amount - balance,
        }
    }
}

/// A top-up amount must be strictly positive.
pub fn is_valid_top_up_amount(amount: Decimal) -> bool {
    amount > Decimal::ZERO
}

impl CustomerWallet {
    /// Balance after a posted top-up.
    pub fn apply_top_up(
        &mut self,
        top_up: &WalletTopUp,
    ) {
        self.balance += top_up.amount;
    }
}
