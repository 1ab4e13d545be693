//! Common helpers shared by the ledger, totals and wallet calculations.

use rust_decimal::Decimal;

/// One hundred, the percent base.
pub const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// Values at exactly 0.005 are rounded away from zero. Used for display only;
/// stored amounts keep full precision.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use workshop_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
/// assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
/// assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46));
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}

/// Clamps an amount or quantity to be non-negative.
pub fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

/// Clamps a percentage into `0..=100`.
pub fn clamp_percent(value: Decimal) -> Decimal {
    value.clamp(Decimal::ZERO, HUNDRED)
}

/// `amount * percent / 100`, saturating at the decimal bounds.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use workshop_core::calculations::common::percent_of;
///
/// assert_eq!(percent_of(dec!(200), dec!(5)), dec!(10));
/// ```
pub fn percent_of(
    amount: Decimal,
    percent: Decimal,
) -> Decimal {
    match amount.checked_mul(percent) {
        Some(product) => product / HUNDRED,
        None => (amount / HUNDRED).saturating_mul(percent),
    }
}
