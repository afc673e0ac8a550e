//! Currency rounding and tolerance helpers shared by every calculation.

/// Tolerance for "close enough" monetary comparisons. Fixed, not configurable.
pub const COVERAGE_EPSILON: f64 = 0.01;

/// Absorbs binary representation error in sums of cent amounts.
const FLOAT_SLACK: f64 = 1e-9;

/// Rounds to two decimal places, half-up.
pub fn round_currency(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    (value * 100.0 + 0.5).floor() / 100.0
}

/// Non-finite inputs count as zero so corrupt records cannot poison a total.
pub fn sanitize_amount(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Sums amounts, rounding after every addition.
pub fn sum_rounded(amounts: impl IntoIterator<Item = f64>) -> f64 {
    amounts.into_iter().fold(0.0, |total, amount| {
        round_currency(total + sanitize_amount(amount))
    })
}

/// Sums amounts without intermediate rounding.
pub fn sum_exact(amounts: impl IntoIterator<Item = f64>) -> f64 {
    amounts
        .into_iter()
        .map(sanitize_amount)
        .fold(0.0, |total, amount| total + amount)
}

/// `available` fully covers `required`; inclusive at the epsilon boundary.
pub fn covers(available: f64, required: f64) -> bool {
    available + FLOAT_SLACK >= required - COVERAGE_EPSILON
}

/// More than dust remains.
pub fn has_remainder(available: f64) -> bool {
    available > COVERAGE_EPSILON + FLOAT_SLACK
}
