#![forbid(unsafe_code)]

//! Numerically stable aggregation of log-domain terms.
//!
//! ```text
//! lse(x) = m + ln Σ exp(xᵢ − m),   m = max xᵢ
//! ```
//!
//! Shifting by the maximum keeps every exponent in `(-∞, 0]`, so the sum is
//! in `[1, len]` and neither overflows nor underflows to zero.

use crate::error::{Result, StcpError};

/// `ln Σ exp(xᵢ)` over a nonempty slice.
///
/// All-`-∞` input yields `-∞` (the log of an empty mass), and a `+∞` term
/// yields `+∞`; neither case produces `NaN`.
pub fn log_sum_exp(xs: &[f64]) -> Result<f64> {
    let max_x = xs
        .iter()
        .copied()
        .reduce(f64::max)
        .ok_or_else(|| StcpError::invalid("log_sum_exp requires a nonempty sequence"))?;

    if max_x.is_infinite() {
        return Ok(max_x);
    }

    let sum_exp: f64 = xs.iter().map(|&x| (x - max_x).exp()).sum();
    Ok(sum_exp.ln() + max_x)
}

/// Two-term `ln(eᵃ + eᵇ)`.
#[inline]
pub fn log_add_exp(a: f64, b: f64) -> f64 {
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    if hi.is_infinite() {
        return hi;
    }
    hi + (lo - hi).exp().ln_1p()
}
