#![forbid(unsafe_code)]

//! Null-model ("baseline") log density contract.
//!
//! A baseline is the reference distribution assumed absent any change or
//! effect, at fixed parameters. Plug-ins implement this trait for concrete
//! families; the core only calls it.
//!
//! # Batch contract
//!
//! For an exponential-family baseline the log density is affine in the
//! sufficient statistic, so a batch of `n` observations with mean `x̄`
//! collapses to a single call:
//!
//! ```text
//! log_base_value_by_avg(x̄, n) == Σ_{i=1..n} log_base_value(x̄)
//! ```
//!
//! Families without such a shortcut keep the default, which fails with
//! [`StcpError::Unsupported`].

use crate::error::{Result, StcpError, check_count};

/// A sufficient-statistic pair: `count` observations whose mean is `mean`.
///
/// `count` is real-valued so that weighted or fractional updates are
/// expressible; it must be strictly positive wherever it is consumed.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SufficientStat {
    /// Empirical mean `x̄`.
    pub mean: f64,
    /// Number of observations `n`.
    pub count: f64,
}

impl SufficientStat {
    /// Pair a mean with its observation count.
    #[must_use]
    pub const fn new(mean: f64, count: f64) -> Self {
        Self { mean, count }
    }

    /// Summarize a slice of raw observations. Returns `None` when empty.
    #[must_use]
    pub fn from_observations(xs: &[f64]) -> Option<Self> {
        if xs.is_empty() {
            return None;
        }
        let count = xs.len() as f64;
        Some(Self::new(xs.iter().sum::<f64>() / count, count))
    }

    /// Fail with `DomainError` unless `count` is finite and `> 0`.
    pub fn validate(&self) -> Result<()> {
        check_count(self.count, "sufficient statistic")
    }
}

impl From<(f64, f64)> for SufficientStat {
    fn from((mean, count): (f64, f64)) -> Self {
        Self::new(mean, count)
    }
}

/// Log density (or mass) of observations under the reference model.
pub trait BaselineIncrement {
    /// `log p₀(x)` at the model's fixed parameters.
    fn compute_log_base_value(&self, x: f64) -> f64;

    /// `n · log p₀(x̄)`, the batch form of [`compute_log_base_value`].
    ///
    /// Fails with `DomainError` unless `n` is finite and `> 0`. The default reports
    /// `Unsupported`; exponential-family plug-ins override it.
    ///
    /// [`compute_log_base_value`]: BaselineIncrement::compute_log_base_value
    fn compute_log_base_value_by_avg(&self, _x_bar: f64, n: f64) -> Result<f64> {
        check_count(n, "compute_log_base_value_by_avg")?;
        Err(StcpError::Unsupported(
            "baseline has no closed-form sufficient-statistic shortcut".into(),
        ))
    }
}
