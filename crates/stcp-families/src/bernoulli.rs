#![forbid(unsafe_code)]

//! Bernoulli family: rate-shift alternatives for binary outcomes.
//!
//! ```text
//! log p₀(x)      = x ln p₀ + (1 − x) ln(1 − p₀)
//! log LR(p; x)   = x ln(p/p₀) + (1 − x) ln((1 − p)/(1 − p₀))
//! maxLLR(p̄, n)   = n · log LR(p̂; p̄),  p̂ = proj_R(p̄), floored at 0
//! ```
//!
//! The log mass is affine in `x`, so the batch form is exact for any data
//! summarized by its success rate.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | `p₀ ∉ (0, 1)` | `InvalidArgument` at construction |
//! | Region disjoint from `[0, 1]` | `InvalidArgument` at construction |
//! | `p̂ ∈ {0, 1}` | Clamped to `[ε, 1 − ε]` before taking logs |

use stcp_core::{BaselineIncrement, LogLrIncrement, Region, Result, StcpError, check_count};

/// Rate clamp for logs at the boundary of `[0, 1]`.
const RATE_EPS: f64 = 1e-12;

/// `Bernoulli(p₀)` null model.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BernoulliBaseline {
    p_0: f64,
}

impl BernoulliBaseline {
    /// Null success probability `p_0 ∈ (0, 1)`.
    pub fn new(p_0: f64) -> Result<Self> {
        if p_0.is_nan() || p_0 <= 0.0 || p_0 >= 1.0 {
            return Err(StcpError::InvalidArgument(format!(
                "bernoulli p_0 must be in (0, 1), got {p_0}"
            )));
        }
        Ok(Self { p_0 })
    }

    /// Null success probability.
    #[inline]
    pub fn p_0(&self) -> f64 {
        self.p_0
    }
}

impl BaselineIncrement for BernoulliBaseline {
    fn compute_log_base_value(&self, x: f64) -> f64 {
        x * self.p_0.ln() + (1.0 - x) * (-self.p_0).ln_1p()
    }

    fn compute_log_base_value_by_avg(&self, x_bar: f64, n: f64) -> Result<f64> {
        check_count(n, "bernoulli baseline")?;
        Ok(n * self.compute_log_base_value(x_bar))
    }
}

/// Restricted rate-shift likelihood ratio against a [`BernoulliBaseline`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BernoulliLlr {
    baseline: BernoulliBaseline,
    region: Region,
}

impl BernoulliLlr {
    /// Null `Bernoulli(p_0)` against rates in `region ∩ [0, 1]`.
    pub fn new(p_0: f64, region: Region) -> Result<Self> {
        let baseline = BernoulliBaseline::new(p_0)?;
        region.validate()?;
        let region = region.clamp_to(0.0, 1.0).ok_or_else(|| {
            StcpError::InvalidArgument(format!("region {region:?} does not meet [0, 1]"))
        })?;
        Ok(Self { baseline, region })
    }

    /// Rates at least `p_0 + delta`.
    pub fn upward(p_0: f64, delta: f64) -> Result<Self> {
        Self::new(p_0, Region::AtLeast(p_0 + delta.max(0.0)))
    }

    /// The null model.
    #[inline]
    pub fn baseline(&self) -> &BernoulliBaseline {
        &self.baseline
    }

    /// The alternative region, clipped to `[0, 1]`.
    #[inline]
    pub fn region(&self) -> Region {
        self.region
    }
}

impl BaselineIncrement for BernoulliLlr {
    fn compute_log_base_value(&self, x: f64) -> f64 {
        self.baseline.compute_log_base_value(x)
    }

    fn compute_log_base_value_by_avg(&self, x_bar: f64, n: f64) -> Result<f64> {
        self.baseline.compute_log_base_value_by_avg(x_bar, n)
    }
}

impl LogLrIncrement for BernoulliLlr {
    fn initial_h1_mle(&self) -> f64 {
        self.baseline.p_0
    }

    fn restricted_mle(&self, h1_mle: f64) -> f64 {
        self.region
            .project(h1_mle.clamp(0.0, 1.0))
            .clamp(RATE_EPS, 1.0 - RATE_EPS)
    }

    fn compute_log_lr(&self, theta: f64, x: f64) -> f64 {
        let p_0 = self.baseline.p_0;
        x * (theta / p_0).ln() + (1.0 - x) * ((-theta).ln_1p() - (-p_0).ln_1p())
    }

    fn compute_log_lr_by_avg(&self, theta: f64, x_bar: f64, n: f64) -> Result<f64> {
        check_count(n, "bernoulli compute_log_lr_by_avg")?;
        Ok(n * self.compute_log_lr(theta, x_bar))
    }

    fn compute_max_llr(&self, h1_mle: f64, n: f64) -> Result<f64> {
        check_count(n, "bernoulli compute_max_llr")?;
        let p_bar = h1_mle.clamp(0.0, 1.0);
        let p_hat = self.restricted_mle(h1_mle);
        Ok((n * self.compute_log_lr(p_hat, p_bar)).max(0.0))
    }
}
