#![forbid(unsafe_code)]

//! Gaussian family with known variance: mean-shift alternatives.
//!
//! # Model
//!
//! ```text
//! H₀: x ~ N(μ₀, σ²)        H₁: x ~ N(μ, σ²), μ ∈ R
//!
//! log p₀(x)        = −½ ln(2πσ²) − (x − μ₀)² / (2σ²)
//! log LR(μ; x)     = [(x − μ₀)² − (x − μ)²] / (2σ²)
//! maxLLR(x̄, n)     = n · log LR(μ̂; x̄),   μ̂ = proj_R(x̄), floored at 0
//! ```
//!
//! The log density is affine in `(x, x²)`; the batch form evaluates the
//! density at the mean, which is what `n` repeated calls with `x̄` give.
//! The plug-in stream scores each observation with `log LR(proj_R(μ̂ₖ₋₁); xₖ)`.

use std::f64::consts::PI;

use stcp_core::{BaselineIncrement, LogLrIncrement, Region, Result, StcpError, check_count};

/// `N(μ₀, σ²)` null model.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NormalBaseline {
    mu_0: f64,
    sigma: f64,
}

impl NormalBaseline {
    /// Null mean `mu_0` and standard deviation `sigma > 0`.
    pub fn new(mu_0: f64, sigma: f64) -> Result<Self> {
        if !mu_0.is_finite() {
            return Err(StcpError::InvalidArgument(format!(
                "normal mean must be finite, got {mu_0}"
            )));
        }
        if !(sigma.is_finite() && sigma > 0.0) {
            return Err(StcpError::InvalidArgument(format!(
                "normal sigma must be finite and > 0, got {sigma}"
            )));
        }
        Ok(Self { mu_0, sigma })
    }

    /// Standard normal `N(0, 1)`.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            mu_0: 0.0,
            sigma: 1.0,
        }
    }

    /// Null mean.
    #[inline]
    pub fn mu_0(&self) -> f64 {
        self.mu_0
    }

    /// Null standard deviation.
    #[inline]
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    #[inline]
    fn variance(&self) -> f64 {
        self.sigma * self.sigma
    }
}

impl BaselineIncrement for NormalBaseline {
    fn compute_log_base_value(&self, x: f64) -> f64 {
        let var = self.variance();
        let z = x - self.mu_0;
        -0.5 * (2.0 * PI * var).ln() - z * z / (2.0 * var)
    }

    fn compute_log_base_value_by_avg(&self, x_bar: f64, n: f64) -> Result<f64> {
        check_count(n, "normal baseline")?;
        Ok(n * self.compute_log_base_value(x_bar))
    }
}

/// Restricted mean-shift likelihood ratio against a [`NormalBaseline`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NormalLlr {
    baseline: NormalBaseline,
    region: Region,
}

impl NormalLlr {
    /// Null `N(mu_0, sigma²)` against means in `region`.
    pub fn new(mu_0: f64, sigma: f64, region: Region) -> Result<Self> {
        Self::with_baseline(NormalBaseline::new(mu_0, sigma)?, region)
    }

    /// Wrap an existing baseline.
    pub fn with_baseline(baseline: NormalBaseline, region: Region) -> Result<Self> {
        region.validate()?;
        Ok(Self { baseline, region })
    }

    /// Upward shift of at least `delta ≥ 0` from the null mean.
    pub fn upward(mu_0: f64, sigma: f64, delta: f64) -> Result<Self> {
        Self::new(mu_0, sigma, Region::AtLeast(mu_0 + delta.max(0.0)))
    }

    /// Shift of at least `delta ≥ 0` in either direction.
    pub fn two_sided(mu_0: f64, sigma: f64, delta: f64) -> Result<Self> {
        Self::new(mu_0, sigma, Region::two_sided(mu_0, delta)?)
    }

    /// The null model.
    #[inline]
    pub fn baseline(&self) -> &NormalBaseline {
        &self.baseline
    }

    /// The alternative region.
    #[inline]
    pub fn region(&self) -> Region {
        self.region
    }
}

impl BaselineIncrement for NormalLlr {
    fn compute_log_base_value(&self, x: f64) -> f64 {
        self.baseline.compute_log_base_value(x)
    }

    fn compute_log_base_value_by_avg(&self, x_bar: f64, n: f64) -> Result<f64> {
        self.baseline.compute_log_base_value_by_avg(x_bar, n)
    }
}

impl LogLrIncrement for NormalLlr {
    fn initial_h1_mle(&self) -> f64 {
        self.baseline.mu_0
    }

    fn restricted_mle(&self, h1_mle: f64) -> f64 {
        self.region.project(h1_mle)
    }

    fn compute_log_lr(&self, theta: f64, x: f64) -> f64 {
        let to_null = x - self.baseline.mu_0;
        let to_alt = x - theta;
        (to_null * to_null - to_alt * to_alt) / (2.0 * self.baseline.variance())
    }

    fn compute_log_lr_by_avg(&self, theta: f64, x_bar: f64, n: f64) -> Result<f64> {
        check_count(n, "normal compute_log_lr_by_avg")?;
        Ok(n * self.compute_log_lr(theta, x_bar))
    }

    fn compute_max_llr(&self, h1_mle: f64, n: f64) -> Result<f64> {
        check_count(n, "normal compute_max_llr")?;
        let mu_hat = self.restricted_mle(h1_mle);
        Ok((n * self.compute_log_lr(mu_hat, h1_mle)).max(0.0))
    }
}
