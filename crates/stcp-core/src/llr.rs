#![forbid(unsafe_code)]

//! Likelihood-ratio increment contract and the per-stream test martingale.
//!
//! # Mathematical Model
//!
//! A stream tracks the unrestricted maximum-likelihood estimate `ĥ` of the
//! alternative parameter with an O(1) recursion. Its log e-value is the
//! predictable plug-in likelihood ratio
//!
//! ```text
//! log Mₜ = Σₖ≤ₜ [ log p_θₖ(xₖ) − log p₀(xₖ) ],   θₖ = proj_H₁(ĥₖ₋₁)
//! ```
//!
//! Each `θₖ` depends only on data before `xₖ`, so `E₀[exp(incrementₖ) | past]
//! = 1` and `Mₜ` is a test martingale under the null. The sum is not floored:
//! evidence against the alternative pulls it below zero.
//!
//! Alongside it, the restricted GLR statistic
//!
//! ```text
//! maxLLR(ĥ, n) = max(0, ℓₙ(proj_H₁(ĥ)) − ℓₙ(θ₀))
//! ```
//!
//! is kept for display. It looks at the data it is evaluated on and is not an
//! e-value.
//!
//! # Batches
//!
//! A sufficient-statistic pair is replayed as unit-weight virtual
//! observations, refreshing `θ` before each one, for the first
//! [`EXACT_REPLAY_LIMIT`] of them. Past that the refresh happens at doubling
//! chunk boundaries. `θ` stays predictable either way, so the stream remains
//! a test martingale, and batches of any size cost O(limit + log n).

use crate::baseline::BaselineIncrement;
use crate::error::{Result, StcpError, check_count};

/// Virtual observations per batch that are scored one at a time.
pub const EXACT_REPLAY_LIMIT: f64 = 4096.0;

/// Online restricted-MLE tracking and log-likelihood-ratio evaluation.
///
/// Every implementor is also a [`BaselineIncrement`]: the null term of the
/// ratio is the baseline's log density.
pub trait LogLrIncrement: BaselineIncrement {
    /// Initial estimate before any observation. The first observation is
    /// scored at its projection.
    fn initial_h1_mle(&self) -> f64 {
        0.0
    }

    /// Fold observation `x` into the estimate; `n` is the updated count.
    ///
    /// The default is the running mean `ĥ + (x − ĥ) / n`, the MLE of every
    /// mean-parameterized exponential family.
    fn update_h1_mle(&self, h1_mle: f64, x: f64, n: f64) -> f64 {
        h1_mle + (x - h1_mle) / n
    }

    /// Fold a batch of `n_batch` observations with mean `x_bar`; `n_total`
    /// is the updated count including the batch.
    ///
    /// Must equal `n_batch` repeated [`update_h1_mle`] calls with `x_bar`.
    /// The default weighted running mean satisfies that whenever the single
    /// update is the running mean.
    ///
    /// [`update_h1_mle`]: LogLrIncrement::update_h1_mle
    fn update_h1_mle_by_avg(&self, h1_mle: f64, x_bar: f64, n_batch: f64, n_total: f64) -> f64 {
        h1_mle + (x_bar - h1_mle) * (n_batch / n_total)
    }

    /// Nearest point of the alternative region to `h1_mle`.
    fn restricted_mle(&self, h1_mle: f64) -> f64;

    /// `log p_θ(x) − log p₀(x)` for one observation.
    fn compute_log_lr(&self, theta: f64, x: f64) -> f64;

    /// `n · (log p_θ(x̄) − log p₀(x̄))`, the batch form of
    /// [`compute_log_lr`](LogLrIncrement::compute_log_lr).
    ///
    /// Fails with `DomainError` unless `n` is finite and `> 0`. The default
    /// reports `Unsupported`; exponential-family plug-ins override it.
    fn compute_log_lr_by_avg(&self, _theta: f64, _x_bar: f64, n: f64) -> Result<f64> {
        check_count(n, "compute_log_lr_by_avg")?;
        Err(StcpError::Unsupported(
            "likelihood ratio has no closed-form sufficient-statistic shortcut".into(),
        ))
    }

    /// Restricted log-likelihood-ratio statistic at sample size `n`.
    ///
    /// Result is `≥ 0`. Fails with `DomainError` when `n ≤ 0`.
    fn compute_max_llr(&self, h1_mle: f64, n: f64) -> Result<f64>;
}

/// State of one likelihood-ratio stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LlrStream {
    /// Unrestricted running MLE.
    pub h1_mle: f64,
    /// Observations folded into `h1_mle`.
    pub n: f64,
    /// Accumulated plug-in log likelihood ratio: the stream's log e-value.
    pub log_value: f64,
    /// Restricted GLR after the last update (0 before any update).
    pub max_llr: f64,
}

impl LlrStream {
    /// A stream that has seen nothing.
    #[must_use]
    pub fn new<L: LogLrIncrement + ?Sized>(lr: &L) -> Self {
        Self {
            h1_mle: lr.initial_h1_mle(),
            n: 0.0,
            log_value: 0.0,
            max_llr: 0.0,
        }
    }

    /// Stream state after one more observation. `self` is untouched.
    pub fn advanced<L: LogLrIncrement + ?Sized>(&self, lr: &L, x: f64) -> Result<Self> {
        let theta = lr.restricted_mle(self.h1_mle);
        let log_value = self.log_value + lr.compute_log_lr(theta, x);
        let n = self.n + 1.0;
        let h1_mle = lr.update_h1_mle(self.h1_mle, x, n);
        let max_llr = lr.compute_max_llr(h1_mle, n)?;
        Ok(Self {
            h1_mle,
            n,
            log_value,
            max_llr,
        })
    }

    /// Stream state after a batch of `n_batch` observations with mean `x_bar`.
    pub fn advanced_by_avg<L: LogLrIncrement + ?Sized>(
        &self,
        lr: &L,
        x_bar: f64,
        n_batch: f64,
    ) -> Result<Self> {
        check_count(n_batch, "advanced_by_avg")?;
        let mut next = *self;
        let mut replayed = 0.0;
        let mut remaining = n_batch;
        while remaining > 0.0 {
            let chunk = if replayed < EXACT_REPLAY_LIMIT {
                1.0
            } else {
                replayed
            };
            let w = chunk.min(remaining);
            next = next.folded(lr, x_bar, w)?;
            replayed += w;
            remaining -= w;
        }
        next.max_llr = lr.compute_max_llr(next.h1_mle, next.n)?;
        Ok(next)
    }

    /// Score `w` virtual observations at the current plug-in, then fold them.
    fn folded<L: LogLrIncrement + ?Sized>(self, lr: &L, x_bar: f64, w: f64) -> Result<Self> {
        let theta = lr.restricted_mle(self.h1_mle);
        let log_value = self.log_value + lr.compute_log_lr_by_avg(theta, x_bar, w)?;
        let n = self.n + w;
        let h1_mle = lr.update_h1_mle_by_avg(self.h1_mle, x_bar, w, n);
        Ok(Self {
            h1_mle,
            n,
            log_value,
            max_llr: self.max_llr,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn running_mean_recursion() {
        let lr = UnitGaussian::upward();
        let xs = [2.0, -1.0, 0.5, 4.0];
        let mut h = lr.initial_h1_mle();
        for (i, &x) in xs.iter().enumerate() {
            h = lr.update_h1_mle(h, x, (i + 1) as f64);
        }
        assert!((h - 1.375).abs() < 1e-12);
    }

    #[test]
    fn batch_mle_matches_repeated_single_updates() {
        let lr = UnitGaussian::upward();
        let mut single = lr.update_h1_mle(0.0, 3.0, 1.0);
        for k in 2..=6 {
            single = lr.update_h1_mle(single, 0.5, k as f64);
        }
        let first = lr.update_h1_mle(0.0, 3.0, 1.0);
        let batch = lr.update_h1_mle_by_avg(first, 0.5, 5.0, 6.0);
        assert!((single - batch).abs() < 1e-12, "{single} vs {batch}");
    }

    #[test]
    fn max_llr_rejects_nonpositive_n() {
        let lr = UnitGaussian::upward();
        assert!(is_domain(&lr.compute_max_llr(1.0, 0.0).unwrap_err()));
        assert!(is_domain(&lr.compute_max_llr(1.0, -2.0).unwrap_err()));
    }

    #[test]
    fn max_llr_is_zero_when_mle_outside_alternative() {
        let lr = UnitGaussian::upward();
        assert_eq!(lr.compute_max_llr(-0.7, 10.0).unwrap(), 0.0);
    }

    #[test]
    fn stream_advance_is_pure() {
        let lr = UnitGaussian::upward();
        let s0 = LlrStream::new(&lr);
        let s1 = s0.advanced(&lr, 1.0).unwrap();
        assert_eq!(s0.n, 0.0);
        assert_eq!(s1.n, 1.0);
        assert!((s1.h1_mle - 1.0).abs() < 1e-12);
        // Scored at proj(0) = 0 before the estimate moves.
        assert_eq!(s1.log_value, 0.0);
        assert!((s1.max_llr - 0.5).abs() < 1e-12);
    }

    #[test]
    fn observation_is_scored_at_previous_estimate() {
        let lr = UnitGaussian::upward();
        let s1 = LlrStream::new(&lr).advanced(&lr, 3.0).unwrap();
        assert_eq!(s1.log_value, 0.0);
        assert!((s1.max_llr - 4.5).abs() < 1e-12);
        let s2 = s1.advanced(&lr, 3.0).unwrap();
        // θ = 3: 3·3 − 9/2
        assert!((s2.log_value - 4.5).abs() < 1e-12);
    }

    #[test]
    fn log_value_goes_negative_against_the_alternative() {
        let lr = UnitGaussian::shifted(1.0);
        let s = LlrStream::new(&lr).advanced(&lr, -2.0).unwrap();
        assert!((s.log_value + 2.5).abs() < 1e-12);
        assert_eq!(s.max_llr, 0.0);
    }

    #[test]
    fn stream_batch_advance_matches_sequence() {
        let lr = UnitGaussian::upward();
        let mut seq = LlrStream::new(&lr);
        for _ in 0..4 {
            seq = seq.advanced(&lr, 0.8).unwrap();
        }
        let batch = LlrStream::new(&lr).advanced_by_avg(&lr, 0.8, 4.0).unwrap();
        assert!((seq.h1_mle - batch.h1_mle).abs() < 1e-12);
        assert!((seq.max_llr - batch.max_llr).abs() < 1e-12);
        assert!((seq.log_value - batch.log_value).abs() < 1e-12);
        assert_eq!(seq.n, batch.n);
    }

    #[test]
    fn fractional_batch_matches_sequence_then_remainder() {
        let lr = UnitGaussian::shifted(0.25);
        let mut seq = LlrStream::new(&lr);
        for _ in 0..2 {
            seq = seq.advanced(&lr, 0.6).unwrap();
        }
        let theta = lr.restricted_mle(seq.h1_mle);
        let tail = 0.5 * lr.compute_log_lr(theta, 0.6);
        let batch = LlrStream::new(&lr).advanced_by_avg(&lr, 0.6, 2.5).unwrap();
        assert_eq!(batch.n, 2.5);
        assert!((batch.log_value - (seq.log_value + tail)).abs() < 1e-12);
    }

    #[test]
    fn huge_batch_terminates_with_finite_value() {
        let lr = UnitGaussian::upward();
        let s = LlrStream::new(&lr).advanced_by_avg(&lr, 0.2, 1e12).unwrap();
        assert_eq!(s.n, 1e12);
        assert!((s.h1_mle - 0.2).abs() < 1e-9);
        assert!(s.log_value.is_finite() && s.log_value > 0.0);
    }

    #[test]
    fn batch_without_shortcut_is_unsupported() {
        let lr = NoShortcut(UnitGaussian::upward());
        let err = LlrStream::new(&lr).advanced_by_avg(&lr, 0.2, 3.0).unwrap_err();
        assert!(matches!(err, StcpError::Unsupported(_)));
    }

    #[test]
    fn batch_rejects_infinite_count() {
        let lr = UnitGaussian::upward();
        let err = LlrStream::new(&lr)
            .advanced_by_avg(&lr, 0.2, f64::INFINITY)
            .unwrap_err();
        assert!(is_domain(&err));
    }
}
