#![forbid(unsafe_code)]

//! General e-value accumulator over one or more likelihood-ratio streams.
//!
//! Every stream is a predictable plug-in likelihood ratio (see
//! [`crate::llr`]), so its value is a test martingale under the null.
//!
//! # Combination policies
//!
//! | Policy | Streams | Aggregate log value | Null guarantee |
//! |--------|---------|---------------------|----------------|
//! | `Single` | one stream since the last reset | its log value | `P₀(ever ≥ b) ≤ e^{−b}` |
//! | `Mixture { window }` | one candidate per observation | `lse(log Mₖ)` | mean run length `≥ e^{b}` |
//! | `Maximum { window }` | one candidate per observation | `maxₖ log Mₖ` | mean run length `≥ e^{b}` |
//!
//! A candidate stream started at observation `k` models a change at `k`:
//! it only sees `x_k, x_{k+1}, …`. `Mixture` is the Shiryaev–Roberts
//! statistic and `Maximum` the CUSUM statistic over those candidates. The
//! Shiryaev–Roberts sum has null mean equal to the number of candidates, so
//! it is an e-detector: stopping at `b` keeps the average run length under
//! the null at least `e^{b}`. Bounding the window and replacing the sum by
//! the max only lower the statistic, so both keep that bound. Neither is a
//! Type-I error bound; use `Single` for a one-shot test.
//!
//! # Batch path
//!
//! `update_log_value_by_avg(x̄, n)` treats the pair as `n` virtual
//! observations equal to `x̄`. Existing streams replay the batch through
//! [`LlrStream::advanced_by_avg`]; candidate policies start `ceil(n)` new
//! candidates with counts `n, n − 1, …`. For integer `n` the resulting state
//! is the one `n` calls of `update_log_value(x̄)` produce.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | `n` not finite and `> 0` in the batch path | `DomainError`, state unchanged |
//! | Baseline without batch shortcut | `Unsupported`, state unchanged |
//! | Plug-in error in `compute_max_llr` | propagated, state unchanged |

use crate::baseline::BaselineIncrement;
use crate::error::{Result, StcpError, check_count};
use crate::llr::{LlrStream, LogLrIncrement};
use crate::log_sum_exp::{log_add_exp, log_sum_exp};

#[cfg(feature = "tracing")]
use tracing::trace;

/// Stateful log e-value accumulator.
pub trait GeneralEValue {
    /// Current aggregate log e-value.
    fn log_value(&self) -> f64;

    /// Back to the construction-time state.
    fn reset(&mut self);

    /// Consume one observation.
    fn update_log_value(&mut self, x: f64) -> Result<()>;

    /// Consume `n` observations summarized by their mean `x_bar`.
    fn update_log_value_by_avg(&mut self, x_bar: f64, n: f64) -> Result<()>;
}

/// How likelihood-ratio streams are combined into one log value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Combination {
    /// One plug-in stream from the last reset.
    #[default]
    Single,
    /// Log-sum-exp over change-point candidates.
    Mixture {
        /// Maximum number of retained candidates.
        window: usize,
    },
    /// Maximum over change-point candidates.
    Maximum {
        /// Maximum number of retained candidates.
        window: usize,
    },
}

impl Combination {
    /// Reject candidate policies with an empty window.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Single => Ok(()),
            Self::Mixture { window } | Self::Maximum { window } if window == 0 => Err(
                StcpError::invalid(format!("{} window must be >= 1", self.as_str())),
            ),
            Self::Mixture { .. } | Self::Maximum { .. } => Ok(()),
        }
    }

    /// Stable lowercase name, used in logs and JSONL.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Mixture { .. } => "mixture",
            Self::Maximum { .. } => "maximum",
        }
    }

    fn window(&self) -> Option<usize> {
        match *self {
            Self::Single => None,
            Self::Mixture { window } | Self::Maximum { window } => Some(window),
        }
    }
}

/// Accumulator owning a likelihood-ratio plug-in and its streams.
#[derive(Debug, Clone)]
pub struct GeneralE<L> {
    lr: L,
    combination: Combination,

    /// Live streams, oldest first.
    streams: Vec<LlrStream>,

    /// Next stream set, built off to the side so failures leave `streams` intact.
    scratch: Vec<LlrStream>,

    /// Per-stream log value buffer for the mixture aggregate.
    llrs: Vec<f64>,

    log_value: f64,

    /// Cumulative baseline log density of everything consumed.
    log_base_value: f64,
}

impl<L: LogLrIncrement> GeneralE<L> {
    /// Wrap `lr` with the given combination policy.
    pub fn new(lr: L, combination: Combination) -> Result<Self> {
        combination.validate()?;
        Ok(Self::build(lr, combination))
    }

    /// Single-stream accumulator.
    pub fn single(lr: L) -> Self {
        Self::build(lr, Combination::Single)
    }

    fn build(lr: L, combination: Combination) -> Self {
        Self {
            lr,
            combination,
            streams: Vec::new(),
            scratch: Vec::new(),
            llrs: Vec::new(),
            log_value: 0.0,
            log_base_value: 0.0,
        }
    }

    /// The likelihood-ratio plug-in.
    #[inline]
    pub fn lr(&self) -> &L {
        &self.lr
    }

    /// The combination policy.
    #[inline]
    pub fn combination(&self) -> Combination {
        self.combination
    }

    /// Number of live streams.
    #[inline]
    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    /// Live streams, oldest first.
    pub fn streams(&self) -> &[LlrStream] {
        &self.streams
    }

    /// Largest restricted GLR among the live streams, `0` before any update.
    ///
    /// A diagnostic of how far the data lean toward the alternative. It is not
    /// an e-value and the stop rule never reads it.
    pub fn max_llr(&self) -> f64 {
        self.streams.iter().map(|s| s.max_llr).fold(0.0, f64::max)
    }

    /// `Σ log p₀(x)` over everything consumed since the last reset.
    #[inline]
    pub fn log_base_value(&self) -> f64 {
        self.log_base_value
    }

    // --- Internal ---

    fn advance_all(&mut self, x: f64) -> Result<()> {
        self.scratch.clear();
        for s in &self.streams {
            self.scratch.push(s.advanced(&self.lr, x)?);
        }
        let fresh_needed = self.combination.window().is_some() || self.streams.is_empty();
        if fresh_needed {
            self.scratch.push(LlrStream::new(&self.lr).advanced(&self.lr, x)?);
        }
        Ok(())
    }

    fn advance_all_by_avg(&mut self, x_bar: f64, n: f64) -> Result<()> {
        self.scratch.clear();
        match self.combination.window() {
            None => {
                let base = self
                    .streams
                    .first()
                    .copied()
                    .unwrap_or_else(|| LlrStream::new(&self.lr));
                self.scratch.push(base.advanced_by_avg(&self.lr, x_bar, n)?);
            }
            Some(window) => {
                // Candidate j starts at the j-th virtual observation of the batch
                // and sees n − j of them. Only the newest `window` survive.
                let spawned = n.ceil() as usize;
                let fresh = spawned.min(window);
                let kept_old = self.streams.len().min(window - fresh);
                let skip = self.streams.len() - kept_old;
                for s in &self.streams[skip..] {
                    self.scratch.push(s.advanced_by_avg(&self.lr, x_bar, n)?);
                }
                for j in (spawned - fresh)..spawned {
                    let count = n - j as f64;
                    let s = LlrStream::new(&self.lr).advanced_by_avg(&self.lr, x_bar, count)?;
                    self.scratch.push(s);
                }

                #[cfg(feature = "tracing")]
                trace!(
                    n,
                    spawned,
                    kept_old,
                    dropped = skip + (spawned - fresh),
                    "general e-value: batch fan-out"
                );
            }
        }
        Ok(())
    }

    fn aggregate(&mut self) -> Result<f64> {
        match self.combination {
            Combination::Single => Ok(self.scratch.first().map_or(0.0, |s| s.log_value)),
            Combination::Mixture { .. } => match self.scratch.as_slice() {
                [a, b] => Ok(log_add_exp(a.log_value, b.log_value)),
                streams => {
                    self.llrs.clear();
                    self.llrs.extend(streams.iter().map(|s| s.log_value));
                    log_sum_exp(&self.llrs)
                }
            },
            Combination::Maximum { .. } => Ok(self
                .scratch
                .iter()
                .map(|s| s.log_value)
                .fold(f64::NEG_INFINITY, f64::max)),
        }
    }

    fn evict(&mut self) {
        if let Some(window) = self.combination.window() {
            let excess = self.scratch.len().saturating_sub(window);
            if excess > 0 {
                self.scratch.drain(..excess);

                #[cfg(feature = "tracing")]
                trace!(excess, window, "general e-value: candidates evicted");
            }
        }
    }

    fn commit(&mut self, log_value: f64, log_base_increment: f64) {
        std::mem::swap(&mut self.streams, &mut self.scratch);
        self.log_value = log_value;
        self.log_base_value += log_base_increment;
    }
}

impl<L: LogLrIncrement> GeneralEValue for GeneralE<L> {
    #[inline]
    fn log_value(&self) -> f64 {
        self.log_value
    }

    fn reset(&mut self) {
        self.streams.clear();
        self.scratch.clear();
        self.llrs.clear();
        self.log_value = 0.0;
        self.log_base_value = 0.0;
    }

    fn update_log_value(&mut self, x: f64) -> Result<()> {
        let log_base = self.lr.compute_log_base_value(x);
        self.advance_all(x)?;
        self.evict();
        let log_value = self.aggregate()?;
        self.commit(log_value, log_base);
        Ok(())
    }

    fn update_log_value_by_avg(&mut self, x_bar: f64, n: f64) -> Result<()> {
        check_count(n, "update_log_value_by_avg")?;
        let log_base = self.lr.compute_log_base_value_by_avg(x_bar, n)?;
        self.advance_all_by_avg(x_bar, n)?;
        let log_value = self.aggregate()?;
        self.commit(log_value, log_base);
        Ok(())
    }
}

/// The accumulator's null model is its plug-in's baseline.
impl<L: LogLrIncrement> BaselineIncrement for GeneralE<L> {
    fn compute_log_base_value(&self, x: f64) -> f64 {
        self.lr.compute_log_base_value(x)
    }

    fn compute_log_base_value_by_avg(&self, x_bar: f64, n: f64) -> Result<f64> {
        self.lr.compute_log_base_value_by_avg(x_bar, n)
    }
}
