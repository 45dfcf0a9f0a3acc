#![forbid(unsafe_code)]

//! Sequential test controller: time, threshold comparison, and stop latch.
//!
//! # State machine
//!
//! ```text
//!            log_value ≥ threshold (first time)
//! RUNNING ──────────────────────────────────────▶ STOPPED
//!    ▲                                               │
//!    └──────────────────── reset() ──────────────────┘
//! ```
//!
//! Updates are accepted in both states. In `STOPPED` they keep advancing
//! `time` and `log_value` but never move `stopped_time`.
//!
//! # Key Invariants
//!
//! 1. **Fixed threshold**: set at construction, never changed.
//! 2. **Monotone latch**: `stopped_time` is set at most once between resets
//!    and always satisfies `stopped_time ≤ time`.
//! 3. **Atomic batches**: slice-based updates validate every element before
//!    consuming any, so a `DomainError` leaves the controller untouched.
//! 4. **Reset is construction**: after `reset()` every accessor matches a
//!    freshly built controller.
//!
//! # Trajectories
//!
//! Every update method is a composition over [`Trajectory`], a lazy iterator
//! that consumes one input per `next()` and yields the post-update log value.
//! Plain updates drain it, history updates collect it, and until-stop
//! updates use the variant that checks the latch before pulling an input.

use crate::baseline::SufficientStat;
use crate::config::{StcpConfig, validate_threshold};
use crate::error::Result;
use crate::general_e::{GeneralE, GeneralEValue};
use crate::llr::LogLrIncrement;

#[cfg(feature = "tracing")]
use tracing::{debug, info};

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StcpState {
    /// No threshold crossing since the last reset.
    Running,
    /// The threshold was crossed; `stopped_time` is latched.
    Stopped,
}

impl StcpState {
    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}

/// Something the controller can consume: a raw value or a batch summary.
pub trait Observation: Copy {
    /// Precondition check run before any state changes.
    fn validate(&self) -> Result<()>;

    /// How far this observation advances `time`.
    fn weight(&self) -> f64;

    /// Forward to the accumulator.
    fn feed<E: GeneralEValue>(self, e_value: &mut E) -> Result<()>;
}

impl Observation for f64 {
    #[inline]
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    #[inline]
    fn weight(&self) -> f64 {
        1.0
    }

    #[inline]
    fn feed<E: GeneralEValue>(self, e_value: &mut E) -> Result<()> {
        e_value.update_log_value(self)
    }
}

impl Observation for SufficientStat {
    #[inline]
    fn validate(&self) -> Result<()> {
        SufficientStat::validate(self)
    }

    #[inline]
    fn weight(&self) -> f64 {
        self.count
    }

    #[inline]
    fn feed<E: GeneralEValue>(self, e_value: &mut E) -> Result<()> {
        e_value.update_log_value_by_avg(self.mean, self.count)
    }
}

/// Point-in-time view of a controller.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StcpSnapshot {
    /// Current log e-value.
    pub log_value: f64,
    /// Log-scale stopping boundary.
    pub threshold: f64,
    /// Observations consumed since the last reset.
    pub time: f64,
    /// Latched stopping time, `None` while running.
    pub stopped_time: Option<f64>,
}

impl StcpSnapshot {
    /// Serialize snapshot to JSONL format.
    #[must_use]
    pub fn to_jsonl(&self) -> String {
        let stopped_time = self
            .stopped_time
            .map_or_else(|| "null".to_string(), |t| format!("{t:.6}"));
        format!(
            r#"{{"event":"stcp_snapshot","log_value":{:.6},"threshold":{:.6},"time":{:.6},"stopped_time":{},"stopped":{}}}"#,
            self.log_value,
            self.threshold,
            self.time,
            stopped_time,
            self.stopped_time.is_some()
        )
    }
}

/// Sequential test and change-point controller.
///
/// Owns its accumulator exclusively. See module-level docs for the state
/// machine and invariants.
#[derive(Debug, Clone)]
pub struct Stcp<E> {
    e_value: E,

    log_value: f64,

    /// Immutable after construction.
    threshold: f64,

    time: f64,

    /// First crossing time since the last reset.
    stopped_time: Option<f64>,
}

impl<E: GeneralEValue> Stcp<E> {
    /// Wrap a fresh accumulator. `threshold` must be finite and `> 0`.
    pub fn new(mut e_value: E, threshold: f64) -> Result<Self> {
        validate_threshold(threshold)?;
        e_value.reset();
        Ok(Self {
            e_value,
            log_value: 0.0,
            threshold,
            time: 0.0,
            stopped_time: None,
        })
    }

    // --- Accessors ---

    /// Current log e-value.
    #[inline]
    pub fn log_value(&self) -> f64 {
        self.log_value
    }

    /// Log-scale stopping boundary.
    #[inline]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Whether the stop latch has fired since the last reset.
    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stopped_time.is_some()
    }

    /// Observations consumed since the last reset.
    #[inline]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Latched stopping time, `None` while running.
    #[inline]
    pub fn stopped_time(&self) -> Option<f64> {
        self.stopped_time
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> StcpState {
        if self.is_stopped() {
            StcpState::Stopped
        } else {
            StcpState::Running
        }
    }

    /// The owned accumulator.
    #[inline]
    pub fn e_value(&self) -> &E {
        &self.e_value
    }

    /// Point-in-time view of every accessor.
    #[must_use]
    pub fn snapshot(&self) -> StcpSnapshot {
        StcpSnapshot {
            log_value: self.log_value,
            threshold: self.threshold,
            time: self.time,
            stopped_time: self.stopped_time,
        }
    }

    /// Back to the construction-time state; the threshold is kept.
    pub fn reset(&mut self) {
        #[cfg(feature = "tracing")]
        debug!(
            time = self.time,
            log_value = self.log_value,
            stopped = self.is_stopped(),
            "stcp: reset"
        );

        self.e_value.reset();
        self.log_value = 0.0;
        self.time = 0.0;
        self.stopped_time = None;
    }

    // --- Single observations ---

    /// Consume one observation.
    pub fn update_log_value(&mut self, x: f64) -> Result<()> {
        self.step(x).map(drop)
    }

    /// Consume one observation and return the new log value.
    pub fn update_and_return_history(&mut self, x: f64) -> Result<f64> {
        self.step(x)
    }

    /// Consume `n` observations summarized by `x_bar`.
    ///
    /// Fails with `DomainError` when `n ≤ 0`, leaving state untouched.
    pub fn update_log_value_by_avg(&mut self, x_bar: f64, n: f64) -> Result<()> {
        self.step(SufficientStat::new(x_bar, n)).map(drop)
    }

    /// Batch analog of [`update_and_return_history`](Self::update_and_return_history).
    pub fn update_and_return_history_by_avg(&mut self, x_bar: f64, n: f64) -> Result<f64> {
        self.step(SufficientStat::new(x_bar, n))
    }

    // --- Sequences ---

    /// Consume every element in order, with no early exit.
    pub fn update_log_values(&mut self, xs: &[f64]) -> Result<()> {
        self.consume_all(xs)
    }

    /// Consume elements until the stop latch fires; the rest are untouched.
    pub fn update_log_values_until_stop(&mut self, xs: &[f64]) -> Result<()> {
        self.consume_until_stop(xs)
    }

    /// Consume every element, returning the post-update log values.
    pub fn update_and_return_histories(&mut self, xs: &[f64]) -> Result<Vec<f64>> {
        self.collect_all(xs)
    }

    /// Batch analog of [`update_log_values`](Self::update_log_values).
    ///
    /// Every pair is validated before the first is consumed.
    pub fn update_log_values_by_avgs(&mut self, stats: &[SufficientStat]) -> Result<()> {
        self.consume_all(stats)
    }

    /// Batch analog of [`update_log_values_until_stop`](Self::update_log_values_until_stop).
    ///
    /// Validation covers the whole slice, including pairs past the stop.
    pub fn update_log_values_until_stop_by_avgs(&mut self, stats: &[SufficientStat]) -> Result<()> {
        self.consume_until_stop(stats)
    }

    /// Batch analog of [`update_and_return_histories`](Self::update_and_return_histories).
    pub fn update_and_return_histories_by_avgs(
        &mut self,
        stats: &[SufficientStat],
    ) -> Result<Vec<f64>> {
        self.collect_all(stats)
    }

    // --- Lazy trajectories ---

    /// Lazy per-input updates yielding post-update log values.
    ///
    /// Each element is validated when it is reached, so an error part-way
    /// leaves the earlier elements consumed.
    pub fn trajectory<O, I>(&mut self, inputs: I) -> Trajectory<'_, E, I::IntoIter>
    where
        O: Observation,
        I: IntoIterator<Item = O>,
    {
        Trajectory {
            stcp: self,
            inputs: inputs.into_iter(),
            until_stop: false,
        }
    }

    /// Like [`trajectory`](Self::trajectory), but ends once the controller is
    /// stopped, before pulling the next input.
    pub fn trajectory_until_stop<O, I>(&mut self, inputs: I) -> Trajectory<'_, E, I::IntoIter>
    where
        O: Observation,
        I: IntoIterator<Item = O>,
    {
        Trajectory {
            stcp: self,
            inputs: inputs.into_iter(),
            until_stop: true,
        }
    }

    // --- Internal ---

    fn step<O: Observation>(&mut self, obs: O) -> Result<f64> {
        obs.validate()?;
        obs.feed(&mut self.e_value)?;

        self.time += obs.weight();
        self.log_value = self.e_value.log_value();

        if self.stopped_time.is_none() && self.log_value >= self.threshold {
            self.stopped_time = Some(self.time);

            #[cfg(feature = "tracing")]
            info!(
                time = self.time,
                log_value = self.log_value,
                threshold = self.threshold,
                "stcp: threshold crossed, stop latched"
            );
        }

        Ok(self.log_value)
    }

    fn consume_all<O: Observation>(&mut self, obs: &[O]) -> Result<()> {
        validate_all(obs)?;
        self.trajectory(obs.iter().copied())
            .try_for_each(|r| r.map(drop))
    }

    fn consume_until_stop<O: Observation>(&mut self, obs: &[O]) -> Result<()> {
        validate_all(obs)?;
        self.trajectory_until_stop(obs.iter().copied())
            .try_for_each(|r| r.map(drop))
    }

    fn collect_all<O: Observation>(&mut self, obs: &[O]) -> Result<Vec<f64>> {
        validate_all(obs)?;
        self.trajectory(obs.iter().copied()).collect()
    }
}

impl<L: LogLrIncrement> Stcp<GeneralE<L>> {
    /// Build a controller around `lr` from a validated config.
    pub fn from_config(lr: L, config: &StcpConfig) -> Result<Self> {
        config.validate()?;
        Self::new(GeneralE::new(lr, config.combination)?, config.threshold)
    }
}

fn validate_all<O: Observation>(obs: &[O]) -> Result<()> {
    obs.iter().try_for_each(Observation::validate)
}

/// Lazy, per-input driver over a controller.
///
/// Created by [`Stcp::trajectory`] and [`Stcp::trajectory_until_stop`].
/// Dropping it early leaves the remaining inputs unconsumed.
#[derive(Debug)]
pub struct Trajectory<'a, E, I> {
    stcp: &'a mut Stcp<E>,
    inputs: I,
    until_stop: bool,
}

impl<E, I> Trajectory<'_, E, I> {
    /// Whether this trajectory ends at the stop latch.
    #[must_use]
    pub fn is_until_stop(&self) -> bool {
        self.until_stop
    }
}

impl<E, I, O> Iterator for Trajectory<'_, E, I>
where
    E: GeneralEValue,
    I: Iterator<Item = O>,
    O: Observation,
{
    type Item = Result<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.until_stop && self.stcp.is_stopped() {
            return None;
        }
        let obs = self.inputs.next()?;
        Some(self.stcp.step(obs))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.until_stop {
            (0, self.inputs.size_hint().1)
        } else {
            self.inputs.size_hint()
        }
    }
}
