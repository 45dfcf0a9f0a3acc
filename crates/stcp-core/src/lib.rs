#![forbid(unsafe_code)]

//! Anytime-valid sequential testing and change-point detection via e-processes.
//!
//! # Role
//! `stcp-core` holds the family-agnostic machinery: the log-domain
//! aggregation primitive, the baseline and likelihood-ratio contracts that
//! plug-ins implement, the e-value accumulator, and the controller that
//! latches the stopping time.
//!
//! # Components, leaf-first
//! - [`log_sum_exp`]: stable `ln Σ exp(xᵢ)`.
//! - [`BaselineIncrement`]: null-model log density, per value and per batch.
//! - [`LogLrIncrement`]: running MLE, plug-in log-likelihood ratio, and
//!   restricted GLR diagnostic.
//! - [`GeneralE`]: combines one or more plug-in ratio streams into a log
//!   e-value (`Single`) or an e-detector (`Mixture`, `Maximum`).
//! - [`Stcp`]: time, threshold, stop latch, and trajectories.
//!
//! # Example
//!
//! ```ignore
//! use stcp_core::{Stcp, StcpConfig};
//!
//! // Alarm at most once per 1000 in-control observations on average.
//! let config = StcpConfig::from_arl(1000.0, 200)?;
//! let mut stcp = Stcp::from_config(my_lr_plugin, &config)?;
//!
//! for x in readings {
//!     stcp.update_log_value(x)?;
//!     if stcp.is_stopped() {
//!         alert(stcp.stopped_time());
//!         break;
//!     }
//! }
//! ```
//!
//! # Tracing
//! With the `tracing` feature, the controller emits `info` on the stop latch
//! and `debug` on reset; the accumulator emits `trace` on candidate
//! bookkeeping.

pub mod baseline;
pub mod config;
pub mod controller;
pub mod error;
pub mod general_e;
pub mod llr;
pub mod log_sum_exp;
pub mod region;

pub use baseline::{BaselineIncrement, SufficientStat};
pub use config::{DEFAULT_ALPHA, StcpConfig, threshold_from_alpha};
pub use controller::{Observation, Stcp, StcpSnapshot, StcpState, Trajectory};
pub use error::{Result, StcpError, check_count};
pub use general_e::{Combination, GeneralE, GeneralEValue};
pub use llr::{EXACT_REPLAY_LIMIT, LlrStream, LogLrIncrement};
pub use log_sum_exp::{log_add_exp, log_sum_exp};
pub use region::Region;
