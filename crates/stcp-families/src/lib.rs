#![forbid(unsafe_code)]

//! Baseline and likelihood-ratio plug-ins for `stcp-core`.
//!
//! Each family provides a null model implementing
//! [`BaselineIncrement`](stcp_core::BaselineIncrement) and a restricted
//! likelihood ratio implementing [`LogLrIncrement`](stcp_core::LogLrIncrement):
//!
//! - [`normal`]: Gaussian with known variance, mean-shift alternatives.
//! - [`bernoulli`]: binary outcomes, rate-shift alternatives.
//!
//! Both are exponential families, so their sufficient-statistic update path
//! reproduces repeated single-observation updates.

pub mod bernoulli;
pub mod normal;

pub use bernoulli::{BernoulliBaseline, BernoulliLlr};
pub use normal::{NormalBaseline, NormalLlr};
