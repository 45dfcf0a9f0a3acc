#![forbid(unsafe_code)]

//! Construction-time configuration for a sequential test.
//!
//! Baseline parameters and the alternative restriction belong to the
//! likelihood-ratio plug-in's constructor; this struct holds the parts the
//! core itself interprets.
//!
//! | Goal | Constructor | Null guarantee at threshold `b` |
//! |------|-------------|---------------------------------|
//! | One-shot test | [`StcpConfig::from_alpha`] | `P₀(stop) ≤ e^{−b} = α` |
//! | Change monitoring | [`StcpConfig::from_arl`] | mean run length `≥ e^{b}` |

use crate::error::{Result, StcpError};
use crate::general_e::Combination;

/// Default Type-I error budget: threshold `ln 20 ≈ 2.9957`.
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Log-scale threshold for a Type-I error budget `alpha`: `ln(1/α)`.
pub fn threshold_from_alpha(alpha: f64) -> Result<f64> {
    if alpha.is_nan() || alpha <= 0.0 || alpha >= 1.0 {
        return Err(StcpError::invalid(format!(
            "alpha must be in (0, 1), got {alpha}"
        )));
    }
    Ok(-alpha.ln())
}

/// Configuration for [`Stcp`](crate::controller::Stcp).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StcpConfig {
    /// Log-scale stopping boundary. Must be finite and `> 0`.
    /// Default: `ln(1/0.05)`.
    pub threshold: f64,

    /// How likelihood-ratio streams are combined. Default: `Single`.
    pub combination: Combination,
}

impl Default for StcpConfig {
    fn default() -> Self {
        Self {
            threshold: -DEFAULT_ALPHA.ln(),
            combination: Combination::Single,
        }
    }
}

impl StcpConfig {
    /// Config whose threshold controls Type-I error at `alpha`.
    pub fn from_alpha(alpha: f64) -> Result<Self> {
        Ok(Self {
            threshold: threshold_from_alpha(alpha)?,
            ..Self::default()
        })
    }

    /// Change-point config with null average run length at least `arl`:
    /// threshold `ln(arl)` with a `Mixture { window }` detector.
    pub fn from_arl(arl: f64, window: usize) -> Result<Self> {
        if arl.is_nan() || arl <= 1.0 || arl.is_infinite() {
            return Err(StcpError::invalid(format!(
                "arl must be finite and > 1, got {arl}"
            )));
        }
        let cfg = Self {
            threshold: arl.ln(),
            combination: Combination::Mixture { window },
        };
        cfg.combination.validate()?;
        Ok(cfg)
    }

    /// Set the log-scale threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the combination policy.
    #[must_use]
    pub fn with_combination(mut self, combination: Combination) -> Self {
        self.combination = combination;
        self
    }

    /// Check the threshold and the combination policy.
    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.threshold)?;
        self.combination.validate()
    }

    /// Serialize configuration to JSONL format.
    #[must_use]
    pub fn to_jsonl(&self) -> String {
        let window = match self.combination {
            Combination::Single => "null".to_string(),
            Combination::Mixture { window } | Combination::Maximum { window } => {
                window.to_string()
            }
        };
        format!(
            r#"{{"event":"stcp_config","threshold":{:.6},"combination":"{}","window":{}}}"#,
            self.threshold,
            self.combination.as_str(),
            window
        )
    }
}

pub(crate) fn validate_threshold(threshold: f64) -> Result<()> {
    if threshold.is_finite() && threshold > 0.0 {
        Ok(())
    } else {
        Err(StcpError::invalid(format!(
            "threshold must be finite and > 0, got {threshold}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_threshold_is_log_twenty() {
        let cfg = StcpConfig::default();
        assert!((cfg.threshold - 20f64.ln()).abs() < 1e-12);
        assert_eq!(cfg.combination, Combination::Single);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn from_alpha_maps_to_log_inverse() {
        let cfg = StcpConfig::from_alpha(0.01).unwrap();
        assert!((cfg.threshold - 100f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn alpha_out_of_range_is_rejected() {
        for alpha in [0.0, 1.0, -0.2, 1.5, f64::NAN] {
            assert!(StcpConfig::from_alpha(alpha).is_err(), "alpha {alpha}");
        }
    }

    #[test]
    fn from_arl_builds_mixture_detector() {
        let cfg = StcpConfig::from_arl(1000.0, 64).unwrap();
        assert!((cfg.threshold - 1000f64.ln()).abs() < 1e-12);
        assert_eq!(cfg.combination, Combination::Mixture { window: 64 });
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn from_arl_rejects_bad_inputs() {
        for arl in [1.0, 0.5, -3.0, f64::NAN, f64::INFINITY] {
            assert!(StcpConfig::from_arl(arl, 10).is_err(), "arl {arl}");
        }
        assert!(StcpConfig::from_arl(100.0, 0).is_err());
    }

    #[test]
    fn validate_rejects_bad_threshold_and_window() {
        assert!(StcpConfig::default().with_threshold(0.0).validate().is_err());
        assert!(StcpConfig::default().with_threshold(-1.0).validate().is_err());
        assert!(
            StcpConfig::default()
                .with_threshold(f64::INFINITY)
                .validate()
                .is_err()
        );
        assert!(
            StcpConfig::default()
                .with_combination(Combination::Mixture { window: 0 })
                .validate()
                .is_err()
        );
    }

    #[test]
    fn jsonl_shape() {
        let line = StcpConfig::default()
            .with_threshold(3.0)
            .with_combination(Combination::Mixture { window: 50 })
            .to_jsonl();
        assert_eq!(
            line,
            r#"{"event":"stcp_config","threshold":3.000000,"combination":"mixture","window":50}"#
        );
        let single = StcpConfig::default().to_jsonl();
        assert!(single.contains(r#""window":null"#));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_round_trip() {
        let cfg = StcpConfig::default()
            .with_threshold(3.0)
            .with_combination(Combination::Maximum { window: 8 });
        let json = serde_json::to_string(&cfg).unwrap();
        let back: StcpConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
