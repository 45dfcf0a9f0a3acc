#![forbid(unsafe_code)]

//! Feasible alternative-parameter regions and their projections.
//!
//! The restricted MLE is the unrestricted running estimate projected onto
//! the region: the nearest feasible point in absolute distance. For a
//! unimodal one-parameter likelihood this is also the restricted maximizer.

use crate::error::{Result, StcpError};

/// Alternative hypothesis parameter set for a one-dimensional family.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Region {
    /// No restriction.
    #[default]
    All,
    /// `θ ≥ lower` (one-sided upward shift).
    AtLeast(f64),
    /// `θ ≤ upper` (one-sided downward shift).
    AtMost(f64),
    /// `lower ≤ θ ≤ upper`.
    Between(f64, f64),
    /// `θ ≤ lower` or `θ ≥ upper` (two-sided shift of at least a margin).
    Outside(f64, f64),
}

impl Region {
    /// Two-sided region `|θ − center| ≥ margin`.
    pub fn two_sided(center: f64, margin: f64) -> Result<Self> {
        if margin.is_nan() || margin < 0.0 {
            return Err(StcpError::invalid(format!(
                "two-sided margin must be >= 0, got {margin}"
            )));
        }
        let region = Self::Outside(center - margin, center + margin);
        region.validate()?;
        Ok(region)
    }

    /// Check that bounds are not `NaN` and not inverted.
    pub fn validate(&self) -> Result<()> {
        let bad = match *self {
            Self::All => false,
            Self::AtLeast(b) | Self::AtMost(b) => b.is_nan(),
            Self::Between(lo, hi) | Self::Outside(lo, hi) => {
                lo.is_nan() || hi.is_nan() || lo > hi
            }
        };
        if bad {
            return Err(StcpError::invalid(format!("malformed region {self:?}")));
        }
        Ok(())
    }

    /// Whether `theta` lies in the region.
    #[must_use]
    pub fn contains(&self, theta: f64) -> bool {
        match *self {
            Self::All => true,
            Self::AtLeast(lo) => theta >= lo,
            Self::AtMost(hi) => theta <= hi,
            Self::Between(lo, hi) => (lo..=hi).contains(&theta),
            Self::Outside(lo, hi) => theta <= lo || theta >= hi,
        }
    }

    /// Nearest feasible point to `theta`.
    ///
    /// Inside an `Outside` gap the closer boundary wins; the exact midpoint
    /// goes to the upper boundary.
    #[must_use]
    pub fn project(&self, theta: f64) -> f64 {
        match *self {
            Self::All => theta,
            Self::AtLeast(lo) => theta.max(lo),
            Self::AtMost(hi) => theta.min(hi),
            Self::Between(lo, hi) => theta.clamp(lo, hi),
            Self::Outside(lo, hi) => {
                if theta <= lo || theta >= hi {
                    theta
                } else if theta - lo < hi - theta {
                    lo
                } else {
                    hi
                }
            }
        }
    }

    /// Intersect with the closed interval `[lo, hi]`, for families whose
    /// parameter space is bounded (e.g. a Bernoulli rate).
    ///
    /// Returns `None` when the intersection is empty.
    #[must_use]
    pub fn clamp_to(&self, lo: f64, hi: f64) -> Option<Self> {
        let clipped = match *self {
            Self::All => Self::Between(lo, hi),
            Self::AtLeast(a) => Self::Between(a.max(lo), hi),
            Self::AtMost(b) => Self::Between(lo, b.min(hi)),
            Self::Between(a, b) => Self::Between(a.max(lo), b.min(hi)),
            Self::Outside(a, b) => {
                let lower = a >= lo;
                let upper = b <= hi;
                match (lower, upper) {
                    (true, true) => Self::Outside(a, b),
                    (true, false) => Self::Between(lo, a.min(hi)),
                    (false, true) => Self::Between(b.max(lo), hi),
                    (false, false) => return None,
                }
            }
        };
        match clipped {
            Self::Between(a, b) if a > b => None,
            other => Some(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_is_identity_inside() {
        let regions = [
            Region::All,
            Region::AtLeast(0.0),
            Region::AtMost(1.0),
            Region::Between(-1.0, 1.0),
            Region::Outside(-0.5, 0.5),
        ];
        for r in regions {
            for theta in [-3.0, -0.75, 0.0, 0.25, 0.9, 2.0] {
                if r.contains(theta) {
                    assert_eq!(r.project(theta), theta, "{r:?} at {theta}");
                }
            }
        }
    }

    #[test]
    fn projection_lands_in_region() {
        let regions = [
            Region::AtLeast(0.2),
            Region::AtMost(-0.1),
            Region::Between(-1.0, 1.0),
            Region::Outside(-0.5, 0.5),
        ];
        for r in regions {
            for theta in [-3.0, -0.75, -0.1, 0.0, 0.1, 0.9, 2.0] {
                assert!(r.contains(r.project(theta)), "{r:?} at {theta}");
            }
        }
    }

    #[test]
    fn outside_projects_to_nearest_boundary() {
        let r = Region::Outside(-1.0, 1.0);
        assert_eq!(r.project(-0.4), -1.0);
        assert_eq!(r.project(0.4), 1.0);
        assert_eq!(r.project(0.0), 1.0);
    }

    #[test]
    fn two_sided_constructor() {
        let r = Region::two_sided(0.5, 0.25).unwrap();
        assert_eq!(r, Region::Outside(0.25, 0.75));
        assert!(Region::two_sided(0.0, -1.0).is_err());
        assert!(Region::two_sided(0.0, f64::NAN).is_err());
    }

    #[test]
    fn validate_rejects_inverted_and_nan_bounds() {
        assert!(Region::Between(1.0, 0.0).validate().is_err());
        assert!(Region::Outside(1.0, 0.0).validate().is_err());
        assert!(Region::AtLeast(f64::NAN).validate().is_err());
        assert!(Region::Between(0.0, 0.0).validate().is_ok());
        assert!(Region::AtLeast(f64::NEG_INFINITY).validate().is_ok());
    }

    #[test]
    fn clamp_to_unit_interval() {
        assert_eq!(
            Region::AtLeast(0.3).clamp_to(0.0, 1.0),
            Some(Region::Between(0.3, 1.0))
        );
        assert_eq!(
            Region::Outside(-0.5, 0.4).clamp_to(0.0, 1.0),
            Some(Region::Between(0.4, 1.0))
        );
        assert_eq!(
            Region::Outside(0.2, 0.4).clamp_to(0.0, 1.0),
            Some(Region::Outside(0.2, 0.4))
        );
        assert_eq!(Region::AtLeast(1.5).clamp_to(0.0, 1.0), None);
        assert_eq!(Region::Outside(-1.0, 2.0).clamp_to(0.0, 1.0), None);
    }
}
