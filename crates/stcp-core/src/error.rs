#![forbid(unsafe_code)]

//! Error type shared by every contract in the crate.
//!
//! All failures are local precondition violations raised at the offending
//! call. Nothing is retried and non-finite observations are not rejected.

use std::fmt;

/// Errors from e-value and controller operations.
#[derive(Debug, Clone, PartialEq)]
pub enum StcpError {
    /// An argument was malformed: an empty log-sum-exp input, a non-positive
    /// threshold, inverted region bounds, or bad family parameters.
    InvalidArgument(String),
    /// A sample count that is not finite and `> 0` reached a
    /// sufficient-statistic or likelihood-ratio call.
    DomainError(String),
    /// The baseline has no closed-form sufficient-statistic shortcut.
    Unsupported(String),
}

impl StcpError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn domain(msg: impl Into<String>) -> Self {
        Self::DomainError(msg.into())
    }

    /// Short kind label, stable across messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::DomainError(_) => "domain_error",
            Self::Unsupported(_) => "unsupported",
        }
    }
}

impl fmt::Display for StcpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::DomainError(msg) => write!(f, "domain error: {msg}"),
            Self::Unsupported(msg) => write!(f, "unsupported: {msg}"),
        }
    }
}

impl std::error::Error for StcpError {}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StcpError>;

/// Reject sample counts that are not finite and strictly positive.
///
/// An infinite count would turn the running-mean weight `n / n` into `NaN`.
pub fn check_count(n: f64, what: &str) -> Result<()> {
    if n.is_finite() && n > 0.0 {
        Ok(())
    } else {
        Err(StcpError::domain(format!(
            "{what}: n must be finite and > 0, got {n}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let err = StcpError::invalid("empty input");
        assert_eq!(err.to_string(), "invalid argument: empty input");
        assert_eq!(err.kind(), "invalid_argument");

        let err = StcpError::Unsupported("no shortcut".into());
        assert_eq!(err.to_string(), "unsupported: no shortcut");
    }

    #[test]
    fn check_count_rejects_zero_negative_nan_and_infinite() {
        assert!(check_count(1.0, "t").is_ok());
        assert!(check_count(0.5, "t").is_ok());
        assert!(check_count(1e300, "t").is_ok());
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = check_count(bad, "t").unwrap_err();
            assert_eq!(err.kind(), "domain_error");
        }
    }
}
