//! Payment error types

use crate::store::StoreError;
use thiserror::Error;

/// Failures talking to the external payment processor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessorError {
    /// Connection, TLS or protocol failure
    #[error("Processor transport error: {0}")]
    Transport(String),

    /// Call exceeded the configured timeout
    #[error("Processor request timed out")]
    Timeout,

    /// Processor answered with a non-2xx status
    #[error("Processor rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Processor answered 2xx with a body we cannot use
    #[error("Invalid processor response: {0}")]
    InvalidResponse(String),

    /// Client is misconfigured (bad base URL, missing key)
    #[error("Processor configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for ProcessorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProcessorError::Timeout
        } else if err.is_decode() {
            ProcessorError::InvalidResponse(err.to_string())
        } else {
            ProcessorError::Transport(err.to_string())
        }
    }
}

/// Upgrade flow errors
#[derive(Error, Debug)]
pub enum UpgradeError {
    /// User is already on the pro plan
    #[error("User is already on the Pro plan")]
    AlreadyUpgraded,

    /// Neither a transaction id nor a reference was supplied
    #[error("Payment reference or transaction ID is required")]
    MissingIdentifier,

    /// Could not create a payment session
    #[error("Payment initialization failed: {0}")]
    UpgradeInitFailed(#[source] ProcessorError),

    /// Processor gave an authoritative negative verdict
    #[error("Payment verification failed (status: {status})")]
    VerificationFailed { status: String },

    /// Could not obtain a verdict from the processor
    #[error("Payment verification error: {0}")]
    VerificationError(#[source] ProcessorError),

    /// Local persistence failed
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl UpgradeError {
    pub fn verification_failed(status: impl Into<String>) -> Self {
        UpgradeError::VerificationFailed {
            status: status.into(),
        }
    }

    /// Whether retrying the same call may succeed
    ///
    /// A `VerificationFailed` verdict needs a new payment, not a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            UpgradeError::UpgradeInitFailed(_)
                | UpgradeError::VerificationError(_)
                | UpgradeError::Store(_)
        )
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            UpgradeError::AlreadyUpgraded => "already_upgraded",
            UpgradeError::MissingIdentifier => "missing_identifier",
            UpgradeError::UpgradeInitFailed(_) => "upgrade_init_failed",
            UpgradeError::VerificationFailed { .. } => "verification_failed",
            UpgradeError::VerificationError(_) => "verification_error",
            UpgradeError::Store(_) => "internal_error",
        }
    }

    /// Client-safe message; never includes processor internals
    pub fn user_message(&self) -> &'static str {
        match self {
            UpgradeError::AlreadyUpgraded => "You are already on the Pro plan",
            UpgradeError::MissingIdentifier => "Payment reference or transaction ID is required",
            UpgradeError::UpgradeInitFailed(_) => "Payment initialization failed. Please try again.",
            UpgradeError::VerificationFailed { .. } => {
                "Payment verification failed - payment not successful"
            }
            UpgradeError::VerificationError(_) => "Payment verification failed. Please try again.",
            UpgradeError::Store(_) => "An error occurred processing your request.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(UpgradeError::UpgradeInitFailed(ProcessorError::Timeout).is_retryable());
        assert!(UpgradeError::VerificationError(ProcessorError::Timeout).is_retryable());
        assert!(!UpgradeError::verification_failed("failed").is_retryable());
        assert!(!UpgradeError::AlreadyUpgraded.is_retryable());
        assert!(!UpgradeError::MissingIdentifier.is_retryable());
    }

    #[test]
    fn test_user_message_hides_processor_detail() {
        let err = UpgradeError::VerificationError(ProcessorError::Rejected {
            status: 500,
            message: "secret key FLWSECK-xyz invalid".to_string(),
        });
        assert!(!err.user_message().contains("FLWSECK"));
        assert_eq!(err.code(), "verification_error");
    }
}
