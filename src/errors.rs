use std::collections::BTreeSet;

use thiserror::Error;

use crate::domain::entities::{
    environment::Environment, status_code::StatusCode, verification_result::VerificationResult,
};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Non-zero status reported by the verifyReceipt endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StatusError {
    pub code: i64,
    pub message: String,
}

impl StatusError {
    pub fn from_code(code: i64) -> Self {
        let message = match StatusCode::from_code(code) {
            Some(status) if status != StatusCode::Valid => status.message().to_owned(),
            _ => format!("Unknown status code: {code}"),
        };
        Self { code, message }
    }

    pub fn status(&self) -> Option<StatusCode> {
        StatusCode::from_code(self.code)
    }

    /// Sandbox receipt sent to the production endpoint.
    pub fn is_sandbox_receipt(&self) -> bool {
        self.status() == Some(StatusCode::SandboxReceipt)
    }

    /// Production receipt sent to the sandbox endpoint.
    pub fn is_production_receipt(&self) -> bool {
        self.status() == Some(StatusCode::ProductionReceipt)
    }

    /// Codes after which the same receipt may verify on another attempt,
    /// either later or against the other environment.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.status(),
            Some(
                StatusCode::ServerUnavailable
                    | StatusCode::SandboxReceipt
                    | StatusCode::ProductionReceipt
            )
        )
    }
}

#[derive(Debug, Error)]
pub enum ReceiptError {
    #[error("Invalid payment: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Transport(#[source] BoxError),

    #[error("Received {status} status code with body: {body}")]
    Http { status: u16, body: String },

    #[error(transparent)]
    Status(#[from] StatusError),

    #[error("Could not parse verifyReceipt response: {0}")]
    MalformedResponse(String),

    #[error("Wrong product ID: {expected} (expected: {observed:?})")]
    ProductIdMismatch {
        expected: String,
        observed: BTreeSet<String>,
    },

    #[error(
        "Wrong bundle ID: {expected} (expected: {})",
        .observed.as_deref().unwrap_or("none")
    )]
    BundleIdMismatch {
        expected: String,
        observed: Option<String>,
    },
}

impl ReceiptError {
    pub fn status_error(&self) -> Option<&StatusError> {
        match self {
            ReceiptError::Status(e) => Some(e),
            _ => None,
        }
    }
}

/// Failure returned from payment verification.
///
/// `environment` is set whenever an endpoint was reached, so callers can tell
/// a receipt Apple rejected apart from one that never left this process.
/// `result` carries the verified receipt when the failure is a mismatch
/// against the claim.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct VerifyPaymentError {
    pub environment: Option<Environment>,
    pub result: Option<Box<VerificationResult>>,
    #[source]
    pub error: ReceiptError,
}

impl VerifyPaymentError {
    pub(crate) fn before_callout(error: ReceiptError) -> Self {
        Self {
            environment: None,
            result: None,
            error,
        }
    }

    pub(crate) fn from_environment(environment: Environment, error: ReceiptError) -> Self {
        Self {
            environment: Some(environment),
            result: None,
            error,
        }
    }

    pub(crate) fn rejected_claim(result: VerificationResult, error: ReceiptError) -> Self {
        Self {
            environment: Some(result.environment),
            result: Some(Box::new(result)),
            error,
        }
    }
}
