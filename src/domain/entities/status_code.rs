use serde_repr::{Deserialize_repr, Serialize_repr};

/// Status codes documented for the legacy verifyReceipt endpoint:
/// https://developer.apple.com/documentation/appstorereceipts/status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u32)]
pub enum StatusCode {
    /// The receipt is valid.
    Valid = 0,
    /// The request to the App Store was not made using the HTTP POST request
    /// method, or the JSON body could not be read.
    MalformedRequest = 21000,
    /// The data in the receipt-data property was malformed or missing.
    MalformedReceiptData = 21002,
    /// The receipt could not be authenticated.
    NotAuthenticated = 21003,
    /// The shared secret does not match the shared secret on file.
    SharedSecretMismatch = 21004,
    /// The receipt server is temporarily unavailable.
    ServerUnavailable = 21005,
    /// The receipt is valid, but the subscription has expired.
    SubscriptionExpired = 21006,
    /// A sandbox receipt was sent to the production endpoint.
    SandboxReceipt = 21007,
    /// A production receipt was sent to the sandbox endpoint.
    ProductionReceipt = 21008,
}

impl StatusCode {
    pub const ALL: [StatusCode; 9] = [
        StatusCode::Valid,
        StatusCode::MalformedRequest,
        StatusCode::MalformedReceiptData,
        StatusCode::NotAuthenticated,
        StatusCode::SharedSecretMismatch,
        StatusCode::ServerUnavailable,
        StatusCode::SubscriptionExpired,
        StatusCode::SandboxReceipt,
        StatusCode::ProductionReceipt,
    ];

    pub fn code(&self) -> i64 {
        *self as u32 as i64
    }

    pub fn from_code(code: i64) -> Option<Self> {
        StatusCode::ALL.into_iter().find(|s| s.code() == code)
    }

    pub fn message(&self) -> &'static str {
        match self {
            StatusCode::Valid => "The receipt is valid.",
            StatusCode::MalformedRequest => {
                "The App Store could not read the JSON object you provided."
            }
            StatusCode::MalformedReceiptData => {
                "The data in the receipt-data property was malformed or missing."
            }
            StatusCode::NotAuthenticated => "The receipt could not be authenticated.",
            StatusCode::SharedSecretMismatch => {
                "The shared secret you provided does not match the shared secret on file for your account."
            }
            StatusCode::ServerUnavailable => "The receipt server is not currently available.",
            StatusCode::SubscriptionExpired => {
                "This receipt is valid but the subscription has expired. When this status code is returned to your server, the receipt data is also decoded and returned as part of the response."
            }
            StatusCode::SandboxReceipt => {
                "This receipt is from the test environment, but it was sent to the production service for verification. Send it to the test environment service instead."
            }
            StatusCode::ProductionReceipt => {
                "This receipt is from the production receipt, but it was sent to the test environment service for verification. Send it to the production environment service instead."
            }
        }
    }
}
