use serde::Serialize;

/// Request body for the verifyReceipt endpoint.
///
/// https://developer.apple.com/documentation/appstorereceipts/requestbody
#[derive(Debug, Serialize)]
pub(crate) struct RequestBodyModel {
    /// The Base64-encoded receipt data.
    #[serde(rename = "receipt-data")]
    pub(crate) receipt_data: String,
    /// The app's shared secret. Only used for receipts that contain
    /// auto-renewable subscriptions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) password: Option<String>,
    /// Set to true for the response to include only the latest renewal
    /// transaction for any subscriptions.
    #[serde(
        rename = "exclude-old-transactions",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub(crate) exclude_old_transactions: bool,
}
