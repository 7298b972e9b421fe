use serde::Deserialize;

use crate::domain::entities::{
    receipt::{lenient_transactions, Receipt, Transaction},
    status_code::StatusCode,
};

/// The `status` field of a verifyReceipt response, read on its own so that
/// error statuses are reported whatever the rest of the body looks like.
///
/// https://developer.apple.com/documentation/appstorereceipts/responsebody
#[derive(Debug, Deserialize)]
pub(crate) struct ResponseStatusModel {
    pub(crate) status: StatusModel,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum StatusModel {
    Known(StatusCode),
    Unknown(i64),
    /// Integer status encoded as a string.
    Text(String),
}

/// Body of a verifyReceipt response with status 0. Only the fields this
/// crate interprets are modelled; the receipt itself is kept whole.
#[derive(Debug, Deserialize)]
pub(crate) struct ResponseBodyModel {
    /// The decoded receipt.
    pub(crate) receipt: Receipt,
    /// In-app purchase transactions, in no guaranteed order. Only returned
    /// as a list for receipts that contain auto-renewable subscriptions;
    /// legacy receipts return a single object here, which is ignored.
    #[serde(default, deserialize_with = "lenient_transactions")]
    pub(crate) latest_receipt_info: Option<Vec<Transaction>>,
}
