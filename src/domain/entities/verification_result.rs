use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{
    environment::Environment,
    receipt::{Receipt, Transaction},
};

/// Outcome of a successful receipt verification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub receipt: Receipt,
    /// Subscription renewal history, sorted by ascending transaction
    /// identifier. Only present for receipts that contain subscriptions.
    pub latest_receipt_info: Option<Vec<Transaction>>,
    /// Product of the most recent renewal for subscriptions, otherwise the
    /// product found on the receipt.
    pub product_id: Option<String>,
    pub transaction_id: Option<String>,
    pub environment: Environment,
}

impl VerificationResult {
    /// The renewal with the highest transaction identifier, if the receipt
    /// contains subscriptions.
    pub fn latest_transaction(&self) -> Option<&Transaction> {
        self.latest_receipt_info.as_deref().and_then(|t| t.last())
    }

    pub fn expiration_date(&self) -> Option<DateTime<Utc>> {
        self.latest_transaction().and_then(|t| t.expires_date)
    }

    /// Whether the latest renewal is still in effect at `now`. Purchases
    /// without an expiry (non-subscriptions) are active unless cancelled.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        match self.latest_transaction() {
            Some(t) if t.cancellation_date.is_some() => false,
            Some(t) => t.expires_date.map_or(true, |expires| expires > now),
            None => true,
        }
    }
}
