use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use serde_with::{formats::Flexible, serde_as, DefaultOnError, TimestampMilliSeconds};

/// Named receipt fields understood by [`Receipt::get_field`] and
/// [`Receipt::field_value_set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptField {
    ProductId,
    TransactionId,
    OriginalTransactionId,
    /// Bundle identifier, as named by older receipt formats.
    Bid,
    /// Bundle identifier, as named by newer receipt formats.
    BundleId,
}

impl ReceiptField {
    pub fn key(&self) -> &'static str {
        match self {
            ReceiptField::ProductId => "product_id",
            ReceiptField::TransactionId => "transaction_id",
            ReceiptField::OriginalTransactionId => "original_transaction_id",
            ReceiptField::Bid => "bid",
            ReceiptField::BundleId => "bundle_id",
        }
    }
}

/// Decoded receipt returned by the verifyReceipt endpoint.
///
/// Two shapes exist in the wild. Single-purchase receipts carry the purchase
/// fields at the top level. Receipts for apps with subscriptions carry an
/// `in_app` list of transactions, in which case the top-level purchase fields
/// are usually absent.
///
/// https://developer.apple.com/documentation/appstorereceipts/responsebody/receipt
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub bid: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub application_version: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub original_transaction_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    #[serde(rename = "purchase_date_ms", default, skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "DefaultOnError<Option<TimestampMilliSeconds<String, Flexible>>>")]
    pub purchase_date: Option<DateTime<Utc>>,
    #[serde(rename = "original_purchase_date_ms", default, skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "DefaultOnError<Option<TimestampMilliSeconds<String, Flexible>>>")]
    pub original_purchase_date: Option<DateTime<Utc>>,
    #[serde(rename = "receipt_creation_date_ms", default, skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "DefaultOnError<Option<TimestampMilliSeconds<String, Flexible>>>")]
    pub receipt_creation_date: Option<DateTime<Utc>>,
    /// In-app purchase transactions contained in the receipt. Entries that
    /// aren't transaction objects are left out.
    #[serde(
        default,
        deserialize_with = "lenient_transactions",
        skip_serializing_if = "Option::is_none"
    )]
    pub in_app: Option<Vec<Transaction>>,

    /// Fields not modelled above, as returned by the service. Modelled
    /// fields holding a value of an unexpected type read as absent and are
    /// not kept.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single purchase event, as found in `receipt.in_app` or in the
/// `latest_receipt_info` list of a response.
///
/// https://developer.apple.com/documentation/appstorereceipts/responsebody/latest_receipt_info
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    /// Integer identifier encoded as a string. Later purchases and renewals
    /// have higher identifiers.
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub original_transaction_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub bid: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub web_order_line_item_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub is_trial_period: Option<String>,
    #[serde(rename = "purchase_date_ms", default, skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "DefaultOnError<Option<TimestampMilliSeconds<String, Flexible>>>")]
    pub purchase_date: Option<DateTime<Utc>>,
    #[serde(rename = "original_purchase_date_ms", default, skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "DefaultOnError<Option<TimestampMilliSeconds<String, Flexible>>>")]
    pub original_purchase_date: Option<DateTime<Utc>>,
    /// Only present for auto-renewable subscriptions.
    #[serde(rename = "expires_date_ms", default, skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "DefaultOnError<Option<TimestampMilliSeconds<String, Flexible>>>")]
    pub expires_date: Option<DateTime<Utc>>,
    /// Set when Apple customer support refunded the transaction.
    #[serde(rename = "cancellation_date_ms", default, skip_serializing_if = "Option::is_none")]
    #[serde_as(as = "DefaultOnError<Option<TimestampMilliSeconds<String, Flexible>>>")]
    pub cancellation_date: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Transaction {
    pub fn field(&self, field: ReceiptField) -> Option<&str> {
        match field {
            ReceiptField::ProductId => self.product_id.as_deref(),
            ReceiptField::TransactionId => self.transaction_id.as_deref(),
            ReceiptField::OriginalTransactionId => self.original_transaction_id.as_deref(),
            ReceiptField::Bid => self.bid.as_deref(),
            ReceiptField::BundleId => self.bundle_id.as_deref(),
        }
    }

    /// Sort key used to order renewals. Identifiers that don't parse as an
    /// integer sort before all others.
    pub(crate) fn transaction_sort_key(&self) -> Option<u64> {
        self.transaction_id.as_deref().and_then(|id| id.trim().parse().ok())
    }
}

impl Receipt {
    fn own_field(&self, field: ReceiptField) -> Option<&str> {
        match field {
            ReceiptField::ProductId => self.product_id.as_deref(),
            ReceiptField::TransactionId => self.transaction_id.as_deref(),
            ReceiptField::OriginalTransactionId => self.original_transaction_id.as_deref(),
            ReceiptField::Bid => self.bid.as_deref(),
            ReceiptField::BundleId => self.bundle_id.as_deref(),
        }
    }

    /// Looks the field up on the receipt itself, falling back to the first
    /// entry of `in_app`.
    pub fn get_field(&self, field: ReceiptField) -> Option<&str> {
        self.own_field(field).or_else(|| {
            self.in_app
                .as_deref()
                .and_then(|transactions| transactions.first())
                .and_then(|t| t.field(field))
        })
    }

    /// All distinct values of the field. If the receipt carries the field
    /// itself, that is the only value; otherwise the values are collected
    /// across every `in_app` transaction, skipping transactions without it.
    pub fn field_value_set(&self, field: ReceiptField) -> BTreeSet<String> {
        if let Some(value) = self.own_field(field) {
            return BTreeSet::from([value.to_owned()]);
        }
        self.in_app
            .iter()
            .flatten()
            .filter_map(|t| t.field(field))
            .map(str::to_owned)
            .collect()
    }

    /// Bundle identifier of the app the receipt was issued for. Apple has
    /// used both `bid` and `bundle_id` across receipt versions.
    pub fn bundle_identifier(&self) -> Option<&str> {
        self.get_field(ReceiptField::Bid)
            .or_else(|| self.get_field(ReceiptField::BundleId))
    }
}

/// Reads an optional string, treating values of any other JSON type as
/// absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

/// Reads an optional list of transactions. Anything other than an array
/// reads as absent, and array entries that don't decode as a transaction are
/// skipped.
pub(crate) fn lenient_transactions<'de, D>(
    deserializer: D,
) -> Result<Option<Vec<Transaction>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(entries)) => Some(
            entries
                .into_iter()
                .filter_map(|entry| serde_json::from_value(entry).ok())
                .collect(),
        ),
        _ => None,
    })
}
