use serde::Deserialize;
use serde_json::Value;

use crate::{
    data::models::verify_receipt::response_body_model::{
        ResponseBodyModel, ResponseStatusModel, StatusModel,
    },
    domain::entities::{
        environment::Environment,
        receipt::{Receipt, ReceiptField, Transaction},
        verification_result::VerificationResult,
    },
    errors::{ReceiptError, StatusError},
};

/// A verifyReceipt response with status 0, before it is tagged with the
/// environment that answered.
#[derive(Debug)]
pub(crate) struct ParsedReceiptResponse {
    pub(crate) receipt: Receipt,
    pub(crate) latest_receipt_info: Option<Vec<Transaction>>,
    pub(crate) product_id: Option<String>,
    pub(crate) transaction_id: Option<String>,
}

impl ParsedReceiptResponse {
    pub(crate) fn into_result(self, environment: Environment) -> VerificationResult {
        VerificationResult {
            receipt: self.receipt,
            latest_receipt_info: self.latest_receipt_info,
            product_id: self.product_id,
            transaction_id: self.transaction_id,
            environment,
        }
    }
}

/// Parses the raw verifyReceipt response body, failing with a
/// [`StatusError`] on any non-zero status.
///
/// For subscription receipts the product and transaction are taken from the
/// renewal with the highest transaction identifier, not from the receipt.
pub(crate) fn parse_verify_receipt_body(body: &str) -> Result<ParsedReceiptResponse, ReceiptError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ReceiptError::MalformedResponse(e.to_string()))?;

    let ResponseStatusModel { status } = ResponseStatusModel::deserialize(&value)
        .map_err(|e| ReceiptError::MalformedResponse(e.to_string()))?;
    let status = match status {
        StatusModel::Known(status) => status.code(),
        StatusModel::Unknown(code) => code,
        StatusModel::Text(text) => text.trim().parse().map_err(|_| {
            ReceiptError::MalformedResponse(format!("non-numeric status '{text}'"))
        })?,
    };
    if status != 0 {
        return Err(StatusError::from_code(status).into());
    }

    let response = ResponseBodyModel::deserialize(&value)
        .map_err(|e| ReceiptError::MalformedResponse(e.to_string()))?;
    let receipt = response.receipt;
    let mut product_id = receipt.get_field(ReceiptField::ProductId).map(str::to_owned);
    let mut transaction_id = receipt
        .get_field(ReceiptField::TransactionId)
        .map(str::to_owned);

    let latest_receipt_info = match response.latest_receipt_info {
        Some(mut transactions) if !transactions.is_empty() => {
            transactions.sort_by_key(Transaction::transaction_sort_key);
            if let Some(latest) = transactions.last() {
                product_id = latest.product_id.clone();
                transaction_id = latest.transaction_id.clone();
            }
            Some(transactions)
        }
        _ => None,
    };

    Ok(ParsedReceiptResponse {
        receipt,
        latest_receipt_info,
        product_id,
        transaction_id,
    })
}
