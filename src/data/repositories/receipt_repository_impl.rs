use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{info, instrument, warn};

use crate::{
    data::{
        datasources::verify_receipt_datasource::VerifyReceiptDatasource,
        models::verify_receipt::request_body_model::RequestBodyModel,
    },
    domain::{
        entities::{
            payment_claim::PaymentClaim, receipt::ReceiptField,
            verification_result::VerificationResult,
        },
        repositories::receipt_repository::ReceiptRepository,
    },
    errors::{ReceiptError, VerifyPaymentError},
};

pub struct ReceiptRepositoryImpl<D: VerifyReceiptDatasource> {
    verify_receipt_datasource: D,
    default_secret: Option<String>,
    exclude_old_transactions: bool,
}

#[async_trait]
impl<D: VerifyReceiptDatasource> ReceiptRepository for ReceiptRepositoryImpl<D> {
    #[instrument(
        skip_all,
        fields(product_id = ?claim.product_id, package_name = ?claim.package_name)
    )]
    async fn verify_payment(
        &self,
        claim: PaymentClaim,
    ) -> Result<VerificationResult, VerifyPaymentError> {
        let request = self
            .build_request(&claim)
            .map_err(VerifyPaymentError::before_callout)?;
        let result = self.verify_receipt_datasource.verify_receipt(&request).await?;

        if let Err(e) = reconcile(&claim, &result) {
            warn!(environment = %result.environment, "{e}");
            return Err(VerifyPaymentError::rejected_claim(result, e));
        }
        info!(
            environment = %result.environment,
            product_id = ?result.product_id,
            transaction_id = ?result.transaction_id,
            "receipt verified"
        );
        Ok(result)
    }
}

impl<D: VerifyReceiptDatasource> ReceiptRepositoryImpl<D> {
    pub(crate) fn new(
        verify_receipt_datasource: D,
        default_secret: Option<String>,
        exclude_old_transactions: bool,
    ) -> Self {
        Self {
            verify_receipt_datasource,
            default_secret,
            exclude_old_transactions,
        }
    }

    fn build_request(&self, claim: &PaymentClaim) -> Result<RequestBodyModel, ReceiptError> {
        if claim.receipt.is_empty() {
            return Err(ReceiptError::InvalidInput("receipt is empty".to_owned()));
        }
        Ok(RequestBodyModel {
            receipt_data: encode_receipt_data(&claim.receipt),
            password: claim.secret.clone().or_else(|| self.default_secret.clone()),
            exclude_old_transactions: claim
                .exclude_old_transactions
                .unwrap_or(self.exclude_old_transactions),
        })
    }
}

/// Receipts that already look like base64 are sent as they are; anything else
/// is treated as raw text and encoded.
fn encode_receipt_data(receipt: &str) -> String {
    if is_base64_like(receipt) {
        receipt.to_owned()
    } else {
        STANDARD.encode(receipt.as_bytes())
    }
}

/// Matches `^[A-Za-z0-9/+]+={0,2}$`.
fn is_base64_like(s: &str) -> bool {
    let unpadded = s
        .strip_suffix("==")
        .or_else(|| s.strip_suffix('='))
        .unwrap_or(s);
    !unpadded.is_empty()
        && unpadded
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'/' || b == b'+')
}

/// Checks the verified receipt against the identifiers the client claimed.
///
/// The product check runs over every product on the receipt rather than the
/// single resolved `product_id`, since a subscription receipt legitimately
/// covers several products.
fn reconcile(claim: &PaymentClaim, result: &VerificationResult) -> Result<(), ReceiptError> {
    let receipt = &result.receipt;

    if let Some(expected) = &claim.product_id {
        let observed = receipt.field_value_set(ReceiptField::ProductId);
        if !observed.contains(expected) {
            return Err(ReceiptError::ProductIdMismatch {
                expected: expected.clone(),
                observed,
            });
        }
    }

    if let Some(expected) = &claim.package_name {
        let observed = receipt.bundle_identifier();
        if observed != Some(expected.as_str()) {
            return Err(ReceiptError::BundleIdMismatch {
                expected: expected.clone(),
                observed: observed.map(str::to_owned),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
    };

    use serde_json::{json, Value};

    use super::*;
    use crate::{
        data::datasources::verify_receipt_datasource::VerifyReceiptDatasourceImpl,
        domain::entities::environment::Environment,
        errors::BoxError,
        transport::{ReceiptTransport, TransportResponse},
    };

    const PRODUCTION: &str = "https://production.test/verifyReceipt";
    const SANDBOX: &str = "https://sandbox.test/verifyReceipt";

    /// Replays canned responses in order and records every request.
    #[derive(Default)]
    struct RecordingTransport {
        responses: Mutex<VecDeque<Result<TransportResponse, BoxError>>>,
        requests: Mutex<Vec<(String, Value)>>,
    }

    impl RecordingTransport {
        fn replying(responses: Vec<Result<TransportResponse, BoxError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::default(),
            })
        }

        fn requests(&self) -> Vec<(String, Value)> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ReceiptTransport for RecordingTransport {
        async fn post_json(&self, url: &str, body: &Value) -> Result<TransportResponse, BoxError> {
            self.requests
                .lock()
                .unwrap()
                .push((url.to_owned(), body.clone()));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected request")
        }
    }

    fn ok(body: Value) -> Result<TransportResponse, BoxError> {
        Ok(TransportResponse {
            status: 200,
            body: body.to_string(),
        })
    }

    fn repository(
        transport: Arc<RecordingTransport>,
    ) -> ReceiptRepositoryImpl<VerifyReceiptDatasourceImpl<Arc<RecordingTransport>>> {
        ReceiptRepositoryImpl::new(
            VerifyReceiptDatasourceImpl::new(transport, PRODUCTION, SANDBOX),
            None,
            false,
        )
    }

    fn subscription_receipt() -> Value {
        json!({
            "status": 0,
            "receipt": {
                "bundle_id": "com.app",
                "in_app": [
                    { "product_id": "com.app.pro", "transaction_id": "10" },
                    { "product_id": "com.app.basic", "transaction_id": "20" },
                ],
            },
            "latest_receipt_info": [
                { "product_id": "com.app.basic", "transaction_id": "20" },
                { "product_id": "com.app.pro", "transaction_id": "10" },
            ],
        })
    }

    #[test]
    fn base64_detection() {
        assert!(is_base64_like("aGVsbG8="));
        assert!(is_base64_like("aGVsbG8h"));
        assert!(is_base64_like("ab+/cd=="));
        assert!(!is_base64_like("hello world"));
        assert!(!is_base64_like("abc==="));
        assert!(!is_base64_like("="));
        assert!(!is_base64_like("{\"receipt\":1}"));
    }

    #[test]
    fn raw_receipts_are_encoded() {
        assert_eq!(encode_receipt_data("hello!"), "aGVsbG8h");
        assert_eq!(encode_receipt_data("aGVsbG8="), "aGVsbG8=");
    }

    #[tokio::test]
    async fn production_success_makes_a_single_request() {
        let transport = RecordingTransport::replying(vec![ok(subscription_receipt())]);
        let result = repository(transport.clone())
            .verify_payment(PaymentClaim::new("aGVsbG8=").with_secret("shh"))
            .await
            .unwrap();

        assert_eq!(result.environment, Environment::Production);
        assert_eq!(result.product_id.as_deref(), Some("com.app.basic"));
        assert_eq!(result.transaction_id.as_deref(), Some("20"));

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, PRODUCTION);
        assert_eq!(
            requests[0].1,
            json!({ "receipt-data": "aGVsbG8=", "password": "shh" })
        );
    }

    #[tokio::test]
    async fn raw_receipt_is_encoded_without_password() {
        let transport = RecordingTransport::replying(vec![ok(subscription_receipt())]);
        repository(transport.clone())
            .verify_payment(PaymentClaim::new("hello world"))
            .await
            .unwrap();
        assert_eq!(
            transport.requests()[0].1,
            json!({ "receipt-data": "aGVsbG8gd29ybGQ=" })
        );
    }

    #[tokio::test]
    async fn default_secret_and_exclude_flag_are_forwarded() {
        let transport = RecordingTransport::replying(vec![ok(subscription_receipt())]);
        ReceiptRepositoryImpl::new(
            VerifyReceiptDatasourceImpl::new(transport.clone(), PRODUCTION, SANDBOX),
            Some("configured".to_owned()),
            true,
        )
        .verify_payment(PaymentClaim::new("aGVsbG8="))
        .await
        .unwrap();
        assert_eq!(
            transport.requests()[0].1,
            json!({
                "receipt-data": "aGVsbG8=",
                "password": "configured",
                "exclude-old-transactions": true,
            })
        );
    }

    #[tokio::test]
    async fn sandbox_receipt_is_retried_against_sandbox() {
        let transport = RecordingTransport::replying(vec![
            ok(json!({ "status": 21007 })),
            ok(subscription_receipt()),
        ]);
        let result = repository(transport.clone())
            .verify_payment(PaymentClaim::new("aGVsbG8="))
            .await
            .unwrap();

        assert_eq!(result.environment, Environment::Sandbox);
        let urls: Vec<_> = transport.requests().into_iter().map(|(u, _)| u).collect();
        assert_eq!(urls, [PRODUCTION, SANDBOX]);
    }

    #[tokio::test]
    async fn sandbox_retry_ignores_shape_of_rejected_body() {
        let transport = RecordingTransport::replying(vec![
            ok(json!({ "status": 21007, "receipt": "garbage", "latest_receipt_info": {} })),
            ok(subscription_receipt()),
        ]);
        let result = repository(transport.clone())
            .verify_payment(PaymentClaim::new("aGVsbG8=").with_package_name("com.app"))
            .await
            .unwrap();

        assert_eq!(result.environment, Environment::Sandbox);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn sandbox_21007_is_not_retried_again() {
        let transport = RecordingTransport::replying(vec![
            ok(json!({ "status": 21007 })),
            ok(json!({ "status": 21007 })),
        ]);
        let error = repository(transport.clone())
            .verify_payment(PaymentClaim::new("aGVsbG8="))
            .await
            .unwrap_err();

        assert_eq!(error.environment, Some(Environment::Sandbox));
        assert!(error.error.status_error().unwrap().is_sandbox_receipt());
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn other_statuses_stay_in_production() {
        for status in [21000, 21002, 21003, 21004, 21005, 21006, 21008, 21199] {
            let transport = RecordingTransport::replying(vec![ok(json!({ "status": status }))]);
            let error = repository(transport.clone())
                .verify_payment(PaymentClaim::new("aGVsbG8="))
                .await
                .unwrap_err();

            assert_eq!(error.environment, Some(Environment::Production));
            assert_eq!(error.error.status_error().unwrap().code, status);
            assert!(error.result.is_none());
            assert_eq!(transport.requests().len(), 1);
        }
    }

    #[tokio::test]
    async fn http_and_transport_errors_are_tagged() {
        let transport = RecordingTransport::replying(vec![Ok(TransportResponse {
            status: 503,
            body: "Service Unavailable".to_owned(),
        })]);
        let error = repository(transport)
            .verify_payment(PaymentClaim::new("aGVsbG8="))
            .await
            .unwrap_err();
        assert_eq!(error.environment, Some(Environment::Production));
        assert_eq!(
            error.to_string(),
            "Received 503 status code with body: Service Unavailable"
        );

        let transport = RecordingTransport::replying(vec![Err("connection reset".into())]);
        let error = repository(transport)
            .verify_payment(PaymentClaim::new("aGVsbG8="))
            .await
            .unwrap_err();
        assert_eq!(error.environment, Some(Environment::Production));
        assert!(matches!(error.error, ReceiptError::Transport(_)));
        assert_eq!(error.to_string(), "connection reset");
    }

    #[tokio::test]
    async fn empty_receipt_fails_before_any_request() {
        let transport = RecordingTransport::replying(vec![]);
        let error = repository(transport.clone())
            .verify_payment(PaymentClaim::new(""))
            .await
            .unwrap_err();
        assert_eq!(error.environment, None);
        assert!(matches!(error.error, ReceiptError::InvalidInput(_)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn claimed_product_may_be_any_product_on_the_receipt() {
        let transport = RecordingTransport::replying(vec![ok(subscription_receipt())]);
        let result = repository(transport)
            .verify_payment(PaymentClaim::new("aGVsbG8=").with_product_id("com.app.pro"))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn unknown_product_is_rejected_with_observed_set() {
        let transport = RecordingTransport::replying(vec![ok(subscription_receipt())]);
        let error = repository(transport)
            .verify_payment(PaymentClaim::new("aGVsbG8=").with_product_id("com.app.enterprise"))
            .await
            .unwrap_err();

        assert_eq!(
            error.to_string(),
            r#"Wrong product ID: com.app.enterprise (expected: {"com.app.basic", "com.app.pro"})"#
        );
        assert_eq!(error.environment, Some(Environment::Production));
        assert_eq!(
            error.result.unwrap().product_id.as_deref(),
            Some("com.app.basic")
        );
    }

    #[tokio::test]
    async fn bundle_id_falls_back_to_bundle_id_field() {
        let transport = RecordingTransport::replying(vec![ok(subscription_receipt())]);
        let result = repository(transport)
            .verify_payment(PaymentClaim::new("aGVsbG8=").with_package_name("com.app"))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn wrong_bundle_id_is_rejected() {
        let transport = RecordingTransport::replying(vec![ok(json!({
            "status": 0,
            "receipt": { "bid": "com.app", "product_id": "com.app.coins" },
        }))]);
        let error = repository(transport)
            .verify_payment(PaymentClaim::new("aGVsbG8=").with_package_name("com.other"))
            .await
            .unwrap_err();
        assert!(matches!(
            error.error,
            ReceiptError::BundleIdMismatch { ref observed, .. } if observed.as_deref() == Some("com.app")
        ));
        assert_eq!(
            error.to_string(),
            "Wrong bundle ID: com.other (expected: com.app)"
        );
    }
}
