use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::{
    data::{
        datasources::utils::{parse_verify_receipt_body, ParsedReceiptResponse},
        models::verify_receipt::request_body_model::RequestBodyModel,
    },
    domain::entities::{environment::Environment, verification_result::VerificationResult},
    errors::{ReceiptError, VerifyPaymentError},
    transport::ReceiptTransport,
};

#[async_trait]
pub(crate) trait VerifyReceiptDatasource: Send + Sync {
    /// Verify Receipt:
    /// https://developer.apple.com/documentation/appstorereceipts/verifyreceipt
    ///
    /// Tries the production endpoint first and moves to the sandbox endpoint
    /// only if production reports a sandbox receipt (21007). Errors carry the
    /// environment that produced them.
    async fn verify_receipt(
        &self,
        request: &RequestBodyModel,
    ) -> Result<VerificationResult, VerifyPaymentError>;
}

pub struct VerifyReceiptDatasourceImpl<T: ReceiptTransport> {
    transport: T,
    production_url: String,
    sandbox_url: String,
}

#[async_trait]
impl<T: ReceiptTransport> VerifyReceiptDatasource for VerifyReceiptDatasourceImpl<T> {
    async fn verify_receipt(
        &self,
        request: &RequestBodyModel,
    ) -> Result<VerificationResult, VerifyPaymentError> {
        let body = serde_json::to_value(request).map_err(|e| {
            VerifyPaymentError::before_callout(ReceiptError::InvalidInput(format!(
                "request body could not be encoded: {e}"
            )))
        })?;
        self.callout_with_sandbox_fallback(&body).await
    }
}

impl<T: ReceiptTransport> VerifyReceiptDatasourceImpl<T> {
    pub(crate) fn new(transport: T, production_url: &str, sandbox_url: &str) -> Self {
        Self {
            transport,
            production_url: production_url.to_owned(),
            sandbox_url: sandbox_url.to_owned(),
        }
    }

    async fn callout_with_sandbox_fallback(
        &self,
        body: &serde_json::Value,
    ) -> Result<VerificationResult, VerifyPaymentError> {
        // Apple recommends always validating against production first. A
        // sandbox receipt is answered with 21007, which is the only case
        // worth a second callout. A 21007 from the sandbox itself is final.
        match self.callout(Environment::Production, body).await {
            Ok(parsed) => Ok(parsed.into_result(Environment::Production)),
            Err(ReceiptError::Status(e)) if e.is_sandbox_receipt() => {
                info!("sandbox receipt sent to production, retrying against sandbox");
                self.callout(Environment::Sandbox, body)
                    .await
                    .map(|parsed| parsed.into_result(Environment::Sandbox))
                    .map_err(|e| VerifyPaymentError::from_environment(Environment::Sandbox, e))
            }
            Err(e) => Err(VerifyPaymentError::from_environment(
                Environment::Production,
                e,
            )),
        }
    }

    #[instrument(skip(self, body))]
    async fn callout(
        &self,
        environment: Environment,
        body: &serde_json::Value,
    ) -> Result<ParsedReceiptResponse, ReceiptError> {
        let url = match environment {
            Environment::Production => &self.production_url,
            Environment::Sandbox => &self.sandbox_url,
        };
        debug!(url = %url, "calling verifyReceipt");
        let response = self
            .transport
            .post_json(url, body)
            .await
            .map_err(ReceiptError::Transport)?;

        if response.status != 200 {
            return Err(ReceiptError::Http {
                status: response.status,
                body: response.body,
            });
        }

        parse_verify_receipt_body(&response.body)
    }
}
