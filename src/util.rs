use std::time::Duration;

use crate::{
    config::ReceiptVerifierConfig,
    data::{
        datasources::verify_receipt_datasource::VerifyReceiptDatasourceImpl,
        repositories::receipt_repository_impl::ReceiptRepositoryImpl,
    },
    domain::{
        entities::{payment_claim::PaymentClaim, verification_result::VerificationResult},
        repositories::receipt_repository::ReceiptRepository,
    },
    errors::{BoxError, VerifyPaymentError},
    transport::{ReceiptTransport, ReqwestTransport},
};

pub struct AppleReceiptUtil<R: ReceiptRepository> {
    receipt_repository: R,
}

impl<R: ReceiptRepository> AppleReceiptUtil<R> {
    /// Verifies a client-provided receipt with Apple, trying production first
    /// and falling back to sandbox for sandbox receipts, then checks the
    /// claimed product and bundle identifiers against it.
    pub async fn verify_payment(
        &self,
        claim: PaymentClaim,
    ) -> Result<VerificationResult, VerifyPaymentError> {
        self.receipt_repository.verify_payment(claim).await
    }
}

impl AppleReceiptUtil<ReceiptRepositoryImpl<VerifyReceiptDatasourceImpl<ReqwestTransport>>> {
    pub fn new(config: &ReceiptVerifierConfig) -> Result<Self, BoxError> {
        let transport = ReqwestTransport::new(config.timeout_ms.map(Duration::from_millis))?;
        Ok(Self::build(config, transport))
    }
}

impl<T: ReceiptTransport> AppleReceiptUtil<ReceiptRepositoryImpl<VerifyReceiptDatasourceImpl<T>>> {
    /// Same as [`AppleReceiptUtil::new`], but posting through the given
    /// transport.
    pub fn with_transport(config: &ReceiptVerifierConfig, transport: T) -> Self {
        Self::build(config, transport)
    }

    fn build(config: &ReceiptVerifierConfig, transport: T) -> Self {
        Self {
            receipt_repository: ReceiptRepositoryImpl::new(
                VerifyReceiptDatasourceImpl::new(
                    transport,
                    &config.production_url,
                    &config.sandbox_url,
                ),
                config.shared_secret.clone(),
                config.exclude_old_transactions,
            ),
        }
    }
}
