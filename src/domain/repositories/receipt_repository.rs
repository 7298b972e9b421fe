use async_trait::async_trait;

use crate::{
    domain::entities::{payment_claim::PaymentClaim, verification_result::VerificationResult},
    errors::VerifyPaymentError,
};

#[async_trait]
pub trait ReceiptRepository: Send + Sync {
    /// Verifies the claim's receipt with Apple and checks that it covers the
    /// claimed product and bundle identifiers.
    async fn verify_payment(
        &self,
        claim: PaymentClaim,
    ) -> Result<VerificationResult, VerifyPaymentError>;
}
