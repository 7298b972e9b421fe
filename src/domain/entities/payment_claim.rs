/// A purchase asserted by a client, to be checked against Apple.
#[derive(Debug, Clone, Default)]
pub struct PaymentClaim {
    /// Receipt blob, either raw or already base64-encoded.
    pub receipt: String,
    /// Shared secret for apps with auto-renewable subscriptions. Falls back
    /// to the configured secret when not set.
    pub secret: Option<String>,
    /// Product identifier the client claims to have purchased.
    pub product_id: Option<String>,
    /// Bundle identifier of the app the client claims the purchase came from.
    pub package_name: Option<String>,
    /// Ask Apple to include only the latest renewal of each subscription in
    /// `latest_receipt_info`. Falls back to the configured default.
    pub exclude_old_transactions: Option<bool>,
}

impl PaymentClaim {
    pub fn new(receipt: impl Into<String>) -> Self {
        Self {
            receipt: receipt.into(),
            ..Default::default()
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn with_product_id(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = Some(product_id.into());
        self
    }

    pub fn with_package_name(mut self, package_name: impl Into<String>) -> Self {
        self.package_name = Some(package_name.into());
        self
    }
}
