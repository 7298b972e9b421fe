use serde::Deserialize;

use crate::constants::{PRODUCTION_VERIFY_RECEIPT_URL, SANDBOX_VERIFY_RECEIPT_URL};

#[derive(Debug, Clone, Deserialize)]
pub struct ReceiptVerifierConfig {
    #[serde(default = "default_production_url")]
    pub production_url: String,
    #[serde(default = "default_sandbox_url")]
    pub sandbox_url: String,
    /// App-specific shared secret, sent as `password` when a claim doesn't
    /// carry its own.
    #[serde(default)]
    pub shared_secret: Option<String>,
    /// Per-request timeout for verifyReceipt callouts. No timeout if unset.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub exclude_old_transactions: bool,
}

fn default_production_url() -> String {
    PRODUCTION_VERIFY_RECEIPT_URL.to_owned()
}

fn default_sandbox_url() -> String {
    SANDBOX_VERIFY_RECEIPT_URL.to_owned()
}

impl Default for ReceiptVerifierConfig {
    fn default() -> Self {
        Self {
            production_url: default_production_url(),
            sandbox_url: default_sandbox_url(),
            shared_secret: None,
            timeout_ms: None,
            exclude_old_transactions: false,
        }
    }
}

impl ReceiptVerifierConfig {
    /// Builds the config from `APPLE_RECEIPT_*` environment variables, e.g.
    /// `APPLE_RECEIPT_SHARED_SECRET` or `APPLE_RECEIPT_TIMEOUT_MS`. Unset
    /// variables keep their defaults.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::with_prefix("APPLE_RECEIPT")
                    .prefix_separator("_")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
