use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::errors::BoxError;

/// Raw HTTP response from a verifyReceipt endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Posts a JSON body and returns the status and raw body text. Errors are
/// connection-level failures only; non-2xx responses are returned as
/// responses.
#[async_trait]
pub trait ReceiptTransport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<TransportResponse, BoxError>;
}

#[async_trait]
impl<T: ReceiptTransport + ?Sized> ReceiptTransport for Arc<T> {
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<TransportResponse, BoxError> {
        (**self).post_json(url, body).await
    }
}

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self, BoxError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl ReceiptTransport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<TransportResponse, BoxError> {
        let response = self.client.post(url).json(body).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TransportResponse { status, body })
    }
}
