//! reqwest-backed implementation of [`NetworkClient`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::Value;

use super::{NetworkClient, NetworkResponse, RequestOptions};

/// Production transport wrapping a shared reqwest [`Client`].
///
/// Default headers (auth, user agent) belong on the wrapped client.
#[derive(Clone)]
pub struct ReqwestNetworkClient {
    client: Client,
}

impl ReqwestNetworkClient {
    /// Creates a new transport wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Returns a reference to the underlying reqwest Client.
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl NetworkClient for ReqwestNetworkClient {
    #[tracing::instrument(skip(self, body))]
    async fn post_json(
        &self,
        url: &str,
        body: Value,
        options: RequestOptions,
    ) -> Result<NetworkResponse> {
        debug!("POST JSON to {}...", url);

        let mut request = self.client.post(url).json(&body);
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.context("Failed to send request")?;
        let status = response.status().as_u16();

        let bytes = response
            .bytes()
            .await
            .context("Failed to read response body")?;

        // Error statuses frequently carry a JSON body with an `error` field,
        // so decode regardless of status and fall back to no payload.
        let data = if bytes.is_empty() {
            None
        } else {
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(value) => Some(value),
                Err(e) => {
                    debug!("Response body from {} is not JSON: {}", url, e);
                    None
                }
            }
        };

        debug!("POST {} returned HTTP {}", url, status);
        Ok(NetworkResponse::new(status, data))
    }
}
