use anyhow::{Context, Result};
use log::debug;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::error::{ApiError, FALLBACK_ERROR_MESSAGE};
use super::types::{ConversionRequest, ConversionResponse};
use crate::http::{NetworkClient, NetworkResponse, RequestOptions, RetryPolicy, send_with_retry};

/// Path of the conversion endpoint, relative to the base URL.
pub const CONVERT_PATH: &str = "/api/v1/convert";

/// Default upper bound for a single conversion request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Everything needed to build a [`ConvertClient`].
///
/// The transport is shared: the client holds a handle but never shuts it
/// down.
#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub network_client: Arc<dyn NetworkClient>,
    pub retry: Option<RetryPolicy>,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, network_client: Arc<dyn NetworkClient>) -> Self {
        Self {
            base_url: base_url.into(),
            network_client,
            retry: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Typed client for the image-to-SVG conversion endpoint.
///
/// Holds only immutable configuration, so one instance can serve any
/// number of concurrent calls.
#[derive(Clone)]
pub struct ConvertClient {
    base_url: String,
    network_client: Arc<dyn NetworkClient>,
    retry: RetryPolicy,
    request_timeout: Duration,
}

impl ConvertClient {
    pub fn new(config: ClientConfig) -> Self {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Self {
            base_url,
            network_client: config.network_client,
            // No policy means a single attempt.
            retry: config.retry.unwrap_or_else(RetryPolicy::none),
            request_timeout: config.request_timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn convert_url(&self) -> String {
        format!("{}{}", self.base_url, CONVERT_PATH)
    }

    /// Converts a raster image to SVG.
    ///
    /// Failed responses, after any retries, become an [`ApiError`] inside the
    /// returned `anyhow::Error`. Transport errors are returned as produced by
    /// the transport.
    #[tracing::instrument(skip(self, request), fields(filename = ?request.filename))]
    pub async fn convert(&self, request: &ConversionRequest) -> Result<ConversionResponse> {
        let url = self.convert_url();
        let body = serde_json::to_value(request).context("Failed to serialize conversion request")?;
        let options = RequestOptions {
            timeout: Some(self.request_timeout),
        };

        debug!(
            "Converting {} ({} bytes of image data)...",
            request.filename.as_deref().unwrap_or("<unnamed>"),
            request.original.len()
        );

        let response = send_with_retry(&self.retry, "Converting image", || {
            let network_client = Arc::clone(&self.network_client);
            let url = url.clone();
            let body = body.clone();
            async move { network_client.post_json(&url, body, options).await }
        })
        .await?;

        parse_envelope(response)
    }

    /// Positional form of [`ConvertClient::convert`].
    pub async fn convert_with(
        &self,
        original: impl Into<String>,
        filename: Option<String>,
        quality: Option<u8>,
        transparent_bg: Option<bool>,
    ) -> Result<ConversionResponse> {
        let request = ConversionRequest {
            original: original.into(),
            filename,
            quality,
            transparent_bg,
        };
        self.convert(&request).await
    }
}

/// Turns the final response of a call into an envelope or an [`ApiError`].
fn parse_envelope(response: NetworkResponse) -> Result<ConversionResponse> {
    let NetworkResponse { ok, status, data } = response;

    match data {
        Some(data) if ok && !data.is_null() => {
            serde_json::from_value(data).context("Failed to parse conversion response")
        }
        data => {
            let message = data
                .as_ref()
                .and_then(|d| d.get("error"))
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or(FALLBACK_ERROR_MESSAGE);
            debug!("Conversion failed with HTTP {}: {}", status, message);
            Err(ApiError::new(status, message).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ConversionResult;
    use crate::http::MockNetworkClient;
    use serde_json::json;
    use std::sync::Mutex;

    fn client_with(mock: MockNetworkClient, retry: Option<RetryPolicy>) -> ConvertClient {
        let mut config = ClientConfig::new("https://svg.example.com", Arc::new(mock));
        config.retry = retry;
        ConvertClient::new(config)
    }

    fn success_payload() -> Value {
        json!({
            "success": true,
            "data": {"svg": "<svg/>", "width": 10, "height": 10}
        })
    }

    #[tokio::test]
    async fn test_convert_returns_envelope_unchanged() {
        let mut mock = MockNetworkClient::new();
        mock.expect_post_json()
            .times(1)
            .returning(|_, _, _| Ok(NetworkResponse::new(200, Some(success_payload()))));

        let client = client_with(mock, None);
        let result = client.convert(&ConversionRequest::new("abc")).await.unwrap();

        assert_eq!(
            result,
            ConversionResponse {
                success: true,
                data: Some(ConversionResult {
                    svg: "<svg/>".to_string(),
                    width: 10,
                    height: 10,
                }),
                error: None,
            }
        );
    }

    #[tokio::test]
    async fn test_convert_success_not_retried_with_policy() {
        let mut mock = MockNetworkClient::new();
        mock.expect_post_json()
            .times(1)
            .returning(|_, _, _| Ok(NetworkResponse::new(200, Some(success_payload()))));

        let client = client_with(mock, Some(RetryPolicy::new(5, 1)));
        assert!(client.convert(&ConversionRequest::new("abc")).await.is_ok());
    }

    #[tokio::test]
    async fn test_convert_posts_to_endpoint_with_timeout() {
        let mut mock = MockNetworkClient::new();
        mock.expect_post_json()
            .withf(|url, _, options| {
                url == "https://svg.example.com/api/v1/convert"
                    && options.timeout == Some(DEFAULT_REQUEST_TIMEOUT)
            })
            .times(1)
            .returning(|_, _, _| Ok(NetworkResponse::new(200, Some(success_payload()))));

        let client = client_with(mock, None);
        client.convert(&ConversionRequest::new("abc")).await.unwrap();
    }

    #[tokio::test]
    async fn test_convert_trims_trailing_slash() {
        let mut mock = MockNetworkClient::new();
        mock.expect_post_json()
            .withf(|url, _, _| url == "http://localhost:8080/api/v1/convert")
            .times(1)
            .returning(|_, _, _| Ok(NetworkResponse::new(200, Some(success_payload()))));

        let client = ConvertClient::new(ClientConfig::new("http://localhost:8080/", Arc::new(mock)));
        assert_eq!(client.base_url(), "http://localhost:8080");
        client.convert(&ConversionRequest::new("abc")).await.unwrap();
    }

    #[tokio::test]
    async fn test_convert_body_omits_unset_fields() {
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = Arc::clone(&seen);

        let mut mock = MockNetworkClient::new();
        mock.expect_post_json().times(1).returning(move |_, body, _| {
            *seen_clone.lock().unwrap() = Some(body);
            Ok(NetworkResponse::new(200, Some(success_payload())))
        });

        let client = client_with(mock, None);
        client
            .convert_with("data:image/png;base64,AAAA", None, Some(7), Some(true))
            .await
            .unwrap();

        let body = seen.lock().unwrap().take().unwrap();
        let fields = body.as_object().unwrap();
        assert_eq!(fields["quality"], 7);
        assert_eq!(fields["transparentBg"], true);
        assert!(!fields.contains_key("filename"));
        assert_eq!(fields.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_convert_retries_server_errors_until_exhausted() {
        let mut mock = MockNetworkClient::new();
        mock.expect_post_json()
            .times(3)
            .returning(|_, _, _| Ok(NetworkResponse::new(500, None)));

        let client = client_with(mock, Some(RetryPolicy::new(2, 1)));
        let err = client.convert(&ConversionRequest::new("abc")).await.unwrap_err();

        let api = err.downcast_ref::<ApiError>().unwrap();
        assert_eq!(api.status, 500);
        assert_eq!(api.message, FALLBACK_ERROR_MESSAGE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_convert_final_error_matches_last_response() {
        let calls = Arc::new(Mutex::new(0u32));
        let calls_clone = Arc::clone(&calls);

        let mut mock = MockNetworkClient::new();
        mock.expect_post_json().times(2).returning(move |_, _, _| {
            let mut calls = calls_clone.lock().unwrap();
            *calls += 1;
            Ok(NetworkResponse::new(
                503,
                Some(json!({"success": false, "error": format!("busy {}", *calls)})),
            ))
        });

        let client = client_with(mock, Some(RetryPolicy::new(1, 1)));
        let err = client.convert(&ConversionRequest::new("abc")).await.unwrap_err();

        assert_eq!(
            err.downcast_ref::<ApiError>(),
            Some(&ApiError::new(503, "busy 2"))
        );
    }

    #[tokio::test]
    async fn test_convert_client_error_fails_fast_with_message() {
        let mut mock = MockNetworkClient::new();
        mock.expect_post_json().times(1).returning(|_, _, _| {
            Ok(NetworkResponse::new(
                400,
                Some(json!({"success": false, "error": "Invalid image data"})),
            ))
        });

        let client = client_with(mock, Some(RetryPolicy::new(2, 1)));
        let err = client.convert(&ConversionRequest::new("abc")).await.unwrap_err();

        let api = err.downcast_ref::<ApiError>().unwrap();
        assert_eq!(api.status, 400);
        assert_eq!(api.message, "Invalid image data");
    }

    #[tokio::test]
    async fn test_convert_rate_limit_without_policy_is_single_attempt() {
        let mut mock = MockNetworkClient::new();
        mock.expect_post_json()
            .times(1)
            .returning(|_, _, _| Ok(NetworkResponse::new(429, None)));

        let client = client_with(mock, None);
        let err = client.convert(&ConversionRequest::new("abc")).await.unwrap_err();

        assert!(err.downcast_ref::<ApiError>().unwrap().is_rate_limited());
    }

    #[tokio::test]
    async fn test_convert_ok_without_payload_is_api_error() {
        let mut mock = MockNetworkClient::new();
        mock.expect_post_json()
            .times(1)
            .returning(|_, _, _| Ok(NetworkResponse::new(200, None)));

        let client = client_with(mock, None);
        let err = client.convert(&ConversionRequest::new("abc")).await.unwrap_err();

        assert_eq!(
            err.downcast_ref::<ApiError>(),
            Some(&ApiError::new(200, FALLBACK_ERROR_MESSAGE))
        );
    }

    #[tokio::test]
    async fn test_convert_ok_with_null_payload_is_api_error() {
        let mut mock = MockNetworkClient::new();
        mock.expect_post_json()
            .times(1)
            .returning(|_, _, _| Ok(NetworkResponse::new(200, Some(Value::Null))));

        let client = client_with(mock, None);
        let err = client.convert(&ConversionRequest::new("abc")).await.unwrap_err();

        assert_eq!(err.downcast_ref::<ApiError>().unwrap().status, 200);
    }

    #[tokio::test]
    async fn test_convert_malformed_payload_is_not_api_error() {
        let mut mock = MockNetworkClient::new();
        mock.expect_post_json()
            .times(1)
            .returning(|_, _, _| Ok(NetworkResponse::new(200, Some(json!({"svg": 1})))));

        let client = client_with(mock, None);
        let err = client.convert(&ConversionRequest::new("abc")).await.unwrap_err();

        assert!(err.downcast_ref::<ApiError>().is_none());
        assert!(err.to_string().contains("Failed to parse conversion response"));
    }

    #[tokio::test]
    async fn test_convert_transport_error_propagates_without_retry() {
        let mut mock = MockNetworkClient::new();
        mock.expect_post_json()
            .times(1)
            .returning(|_, _, _| Err(anyhow::anyhow!("connection refused")));

        let client = client_with(mock, Some(RetryPolicy::new(3, 1)));
        let err = client.convert(&ConversionRequest::new("abc")).await.unwrap_err();

        assert!(err.downcast_ref::<ApiError>().is_none());
        assert_eq!(err.to_string(), "connection refused");
    }

    #[tokio::test]
    async fn test_convert_is_shareable_across_tasks() {
        let mut mock = MockNetworkClient::new();
        mock.expect_post_json()
            .times(4)
            .returning(|_, _, _| Ok(NetworkResponse::new(200, Some(success_payload()))));

        let client = client_with(mock, Some(RetryPolicy::default()));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let client = client.clone();
                tokio::spawn(async move {
                    client
                        .convert(&ConversionRequest::new(format!("image-{}", i)))
                        .await
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
    }
}
