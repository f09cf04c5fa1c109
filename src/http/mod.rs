//! Transport capability, its reqwest adapter, and the retry decorator.

mod client;
pub mod retry;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

pub use client::ReqwestNetworkClient;
pub use retry::{DEFAULT_RETRYABLE_STATUSES, RetryPolicy, send_with_retry};

/// Per-request options handed to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestOptions {
    /// Upper bound for the whole request. Transports that cannot enforce a
    /// timeout may ignore it.
    pub timeout: Option<Duration>,
}

/// Normalized outcome of one HTTP exchange.
///
/// `ok` mirrors a 2xx status. `data` holds the decoded JSON body when there
/// was one; an empty or non-JSON body is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkResponse {
    pub ok: bool,
    pub status: u16,
    pub data: Option<Value>,
}

impl NetworkResponse {
    pub fn new(status: u16, data: Option<Value>) -> Self {
        Self {
            ok: (200..300).contains(&status),
            status,
            data,
        }
    }
}

/// Capability to POST a JSON body and normalize the response.
///
/// Implementors own serialization and auth headers. A returned `Err` means
/// the exchange itself failed (connection refused, timeout, ...); a
/// well-formed error status is an `Ok` with `ok == false`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NetworkClient: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        body: Value,
        options: RequestOptions,
    ) -> Result<NetworkResponse>;
}
