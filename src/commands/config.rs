use anyhow::{Context, Result};
use log::debug;
use reqwest::{
    Client,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use std::sync::Arc;
use std::time::Duration;

use crate::{
    api::{ClientConfig, ConvertClient, DEFAULT_REQUEST_TIMEOUT},
    http::{ReqwestNetworkClient, RetryPolicy},
};

/// Default API base URL when none is given.
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Connection settings gathered from flags and environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub token: Option<String>,
    pub retry: Option<RetryPolicy>,
    pub request_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            retry: Some(RetryPolicy::default()),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

pub struct Config {
    pub client: ConvertClient,
}

impl Config {
    pub fn new(settings: &Settings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = settings.token.as_deref().filter(|t| !t.is_empty()) {
            let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
                .context("API token contains characters not allowed in a header")?;
            auth_value.set_sensitive(true);
            headers.insert(AUTHORIZATION, auth_value);
            debug!("Using API token for authentication: {}", mask_token(token));
        }

        let client = Client::builder()
            .user_agent(concat!("img2svg/", env!("IMG2SVG_VERSION")))
            .default_headers(headers)
            .build()?;

        let transport = Arc::new(ReqwestNetworkClient::new(client));
        let mut client_config = ClientConfig::new(settings.api_url.clone(), transport)
            .with_request_timeout(settings.request_timeout);
        client_config.retry = settings.retry.clone();

        Ok(Self {
            client: ConvertClient::new(client_config),
        })
    }
}

/// Keeps a token recognizable in logs without revealing it.
fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "*********".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}*********{}", head, tail)
}
