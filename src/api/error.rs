/// Message used when a failed response carries no `error` field.
pub const FALLBACK_ERROR_MESSAGE: &str = "Conversion failed";

/// A conversion the service refused or could not complete.
///
/// Raised through `anyhow::Error`; recover it with
/// `err.downcast_ref::<ApiError>()` to branch on the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// HTTP 429
    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "API error (HTTP {}): {}", self.status, self.message)
    }
}

impl std::error::Error for ApiError {}
