//! Error types for the provider adapter and configuration loading.

use thiserror::Error;

/// Failure of a single number acquisition against the provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Credentials are missing, empty or refused by the provider.
    #[error("Provider authentication failed: {reason}")]
    Auth { reason: String },

    /// The remote call could not complete (network, timeout, provider outage).
    #[error("Provider unavailable: {reason}")]
    Unavailable { reason: String },

    /// The provider understood the request and refused it.
    #[error("Provider rejected the request: {message}")]
    Rejected {
        /// HTTP status returned by the provider, if the refusal came from a response.
        status: Option<u16>,
        /// Provider-specific error code (Twilio's numeric `code`).
        code: Option<u32>,
        message: String,
    },

    /// The caller's request failed validation before reaching the provider.
    #[error("Invalid number request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    pub fn auth(reason: impl Into<String>) -> Self {
        Self::Auth {
            reason: reason.into(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Provider refused with HTTP 429.
    pub fn is_throttled(&self) -> bool {
        matches!(self, Self::Rejected { status: Some(429), .. })
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::unavailable(format!("request timed out: {}", e))
        } else if e.is_decode() {
            Self::unavailable(format!("malformed provider response: {}", e))
        } else {
            Self::unavailable(e.to_string())
        }
    }
}

/// Configuration problems detected at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {var}")]
    Missing { var: &'static str },

    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("HTTP client could not be constructed")]
    HttpClient(#[source] reqwest::Error),
}
