//! Access tokens for the source and destination APIs.
//!
//! The migration engine only ever asks a [`TokenProvider`] for a currently
//! valid bearer token. [`OAuthTokenProvider`] reads tokens written by an
//! earlier authorization flow and refreshes them shortly before expiry.

mod oauth;

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use docferry_retry::HttpFailure;

pub use oauth::{OAuthConfig, OAuthTokenProvider, StoredTokens};

/// Errors from token operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("token endpoint error {status}: {body}")]
    Api {
        status: u16,
        body: String,
        retry_after: Option<String>,
        rate_limit_reset: Option<String>,
    },

    #[error("no tokens at {}; run the OAuth flow first", .0.display())]
    NotAuthorized(PathBuf),
}

impl HttpFailure for AuthError {
    fn status(&self) -> Option<u16> {
        match self {
            AuthError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn retry_after(&self) -> Option<&str> {
        match self {
            AuthError::Api { retry_after, .. } => retry_after.as_deref(),
            _ => None,
        }
    }

    fn rate_limit_reset(&self) -> Option<&str> {
        match self {
            AuthError::Api {
                rate_limit_reset, ..
            } => rate_limit_reset.as_deref(),
            _ => None,
        }
    }
}

/// Source of bearer tokens for API calls.
pub trait TokenProvider: Send + Sync {
    /// Returns a token that is valid right now.
    fn access_token(&self) -> Pin<Box<dyn Future<Output = Result<String, AuthError>> + Send + '_>>;
}

/// Serves one fixed token.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl TokenProvider for StaticTokenProvider {
    fn access_token(&self) -> Pin<Box<dyn Future<Output = Result<String, AuthError>> + Send + '_>> {
        Box::pin(async move { Ok(self.token.clone()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_provider_returns_token() {
        let provider = StaticTokenProvider::new("tok-123");
        assert_eq!(provider.access_token().await.unwrap(), "tok-123");
    }

    #[test]
    fn api_error_exposes_rate_limit_headers() {
        let err = AuthError::Api {
            status: 429,
            body: String::new(),
            retry_after: Some("1.5".into()),
            rate_limit_reset: None,
        };
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.retry_after(), Some("1.5"));
        assert!(err.rate_limit_reset().is_none());
    }

    #[test]
    fn not_authorized_names_the_path() {
        let err = AuthError::NotAuthorized(PathBuf::from("tokens/.clio_tokens.json"));
        assert!(err.to_string().contains(".clio_tokens.json"));
    }
}
