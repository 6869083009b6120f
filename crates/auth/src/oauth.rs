use std::path::{Path, PathBuf};

use chrono::Utc;
use docferry_retry::{DocumentApiPolicy, RetryConfig};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{AuthError, TokenProvider};

/// Tokens are refreshed when they expire within this many milliseconds.
const REFRESH_MARGIN_MS: i64 = 60 * 1000;

/// Endpoint and client credentials for one OAuth provider.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// Full URL of the token endpoint.
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// JSON file holding [`StoredTokens`].
    pub token_path: PathBuf,
    pub retry: RetryConfig,
}

/// Token set persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry as Unix epoch milliseconds.
    pub expires_at: i64,
}

impl StoredTokens {
    fn expires_soon(&self, now_ms: i64) -> bool {
        now_ms > self.expires_at.saturating_sub(REFRESH_MARGIN_MS)
    }

    fn apply(&mut self, resp: TokenResponse, now_ms: i64) {
        self.access_token = resp.access_token;
        if let Some(refresh_token) = resp.refresh_token {
            self.refresh_token = refresh_token;
        }
        if let Some(expires_in) = resp.expires_in {
            self.expires_at = now_ms.saturating_add(expires_in.saturating_mul(1000));
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Token provider backed by a refresh-token grant.
pub struct OAuthTokenProvider {
    http: reqwest::Client,
    config: OAuthConfig,
    cached: Mutex<Option<StoredTokens>>,
}

impl OAuthTokenProvider {
    pub fn new(config: OAuthConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            config,
            cached: Mutex::new(None),
        })
    }

    pub fn token_path(&self) -> &Path {
        &self.config.token_path
    }

    /// Returns the stored access token, refreshing it first when it is
    /// about to expire.
    pub async fn valid_token(&self) -> Result<String, AuthError> {
        let mut cached = self.cached.lock().await;
        if cached.is_none() {
            *cached = load_tokens(&self.config.token_path)?;
        }
        let Some(tokens) = cached.as_mut() else {
            return Err(AuthError::NotAuthorized(self.config.token_path.clone()));
        };

        if tokens.expires_soon(Utc::now().timestamp_millis()) {
            let refresh_token = tokens.refresh_token.clone();
            let resp = docferry_retry::execute(
                "token refresh",
                &self.config.retry,
                &DocumentApiPolicy,
                || self.request_refresh(&refresh_token),
            )
            .await?;
            tokens.apply(resp, Utc::now().timestamp_millis());
            save_tokens(&self.config.token_path, tokens)?;
            info!(path = %self.config.token_path.display(), "refreshed access token");
        }

        Ok(tokens.access_token.clone())
    }

    async fn request_refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];
        let resp = self
            .http
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await?;
        let status = resp.status();

        if !status.is_success() {
            let header = |name: &str| {
                resp.headers()
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            };
            let retry_after = header("retry-after");
            let rate_limit_reset = header("x-ratelimit-reset");
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Api {
                status: status.as_u16(),
                body,
                retry_after,
                rate_limit_reset,
            });
        }

        Ok(resp.json().await?)
    }
}

impl TokenProvider for OAuthTokenProvider {
    fn access_token(
        &self,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<String, AuthError>> + Send + '_>>
    {
        Box::pin(self.valid_token())
    }
}

fn load_tokens(path: &Path) -> Result<Option<StoredTokens>, AuthError> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(path)?;
    let tokens: StoredTokens = serde_json::from_str(&data)?;
    debug!(path = %path.display(), "loaded tokens");
    Ok(Some(tokens))
}

fn save_tokens(path: &Path, tokens: &StoredTokens) -> Result<(), AuthError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(tokens)?;
    std::fs::write(path, json)?;
    set_permissions_0600(path);
    Ok(())
}

fn set_permissions_0600(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}
