//! Progress source: the remote backend that owns registration records.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use crate::error::SourceError;
use crate::store::LocalCache;

use super::catalog::UserType;
use super::model::{ServerProgress, storage_keys};

/// Anything that can report a user's registration progress.
#[async_trait]
pub trait ProgressSource: Send + Sync {
    /// Fetch current progress. `Ok(None)` means the backend has no
    /// registration for this user yet.
    async fn fetch(&self, user_type: UserType) -> Result<Option<ServerProgress>, SourceError>;
}

/// Progress source backed by the registration REST API.
///
/// Authenticates with the bearer token kept in the durable cache under
/// [`storage_keys::AUTH_TOKEN`]. A 401 clears that token.
pub struct HttpProgressSource {
    client: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn LocalCache>,
}

impl HttpProgressSource {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        tokens: Arc<dyn LocalCache>,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Network(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        })
    }

    fn status_url(&self, user_type: UserType) -> String {
        format!("{}/api/{user_type}/registration-status", self.base_url)
    }

    async fn bearer_token(&self) -> Result<SecretString, SourceError> {
        match self.tokens.get(storage_keys::AUTH_TOKEN).await {
            Ok(Some(token)) if !token.trim().is_empty() => Ok(SecretString::from(token)),
            Ok(_) => Err(SourceError::AuthRequired),
            Err(e) => {
                warn!("Failed to read auth token: {}", e);
                Err(SourceError::AuthRequired)
            }
        }
    }

    async fn forget_token(&self) {
        if let Err(e) = self.tokens.remove(storage_keys::AUTH_TOKEN).await {
            warn!("Failed to clear rejected auth token: {}", e);
        }
    }
}

#[async_trait]
impl ProgressSource for HttpProgressSource {
    async fn fetch(&self, user_type: UserType) -> Result<Option<ServerProgress>, SourceError> {
        let token = self.bearer_token().await?;
        let url = self.status_url(user_type);
        debug!(user_type = %user_type, url = %url, "Fetching registration progress");

        let resp = self
            .client
            .get(&url)
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        match resp.status() {
            StatusCode::UNAUTHORIZED => {
                info!(user_type = %user_type, "Auth token rejected, clearing it");
                self.forget_token().await;
                Err(SourceError::AuthRequired)
            }
            StatusCode::NOT_FOUND => Ok(None),
            status if !status.is_success() => {
                let body = resp.text().await.unwrap_or_default();
                Err(SourceError::Network(format!("HTTP {status}: {body}")))
            }
            _ => resp
                .json::<ServerProgress>()
                .await
                .map(Some)
                .map_err(|e| SourceError::InvalidResponse(e.to_string())),
        }
    }
}
