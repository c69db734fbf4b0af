use async_trait::async_trait;
use derive_more::derive::Display;
use serde::Deserialize;

use crate::{server_config::cfg, HttpClient};

#[derive(Debug, Display)]
pub enum OauthError {
    /// The provider rejected the refresh token outright. Reconnection is the
    /// only way forward.
    ExpiredOrRevoked,
    BadOauthResponse,
    Unexpected(String),
}

impl std::error::Error for OauthError {}

pub type OauthResult<T> = Result<T, OauthError>;

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshTokenResponse {
    pub access_token: String,
    pub expires_in: u64,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Seam over the provider's token endpoint so the refresh path is testable
/// without network access.
#[async_trait]
pub trait RefreshTokenExchange: Send + Sync {
    async fn exchange(&self, refresh_token: &str) -> OauthResult<RefreshTokenResponse>;
}

/// Refresh-token exchange against the Google OAuth token endpoint.
pub struct GoogleOauth {
    http_client: HttpClient,
}

impl GoogleOauth {
    pub fn new(http_client: HttpClient) -> Self {
        GoogleOauth { http_client }
    }
}

#[async_trait]
impl RefreshTokenExchange for GoogleOauth {
    async fn exchange(&self, refresh_token: &str) -> OauthResult<RefreshTokenResponse> {
        let resp = self
            .http_client
            .post(&cfg.gmail_config.token_uri)
            .form(&[
                ("client_id", cfg.gmail_config.client_id.as_str()),
                ("client_secret", cfg.gmail_config.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Error refreshing token: {:?}", e);
                OauthError::BadOauthResponse
            })?;

        let resp = resp.json::<serde_json::Value>().await.map_err(|e| {
            tracing::error!("Unexpected serde error: {:?}", e);
            OauthError::Unexpected(e.to_string())
        })?;

        if resp.get("error").is_some() {
            match resp.get("error_description").and_then(|d| d.as_str()) {
                Some("Token has been expired or revoked.") => {
                    return Err(OauthError::ExpiredOrRevoked);
                }
                Some(desc) => {
                    tracing::error!("Unexpected error refreshing token: {:?}", desc);
                    return Err(OauthError::Unexpected(desc.to_string()));
                }
                None => {
                    tracing::error!("Unknown error refreshing token: {:?}", resp);
                    return Err(OauthError::Unexpected(resp.to_string()));
                }
            };
        }

        let resp = serde_json::from_value::<RefreshTokenResponse>(resp.clone()).map_err(|_| {
            tracing::error!("Unexpected oauth2 response: {:?}", resp);
            OauthError::BadOauthResponse
        })?;

        Ok(resp)
    }
}
