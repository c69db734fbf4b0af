use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use derive_more::derive::Display;

use crate::{
    server_config::cfg,
    store::CredentialStore,
};

use super::oauth::{OauthError, RefreshTokenExchange};

#[derive(Debug, Display)]
pub enum TokenError {
    /// No stored connection for the mailbox. Misconfiguration, not an auth
    /// failure.
    #[display("mailbox not connected: {_0}")]
    NotConnected(String),
    /// The refresh token is missing or was rejected; the user has to go
    /// through consent again.
    #[display("reauthentication required: {_0}")]
    ReauthRequired(String),
    /// The refresh exchange failed for a reason other than revocation.
    #[display("token refresh failed: {_0}")]
    RefreshFailed(String),
    #[display("credential store error: {_0}")]
    Store(anyhow::Error),
}

impl std::error::Error for TokenError {}

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Owns the credential lifecycle for connected mailboxes. Called once per
/// poll cycle; the returned token is reused for the whole batch.
pub struct TokenManager {
    credentials: Arc<dyn CredentialStore>,
    oauth: Arc<dyn RefreshTokenExchange>,
}

impl TokenManager {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        oauth: Arc<dyn RefreshTokenExchange>,
    ) -> Self {
        TokenManager { credentials, oauth }
    }

    /// Return a usable access token for the mailbox, refreshing and
    /// persisting it first when the stored one is at or past expiry.
    pub async fn valid_access_token(&self, mailbox_id: &str) -> Result<AccessToken, TokenError> {
        let conn = self
            .credentials
            .load_connection(mailbox_id)
            .await
            .map_err(TokenError::Store)?
            .ok_or_else(|| TokenError::NotConnected(mailbox_id.to_string()))?;

        if !access_is_expired(conn.expires_at) {
            return Ok(AccessToken {
                token: conn.access_token,
                expires_at: conn.expires_at,
            });
        }

        let refresh_token = conn
            .refresh_token
            .as_deref()
            .ok_or_else(|| TokenError::ReauthRequired(mailbox_id.to_string()))?;

        let resp = match self.oauth.exchange(refresh_token).await {
            Ok(resp) => resp,
            Err(OauthError::ExpiredOrRevoked) => {
                tracing::info!(
                    "Refresh token for mailbox {} expired or revoked, flagging for reauthentication",
                    mailbox_id
                );
                return Err(TokenError::ReauthRequired(mailbox_id.to_string()));
            }
            Err(e) => return Err(TokenError::RefreshFailed(e.to_string())),
        };

        let expires_at = Utc::now() + Duration::seconds(resp.expires_in as i64);
        self.credentials
            .update_access_token(mailbox_id, &resp.access_token, expires_at)
            .await
            .map_err(TokenError::Store)?;

        tracing::info!("Refreshed access token for mailbox {}", mailbox_id);

        Ok(AccessToken {
            token: resp.access_token,
            expires_at,
        })
    }
}

/// Tokens count as expired slightly before their stated expiry so a token
/// cannot lapse mid-batch.
fn access_is_expired(expires_at: DateTime<Utc>) -> bool {
    expires_at - Duration::seconds(cfg.sync.token_expiry_leeway_secs) <= Utc::now()
}
