//! Catalog token store and refresh flow
//!
//! Credentials live in a JSON store holding one entry per account. The
//! pipeline only ever asks for request headers and a refresh when the
//! stored token has expired; it never inspects token contents.
//!
//! The interactive first-time authorization grant is out of scope; the
//! store is expected to already carry a refresh token.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{Duration, NaiveDateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Timestamp format used for `expiry_date` in the store
const EXPIRY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Authenticator errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Credential store error: {0}")]
    Store(String),

    #[error("Account {0} not present in credential store")]
    UnknownAccount(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Token refresh failed with HTTP {0}: {1}")]
    RefreshFailed(u16, String),

    #[error("Malformed token in store: {0}")]
    InvalidToken(String),
}

/// One account's entry in the credential store
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AccountKeys {
    client_id: String,
    client_secret: String,
    access_token: String,
    refresh_token: String,
    token_url: String,
    /// Formatted with [`EXPIRY_FORMAT`], UTC
    expiry_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
}

/// Successful token-endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Produces valid auth headers for the catalog API, refreshing the access
/// token through the provider's token endpoint when expired.
pub struct Authenticator {
    store_path: PathBuf,
    account: String,
    keys: AccountKeys,
    http: reqwest::Client,
}

impl Authenticator {
    /// Load the given account's entry from the credential store.
    pub fn load(store_path: &Path, account: &str) -> Result<Self, AuthError> {
        let content = std::fs::read_to_string(store_path)
            .map_err(|e| AuthError::Store(format!("Read {} failed: {}", store_path.display(), e)))?;
        let mut store: HashMap<String, AccountKeys> = serde_json::from_str(&content)
            .map_err(|e| AuthError::Store(format!("Parse {} failed: {}", store_path.display(), e)))?;

        let keys = store
            .remove(account)
            .ok_or_else(|| AuthError::UnknownAccount(account.to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| AuthError::Network(e.to_string()))?;

        Ok(Self {
            store_path: store_path.to_path_buf(),
            account: account.to_string(),
            keys,
            http,
        })
    }

    /// Request headers carrying the current bearer token.
    pub fn headers(&self) -> Result<HeaderMap, AuthError> {
        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {}", self.keys.access_token);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&bearer)
                .map_err(|e| AuthError::InvalidToken(e.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// Whether the stored access token has passed its expiry timestamp.
    ///
    /// An unparseable timestamp counts as expired so the run refreshes
    /// rather than issuing requests with a token of unknown age.
    pub fn is_expired(&self) -> bool {
        match NaiveDateTime::parse_from_str(&self.keys.expiry_date, EXPIRY_FORMAT) {
            Ok(expiry) => expiry < Utc::now().naive_utc(),
            Err(_) => {
                warn!(
                    expiry = %self.keys.expiry_date,
                    "Unparseable expiry date in credential store, treating token as expired"
                );
                true
            }
        }
    }

    /// Exchange the refresh token for a new access token and persist the
    /// rotated entry back to the store.
    pub async fn refresh(&mut self) -> Result<(), AuthError> {
        let basic = BASE64.encode(format!(
            "{}:{}",
            self.keys.client_id, self.keys.client_secret
        ));

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", self.keys.refresh_token.as_str()),
        ];

        let response = self
            .http
            .post(&self.keys.token_url)
            .header(AUTHORIZATION, format!("Basic {basic}"))
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::RefreshFailed(status.as_u16(), body));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Network(format!("Token response parse failed: {e}")))?;

        let expiry = Utc::now().naive_utc() + Duration::seconds(token.expires_in);
        self.keys.access_token = token.access_token;
        self.keys.expiry_date = expiry.format(EXPIRY_FORMAT).to_string();
        if let Some(scope) = token.scope {
            self.keys.scope = Some(scope);
        }
        if let Some(refresh_token) = token.refresh_token {
            self.keys.refresh_token = refresh_token;
        }

        self.persist()?;
        info!(account = %self.account, "Access token refreshed");
        Ok(())
    }

    /// Write the current entry back without disturbing other accounts.
    fn persist(&self) -> Result<(), AuthError> {
        let content = std::fs::read_to_string(&self.store_path)
            .map_err(|e| AuthError::Store(format!("Read store failed: {e}")))?;
        let mut store: HashMap<String, serde_json::Value> = serde_json::from_str(&content)
            .map_err(|e| AuthError::Store(format!("Parse store failed: {e}")))?;

        let entry = serde_json::to_value(&self.keys)
            .map_err(|e| AuthError::Store(format!("Serialize entry failed: {e}")))?;
        store.insert(self.account.clone(), entry);

        let serialized = serde_json::to_string_pretty(&store)
            .map_err(|e| AuthError::Store(format!("Serialize store failed: {e}")))?;
        std::fs::write(&self.store_path, serialized)
            .map_err(|e| AuthError::Store(format!("Write store failed: {e}")))?;
        Ok(())
    }
}
