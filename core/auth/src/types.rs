//! Token types exchanged with the provider's token endpoint

use core::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// OAuth tokens held in memory after a successful exchange or refresh
///
/// Never persisted; dropped on logout or when the session is cleared.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Access token for API requests
    pub access_token: String,
    /// Token type (Twitter returns "bearer")
    pub token_type: String,
    /// Space-separated scopes actually granted
    pub scope: Option<String>,
    /// Lifetime in seconds as reported by the provider
    pub expires_in: Option<i64>,
    /// Refresh token, only returned when `offline.access` was granted
    pub refresh_token: Option<String>,
    /// Absolute expiry computed when the token was received
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("expires_in", &self.expires_in)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl Token {
    /// Build a token from a token endpoint response received at `issued_at`
    pub fn from_response(response: TokenResponse, issued_at: DateTime<Utc>) -> Self {
        let expires_at = response
            .expires_in
            .map(|secs| issued_at + Duration::seconds(secs));

        Self {
            access_token: response.access_token,
            token_type: response.token_type.unwrap_or_else(|| "bearer".to_string()),
            scope: response.scope,
            expires_in: response.expires_in,
            refresh_token: response.refresh_token,
            expires_at,
        }
    }

    /// Returns true if a refresh token is available
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at <= Utc::now())
    }

    /// Check if the token expires within `window`
    pub fn expires_within(&self, window: Duration) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at <= Utc::now() + window)
    }

    /// Granted scopes as individual values
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scope
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
    }

    /// Copy with secret values shortened for display
    pub fn redacted(&self) -> Self {
        Self {
            access_token: mask(&self.access_token),
            refresh_token: self.refresh_token.as_deref().map(mask),
            ..self.clone()
        }
    }
}

fn mask(secret: &str) -> String {
    let prefix: String = secret.chars().take(6).collect();
    format!("{}…", prefix)
}

/// OAuth token response from provider (for deserialization)
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    /// Access token
    pub access_token: String,
    /// Token type (usually "bearer")
    pub token_type: Option<String>,
    /// Granted scopes
    pub scope: Option<String>,
    /// Token expiration in seconds
    pub expires_in: Option<i64>,
    /// Refresh token (may not always be returned)
    pub refresh_token: Option<String>,
}

/// OAuth error response from provider (for deserialization)
#[derive(Debug, Default, Deserialize)]
pub struct OAuthErrorResponse {
    /// Error code
    #[serde(default)]
    pub error: String,
    /// Error description
    #[serde(default)]
    pub error_description: Option<String>,
}

impl OAuthErrorResponse {
    /// Parse an error body, falling back to an empty response
    pub fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    /// Best message available: description, then code, then raw body
    pub fn message_or(&self, body: &str) -> String {
        self.error_description
            .clone()
            .filter(|d| !d.is_empty())
            .or_else(|| (!self.error.is_empty()).then(|| self.error.clone()))
            .unwrap_or_else(|| body.trim().to_string())
    }
}
