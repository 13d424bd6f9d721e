//! Twitter / X OAuth 2.0 provider
//!
//! # Token Expiration
//!
//! - Access tokens expire after 2 hours
//! - A refresh token is only issued when `offline.access` is requested
//! - Refresh tokens are single use; each refresh returns a new one
//! - Confidential clients must authenticate token requests with HTTP Basic Auth

use core::str::FromStr;

use crate::error::OAuthErrorKind;
use crate::provider::OAuthProvider;
use crate::types::OAuthErrorResponse;

/// Which public host family to talk to
///
/// Both families serve the same accounts; `x.com` is the newer branding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TwitterHost {
    /// `twitter.com` / `api.twitter.com`
    #[default]
    Twitter,
    /// `x.com` / `api.x.com`
    X,
}

impl FromStr for TwitterHost {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "twitter" | "twitter.com" => Ok(TwitterHost::Twitter),
            "x" | "x.com" => Ok(TwitterHost::X),
            other => Err(format!("unknown host family '{}', expected 'twitter' or 'x'", other)),
        }
    }
}

/// Twitter OAuth provider
///
/// # Example
///
/// ```
/// use core_auth::providers::Twitter;
/// use core_auth::provider::OAuthProvider;
///
/// let provider = Twitter::twitter();
/// assert_eq!(provider.id(), "twitter");
/// assert_eq!(provider.auth_url(), "https://twitter.com/i/oauth2/authorize");
/// assert_eq!(provider.token_url(), "https://api.twitter.com/2/oauth2/token");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Twitter {
    auth_url: String,
    token_url: String,
    revoke_url: Option<String>,
}

impl Twitter {
    /// Endpoints on the `twitter.com` host family
    pub fn twitter() -> Self {
        Self::for_host(TwitterHost::Twitter)
    }

    /// Endpoints on the `x.com` host family
    pub fn x() -> Self {
        Self::for_host(TwitterHost::X)
    }

    /// Endpoints for the given host family
    pub fn for_host(host: TwitterHost) -> Self {
        let (web, api) = match host {
            TwitterHost::Twitter => ("twitter.com", "api.twitter.com"),
            TwitterHost::X => ("x.com", "api.x.com"),
        };

        Self {
            auth_url: format!("https://{}/i/oauth2/authorize", web),
            token_url: format!("https://{}/2/oauth2/token", api),
            revoke_url: Some(format!("https://{}/2/oauth2/revoke", api)),
        }
    }

    /// Explicit endpoints, e.g. a local mock server
    pub fn custom(
        auth_url: impl Into<String>,
        token_url: impl Into<String>,
        revoke_url: Option<String>,
    ) -> Self {
        Self {
            auth_url: auth_url.into(),
            token_url: token_url.into(),
            revoke_url,
        }
    }
}

impl Default for Twitter {
    fn default() -> Self {
        Self::twitter()
    }
}

impl OAuthProvider for Twitter {
    fn id(&self) -> &str {
        "twitter"
    }

    fn display_name(&self) -> &str {
        "Twitter"
    }

    fn auth_url(&self) -> &str {
        &self.auth_url
    }

    fn token_url(&self) -> &str {
        &self.token_url
    }

    fn default_scopes(&self) -> &[&str] {
        // offline.access is required to get a refresh token
        &["tweet.read", "users.read", "offline.access"]
    }

    fn classify_error(&self, status: u16, body: &str) -> OAuthErrorKind {
        let error = OAuthErrorResponse::parse(body);

        match (status, error.error.as_str()) {
            // Revoked, expired or already-used refresh token
            (_, "invalid_grant") => OAuthErrorKind::RefreshTokenInvalid,
            (429, _) => OAuthErrorKind::RateLimited,
            (_, "temporarily_unavailable" | "server_error") => OAuthErrorKind::TransientError,
            (500..=599, _) => OAuthErrorKind::TransientError,
            _ => OAuthErrorKind::Unknown,
        }
    }

    fn uses_basic_auth(&self) -> bool {
        true
    }

    fn revoke_url(&self) -> Option<&str> {
        self.revoke_url.as_deref()
    }
}
