//! OAuth provider abstraction
//!
//! Provides the `OAuthProvider` trait describing an identity provider's
//! endpoints and error conventions, and `OAuthClientConfig` describing the
//! registered client.

use core::fmt;

use crate::error::{OAuthError, OAuthErrorKind, OAuthResult};

/// Trait for OAuth provider implementations
///
/// The trait provides all the information needed to perform the flow
/// (authorization URL generation, token exchange, token refresh, revocation)
/// and classify errors. [`crate::providers::Twitter`] is the shipped
/// implementation; tests point a custom instance at a mock server.
///
/// # Example
///
/// ```
/// use core_auth::provider::OAuthProvider;
/// use core_auth::error::OAuthErrorKind;
///
/// struct MockProvider;
///
/// impl OAuthProvider for MockProvider {
///     fn id(&self) -> &str { "mock" }
///     fn display_name(&self) -> &str { "Mock Provider" }
///     fn auth_url(&self) -> &str { "https://auth.example.com/oauth/authorize" }
///     fn token_url(&self) -> &str { "https://auth.example.com/oauth/token" }
///     fn default_scopes(&self) -> &[&str] { &["read"] }
///
///     fn classify_error(&self, status: u16, _body: &str) -> OAuthErrorKind {
///         if status == 429 {
///             OAuthErrorKind::RateLimited
///         } else {
///             OAuthErrorKind::Unknown
///         }
///     }
/// }
/// ```
pub trait OAuthProvider: Send + Sync {
    /// Provider identifier (e.g., "twitter")
    fn id(&self) -> &str;

    /// Human-readable display name
    fn display_name(&self) -> &str;

    /// Authorization endpoint URL
    fn auth_url(&self) -> &str;

    /// Token endpoint URL
    fn token_url(&self) -> &str;

    /// Default scopes for this provider
    ///
    /// These scopes will be used if no custom scopes are specified.
    fn default_scopes(&self) -> &[&str];

    /// Additional authorization URL parameters
    fn auth_params(&self) -> Vec<(&str, &str)> {
        vec![]
    }

    /// Classify an OAuth error response
    ///
    /// Given the HTTP status code and response body, determine the type of error.
    /// This is used to decide whether to retry, re-authenticate, or fail.
    fn classify_error(&self, status: u16, body: &str) -> OAuthErrorKind;

    /// Whether confidential clients authenticate with HTTP Basic Auth
    ///
    /// Only applies when the client has a secret. Public clients always
    /// send `client_id` in the form body.
    fn uses_basic_auth(&self) -> bool {
        false
    }

    /// Revocation endpoint (optional)
    fn revoke_url(&self) -> Option<&str> {
        None
    }
}

/// Default redirect URI registered for the app's custom scheme
pub const DEFAULT_REDIRECT_URI: &str = "twitteroauth://redirect";

/// Configuration for an OAuth client
#[derive(Clone)]
pub struct OAuthClientConfig {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret, absent for public (native app) clients
    pub client_secret: Option<String>,
    /// Redirect URI for OAuth callback, must match the registration exactly
    pub redirect_uri: String,
}

impl fmt::Debug for OAuthClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthClientConfig")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

impl OAuthClientConfig {
    /// Create a public client configuration
    pub fn public(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri: redirect_uri.into(),
        }
    }

    /// Create a confidential client configuration
    pub fn confidential(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: Some(client_secret.into()),
            redirect_uri: redirect_uri.into(),
        }
    }

    /// Check that the configuration can start a flow
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::Configuration`] if the client id or redirect
    /// URI is empty.
    pub fn validate(&self) -> OAuthResult<()> {
        if self.client_id.trim().is_empty() {
            return Err(OAuthError::Configuration(
                "OAuth client ID is missing".to_string(),
            ));
        }
        if self.redirect_uri.trim().is_empty() {
            return Err(OAuthError::Configuration(
                "Redirect URI is missing".to_string(),
            ));
        }
        Ok(())
    }
}
