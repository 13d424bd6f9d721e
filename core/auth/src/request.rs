//! Authorization request and redirect handling
//!
//! An [`AuthorizationRequest`] owns the PKCE parameters for exactly one
//! login attempt. The challenge goes out in the authorization URL; the
//! verifier from the same instance must be used for the token exchange.

use async_trait::async_trait;
use url::Url;

use crate::error::{AuthorizationError, OAuthError, OAuthResult};
use crate::oauth::generate_auth_url;
use crate::pkce::PkceParams;
use crate::provider::{OAuthClientConfig, OAuthProvider};

/// Outcome of the authorize step as reported by the browser or webview
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationResponse {
    /// Redirected back with an authorization code
    Success {
        /// Authorization code
        code: String,
        /// `state` echoed by the provider
        state: Option<String>,
    },
    /// The user dismissed the prompt before it redirected
    Cancelled,
    /// Redirected back with an `error` parameter
    Error {
        /// OAuth error code (e.g. `access_denied`)
        error: String,
        /// Optional `error_description`
        description: Option<String>,
    },
}

impl AuthorizationResponse {
    /// Parse the URL the provider redirected to
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::InvalidResponse`] if the URL does not parse, or
    /// [`AuthorizationError::MissingCode`] if it carries neither a code nor
    /// an error.
    ///
    /// # Example
    ///
    /// ```
    /// use core_auth::request::AuthorizationResponse;
    ///
    /// let response =
    ///     AuthorizationResponse::from_redirect_url("twitteroauth://redirect?state=xyz&code=abc123")
    ///         .unwrap();
    /// assert_eq!(
    ///     response,
    ///     AuthorizationResponse::Success { code: "abc123".into(), state: Some("xyz".into()) }
    /// );
    /// ```
    pub fn from_redirect_url(redirect: &str) -> OAuthResult<Self> {
        let url = Url::parse(redirect.trim()).map_err(|e| {
            OAuthError::InvalidResponse(format!("Unparseable redirect URL: {}", e))
        })?;

        let mut code = None;
        let mut state = None;
        let mut error = None;
        let mut description = None;

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                "error" => error = Some(value.into_owned()),
                "error_description" => description = Some(value.into_owned()),
                _ => {}
            }
        }

        if let Some(error) = error {
            return Ok(AuthorizationResponse::Error { error, description });
        }

        match code {
            Some(code) if !code.is_empty() => Ok(AuthorizationResponse::Success { code, state }),
            _ => Err(AuthorizationError::MissingCode.into()),
        }
    }
}

/// Presents the authorization URL to the user and waits for the redirect
///
/// Implementations open a system browser or webview and resolve once the
/// registered redirect URI is hit or the user gives up. Closing the prompt
/// must resolve to [`AuthorizationResponse::Cancelled`] rather than leaving
/// the future pending.
#[async_trait]
pub trait AuthorizationAgent: Send + Sync {
    /// Run the authorize step
    async fn authorize(
        &self,
        authorization_url: &str,
        redirect_uri: &str,
    ) -> OAuthResult<AuthorizationResponse>;
}

/// A single authorization attempt
pub struct AuthorizationRequest {
    url: String,
    redirect_uri: String,
    pkce: PkceParams,
}

impl std::fmt::Debug for AuthorizationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationRequest")
            .field("url", &self.url)
            .field("redirect_uri", &self.redirect_uri)
            .field("pkce", &self.pkce)
            .finish()
    }
}

impl AuthorizationRequest {
    /// Start a new attempt with fresh PKCE parameters
    ///
    /// `scopes` falls back to the provider defaults when empty.
    pub fn new<P: OAuthProvider>(
        provider: &P,
        client: &OAuthClientConfig,
        scopes: &[String],
    ) -> Self {
        Self::with_pkce(provider, client, scopes, PkceParams::generate())
    }

    /// Start an attempt around existing PKCE parameters
    pub fn with_pkce<P: OAuthProvider>(
        provider: &P,
        client: &OAuthClientConfig,
        scopes: &[String],
        pkce: PkceParams,
    ) -> Self {
        let scopes: Vec<&str> = scopes.iter().map(String::as_str).collect();
        let scopes = (!scopes.is_empty()).then_some(scopes.as_slice());

        let url = generate_auth_url(provider, client, &pkce.state, scopes, Some(&pkce.challenge));

        Self {
            url,
            redirect_uri: client.redirect_uri.clone(),
            pkce,
        }
    }

    /// URL to open in the browser
    pub fn authorization_url(&self) -> &str {
        &self.url
    }

    /// Redirect URI the provider will call back
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// CSRF state sent with this attempt
    pub fn state(&self) -> &str {
        &self.pkce.state
    }

    /// Challenge sent with this attempt
    pub fn code_challenge(&self) -> &str {
        &self.pkce.challenge
    }

    /// Verifier to send with the token exchange
    pub fn code_verifier(&self) -> &str {
        &self.pkce.verifier
    }

    /// Turn the agent's response into an authorization code
    ///
    /// # Errors
    ///
    /// Each failure maps to its own [`AuthorizationError`]: cancellation,
    /// provider denial, state mismatch, or a missing code.
    pub fn resolve(&self, response: AuthorizationResponse) -> Result<String, AuthorizationError> {
        match response {
            AuthorizationResponse::Success { code, state } => {
                if state.as_deref() != Some(self.pkce.state.as_str()) {
                    return Err(AuthorizationError::StateMismatch);
                }
                if code.is_empty() {
                    return Err(AuthorizationError::MissingCode);
                }
                Ok(code)
            }
            AuthorizationResponse::Cancelled => Err(AuthorizationError::Cancelled),
            AuthorizationResponse::Error { error, description } => {
                Err(AuthorizationError::Denied { error, description })
            }
        }
    }
}
