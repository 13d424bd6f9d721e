//! OAuth error types

/// Classification of OAuth errors to determine appropriate action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthErrorKind {
    /// Refresh token is invalid - user must re-authenticate
    RefreshTokenInvalid,
    /// Transient error - can retry with backoff
    TransientError,
    /// Rate limited - should back off before retrying
    RateLimited,
    /// Unknown error - treat as transient
    Unknown,
}

/// Which step of the login flow an error belongs to
///
/// Used by front ends to pick the alert title shown to the user. None of
/// the categories is fatal; the user may always retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Client is not configured (e.g. missing client id)
    Configuration,
    /// The authorize step failed, was cancelled, or is already running
    Authorization,
    /// The code-for-token exchange was rejected or unreadable
    Exchange,
    /// Transport failure talking to the provider
    Network,
    /// Refreshing the access token failed
    Refresh,
    /// Revoking a token failed
    Revocation,
}

impl ErrorCategory {
    /// Short human-readable title
    pub fn title(&self) -> &'static str {
        match self {
            ErrorCategory::Configuration => "Config Error",
            ErrorCategory::Authorization => "Authorization Error",
            ErrorCategory::Exchange => "Login Error",
            ErrorCategory::Network => "Network Error",
            ErrorCategory::Refresh => "Refresh Error",
            ErrorCategory::Revocation => "Logout Error",
        }
    }
}

/// Failures of the authorize step (browser / webview)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationError {
    /// The user closed the browser or otherwise dismissed the prompt
    #[error("Authorization cancelled by user")]
    Cancelled,

    /// The provider redirected back with an `error` parameter
    #[error("Provider rejected authorization: {error}")]
    Denied {
        /// OAuth error code (e.g. `access_denied`)
        error: String,
        /// Optional `error_description` from the provider
        description: Option<String>,
    },

    /// The `state` returned does not match the one sent
    #[error("Authorization state mismatch")]
    StateMismatch,

    /// The redirect carried neither a code nor an error
    #[error("Authorization response did not include a code")]
    MissingCode,
}

/// OAuth-specific errors
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// Client configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The authorize step did not produce a code
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    /// Another login attempt has not resolved yet
    #[error("A login attempt is already in progress")]
    LoginInProgress,

    /// Token endpoint rejected the authorization code
    #[error("Token exchange failed ({status}): {message}")]
    TokenExchangeFailed {
        /// HTTP status returned by the token endpoint
        status: u16,
        /// Provider classification of the failure
        kind: OAuthErrorKind,
        /// Provider error description
        message: String,
    },

    /// Token endpoint rejected the refresh token
    #[error("Token refresh failed ({status}): {message}")]
    RefreshFailed {
        /// HTTP status returned by the token endpoint
        status: u16,
        /// Provider classification of the failure
        kind: OAuthErrorKind,
        /// Provider error description
        message: String,
    },

    /// Revocation endpoint rejected the request
    #[error("Token revocation failed: {0}")]
    RevocationFailed(String),

    /// Network error during OAuth operation
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid response from provider
    #[error("Invalid response from provider: {0}")]
    InvalidResponse(String),

    /// PKCE error
    #[error("PKCE error: {0}")]
    Pkce(String),
}

impl OAuthError {
    /// Get the classification of this error
    ///
    /// This helps consumers determine the appropriate action:
    /// - `RefreshTokenInvalid` - User must re-authenticate
    /// - `RateLimited` - Should back off before retrying
    /// - `TransientError` - Can retry with backoff
    /// - `Unknown` - Treat as transient
    pub fn kind(&self) -> OAuthErrorKind {
        match self {
            OAuthError::TokenExchangeFailed { kind, .. } => *kind,
            OAuthError::RefreshFailed { kind, .. } => *kind,
            OAuthError::Network(_) => OAuthErrorKind::TransientError,
            _ => OAuthErrorKind::Unknown,
        }
    }

    /// Which step of the flow produced this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            OAuthError::Configuration(_) => ErrorCategory::Configuration,
            OAuthError::Authorization(_) | OAuthError::LoginInProgress => {
                ErrorCategory::Authorization
            }
            OAuthError::TokenExchangeFailed { .. }
            | OAuthError::InvalidResponse(_)
            | OAuthError::Pkce(_) => ErrorCategory::Exchange,
            OAuthError::Network(_) => ErrorCategory::Network,
            OAuthError::RefreshFailed { .. } => ErrorCategory::Refresh,
            OAuthError::RevocationFailed(_) => ErrorCategory::Revocation,
        }
    }

    /// True when retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            OAuthErrorKind::TransientError | OAuthErrorKind::RateLimited
        )
    }

    /// True when the refresh token is dead and the user must log in again
    pub fn requires_reauthentication(&self) -> bool {
        matches!(
            self,
            OAuthError::RefreshFailed {
                kind: OAuthErrorKind::RefreshTokenInvalid,
                ..
            }
        )
    }
}

/// Result type for OAuth operations
pub type OAuthResult<T> = Result<T, OAuthError>;

impl From<reqwest::Error> for OAuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            OAuthError::Network("Request timed out".to_string())
        } else if err.is_connect() {
            OAuthError::Network(format!("Connection failed: {}", err))
        } else {
            OAuthError::Network(err.to_string())
        }
    }
}

impl From<core_types::Error> for OAuthError {
    fn from(err: core_types::Error) -> Self {
        // Retrying cannot fix a client that failed to build
        match err {
            core_types::Error::Http(msg) => OAuthError::Configuration(msg),
        }
    }
}
