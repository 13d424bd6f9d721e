//! In-memory login session
//!
//! Ties the pieces together: one authorization attempt at a time, the
//! code exchange with the verifier from that attempt, and the resulting
//! token kept in memory until refresh, logout or clear.

use std::sync::atomic::{AtomicBool, Ordering};

use core_http::HttpClient;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::TwitterOAuthConfig;
use crate::error::{OAuthError, OAuthResult};
use crate::oauth::{self, TokenTypeHint};
use crate::provider::{OAuthClientConfig, OAuthProvider};
use crate::providers::Twitter;
use crate::request::{AuthorizationAgent, AuthorizationRequest};
use crate::types::Token;

/// Login state for a single user
pub struct LoginSession<P: OAuthProvider = Twitter> {
    provider: P,
    client: OAuthClientConfig,
    scopes: Vec<String>,
    http: HttpClient,
    in_flight: AtomicBool,
    refreshing: Mutex<()>,
    token: RwLock<Option<Token>>,
}

/// Clears the in-flight flag when a login attempt ends or is dropped
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl LoginSession<Twitter> {
    /// Create a session from loaded configuration
    ///
    /// # Errors
    ///
    /// [`OAuthError::Configuration`] if `config` does not validate or the
    /// HTTP client cannot be built.
    pub fn from_config(config: TwitterOAuthConfig) -> OAuthResult<Self> {
        config.validate()?;
        let http = HttpClient::builder().build()?;
        let provider = config.provider();
        Ok(Self::new(provider, config.client, config.scopes).with_http_client(http))
    }
}

impl<P: OAuthProvider> LoginSession<P> {
    /// Create a session for `provider` and `client`
    ///
    /// An empty `scopes` list requests the provider's defaults.
    pub fn new(provider: P, client: OAuthClientConfig, scopes: Vec<String>) -> Self {
        Self {
            provider,
            client,
            scopes,
            http: HttpClient::new(),
            in_flight: AtomicBool::new(false),
            refreshing: Mutex::new(()),
            token: RwLock::new(None),
        }
    }

    /// Use a specific HTTP client
    pub fn with_http_client(mut self, http: HttpClient) -> Self {
        self.http = http;
        self
    }

    /// The provider this session talks to
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The registered client
    pub fn client(&self) -> &OAuthClientConfig {
        &self.client
    }

    /// Run the full login flow
    ///
    /// Suspends while `agent` shows the authorization page and while the
    /// token endpoint answers. On success the token replaces any token
    /// already held.
    ///
    /// # Errors
    ///
    /// - [`OAuthError::Configuration`] before anything else if the client id
    ///   is missing; no agent or network call is made
    /// - [`OAuthError::LoginInProgress`] if another login has not resolved
    /// - [`OAuthError::Authorization`] for cancel, denial or state mismatch
    /// - [`OAuthError::TokenExchangeFailed`], [`OAuthError::Network`] or
    ///   [`OAuthError::InvalidResponse`] from the exchange
    pub async fn login<A>(&self, agent: &A) -> OAuthResult<Token>
    where
        A: AuthorizationAgent + ?Sized,
    {
        self.client.validate()?;

        // Released on every exit path, including when this future is dropped
        let _guard = InFlight::acquire(&self.in_flight).ok_or_else(|| {
            warn!("Login already in progress, ignoring new attempt");
            OAuthError::LoginInProgress
        })?;

        let request = AuthorizationRequest::new(&self.provider, &self.client, &self.scopes);
        info!(
            provider = self.provider.id(),
            redirect_uri = request.redirect_uri(),
            "Starting authorization"
        );
        debug!(url = request.authorization_url(), "Authorization URL");

        let response = agent
            .authorize(request.authorization_url(), request.redirect_uri())
            .await?;

        let code = request.resolve(response).map_err(|e| {
            warn!(error = %e, "Authorization did not complete");
            OAuthError::from(e)
        })?;

        let token = oauth::exchange_code(
            &self.http,
            &self.provider,
            &self.client,
            &code,
            request.code_verifier(),
        )
        .await?;

        *self.token.write().await = Some(token.clone());
        Ok(token)
    }

    /// Refresh the held access token
    ///
    /// Returns `Ok(None)` without any network call when no token or no
    /// refresh token is held, or when the session was cleared while the
    /// request was in flight. On failure the previous token is kept.
    /// Concurrent refreshes run one after another; readers of the held
    /// token are never blocked by the request.
    ///
    /// # Errors
    ///
    /// [`OAuthError::RefreshFailed`], [`OAuthError::Network`] or
    /// [`OAuthError::InvalidResponse`].
    pub async fn refresh(&self) -> OAuthResult<Option<Token>> {
        // Refresh tokens are single use, so a second refresh must see the
        // token stored by the first
        let _refreshing = self.refreshing.lock().await;

        let refresh = self
            .token
            .read()
            .await
            .as_ref()
            .and_then(|t| t.refresh_token.clone());
        let Some(refresh) = refresh else {
            debug!("No refresh token held, skipping refresh");
            return Ok(None);
        };

        let token =
            oauth::refresh_token(&self.http, &self.provider, &self.client, &refresh).await?;

        let mut held = self.token.write().await;
        if held.is_none() {
            debug!("Session cleared during refresh, discarding new token");
            return Ok(None);
        }
        *held = Some(token.clone());
        Ok(Some(token))
    }

    /// Revoke the held token and forget it
    ///
    /// The token is discarded even if revocation fails. Providers without a
    /// revocation endpoint only discard.
    ///
    /// # Errors
    ///
    /// [`OAuthError::RevocationFailed`] or [`OAuthError::Network`].
    pub async fn logout(&self) -> OAuthResult<()> {
        let Some(token) = self.token.write().await.take() else {
            return Ok(());
        };

        if self.provider.revoke_url().is_none() {
            info!(provider = self.provider.id(), "Logged out");
            return Ok(());
        }

        let (value, hint) = match token.refresh_token.as_deref() {
            Some(refresh) => (refresh, TokenTypeHint::RefreshToken),
            None => (token.access_token.as_str(), TokenTypeHint::AccessToken),
        };

        let result =
            oauth::revoke_token(&self.http, &self.provider, &self.client, value, hint).await;

        match &result {
            Ok(()) => info!(provider = self.provider.id(), "Logged out"),
            Err(e) => warn!(error = %e, "Logged out locally, revocation failed"),
        }

        result
    }

    /// Forget the held token without contacting the provider
    pub async fn clear(&self) {
        self.token.write().await.take();
    }

    /// Replace the held token
    pub async fn set_token(&self, token: Token) {
        *self.token.write().await = Some(token);
    }

    /// Current token, if logged in
    pub async fn token(&self) -> Option<Token> {
        self.token.read().await.clone()
    }

    /// True when a token is held
    pub async fn is_logged_in(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// True while a login attempt has not resolved
    pub fn is_login_in_progress(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::error::{AuthorizationError, ErrorCategory};
    use crate::provider::DEFAULT_REDIRECT_URI;
    use crate::request::AuthorizationResponse;

    /// Agent that records calls and answers with a fixed response
    struct ScriptedAgent {
        response: AuthorizationResponse,
        calls: AtomicUsize,
    }

    impl ScriptedAgent {
        fn new(response: AuthorizationResponse) -> Self {
            Self {
                response,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl AuthorizationAgent for ScriptedAgent {
        async fn authorize(
            &self,
            _authorization_url: &str,
            _redirect_uri: &str,
        ) -> OAuthResult<AuthorizationResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
    }

    fn session(client_id: &str) -> LoginSession {
        // Unroutable endpoints: any network call in these tests is a bug
        let provider = Twitter::custom(
            "http://127.0.0.1:9/authorize",
            "http://127.0.0.1:9/token",
            None,
        );
        LoginSession::new(
            provider,
            OAuthClientConfig::public(client_id, DEFAULT_REDIRECT_URI),
            vec![],
        )
    }

    fn token(refresh: Option<&str>) -> Token {
        Token {
            access_token: "access".into(),
            token_type: "bearer".into(),
            scope: Some("tweet.read".into()),
            expires_in: Some(7200),
            refresh_token: refresh.map(str::to_string),
            expires_at: None,
        }
    }

    #[test]
    fn test_from_config_validates() {
        let session = LoginSession::from_config(TwitterOAuthConfig::new("client-123")).unwrap();
        assert_eq!(session.client().client_id, "client-123");
        assert_eq!(session.provider(), &Twitter::twitter());

        let bad = TwitterOAuthConfig::new("client-123").with_redirect_uri("not a uri");
        let err = LoginSession::from_config(bad).err().unwrap();
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[tokio::test]
    async fn test_missing_client_id_refuses_to_start() {
        let session = session("");
        let agent = ScriptedAgent::new(AuthorizationResponse::Cancelled);

        let err = session.login(&agent).await.unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(agent.calls.load(Ordering::SeqCst), 0);
        assert!(!session.is_logged_in().await);
    }

    #[tokio::test]
    async fn test_cancel_resolves_and_releases_guard() {
        let session = session("client-123");
        let agent = ScriptedAgent::new(AuthorizationResponse::Cancelled);

        let err = session.login(&agent).await.unwrap_err();

        assert!(matches!(
            err,
            OAuthError::Authorization(AuthorizationError::Cancelled)
        ));
        assert!(!session.is_login_in_progress());
        assert_eq!(agent.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_status_polling_does_not_block_sequential_logins() {
        let session = Arc::new(session("client-123"));
        let agent = ScriptedAgent::new(AuthorizationResponse::Cancelled);
        let done = Arc::new(AtomicBool::new(false));

        let poller = {
            let session = Arc::clone(&session);
            let done = Arc::clone(&done);
            std::thread::spawn(move || {
                let mut seen = 0usize;
                while !done.load(Ordering::Relaxed) {
                    if session.is_login_in_progress() {
                        seen += 1;
                    }
                }
                seen
            })
        };

        let mut rejected = 0;
        for _ in 0..20_000 {
            if let Err(OAuthError::LoginInProgress) = session.login(&agent).await {
                rejected += 1;
            }
        }
        done.store(true, Ordering::Relaxed);
        poller.join().unwrap();

        assert_eq!(rejected, 0);
        assert!(!session.is_login_in_progress());
    }

    #[tokio::test]
    async fn test_dropped_login_releases_guard() {
        struct PendingAgent;

        #[async_trait]
        impl AuthorizationAgent for PendingAgent {
            async fn authorize(&self, _url: &str, _redirect: &str) -> OAuthResult<AuthorizationResponse> {
                std::future::pending().await
            }
        }

        let session = session("client-123");
        {
            let attempt = session.login(&PendingAgent);
            tokio::pin!(attempt);
            let polled = tokio::time::timeout(std::time::Duration::from_millis(10), &mut attempt);
            assert!(polled.await.is_err());
            assert!(session.is_login_in_progress());
        }

        assert!(!session.is_login_in_progress());
    }

    #[tokio::test]
    async fn test_provider_error_is_denied() {
        let session = session("client-123");
        let agent = ScriptedAgent::new(AuthorizationResponse::Error {
            error: "access_denied".into(),
            description: None,
        });

        let err = session.login(&agent).await.unwrap_err();

        assert!(matches!(
            err,
            OAuthError::Authorization(AuthorizationError::Denied { .. })
        ));
    }

    #[tokio::test]
    async fn test_state_mismatch_stops_before_exchange() {
        let session = session("client-123");
        let agent = ScriptedAgent::new(AuthorizationResponse::Success {
            code: "abc123".into(),
            state: Some("not-our-state".into()),
        });

        let err = session.login(&agent).await.unwrap_err();

        assert!(matches!(
            err,
            OAuthError::Authorization(AuthorizationError::StateMismatch)
        ));
    }

    #[tokio::test]
    async fn test_refresh_without_token_is_noop() {
        let session = session("client-123");
        assert!(session.refresh().await.unwrap().is_none());

        session.set_token(token(None)).await;
        assert!(session.refresh().await.unwrap().is_none());
        assert_eq!(session.token().await, Some(token(None)));
    }

    #[tokio::test]
    async fn test_clear_and_logout_without_revoke_endpoint() {
        let session = session("client-123");

        session.set_token(token(Some("refresh"))).await;
        session.clear().await;
        assert!(!session.is_logged_in().await);

        session.set_token(token(Some("refresh"))).await;
        session.logout().await.unwrap();
        assert!(session.token().await.is_none());

        // Nothing held: still fine
        session.logout().await.unwrap();
    }
}
