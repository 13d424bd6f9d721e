//! Subcommand implementations

use anyhow::Context as _;
use core_auth::oauth::{self, TokenTypeHint};
use core_auth::pkce::CODE_CHALLENGE_METHOD;
use core_auth::{
    AuthorizationRequest, LoginSession, OAuthResult, PkceParams, Token, Twitter,
    TwitterOAuthConfig,
};
use core_http::HttpClient;
use serde_json::{json, Value};
use tracing::info;

use crate::agent::TerminalAgent;

/// Output preferences shared by all commands
pub struct Output {
    /// Print tokens in full
    pub show_secrets: bool,
}

impl Output {
    fn token(&self, token: &Token) -> anyhow::Result<()> {
        self.print(self.token_json(token)?)
    }

    fn token_json(&self, token: &Token) -> anyhow::Result<Value> {
        let shown = if self.show_secrets {
            token.clone()
        } else {
            token.redacted()
        };
        serde_json::to_value(shown).context("serialising token")
    }

    fn print(&self, value: Value) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(&value)?);
        Ok(())
    }
}

/// What every command needs to talk to the provider
pub struct Context {
    /// Loaded configuration
    pub config: TwitterOAuthConfig,
    /// Endpoints for the configured host
    pub provider: Twitter,
    /// Client used for token, refresh and revoke requests
    pub http: HttpClient,
}

impl Context {
    /// Resolve the provider and build the HTTP client for `config`
    pub fn from_config(config: TwitterOAuthConfig) -> OAuthResult<Self> {
        let http = HttpClient::builder().build()?;
        Ok(Self {
            provider: config.provider(),
            config,
            http,
        })
    }
}

/// `login`: full flow through the terminal agent
pub async fn login(ctx: &Context, refresh: bool, output: &Output) -> anyhow::Result<()> {
    let session = LoginSession::from_config(ctx.config.clone())?.with_http_client(ctx.http.clone());
    let agent = TerminalAgent::stdin();

    let token = session.login(&agent).await?;
    info!("Logged in");
    output.token(&token)?;

    if refresh {
        match session.refresh().await? {
            Some(refreshed) => {
                info!("Token refreshed");
                output.token(&refreshed)?;
            }
            None => info!("No refresh token granted; request the offline.access scope to enable refresh"),
        }
    }

    Ok(())
}

/// `authorize-url`: first half of the two-step flow
pub fn authorize_url(ctx: &Context, output: &Output) -> anyhow::Result<AuthorizationRequest> {
    let request = AuthorizationRequest::with_pkce(
        &ctx.provider,
        &ctx.config.client,
        &ctx.config.scopes,
        PkceParams::try_generate()?,
    );

    // The verifier is needed for `exchange`, so it is always printed in full
    output.print(json!({
        "url": request.authorization_url(),
        "state": request.state(),
        "code_verifier": request.code_verifier(),
        "code_challenge": request.code_challenge(),
    }))?;
    Ok(request)
}

/// `exchange`: second half of the two-step flow
pub async fn exchange(
    ctx: &Context,
    code: &str,
    verifier: &str,
    output: &Output,
) -> anyhow::Result<Token> {
    let token =
        oauth::exchange_code(&ctx.http, &ctx.provider, &ctx.config.client, code, verifier).await?;
    output.token(&token)?;
    Ok(token)
}

/// `pkce`: print a fresh pair
pub fn pkce(output: &Output) -> anyhow::Result<PkceParams> {
    let params = PkceParams::try_generate()?;
    output.print(pkce_json(&params))?;
    Ok(params)
}

fn pkce_json(params: &PkceParams) -> Value {
    json!({
        "code_verifier": params.verifier,
        "code_challenge": params.challenge,
        "code_challenge_method": CODE_CHALLENGE_METHOD,
    })
}

/// `refresh`: swap a refresh token for a new access token
pub async fn refresh(ctx: &Context, refresh_token: &str, output: &Output) -> anyhow::Result<Token> {
    let token =
        oauth::refresh_token(&ctx.http, &ctx.provider, &ctx.config.client, refresh_token).await?;
    output.token(&token)?;
    Ok(token)
}

/// `revoke`: invalidate a token at the provider
pub async fn revoke(ctx: &Context, token: &str, hint: TokenTypeHint) -> anyhow::Result<()> {
    oauth::revoke_token(&ctx.http, &ctx.provider, &ctx.config.client, token, hint).await?;
    eprintln!("Token revoked");
    Ok(())
}

#[cfg(test)]
mod tests {
    use core_auth::pkce::verify_code_challenge;
    use core_auth::{ErrorCategory, OAuthError};
    use url::Url;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const HIDDEN: Output = Output { show_secrets: false };

    fn context_for(server: &MockServer) -> Context {
        let http = HttpClient::from_client(
            reqwest::Client::builder()
                .no_proxy()
                .build()
                .expect("Failed to create HTTP client"),
        );
        Context {
            config: TwitterOAuthConfig::new("client-123"),
            provider: Twitter::custom(
                format!("{}/i/oauth2/authorize", server.uri()),
                format!("{}/2/oauth2/token", server.uri()),
                Some(format!("{}/2/oauth2/revoke", server.uri())),
            ),
            http,
        }
    }

    fn token_body(access: &str, refresh: &str) -> Value {
        json!({
            "token_type": "bearer",
            "expires_in": 7200,
            "access_token": access,
            "refresh_token": refresh,
            "scope": "tweet.read users.read offline.access",
        })
    }

    #[tokio::test]
    async fn test_authorize_url_then_exchange() {
        let server = MockServer::start().await;
        let ctx = context_for(&server);

        let request = authorize_url(&ctx, &HIDDEN).unwrap();

        let url = Url::parse(request.authorization_url()).unwrap();
        assert!(url.as_str().starts_with(&server.uri()));
        let challenge = url
            .query_pairs()
            .find(|(k, _)| k == "code_challenge")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert!(verify_code_challenge(request.code_verifier(), &challenge));

        Mock::given(method("POST"))
            .and(path("/2/oauth2/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=abc123"))
            .and(body_string_contains(format!(
                "code_verifier={}",
                request.code_verifier()
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("access", "refresh")))
            .expect(1)
            .mount(&server)
            .await;

        let token = exchange(&ctx, "abc123", request.code_verifier(), &HIDDEN)
            .await
            .unwrap();
        assert_eq!(token.access_token, "access");
        assert_eq!(token.refresh_token.as_deref(), Some("refresh"));
    }

    #[tokio::test]
    async fn test_exchange_rejection_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/oauth2/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_request",
                "error_description": "Value passed for the authorization code was invalid."
            })))
            .mount(&server)
            .await;

        let err = exchange(&context_for(&server), "stale", "verifier", &HIDDEN)
            .await
            .unwrap_err();

        let oauth = err.downcast_ref::<OAuthError>().unwrap();
        assert_eq!(oauth.category(), ErrorCategory::Exchange);
    }

    #[tokio::test]
    async fn test_refresh_command() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/oauth2/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=old-refresh"))
            .and(body_string_contains("client_id=client-123"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(token_body("fresh-access", "fresh-refresh")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let token = refresh(&context_for(&server), "old-refresh", &HIDDEN)
            .await
            .unwrap();

        assert_eq!(token.access_token, "fresh-access");
        assert_eq!(token.refresh_token.as_deref(), Some("fresh-refresh"));
    }

    #[tokio::test]
    async fn test_refresh_command_rejected_token_needs_login() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/oauth2/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Value passed for the token was invalid."
            })))
            .mount(&server)
            .await;

        let err = refresh(&context_for(&server), "used-refresh", &HIDDEN)
            .await
            .unwrap_err();

        let oauth = err.downcast_ref::<OAuthError>().unwrap();
        assert_eq!(oauth.category(), ErrorCategory::Refresh);
        assert!(oauth.requires_reauthentication());
    }

    #[tokio::test]
    async fn test_revoke_command_sends_hint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/oauth2/revoke"))
            .and(body_string_contains("token=old-refresh"))
            .and(body_string_contains("token_type_hint=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "revoked": true })))
            .expect(1)
            .mount(&server)
            .await;

        revoke(&context_for(&server), "old-refresh", TokenTypeHint::RefreshToken)
            .await
            .unwrap();
    }

    #[test]
    fn test_pkce_prints_full_verifier() {
        let params = pkce(&HIDDEN).unwrap();
        let printed = pkce_json(&params);

        let verifier = printed["code_verifier"].as_str().unwrap();
        assert_eq!(verifier, params.verifier);
        assert_eq!(verifier.len(), 43);
        assert!(verify_code_challenge(
            verifier,
            printed["code_challenge"].as_str().unwrap()
        ));
        assert_eq!(printed["code_challenge_method"], "S256");
    }

    #[test]
    fn test_token_output_masks_unless_asked() {
        let token = Token {
            access_token: "access-token-value".into(),
            token_type: "bearer".into(),
            scope: None,
            expires_in: Some(7200),
            refresh_token: Some("refresh-token-value".into()),
            expires_at: None,
        };

        let hidden = HIDDEN.token_json(&token).unwrap();
        assert_eq!(hidden, serde_json::to_value(token.redacted()).unwrap());
        assert_ne!(hidden["access_token"], "access-token-value");

        let shown = Output { show_secrets: true }.token_json(&token).unwrap();
        assert_eq!(shown["access_token"], "access-token-value");
        assert_eq!(shown["refresh_token"], "refresh-token-value");
    }

    #[test]
    fn test_context_uses_configured_host() {
        let config = TwitterOAuthConfig::new("client-123").with_host(core_auth::TwitterHost::X);
        let ctx = Context::from_config(config).unwrap();
        assert_eq!(ctx.provider, Twitter::x());
    }
}
