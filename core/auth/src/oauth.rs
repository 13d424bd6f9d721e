//! Calls against the provider's authorize, token and revoke endpoints

use chrono::Utc;
use core_http::HttpClient;
use tracing::{debug, info, warn};

use crate::error::{OAuthError, OAuthErrorKind, OAuthResult};
use crate::pkce::CODE_CHALLENGE_METHOD;
use crate::provider::{OAuthClientConfig, OAuthProvider};
use crate::types::{OAuthErrorResponse, Token, TokenResponse};

/// Which grant a token endpoint call was made for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grant {
    AuthorizationCode,
    RefreshToken,
}

/// Token kind passed as `token_type_hint` when revoking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenTypeHint {
    /// An access token
    AccessToken,
    /// A refresh token
    RefreshToken,
}

impl TokenTypeHint {
    fn as_str(&self) -> &'static str {
        match self {
            TokenTypeHint::AccessToken => "access_token",
            TokenTypeHint::RefreshToken => "refresh_token",
        }
    }
}

/// Build the URL the user is sent to for consent
///
/// `scopes` falls back to the provider defaults when `None`. The challenge
/// is always sent with method `S256`.
///
/// # Example
///
/// ```
/// use core_auth::oauth::generate_auth_url;
/// use core_auth::provider::OAuthClientConfig;
/// use core_auth::providers::Twitter;
///
/// let client = OAuthClientConfig::public("client_id", "twitteroauth://redirect");
/// let url = generate_auth_url(&Twitter::twitter(), &client, "random_state", None, Some("challenge"));
///
/// assert!(url.contains("code_challenge_method=S256"));
/// assert!(url.contains("scope=tweet.read%20users.read%20offline.access"));
/// ```
pub fn generate_auth_url<P: OAuthProvider>(
    provider: &P,
    client: &OAuthClientConfig,
    state: &str,
    scopes: Option<&[&str]>,
    pkce_challenge: Option<&str>,
) -> String {
    let scopes_str = scopes
        .map(|s| s.join(" "))
        .unwrap_or_else(|| provider.default_scopes().join(" "));

    let mut url = format!(
        "{}?response_type=code&client_id={}&redirect_uri={}&state={}",
        provider.auth_url(),
        urlencoding::encode(&client.client_id),
        urlencoding::encode(&client.redirect_uri),
        urlencoding::encode(state),
    );

    if !scopes_str.is_empty() {
        url.push_str(&format!("&scope={}", urlencoding::encode(&scopes_str)));
    }

    for (key, value) in provider.auth_params() {
        url.push_str(&format!(
            "&{}={}",
            urlencoding::encode(key),
            urlencoding::encode(value)
        ));
    }

    if let Some(challenge) = pkce_challenge {
        url.push_str(&format!(
            "&code_challenge={}&code_challenge_method={}",
            urlencoding::encode(challenge),
            CODE_CHALLENGE_METHOD
        ));
    }

    url
}

/// Exchange an authorization code for tokens
///
/// `pkce_verifier` must come from the same request that sent the
/// challenge; the provider rejects any other verifier.
///
/// # Errors
///
/// - [`OAuthError::Network`] if the request could not be sent
/// - [`OAuthError::TokenExchangeFailed`] on a non-2xx response
/// - [`OAuthError::InvalidResponse`] if the success body does not parse
pub async fn exchange_code<P: OAuthProvider>(
    http: &HttpClient,
    provider: &P,
    client: &OAuthClientConfig,
    code: &str,
    pkce_verifier: &str,
) -> OAuthResult<Token> {
    debug!(
        provider = provider.id(),
        token_url = provider.token_url(),
        "Exchanging authorization code"
    );

    let params = vec![
        ("code", code),
        ("grant_type", "authorization_code"),
        ("client_id", client.client_id.as_str()),
        ("redirect_uri", client.redirect_uri.as_str()),
        ("code_verifier", pkce_verifier),
    ];

    let token = post_token_request(http, provider, client, params, Grant::AuthorizationCode).await?;

    info!(
        provider = provider.id(),
        scope = token.scope.as_deref().unwrap_or_default(),
        expires_in = token.expires_in,
        has_refresh_token = token.has_refresh_token(),
        "Authorization code exchanged"
    );

    Ok(token)
}

/// Refresh an access token
///
/// If the provider does not rotate the refresh token, the one passed in is
/// kept on the returned token.
///
/// # Errors
///
/// - [`OAuthError::Network`] if the request could not be sent
/// - [`OAuthError::RefreshFailed`] on a non-2xx response; check
///   [`OAuthError::requires_reauthentication`] for a dead refresh token
/// - [`OAuthError::InvalidResponse`] if the success body does not parse
pub async fn refresh_token<P: OAuthProvider>(
    http: &HttpClient,
    provider: &P,
    client: &OAuthClientConfig,
    refresh_token: &str,
) -> OAuthResult<Token> {
    debug!(provider = provider.id(), "Refreshing access token");

    let params = vec![
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
        ("client_id", client.client_id.as_str()),
    ];

    let mut token = post_token_request(http, provider, client, params, Grant::RefreshToken).await?;

    // Some providers return a new refresh token, others don't
    if token.refresh_token.is_none() {
        token.refresh_token = Some(refresh_token.to_string());
    }

    info!(
        provider = provider.id(),
        expires_in = token.expires_in,
        "Access token refreshed"
    );

    Ok(token)
}

/// Revoke a token
///
/// # Errors
///
/// Returns [`OAuthError::Configuration`] if the provider has no revocation
/// endpoint, [`OAuthError::Network`] on transport failure, or
/// [`OAuthError::RevocationFailed`] on a non-2xx response.
pub async fn revoke_token<P: OAuthProvider>(
    http: &HttpClient,
    provider: &P,
    client: &OAuthClientConfig,
    token: &str,
    hint: TokenTypeHint,
) -> OAuthResult<()> {
    let endpoint = provider.revoke_url().ok_or_else(|| {
        OAuthError::Configuration(format!(
            "Provider {} does not support token revocation",
            provider.id()
        ))
    })?;

    debug!(provider = provider.id(), hint = hint.as_str(), "Revoking token");

    let params = vec![
        ("token", token),
        ("token_type_hint", hint.as_str()),
        ("client_id", client.client_id.as_str()),
    ];

    let response = authenticated_post(http, provider, client, endpoint, params)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = OAuthErrorResponse::parse(&body).message_or(&body);
        warn!(provider = provider.id(), status, "Token revocation rejected");
        return Err(OAuthError::RevocationFailed(format!(
            "({}) {}",
            status, message
        )));
    }

    info!(provider = provider.id(), "Token revoked");
    Ok(())
}

/// Build a form POST, adding client authentication for confidential clients
fn authenticated_post<'a, P: OAuthProvider>(
    http: &HttpClient,
    provider: &P,
    client: &'a OAuthClientConfig,
    endpoint: &str,
    mut params: Vec<(&'a str, &'a str)>,
) -> reqwest::RequestBuilder {
    match client.client_secret.as_deref() {
        Some(secret) if provider.uses_basic_auth() => http
            .inner()
            .post(endpoint)
            .basic_auth(&client.client_id, Some(secret))
            .form(&params),
        Some(secret) => {
            params.push(("client_secret", secret));
            http.inner().post(endpoint).form(&params)
        }
        None => http.inner().post(endpoint).form(&params),
    }
}

async fn post_token_request<'a, P: OAuthProvider>(
    http: &HttpClient,
    provider: &P,
    client: &'a OAuthClientConfig,
    params: Vec<(&'a str, &'a str)>,
    grant: Grant,
) -> OAuthResult<Token> {
    let response = authenticated_post(http, provider, client, provider.token_url(), params)
        .send()
        .await?;
    let status = response.status().as_u16();

    if !response.status().is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(classify_and_create_error(provider, grant, status, &error_text));
    }

    let token_response: TokenResponse = response.json().await.map_err(|e| {
        OAuthError::InvalidResponse(format!("Failed to parse token response: {}", e))
    })?;

    Ok(Token::from_response(token_response, Utc::now()))
}

/// Classify an OAuth error and create the appropriate error type
fn classify_and_create_error<P: OAuthProvider>(
    provider: &P,
    grant: Grant,
    status: u16,
    body: &str,
) -> OAuthError {
    let kind = provider.classify_error(status, body);
    let message = OAuthErrorResponse::parse(body).message_or(body);

    warn!(
        provider = provider.id(),
        status,
        ?kind,
        ?grant,
        "Token endpoint returned an error"
    );

    match grant {
        // invalid_grant on a code only means the code is bad, not a refresh token
        Grant::AuthorizationCode => OAuthError::TokenExchangeFailed {
            status,
            kind: match kind {
                OAuthErrorKind::RefreshTokenInvalid => OAuthErrorKind::Unknown,
                other => other,
            },
            message,
        },
        Grant::RefreshToken => OAuthError::RefreshFailed {
            status,
            kind,
            message,
        },
    }
}
