//! Environment-driven client configuration
//!
//! Reads configuration from:
//! - `TWITTER_OAUTH2_CLIENT_ID` - OAuth 2.0 client id (required)
//! - `TWITTER_OAUTH2_CLIENT_SECRET` - client secret, confidential clients only
//! - `TWITTER_OAUTH2_REDIRECT_URI` - defaults to `twitteroauth://redirect`
//! - `TWITTER_OAUTH2_SCOPES` - space-separated, defaults to the provider's scopes
//! - `TWITTER_OAUTH2_HOST` - `twitter` or `x`, defaults to `twitter`

use url::Url;

use crate::error::{OAuthError, OAuthResult};
use crate::provider::{OAuthClientConfig, OAuthProvider, DEFAULT_REDIRECT_URI};
use crate::providers::{Twitter, TwitterHost};

/// Environment variable holding the client id
pub const CLIENT_ID_VAR: &str = "TWITTER_OAUTH2_CLIENT_ID";
/// Environment variable holding the client secret
pub const CLIENT_SECRET_VAR: &str = "TWITTER_OAUTH2_CLIENT_SECRET";
/// Environment variable holding the redirect URI
pub const REDIRECT_URI_VAR: &str = "TWITTER_OAUTH2_REDIRECT_URI";
/// Environment variable holding the requested scopes
pub const SCOPES_VAR: &str = "TWITTER_OAUTH2_SCOPES";
/// Environment variable selecting the host family
pub const HOST_VAR: &str = "TWITTER_OAUTH2_HOST";

/// Everything needed to start a login
#[derive(Debug, Clone)]
pub struct TwitterOAuthConfig {
    /// Registered client
    pub client: OAuthClientConfig,
    /// Scopes to request
    pub scopes: Vec<String>,
    /// Host family for the endpoints
    pub host: TwitterHost,
}

impl TwitterOAuthConfig {
    /// Build a public-client configuration with default scopes and host
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client: OAuthClientConfig::public(client_id, DEFAULT_REDIRECT_URI),
            scopes: default_scopes(),
            host: TwitterHost::default(),
        }
    }

    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::Configuration`] if the client id is missing or
    /// another value is malformed.
    pub fn from_env() -> OAuthResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// Same as [`TwitterOAuthConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> OAuthResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let client_id = get(CLIENT_ID_VAR).ok_or_else(|| {
            OAuthError::Configuration(format!("{} is not set", CLIENT_ID_VAR))
        })?;

        let redirect_uri = get(REDIRECT_URI_VAR).unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string());

        let scopes = get(SCOPES_VAR)
            .map(|s| parse_scopes(&s))
            .unwrap_or_else(default_scopes);

        let host = match get(HOST_VAR) {
            Some(value) => value.parse().map_err(|e| {
                OAuthError::Configuration(format!("{}: {}", HOST_VAR, e))
            })?,
            None => TwitterHost::default(),
        };

        let config = Self {
            client: OAuthClientConfig {
                client_id: client_id.trim().to_string(),
                client_secret: get(CLIENT_SECRET_VAR),
                redirect_uri,
            },
            scopes,
            host,
        };
        config.validate()?;

        Ok(config)
    }

    /// Replace the redirect URI
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.client.redirect_uri = redirect_uri.into();
        self
    }

    /// Replace the requested scopes
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Select the host family
    pub fn with_host(mut self, host: TwitterHost) -> Self {
        self.host = host;
        self
    }

    /// Provider for the configured host family
    pub fn provider(&self) -> Twitter {
        Twitter::for_host(self.host)
    }

    /// Check the configuration can start a flow
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::Configuration`] for an empty client id, a
    /// redirect URI that does not parse, or an empty scope list.
    pub fn validate(&self) -> OAuthResult<()> {
        self.client.validate()?;

        Url::parse(&self.client.redirect_uri).map_err(|e| {
            OAuthError::Configuration(format!(
                "Invalid redirect URI '{}': {}",
                self.client.redirect_uri, e
            ))
        })?;

        if self.scopes.is_empty() {
            return Err(OAuthError::Configuration(
                "At least one scope must be requested".to_string(),
            ));
        }

        Ok(())
    }
}

/// Split a space- or comma-separated scope list
pub fn parse_scopes(raw: &str) -> Vec<String> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn default_scopes() -> Vec<String> {
    Twitter::default()
        .default_scopes()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_client_id_is_configuration_error() {
        let err = TwitterOAuthConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, OAuthError::Configuration(ref m) if m.contains(CLIENT_ID_VAR)));
    }

    #[test]
    fn test_empty_client_id_is_configuration_error() {
        let err =
            TwitterOAuthConfig::from_lookup(lookup_from(&[(CLIENT_ID_VAR, "  ")])).unwrap_err();
        assert!(matches!(err, OAuthError::Configuration(_)));
    }

    #[test]
    fn test_defaults() {
        let config =
            TwitterOAuthConfig::from_lookup(lookup_from(&[(CLIENT_ID_VAR, "abc")])).unwrap();

        assert_eq!(config.client.client_id, "abc");
        assert_eq!(config.client.redirect_uri, "twitteroauth://redirect");
        assert!(config.client.client_secret.is_none());
        assert_eq!(
            config.scopes,
            vec!["tweet.read", "users.read", "offline.access"]
        );
        assert_eq!(config.host, TwitterHost::Twitter);
    }

    #[test]
    fn test_overrides() {
        let config = TwitterOAuthConfig::from_lookup(lookup_from(&[
            (CLIENT_ID_VAR, "abc"),
            (CLIENT_SECRET_VAR, "shh"),
            (REDIRECT_URI_VAR, "http://127.0.0.1:8080/callback"),
            (SCOPES_VAR, "tweet.read,tweet.write offline.access"),
            (HOST_VAR, "x"),
        ]))
        .unwrap();

        assert_eq!(config.client.client_secret.as_deref(), Some("shh"));
        assert_eq!(config.client.redirect_uri, "http://127.0.0.1:8080/callback");
        assert_eq!(
            config.scopes,
            vec!["tweet.read", "tweet.write", "offline.access"]
        );
        assert_eq!(config.provider(), Twitter::x());
    }

    #[test]
    fn test_bad_host_rejected() {
        let err = TwitterOAuthConfig::from_lookup(lookup_from(&[
            (CLIENT_ID_VAR, "abc"),
            (HOST_VAR, "mastodon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, OAuthError::Configuration(_)));
    }

    #[test]
    fn test_bad_redirect_rejected() {
        let config = TwitterOAuthConfig::new("abc").with_redirect_uri("not a uri");
        assert!(matches!(
            config.validate(),
            Err(OAuthError::Configuration(_))
        ));
    }

    #[test]
    fn test_empty_scopes_rejected() {
        let config = TwitterOAuthConfig::new("abc").with_scopes(Vec::<String>::new());
        assert!(config.validate().is_err());
    }
}
