//! OAuth 2.0 Authorization Code flow with PKCE for Twitter / X
//!
//! - [`pkce`] generates verifier, challenge and state
//! - [`request`] builds the authorization URL and interprets the redirect
//! - [`oauth`] talks to the token and revocation endpoints
//! - [`session`] runs the whole login and keeps the token in memory
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod oauth;
pub mod pkce;
pub mod provider;
pub mod providers;
pub mod request;
pub mod session;
pub mod types;

pub use config::TwitterOAuthConfig;
pub use error::{AuthorizationError, ErrorCategory, OAuthError, OAuthErrorKind, OAuthResult};
pub use pkce::PkceParams;
pub use provider::{OAuthClientConfig, OAuthProvider};
pub use providers::{Twitter, TwitterHost};
pub use request::{AuthorizationAgent, AuthorizationRequest, AuthorizationResponse};
pub use session::LoginSession;
pub use types::Token;
