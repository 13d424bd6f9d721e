//! Twitter/X login from the command line using OAuth 2.0 with PKCE
//!
//! Usage:
//! ```bash
//! # Full login; paste the redirect URL when prompted
//! TWITTER_OAUTH2_CLIENT_ID=... twitter-oauth login
//!
//! # Log in and immediately exercise the refresh token
//! twitter-oauth login --refresh
//!
//! # Two-step flow: print the URL, then exchange the code yourself
//! twitter-oauth authorize-url
//! twitter-oauth exchange --code <code> --verifier <verifier>
//!
//! # Refresh or revoke an existing token
//! twitter-oauth refresh --refresh-token <token>
//! twitter-oauth revoke --token <token> --hint refresh-token
//! ```

mod agent;
mod commands;

use clap::{Args, Parser, Subcommand, ValueEnum};
use core_auth::config::{CLIENT_ID_VAR, HOST_VAR, REDIRECT_URI_VAR, SCOPES_VAR};
use core_auth::oauth::TokenTypeHint;
use core_auth::{OAuthError, OAuthResult, TwitterOAuthConfig};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "twitter-oauth",
    version,
    about = "Log in to Twitter/X with OAuth 2.0 Authorization Code + PKCE"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    config: ConfigArgs,

    /// Print tokens in full instead of shortened
    #[arg(long, global = true)]
    show_secrets: bool,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

/// Client settings; each flag falls back to its environment variable
#[derive(Args, Debug, Default)]
struct ConfigArgs {
    /// OAuth 2.0 client id
    #[arg(long, global = true, env = CLIENT_ID_VAR)]
    client_id: Option<String>,

    /// Registered redirect URI
    #[arg(long, global = true, env = REDIRECT_URI_VAR)]
    redirect_uri: Option<String>,

    /// Scope to request; repeat for several
    #[arg(long = "scope", global = true, env = SCOPES_VAR)]
    scopes: Vec<String>,

    /// Host family, `twitter` or `x`
    #[arg(long, global = true, env = HOST_VAR)]
    host: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full login flow
    Login {
        /// Refresh the token right after logging in
        #[arg(long)]
        refresh: bool,
    },

    /// Print an authorization URL with its state and verifier
    AuthorizeUrl,

    /// Exchange an authorization code obtained from `authorize-url`
    Exchange {
        /// Authorization code from the redirect
        #[arg(long)]
        code: String,

        /// Verifier printed by `authorize-url`
        #[arg(long)]
        verifier: String,
    },

    /// Generate a PKCE verifier/challenge pair
    Pkce,

    /// Exchange a refresh token for a new access token
    Refresh {
        /// Refresh token to use
        #[arg(long)]
        refresh_token: String,
    },

    /// Revoke an access or refresh token
    Revoke {
        /// Token to revoke
        #[arg(long)]
        token: String,

        /// Kind of token being revoked
        #[arg(long, value_enum, default_value_t = HintArg::AccessToken)]
        hint: HintArg,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum HintArg {
    AccessToken,
    RefreshToken,
}

impl From<HintArg> for TokenTypeHint {
    fn from(hint: HintArg) -> Self {
        match hint {
            HintArg::AccessToken => TokenTypeHint::AccessToken,
            HintArg::RefreshToken => TokenTypeHint::RefreshToken,
        }
    }
}

impl ConfigArgs {
    /// Load configuration; the client secret has no flag and comes from
    /// the environment only
    fn load(&self) -> OAuthResult<TwitterOAuthConfig> {
        TwitterOAuthConfig::from_lookup(|key| self.value_for(key).or_else(|| std::env::var(key).ok()))
    }

    fn value_for(&self, key: &str) -> Option<String> {
        match key {
            CLIENT_ID_VAR => self.client_id.clone(),
            REDIRECT_URI_VAR => self.redirect_uri.clone(),
            SCOPES_VAR => (!self.scopes.is_empty()).then(|| self.scopes.join(" ")),
            HOST_VAR => self.host.clone(),
            _ => None,
        }
    }
}

fn log_filter(verbose: bool) -> EnvFilter {
    let log_level = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
}

#[tokio::main]
async fn main() {
    // `.env` must be in the environment before clap and the log filter read it
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = dotenv {
        debug!("No .env file loaded: {}", e);
    }

    if let Err(err) = run(cli).await {
        match err.downcast_ref::<OAuthError>() {
            Some(oauth) => eprintln!("{}: {}", oauth.category().title(), oauth),
            None => eprintln!("Error: {:#}", err),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let output = commands::Output {
        show_secrets: cli.show_secrets,
    };

    // `pkce` needs no client configuration
    if let Command::Pkce = cli.command {
        return commands::pkce(&output).map(drop);
    }

    let config = cli.config.load()?;
    debug!(?config, "Configuration loaded");
    let ctx = commands::Context::from_config(config)?;

    match cli.command {
        Command::Login { refresh } => commands::login(&ctx, refresh, &output).await,
        Command::AuthorizeUrl => commands::authorize_url(&ctx, &output).map(drop),
        Command::Exchange { code, verifier } => commands::exchange(&ctx, &code, &verifier, &output)
            .await
            .map(drop),
        Command::Refresh { refresh_token } => {
            commands::refresh(&ctx, &refresh_token, &output).await.map(drop)
        }
        Command::Revoke { token, hint } => commands::revoke(&ctx, &token, hint.into()).await,
        Command::Pkce => commands::pkce(&output).map(drop),
    }
}
