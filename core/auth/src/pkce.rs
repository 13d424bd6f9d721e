//! PKCE (Proof Key for Code Exchange) support
//!
//! PKCE is an extension to OAuth 2.0 that prevents authorization code
//! interception attacks. Twitter requires it for every OAuth 2.0 user
//! context login, public or confidential client alike.
//!
//! # Usage
//!
//! ```
//! use core_auth::pkce::{generate_code_verifier, generate_code_challenge, generate_state};
//!
//! // Generate PKCE parameters
//! let verifier = generate_code_verifier();
//! let challenge = generate_code_challenge(&verifier);
//! let state = generate_state();
//!
//! // Include challenge in auth URL: &code_challenge={challenge}&code_challenge_method=S256
//! // Keep verifier in memory until token exchange
//! // Include verifier in token exchange: &code_verifier={verifier}
//! ```

use core::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use sha2::{Digest, Sha256};

use crate::error::{OAuthError, OAuthResult};

/// Challenge method sent alongside the code challenge
pub const CODE_CHALLENGE_METHOD: &str = "S256";

/// Number of random bytes behind a code verifier
const VERIFIER_BYTES: usize = 32;

/// Number of random bytes behind a state parameter
const STATE_BYTES: usize = 16;

/// Generate a code verifier from 32 CSPRNG bytes
///
/// RFC 7636 allows 43 to 128 characters; 32 bytes encode to exactly 43
/// base64url characters with no padding.
///
/// # Example
///
/// ```
/// use core_auth::pkce::generate_code_verifier;
///
/// let verifier = generate_code_verifier();
/// assert!(verifier.len() >= 43);
/// assert!(verifier.len() <= 128);
/// ```
pub fn generate_code_verifier() -> String {
    use rand::Rng;
    let random_bytes: [u8; VERIFIER_BYTES] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Derive the S256 challenge for `verifier`
///
/// `BASE64URL(SHA256(verifier))` without padding.
///
/// # Example
///
/// ```
/// use core_auth::pkce::{generate_code_verifier, generate_code_challenge};
///
/// let verifier = generate_code_verifier();
/// let challenge = generate_code_challenge(&verifier);
///
/// // Challenge is different from verifier
/// assert_ne!(verifier, challenge);
/// ```
pub fn generate_code_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    let hash = hasher.finalize();
    URL_SAFE_NO_PAD.encode(hash)
}

/// Check that `challenge` is the S256 challenge of `verifier`
pub fn verify_code_challenge(verifier: &str, challenge: &str) -> bool {
    generate_code_challenge(verifier) == challenge
}

/// Generate a CSRF `state` value, checked again when the redirect arrives
pub fn generate_state() -> String {
    use rand::Rng;
    let random_bytes: [u8; STATE_BYTES] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Verifier, challenge and state for one authorization attempt
#[derive(Clone)]
pub struct PkceParams {
    /// Sent only with the token exchange
    pub verifier: String,
    /// Sent in the authorization URL
    pub challenge: String,
    /// Sent in the authorization URL and echoed back on redirect
    pub state: String,
}

impl fmt::Debug for PkceParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PkceParams")
            .field("verifier", &"[REDACTED]")
            .field("challenge", &self.challenge)
            .field("state", &self.state)
            .finish()
    }
}

impl PkceParams {
    /// Fresh parameters from the thread-local RNG
    pub fn generate() -> Self {
        let verifier = generate_code_verifier();
        Self::from_verifier(verifier, generate_state())
    }

    /// Generate PKCE parameters straight from the operating system RNG
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::Pkce`] if the OS random source is unavailable.
    pub fn try_generate() -> OAuthResult<Self> {
        use rand::rngs::OsRng;
        use rand::TryRngCore;

        let mut verifier_bytes = [0u8; VERIFIER_BYTES];
        let mut state_bytes = [0u8; STATE_BYTES];
        OsRng
            .try_fill_bytes(&mut verifier_bytes)
            .and_then(|_| OsRng.try_fill_bytes(&mut state_bytes))
            .map_err(|e| OAuthError::Pkce(format!("Random source unavailable: {}", e)))?;

        Ok(Self::from_verifier(
            URL_SAFE_NO_PAD.encode(verifier_bytes),
            URL_SAFE_NO_PAD.encode(state_bytes),
        ))
    }

    /// Build parameters around a known verifier and state
    pub fn from_verifier(verifier: impl Into<String>, state: impl Into<String>) -> Self {
        let verifier = verifier.into();
        let challenge = generate_code_challenge(&verifier);

        Self {
            verifier,
            challenge,
            state: state.into(),
        }
    }
}

impl Default for PkceParams {
    fn default() -> Self {
        Self::generate()
    }
}
