//! Terminal stand-in for the system browser
//!
//! Prints the authorization URL and waits for the user to paste the URL the
//! provider redirected to. An empty line or end of input counts as closing
//! the browser.

use async_trait::async_trait;
use core_auth::{AuthorizationAgent, AuthorizationResponse, OAuthResult};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Reads the redirect URL from a line-oriented input
pub struct TerminalAgent<R = BufReader<Stdin>> {
    input: Mutex<R>,
}

impl TerminalAgent {
    /// Agent reading from standard input
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R> TerminalAgent<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    /// Agent reading from `input`
    pub fn new(input: R) -> Self {
        Self {
            input: Mutex::new(input),
        }
    }

    async fn read_line(&self) -> std::io::Result<Option<String>> {
        let mut line = String::new();
        let read = self.input.lock().await.read_line(&mut line).await?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

#[async_trait]
impl<R> AuthorizationAgent for TerminalAgent<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn authorize(
        &self,
        authorization_url: &str,
        redirect_uri: &str,
    ) -> OAuthResult<AuthorizationResponse> {
        eprintln!("Open this URL in a browser and approve access:\n\n  {}\n", authorization_url);
        eprintln!(
            "Then paste the URL you were redirected to (starts with {}).\nLeave empty to cancel:",
            redirect_uri
        );

        let line = match self.read_line().await {
            Ok(Some(line)) if !line.is_empty() => line,
            Ok(_) => {
                debug!("No redirect URL entered");
                return Ok(AuthorizationResponse::Cancelled);
            }
            Err(e) => {
                warn!(error = %e, "Failed to read redirect URL");
                return Ok(AuthorizationResponse::Cancelled);
            }
        };

        if !line.starts_with(redirect_uri) {
            warn!(redirect_uri, "Pasted URL does not start with the registered redirect URI");
        }

        AuthorizationResponse::from_redirect_url(&line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REDIRECT: &str = "twitteroauth://redirect";

    #[tokio::test]
    async fn test_empty_line_cancels() {
        let agent = TerminalAgent::new(BufReader::new(&b"\n"[..]));
        let response = agent.authorize("https://x.com/i/oauth2/authorize", REDIRECT).await;
        assert_eq!(response.unwrap(), AuthorizationResponse::Cancelled);
    }

    #[tokio::test]
    async fn test_end_of_input_cancels() {
        let agent = TerminalAgent::new(BufReader::new(&b""[..]));
        let response = agent.authorize("https://x.com/i/oauth2/authorize", REDIRECT).await;
        assert_eq!(response.unwrap(), AuthorizationResponse::Cancelled);
    }

    #[tokio::test]
    async fn test_pasted_redirect_is_parsed() {
        let agent = TerminalAgent::new(BufReader::new(
            &b"twitteroauth://redirect?state=s1&code=abc123\n"[..],
        ));
        let response = agent.authorize("https://x.com/i/oauth2/authorize", REDIRECT).await;
        assert_eq!(
            response.unwrap(),
            AuthorizationResponse::Success {
                code: "abc123".into(),
                state: Some("s1".into()),
            }
        );
    }

    #[tokio::test]
    async fn test_pasted_error_is_reported() {
        let agent = TerminalAgent::new(BufReader::new(
            &b"twitteroauth://redirect?error=access_denied\n"[..],
        ));
        let response = agent.authorize("https://x.com/i/oauth2/authorize", REDIRECT).await;
        assert!(matches!(
            response.unwrap(),
            AuthorizationResponse::Error { ref error, .. } if error == "access_denied"
        ));
    }
}
