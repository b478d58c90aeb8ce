//! Credential context supplied by the host.
//!
//! The engine never performs authentication handshakes; whoever invokes it
//! provides a token source. The host typically wraps its own refresh
//! machinery in an [`AccessTokenProvider`].

use async_trait::async_trait;
use sheetsync_domain::Result;

/// Source of bearer tokens for the Google APIs.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// A currently valid access token.
    async fn access_token(&self) -> Result<String>;
}

/// Fixed token, for tests and short-lived invocations.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}
