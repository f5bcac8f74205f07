use std::fmt::{Debug, Formatter};

use actionhub_core::AppResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ActionRequest;

/// Provider tokens plus the redirect URI they were negotiated for.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthCredentials {
    /// Token response returned by the provider.
    pub tokens: Value,
    /// Redirect URI used during the code exchange.
    pub redirect: String,
}

impl OAuthCredentials {
    /// Returns a string field of the token response.
    #[must_use]
    pub fn token(&self, name: &str) -> Option<&str> {
        self.tokens.get(name).and_then(Value::as_str)
    }

    /// Returns the bearer access token.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.token("access_token")
    }
}

impl Debug for OAuthCredentials {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("OAuthCredentials")
            .field("tokens", &"<redacted>")
            .field("redirect", &self.redirect)
            .finish()
    }
}

/// OAuth capability of an action plugin.
#[async_trait]
pub trait OAuthAction: Send + Sync {
    /// Builds the provider authorize URL carrying the sealed `state`.
    async fn oauth_url(&self, redirect_uri: &str, state: &str) -> AppResult<String>;

    /// Exchanges an authorization code for provider tokens.
    async fn oauth_fetch_info(&self, code: &str, redirect_uri: &str) -> AppResult<Value>;

    /// Checks whether the request's credentials are still accepted.
    async fn oauth_check(&self, request: &ActionRequest) -> AppResult<()>;
}

/// Port delivering negotiated credentials back to the caller.
#[async_trait]
pub trait OAuthCallbackNotifier: Send + Sync {
    /// Posts `{tokens, redirect}` to the caller supplied return URL.
    async fn deliver(&self, return_url: &str, credentials: &OAuthCredentials) -> AppResult<()>;
}
