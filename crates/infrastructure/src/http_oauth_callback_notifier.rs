use actionhub_application::{OAuthCallbackNotifier, OAuthCredentials};
use actionhub_core::{AppError, AppResult};
use async_trait::async_trait;
use tracing::info;
use url::Url;

use crate::destinations::{rejection, transport_error};

/// Delivers negotiated OAuth credentials to the caller's return URL as JSON.
#[derive(Clone)]
pub struct HttpOAuthCallbackNotifier {
    http_client: reqwest::Client,
}

impl HttpOAuthCallbackNotifier {
    /// Creates a notifier over a shared HTTP client.
    #[must_use]
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl OAuthCallbackNotifier for HttpOAuthCallbackNotifier {
    async fn deliver(&self, return_url: &str, credentials: &OAuthCredentials) -> AppResult<()> {
        let url = Url::parse(return_url).map_err(|error| {
            AppError::Validation(format!("return url '{return_url}' is invalid: {error}"))
        })?;

        let response = self
            .http_client
            .post(url)
            .json(credentials)
            .send()
            .await
            .map_err(|error| transport_error("oauth callback failed", &error))?;

        if !response.status().is_success() {
            return Err(rejection("oauth callback", response).await);
        }

        info!(
            host = response.url().host_str().unwrap_or_default(),
            "delivered oauth credentials to caller"
        );
        Ok(())
    }
}
