//! Minimal OAuth2 authorization-code client shared by OAuth destinations.

use actionhub_core::{AppError, AppResult};
use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

/// Provider endpoints and client registration.
#[derive(Debug, Clone)]
pub struct OAuth2ClientConfig {
    /// Registered client identifier.
    pub client_id: String,
    /// Registered client secret.
    pub client_secret: String,
    /// Provider authorization endpoint.
    pub authorize_url: Url,
    /// Provider token endpoint.
    pub token_url: Url,
    /// Scopes requested during authorization.
    pub scopes: Vec<String>,
}

/// OAuth2 client speaking the authorization-code and refresh-token grants.
#[derive(Clone)]
pub struct OAuth2Client {
    http_client: reqwest::Client,
    config: OAuth2ClientConfig,
}

impl OAuth2Client {
    /// Creates a client over a shared HTTP client.
    #[must_use]
    pub fn new(http_client: reqwest::Client, config: OAuth2ClientConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    /// Builds the provider authorize URL.
    #[must_use]
    pub fn authorize_url(&self, redirect_uri: &str, state: &str) -> String {
        let mut url = self.config.authorize_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", self.config.client_id.as_str())
                .append_pair("redirect_uri", redirect_uri)
                .append_pair("state", state);
            if !self.config.scopes.is_empty() {
                query.append_pair("scope", self.config.scopes.join(" ").as_str());
            }
        }
        url.to_string()
    }

    /// Exchanges an authorization code for the provider token response.
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> AppResult<Value> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ])
        .await
    }

    /// Refreshes an access token.
    ///
    /// Providers that do not rotate refresh tokens omit them from the
    /// response, so the previous refresh token is carried over.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<Value> {
        let mut tokens = self
            .token_request(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;

        if let Some(object) = tokens.as_object_mut() {
            object
                .entry("refresh_token")
                .or_insert_with(|| Value::String(refresh_token.to_owned()));
        }
        Ok(tokens)
    }

    async fn token_request(&self, grant: &[(&str, &str)]) -> AppResult<Value> {
        let mut form = vec![
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];
        form.extend_from_slice(grant);

        let response = self
            .http_client
            .post(self.config.token_url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|error| AppError::Destination {
                status: None,
                message: format!("token endpoint unreachable: {error}"),
            })?;

        let status = response.status();
        if matches!(status, StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED) {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Unauthorized(format!(
                "provider rejected the grant ({status}): {}",
                excerpt(&body)
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Destination {
                status: Some(status.as_u16()),
                message: format!("token endpoint returned {status}: {}", excerpt(&body)),
            });
        }

        let tokens: Value = response.json().await.map_err(|error| AppError::Destination {
            status: None,
            message: format!("token endpoint returned invalid json: {error}"),
        })?;
        if tokens.get("access_token").and_then(Value::as_str).is_none() {
            return Err(AppError::Destination {
                status: None,
                message: "token response carries no access_token".to_owned(),
            });
        }

        Ok(tokens)
    }
}

/// Truncates a vendor response body for error messages.
pub(crate) fn excerpt(body: &str) -> String {
    const LIMIT: usize = 200;
    let trimmed = body.trim();
    match trimmed.char_indices().nth(LIMIT) {
        Some((index, _)) => format!("{}...", &trimmed[..index]),
        None => trimmed.to_owned(),
    }
}
