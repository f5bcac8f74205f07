use actionhub_application::{ActionPlugin, ActionRequest};
use actionhub_core::{AppError, AppResult};
use actionhub_domain::{
    ActionDefinition, ActionForm, ActionFormField, ActionResponse, ActionType, FormFieldType,
};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::info;
use url::Url;

use super::{CORRELATION_HEADER, rejection, request_body, transport_error};

const ADDRESS_FIELD: &str = "address";

/// Streams payloads as the body of a POST to a caller chosen URL.
pub struct WebhookDestination {
    definition: ActionDefinition,
    http_client: reqwest::Client,
}

impl WebhookDestination {
    /// Creates the webhook destination.
    pub fn new(http_client: reqwest::Client) -> AppResult<Self> {
        let definition = ActionDefinition::new(
            "webhook",
            "Webhook",
            vec![ActionType::Query, ActionType::Dashboard, ActionType::Cell],
        )?
        .with_description("POST the delivered data to an HTTP endpoint")
        .with_streaming();

        Ok(Self {
            definition,
            http_client,
        })
    }
}

#[async_trait]
impl ActionPlugin for WebhookDestination {
    fn definition(&self) -> &ActionDefinition {
        &self.definition
    }

    async fn form(&self, _request: &ActionRequest) -> AppResult<ActionForm> {
        ActionForm::new(vec![
            ActionFormField::new(ADDRESS_FIELD, "Webhook URL", FormFieldType::String)?
                .required()
                .with_description("http or https URL that receives the payload"),
        ])
    }

    async fn execute(&self, request: ActionRequest) -> AppResult<ActionResponse> {
        let address = request
            .form_value(ADDRESS_FIELD)
            .ok_or_else(|| AppError::Validation("webhook address is required".to_owned()))?;
        let url = parse_http_url(address)?;
        let correlation_id = request.correlation_id();
        let attachment = request
            .attachment
            .ok_or_else(|| AppError::Validation("webhook delivery needs an attachment".to_owned()))?;

        let response = self
            .http_client
            .post(url)
            .header(CONTENT_TYPE, attachment.content_type())
            .header(CORRELATION_HEADER, correlation_id.as_str())
            .body(request_body(attachment.body))
            .send()
            .await
            .map_err(|error| transport_error("webhook request failed", &error))?;

        if !response.status().is_success() {
            return Err(rejection("webhook", response).await);
        }

        info!(
            correlation_id = %correlation_id,
            status = response.status().as_u16(),
            "webhook delivery accepted"
        );
        Ok(ActionResponse::success())
    }
}

fn parse_http_url(address: &str) -> AppResult<Url> {
    let url = Url::parse(address.trim()).map_err(|error| {
        AppError::Validation(format!("webhook address '{address}' is not a valid url: {error}"))
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(AppError::Validation(format!(
            "webhook address must use http or https, got '{scheme}'"
        ))),
    }
}
