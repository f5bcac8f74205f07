use std::collections::HashMap;

use actionhub_application::ActionRequest;
use actionhub_application::payload::{Attachment, PayloadStream};
use actionhub_core::{AppError, AppResult};
use actionhub_domain::{ActionDefinition, ActionType};
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Request envelope sent as a JSON body or in the `X-Action-Request` header.
#[derive(Debug, Deserialize)]
pub struct ActionRequestBody {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(default)]
    pub form_params: HashMap<String, String>,
    #[serde(default)]
    pub params: HashMap<String, String>,
    #[serde(default)]
    pub webhook_id: Option<String>,
    #[serde(default)]
    pub attachment: Option<AttachmentBody>,
}

/// Inline attachment of a JSON request.
#[derive(Debug, Default, Deserialize)]
pub struct AttachmentBody {
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub data_base64: Option<String>,
}

impl ActionRequestBody {
    pub fn from_json(bytes: &[u8]) -> AppResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|error| AppError::Validation(format!("invalid action request: {error}")))
    }

    /// Decodes the base64url JSON envelope of a streamed request.
    pub fn from_header(value: &str) -> AppResult<Self> {
        let decoded = URL_SAFE_NO_PAD
            .decode(value.trim().trim_end_matches('='))
            .map_err(|error| {
                AppError::Validation(format!("X-Action-Request is not base64url: {error}"))
            })?;
        Self::from_json(&decoded)
    }

    /// Builds a request carrying the inline attachment, if any.
    pub fn into_action_request(mut self) -> AppResult<ActionRequest> {
        let attachment = self
            .attachment
            .take()
            .map(AttachmentBody::into_buffered)
            .transpose()?;
        let mut request = self.into_request();
        request.attachment = attachment;
        Ok(request)
    }

    /// Builds a request whose attachment is the streamed HTTP body.
    pub fn into_streamed_request(
        mut self,
        content_type: Option<&str>,
        stream: PayloadStream,
    ) -> AppResult<ActionRequest> {
        let described = self.attachment.take().unwrap_or_default();
        if described.data.is_some() || described.data_base64.is_some() {
            return Err(AppError::Validation(
                "streamed requests must not carry inline attachment data".to_owned(),
            ));
        }

        let mut attachment = Attachment::streaming(stream);
        attachment.mime_type = content_type.map(str::to_owned).or(described.mime_type);
        attachment.filename = described.filename;

        let mut request = self.into_request();
        request.attachment = Some(attachment);
        Ok(request)
    }

    /// Builds a request for form negotiation or credential checks; attachments are ignored.
    pub fn into_request(self) -> ActionRequest {
        let mut request = ActionRequest::new(self.action_type);
        request.form_params = self.form_params;
        request.params = self.params;
        match self.webhook_id.as_deref() {
            Some(webhook_id) => request.with_webhook_id(webhook_id),
            None => request,
        }
    }
}

impl AttachmentBody {
    fn into_buffered(self) -> AppResult<Attachment> {
        let bytes = match (self.data, self.data_base64) {
            (Some(_), Some(_)) => {
                return Err(AppError::Validation(
                    "attachment must carry either data or data_base64, not both".to_owned(),
                ));
            }
            (Some(data), None) => Bytes::from(data),
            (None, Some(encoded)) => Bytes::from(STANDARD.decode(encoded.trim()).map_err(
                |error| AppError::Validation(format!("attachment data_base64 is invalid: {error}")),
            )?),
            (None, None) => Bytes::new(),
        };

        Ok(Attachment {
            mime_type: self.mime_type,
            filename: self.filename,
            ..Attachment::buffered(bytes)
        })
    }
}

/// Index of registered actions.
#[derive(Debug, Serialize)]
pub struct ActionIndexResponse {
    pub label: &'static str,
    pub integrations: Vec<ActionSummaryResponse>,
}

/// One registered action with its absolute URLs.
#[derive(Debug, Serialize)]
pub struct ActionSummaryResponse {
    #[serde(flatten)]
    pub definition: ActionDefinition,
    pub url: String,
    pub form_url: String,
}
