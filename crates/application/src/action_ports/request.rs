use std::collections::HashMap;

use actionhub_core::CorrelationId;
use actionhub_domain::ActionType;

use super::OAuthCredentials;
use crate::payload::Attachment;

/// Parameter carrying authorization state echoed back by the caller.
pub const STATE_JSON_PARAM: &str = "state_json";

/// Parameter carrying the caller URL that receives OAuth results.
pub const STATE_URL_PARAM: &str = "state_url";

/// One inbound action invocation.
#[derive(Debug)]
pub struct ActionRequest {
    /// Kind of payload the caller is sending.
    pub action_type: ActionType,
    /// Latest form selections keyed by field name.
    pub form_params: HashMap<String, String>,
    /// Static action params plus echoed state.
    pub params: HashMap<String, String>,
    /// Optional payload to deliver.
    pub attachment: Option<Attachment>,
    /// Authorization resolved by the dispatcher for OAuth actions.
    pub oauth_credentials: Option<OAuthCredentials>,
    correlation_id: CorrelationId,
}

impl ActionRequest {
    /// Creates an empty request for the given payload kind.
    #[must_use]
    pub fn new(action_type: ActionType) -> Self {
        Self {
            action_type,
            form_params: HashMap::new(),
            params: HashMap::new(),
            attachment: None,
            oauth_credentials: None,
            correlation_id: CorrelationId::generate(),
        }
    }

    /// Adds one form selection.
    #[must_use]
    pub fn with_form_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form_params.insert(name.into(), value.into());
        self
    }

    /// Adds one static parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Attaches a payload.
    #[must_use]
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    /// Correlates the request with the caller webhook id; blank ids keep the
    /// generated one.
    #[must_use]
    pub fn with_webhook_id(mut self, webhook_id: &str) -> Self {
        if !webhook_id.trim().is_empty() {
            self.correlation_id = CorrelationId::from_webhook_id(Some(webhook_id));
        }
        self
    }

    /// Returns a non-blank form value.
    #[must_use]
    pub fn form_value(&self, name: &str) -> Option<&str> {
        non_blank(self.form_params.get(name))
    }

    /// Returns a non-blank static parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        non_blank(self.params.get(name))
    }

    /// Returns the echoed authorization state, if any.
    #[must_use]
    pub fn state_json(&self) -> Option<&str> {
        self.param(STATE_JSON_PARAM)
    }

    /// Returns the caller URL that receives OAuth results.
    #[must_use]
    pub fn state_url(&self) -> Option<&str> {
        self.param(STATE_URL_PARAM)
    }

    /// Returns the correlation id for logs and error payloads.
    ///
    /// Resolved once per request, so every caller sees the same id.
    #[must_use]
    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id.clone()
    }
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value
        .map(String::as_str)
        .filter(|value| !value.trim().is_empty())
}
