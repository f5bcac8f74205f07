mod actions;
mod oauth;

use serde::Serialize;

pub use actions::{
    ActionIndexResponse, ActionRequestBody, ActionSummaryResponse, AttachmentBody,
};
pub use oauth::{OAuthRedirectQuery, OAuthStartQuery};

/// Health response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub actions: usize,
}
