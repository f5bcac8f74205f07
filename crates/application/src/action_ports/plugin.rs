use actionhub_core::AppResult;
use actionhub_domain::{ActionDefinition, ActionForm, ActionResponse};
use async_trait::async_trait;

use super::{ActionRequest, OAuthAction};

/// Contract every destination integration implements.
#[async_trait]
pub trait ActionPlugin: Send + Sync {
    /// Returns the immutable action definition.
    fn definition(&self) -> &ActionDefinition;

    /// Derives the form for the caller's latest selections.
    ///
    /// Must be a pure function of `request.params` and `request.form_params`:
    /// the same inputs always produce the same form, and a missing value for an
    /// interactive field is never an error.
    async fn form(&self, request: &ActionRequest) -> AppResult<ActionForm>;

    /// Delivers the request payload to the destination.
    async fn execute(&self, request: ActionRequest) -> AppResult<ActionResponse>;

    /// Returns the OAuth capability of OAuth based actions.
    fn as_oauth(&self) -> Option<&dyn OAuthAction> {
        None
    }
}
