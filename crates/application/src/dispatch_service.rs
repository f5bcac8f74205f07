//! Request dispatcher: the single entry point for action invocations.
//!
//! Every execute call runs the same pipeline (lookup, type and param checks,
//! credential resolution, form validation, payload preparation, delivery) and
//! every fault raised along the way is normalized into a failed
//! [`ActionResponse`] here and nowhere else.

use std::sync::Arc;
use std::time::Instant;

use actionhub_core::{AppError, AppResult, CorrelationId};
use actionhub_domain::{ActionDefinition, ActionForm, ActionResponse};
use tracing::{Instrument, Span, info, info_span, warn};

use crate::action_ports::{ActionPlugin, ActionRequest};
use crate::action_registry::ActionRegistry;
use crate::oauth_service::{OAuthService, oauth_capability, plugin_form_credentials};
use crate::payload::{Attachment, DEFAULT_CHUNK_BYTES, PayloadBody};

mod normalize;
mod validation;

use normalize::{contain_panic, failure_response};
use validation::{ensure_required_fields, ensure_required_params, ensure_supported_type};

/// Default cap for payloads materialized in memory.
pub const DEFAULT_MAX_BUFFERED_PAYLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Limits applied while preparing payloads.
#[derive(Debug, Clone, Copy)]
pub struct DispatchSettings {
    /// Largest payload buffered for destinations that cannot stream.
    pub max_buffered_payload_bytes: usize,
    /// Chunk size used when buffered payloads are replayed as streams.
    pub stream_chunk_bytes: usize,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            max_buffered_payload_bytes: DEFAULT_MAX_BUFFERED_PAYLOAD_BYTES,
            stream_chunk_bytes: DEFAULT_CHUNK_BYTES,
        }
    }
}

/// Application service that routes requests to destination plugins.
#[derive(Clone)]
pub struct DispatchService {
    registry: Arc<ActionRegistry>,
    oauth_service: OAuthService,
    settings: DispatchSettings,
}

impl DispatchService {
    /// Creates a dispatcher over a frozen registry.
    #[must_use]
    pub fn new(
        registry: Arc<ActionRegistry>,
        oauth_service: OAuthService,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            registry,
            oauth_service,
            settings,
        }
    }

    /// Returns the payload limits in effect.
    #[must_use]
    pub fn settings(&self) -> DispatchSettings {
        self.settings
    }

    /// Lists registered action definitions ordered by name.
    #[must_use]
    pub fn definitions(&self) -> Vec<ActionDefinition> {
        self.registry.list()
    }

    /// Returns how many actions are registered.
    #[must_use]
    pub fn action_count(&self) -> usize {
        self.registry.len()
    }

    /// Runs an action and always answers with an [`ActionResponse`].
    pub async fn execute(&self, name: &str, request: ActionRequest) -> ActionResponse {
        let correlation_id = request.correlation_id();
        let span = request_span("execute", name, &correlation_id);
        let started_at = Instant::now();

        match self.try_execute(name, request).instrument(span).await {
            Ok(response) => {
                info!(
                    action = %name,
                    correlation_id = %correlation_id,
                    success = response.is_success(),
                    elapsed_ms = started_at.elapsed().as_millis(),
                    "action executed"
                );
                response
            }
            Err(error) => failure_response(name, &correlation_id, &error),
        }
    }

    /// Negotiates the form for an action.
    ///
    /// OAuth actions without usable credentials, or whose provider rejects
    /// the stored credentials, answer with a login-only form.
    pub async fn form(&self, name: &str, request: ActionRequest) -> AppResult<ActionForm> {
        let span = request_span("form", name, &request.correlation_id());
        self.negotiate_form(name, request).instrument(span).await
    }

    /// Checks whether an OAuth action's credentials are still accepted.
    pub async fn oauth_check(&self, name: &str, request: ActionRequest) -> ActionResponse {
        let correlation_id = request.correlation_id();
        let span = request_span("oauth_check", name, &correlation_id);
        match self.try_oauth_check(name, request).instrument(span).await {
            Ok(()) => ActionResponse::success(),
            Err(error) => failure_response(name, &correlation_id, &error),
        }
    }

    async fn negotiate_form(&self, name: &str, mut request: ActionRequest) -> AppResult<ActionForm> {
        let plugin = self.registry.lookup(name)?;
        let definition = plugin.definition();
        if !definition.uses_oauth() {
            return contain_panic(name, plugin.form(&request)).await;
        }

        let Some(credentials) = self.oauth_service.resolve_credentials(&request)? else {
            return self.oauth_service.login_form(definition, &request);
        };
        request.oauth_credentials = Some(credentials.clone());

        match contain_panic(name, plugin.form(&request)).await {
            Ok(form) => self.oauth_service.seal_form_state(form, Some(&credentials)),
            Err(error) if error.requires_reauthorization() => {
                warn!(error = %error, "provider rejected stored credentials, returning login form");
                self.oauth_service.login_form(definition, &request)
            }
            Err(error) => Err(error),
        }
    }

    async fn try_execute(
        &self,
        name: &str,
        mut request: ActionRequest,
    ) -> AppResult<ActionResponse> {
        let plugin = self.registry.lookup(name)?;
        let definition = plugin.definition();

        ensure_supported_type(definition, &request)?;
        ensure_required_params(definition, &request)?;

        if definition.uses_oauth() {
            let credentials = self
                .oauth_service
                .resolve_credentials(&request)?
                .ok_or_else(|| {
                    AppError::Unauthorized(format!("action '{name}' requires authorization"))
                })?;
            request.oauth_credentials = Some(credentials);
        }

        let form = contain_panic(name, plugin.form(&request)).await?;
        ensure_required_fields(&form, &request)?;
        if definition.uses_oauth()
            && let Some(refreshed) = plugin_form_credentials(&form)?
        {
            request.oauth_credentials = Some(refreshed);
        }

        if let Some(attachment) = request.attachment.take() {
            request.attachment = Some(self.prepare_attachment(definition, attachment).await?);
        }

        contain_panic(name, plugin.execute(request)).await
    }

    async fn try_oauth_check(&self, name: &str, mut request: ActionRequest) -> AppResult<()> {
        let plugin = self.registry.lookup(name)?;
        if !plugin.definition().uses_oauth() {
            return Err(AppError::Validation(format!(
                "action '{name}' does not use oauth"
            )));
        }

        let credentials = self
            .oauth_service
            .resolve_credentials(&request)?
            .ok_or_else(|| AppError::Unauthorized(format!("action '{name}' is not authorized")))?;
        request.oauth_credentials = Some(credentials);

        let capability = oauth_capability(plugin.as_ref())?;
        contain_panic(name, capability.oauth_check(&request)).await
    }

    /// Streaming destinations always receive a chunk stream; everything else
    /// is materialized within the buffering limit.
    async fn prepare_attachment(
        &self,
        definition: &ActionDefinition,
        attachment: Attachment,
    ) -> AppResult<Attachment> {
        let Attachment {
            mime_type,
            filename,
            body,
        } = attachment;

        let body = if definition.uses_streaming() {
            PayloadBody::Streaming(body.into_stream(self.settings.stream_chunk_bytes))
        } else {
            PayloadBody::Buffered(
                body.into_bytes(self.settings.max_buffered_payload_bytes)
                    .await?,
            )
        };

        Ok(Attachment {
            mime_type,
            filename,
            body,
        })
    }
}

/// Span tying plugin-side events to one invocation.
fn request_span(operation: &'static str, name: &str, correlation_id: &CorrelationId) -> Span {
    info_span!("action_request", operation, action = %name, correlation_id = %correlation_id)
}
