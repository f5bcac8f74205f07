//! Fakes shared by application service tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use actionhub_core::{AppError, AppResult};
use actionhub_domain::{
    ActionDefinition, ActionForm, ActionFormField, ActionParam, ActionResponse, ActionType,
    FormFieldType, FormOption,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use url::Url;

use crate::action_ports::{
    ActionPlugin, ActionRequest, OAuthAction, OAuthCallbackNotifier, OAuthCredentials,
};
use crate::action_registry::ActionRegistry;
use crate::continuation_token::{ContinuationTokenCodec, SecretEncryptor};
use crate::oauth_service::{OAuthService, OAuthSettings};
use crate::payload::PayloadBody;

pub const GOOD_CODE: &str = "good-code";
pub const GOOD_TOKEN: &str = "good-token";
pub const EXPIRED_TOKEN: &str = "expired-token";
pub const CALLER_RETURN_URL: &str = "https://caller.example.com/oauth/return";

const TAG: &[u8] = b"fake1";

/// Reversible stand-in cipher: a tag, the key byte, then XOR with the key.
pub struct FakeEncryptor {
    pub key: u8,
}

impl SecretEncryptor for FakeEncryptor {
    fn encrypt(&self, plaintext: &[u8]) -> AppResult<Vec<u8>> {
        let mut sealed = TAG.to_vec();
        sealed.push(self.key);
        sealed.extend(plaintext.iter().map(|byte| byte ^ self.key));
        Ok(sealed)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> AppResult<Vec<u8>> {
        let body = ciphertext
            .strip_prefix(TAG)
            .and_then(|rest| rest.split_first())
            .filter(|(key, _)| **key == self.key)
            .map(|(_, body)| body)
            .ok_or_else(|| AppError::Internal("authentication tag mismatch".to_owned()))?;
        Ok(body.iter().map(|byte| byte ^ self.key).collect())
    }
}

pub fn fake_codec(key: u8) -> ContinuationTokenCodec {
    ContinuationTokenCodec::new(Arc::new(FakeEncryptor { key }))
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub deliveries: Mutex<Vec<(String, OAuthCredentials)>>,
}

#[async_trait]
impl OAuthCallbackNotifier for RecordingNotifier {
    async fn deliver(&self, return_url: &str, credentials: &OAuthCredentials) -> AppResult<()> {
        self.deliveries
            .lock()
            .await
            .push((return_url.to_owned(), credentials.clone()));
        Ok(())
    }
}

pub fn oauth_service(
    registry: Arc<ActionRegistry>,
    notifier: Arc<RecordingNotifier>,
) -> AppResult<OAuthService> {
    let base_url = Url::parse("https://hub.example.com/")
        .map_err(|error| AppError::Internal(error.to_string()))?;
    Ok(OAuthService::new(
        registry,
        fake_codec(42),
        notifier,
        OAuthSettings {
            base_url,
            state_ttl_seconds: 600,
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub address: String,
    pub mime_type: Option<String>,
    pub bytes: Bytes,
    pub was_streaming: bool,
}

/// Buffered destination that requires an `address` form value.
pub struct RecordingDestination {
    definition: ActionDefinition,
    pub deliveries: Mutex<Vec<Delivery>>,
    pub form_calls: AtomicUsize,
}

impl RecordingDestination {
    pub fn new() -> AppResult<Self> {
        let definition =
            ActionDefinition::new("recorder", "Recorder", vec![ActionType::Query, ActionType::Cell])?
                .with_params(vec![ActionParam::new("api_key", "API key", false, true)?])?;
        Ok(Self {
            definition,
            deliveries: Mutex::new(Vec::new()),
            form_calls: AtomicUsize::new(0),
        })
    }

    pub fn with_required_param(mut self, name: &str) -> AppResult<Self> {
        self.definition = self
            .definition
            .with_params(vec![ActionParam::new(name, name, true, false)?])?;
        Ok(self)
    }

    pub async fn delivered(&self) -> Vec<Delivery> {
        self.deliveries.lock().await.clone()
    }
}

#[async_trait]
impl ActionPlugin for RecordingDestination {
    fn definition(&self) -> &ActionDefinition {
        &self.definition
    }

    async fn form(&self, _request: &ActionRequest) -> AppResult<ActionForm> {
        self.form_calls.fetch_add(1, Ordering::SeqCst);
        ActionForm::new(vec![
            ActionFormField::new("address", "Address", FormFieldType::String)?.required(),
            ActionFormField::new("note", "Note", FormFieldType::Textarea)?,
        ])
    }

    async fn execute(&self, request: ActionRequest) -> AppResult<ActionResponse> {
        let address = request
            .form_value("address")
            .ok_or_else(|| AppError::Validation("address is required".to_owned()))?
            .to_owned();
        let Some(attachment) = request.attachment else {
            return Err(AppError::Validation("attachment is required".to_owned()));
        };

        let was_streaming = attachment.body.is_streaming();
        let bytes = attachment.body.into_bytes(usize::MAX).await?;
        self.deliveries.lock().await.push(Delivery {
            address,
            mime_type: attachment.mime_type,
            bytes,
            was_streaming,
        });
        Ok(ActionResponse::success())
    }
}

/// Streaming destination that counts what it reads chunk by chunk.
pub struct CountingStreamDestination {
    definition: ActionDefinition,
    pub total_bytes: AtomicUsize,
    pub chunks: AtomicUsize,
    pub largest_chunk: AtomicUsize,
}

impl CountingStreamDestination {
    pub fn new() -> AppResult<Self> {
        Ok(Self {
            definition: ActionDefinition::new("counter", "Counter", vec![ActionType::Query])?
                .with_streaming(),
            total_bytes: AtomicUsize::new(0),
            chunks: AtomicUsize::new(0),
            largest_chunk: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ActionPlugin for CountingStreamDestination {
    fn definition(&self) -> &ActionDefinition {
        &self.definition
    }

    async fn form(&self, _request: &ActionRequest) -> AppResult<ActionForm> {
        ActionForm::new(Vec::new())
    }

    async fn execute(&self, request: ActionRequest) -> AppResult<ActionResponse> {
        let Some(attachment) = request.attachment else {
            return Err(AppError::Validation("attachment is required".to_owned()));
        };
        if !attachment.body.is_streaming() {
            return Err(AppError::Internal("expected a streamed payload".to_owned()));
        }

        let mut stream = attachment.body.into_stream(usize::MAX);
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            self.chunks.fetch_add(1, Ordering::SeqCst);
            self.total_bytes.fetch_add(chunk.len(), Ordering::SeqCst);
            self.largest_chunk.fetch_max(chunk.len(), Ordering::SeqCst);
        }
        Ok(ActionResponse::success().with_message("stream stored"))
    }
}

/// Destination whose delivery always fails with a fixed error.
pub struct FailingDestination {
    definition: ActionDefinition,
    error: fn() -> AppError,
    pub correlation_ids: Mutex<Vec<String>>,
}

impl FailingDestination {
    pub fn new(name: &str, error: fn() -> AppError) -> AppResult<Self> {
        Ok(Self {
            definition: ActionDefinition::new(name, "Failing", vec![ActionType::Query])?,
            error,
            correlation_ids: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ActionPlugin for FailingDestination {
    fn definition(&self) -> &ActionDefinition {
        &self.definition
    }

    async fn form(&self, _request: &ActionRequest) -> AppResult<ActionForm> {
        ActionForm::new(Vec::new())
    }

    async fn execute(&self, request: ActionRequest) -> AppResult<ActionResponse> {
        self.correlation_ids
            .lock()
            .await
            .push(request.correlation_id().as_str().to_owned());
        Err((self.error)())
    }
}

/// Destination with a bug: delivery and probing panic.
pub struct PanickingDestination {
    definition: ActionDefinition,
}

impl PanickingDestination {
    pub fn new() -> AppResult<Self> {
        Ok(Self {
            definition: ActionDefinition::new("unstable", "Unstable", vec![ActionType::Query])?
                .with_oauth(),
        })
    }
}

#[async_trait]
impl ActionPlugin for PanickingDestination {
    fn definition(&self) -> &ActionDefinition {
        &self.definition
    }

    async fn form(&self, _request: &ActionRequest) -> AppResult<ActionForm> {
        ActionForm::new(Vec::new())
    }

    async fn execute(&self, request: ActionRequest) -> AppResult<ActionResponse> {
        let columns: Vec<&str> = Vec::new();
        let _ = request.form_value(columns[3]);
        Ok(ActionResponse::success())
    }

    fn as_oauth(&self) -> Option<&dyn OAuthAction> {
        Some(self)
    }
}

#[async_trait]
impl OAuthAction for PanickingDestination {
    async fn oauth_url(&self, _redirect_uri: &str, _state: &str) -> AppResult<String> {
        Ok("https://provider.example.com/authorize".to_owned())
    }

    async fn oauth_fetch_info(&self, _code: &str, _redirect_uri: &str) -> AppResult<Value> {
        Ok(json!({}))
    }

    async fn oauth_check(&self, _request: &ActionRequest) -> AppResult<()> {
        panic!("account client was never initialised");
    }
}

/// OAuth destination accepting a single known access token.
pub struct FakeOAuthDestination {
    definition: ActionDefinition,
    pub exchanges: AtomicUsize,
    pub executions: AtomicUsize,
    pub refreshed_tokens: Option<Value>,
}

impl FakeOAuthDestination {
    pub fn new() -> AppResult<Self> {
        Ok(Self {
            definition: ActionDefinition::new("drive", "Drive", vec![ActionType::Query])?
                .with_oauth()
                .with_streaming(),
            exchanges: AtomicUsize::new(0),
            executions: AtomicUsize::new(0),
            refreshed_tokens: None,
        })
    }

    pub fn refreshing(mut self, tokens: Value) -> Self {
        self.refreshed_tokens = Some(tokens);
        self
    }

    fn authorized(request: &ActionRequest) -> AppResult<&OAuthCredentials> {
        let credentials = request
            .oauth_credentials
            .as_ref()
            .ok_or_else(|| AppError::Unauthorized("no credentials".to_owned()))?;
        if credentials.access_token() == Some(GOOD_TOKEN) {
            Ok(credentials)
        } else {
            Err(AppError::Forbidden("provider rejected the token".to_owned()))
        }
    }
}

#[async_trait]
impl ActionPlugin for FakeOAuthDestination {
    fn definition(&self) -> &ActionDefinition {
        &self.definition
    }

    /// Accepts the expired token only when a refresh is configured.
    async fn form(&self, request: &ActionRequest) -> AppResult<ActionForm> {
        let refreshable = self.refreshed_tokens.is_some()
            && request
                .oauth_credentials
                .as_ref()
                .and_then(OAuthCredentials::access_token)
                == Some(EXPIRED_TOKEN);
        let credentials = match request.oauth_credentials.as_ref() {
            Some(credentials) if refreshable => credentials,
            _ => Self::authorized(request)?,
        };
        let form = ActionForm::new(vec![
            ActionFormField::new("folder", "Folder", FormFieldType::Select)?
                .required()
                .with_options(vec![FormOption::new("reports", "Reports")?]),
        ])?;

        match &self.refreshed_tokens {
            Some(tokens) => {
                let refreshed = OAuthCredentials {
                    tokens: tokens.clone(),
                    redirect: credentials.redirect.clone(),
                };
                let state = serde_json::to_string(&refreshed)
                    .map_err(|error| AppError::Internal(error.to_string()))?;
                Ok(form.with_state(state))
            }
            None => Ok(form),
        }
    }

    async fn execute(&self, request: ActionRequest) -> AppResult<ActionResponse> {
        Self::authorized(&request)?;
        self.executions.fetch_add(1, Ordering::SeqCst);
        if let Some(PayloadBody::Streaming(stream)) =
            request.attachment.map(|attachment| attachment.body)
        {
            stream.collect_bytes(usize::MAX).await?;
        }
        Ok(ActionResponse::success())
    }

    fn as_oauth(&self) -> Option<&dyn OAuthAction> {
        Some(self)
    }
}

#[async_trait]
impl OAuthAction for FakeOAuthDestination {
    async fn oauth_url(&self, redirect_uri: &str, state: &str) -> AppResult<String> {
        let mut url = Url::parse("https://provider.example.com/authorize")
            .map_err(|error| AppError::Internal(error.to_string()))?;
        url.query_pairs_mut()
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("state", state);
        Ok(url.to_string())
    }

    async fn oauth_fetch_info(&self, code: &str, _redirect_uri: &str) -> AppResult<Value> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        if code == GOOD_CODE {
            Ok(json!({ "access_token": GOOD_TOKEN, "token_type": "bearer" }))
        } else {
            Err(AppError::Unauthorized("authorization code rejected".to_owned()))
        }
    }

    async fn oauth_check(&self, request: &ActionRequest) -> AppResult<()> {
        Self::authorized(request).map(|_| ())
    }
}

pub fn credentials_json(access_token: &str) -> String {
    json!({
        "tokens": { "access_token": access_token },
        "redirect": "https://hub.example.com/actions/drive/oauth/redirect"
    })
    .to_string()
}
