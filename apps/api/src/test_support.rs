use std::sync::Arc;

use actionhub_application::{
    ActionPlugin, ActionRegistry, ActionRequest, ContinuationTokenCodec, DispatchService,
    DispatchSettings, OAuthAction, OAuthCallbackNotifier, OAuthCredentials, OAuthService,
    OAuthSettings,
};
use actionhub_core::{AppError, AppResult};
use actionhub_domain::{
    ActionDefinition, ActionForm, ActionFormField, ActionResponse, ActionType, FormFieldType,
};
use actionhub_infrastructure::AesSecretEncryptor;
use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use url::Url;

use crate::state::AppState;

pub const HUB_BASE_URL: &str = "https://hub.example.com/";
pub const GOOD_CODE: &str = "good-code";
pub const LIVE_TOKEN: &str = "live";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Streaming destination that records every payload it receives.
pub struct SinkPlugin {
    definition: ActionDefinition,
    received: Mutex<Vec<Received>>,
}

impl SinkPlugin {
    fn new() -> AppResult<Self> {
        Ok(Self {
            definition: ActionDefinition::new("sink", "Sink", vec![ActionType::Query])?
                .with_streaming(),
            received: Mutex::new(Vec::new()),
        })
    }

    pub async fn received(&self) -> Vec<Received> {
        self.received.lock().await.clone()
    }
}

#[async_trait]
impl ActionPlugin for SinkPlugin {
    fn definition(&self) -> &ActionDefinition {
        &self.definition
    }

    async fn form(&self, _request: &ActionRequest) -> AppResult<ActionForm> {
        ActionForm::new(vec![
            ActionFormField::new("address", "Address", FormFieldType::String)?.required(),
        ])
    }

    async fn execute(&self, request: ActionRequest) -> AppResult<ActionResponse> {
        let attachment = request
            .attachment
            .ok_or_else(|| AppError::Validation("attachment required".to_owned()))?;
        let content_type = attachment.content_type().to_owned();
        let bytes = attachment.body.into_bytes(usize::MAX).await?;

        self.received.lock().await.push(Received {
            content_type,
            bytes: bytes.to_vec(),
        });
        Ok(ActionResponse::success())
    }
}

/// OAuth destination backed by a pretend provider.
pub struct VaultPlugin {
    definition: ActionDefinition,
}

impl VaultPlugin {
    fn new() -> AppResult<Self> {
        Ok(Self {
            definition: ActionDefinition::new("vault", "Vault", vec![ActionType::Query])?
                .with_oauth(),
        })
    }
}

#[async_trait]
impl ActionPlugin for VaultPlugin {
    fn definition(&self) -> &ActionDefinition {
        &self.definition
    }

    async fn form(&self, request: &ActionRequest) -> AppResult<ActionForm> {
        self.oauth_check(request).await?;
        ActionForm::new(vec![
            ActionFormField::new("folder", "Folder", FormFieldType::String)?.required(),
        ])
    }

    async fn execute(&self, _request: ActionRequest) -> AppResult<ActionResponse> {
        Ok(ActionResponse::success())
    }

    fn as_oauth(&self) -> Option<&dyn OAuthAction> {
        Some(self)
    }
}

#[async_trait]
impl OAuthAction for VaultPlugin {
    async fn oauth_url(&self, redirect_uri: &str, state: &str) -> AppResult<String> {
        let mut url = Url::parse("https://provider.example.com/authorize")
            .map_err(|error| AppError::Internal(error.to_string()))?;
        url.query_pairs_mut()
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("state", state);
        Ok(url.to_string())
    }

    async fn oauth_fetch_info(&self, code: &str, _redirect_uri: &str) -> AppResult<Value> {
        if code != GOOD_CODE {
            return Err(AppError::Unauthorized("unknown code".to_owned()));
        }
        Ok(json!({ "access_token": LIVE_TOKEN }))
    }

    async fn oauth_check(&self, request: &ActionRequest) -> AppResult<()> {
        match request
            .oauth_credentials
            .as_ref()
            .and_then(OAuthCredentials::access_token)
        {
            Some(LIVE_TOKEN) => Ok(()),
            _ => Err(AppError::Forbidden("token revoked".to_owned())),
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    deliveries: Mutex<Vec<(String, OAuthCredentials)>>,
}

impl RecordingNotifier {
    pub async fn deliveries(&self) -> Vec<(String, OAuthCredentials)> {
        self.deliveries.lock().await.clone()
    }
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

pub struct TestHarness {
    pub state: AppState,
    pub sink: Arc<SinkPlugin>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn harness() -> AppResult<TestHarness> {
    harness_with(DispatchSettings::default())
}

pub fn harness_with(settings: DispatchSettings) -> AppResult<TestHarness> {
    let sink = Arc::new(SinkPlugin::new()?);
    let notifier = Arc::new(RecordingNotifier::default());

    let mut registry = ActionRegistry::new();
    registry.register(sink.clone());
    registry.register(Arc::new(VaultPlugin::new()?));
    let registry = Arc::new(registry);

    let oauth_service = OAuthService::new(
        registry.clone(),
        ContinuationTokenCodec::new(Arc::new(AesSecretEncryptor::new(&[7_u8; 32]))),
        notifier.clone(),
        OAuthSettings {
            base_url: Url::parse(HUB_BASE_URL)
                .map_err(|error| AppError::Internal(error.to_string()))?,
            state_ttl_seconds: 600,
        },
    );

    Ok(TestHarness {
        state: AppState {
            dispatch_service: DispatchService::new(registry, oauth_service.clone(), settings),
            oauth_service,
            hub_secret: Arc::from("s".repeat(32).as_str()),
            stream_pipe_capacity: 2,
        },
        sink,
        notifier,
    })
}
