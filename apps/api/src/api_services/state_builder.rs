use std::sync::Arc;
use std::time::Duration;

use actionhub_application::{
    ContinuationTokenCodec, DispatchService, DispatchSettings, OAuthService, OAuthSettings,
};
use actionhub_core::AppError;
use actionhub_infrastructure::{AesSecretEncryptor, HttpOAuthCallbackNotifier};

use crate::api_config::ApiConfig;
use crate::state::AppState;

mod plugins;

pub fn build_app_state(config: &ApiConfig) -> Result<AppState, AppError> {
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_seconds))
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build http client: {error}")))?;

    let encryptor = Arc::new(AesSecretEncryptor::from_hex(&config.continuation_token_key)?);
    let codec = ContinuationTokenCodec::new(encryptor);

    let registry = Arc::new(plugins::build_registry(config, &http_client)?);

    let oauth_service = OAuthService::new(
        registry.clone(),
        codec,
        Arc::new(HttpOAuthCallbackNotifier::new(http_client)),
        OAuthSettings {
            base_url: config.base_url.clone(),
            state_ttl_seconds: config.oauth_state_ttl_seconds,
        },
    );

    Ok(AppState {
        dispatch_service: DispatchService::new(
            registry,
            oauth_service.clone(),
            DispatchSettings {
                max_buffered_payload_bytes: config.max_buffered_payload_bytes,
                stream_chunk_bytes: config.stream_chunk_bytes,
            },
        ),
        oauth_service,
        hub_secret: Arc::from(config.hub_secret.as_str()),
        stream_pipe_capacity: config.stream_pipe_capacity,
    })
}
