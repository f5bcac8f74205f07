use std::sync::Arc;

use actionhub_application::ActionRegistry;
use actionhub_core::AppError;
use actionhub_infrastructure::{
    LocalFileDestination, OAuthFileStoreDestination, WebhookDestination,
};
use tracing::{info, warn};

use crate::api_config::{ApiConfig, OAuthFileStoreSetup};

pub(super) fn build_registry(
    config: &ApiConfig,
    http_client: &reqwest::Client,
) -> Result<ActionRegistry, AppError> {
    let mut registry = ActionRegistry::new();

    registry.register(Arc::new(WebhookDestination::new(http_client.clone())?));

    match &config.local_file_root {
        Some(root) => {
            registry.register(Arc::new(LocalFileDestination::new(
                root.clone(),
                config.stream_chunk_bytes,
            )?));
        }
        None => info!("LOCAL_FILE_ROOT not set, local_file action disabled"),
    }

    match &config.oauth_file_store {
        OAuthFileStoreSetup::Configured(file_store) => {
            registry.register(Arc::new(OAuthFileStoreDestination::new(
                http_client.clone(),
                file_store.clone(),
            )?));
        }
        OAuthFileStoreSetup::Unconfigured { missing } => warn!(
            missing = %missing.join(", "),
            "oauth_file_store action not registered, configuration incomplete"
        ),
    }

    Ok(registry)
}
