use std::sync::Arc;

use actionhub_application::{DispatchService, OAuthService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub dispatch_service: DispatchService,
    pub oauth_service: OAuthService,
    pub hub_secret: Arc<str>,
    pub stream_pipe_capacity: usize,
}
