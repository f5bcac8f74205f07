//! Application services and ports.

#![forbid(unsafe_code)]

mod action_ports;
mod action_registry;
mod continuation_token;
mod dispatch_service;
mod oauth_service;
pub mod payload;

#[cfg(test)]
mod test_support;

pub use action_ports::{
    ActionPlugin, ActionRequest, OAuthAction, OAuthCallbackNotifier, OAuthCredentials,
    STATE_JSON_PARAM, STATE_URL_PARAM,
};
pub use action_registry::ActionRegistry;
pub use continuation_token::{ContinuationTokenCodec, SecretEncryptor, TOKEN_FORMAT_VERSION};
pub use dispatch_service::{
    DEFAULT_MAX_BUFFERED_PAYLOAD_BYTES, DispatchService, DispatchSettings,
};
pub use oauth_service::{LOGIN_FIELD_NAME, OAuthService, OAuthSettings};
