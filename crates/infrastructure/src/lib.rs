//! Infrastructure adapters for application ports and the reference destinations.

#![forbid(unsafe_code)]

mod aes_secret_encryptor;
mod destinations;
mod http_oauth_callback_notifier;
mod oauth2_client;

pub use aes_secret_encryptor::AesSecretEncryptor;
pub use destinations::{
    LocalFileDestination, OAuthFileStoreConfig, OAuthFileStoreDestination, WebhookDestination,
};
pub use http_oauth_callback_notifier::HttpOAuthCallbackNotifier;
pub use oauth2_client::{OAuth2Client, OAuth2ClientConfig};
