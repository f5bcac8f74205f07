mod oauth;
mod plugin;
mod request;

pub use oauth::{OAuthAction, OAuthCallbackNotifier, OAuthCredentials};
pub use plugin::ActionPlugin;
pub use request::{ActionRequest, STATE_JSON_PARAM, STATE_URL_PARAM};
