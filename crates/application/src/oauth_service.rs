//! OAuth authorization-code flow coordinated without server-side sessions.
//!
//! The hub never stores tokens. The caller's return URL travels through the
//! provider inside a sealed `state` parameter, negotiated tokens are posted back
//! to the caller, and the caller echoes them on later requests either as plain
//! JSON or as the sealed form state handed out by [`OAuthService::seal_form_state`].

use std::sync::Arc;

use actionhub_core::{AppError, AppResult};
use actionhub_domain::{ActionDefinition, ActionForm, ActionFormField, RESET_STATE};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::action_ports::{
    ActionPlugin, ActionRequest, OAuthAction, OAuthCallbackNotifier, OAuthCredentials,
};
use crate::action_registry::ActionRegistry;
use crate::continuation_token::ContinuationTokenCodec;

/// Name of the single field on a login-only form.
pub const LOGIN_FIELD_NAME: &str = "login";

/// Settings shared by every OAuth action.
#[derive(Debug, Clone)]
pub struct OAuthSettings {
    /// Public base URL of the hub, used to build redirect URIs.
    pub base_url: Url,
    /// Lifetime of the sealed provider `state` parameter.
    pub state_ttl_seconds: i64,
}

/// Contents of the sealed provider `state` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct AuthorizationState {
    return_url: String,
}

/// Coordinates login forms, provider redirects and credential resolution.
#[derive(Clone)]
pub struct OAuthService {
    registry: Arc<ActionRegistry>,
    codec: ContinuationTokenCodec,
    notifier: Arc<dyn OAuthCallbackNotifier>,
    settings: OAuthSettings,
}

impl OAuthService {
    /// Creates the OAuth coordinator.
    #[must_use]
    pub fn new(
        registry: Arc<ActionRegistry>,
        codec: ContinuationTokenCodec,
        notifier: Arc<dyn OAuthCallbackNotifier>,
        settings: OAuthSettings,
    ) -> Self {
        Self {
            registry,
            codec,
            notifier,
            settings,
        }
    }

    /// Returns the absolute URL of a hub route below `/actions/{name}`.
    pub fn action_url(&self, name: &str, suffix: &[&str]) -> AppResult<Url> {
        let mut url = self.settings.base_url.clone();
        url.set_query(None);
        url.path_segments_mut()
            .map_err(|()| {
                AppError::Internal(format!(
                    "base url '{}' cannot carry a path",
                    self.settings.base_url
                ))
            })?
            .pop_if_empty()
            .push("actions")
            .push(name)
            .extend(suffix);
        Ok(url)
    }

    /// Returns the provider redirect URI for an action.
    pub fn redirect_uri(&self, name: &str) -> AppResult<String> {
        Ok(self.action_url(name, &["oauth", "redirect"])?.to_string())
    }

    /// Builds the login-only form shown while an action lacks credentials.
    pub fn login_form(
        &self,
        definition: &ActionDefinition,
        request: &ActionRequest,
    ) -> AppResult<ActionForm> {
        let return_url = request.state_url().ok_or_else(|| {
            AppError::Validation(format!(
                "action '{}' requires the 'state_url' param to start authorization",
                definition.name()
            ))
        })?;
        validate_return_url(return_url)?;

        let state = AuthorizationState {
            return_url: return_url.to_owned(),
        };
        let sealed = self.codec.seal(
            &state,
            Some(Duration::seconds(self.settings.state_ttl_seconds)),
        )?;

        let mut start_url = self.action_url(definition.name(), &["oauth"])?;
        start_url.query_pairs_mut().append_pair("state", &sealed);

        ActionForm::new(vec![ActionFormField::oauth_link(
            LOGIN_FIELD_NAME,
            format!("Log in to {}", definition.label()),
            start_url.to_string(),
        )?])
    }

    /// Outbound leg: returns the provider authorize URL for a sealed state.
    pub async fn authorize_url(&self, name: &str, state: &str) -> AppResult<String> {
        let plugin = self.oauth_plugin(name)?;
        let _: AuthorizationState = self.codec.open(state)?;
        let redirect_uri = self.redirect_uri(name)?;

        oauth_capability(plugin.as_ref())?
            .oauth_url(redirect_uri.as_str(), state)
            .await
    }

    /// Inbound leg: exchanges `code` and posts credentials to the return URL.
    ///
    /// The state is opened before anything else, so a tampered or expired
    /// state never reaches the provider token endpoint.
    pub async fn complete_authorization(
        &self,
        name: &str,
        code: &str,
        state: &str,
    ) -> AppResult<OAuthCredentials> {
        let plugin = self.oauth_plugin(name)?;
        let authorization: AuthorizationState = self.codec.open(state)?;

        let code = code.trim();
        if code.is_empty() {
            return Err(AppError::Validation(
                "authorization code must not be empty".to_owned(),
            ));
        }

        let redirect_uri = self.redirect_uri(name)?;
        let tokens = oauth_capability(plugin.as_ref())?
            .oauth_fetch_info(code, redirect_uri.as_str())
            .await?;
        let credentials = OAuthCredentials {
            tokens,
            redirect: redirect_uri,
        };

        self.notifier
            .deliver(authorization.return_url.as_str(), &credentials)
            .await?;

        info!(action = %name, "delivered oauth credentials to caller");
        Ok(credentials)
    }

    /// Reconstructs credentials from `params.state_json`.
    ///
    /// Plain `{tokens, redirect}` JSON is accepted as posted by the callback;
    /// anything else must be a sealed form state. The reset sentinel and an
    /// absent value mean no credentials.
    pub fn resolve_credentials(
        &self,
        request: &ActionRequest,
    ) -> AppResult<Option<OAuthCredentials>> {
        let Some(raw) = request.state_json().map(str::trim) else {
            return Ok(None);
        };
        if raw == RESET_STATE {
            return Ok(None);
        }

        if raw.starts_with('{') {
            return serde_json::from_str(raw).map(Some).map_err(|error| {
                AppError::Unauthorized(format!("state_json is not valid credentials: {error}"))
            });
        }

        self.codec.open(raw).map(Some)
    }

    /// Seals form state before it leaves the process.
    ///
    /// A plugin may attach refreshed credentials as plain JSON; otherwise the
    /// credentials the request was made with are carried forward.
    pub fn seal_form_state(
        &self,
        mut form: ActionForm,
        current: Option<&OAuthCredentials>,
    ) -> AppResult<ActionForm> {
        let credentials = plugin_form_credentials(&form)?.or_else(|| current.cloned());

        let sealed = credentials
            .map(|credentials| self.codec.seal(&credentials, None))
            .transpose()?;
        form.set_state(sealed);
        Ok(form)
    }

    fn oauth_plugin(&self, name: &str) -> AppResult<Arc<dyn ActionPlugin>> {
        let plugin = self.registry.lookup(name)?;
        if !plugin.definition().uses_oauth() {
            return Err(AppError::Validation(format!(
                "action '{name}' does not use oauth"
            )));
        }
        Ok(plugin)
    }
}

/// Credentials an OAuth plugin attached to its form, typically after a refresh.
pub(crate) fn plugin_form_credentials(form: &ActionForm) -> AppResult<Option<OAuthCredentials>> {
    form.state()
        .map(|raw| {
            serde_json::from_str::<OAuthCredentials>(raw).map_err(|error| {
                AppError::Internal(format!("plugin form state is not valid credentials: {error}"))
            })
        })
        .transpose()
}

pub(crate) fn oauth_capability(plugin: &dyn ActionPlugin) -> AppResult<&dyn OAuthAction> {
    plugin.as_oauth().ok_or_else(|| {
        AppError::Internal(format!(
            "action '{}' is declared as oauth but has no oauth capability",
            plugin.definition().name()
        ))
    })
}

fn validate_return_url(value: &str) -> AppResult<()> {
    let url = Url::parse(value).map_err(|error| {
        AppError::Validation(format!("state_url '{value}' is not a valid url: {error}"))
    })?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(AppError::Validation(format!(
            "state_url must use http or https, got '{scheme}'"
        ))),
    }
}
