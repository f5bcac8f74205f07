use actionhub_application::payload::PayloadBody;
use actionhub_application::{ActionPlugin, ActionRequest, OAuthAction, OAuthCredentials};
use actionhub_core::{AppError, AppResult, CorrelationId};
use actionhub_domain::{
    ActionDefinition, ActionForm, ActionFormField, ActionResponse, ActionType, FormFieldType,
    FormOption,
};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use super::{CORRELATION_HEADER, authorized_rejection, transport_error};
use crate::oauth2_client::{OAuth2Client, OAuth2ClientConfig};

const FETCH_FIELD: &str = "fetch_folders";
const FOLDER_FIELD: &str = "folder";
const FILENAME_FIELD: &str = "filename";

/// Configuration of the OAuth file store destination.
#[derive(Debug, Clone)]
pub struct OAuthFileStoreConfig {
    /// OAuth2 client registration and endpoints.
    pub oauth: OAuth2ClientConfig,
    /// Base URL of the file store REST API.
    pub api_url: Url,
}

#[derive(Debug, Deserialize)]
struct FolderListing {
    folders: Vec<RemoteFolder>,
}

#[derive(Debug, Deserialize)]
struct RemoteFolder {
    id: String,
    name: String,
}

/// Uploads payloads to a remote file store authorized with OAuth2.
pub struct OAuthFileStoreDestination {
    definition: ActionDefinition,
    http_client: reqwest::Client,
    oauth_client: OAuth2Client,
    api_url: Url,
}

impl OAuthFileStoreDestination {
    /// Creates the destination.
    pub fn new(http_client: reqwest::Client, config: OAuthFileStoreConfig) -> AppResult<Self> {
        let definition = ActionDefinition::new(
            "oauth_file_store",
            "Cloud file store",
            vec![ActionType::Query, ActionType::Dashboard],
        )?
        .with_description("Upload the delivered data to a folder in your cloud file store")
        .with_oauth()
        .with_streaming();

        Ok(Self {
            definition,
            oauth_client: OAuth2Client::new(http_client.clone(), config.oauth),
            http_client,
            api_url: config.api_url,
        })
    }

    fn api_endpoint(&self, segments: &[&str]) -> AppResult<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                AppError::Internal(format!("api url '{}' cannot carry a path", self.api_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn list_folders(&self, access_token: &str) -> AppResult<Vec<RemoteFolder>> {
        let response = self
            .http_client
            .get(self.api_endpoint(&["folders"])?)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|error| transport_error("folder listing failed", &error))?;

        if !response.status().is_success() {
            return Err(authorized_rejection("folder listing", response).await);
        }

        let listing: FolderListing =
            response.json().await.map_err(|error| AppError::Destination {
                status: None,
                message: format!("folder listing returned invalid json: {error}"),
            })?;
        Ok(listing.folders)
    }

    /// Lists folders, refreshing an expired access token once.
    ///
    /// Returns the folders plus refreshed credentials when a refresh happened.
    async fn folders_with_refresh(
        &self,
        credentials: &OAuthCredentials,
    ) -> AppResult<(Vec<RemoteFolder>, Option<OAuthCredentials>)> {
        match self.list_folders(access_token(credentials)?).await {
            Ok(folders) => Ok((folders, None)),
            Err(AppError::Forbidden(reason)) => {
                let refreshed = self.refresh_credentials(credentials, reason).await?;
                let folders = self.list_folders(access_token(&refreshed)?).await?;
                Ok((folders, Some(refreshed)))
            }
            Err(error) => Err(error),
        }
    }

    /// Trades the refresh token for new credentials; without one the
    /// original rejection stands.
    async fn refresh_credentials(
        &self,
        credentials: &OAuthCredentials,
        rejection: String,
    ) -> AppResult<OAuthCredentials> {
        let refresh_token = credentials
            .token("refresh_token")
            .ok_or(AppError::Forbidden(rejection))?;
        let tokens = self.oauth_client.refresh(refresh_token).await?;
        info!("refreshed file store access token");
        Ok(OAuthCredentials {
            tokens,
            redirect: credentials.redirect.clone(),
        })
    }

    async fn check_account(&self, access_token: &str) -> AppResult<()> {
        let response = self
            .http_client
            .get(self.api_endpoint(&["me"])?)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|error| transport_error("account check failed", &error))?;

        if response.status().is_success() {
            return Ok(());
        }
        Err(authorized_rejection("account check", response).await)
    }

    /// Credentials the provider accepts right now, refreshed if needed.
    ///
    /// Used before streaming, since a consumed stream cannot be re-sent.
    async fn live_credentials(&self, credentials: &OAuthCredentials) -> AppResult<OAuthCredentials> {
        if credentials.token("refresh_token").is_none() {
            return Ok(credentials.clone());
        }
        match self.check_account(access_token(credentials)?).await {
            Ok(()) => Ok(credentials.clone()),
            Err(AppError::Forbidden(reason)) => self.refresh_credentials(credentials, reason).await,
            Err(error) => Err(error),
        }
    }

    async fn upload(
        &self,
        target: &Url,
        credentials: &OAuthCredentials,
        content_type: &str,
        correlation_id: &CorrelationId,
        body: reqwest::Body,
    ) -> AppResult<()> {
        let response = self
            .http_client
            .put(target.clone())
            .bearer_auth(access_token(credentials)?)
            .header(CONTENT_TYPE, content_type)
            .header(CORRELATION_HEADER, correlation_id.as_str())
            .body(body)
            .send()
            .await
            .map_err(|error| transport_error("upload failed", &error))?;

        if response.status().is_success() {
            return Ok(());
        }
        Err(authorized_rejection("upload", response).await)
    }
}

#[async_trait]
impl ActionPlugin for OAuthFileStoreDestination {
    fn definition(&self) -> &ActionDefinition {
        &self.definition
    }

    async fn form(&self, request: &ActionRequest) -> AppResult<ActionForm> {
        let credentials = credentials(request)?;
        let fetch = ActionFormField::new(FETCH_FIELD, "Load folders", FormFieldType::Select)?
            .interactive()
            .with_options(vec![FormOption::new("fetch", "Fetch folder list")?])
            .with_description("Select to load the folders of the connected account");

        if request.form_value(FETCH_FIELD).is_none() {
            return ActionForm::new(vec![fetch]);
        }

        let (folders, refreshed) = match self.folders_with_refresh(credentials).await {
            Ok(result) => result,
            Err(error) => {
                warn!(
                    correlation_id = %request.correlation_id(),
                    error = %error,
                    "folder listing failed, offering an empty folder list"
                );
                (Vec::new(), None)
            }
        };

        let options = folders
            .into_iter()
            .map(|folder| FormOption::new(folder.id, folder.name))
            .collect::<AppResult<Vec<_>>>()?;
        let form = ActionForm::new(vec![
            fetch,
            ActionFormField::new(FOLDER_FIELD, "Folder", FormFieldType::Select)?
                .required()
                .with_options(options),
            ActionFormField::new(FILENAME_FIELD, "File name", FormFieldType::String)?.required(),
        ])?;

        match refreshed {
            Some(refreshed) => {
                let state = serde_json::to_string(&refreshed).map_err(|error| {
                    AppError::Internal(format!("failed to serialize refreshed tokens: {error}"))
                })?;
                Ok(form.with_state(state))
            }
            None => Ok(form),
        }
    }

    async fn execute(&self, request: ActionRequest) -> AppResult<ActionResponse> {
        let credentials = credentials(&request)?.clone();
        let folder = required_value(&request, FOLDER_FIELD)?;
        let filename = required_value(&request, FILENAME_FIELD)?;
        let correlation_id = request.correlation_id();
        let attachment = request
            .attachment
            .ok_or_else(|| AppError::Validation("upload needs an attachment".to_owned()))?;
        let content_type = attachment.content_type().to_owned();
        let target = self.api_endpoint(&["folders", folder.as_str(), "files", filename.as_str()])?;

        match attachment.body {
            PayloadBody::Buffered(bytes) => {
                let first = self
                    .upload(
                        &target,
                        &credentials,
                        &content_type,
                        &correlation_id,
                        reqwest::Body::from(bytes.clone()),
                    )
                    .await;
                match first {
                    Err(AppError::Forbidden(reason)) => {
                        let refreshed = self.refresh_credentials(&credentials, reason).await?;
                        self.upload(
                            &target,
                            &refreshed,
                            &content_type,
                            &correlation_id,
                            reqwest::Body::from(bytes),
                        )
                        .await?;
                    }
                    other => other?,
                }
            }
            PayloadBody::Streaming(stream) => {
                let credentials = self.live_credentials(&credentials).await?;
                self.upload(
                    &target,
                    &credentials,
                    &content_type,
                    &correlation_id,
                    reqwest::Body::wrap_stream(stream),
                )
                .await?;
            }
        }

        info!(
            correlation_id = %correlation_id,
            folder = %folder,
            filename = %filename,
            "uploaded payload to file store"
        );
        Ok(ActionResponse::success())
    }

    fn as_oauth(&self) -> Option<&dyn OAuthAction> {
        Some(self)
    }
}

#[async_trait]
impl OAuthAction for OAuthFileStoreDestination {
    async fn oauth_url(&self, redirect_uri: &str, state: &str) -> AppResult<String> {
        Ok(self.oauth_client.authorize_url(redirect_uri, state))
    }

    async fn oauth_fetch_info(&self, code: &str, redirect_uri: &str) -> AppResult<Value> {
        self.oauth_client.exchange_code(code, redirect_uri).await
    }

    async fn oauth_check(&self, request: &ActionRequest) -> AppResult<()> {
        self.check_account(access_token(credentials(request)?)?).await
    }
}

fn credentials(request: &ActionRequest) -> AppResult<&OAuthCredentials> {
    request
        .oauth_credentials
        .as_ref()
        .ok_or_else(|| AppError::Unauthorized("file store is not connected".to_owned()))
}

fn access_token(credentials: &OAuthCredentials) -> AppResult<&str> {
    credentials
        .access_token()
        .ok_or_else(|| AppError::Unauthorized("stored credentials carry no access token".to_owned()))
}

fn required_value(request: &ActionRequest, field: &str) -> AppResult<String> {
    request
        .form_value(field)
        .map(|value| value.trim().to_owned())
        .ok_or_else(|| AppError::Validation(format!("'{field}' is required")))
}

#[cfg(test)]
mod tests;
