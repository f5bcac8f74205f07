//! Reference destination plugins.

mod local_file;
mod oauth_file_store;
mod webhook;

pub use local_file::LocalFileDestination;
pub use oauth_file_store::{OAuthFileStoreConfig, OAuthFileStoreDestination};
pub use webhook::WebhookDestination;

use actionhub_application::payload::PayloadBody;
use actionhub_core::AppError;
use reqwest::StatusCode;

use crate::oauth2_client::excerpt;

/// Header carrying the invocation correlation id to destinations.
pub(crate) const CORRELATION_HEADER: &str = "x-action-hub-correlation-id";

/// Converts a payload into a request body without buffering streams.
pub(crate) fn request_body(body: PayloadBody) -> reqwest::Body {
    match body {
        PayloadBody::Buffered(bytes) => reqwest::Body::from(bytes),
        PayloadBody::Streaming(stream) => reqwest::Body::wrap_stream(stream),
    }
}

/// Maps a transport failure onto a destination error without a status.
pub(crate) fn transport_error(context: &str, error: &reqwest::Error) -> AppError {
    AppError::Destination {
        status: None,
        message: format!("{context}: {error}"),
    }
}

/// Maps a non-success vendor response onto a destination error.
pub(crate) async fn rejection(context: &str, response: reqwest::Response) -> AppError {
    let status = response.status();
    AppError::Destination {
        status: Some(status.as_u16()),
        message: failure_message(context, response).await,
    }
}

/// Like [`rejection`], but 401 and 403 mean the stored authorization is no
/// longer accepted.
pub(crate) async fn authorized_rejection(context: &str, response: reqwest::Response) -> AppError {
    match response.status() {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            AppError::Forbidden(failure_message(context, response).await)
        }
        _ => rejection(context, response).await,
    }
}

async fn failure_message(context: &str, response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    format!("{context} returned {status}: {}", excerpt(&body))
}
