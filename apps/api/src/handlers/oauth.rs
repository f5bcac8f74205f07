use actionhub_core::AppError;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::dto::{OAuthRedirectQuery, OAuthStartQuery};
use crate::error::ApiResult;
use crate::state::AppState;

/// Outbound leg: redirects the browser to the provider authorize URL.
pub async fn oauth_start_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<OAuthStartQuery>,
) -> ApiResult<Response> {
    let authorize_url = state
        .oauth_service
        .authorize_url(&name, query.state.as_str())
        .await?;
    Ok((StatusCode::FOUND, [(header::LOCATION, authorize_url)]).into_response())
}

/// Inbound leg: exchanges the code and hands the tokens to the caller.
pub async fn oauth_redirect_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<OAuthRedirectQuery>,
) -> (StatusCode, String) {
    if let Some(provider_error) = query.error {
        warn!(action = %name, error = %provider_error, "provider denied authorization");
        return (
            StatusCode::BAD_REQUEST,
            format!("Authorization was not granted: {provider_error}"),
        );
    }

    let (Some(code), Some(sealed_state)) = (query.code, query.state) else {
        return (
            StatusCode::BAD_REQUEST,
            "Authorization response is missing code or state.".to_owned(),
        );
    };

    match state
        .oauth_service
        .complete_authorization(&name, code.as_str(), sealed_state.as_str())
        .await
    {
        Ok(_) => (
            StatusCode::OK,
            "Authorization complete. You can close this window.".to_owned(),
        ),
        Err(error) => {
            warn!(action = %name, error = %error, "oauth redirect failed");
            let status = StatusCode::from_u16(error.status_code())
                .unwrap_or(StatusCode::BAD_GATEWAY);
            (status, redirect_failure_message(&error))
        }
    }
}

fn redirect_failure_message(error: &AppError) -> String {
    match error {
        AppError::Unauthorized(_) => {
            "Authorization link is invalid or expired. Please start again.".to_owned()
        }
        AppError::Internal(_) => "Authorization failed because of an internal error.".to_owned(),
        other => format!("Authorization failed: {other}"),
    }
}
