use actionhub_application::payload::PayloadPipe;
use actionhub_core::AppError;
use actionhub_domain::{ActionForm, ActionResponse};
use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use futures::TryStreamExt;

use crate::dto::{ActionIndexResponse, ActionRequestBody, ActionSummaryResponse};
use crate::error::ApiResult;
use crate::state::AppState;

/// Header carrying the base64url request envelope of a streamed payload.
pub const ACTION_REQUEST_HEADER: &str = "x-action-request";

/// Room for form params, params and other JSON fields around an inline attachment.
const ENVELOPE_OVERHEAD_BYTES: usize = 16 * 1024;

pub async fn list_actions_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<ActionIndexResponse>> {
    let integrations = state
        .dispatch_service
        .definitions()
        .into_iter()
        .map(|definition| -> Result<ActionSummaryResponse, AppError> {
            let url = state.oauth_service.action_url(definition.name(), &[])?;
            let form_url = state.oauth_service.action_url(definition.name(), &["form"])?;
            Ok(ActionSummaryResponse {
                definition,
                url: url.to_string(),
                form_url: form_url.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(ActionIndexResponse {
        label: "Action Hub",
        integrations,
    }))
}

pub async fn execute_action_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Body,
) -> ApiResult<(StatusCode, Json<ActionResponse>)> {
    let request = if is_json(&headers) {
        let limit =
            inline_envelope_limit(state.dispatch_service.settings().max_buffered_payload_bytes);
        let bytes = axum::body::to_bytes(body, limit).await.map_err(|error| {
            AppError::PayloadTooLarge(format!(
                "request body exceeds {limit} bytes or could not be read: {error}"
            ))
        })?;
        ActionRequestBody::from_json(&bytes)?.into_action_request()?
    } else {
        let envelope = headers
            .get(ACTION_REQUEST_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                AppError::Validation(
                    "streamed payloads need the X-Action-Request header".to_owned(),
                )
            })
            .and_then(ActionRequestBody::from_header)?;
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok());
        let stream = PayloadPipe::forward(
            body.into_data_stream().map_err(|error| {
                AppError::Validation(format!("failed to read request body: {error}"))
            }),
            state.stream_pipe_capacity,
        );
        envelope.into_streamed_request(content_type, stream)?
    };

    let response = state.dispatch_service.execute(&name, request).await;
    Ok(with_status(response))
}

pub async fn action_form_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<ActionRequestBody>,
) -> ApiResult<Json<ActionForm>> {
    let form = state
        .dispatch_service
        .form(&name, body.into_request())
        .await?;
    Ok(Json(form))
}

pub async fn oauth_check_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<ActionRequestBody>,
) -> (StatusCode, Json<ActionResponse>) {
    let response = state
        .dispatch_service
        .oauth_check(&name, body.into_request())
        .await;
    with_status(response)
}

/// JSON body cap for a payload limit, allowing for base64 inflation and the
/// surrounding envelope. Buffering destinations still hold the decoded payload
/// to the payload limit.
fn inline_envelope_limit(payload_limit: usize) -> usize {
    payload_limit
        .div_ceil(3)
        .saturating_mul(4)
        .saturating_add(ENVELOPE_OVERHEAD_BYTES)
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("application/json"))
}

/// Failed responses carry the status of their structured error.
fn with_status(response: ActionResponse) -> (StatusCode, Json<ActionResponse>) {
    let status = response.error().map_or(StatusCode::OK, |error| {
        StatusCode::from_u16(error.status()).unwrap_or(StatusCode::BAD_GATEWAY)
    });
    (status, Json(response))
}
