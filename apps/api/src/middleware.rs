use actionhub_core::AppError;
use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use subtle::ConstantTimeEq;

use crate::error::ApiResult;
use crate::state::AppState;

/// Rejects requests that do not present the shared hub secret.
pub async fn require_hub_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(presented_token)
        .ok_or_else(|| AppError::Unauthorized("hub token required".to_owned()))?;

    if !token_matches(&state.hub_secret, presented) {
        return Err(AppError::Unauthorized("hub token rejected".to_owned()).into());
    }

    Ok(next.run(request).await)
}

/// Extracts the secret from `Token token="..."` or `Bearer ...`.
fn presented_token(authorization: &str) -> Option<&str> {
    let authorization = authorization.trim();
    let token = if let Some(rest) = authorization.strip_prefix("Token ") {
        let value = rest.trim().strip_prefix("token=")?;
        value
            .strip_prefix('"')
            .and_then(|quoted| quoted.strip_suffix('"'))
            .unwrap_or(value)
    } else {
        authorization.strip_prefix("Bearer ")?.trim()
    };

    (!token.is_empty()).then_some(token)
}

fn token_matches(expected: &str, presented: &str) -> bool {
    expected.as_bytes().ct_eq(presented.as_bytes()).into()
}
