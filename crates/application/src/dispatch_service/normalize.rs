use std::any::Any;
use std::panic::AssertUnwindSafe;

use actionhub_core::{AppError, AppResult, CorrelationId};
use actionhub_domain::{ActionError, ActionResponse};
use futures::FutureExt;
use tracing::{error, warn};

/// Awaits a plugin call, turning a panic into an internal error.
pub(super) async fn contain_panic<T, F>(action: &str, call: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    AssertUnwindSafe(call)
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| {
            Err(AppError::Internal(format!(
                "action '{action}' panicked: {}",
                panic_message(panic.as_ref())
            )))
        })
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Converts any dispatch fault into a failed [`ActionResponse`].
pub(super) fn failure_response(
    action: &str,
    correlation_id: &CorrelationId,
    fault: &AppError,
) -> ActionResponse {
    let status = fault.status_code();
    let message = match fault {
        AppError::Internal(detail) => {
            error!(
                action = %action,
                correlation_id = %correlation_id,
                error = %detail,
                "action failed with an internal error"
            );
            format!("internal error while running action '{action}'")
        }
        other => {
            warn!(
                action = %action,
                correlation_id = %correlation_id,
                status,
                error = %other,
                "action failed"
            );
            other.to_string()
        }
    };

    let response = ActionResponse::failure(ActionError::new(
        status,
        message,
        correlation_id.as_str(),
    ));

    if fault.requires_reauthorization() {
        response.with_reset_state()
    } else {
        response
    }
}
