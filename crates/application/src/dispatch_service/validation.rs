use actionhub_core::{AppError, AppResult};
use actionhub_domain::{ActionDefinition, ActionForm};

use crate::action_ports::ActionRequest;

pub(super) fn ensure_supported_type(
    definition: &ActionDefinition,
    request: &ActionRequest,
) -> AppResult<()> {
    if definition.supports(request.action_type) {
        return Ok(());
    }

    Err(AppError::Validation(format!(
        "action '{}' does not accept '{}' payloads",
        definition.name(),
        request.action_type.as_str()
    )))
}

pub(super) fn ensure_required_params(
    definition: &ActionDefinition,
    request: &ActionRequest,
) -> AppResult<()> {
    let missing: Vec<&str> = definition
        .required_params()
        .map(|param| param.name())
        .filter(|name| request.param(name).is_none())
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    Err(AppError::Validation(format!(
        "missing required params: {}",
        missing.join(", ")
    )))
}

pub(super) fn ensure_required_fields(form: &ActionForm, request: &ActionRequest) -> AppResult<()> {
    let missing: Vec<&str> = form
        .value_fields()
        .map(|field| field.name())
        .filter(|name| request.form_value(name).is_none())
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    Err(AppError::Validation(format!(
        "missing required form fields: {}",
        missing.join(", ")
    )))
}
