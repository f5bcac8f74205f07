//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod action;
mod form;
mod response;

pub use action::{ActionDefinition, ActionParam, ActionType};
pub use form::{ActionForm, ActionFormField, FormFieldType, FormOption};
pub use response::{ActionError, ActionResponse, RESET_STATE};
