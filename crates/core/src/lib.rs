//! Shared primitives for all Rust crates in the action hub.

#![forbid(unsafe_code)]

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Result type used across action hub crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Identifier that ties one inbound invocation to its logs and error payloads.
///
/// Callers may supply their own webhook id; otherwise a random UUID is used.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Creates a random correlation identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Uses the caller supplied webhook id when present and non-blank.
    #[must_use]
    pub fn from_webhook_id(webhook_id: Option<&str>) -> Self {
        webhook_id
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map_or_else(Self::generate, |value| Self(value.to_owned()))
    }

    /// Returns the underlying identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for CorrelationId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Inbound payload exceeds the configured buffering limit.
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// Caller credentials are missing, expired, or could not be verified.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A destination provider refused the stored authorization.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The downstream destination rejected or failed the delivery.
    #[error("destination error: {message}")]
    Destination {
        /// HTTP-like status reported by the destination, when known.
        status: Option<u16>,
        /// Vendor supplied description.
        message: String,
    },

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP-like status code for this error category.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::PayloadTooLarge(_) => 413,
            Self::Destination { status, .. } => status.unwrap_or(502),
            Self::Internal(_) => 500,
        }
    }

    /// Returns true when the caller must discard cached authorization state.
    #[must_use]
    pub fn requires_reauthorization(&self) -> bool {
        matches!(self, Self::Unauthorized(_) | Self::Forbidden(_))
    }
}
