use serde::{Deserialize, Serialize};

/// Response state telling the caller to discard cached authorization state.
pub const RESET_STATE: &str = "reset";

/// Structured failure attached to an unsuccessful action response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionError {
    status: u16,
    message: String,
    correlation_id: String,
}

impl ActionError {
    /// Creates a structured action error.
    #[must_use]
    pub fn new(status: u16, message: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            correlation_id: correlation_id.into(),
        }
    }

    /// Returns the HTTP-like status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Returns the human readable description.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Returns the correlation id of the failed invocation.
    #[must_use]
    pub fn correlation_id(&self) -> &str {
        self.correlation_id.as_str()
    }
}

/// Outcome of one action execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    success: bool,
    message: Option<String>,
    error: Option<ActionError>,
    state: Option<String>,
    refresh_query: bool,
}

impl ActionResponse {
    /// Creates a successful response.
    #[must_use]
    pub fn success() -> Self {
        Self {
            success: true,
            message: None,
            error: None,
            state: None,
            refresh_query: false,
        }
    }

    /// Creates a failed response carrying a structured error.
    #[must_use]
    pub fn failure(error: ActionError) -> Self {
        Self {
            success: false,
            message: Some(error.message().to_owned()),
            error: Some(error),
            state: None,
            refresh_query: false,
        }
    }

    /// Adds a message for the caller.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the reset sentinel so the caller restarts authorization.
    #[must_use]
    pub fn with_reset_state(mut self) -> Self {
        self.state = Some(RESET_STATE.to_owned());
        self
    }

    /// Asks the caller to re-run the query after delivery.
    #[must_use]
    pub fn with_refresh_query(mut self) -> Self {
        self.refresh_query = true;
        self
    }

    /// Returns whether delivery succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Returns the caller-facing message.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the structured error.
    #[must_use]
    pub fn error(&self) -> Option<&ActionError> {
        self.error.as_ref()
    }

    /// Returns the response state.
    #[must_use]
    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    /// Returns whether the caller should re-run the query.
    #[must_use]
    pub fn refresh_query(&self) -> bool {
        self.refresh_query
    }

    /// Returns whether the caller must discard cached authorization state.
    #[must_use]
    pub fn requests_reset(&self) -> bool {
        self.state.as_deref() == Some(RESET_STATE)
    }
}
