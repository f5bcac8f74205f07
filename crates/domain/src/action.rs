use std::collections::HashSet;
use std::str::FromStr;

use actionhub_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

/// Kinds of payload an action can accept from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Result set of a query.
    Query,
    /// Rendered dashboard export.
    Dashboard,
    /// Single cell value.
    Cell,
    /// Audience membership update.
    CustomAudience,
}

impl ActionType {
    /// Returns stable wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Dashboard => "dashboard",
            Self::Cell => "cell",
            Self::CustomAudience => "custom_audience",
        }
    }
}

impl FromStr for ActionType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "query" => Ok(Self::Query),
            "dashboard" => Ok(Self::Dashboard),
            "cell" => Ok(Self::Cell),
            "custom_audience" => Ok(Self::CustomAudience),
            _ => Err(AppError::Validation(format!(
                "unknown action type '{value}'"
            ))),
        }
    }
}

/// Static parameter configured once per destination instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionParam {
    name: NonEmptyString,
    label: NonEmptyString,
    required: bool,
    sensitive: bool,
    description: Option<String>,
}

impl ActionParam {
    /// Creates a validated static parameter.
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        required: bool,
        sensitive: bool,
    ) -> AppResult<Self> {
        Ok(Self {
            name: NonEmptyString::new(name)?,
            label: NonEmptyString::new(label)?,
            required,
            sensitive,
            description: None,
        })
    }

    /// Adds help text shown next to the parameter.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns display label.
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_str()
    }

    /// Returns whether a value must be present on every request.
    #[must_use]
    pub fn required(&self) -> bool {
        self.required
    }

    /// Returns whether the value is a secret the caller should mask.
    #[must_use]
    pub fn sensitive(&self) -> bool {
        self.sensitive
    }

    /// Returns optional help text.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Registered destination capability, immutable after startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDefinition {
    name: String,
    label: NonEmptyString,
    description: Option<String>,
    supported_types: Vec<ActionType>,
    uses_oauth: bool,
    uses_streaming: bool,
    params: Vec<ActionParam>,
}

impl ActionDefinition {
    /// Creates a validated action definition.
    ///
    /// The name becomes part of every action URL, so only lowercase ASCII
    /// letters, digits, `_` and `-` are accepted.
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        supported_types: Vec<ActionType>,
    ) -> AppResult<Self> {
        let name = name.into();
        validate_action_name(name.as_str())?;

        if supported_types.is_empty() {
            return Err(AppError::Validation(format!(
                "action '{name}' must support at least one action type"
            )));
        }

        let mut seen = HashSet::new();
        let supported_types = supported_types
            .into_iter()
            .filter(|action_type| seen.insert(*action_type))
            .collect();

        Ok(Self {
            name,
            label: NonEmptyString::new(label)?,
            description: None,
            supported_types,
            uses_oauth: false,
            uses_streaming: false,
            params: Vec::new(),
        })
    }

    /// Adds a human description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Marks the action as requiring OAuth authorization.
    #[must_use]
    pub fn with_oauth(mut self) -> Self {
        self.uses_oauth = true;
        self
    }

    /// Marks the action as able to consume streaming payloads.
    #[must_use]
    pub fn with_streaming(mut self) -> Self {
        self.uses_streaming = true;
        self
    }

    /// Sets static parameters, rejecting duplicate names.
    pub fn with_params(mut self, params: Vec<ActionParam>) -> AppResult<Self> {
        let mut names = HashSet::new();
        for param in &params {
            if !names.insert(param.name()) {
                return Err(AppError::Validation(format!(
                    "action '{}' declares parameter '{}' more than once",
                    self.name,
                    param.name()
                )));
            }
        }

        self.params = params;
        Ok(self)
    }

    /// Returns the stable action name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns display label.
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_str()
    }

    /// Returns optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns declared payload kinds.
    #[must_use]
    pub fn supported_types(&self) -> &[ActionType] {
        &self.supported_types
    }

    /// Returns whether the given payload kind is accepted.
    #[must_use]
    pub fn supports(&self, action_type: ActionType) -> bool {
        self.supported_types.contains(&action_type)
    }

    /// Returns whether the action is OAuth based.
    #[must_use]
    pub fn uses_oauth(&self) -> bool {
        self.uses_oauth
    }

    /// Returns whether the action reads payloads incrementally.
    #[must_use]
    pub fn uses_streaming(&self) -> bool {
        self.uses_streaming
    }

    /// Returns static parameters.
    #[must_use]
    pub fn params(&self) -> &[ActionParam] {
        &self.params
    }

    /// Returns static parameters that must be present on every request.
    pub fn required_params(&self) -> impl Iterator<Item = &ActionParam> {
        self.params.iter().filter(|param| param.required())
    }
}

fn validate_action_name(name: &str) -> AppResult<()> {
    if name.is_empty() {
        return Err(AppError::Validation(
            "action name must not be empty".to_owned(),
        ));
    }

    let valid = name
        .chars()
        .all(|character| matches!(character, 'a'..='z' | '0'..='9' | '_' | '-'));
    if !valid {
        return Err(AppError::Validation(format!(
            "action name '{name}' may only contain lowercase letters, digits, '_' and '-'"
        )));
    }

    Ok(())
}
