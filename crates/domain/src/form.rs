use std::collections::HashSet;
use std::str::FromStr;

use actionhub_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

/// Supported form field input types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormFieldType {
    /// Single line text input.
    String,
    /// Multi-line text input.
    Textarea,
    /// Choice among a list of options.
    Select,
    /// Link the end user follows to start an OAuth login.
    OauthLink,
}

impl FormFieldType {
    /// Returns stable wire value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Textarea => "textarea",
            Self::Select => "select",
            Self::OauthLink => "oauth_link",
        }
    }
}

impl FromStr for FormFieldType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "string" => Ok(Self::String),
            "textarea" => Ok(Self::Textarea),
            "select" => Ok(Self::Select),
            "oauth_link" => Ok(Self::OauthLink),
            _ => Err(AppError::Validation(format!(
                "unknown form field type '{value}'"
            ))),
        }
    }
}

/// One choice of a select field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormOption {
    name: String,
    label: String,
}

impl FormOption {
    /// Creates an option. The label falls back to the name when blank.
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> AppResult<Self> {
        let name = NonEmptyString::new(name)?;
        let label = label.into();
        let label = if label.trim().is_empty() {
            name.as_str().to_owned()
        } else {
            label
        };

        Ok(Self {
            name: name.into(),
            label,
        })
    }

    /// Returns the submitted value.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the display label.
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_str()
    }
}

/// One input the caller must render and resubmit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionFormField {
    name: NonEmptyString,
    label: NonEmptyString,
    field_type: FormFieldType,
    required: bool,
    description: Option<String>,
    options: Vec<FormOption>,
    interactive: bool,
    default: Option<String>,
    oauth_url: Option<String>,
}

impl ActionFormField {
    /// Creates an optional, non-interactive field.
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        field_type: FormFieldType,
    ) -> AppResult<Self> {
        Ok(Self {
            name: NonEmptyString::new(name)?,
            label: NonEmptyString::new(label)?,
            field_type,
            required: false,
            description: None,
            options: Vec::new(),
            interactive: false,
            default: None,
            oauth_url: None,
        })
    }

    /// Creates an OAuth login link field.
    pub fn oauth_link(
        name: impl Into<String>,
        label: impl Into<String>,
        oauth_url: impl Into<String>,
    ) -> AppResult<Self> {
        let oauth_url = NonEmptyString::new(oauth_url)?;
        Ok(Self::new(name, label, FormFieldType::OauthLink)?.with_oauth_url(oauth_url.into()))
    }

    /// Marks the field as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Marks the field as interactive: selecting it re-fetches the form.
    #[must_use]
    pub fn interactive(mut self) -> Self {
        self.interactive = true;
        self
    }

    /// Adds help text.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets select options. An empty list is allowed for partial listings.
    #[must_use]
    pub fn with_options(mut self, options: Vec<FormOption>) -> Self {
        self.options = options;
        self
    }

    /// Sets the prefilled value.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    fn with_oauth_url(mut self, oauth_url: String) -> Self {
        self.oauth_url = Some(oauth_url);
        self
    }

    /// Returns field name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns display label.
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_str()
    }

    /// Returns input type.
    #[must_use]
    pub fn field_type(&self) -> FormFieldType {
        self.field_type
    }

    /// Returns whether a value must be submitted.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Returns whether changing the value triggers a form re-fetch.
    #[must_use]
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Returns help text.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns select options.
    #[must_use]
    pub fn options(&self) -> &[FormOption] {
        &self.options
    }

    /// Returns the prefilled value.
    #[must_use]
    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Returns the login link of an oauth_link field.
    #[must_use]
    pub fn oauth_url(&self) -> Option<&str> {
        self.oauth_url.as_deref()
    }

    /// Returns whether the caller is expected to submit a value for this field.
    #[must_use]
    pub fn expects_value(&self) -> bool {
        self.required && self.field_type != FormFieldType::OauthLink
    }
}

/// Dynamic form description plus the opaque state the caller echoes back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionForm {
    fields: Vec<ActionFormField>,
    state: Option<String>,
}

impl ActionForm {
    /// Creates a form, rejecting duplicate field names.
    pub fn new(fields: Vec<ActionFormField>) -> AppResult<Self> {
        let mut names = HashSet::new();
        for field in &fields {
            if !names.insert(field.name()) {
                return Err(AppError::Validation(format!(
                    "form declares field '{}' more than once",
                    field.name()
                )));
            }
        }

        Ok(Self {
            fields,
            state: None,
        })
    }

    /// Attaches the state blob the caller must echo verbatim.
    #[must_use]
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Replaces or clears the state blob.
    pub fn set_state(&mut self, state: Option<String>) {
        self.state = state;
    }

    /// Returns fields in render order.
    #[must_use]
    pub fn fields(&self) -> &[ActionFormField] {
        &self.fields
    }

    /// Returns the field with the given name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&ActionFormField> {
        self.fields.iter().find(|field| field.name() == name)
    }

    /// Returns the opaque state blob.
    #[must_use]
    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    /// Returns the fields a submission must carry a value for.
    pub fn value_fields(&self) -> impl Iterator<Item = &ActionFormField> {
        self.fields.iter().filter(|field| field.expects_value())
    }
}
