use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Literal marker written in a file-name slot when a variable does not apply.
pub const ABSENT_TOKEN: &str = "Nulo";

/// Unvalidated description of an independent variable, as typed by the user or stored
/// by the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AxisDefinition {
    pub name: String,
    pub sub_values: Vec<String>,
    #[serde(default)]
    pub allow_multiple: bool,
    #[serde(default)]
    pub mandatory_if_multiple: bool,
}

impl AxisDefinition {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        sub_values: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            name: name.into(),
            sub_values: sub_values.into_iter().map(Into::into).collect(),
            allow_multiple: false,
            mandatory_if_multiple: false,
        }
    }

    pub fn multiple(mut self) -> Self {
        self.allow_multiple = true;
        self
    }

    pub fn mandatory(mut self) -> Self {
        self.allow_multiple = true;
        self.mandatory_if_multiple = true;
        self
    }
}

/// A validated independent variable. Only `SchemaModel` constructs these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Axis {
    pub(crate) name: String,
    pub(crate) sub_values: Vec<String>,
    pub(crate) allow_multiple: bool,
    pub(crate) mandatory_if_multiple: bool,
}

impl Axis {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sub_values(&self) -> &[String] {
        &self.sub_values
    }

    pub fn allow_multiple(&self) -> bool {
        self.allow_multiple
    }

    /// A participant may only ever use one sub-value on a fixed axis.
    pub fn is_fixed(&self) -> bool {
        !self.allow_multiple
    }

    /// Mandatory-if-multiple: the absent token is not allowed in this slot.
    pub fn is_mandatory(&self) -> bool {
        self.allow_multiple && self.mandatory_if_multiple
    }

    pub fn position_of(&self, value: &str) -> Option<usize> {
        self.sub_values.iter().position(|v| v == value)
    }

    pub fn contains(&self, value: &str) -> bool {
        self.position_of(value).is_some()
    }

    /// Exact-case spelling of a sub-value that matches `value` ignoring case.
    pub fn case_insensitive_match(&self, value: &str) -> Option<&str> {
        self.sub_values
            .iter()
            .find(|v| v.to_lowercase() == value.to_lowercase())
            .map(String::as_str)
    }

    pub fn to_definition(&self) -> AxisDefinition {
        AxisDefinition {
            name: self.name.clone(),
            sub_values: self.sub_values.clone(),
            allow_multiple: self.allow_multiple,
            mandatory_if_multiple: self.mandatory_if_multiple,
        }
    }
}
