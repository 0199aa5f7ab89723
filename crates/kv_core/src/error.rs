use thiserror::Error;

/// Coarse classification used by callers to decide how a rejection is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Wrong token count, malformed participant id or attempt token.
    Structural,
    /// Name is well formed but breaks the schema (unknown value, multiplicity, absent rules).
    SchemaViolation,
    /// Name is valid on its own but conflicts with data already in the study.
    ConsistencyViolation,
    /// Rejected schema or metadata edit.
    SchemaEditViolation,
    /// Invalid schema or study definition at creation time.
    Definition,
    /// Internal invariant breach. Indicates a defect, never a user mistake.
    Defect,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("A study must define at least one independent variable")]
    NoAxes,

    #[error("Independent variable #{index} has an empty name")]
    EmptyAxisName { index: usize },

    #[error(
        "Independent variable name '{name}' may only contain ASCII letters, digits, '_' or '-'"
    )]
    InvalidAxisName { name: String },

    #[error("Duplicate independent variable name: '{name}'")]
    DuplicateAxisName { name: String },

    #[error("Independent variable '{axis}' needs at least two sub-values, found {found}")]
    TooFewSubValues { axis: String, found: usize },

    #[error("Empty sub-value found in '{axis}'")]
    EmptySubValue { axis: String },

    #[error(
        "Sub-value '{value}' in '{axis}' cannot contain spaces, '{separator}' or any of . / \\ ; ="
    )]
    InvalidSubValue { axis: String, value: String, separator: char },

    #[error("Sub-value '{value}' in '{axis}' cannot be named like the reserved absent token")]
    ReservedSubValue { axis: String, value: String },

    #[error("Duplicate sub-value '{value}' inside '{axis}'")]
    DuplicateSubValue { axis: String, value: String },

    #[error("{field} must be a positive integer")]
    InvalidLimit { field: &'static str },

    #[error(transparent)]
    Edit(#[from] SchemaEditViolation),
}

impl SchemaError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SchemaError::Edit(_) => ErrorCategory::SchemaEditViolation,
            _ => ErrorCategory::Definition,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaEditViolation {
    #[error(
        "Cannot lower the participant limit to {requested}: {recorded} participants have files"
    )]
    ParticipantLimitBelowRecorded { requested: u32, recorded: usize },

    #[error("Cannot lower the attempt limit to {requested}: attempt {recorded} is recorded")]
    AttemptLimitBelowRecorded { requested: u32, recorded: u32 },

    #[error("The schema shape is frozen once files have been accepted; create a new study instead")]
    ShapeFrozen,

    #[error("No independent variable at position {index} (schema has {axis_count})")]
    UnknownAxisIndex { index: usize, axis_count: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error(
        "'{stem}' has {found} space-separated parts, expected {expected} \
         (participant, one per variable, attempt)"
    )]
    MalformedStructure { stem: String, expected: usize, found: usize },

    #[error("Participant id '{token}' must be letters followed by digits (e.g. P01, Sujeto007)")]
    InvalidParticipantId { token: String },

    #[error("Attempt '{token}' is not a positive integer")]
    InvalidAttemptToken { token: String },

    #[error("'{piece}' is not a sub-value of '{axis}'{}", suggestion_hint(.suggestion))]
    UnknownSubValue { axis: String, piece: String, suggestion: Option<String> },

    #[error("'{axis}' accepts a single sub-value per file, found '{token}'")]
    MultipleNotAllowed { axis: String, token: String },

    #[error("Sub-value '{value}' is repeated in the '{axis}' slot")]
    DuplicateSubValue { axis: String, value: String },

    #[error("'{axis}' is mandatory and cannot be marked absent")]
    InvalidAbsentForMandatoryAxis { axis: String },

    #[error("Every variable is marked absent; at least one sub-value is required")]
    AllAxesAbsent,
}

fn suggestion_hint(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(exact) => format!(" (did you mean '{}'?)", exact),
        None => String::new(),
    }
}

impl NameError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            NameError::MalformedStructure { .. }
            | NameError::InvalidParticipantId { .. }
            | NameError::InvalidAttemptToken { .. } => ErrorCategory::Structural,
            _ => ErrorCategory::SchemaViolation,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyError {
    #[error("Adding participant '{participant}' would exceed the limit of {limit} participants")]
    ParticipantLimitExceeded { participant: String, limit: u32 },

    #[error("Attempt {attempt} exceeds the limit of {limit} attempts")]
    AttemptLimitExceeded { attempt: u32, limit: u32 },

    #[error("'{axis}' is fixed to '{locked}' for this participant, found '{attempted}'")]
    FixedAxisMismatch { axis: String, locked: String, attempted: String },

    #[error("'{file_name}' is already part of the study")]
    DuplicateIdentity { file_name: String },

    #[error("Identity has {found} selections but the schema defines {expected} variables")]
    ShapeMismatch { expected: usize, found: usize },
}

impl ConsistencyError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ConsistencyError::ShapeMismatch { .. } => ErrorCategory::Defect,
            _ => ErrorCategory::ConsistencyViolation,
        }
    }
}

/// Ledger invariant breaches. These only occur when `accept` is called without a prior
/// successful validation, and always indicate a defect in the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("internal invariant breach: identity has {found} selections, ledger tracks {expected}")]
    ShapeMismatch { expected: usize, found: usize },

    #[error(
        "internal invariant breach: participant '{participant}' is locked to '{locked}' \
         on variable #{axis_index}, got '{attempted}'"
    )]
    LockConflict { participant: String, axis_index: usize, locked: String, attempted: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GroupError {
    #[error("Unknown independent variable '{axis}'")]
    UnknownAxis { axis: String },

    #[error("'{value}' is not a sub-value of '{axis}'")]
    UnknownSubValue { axis: String, value: String },

    #[error("The held variable must differ from the grouped variable ('{axis}')")]
    SameAxis { axis: String },

    #[error("No sub-values selected for '{axis}'")]
    EmptySelection { axis: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AliasError {
    #[error("'{value}' is not a sub-value defined in this study")]
    UnknownSubValue { value: String },

    #[error("Alias for '{value}' exceeds {max} characters")]
    AliasTooLong { value: String, max: usize },
}

/// Failure of one `parse → validate → accept` unit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error(transparent)]
    Name(#[from] NameError),

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),

    #[error(transparent)]
    Invariant(#[from] LedgerError),
}

impl SubmitError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SubmitError::Name(e) => e.category(),
            SubmitError::Consistency(e) => e.category(),
            SubmitError::Invariant(_) => ErrorCategory::Defect,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StudyError {
    #[error("Invalid study name: {reason}")]
    InvalidName { reason: String },

    #[error("Comment cannot exceed {max} characters (found {len})")]
    CommentTooLong { len: usize, max: usize },

    #[error("'{file_name}' is not recorded in this study")]
    NotRecorded { file_name: String },

    #[error("Study lock poisoned by a panicked writer")]
    Poisoned,

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Alias(#[from] AliasError),

    #[error(transparent)]
    Name(#[from] NameError),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error(transparent)]
    Invariant(#[from] LedgerError),
}

impl From<SchemaEditViolation> for StudyError {
    fn from(err: SchemaEditViolation) -> Self {
        StudyError::Schema(SchemaError::Edit(err))
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read grammar config from '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse grammar config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid grammar config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_error_categories() {
        let structural =
            NameError::MalformedStructure { stem: "P04 CMJ 02".into(), expected: 4, found: 3 };
        assert_eq!(structural.category(), ErrorCategory::Structural);

        let violation = NameError::AllAxesAbsent;
        assert_eq!(violation.category(), ErrorCategory::SchemaViolation);
    }

    #[test]
    fn test_unknown_sub_value_message_includes_suggestion() {
        let err = NameError::UnknownSubValue {
            axis: "TipoSalto".into(),
            piece: "cmj".into(),
            suggestion: Some("CMJ".into()),
        };
        assert_eq!(
            err.to_string(),
            "'cmj' is not a sub-value of 'TipoSalto' (did you mean 'CMJ'?)"
        );

        let err = NameError::UnknownSubValue {
            axis: "TipoSalto".into(),
            piece: "DJ".into(),
            suggestion: None,
        };
        assert_eq!(err.to_string(), "'DJ' is not a sub-value of 'TipoSalto'");
    }

    #[test]
    fn test_submit_error_category_delegates() {
        let err: SubmitError =
            ConsistencyError::AttemptLimitExceeded { attempt: 4, limit: 3 }.into();
        assert_eq!(err.category(), ErrorCategory::ConsistencyViolation);

        let err: SubmitError = LedgerError::ShapeMismatch { expected: 2, found: 1 }.into();
        assert_eq!(err.category(), ErrorCategory::Defect);
    }

    #[test]
    fn test_edit_violation_is_schema_error() {
        let err: SchemaError = SchemaEditViolation::ShapeFrozen.into();
        assert_eq!(err.category(), ErrorCategory::SchemaEditViolation);
    }
}
