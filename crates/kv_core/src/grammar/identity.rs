use crate::schema::ABSENT_TOKEN;

/// What one file name says about one independent variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AxisSelection {
    /// The reserved absent token was written in the slot.
    Absent,
    /// One or more sub-values, kept in schema definition order.
    Values(Vec<String>),
}

impl AxisSelection {
    pub fn single(value: impl Into<String>) -> Self {
        AxisSelection::Values(vec![value.into()])
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, AxisSelection::Absent)
    }

    pub fn values(&self) -> &[String] {
        match self {
            AxisSelection::Absent => &[],
            AxisSelection::Values(values) => values,
        }
    }

    pub fn includes(&self, value: &str) -> bool {
        self.values().iter().any(|v| v == value)
    }

    /// Slot text as it appears in a canonical file name.
    pub fn render(&self, separator: char) -> String {
        match self {
            AxisSelection::Absent => ABSENT_TOKEN.to_string(),
            AxisSelection::Values(values) => values.join(&separator.to_string()),
        }
    }
}

/// Structured identity encoded in an accepted file name.
///
/// Ordering is participant, then attempt, then selections; the ledger relies on it for
/// deterministic listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileIdentity {
    participant_id: String,
    attempt: u32,
    selections: Vec<AxisSelection>,
}

impl FileIdentity {
    pub(crate) fn new(
        participant_id: String,
        attempt: u32,
        selections: Vec<AxisSelection>,
    ) -> Self {
        Self { participant_id, attempt, selections }
    }

    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn selections(&self) -> &[AxisSelection] {
        &self.selections
    }

    pub fn selection(&self, axis_index: usize) -> Option<&AxisSelection> {
        self.selections.get(axis_index)
    }
}
