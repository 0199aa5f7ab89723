use super::axis::{Axis, AxisDefinition};
use super::validation::{validate_axes, validate_axis_name, validate_limit};
use crate::config::GrammarConfig;
use crate::error::{SchemaEditViolation, SchemaError};
use crate::ledger::ConsistencyLedger;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

/// Whether the schema shape can still change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum SchemaState {
    /// No file has been accepted yet; the axis set may be replaced wholesale.
    Draft,
    /// At least one file was accepted. Only metadata edits are allowed from here on.
    Committed,
}

/// Metadata edits permitted at any time, subject to already-committed data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataEdit {
    pub max_participants: Option<u32>,
    pub max_attempts: Option<u32>,
    /// `(axis index, new name)`; renames keep the positional slot.
    pub axis_renames: Vec<(usize, String)>,
}

impl MetadataEdit {
    pub fn max_participants(mut self, value: u32) -> Self {
        self.max_participants = Some(value);
        self
    }

    pub fn max_attempts(mut self, value: u32) -> Self {
        self.max_attempts = Some(value);
        self
    }

    pub fn rename_axis(mut self, index: usize, name: impl Into<String>) -> Self {
        self.axis_renames.push((index, name.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.max_participants.is_none()
            && self.max_attempts.is_none()
            && self.axis_renames.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaModel {
    axes: Vec<Axis>,
    max_participants: u32,
    max_attempts: u32,
    state: SchemaState,
    grammar: GrammarConfig,
}

impl SchemaModel {
    pub fn create(
        axes: Vec<AxisDefinition>,
        max_participants: u32,
        max_attempts: u32,
    ) -> Result<Self, SchemaError> {
        Self::create_with_grammar(axes, max_participants, max_attempts, GrammarConfig::default())
    }

    pub fn create_with_grammar(
        axes: Vec<AxisDefinition>,
        max_participants: u32,
        max_attempts: u32,
        grammar: GrammarConfig,
    ) -> Result<Self, SchemaError> {
        let axes = validate_axes(&axes, grammar.multi_value_separator)?;
        let max_participants = validate_limit("max_participants", max_participants)?;
        let max_attempts = validate_limit("max_attempts", max_attempts)?;

        debug!(axes = axes.len(), max_participants, max_attempts, "schema created");
        Ok(Self { axes, max_participants, max_attempts, state: SchemaState::Draft, grammar })
    }

    /// Rebuilds a schema from persisted parts, keeping the stored state tag.
    pub(crate) fn restore(
        axes: Vec<AxisDefinition>,
        max_participants: u32,
        max_attempts: u32,
        state: SchemaState,
        grammar: GrammarConfig,
    ) -> Result<Self, SchemaError> {
        let mut schema = Self::create_with_grammar(axes, max_participants, max_attempts, grammar)?;
        schema.state = state;
        Ok(schema)
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn axis(&self, index: usize) -> Option<&Axis> {
        self.axes.get(index)
    }

    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }

    pub fn axis_index(&self, name: &str) -> Option<usize> {
        self.axes.iter().position(|a| a.name() == name)
    }

    pub fn max_participants(&self) -> u32 {
        self.max_participants
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn state(&self) -> SchemaState {
        self.state
    }

    pub fn is_committed(&self) -> bool {
        self.state == SchemaState::Committed
    }

    pub fn grammar(&self) -> &GrammarConfig {
        &self.grammar
    }

    pub fn separator(&self) -> char {
        self.grammar.multi_value_separator
    }

    pub fn definitions(&self) -> Vec<AxisDefinition> {
        self.axes.iter().map(Axis::to_definition).collect()
    }

    /// One-way transition; called on the first accepted file.
    pub(crate) fn commit(&mut self) {
        if self.state == SchemaState::Draft {
            info!("schema committed, shape is now frozen");
            self.state = SchemaState::Committed;
        }
    }

    /// Replaces the axis set. Only allowed while the schema is still a draft.
    pub fn edit_shape(&mut self, axes: Vec<AxisDefinition>) -> Result<(), SchemaError> {
        if self.is_committed() {
            return Err(SchemaEditViolation::ShapeFrozen.into());
        }
        self.axes = validate_axes(&axes, self.grammar.multi_value_separator)?;
        debug!(axes = self.axes.len(), "draft schema shape replaced");
        Ok(())
    }

    /// Applies limit changes and axis renames atomically: either every change is applied
    /// or none is.
    pub fn edit_metadata(
        &mut self,
        edit: &MetadataEdit,
        ledger: &ConsistencyLedger,
    ) -> Result<(), SchemaError> {
        if let Some(requested) = edit.max_participants {
            validate_limit("max_participants", requested)?;
            let recorded = ledger.participant_count();
            if (requested as usize) < recorded {
                let violation =
                    SchemaEditViolation::ParticipantLimitBelowRecorded { requested, recorded };
                return Err(violation.into());
            }
        }

        if let Some(requested) = edit.max_attempts {
            validate_limit("max_attempts", requested)?;
            let recorded = ledger.max_attempt();
            if requested < recorded {
                return Err(
                    SchemaEditViolation::AttemptLimitBelowRecorded { requested, recorded }.into()
                );
            }
        }

        let mut names: Vec<String> = self.axes.iter().map(|a| a.name().to_string()).collect();
        for (index, raw) in &edit.axis_renames {
            if *index >= names.len() {
                return Err(SchemaEditViolation::UnknownAxisIndex {
                    index: *index,
                    axis_count: names.len(),
                }
                .into());
            }
            names[*index] = validate_axis_name(*index, raw)?;
        }
        let mut seen = HashSet::new();
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(SchemaError::DuplicateAxisName { name: name.clone() });
            }
        }

        if let Some(value) = edit.max_participants {
            self.max_participants = value;
        }
        if let Some(value) = edit.max_attempts {
            self.max_attempts = value;
        }
        for (axis, name) in self.axes.iter_mut().zip(names) {
            axis.name = name;
        }

        info!(
            max_participants = self.max_participants,
            max_attempts = self.max_attempts,
            renames = edit.axis_renames.len(),
            "schema metadata updated"
        );
        Ok(())
    }
}
