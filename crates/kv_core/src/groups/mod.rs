//! Comparison groups
//!
//! Partitions accepted identities by the sub-values of one independent variable,
//! optionally holding a second variable at a fixed value. Group order always follows
//! the schema definition order, never insertion order or aliases.

pub mod request;

pub use request::GroupRequest;

use crate::alias::AliasTable;
use crate::error::GroupError;
use crate::grammar::FileIdentity;
use crate::ledger::ConsistencyLedger;
use crate::schema::{Axis, SchemaModel, ABSENT_TOKEN};
use std::collections::BTreeSet;
use tracing::debug;

const KEY_PART_SEPARATOR: char = ';';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub axis: String,
    pub value: String,
    /// `(held axis, held value)` in two-axes mode.
    pub held: Option<(String, String)>,
    /// Stable key, `Axis=Value` or `Axis=Value;Held=Value`.
    pub key: String,
    pub members: Vec<FileIdentity>,
}

impl Group {
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// `Axis: alias, Held: alias`, resolving sub-values through `aliases`.
    pub fn display_label(&self, aliases: &AliasTable) -> String {
        let mut label = format!("{}: {}", self.axis, aliases.display(&self.value));
        if let Some((held_axis, held_value)) = &self.held {
            label.push_str(&format!(", {}: {}", held_axis, aliases.display(held_value)));
        }
        label
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupWarning {
    EmptyGroup { key: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupResolution {
    pub groups: Vec<Group>,
    pub warnings: Vec<GroupWarning>,
}

impl GroupResolution {
    pub fn non_empty(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter().filter(|g| !g.is_empty())
    }
}

fn find_axis<'a>(schema: &'a SchemaModel, name: &str) -> Result<(usize, &'a Axis), GroupError> {
    schema
        .axis_index(name)
        .and_then(|i| schema.axis(i).map(|axis| (i, axis)))
        .ok_or_else(|| GroupError::UnknownAxis { axis: name.to_string() })
}

fn ensure_defined(axis: &Axis, value: &str) -> Result<(), GroupError> {
    if axis.contains(value) {
        Ok(())
    } else {
        Err(GroupError::UnknownSubValue { axis: axis.name().to_string(), value: value.to_string() })
    }
}

fn key_part(axis: &str, value: &str) -> String {
    format!("{}={}", axis, value)
}

/// Partitions the ledger's identities according to `request`.
///
/// Empty groups are kept in the result and reported as warnings; an empty ledger is
/// not an error.
pub fn resolve_groups(
    schema: &SchemaModel,
    ledger: &ConsistencyLedger,
    request: &GroupRequest,
) -> Result<GroupResolution, GroupError> {
    let (axis_index, axis) = find_axis(schema, request.axis())?;

    let held = match request.held() {
        Some((held_name, held_value)) => {
            let (held_index, held_axis) = find_axis(schema, held_name)?;
            if held_index == axis_index {
                return Err(GroupError::SameAxis { axis: held_name.to_string() });
            }
            ensure_defined(held_axis, held_value)?;
            Some((held_index, held_axis.name(), held_value))
        }
        None => None,
    };

    let selected: Vec<&String> = match request.values() {
        None => axis.sub_values().iter().collect(),
        Some([]) => return Err(GroupError::EmptySelection { axis: axis.name().to_string() }),
        Some(values) => {
            for value in values {
                ensure_defined(axis, value)?;
            }
            axis.sub_values().iter().filter(|v| values.contains(v)).collect()
        }
    };

    let mut resolution = GroupResolution::default();
    for value in selected {
        let members: Vec<FileIdentity> = ledger
            .identities()
            .filter(|identity| {
                identity.selection(axis_index).is_some_and(|s| s.includes(value))
                    && held.map_or(true, |(held_index, _, held_value)| {
                        identity.selection(held_index).is_some_and(|s| s.includes(held_value))
                    })
            })
            .cloned()
            .collect();

        let mut key = key_part(axis.name(), value);
        if let Some((_, held_name, held_value)) = held {
            key.push(KEY_PART_SEPARATOR);
            key.push_str(&key_part(held_name, held_value));
        }

        if members.is_empty() {
            debug!(key = %key, "empty comparison group");
            resolution.warnings.push(GroupWarning::EmptyGroup { key: key.clone() });
        }

        resolution.groups.push(Group {
            axis: axis.name().to_string(),
            value: value.clone(),
            held: held.map(|(_, name, value)| (name.to_string(), value.to_string())),
            key,
            members,
        });
    }

    Ok(resolution)
}

/// Every complete `Axis=Value;…` key present in the ledger. Absent slots render as the
/// absent token and multi-value slots join their sub-values with the separator.
pub fn full_group_keys(schema: &SchemaModel, ledger: &ConsistencyLedger) -> BTreeSet<String> {
    let separator = schema.separator();
    ledger
        .identities()
        .map(|identity| {
            schema
                .axes()
                .iter()
                .zip(identity.selections())
                .map(|(axis, selection)| key_part(axis.name(), &selection.render(separator)))
                .collect::<Vec<_>>()
                .join(&KEY_PART_SEPARATOR.to_string())
        })
        .collect()
}

/// Renders a full group key for display: `Axis=Value` parts become `Axis: alias`, joined
/// with `, `. Multi-value parts are aliased piece by piece.
pub fn display_key(key: &str, aliases: &AliasTable, separator: char) -> String {
    key.split(KEY_PART_SEPARATOR)
        .map(|part| match part.split_once('=') {
            Some((axis, value)) if value == ABSENT_TOKEN => format!("{}: {}", axis, value),
            Some((axis, value)) => {
                let shown: Vec<&str> =
                    value.split(separator).map(|piece| aliases.display(piece)).collect();
                format!("{}: {}", axis, shown.join(" + "))
            }
            None => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
