//! Informational coverage reports. Nothing here blocks acceptance: a participant may
//! still be mid-study.

use super::ConsistencyLedger;
use crate::schema::SchemaModel;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Sub-values of a mandatory variable a participant has no file for yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverageGap {
    pub participant: String,
    pub axis: String,
    /// In schema definition order.
    pub missing: Vec<String>,
}

/// What the accepted files actually use, as opposed to what the schema allows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudyParameters {
    pub participants: Vec<String>,
    /// `(axis name, sub-values used)` in schema order; sub-values in definition order.
    pub values_by_axis: Vec<(String, Vec<String>)>,
}

impl ConsistencyLedger {
    /// Participant → sub-values already covered on `axis_index`. Every recorded
    /// participant appears, with an empty set when none of their files names a value.
    pub fn mandatory_coverage(&self, axis_index: usize) -> BTreeMap<String, BTreeSet<String>> {
        self.participants()
            .map(|participant| {
                let covered = self
                    .identities_of(participant)
                    .filter_map(|identity| identity.selection(axis_index))
                    .flat_map(|selection| selection.values().iter().cloned())
                    .collect();
                (participant.to_string(), covered)
            })
            .collect()
    }

    /// Gaps for every mandatory-if-multiple variable, participants in id order.
    pub fn missing_mandatory(&self, schema: &SchemaModel) -> Vec<CoverageGap> {
        let mut gaps = Vec::new();
        for (axis_index, axis) in schema.axes().iter().enumerate() {
            if !axis.is_mandatory() {
                continue;
            }
            for (participant, covered) in self.mandatory_coverage(axis_index) {
                let missing: Vec<String> = axis
                    .sub_values()
                    .iter()
                    .filter(|v| !covered.contains(*v))
                    .cloned()
                    .collect();
                if !missing.is_empty() {
                    gaps.push(CoverageGap { participant, axis: axis.name().to_string(), missing });
                }
            }
        }
        gaps
    }

    pub fn study_parameters(&self, schema: &SchemaModel) -> StudyParameters {
        let participants = self.participants().map(str::to_string).collect();
        let values_by_axis = schema
            .axes()
            .iter()
            .enumerate()
            .map(|(axis_index, axis)| {
                let used: BTreeSet<&str> = self
                    .identities()
                    .filter_map(|identity| identity.selection(axis_index))
                    .flat_map(|selection| selection.values().iter().map(String::as_str))
                    .collect();
                let ordered = axis
                    .sub_values()
                    .iter()
                    .filter(|v| used.contains(v.as_str()))
                    .cloned()
                    .collect();
                (axis.name().to_string(), ordered)
            })
            .collect();
        StudyParameters { participants, values_by_axis }
    }
}
