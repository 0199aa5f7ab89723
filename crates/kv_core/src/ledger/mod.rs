//! Consistency ledger
//!
//! Accumulates accepted identities per participant and owns the lock table for fixed
//! (non-multiple) variables. The table is keyed by `(participant, axis index)` and is
//! only touched by `accept` and `remove`.

pub mod coverage;
pub mod validate;

pub use coverage::{CoverageGap, StudyParameters};
pub use validate::validate_against_study;

use crate::error::LedgerError;
use crate::grammar::{AxisSelection, FileIdentity};
use crate::schema::SchemaModel;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Lock {
    value: String,
    /// Accepted identities of this participant that select `value` on this axis.
    holders: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyLedger {
    /// `fixed_axes[i]` is true when axis `i` does not allow multiple sub-values.
    fixed_axes: Vec<bool>,
    records: BTreeMap<String, BTreeSet<FileIdentity>>,
    locks: BTreeMap<(String, usize), Lock>,
}

impl ConsistencyLedger {
    pub fn for_schema(schema: &SchemaModel) -> Self {
        Self {
            fixed_axes: schema.axes().iter().map(|a| a.is_fixed()).collect(),
            records: BTreeMap::new(),
            locks: BTreeMap::new(),
        }
    }

    /// Rebuilds a ledger from persisted identities. Acceptance is commutative, so the
    /// input order does not matter.
    pub fn replay(
        schema: &SchemaModel,
        identities: impl IntoIterator<Item = FileIdentity>,
    ) -> Result<Self, LedgerError> {
        let mut ledger = Self::for_schema(schema);
        for identity in identities {
            ledger.accept(identity)?;
        }
        Ok(ledger)
    }

    pub fn axis_count(&self) -> usize {
        self.fixed_axes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.values().map(BTreeSet::len).sum()
    }

    pub fn participant_count(&self) -> usize {
        self.records.len()
    }

    pub fn has_participant(&self, participant: &str) -> bool {
        self.records.contains_key(participant)
    }

    pub fn contains(&self, identity: &FileIdentity) -> bool {
        self.records
            .get(identity.participant_id())
            .is_some_and(|set| set.contains(identity))
    }

    /// Highest attempt number recorded for any participant, 0 when empty.
    pub fn max_attempt(&self) -> u32 {
        self.identities().map(FileIdentity::attempt).max().unwrap_or(0)
    }

    pub fn participants(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// All accepted identities, ordered by participant, attempt, then selections.
    pub fn identities(&self) -> impl Iterator<Item = &FileIdentity> {
        self.records.values().flat_map(|set| set.iter())
    }

    pub fn identities_of(&self, participant: &str) -> impl Iterator<Item = &FileIdentity> {
        self.records.get(participant).into_iter().flat_map(|set| set.iter())
    }

    pub fn attempts_of(&self, participant: &str) -> BTreeSet<u32> {
        self.identities_of(participant).map(FileIdentity::attempt).collect()
    }

    /// Sub-value a participant is locked to on a fixed axis, if any non-absent file set it.
    pub fn locked_selection(&self, participant: &str, axis_index: usize) -> Option<&str> {
        self.locks
            .get(&(participant.to_string(), axis_index))
            .map(|lock| lock.value.as_str())
    }

    fn check_shape(&self, identity: &FileIdentity) -> Result<(), LedgerError> {
        let found = identity.selections().len();
        if found != self.fixed_axes.len() {
            return Err(LedgerError::ShapeMismatch { expected: self.fixed_axes.len(), found });
        }
        Ok(())
    }

    /// Records an already validated identity and sets or reinforces the participant's
    /// locks. Re-accepting an identical identity is a no-op.
    ///
    /// The lock check is repeated here so an unvalidated caller can never leave the
    /// table inconsistent; a conflict is reported as an invariant breach.
    pub fn accept(&mut self, identity: FileIdentity) -> Result<(), LedgerError> {
        self.check_shape(&identity)?;
        if self.contains(&identity) {
            return Ok(());
        }

        let participant = identity.participant_id().to_string();
        for (axis_index, selection) in self.fixed_selections(&identity) {
            if let Some(lock) = self.locks.get(&(participant.clone(), axis_index)) {
                if lock.value != selection {
                    return Err(LedgerError::LockConflict {
                        participant,
                        axis_index,
                        locked: lock.value.clone(),
                        attempted: selection.to_string(),
                    });
                }
            }
        }

        let fixed: Vec<(usize, String)> = self
            .fixed_selections(&identity)
            .map(|(i, v)| (i, v.to_string()))
            .collect();
        for (axis_index, value) in fixed {
            self.locks
                .entry((participant.clone(), axis_index))
                .and_modify(|lock| lock.holders += 1)
                .or_insert_with(|| {
                    debug!(participant = %participant, axis_index, value = %value, "lock set");
                    Lock { value: value.clone(), holders: 1 }
                });
        }

        info!(participant = %participant, attempt = identity.attempt(), "identity accepted");
        self.records.entry(participant).or_default().insert(identity);
        Ok(())
    }

    /// Inverse of `accept`. A lock is cleared once no remaining file of the participant
    /// establishes it. Returns false when the identity was not recorded.
    pub fn remove(&mut self, identity: &FileIdentity) -> bool {
        let participant = identity.participant_id();
        let Some(set) = self.records.get_mut(participant) else {
            return false;
        };
        if !set.remove(identity) {
            return false;
        }
        if set.is_empty() {
            self.records.remove(participant);
        }

        let fixed: Vec<usize> = self.fixed_selections(identity).map(|(i, _)| i).collect();
        for axis_index in fixed {
            let key = (participant.to_string(), axis_index);
            if let Some(lock) = self.locks.get_mut(&key) {
                lock.holders = lock.holders.saturating_sub(1);
                if lock.holders == 0 {
                    self.locks.remove(&key);
                    debug!(participant, axis_index, "lock cleared");
                }
            }
        }

        info!(participant, attempt = identity.attempt(), "identity removed");
        true
    }

    /// `(axis index, value)` for every fixed axis where the identity names a sub-value.
    /// The absent token never creates or reinforces a lock.
    fn fixed_selections<'a>(
        &'a self,
        identity: &'a FileIdentity,
    ) -> impl Iterator<Item = (usize, &'a str)> + 'a {
        identity
            .selections()
            .iter()
            .enumerate()
            .filter(move |(i, _)| self.fixed_axes.get(*i).copied().unwrap_or(false))
            .filter_map(|(i, selection)| match selection {
                AxisSelection::Values(values) => values.first().map(|v| (i, v.as_str())),
                AxisSelection::Absent => None,
            })
    }
}
