//! Study aggregate
//!
//! Owns the metadata, schema, ledger and alias table of one study. Every file goes
//! through `submit`, the atomic `parse → validate → accept` unit: on any failure the
//! study is left untouched.

use crate::alias::AliasTable;
use crate::error::{GroupError, StudyError, SubmitError};
use crate::grammar::{parse, to_file_name, FileIdentity};
use crate::groups::{self, GroupRequest, GroupResolution};
use crate::ledger::{validate_against_study, ConsistencyLedger, CoverageGap, StudyParameters};
use crate::schema::{AxisDefinition, MetadataEdit, SchemaModel};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

pub const MIN_NAME_LEN: usize = 3;
pub const MAX_COMMENT_LEN: usize = 150;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Study {
    name: String,
    comment: String,
    schema: SchemaModel,
    ledger: ConsistencyLedger,
    aliases: AliasTable,
}

pub(crate) fn validate_name(raw: &str) -> Result<String, StudyError> {
    let name = raw.trim();
    if name.chars().count() < MIN_NAME_LEN {
        return Err(StudyError::InvalidName {
            reason: format!("must have at least {} characters", MIN_NAME_LEN),
        });
    }
    Ok(name.to_string())
}

pub(crate) fn validate_comment(raw: &str) -> Result<String, StudyError> {
    let comment = raw.trim();
    let len = comment.chars().count();
    if len > MAX_COMMENT_LEN {
        return Err(StudyError::CommentTooLong { len, max: MAX_COMMENT_LEN });
    }
    Ok(comment.to_string())
}

impl Study {
    pub fn create(name: &str, comment: &str, schema: SchemaModel) -> Result<Self, StudyError> {
        let name = validate_name(name)?;
        let comment = validate_comment(comment)?;
        let ledger = ConsistencyLedger::for_schema(&schema);
        info!(study = %name, axes = schema.axis_count(), "study created");
        Ok(Self { name, comment, schema, ledger, aliases: AliasTable::new() })
    }

    /// Reassembles a study from persisted parts. The ledger must have been built for
    /// `schema`.
    pub(crate) fn from_parts(
        name: String,
        comment: String,
        schema: SchemaModel,
        ledger: ConsistencyLedger,
        mut aliases: AliasTable,
    ) -> Self {
        let dropped = aliases.retain_defined(&schema);
        if dropped > 0 {
            warn!(study = %name, dropped, "ignoring aliases of undefined sub-values");
        }
        Self { name, comment, schema, ledger, aliases }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn schema(&self) -> &SchemaModel {
        &self.schema
    }

    pub fn ledger(&self) -> &ConsistencyLedger {
        &self.ledger
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Canonical names of every accepted file, in ledger order.
    pub fn file_names(&self) -> Vec<String> {
        self.ledger.identities().map(|id| to_file_name(id, &self.schema)).collect()
    }

    /// Dry run of `submit`: the identity the name would be recorded as, or why it would
    /// be rejected.
    pub fn check(&self, file_name: &str) -> Result<FileIdentity, SubmitError> {
        let identity = parse(file_name, &self.schema)?;
        validate_against_study(&identity, &self.schema, &self.ledger)?;
        Ok(identity)
    }

    pub fn submit(&mut self, file_name: &str) -> Result<FileIdentity, SubmitError> {
        let identity = match self.check(file_name) {
            Ok(identity) => identity,
            Err(err) => {
                debug!(study = %self.name, file_name, error = %err, "file rejected");
                return Err(err);
            }
        };
        self.ledger.accept(identity.clone())?;
        self.schema.commit();
        Ok(identity)
    }

    /// Removes the file `file_name` resolves to. Locks held only by that file are released.
    pub fn remove_file(&mut self, file_name: &str) -> Result<FileIdentity, StudyError> {
        let identity = parse(file_name, &self.schema)?;
        if !self.ledger.remove(&identity) {
            return Err(StudyError::NotRecorded {
                file_name: to_file_name(&identity, &self.schema),
            });
        }
        Ok(identity)
    }

    /// Replaces one recorded file by another. If the new name is rejected the old
    /// record is restored and the error returned.
    pub fn rename_file(
        &mut self,
        old_name: &str,
        new_name: &str,
    ) -> Result<FileIdentity, StudyError> {
        let previous = self.remove_file(old_name)?;
        match self.submit(new_name) {
            Ok(identity) => {
                info!(study = %self.name, from = old_name, to = new_name, "file renamed");
                Ok(identity)
            }
            Err(err) => {
                self.ledger.accept(previous)?;
                Err(err.into())
            }
        }
    }

    /// Edits the study name and schema metadata together; nothing changes on failure.
    pub fn edit_metadata(
        &mut self,
        name: Option<&str>,
        edit: &MetadataEdit,
    ) -> Result<(), StudyError> {
        let name = name.map(validate_name).transpose()?;
        self.schema.edit_metadata(edit, &self.ledger)?;
        if let Some(name) = name {
            info!(from = %self.name, to = %name, "study renamed");
            self.name = name;
        }
        Ok(())
    }

    pub fn set_comment(&mut self, comment: &str) -> Result<(), StudyError> {
        self.comment = validate_comment(comment)?;
        Ok(())
    }

    /// Replaces the variables of a study that has not accepted any file yet.
    pub fn edit_shape(&mut self, axes: Vec<AxisDefinition>) -> Result<(), StudyError> {
        self.schema.edit_shape(axes)?;
        self.ledger = ConsistencyLedger::for_schema(&self.schema);
        self.aliases.retain_defined(&self.schema);
        Ok(())
    }

    pub fn set_alias(&mut self, sub_value: &str, alias: &str) -> Result<(), StudyError> {
        self.aliases.set(&self.schema, sub_value, alias)?;
        Ok(())
    }

    pub fn remove_alias(&mut self, sub_value: &str) -> Option<String> {
        self.aliases.remove(sub_value)
    }

    pub fn resolve_groups(&self, request: &GroupRequest) -> Result<GroupResolution, GroupError> {
        groups::resolve_groups(&self.schema, &self.ledger, request)
    }

    pub fn full_group_keys(&self) -> BTreeSet<String> {
        groups::full_group_keys(&self.schema, &self.ledger)
    }

    pub fn missing_mandatory(&self) -> Vec<CoverageGap> {
        self.ledger.missing_mandatory(&self.schema)
    }

    pub fn study_parameters(&self) -> StudyParameters {
        self.ledger.study_parameters(&self.schema)
    }
}
