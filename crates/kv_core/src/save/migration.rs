use super::error::SaveError;
use super::format::StudyRecord;
use super::SAVE_VERSION;
use crate::config::GrammarConfig;
use crate::schema::SchemaState;

/// Migrate a study record from older versions to the current version
pub fn migrate_record(mut record: StudyRecord) -> Result<StudyRecord, SaveError> {
    let original_version = record.version;

    record = match record.version {
        0 => migrate_v0_to_v1(record),
        SAVE_VERSION => record,
        found => {
            return Err(SaveError::VersionMismatch { found, expected: SAVE_VERSION });
        }
    };

    record.version = SAVE_VERSION;

    if original_version != SAVE_VERSION {
        record.update_timestamp();
        log::info!("Migrated study record from version {} to {}", original_version, SAVE_VERSION);
    }

    Ok(record)
}

/// Version 0 had no schema state, comment or grammar settings.
fn migrate_v0_to_v1(mut record: StudyRecord) -> StudyRecord {
    log::info!("Migrating study record '{}' from version 0 to 1", record.name);

    if record.state.is_none() {
        record.state = Some(if record.identities.is_empty() {
            SchemaState::Draft
        } else {
            SchemaState::Committed
        });
    }

    if record.grammar.is_none() {
        record.grammar = Some(GrammarConfig::default());
    }

    // v0 stored the flag on every variable; it only applies to multi-value ones
    for axis in &mut record.axes {
        if axis.mandatory_if_multiple && !axis.allow_multiple {
            log::warn!("Clearing mandatory flag on single-value variable '{}'", axis.name);
            axis.mandatory_if_multiple = false;
        }
    }

    record
}

/// Check if a record needs migration
pub fn needs_migration(record: &StudyRecord) -> bool {
    record.version < SAVE_VERSION
}
