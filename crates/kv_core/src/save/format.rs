use super::error::SaveError;
use super::SAVE_VERSION;
use crate::alias::AliasTable;
use crate::config::GrammarConfig;
use crate::grammar::parse;
use crate::ledger::ConsistencyLedger;
use crate::schema::{AxisDefinition, SchemaModel, SchemaState};
use crate::study::{validate_comment, validate_name, Study};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use rmp_serde::{from_slice, to_vec_named};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

/// Persisted form of a study. The ledger is stored as canonical file names and rebuilt by
/// re-parsing and replaying them on load.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct StudyRecord {
    /// Record format version for migration
    pub version: u32,

    /// Save timestamp (unix milliseconds)
    pub timestamp: u64,

    pub name: String,

    #[serde(default)]
    pub comment: String,

    pub max_participants: u32,

    pub max_attempts: u32,

    /// Missing in version 0 records; derived during migration.
    #[serde(default)]
    pub state: Option<SchemaState>,

    #[serde(default)]
    pub grammar: Option<GrammarConfig>,

    /// Independent variables in slot order
    pub axes: Vec<AxisDefinition>,

    /// Canonical file names of every accepted file
    pub identities: Vec<String>,

    #[serde(default)]
    pub aliases: AliasTable,
}

impl StudyRecord {
    pub fn from_study(study: &Study) -> Self {
        let schema = study.schema();
        Self {
            version: SAVE_VERSION,
            timestamp: current_timestamp(),
            name: study.name().to_string(),
            comment: study.comment().to_string(),
            max_participants: schema.max_participants(),
            max_attempts: schema.max_attempts(),
            state: Some(schema.state()),
            grammar: Some(schema.grammar().clone()),
            axes: schema.definitions(),
            identities: study.file_names(),
            aliases: study.aliases().clone(),
        }
    }

    pub fn update_timestamp(&mut self) {
        self.timestamp = current_timestamp();
    }

    pub fn validate(&self) -> Result<(), SaveError> {
        let mut seen = HashSet::new();
        for file_name in &self.identities {
            if !seen.insert(file_name) {
                return Err(SaveError::Corrupted);
            }
        }
        Ok(())
    }

    /// Rebuilds the study: validates the schema, then re-parses and accepts every stored
    /// file name. Acceptance order does not matter.
    pub fn into_study(self) -> Result<Study, SaveError> {
        self.validate()?;
        let name = validate_name(&self.name)?;
        let comment = validate_comment(&self.comment)?;

        let grammar = self.grammar.unwrap_or_default();
        grammar.validate()?;

        let state = if self.identities.is_empty() {
            self.state.unwrap_or(SchemaState::Draft)
        } else {
            SchemaState::Committed
        };
        let schema = SchemaModel::restore(
            self.axes,
            self.max_participants,
            self.max_attempts,
            state,
            grammar,
        )?;

        let mut ledger = ConsistencyLedger::for_schema(&schema);
        for file_name in &self.identities {
            let replay_error =
                |reason: String| SaveError::Replay { file_name: file_name.clone(), reason };
            let identity = parse(file_name, &schema).map_err(|e| replay_error(e.to_string()))?;
            ledger.accept(identity).map_err(|e| replay_error(e.to_string()))?;
        }

        Ok(Study::from_parts(name, comment, schema, ledger, self.aliases))
    }
}

/// Serialize and compress a study record
pub fn serialize_and_compress(record: &StudyRecord) -> Result<Vec<u8>, SaveError> {
    record.validate()?;

    // 1. MessagePack with field names, so added fields can default on older readers
    let msgpack = to_vec_named(record).map_err(SaveError::Serialization)?;

    // 2. LZ4, size prepended
    let compressed = compress_prepend_size(&msgpack);

    // 3. SHA256 trailer
    let mut hasher = Sha256::new();
    hasher.update(&compressed);
    let checksum = hasher.finalize();

    let mut result = compressed;
    result.extend_from_slice(&checksum);

    Ok(result)
}

/// Verify, decompress and deserialize a study record
pub fn decompress_and_deserialize(bytes: &[u8]) -> Result<StudyRecord, SaveError> {
    // Size header + checksum
    if bytes.len() < 4 + 32 {
        return Err(SaveError::Corrupted);
    }

    let (payload, checksum_bytes) = bytes.split_at(bytes.len() - 32);

    let mut hasher = Sha256::new();
    hasher.update(payload);
    let calculated_checksum = hasher.finalize();

    if &calculated_checksum[..] != checksum_bytes {
        return Err(SaveError::ChecksumMismatch);
    }

    let msgpack = decompress_size_prepended(payload).map_err(|_| SaveError::Decompression)?;

    let record: StudyRecord = from_slice(&msgpack).map_err(SaveError::Deserialization)?;

    if record.version > SAVE_VERSION {
        return Err(SaveError::VersionMismatch { found: record.version, expected: SAVE_VERSION });
    }

    Ok(record)
}

/// Human-readable export
pub fn to_json(record: &StudyRecord) -> Result<String, SaveError> {
    record.validate()?;
    Ok(serde_json::to_string_pretty(record)?)
}

pub fn from_json(json: &str) -> Result<StudyRecord, SaveError> {
    let record: StudyRecord = serde_json::from_str(json)?;
    if record.version > SAVE_VERSION {
        return Err(SaveError::VersionMismatch { found: record.version, expected: SAVE_VERSION });
    }
    Ok(record)
}

/// JSON Schema of `StudyRecord`, for collaborators reading exported studies.
pub fn record_json_schema() -> Result<String, SaveError> {
    let schema = schemars::schema_for!(StudyRecord);
    Ok(serde_json::to_string_pretty(&schema)?)
}

pub fn current_timestamp() -> u64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AxisDefinition;

    fn sample_study() -> Study {
        let schema = SchemaModel::create(
            vec![
                AxisDefinition::new("TipoSalto", ["CMJ", "SJ"]),
                AxisDefinition::new("Lado", ["Izq", "Der"]).mandatory(),
            ],
            4,
            5,
        )
        .unwrap();
        let mut study = Study::create("Saltos 2024", "Piloto", schema).unwrap();
        for name in ["P01 CMJ Izq 01.txt", "P01 CMJ Der+Izq 02.txt", "P02 SJ Der 01_Cinetica.csv"] {
            study.submit(name).unwrap();
        }
        study.set_alias("CMJ", "Contramovimiento").unwrap();
        study
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let study = sample_study();
        let record = StudyRecord::from_study(&study);

        let serialized = serialize_and_compress(&record).unwrap();
        let deserialized = decompress_and_deserialize(&serialized).unwrap();
        assert_eq!(record, deserialized);

        let restored = deserialized.into_study().unwrap();
        assert_eq!(restored, study);
    }

    #[test]
    fn test_identities_stored_canonically() {
        let record = StudyRecord::from_study(&sample_study());
        assert_eq!(record.identities, ["P01 CMJ Izq 01", "P01 CMJ Izq+Der 02", "P02 SJ Der 01"]);
        assert_eq!(record.state, Some(SchemaState::Committed));
    }

    #[test]
    fn test_checksum_validation() {
        let record = StudyRecord::from_study(&sample_study());
        let mut serialized = serialize_and_compress(&record).unwrap();

        if let Some(last) = serialized.last_mut() {
            *last = last.wrapping_add(1);
        }

        let result = decompress_and_deserialize(&serialized);
        assert!(matches!(result, Err(SaveError::ChecksumMismatch)));
    }

    #[test]
    fn test_truncated_data_is_corrupted() {
        assert!(matches!(decompress_and_deserialize(&[0u8; 10]), Err(SaveError::Corrupted)));
    }

    #[test]
    fn test_future_version_rejected() {
        let mut record = StudyRecord::from_study(&sample_study());
        record.version = SAVE_VERSION + 1;
        let serialized = serialize_and_compress(&record).unwrap();
        assert!(matches!(
            decompress_and_deserialize(&serialized),
            Err(SaveError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_replay_catches_tampered_identity() {
        let mut record = StudyRecord::from_study(&sample_study());
        // Conflicts with P01's CMJ lock
        record.identities.push("P01 SJ Izq 03".to_string());
        let err = record.into_study().unwrap_err();
        assert!(matches!(
            err,
            SaveError::Replay { ref file_name, .. } if file_name == "P01 SJ Izq 03"
        ));

        let mut record = StudyRecord::from_study(&sample_study());
        record.identities.push("P03 CMJ 01".to_string());
        assert!(matches!(record.into_study(), Err(SaveError::Replay { .. })));
    }

    #[test]
    fn test_duplicate_identities_are_corrupted() {
        let mut record = StudyRecord::from_study(&sample_study());
        record.identities.push("P01 CMJ Izq 01".to_string());
        assert!(matches!(serialize_and_compress(&record), Err(SaveError::Corrupted)));
    }

    #[test]
    fn test_json_roundtrip() {
        let record = StudyRecord::from_study(&sample_study());
        let json = to_json(&record).unwrap();
        assert!(json.contains("\"Contramovimiento\""));
        assert_eq!(from_json(&json).unwrap(), record);
    }

    #[test]
    fn test_record_json_schema_lists_fields() {
        let schema = record_json_schema().unwrap();
        for field in ["max_participants", "identities", "aliases", "multi_value_separator"] {
            assert!(schema.contains(field), "missing {field}");
        }
    }
}
