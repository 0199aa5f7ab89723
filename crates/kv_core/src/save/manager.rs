use super::error::SaveError;
use super::format::{decompress_and_deserialize, serialize_and_compress, StudyRecord};
use super::migration::migrate_record;
use crate::study::Study;

use std::collections::BTreeSet;
use std::fs::{read_dir, remove_file, rename, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const STUDY_FILE_EXTENSION: &str = "kvs";

const MAX_FILE_STEM_LEN: usize = 200;

/// Directory of study files, one `<encoded name>.kvs` per study.
#[derive(Debug, Clone)]
pub struct StudyStore {
    root: PathBuf,
}

impl StudyStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn save(&self, study: &Study) -> Result<PathBuf, SaveError> {
        let path = self.path_for(study.name())?;
        save_to_path(&path, &StudyRecord::from_study(study))?;
        log::info!("Study '{}' saved to {:?}", study.name(), path);
        Ok(path)
    }

    pub fn load(&self, name: &str) -> Result<Study, SaveError> {
        let path = self.path_for(name)?;
        let record = load_from_path(&path)?;
        if record.name != name.trim() {
            return Err(SaveError::NameMismatch {
                requested: name.to_string(),
                stored: record.name,
            });
        }
        let study = record.into_study()?;
        log::info!("Study '{}' loaded", study.name());
        Ok(study)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).map(|path| path.exists()).unwrap_or(false)
    }

    pub fn delete(&self, name: &str) -> Result<(), SaveError> {
        let path = self.path_for(name)?;
        if path.exists() {
            remove_file(&path)?;
            log::info!("Deleted study '{}'", name);
        }
        Ok(())
    }

    /// Every readable study in the store, most recent first. Unreadable files are
    /// skipped with a warning.
    pub fn list(&self) -> Result<Vec<StoredStudyInfo>, SaveError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut studies = Vec::new();
        for entry in read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(STUDY_FILE_EXTENSION) {
                continue;
            }
            match load_from_path(&path) {
                Ok(record) => studies.push(StoredStudyInfo::from_record(&record, path)),
                Err(e) => log::warn!("Skipping unreadable study file {:?}: {}", path, e),
            }
        }

        studies.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(studies)
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, SaveError> {
        let stem = encode_file_stem(name.trim());
        if stem.is_empty() || stem.len() > MAX_FILE_STEM_LEN {
            return Err(SaveError::InvalidStudyName { name: name.to_string() });
        }
        Ok(self.root.join(format!("{}.{}", stem, STUDY_FILE_EXTENSION)))
    }
}

/// Keeps ASCII letters, digits and `-`; every other UTF-8 byte (including `_`) becomes
/// `_XX`. Distinct names always map to distinct files.
fn encode_file_stem(name: &str) -> String {
    let mut stem = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            stem.push(byte as char);
        } else {
            stem.push_str(&format!("_{:02X}", byte));
        }
    }
    stem
}

/// Atomic save: write to a temp file, then rename over the target.
pub fn save_to_path(path: &Path, record: &StudyRecord) -> Result<(), SaveError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let data = serialize_and_compress(record)?;

    let temp_path = path.with_extension("tmp");

    {
        let mut file = File::create(&temp_path)?;
        file.write_all(&data)?;
        file.flush()?;

        // sync_all ensures data is written to disk (portable fsync)
        file.sync_all()?;
    }

    rename(&temp_path, path)?;

    log::debug!("Saved {} bytes to {:?}", data.len(), path);
    Ok(())
}

/// Reads, verifies and migrates a record. Rebuilding the study is left to
/// `StudyRecord::into_study`.
pub fn load_from_path(path: &Path) -> Result<StudyRecord, SaveError> {
    if !path.exists() {
        return Err(SaveError::FileNotFound { path: path.display().to_string() });
    }

    let mut file = File::open(path)?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;

    let record = migrate_record(decompress_and_deserialize(&data)?)?;

    log::debug!("Loaded {} bytes from {:?}", data.len(), path);
    Ok(record)
}

#[derive(Debug, Clone)]
pub struct StoredStudyInfo {
    pub name: String,
    pub path: PathBuf,
    pub timestamp: u64,
    pub version: u32,
    pub participant_count: usize,
    pub file_count: usize,
}

impl StoredStudyInfo {
    fn from_record(record: &StudyRecord, path: PathBuf) -> Self {
        let participants: BTreeSet<&str> =
            record.identities.iter().filter_map(|name| name.split_whitespace().next()).collect();
        Self {
            name: record.name.clone(),
            path,
            timestamp: record.timestamp,
            version: record.version,
            participant_count: participants.len(),
            file_count: record.identities.len(),
        }
    }

    pub fn format_timestamp(&self) -> String {
        use time::{format_description::well_known::Rfc3339, OffsetDateTime};

        let nanos = (self.timestamp as i128) * 1_000_000;
        let timestamp = OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .unwrap_or_else(|_| OffsetDateTime::now_utc());

        timestamp.format(&Rfc3339).unwrap_or_else(|_| "Unknown".to_string())
    }

    pub fn get_display_text(&self) -> String {
        format!("{}: {} files, {} participants", self.name, self.file_count, self.participant_count)
    }
}
