use crate::error::{ConfigError, SchemaError, StudyError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Decompression error")]
    Decompression,

    #[error("Corrupted data")]
    Corrupted,

    #[error("Version mismatch: found {found}, expected {expected}")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("Checksum mismatch")]
    ChecksumMismatch,

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid study name for storage: '{name}'")]
    InvalidStudyName { name: String },

    #[error("Study file for '{requested}' holds study '{stored}'")]
    NameMismatch { requested: String, stored: String },

    #[error("Stored grammar is invalid: {0}")]
    Config(#[from] ConfigError),

    #[error("Stored schema is invalid: {0}")]
    Schema(#[from] SchemaError),

    #[error("Stored study is invalid: {0}")]
    Study(#[from] StudyError),

    #[error("Stored file '{file_name}' cannot be replayed: {reason}")]
    Replay { file_name: String, reason: String },
}

impl SaveError {
    pub fn is_recoverable(&self) -> bool {
        match self {
            SaveError::Io(_) => true,
            SaveError::FileNotFound { .. } => true,
            SaveError::Corrupted => false,
            SaveError::ChecksumMismatch => false,
            SaveError::VersionMismatch { .. } => true, // Can try migration
            _ => false,
        }
    }
}
