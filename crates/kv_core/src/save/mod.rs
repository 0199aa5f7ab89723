// Study persistence
// MessagePack + LZ4 compression with versioning and integrity checks

pub mod error;
pub mod format;
pub mod manager;
pub mod migration;

pub use error::SaveError;
pub use format::{
    decompress_and_deserialize, from_json, record_json_schema, serialize_and_compress, to_json,
    StudyRecord,
};
pub use manager::{load_from_path, save_to_path, StoredStudyInfo, StudyStore};
pub use migration::migrate_record;

pub const SAVE_VERSION: u32 = 1;
