//! # kv_core - Study schema & file-identity engine
//!
//! Validates the file names of a kinesiology study against the study's independent
//! variables, enforces cross-file consistency per participant, and partitions the
//! accepted files into comparison groups.
//!
//! ## Features
//! - File-name grammar `ParticipantId Slot_1 … Slot_k Attempt` with precise rejections
//! - Per-participant locks on single-value variables
//! - One-axis and two-axes comparison groups in schema order
//! - Compressed, checksummed study records with version migration

// Struct initialization pattern used intentionally
#![allow(clippy::field_reassign_with_default)]
// Doc formatting lints - purely cosmetic
#![allow(clippy::doc_lazy_continuation)]

pub mod alias;
pub mod config;
pub mod error;
pub mod grammar;
pub mod groups;
pub mod ingest;
pub mod ledger;
pub mod save;
pub mod schema;
pub mod state;
pub mod study;

pub use alias::AliasTable;
pub use config::GrammarConfig;
pub use error::{
    AliasError, ConfigError, ConsistencyError, ErrorCategory, GroupError, LedgerError, NameError,
    SchemaEditViolation, SchemaError, StudyError, SubmitError,
};
pub use grammar::{expected_pattern, parse, to_file_name, AxisSelection, FileIdentity};
pub use groups::{
    full_group_keys, resolve_groups, Group, GroupRequest, GroupResolution, GroupWarning,
};
pub use ingest::{ingest_batch, IngestReport, Rejection};
pub use ledger::{validate_against_study, ConsistencyLedger, CoverageGap, StudyParameters};
pub use save::{SaveError, StudyRecord, StudyStore};
pub use schema::{Axis, AxisDefinition, MetadataEdit, SchemaModel, SchemaState, ABSENT_TOKEN};
pub use state::SharedStudy;
pub use study::Study;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
