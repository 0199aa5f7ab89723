//! Shared study handle
//!
//! One writer at a time, many readers. Readers that need a consistent view across
//! several calls take a `snapshot`, cloned under a short read lock.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, RwLock};

use crate::error::StudyError;
use crate::grammar::FileIdentity;
use crate::ingest::{run_batch, IngestReport};
use crate::study::Study;
use tracing::info;

#[derive(Debug, Clone)]
pub struct SharedStudy {
    inner: Arc<RwLock<Study>>,
}

impl SharedStudy {
    pub fn new(study: Study) -> Self {
        Self { inner: Arc::new(RwLock::new(study)) }
    }

    // ========================
    // Readers
    // ========================

    pub fn snapshot(&self) -> Result<Study, StudyError> {
        self.read(Study::clone)
    }

    pub fn read<R>(&self, f: impl FnOnce(&Study) -> R) -> Result<R, StudyError> {
        let study = self.inner.read().map_err(|_| StudyError::Poisoned)?;
        Ok(f(&study))
    }

    // ========================
    // Writers
    // ========================

    pub fn write<R>(&self, f: impl FnOnce(&mut Study) -> R) -> Result<R, StudyError> {
        let mut study = self.inner.write().map_err(|_| StudyError::Poisoned)?;
        Ok(f(&mut study))
    }

    pub fn submit(&self, file_name: &str) -> Result<FileIdentity, StudyError> {
        Ok(self.write(|study| study.submit(file_name))??)
    }

    pub fn remove_file(&self, file_name: &str) -> Result<FileIdentity, StudyError> {
        self.write(|study| study.remove_file(file_name))?
    }

    /// Like `ingest::ingest_batch`, but the write lock is taken per file so readers are
    /// never blocked for the whole batch.
    pub fn ingest_batch<I, S>(
        &self,
        names: I,
        cancel: &AtomicBool,
    ) -> Result<IngestReport, StudyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let report = run_batch(names, cancel, |file_name| {
            self.write(|study| study.submit(file_name).map(|_| ()))
        })?;

        info!(summary = %report.summary(), "batch ingested");
        Ok(report)
    }
}
