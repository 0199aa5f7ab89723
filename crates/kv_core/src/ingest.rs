use crate::error::SubmitError;
use crate::study::Study;
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub file_name: String,
    pub error: SubmitError,
}

/// Outcome of a batch. Each file is all-or-nothing; the batch as a whole is not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub accepted: Vec<String>,
    pub rejected: Vec<Rejection>,
    /// Names never submitted because the batch was cancelled first.
    pub skipped: Vec<String>,
    pub cancelled: bool,
}

impl IngestReport {
    pub(crate) fn record(&mut self, file_name: String, outcome: Result<(), SubmitError>) {
        match outcome {
            Ok(()) => self.accepted.push(file_name),
            Err(error) => self.rejected.push(Rejection { file_name, error }),
        }
    }

    pub(crate) fn cancel(&mut self, remaining: impl IntoIterator<Item = String>) {
        self.cancelled = true;
        self.skipped.extend(remaining);
    }

    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty() && !self.cancelled
    }

    pub fn summary(&self) -> String {
        let mut summary =
            format!("{} accepted, {} rejected", self.accepted.len(), self.rejected.len());
        if self.cancelled {
            summary.push_str(&format!(", {} skipped (cancelled)", self.skipped.len()));
        }
        summary
    }
}

/// Submits every name in order. `cancel` is checked between files; a file already being
/// submitted always completes.
pub fn ingest_batch<I, S>(study: &mut Study, names: I, cancel: &AtomicBool) -> IngestReport
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let outcome = run_batch(names, cancel, |file_name| {
        Ok::<_, Infallible>(study.submit(file_name).map(|_| ()))
    });
    let report = match outcome {
        Ok(report) => report,
        Err(never) => match never {},
    };

    info!(study = study.name(), summary = %report.summary(), "batch ingested");
    report
}

/// Batch loop shared by every ingestion entry point. `submit` runs one unit; its outer
/// error aborts the batch, its inner result is recorded.
pub(crate) fn run_batch<I, S, E, F>(
    names: I,
    cancel: &AtomicBool,
    mut submit: F,
) -> Result<IngestReport, E>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
    F: FnMut(&str) -> Result<Result<(), SubmitError>, E>,
{
    let mut report = IngestReport::default();
    let mut names = names.into_iter().map(Into::<String>::into);

    while let Some(file_name) = names.next() {
        if cancel.load(Ordering::Relaxed) {
            warn!("batch cancelled");
            report.cancel(std::iter::once(file_name).chain(names.by_ref()));
            break;
        }
        let outcome = submit(&file_name)?;
        report.record(file_name, outcome);
    }

    Ok(report)
}
