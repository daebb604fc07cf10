//! Per-task outcomes and the batch summary.

use std::fmt;
use std::io;

use bstr::BString;
use git_hash::ObjectId;
use git_loose::{ExtractError, ObjectKind};
use git_transport::FetchError;

/// Why an entry was deliberately not written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The index stored the name-length sentinel; the entry was stepped over.
    LongName,
    /// The path would land outside the output root or inside a `.git` directory.
    UnsafePath,
    /// A gitlink; its commit lives in another repository.
    Submodule,
    /// Another entry for the same path was chosen (merge conflict stages).
    ConflictStage,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LongName => "name too long for index",
            Self::UnsafePath => "unsafe path",
            Self::Submodule => "submodule",
            Self::ConflictStage => "another stage of this path was written",
        })
    }
}

impl From<git_index::SkipReason> for SkipReason {
    fn from(reason: git_index::SkipReason) -> Self {
        match reason {
            git_index::SkipReason::LongName => Self::LongName,
        }
    }
}

/// Why a task failed.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("object is a {0}, not a blob")]
    UnexpectedKind(ObjectKind),

    #[error("write failed: {0}")]
    Write(#[from] io::Error),

    #[error("worker panicked: {0}")]
    Panicked(String),
}

/// Final state of one task.
#[derive(Debug)]
pub enum TaskOutcome {
    Written { bytes: u64 },
    Skipped(SkipReason),
    Failed(TaskError),
    /// Cancellation was requested before the task finished.
    Cancelled,
}

impl TaskOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Written { bytes } => write!(f, "written ({bytes} bytes)"),
            Self::Skipped(reason) => write!(f, "skipped: {reason}"),
            Self::Failed(err) => write!(f, "failed: {err}"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Outcome of one index entry.
#[derive(Debug)]
pub struct TaskReport {
    pub path: BString,
    pub oid: ObjectId,
    pub outcome: TaskOutcome,
    /// Fetch attempts made; zero when the task never reached the network.
    pub fetch_attempts: u32,
    /// Write attempts made; zero when the task never reached the disk.
    pub write_attempts: u32,
    /// Whether the object header disagreed with the size in the index.
    pub size_mismatch: bool,
}

impl TaskReport {
    pub fn new(path: BString, oid: ObjectId, outcome: TaskOutcome) -> Self {
        Self {
            path,
            oid,
            outcome,
            fetch_attempts: 0,
            write_attempts: 0,
            size_mismatch: false,
        }
    }
}

/// Counts of outcomes by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.written + self.skipped + self.failed + self.cancelled
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} written, {} skipped, {} failed, {} cancelled",
            self.written, self.skipped, self.failed, self.cancelled
        )
    }
}

/// One report per index entry, in index order.
#[derive(Debug, Default)]
pub struct BatchReport {
    reports: Vec<TaskReport>,
}

impl BatchReport {
    pub fn new(reports: Vec<TaskReport>) -> Self {
        Self { reports }
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TaskReport> {
        self.reports.iter()
    }

    /// The report for `path`, if any.
    pub fn get(&self, path: &str) -> Option<&TaskReport> {
        self.reports.iter().find(|r| r.path == path)
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for report in &self.reports {
            match report.outcome {
                TaskOutcome::Written { .. } => summary.written += 1,
                TaskOutcome::Skipped(_) => summary.skipped += 1,
                TaskOutcome::Failed(_) => summary.failed += 1,
                TaskOutcome::Cancelled => summary.cancelled += 1,
            }
        }
        summary
    }

    /// True when nothing failed and nothing was cancelled.
    pub fn is_success(&self) -> bool {
        let summary = self.summary();
        summary.failed == 0 && summary.cancelled == 0
    }

    pub fn into_reports(self) -> Vec<TaskReport> {
        self.reports
    }
}

impl<'a> IntoIterator for &'a BatchReport {
    type Item = &'a TaskReport;
    type IntoIter = std::slice::Iter<'a, TaskReport>;

    fn into_iter(self) -> Self::IntoIter {
        self.reports.iter()
    }
}
