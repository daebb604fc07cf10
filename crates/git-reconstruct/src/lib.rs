//! Working-tree reconstruction from a remote `.git` directory.
//!
//! Given the entries of a decoded index and an [`ObjectStore`], every entry
//! becomes one [`ReconstructionTask`]: fetch the loose object, inflate it,
//! and write the content to the entry's path under an output root. Tasks run
//! on a fixed pool of worker threads, failures are recorded per task, and the
//! caller receives a [`BatchReport`] covering every entry.
//!
//! [`ObjectStore`]: git_transport::ObjectStore

mod cancel;
mod config;
mod orchestrator;
mod report;
pub mod retry;
mod task;
mod write;

pub use cancel::CancelToken;
pub use config::ReconstructConfig;
pub use orchestrator::Reconstructor;
pub use report::{BatchReport, SkipReason, Summary, TaskError, TaskOutcome, TaskReport};
pub use retry::{RetryOutcome, RetryPolicy};
pub use task::{safe_relative_path, select_stages, ReconstructionTask};
pub use write::{is_resource_exhausted, AtomicFileWriter, Materializer};
