//! The worker pool that turns index entries into files.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::thread;

use bstr::BString;
use crossbeam::channel::{self, Sender};
use crossbeam::queue::SegQueue;
use git_hash::ObjectId;
use git_index::{DecodedIndex, IndexEntry};
use git_loose::{ContentExtractor, ObjectKind};
use git_transport::{FetchError, ObjectStore};
use tracing::{debug, debug_span, info, warn};

use crate::report::{BatchReport, TaskError, TaskOutcome, TaskReport};
use crate::retry::RetryOutcome;
use crate::write::{is_resource_exhausted, AtomicFileWriter, Materializer};
use crate::task::select_stages;
use crate::{CancelToken, ReconstructConfig, ReconstructionTask, SkipReason};

type Queue = SegQueue<(usize, ReconstructionTask)>;

/// Reconstructs working trees from an [`ObjectStore`].
///
/// A run is a batch: every entry yields exactly one [`TaskReport`] whatever
/// happens to its neighbours. At most `config.jobs` tasks execute at once.
#[derive(Debug)]
pub struct Reconstructor<S, W = AtomicFileWriter> {
    store: S,
    writer: W,
    config: ReconstructConfig,
    extractor: ContentExtractor,
    cancel: CancelToken,
}

impl<S: ObjectStore> Reconstructor<S> {
    pub fn new(store: S, config: ReconstructConfig) -> Self {
        let extractor = ContentExtractor::new().with_limit(config.max_object_size);
        Self {
            store,
            writer: AtomicFileWriter,
            config,
            extractor,
            cancel: CancelToken::new(),
        }
    }
}

impl<S: ObjectStore, W: Materializer> Reconstructor<S, W> {
    /// Replace the component that writes files.
    pub fn with_writer<M: Materializer>(self, writer: M) -> Reconstructor<S, M> {
        Reconstructor {
            store: self.store,
            writer,
            config: self.config,
            extractor: self.extractor,
            cancel: self.cancel,
        }
    }

    /// Use an externally owned token, e.g. one wired to Ctrl-C.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn config(&self) -> &ReconstructConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reconstruct every decoded entry under `output_root`, then report the
    /// records the decoder stepped over as skipped.
    pub fn run_index(&self, index: &DecodedIndex, output_root: &Path) -> BatchReport {
        let mut reports = self
            .run(index.entries.iter().cloned(), output_root)
            .into_reports();
        reports.extend(index.skipped.iter().map(|skipped| {
            TaskReport::new(
                skipped.path.clone(),
                skipped.oid,
                TaskOutcome::Skipped(skipped.reason.into()),
            )
        }));
        BatchReport::new(reports)
    }

    /// Reconstruct `entries` under `output_root`.
    ///
    /// Reports come back in the order the entries were given. When a path
    /// appears more than once only one entry is written; see [`select_stages`].
    pub fn run<I>(&self, entries: I, output_root: &Path) -> BatchReport
    where
        I: IntoIterator<Item = IndexEntry>,
    {
        let queue = Queue::new();
        let mut identities: Vec<(BString, ObjectId)> = Vec::new();
        let mut slots: Vec<Option<TaskReport>> = Vec::new();

        let entries: Vec<IndexEntry> = entries.into_iter().collect();
        let selected = select_stages(&entries);

        for (seq, (entry, keep)) in entries.into_iter().zip(selected).enumerate() {
            let path = entry.path.clone();
            let oid = *entry.oid();
            let planned = if keep {
                ReconstructionTask::new(entry)
            } else {
                Err(SkipReason::ConflictStage)
            };
            match planned {
                Ok(task) => {
                    slots.push(None);
                    queue.push((seq, task));
                }
                Err(reason) => {
                    match reason {
                        SkipReason::UnsafePath => warn!(path = %path, "skipping unsafe path"),
                        _ => debug!(path = %path, %reason, "skipping entry"),
                    }
                    let outcome = TaskOutcome::Skipped(reason);
                    slots.push(Some(TaskReport::new(path.clone(), oid, outcome)));
                }
            }
            identities.push((path, oid));
        }

        let pending = queue.len();
        let workers = self.config.jobs.max(1).min(pending);
        info!(entries = slots.len(), pending, workers, "starting reconstruction");

        let (results_tx, results_rx) = channel::unbounded();
        if workers > 0 {
            thread::scope(|scope| {
                let mut spawned = 0;
                for id in 0..workers {
                    let results = results_tx.clone();
                    let queue = &queue;
                    let spawn = thread::Builder::new()
                        .name(format!("reconstruct-{id}"))
                        .spawn_scoped(scope, move || self.drain(queue, output_root, &results));
                    match spawn {
                        Ok(_) => spawned += 1,
                        Err(err) => {
                            warn!(%err, spawned, "cannot start more workers");
                            break;
                        }
                    }
                }
                if spawned == 0 {
                    self.drain(&queue, output_root, &results_tx);
                }
            });
        }
        drop(results_tx);

        for (seq, report) in results_rx.try_iter() {
            slots[seq] = Some(report);
        }

        let reports: Vec<TaskReport> = slots
            .into_iter()
            .zip(identities)
            .map(|(slot, (path, oid))| {
                slot.unwrap_or_else(|| {
                    let lost = TaskError::Panicked("worker exited without a report".into());
                    TaskReport::new(path, oid, TaskOutcome::Failed(lost))
                })
            })
            .collect();

        let batch = BatchReport::new(reports);
        info!(summary = %batch.summary(), "reconstruction finished");
        batch
    }

    /// Pop tasks until the queue is empty, sending one report per task.
    fn drain(&self, queue: &Queue, root: &Path, results: &Sender<(usize, TaskReport)>) {
        while let Some((seq, task)) = queue.pop() {
            let report = if self.cancel.is_cancelled() {
                TaskReport::new(task.entry.path.clone(), *task.oid(), TaskOutcome::Cancelled)
            } else {
                panic::catch_unwind(AssertUnwindSafe(|| self.execute(&task, root))).unwrap_or_else(
                    |payload| {
                        let err = TaskError::Panicked(panic_message(payload.as_ref()));
                        warn!(path = %task.path(), %err, "task panicked");
                        TaskReport::new(task.entry.path.clone(), *task.oid(), TaskOutcome::Failed(err))
                    },
                )
            };
            if results.send((seq, report)).is_err() {
                break;
            }
        }
    }

    /// Fetch, extract and write one entry.
    fn execute(&self, task: &ReconstructionTask, root: &Path) -> TaskReport {
        let span = debug_span!("task", path = %task.path(), oid = %task.oid());
        let _enter = span.enter();

        let mut report = TaskReport::new(task.entry.path.clone(), *task.oid(), TaskOutcome::Cancelled);

        let fetched = self.config.fetch_retry.run(
            &self.cancel,
            |attempt| {
                debug!(attempt, address = %task.address, "fetching");
                self.store.fetch(&task.address)
            },
            FetchError::is_retryable,
        );
        report.fetch_attempts = fetched.attempts();
        let compressed = match fetched {
            RetryOutcome::Done { value, .. } => value,
            RetryOutcome::Failed { error, attempts } => {
                warn!(%error, attempts, "fetch failed");
                report.outcome = TaskOutcome::Failed(error.into());
                return report;
            }
            RetryOutcome::Cancelled { .. } => return report,
        };

        let object = match self.extractor.extract(&compressed, task.declared_size()) {
            Ok(object) => object,
            Err(err) => {
                warn!(%err, "cannot extract object");
                report.outcome = TaskOutcome::Failed(err.into());
                return report;
            }
        };
        if object.kind != ObjectKind::Blob {
            warn!(kind = %object.kind, "expected a blob");
            report.outcome = TaskOutcome::Failed(TaskError::UnexpectedKind(object.kind));
            return report;
        }
        if !object.matches_declared(task.declared_size()) {
            warn!(
                header = object.size,
                index = task.declared_size(),
                "object size differs from index"
            );
            report.size_mismatch = true;
        }

        let target = task.destination(root);
        let written = self.config.write_retry.run(
            &self.cancel,
            |attempt| {
                debug!(attempt, "writing");
                self.writer.write(&target, &object.content, task.is_executable())
            },
            is_resource_exhausted,
        );
        report.write_attempts = written.attempts();
        report.outcome = match written {
            RetryOutcome::Done { value, .. } => {
                debug!(bytes = value, "written");
                TaskOutcome::Written { bytes: value }
            }
            RetryOutcome::Failed { error, .. } => {
                warn!(%error, target = %target.display(), "write failed");
                TaskOutcome::Failed(TaskError::Write(error))
            }
            RetryOutcome::Cancelled { .. } => TaskOutcome::Cancelled,
        };
        report
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
