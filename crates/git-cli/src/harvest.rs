use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use git_reconstruct::{
    BatchReport, CancelToken, ReconstructConfig, Reconstructor, RetryOutcome, TaskOutcome,
};
use git_transport::{FetchError, HttpConfig, HttpObjectStore};
use tracing::{info, warn};

use crate::{interrupt, Cli};

/// Fetch the index, rebuild every entry, print one line per path.
///
/// Returns the process exit code; `Err` is reserved for fatal conditions.
pub fn run(cli: &Cli) -> Result<i32> {
    let mut base = cli.url.clone();
    if let Some(port) = cli.port {
        base = base.with_port(port)?;
    }
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(base.host()));

    let mut http = HttpConfig {
        timeout: Duration::from_secs(cli.timeout.max(1)),
        ..HttpConfig::default()
    };
    if let Some(agent) = &cli.user_agent {
        http.user_agent = agent.clone();
    }
    let store = HttpObjectStore::new(base.clone(), &http)?;

    let defaults = ReconstructConfig::default();
    let config = ReconstructConfig::new()
        .with_jobs(cli.jobs as usize)
        .with_fetch_retry(defaults.fetch_retry.with_max_attempts(cli.retries));

    let cancel = CancelToken::new();
    if let Err(err) = interrupt::cancel_on_ctrl_c(cancel.clone()) {
        warn!("{err:#}");
    }

    info!(url = %base, "fetching index");
    let fetched = config
        .fetch_retry
        .run(&cancel, |_| store.fetch_index(), FetchError::is_retryable);
    let raw = match fetched {
        RetryOutcome::Done { value, .. } => value,
        RetryOutcome::Failed { error, .. } => bail!("cannot fetch {base}index: {error}"),
        RetryOutcome::Cancelled { .. } => return Ok(1),
    };

    let index = git_index::decode(&raw).context("cannot decode index")?;
    info!(
        version = index.header.version,
        entries = index.entries.len(),
        skipped = index.skipped.len(),
        "index decoded"
    );

    prepare_output(&output, cli.clean)?;
    info!(output = %output.display(), jobs = config.jobs, "reconstructing");

    let reconstructor = Reconstructor::new(&store, config).with_cancel_token(cancel);
    let report = reconstructor.run_index(&index, &output);

    print_report(&report).context("cannot write report")?;
    Ok(if report.is_success() { 0 } else { 1 })
}

fn prepare_output(output: &Path, clean: bool) -> Result<()> {
    if clean && output.exists() {
        info!(path = %output.display(), "removing existing output directory");
        fs::remove_dir_all(output)
            .with_context(|| format!("cannot remove '{}'", output.display()))?;
    }
    fs::create_dir_all(output)
        .with_context(|| format!("cannot create output directory '{}'", output.display()))?;
    Ok(())
}

fn print_report(report: &BatchReport) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for task in report {
        let path = &task.path;
        match &task.outcome {
            TaskOutcome::Written { bytes } => writeln!(out, "ok     {path} ({bytes} bytes)")?,
            TaskOutcome::Skipped(reason) => writeln!(out, "skip   {path}: {reason}")?,
            TaskOutcome::Failed(err) => writeln!(out, "fail   {path}: {err}")?,
            TaskOutcome::Cancelled => writeln!(out, "cancel {path}")?,
        }
    }
    writeln!(out, "{}", report.summary())?;
    out.flush()
}
