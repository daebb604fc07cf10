//! Ctrl-C handling.

use std::thread;

use anyhow::{Context, Result};
use git_reconstruct::CancelToken;
use tokio::signal;

/// Cancel `token` on the first Ctrl-C.
///
/// The signal is awaited on a background thread with its own single-threaded
/// runtime; the reconstruction itself stays on plain threads.
pub fn cancel_on_ctrl_c(token: CancelToken) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("cannot start signal runtime")?;

    thread::Builder::new()
        .name("ctrl-c".into())
        .spawn(move || {
            runtime.block_on(async {
                match signal::ctrl_c().await {
                    Ok(()) => {
                        tracing::warn!("interrupted, finishing running tasks");
                        token.cancel();
                    }
                    Err(err) => tracing::warn!(%err, "cannot listen for Ctrl-C"),
                }
            });
        })
        .context("cannot spawn signal thread")?;
    Ok(())
}
