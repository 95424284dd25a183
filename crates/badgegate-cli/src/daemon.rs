//! Detach from the controlling terminal.

use anyhow::{Context, Result};

/// Daemonize with the classic double fork.
///
/// Must run before the Tokio runtime is created: forking a process that
/// already has runtime worker threads only carries the calling thread over.
/// The working directory becomes `/`, so relative paths have to be resolved
/// by the caller beforehand.
#[cfg(unix)]
pub fn daemonize() -> Result<()> {
    use nix::unistd::{ForkResult, fork, setsid};

    // SAFETY: single-threaded at this point; the child only continues into
    // normal startup code.
    match unsafe { fork() }.context("first fork failed")? {
        ForkResult::Parent { .. } => std::process::exit(0),
        ForkResult::Child => {}
    }

    setsid().context("setsid failed")?;

    // SAFETY: still single-threaded.
    match unsafe { fork() }.context("second fork failed")? {
        ForkResult::Parent { .. } => std::process::exit(0),
        ForkResult::Child => {}
    }

    std::env::set_current_dir("/").context("failed to change directory to /")?;
    Ok(())
}

#[cfg(not(unix))]
pub fn daemonize() -> Result<()> {
    anyhow::bail!("daemon mode is only supported on Unix")
}
