//! Finding and terminating slideshow processes.
//!
//! The process table is read through `sysinfo` on every platform, how a process is terminated
//! differs per platform.

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::UnixProcesses;
#[cfg(windows)]
pub use windows::WindowsProcesses;

use std::ffi::OsStr;
use sysinfo::{Pid, ProcessRefreshKind, RefreshKind, System, UpdateKind};
use thiserror::Error;

/// Non-fatal trouble while stopping a process.
#[derive(Debug, Error)]
pub enum CleanupWarning {
    #[error("no permission to terminate process {0}")]
    Denied(u32),
    #[error("failed to terminate process {pid}: {reason}")]
    Failed { pid: u32, reason: String },
}

/// Access to the OS process table.
pub trait ProcessController {
    /// PIDs of all processes, other than the current one, whose command line contains
    /// `pattern` or, where environments are searched, that carry a `pattern` variable.
    fn find_by_pattern(&self, pattern: &str) -> Vec<u32>;

    /// Terminates the direct children of `pid`, then `pid` itself.
    ///
    /// A process that is already gone is not an error.
    ///
    /// # Errors
    /// The first [`CleanupWarning`] met, remaining processes are still attempted.
    fn terminate_tree(&self, pid: u32) -> Result<(), CleanupWarning>;
}

/// The [`ProcessController`] of the platform this binary is built for.
#[cfg(unix)]
#[must_use]
pub fn host_processes() -> UnixProcesses {
    UnixProcesses
}

/// The [`ProcessController`] of the platform this binary is built for.
#[cfg(windows)]
#[must_use]
pub fn host_processes() -> WindowsProcesses {
    WindowsProcesses
}

/// Fresh view of the process table, with command lines and optionally environments loaded.
fn snapshot(environ: bool) -> System {
    let mut kind = ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always);
    if environ {
        kind = kind.with_environ(UpdateKind::Always);
    }
    System::new_with_specifics(RefreshKind::nothing().with_processes(kind))
}

fn contains<S: AsRef<OsStr>>(strings: &[S], pattern: &str) -> bool {
    strings
        .iter()
        .any(|string| string.as_ref().to_string_lossy().contains(pattern))
}

/// Whether one of `environ`'s `KEY=value` entries has `key` as its key.
fn has_variable<S: AsRef<OsStr>>(environ: &[S], key: &str) -> bool {
    environ.iter().any(|entry| {
        entry
            .as_ref()
            .to_string_lossy()
            .split_once('=')
            .is_some_and(|(name, _)| name == key)
    })
}

/// See [`ProcessController::find_by_pattern`].
///
/// Command lines match on a substring like `pgrep -f`, environments only on a variable named
/// exactly `pattern`.
fn matching(system: &System, pattern: &str) -> Vec<u32> {
    let current = sysinfo::get_current_pid().ok();
    let mut pids: Vec<u32> = system
        .processes()
        .iter()
        .filter(|(pid, process)| {
            Some(**pid) != current && process.thread_kind().is_none()
        })
        .filter(|(_, process)| {
            contains(process.cmd(), pattern) || has_variable(process.environ(), pattern)
        })
        .map(|(pid, _)| pid.as_u32())
        .collect();
    pids.sort_unstable();
    pids
}

/// Direct children of `parent`.
fn children(system: &System, parent: u32) -> Vec<u32> {
    let parent = Pid::from_u32(parent);
    system
        .processes()
        .iter()
        .filter(|(_, process)| {
            process.parent() == Some(parent) && process.thread_kind().is_none()
        })
        .map(|(pid, _)| pid.as_u32())
        .collect()
}

/// Process table with only the basics, enough for [`children`].
fn parents_snapshot() -> System {
    System::new_with_specifics(RefreshKind::nothing().with_processes(ProcessRefreshKind::nothing()))
}
