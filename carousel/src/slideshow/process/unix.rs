use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;

use super::{CleanupWarning, ProcessController, children, matching, parents_snapshot, snapshot};

/// Processes on Unix, terminated with `SIGTERM`.
pub struct UnixProcesses;

fn terminate(pid: u32) -> Result<(), CleanupWarning> {
    let Ok(raw) = i32::try_from(pid) else {
        return Err(CleanupWarning::Failed {
            pid,
            reason: "pid out of range".to_string(),
        });
    };
    match kill(Pid::from_raw(raw), Signal::SIGTERM) {
        // Already gone
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(Errno::EPERM) => Err(CleanupWarning::Denied(pid)),
        Err(errno) => Err(CleanupWarning::Failed {
            pid,
            reason: errno.desc().to_string(),
        }),
    }
}

impl ProcessController for UnixProcesses {
    fn find_by_pattern(&self, pattern: &str) -> Vec<u32> {
        matching(&snapshot(false), pattern)
    }

    fn terminate_tree(&self, pid: u32) -> Result<(), CleanupWarning> {
        let mut first_warning = None;
        for child in children(&parents_snapshot(), pid) {
            log::debug!("terminating child {child} of {pid}");
            if let Err(warning) = terminate(child) {
                first_warning.get_or_insert(warning);
            }
        }
        if let Err(warning) = terminate(pid) {
            first_warning.get_or_insert(warning);
        }
        first_warning.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminating_a_missing_pid() {
        // Above any pid_max the kernel allows
        let pid = u32::try_from(i32::MAX).unwrap();
        assert!(UnixProcesses.terminate_tree(pid).is_ok());
        assert!(matches!(
            terminate(u32::MAX),
            Err(CleanupWarning::Failed { .. })
        ));
    }
}
