use sysinfo::Pid;

use super::{CleanupWarning, ProcessController, children, matching, parents_snapshot, snapshot};

/// Processes on Windows, terminated through `TerminateProcess`.
pub struct WindowsProcesses;

impl ProcessController for WindowsProcesses {
    fn find_by_pattern(&self, pattern: &str) -> Vec<u32> {
        // The interpreter's command line cannot carry the marker, the environment does
        matching(&snapshot(true), pattern)
    }

    fn terminate_tree(&self, pid: u32) -> Result<(), CleanupWarning> {
        let system = parents_snapshot();
        let mut first_warning = None;
        let targets = children(&system, pid).into_iter().chain(std::iter::once(pid));
        for target in targets {
            // Not in the table means already gone
            let Some(process) = system.process(Pid::from_u32(target)) else {
                continue;
            };
            if !process.kill() {
                log::debug!("TerminateProcess failed for {target}");
                first_warning.get_or_insert(CleanupWarning::Failed {
                    pid: target,
                    reason: "the system refused to terminate it".to_string(),
                });
            }
        }
        first_warning.map_or(Ok(()), Err)
    }
}
