//! Background slideshow lifecycle.
//!
//! The slideshow is a platform script that loops forever and changes the wallpaper every
//! `INTERVAL` seconds. At most one instance is kept alive: starting replaces whatever instance
//! is already running.
//!
//! The script is downloaded, its interval rewritten, then piped into the interpreter's stdin.
//! It is never written to disk.

pub mod platform;
pub mod process;
pub mod template;

pub use platform::{MARKER, Platform, UnsupportedPlatform};
pub use process::{CleanupWarning, ProcessController, host_processes};
pub use template::{Dialect, TemplateError};

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;
use thiserror::Error;

use crate::fetcher::{Remote, RemoteError};

/// How long a fresh slideshow has to survive to count as started.
pub const GRACE_PERIOD: Duration = Duration::from_secs(1);

/// What the slideshow should do, built once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideshowConfig {
    pub category: String,
    /// Whole minutes between two wallpapers.
    pub interval_minutes: u64,
}

impl SlideshowConfig {
    #[must_use]
    pub fn interval_secs(&self) -> u64 {
        self.interval_minutes.saturating_mul(60)
    }
}

/// A slideshow that survived its grace period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Started {
    pub pid: u32,
    /// Instances that were running before and got stopped.
    pub replaced: usize,
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("no interpreter configured")]
    NoInterpreter,
    #[error("cannot capture the slideshow's error output: {0}")]
    Capture(io::Error),
    #[error("cannot spawn the interpreter: {0}")]
    Spawn(io::Error),
    #[error("cannot feed the script to the interpreter: {0}")]
    Stdin(io::Error),
    #[error("slideshow exited right after launch with {status}: {reason}")]
    Exited { status: ExitStatus, reason: String },
}

#[derive(Debug, Error)]
pub enum SlideshowError {
    #[error(transparent)]
    Unsupported(#[from] UnsupportedPlatform),
    #[error("failed to fetch the slideshow script: {0}")]
    Script(#[from] RemoteError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Launch(#[from] LaunchError),
}

/// Starts and stops the slideshow of one [`Platform`].
pub struct Controller<P: ProcessController, R: Remote> {
    platform: Platform,
    processes: P,
    remote: R,
    grace: Duration,
}

impl<P: ProcessController, R: Remote> Controller<P, R> {
    pub fn new(platform: Platform, processes: P, remote: R) -> Self {
        Self {
            platform,
            processes,
            remote,
            grace: GRACE_PERIOD,
        }
    }

    /// Overrides [`GRACE_PERIOD`].
    #[must_use]
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    #[must_use]
    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// PIDs of the running slideshow instances.
    pub fn running(&self) -> Vec<u32> {
        self.processes.find_by_pattern(&self.platform.marker)
    }

    /// Terminates every running instance together with its timer.
    ///
    /// Returns how many instances were found, none at all is fine.
    pub fn stop(&self) -> usize {
        stop_running(&self.platform, &self.processes)
    }

    /// Fetches the script, sets its interval and launches it in place of any running instance.
    ///
    /// # Errors
    /// See [`SlideshowError`]. Nothing is stopped unless the script is ready to launch.
    pub fn start(&self, config: &SlideshowConfig, dir: &Path) -> Result<Started, SlideshowError> {
        log::info!("configuring background slideshow");
        log::debug!("requesting {}", self.platform.script_url);
        let template = self.remote.get_text(&self.platform.script_url)?;
        let script =
            template::rewrite_interval(&template, self.platform.dialect, config.interval_secs())?;

        let replaced = self.stop();
        let pid = self.launch(&script, dir)?;
        log::info!(
            "slideshow started, changing wallpaper every {} min",
            config.interval_minutes
        );
        Ok(Started { pid, replaced })
    }

    /// Runs `script` detached, with `dir` as working directory.
    ///
    /// # Errors
    /// Fails if the interpreter cannot be spawned, or if it exits within the grace period.
    pub fn launch(&self, script: &str, dir: &Path) -> Result<u32, LaunchError> {
        let (program, args) = self
            .platform
            .argv
            .split_first()
            .ok_or(LaunchError::NoInterpreter)?;
        // An unlinked file rather than a pipe, nothing is left to read it once we exit.
        // The slideshow keeps it open for life, its space is freed when the slideshow ends.
        let mut errors = tempfile::tempfile().map_err(LaunchError::Capture)?;
        let stderr = errors.try_clone().map_err(LaunchError::Capture)?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .env(&self.platform.marker, "1")
            .current_dir(dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(stderr);
        if self.platform.new_process_group {
            detach(&mut cmd);
        }

        let mut child = cmd.spawn().map_err(LaunchError::Spawn)?;
        let pid = child.id();
        log::debug!("spawned {program} as {pid}");
        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(script.as_bytes()) {
                Ok(()) => {}
                // Interpreter died early, its status tells more
                Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {
                    log::debug!("interpreter closed stdin early");
                }
                Err(err) => return Err(LaunchError::Stdin(err)),
            }
        }

        thread::sleep(self.grace);
        match child.try_wait() {
            Ok(Some(status)) => Err(LaunchError::Exited {
                status,
                reason: read_errors(&mut errors),
            }),
            Ok(None) => Ok(pid),
            Err(err) => {
                log::warn!("cannot check slideshow status: {err}");
                Ok(pid)
            }
        }
    }
}

/// Terminates every instance of `platform`'s slideshow together with its timer.
///
/// Returns how many instances were found, none at all is fine.
pub fn stop_running<P: ProcessController>(platform: &Platform, processes: &P) -> usize {
    let pids = processes.find_by_pattern(&platform.marker);
    for pid in &pids {
        if let Err(warning) = processes.terminate_tree(*pid) {
            log::warn!("{warning}");
        }
    }
    if !pids.is_empty() {
        log::info!("cleaned up {} old instance(s)", pids.len());
    }
    pids.len()
}

/// Starts the slideshow on the host platform.
///
/// # Errors
/// See [`SlideshowError`]. An unsupported host fails before anything is requested.
pub fn configure<R: Remote>(
    remote: R,
    config: &SlideshowConfig,
    dir: &Path,
) -> Result<Started, SlideshowError> {
    configure_for(std::env::consts::OS, remote, config, dir)
}

/// [`configure`] for the platform bundle of `os`.
///
/// # Errors
/// See [`SlideshowError`].
pub fn configure_for<R: Remote>(
    os: &str,
    remote: R,
    config: &SlideshowConfig,
    dir: &Path,
) -> Result<Started, SlideshowError> {
    let platform = Platform::for_os(os)?;
    Controller::new(platform, host_processes(), remote).start(config, dir)
}

fn read_errors(file: &mut File) -> String {
    let mut text = String::new();
    if let Err(err) = file
        .seek(SeekFrom::Start(0))
        .and_then(|_| file.read_to_string(&mut text))
    {
        log::debug!("cannot read slideshow error output: {err}");
    }
    let text = text.trim();
    if text.is_empty() {
        "no error output".to_string()
    } else {
        text.to_string()
    }
}

/// Runs the child in a session of its own, away from our terminal and process group.
#[cfg(unix)]
fn detach(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    // SAFETY: setsid is async-signal-safe and the closure allocates nothing
    unsafe {
        cmd.pre_exec(|| {
            nix::unistd::setsid()
                .map(drop)
                .map_err(io::Error::from)
        });
    }
}

#[cfg(windows)]
fn detach(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
}
