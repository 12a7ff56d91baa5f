//! Per-OS launch bundles.

use thiserror::Error;

use crate::slideshow::template::Dialect;

const SCRIPT_BASE: &str =
    "https://raw.githubusercontent.com/DarshilNaliyapara/wallpaper-carousel-script/main";

/// Name every slideshow process can be found by.
pub const MARKER: &str = "WallpaperCarousel";

#[derive(Debug, PartialEq, Error)]
#[error("unsupported operating system: {0}")]
pub struct UnsupportedPlatform(pub String);

/// Everything needed to launch the slideshow on one operating system.
#[derive(Debug, Clone, PartialEq)]
pub struct Platform {
    pub script_url: String,
    pub dialect: Dialect,
    /// Interpreter and its arguments, it reads the script from stdin.
    pub argv: Vec<String>,
    /// Pattern matched against the process table to find running instances.
    pub marker: String,
    /// Start the slideshow in a process group of its own.
    pub new_process_group: bool,
}

impl Platform {
    /// Looks up the bundle for `os`, as named by [`std::env::consts::OS`].
    ///
    /// # Errors
    /// Only Linux and Windows are supported, anything else is [`UnsupportedPlatform`].
    pub fn for_os(os: &str) -> Result<Self, UnsupportedPlatform> {
        match os {
            "linux" => Ok(Self {
                script_url: format!("{SCRIPT_BASE}/slideshow.sh"),
                dialect: Dialect::Shell,
                argv: to_owned(&["/bin/sh", "-s", MARKER]),
                marker: MARKER.to_string(),
                new_process_group: true,
            }),
            "windows" => Ok(Self {
                script_url: format!("{SCRIPT_BASE}/set-slideshow.ps1"),
                dialect: Dialect::PowerShell,
                argv: to_owned(&[
                    "powershell",
                    "-NoProfile",
                    "-ExecutionPolicy",
                    "Bypass",
                    "-Command",
                    "-",
                ]),
                marker: MARKER.to_string(),
                new_process_group: true,
            }),
            other => Err(UnsupportedPlatform(other.to_string())),
        }
    }

    /// Bundle for the OS this binary runs on.
    ///
    /// # Errors
    /// See [`Platform::for_os`].
    pub fn host() -> Result<Self, UnsupportedPlatform> {
        Self::for_os(std::env::consts::OS)
    }
}

fn to_owned(args: &[&str]) -> Vec<String> {
    args.iter().map(ToString::to_string).collect()
}
