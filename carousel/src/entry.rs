//! `carousel` entry
//!
//! Downloads the wallpapers of a category, then (re)starts the background slideshow over the
//! download directory.
//! Flags are the canonical way to configure a run. When none of `--category`, `--delay` and
//! `--clean` are given and stdin is a terminal, the user is asked instead.

use clap::Parser;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input};
use std::env;
use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use thiserror::Error;

use crate::fetcher::{self, DEFAULT_API, FetchError, Fetcher, Remote, RemoteError};
use crate::slideshow::{
    self, Platform, SlideshowConfig, SlideshowError, UnsupportedPlatform, host_processes,
};

pub const DEFAULT_DELAY_MINUTES: u64 = 10;

#[derive(Parser)]
#[command(
    version,
    about = "Downloads wallpapers and runs a background slideshow over them",
    after_help = "Examples:\n  carousel --category=nature --delay=5\n  carousel --clean\n  carousel --stop"
)]
struct Cli {
    #[arg(
        long = "category",
        value_name = "NAME",
        help = "Fetch wallpapers of this category only, e.g. anime, nature, cyberpunk, minimal."
    )]
    category: Option<String>,

    #[arg(
        long = "delay",
        value_name = "MINUTES",
        help = "Minutes between two wallpapers. [default: 10]"
    )]
    delay: Option<u64>,

    #[arg(long = "clean", help = "Remove every existing wallpaper before downloading.")]
    clean: bool,

    #[arg(long = "stop", help = "Stop the running slideshow and exit.")]
    stop: bool,

    #[arg(
        long = "dir",
        value_name = "PATH",
        help = "Directory to keep wallpapers in. [default: ~/Pictures/wallpapers]"
    )]
    dir: Option<PathBuf>,

    #[arg(
        long = "api-url",
        value_name = "URL",
        default_value = DEFAULT_API,
        help = "Base address of the wallpaper server."
    )]
    api_url: String,

    #[arg(long = "no-prompt", help = "Never ask, use flags and defaults only.")]
    no_prompt: bool,

    #[arg(short = 'v', long = "verbose", help = "Print debug output.")]
    verbose: bool,
}

/// Everything a run needs, built once and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub slideshow: SlideshowConfig,
    pub clean: bool,
    pub stop: bool,
    pub dir: PathBuf,
    pub api_url: String,
    pub verbose: bool,
}

#[derive(Debug, Error)]
pub enum CarouselError {
    #[error(transparent)]
    Args(#[from] clap::Error),
    #[error("prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),
    #[error("cannot prepare {}: {source}", .path.display())]
    Dir { path: PathBuf, source: io::Error },
    #[error("cannot create the HTTP client: {0}")]
    Client(#[from] RemoteError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("the server listed no wallpapers for category {0:?}")]
    NoWallpapers(String),
    #[error(transparent)]
    Unsupported(#[from] UnsupportedPlatform),
    #[error(transparent)]
    Slideshow(#[from] SlideshowError),
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            slideshow: SlideshowConfig {
                category: cli.category.unwrap_or_default(),
                interval_minutes: cli.delay.unwrap_or(DEFAULT_DELAY_MINUTES),
            },
            clean: cli.clean,
            stop: cli.stop,
            dir: cli.dir.unwrap_or_else(sys_wallpaper_dir),
            api_url: cli.api_url,
            verbose: cli.verbose,
        }
    }
}

impl Config {
    /// Builds the configuration from flags alone.
    ///
    /// # Errors
    /// Unknown flags, invalid values, and `--help`/`--version` requests as a [`clap::Error`].
    pub fn from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Ok(Cli::try_parse_from(args)?.into())
    }

    /// Builds the configuration of this process, asking the user when appropriate.
    ///
    /// # Errors
    /// See [`Config::from_args`], plus prompt failures.
    pub fn load() -> Result<Self, CarouselError> {
        let cli = Cli::try_parse()?;
        if wants_prompt(&cli) && io::stdin().is_terminal() {
            Ok(prompt(cli)?.into())
        } else {
            Ok(cli.into())
        }
    }
}

fn wants_prompt(cli: &Cli) -> bool {
    !cli.no_prompt && !cli.stop && cli.category.is_none() && cli.delay.is_none() && !cli.clean
}

fn prompt(mut cli: Cli) -> Result<Cli, dialoguer::Error> {
    let theme = ColorfulTheme::default();
    let category: String = Input::with_theme(&theme)
        .with_prompt("Category (empty for all)")
        .allow_empty(true)
        .interact_text()?;
    let delay: u64 = Input::with_theme(&theme)
        .with_prompt("Minutes between wallpapers")
        .default(DEFAULT_DELAY_MINUTES)
        .interact_text()?;
    cli.clean = Confirm::with_theme(&theme)
        .with_prompt("Remove existing wallpapers first?")
        .default(false)
        .interact()?;
    cli.category = Some(category.trim().to_string());
    cli.delay = Some(delay);
    Ok(cli)
}

fn sys_wallpaper_dir() -> PathBuf {
    // USERPROFILE is the Windows home
    for var in ["HOME", "USERPROFILE"] {
        if let Ok(value) = env::var(var)
            && !value.is_empty()
        {
            return PathBuf::from(value).join("Pictures").join("wallpapers");
        }
    }
    PathBuf::from("wallpapers")
}

/// Sets up the logger.
///
/// # Errors
/// Fails if a logger is already installed.
pub fn setup_logger(verbose: bool) -> Result<(), log::SetLoggerError> {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                message
            ));
        })
        .level(level)
        // Dependencies are only interesting when something is already wrong
        .level_for("reqwest", log::LevelFilter::Warn)
        .level_for("rustls", log::LevelFilter::Warn)
        .chain(std::io::stdout())
        .apply()
}

/// The real start.
///
/// `connect` builds the [`Remote`] and is only called when the run needs the network, `--stop`
/// never does.
///
/// # Errors
/// Every error that should end the run with a failure status.
pub fn run<R, F>(config: &Config, connect: F) -> Result<(), CarouselError>
where
    R: Remote,
    F: FnOnce() -> Result<R, RemoteError>,
{
    if config.stop {
        if slideshow::stop_running(&Platform::host()?, &host_processes()) == 0 {
            log::info!("no slideshow is running");
        }
        return Ok(());
    }

    let remote = connect()?;
    let dir_error = |source| CarouselError::Dir {
        path: config.dir.clone(),
        source,
    };
    fetcher::ensure_dir(&config.dir).map_err(dir_error)?;
    if config.clean {
        fetcher::clean(&config.dir).map_err(dir_error)?;
    }

    log::info!("connecting to {}", config.api_url);
    let report = Fetcher::new(&remote, config.api_url.as_str())
        .fetch(&config.slideshow.category, &config.dir)?;
    if report.listed == 0 {
        return Err(CarouselError::NoWallpapers(
            config.slideshow.category.clone(),
        ));
    }
    log::info!(
        "{} downloaded, {} already present, {} failed",
        report.downloaded,
        report.skipped,
        report.failed
    );

    let started = slideshow::configure(&remote, &config.slideshow, &config.dir)?;
    log::debug!(
        "slideshow pid {}, replaced {} instance(s)",
        started.pid,
        started.replaced
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn flags_only() {
        let config = Config::from_args([
            "carousel",
            "--category=anime",
            "--delay=5",
            "--clean",
            "--dir=/tmp/walls",
        ])
        .unwrap();
        assert_eq!(
            config,
            Config {
                slideshow: SlideshowConfig {
                    category: "anime".to_string(),
                    interval_minutes: 5,
                },
                clean: true,
                stop: false,
                dir: PathBuf::from("/tmp/walls"),
                api_url: DEFAULT_API.to_string(),
                verbose: false,
            }
        );
    }

    #[test]
    fn defaults() {
        let config = Config::from_args(["carousel", "--dir", "w"]).unwrap();
        assert_eq!(config.slideshow.category, "");
        assert_eq!(config.slideshow.interval_minutes, DEFAULT_DELAY_MINUTES);
        assert_eq!(config.slideshow.interval_secs(), 600);
        assert!(!config.clean);
        assert!(!config.stop);
    }

    #[test]
    fn invalid_flags() {
        for args in [
            ["carousel", "--delay=soon"],
            ["carousel", "--delay=-5"],
            ["carousel", "--speed=3"],
        ] {
            let err = Config::from_args(args).unwrap_err();
            assert_ne!(err.kind(), ErrorKind::DisplayHelp);
        }
        let err = Config::from_args(["carousel", "-h"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn prompting_only_without_flags() {
        let parse = |args: &[&str]| Cli::try_parse_from(args).unwrap();
        assert!(wants_prompt(&parse(&["carousel"])));
        assert!(wants_prompt(&parse(&["carousel", "-v"])));
        assert!(!wants_prompt(&parse(&["carousel", "--category="])));
        assert!(!wants_prompt(&parse(&["carousel", "--delay=1"])));
        assert!(!wants_prompt(&parse(&["carousel", "--clean"])));
        assert!(!wants_prompt(&parse(&["carousel", "--stop"])));
        assert!(!wants_prompt(&parse(&["carousel", "--no-prompt"])));
    }

    // Due to [`env::set_var()`] not being thread-safe, just chain them so the variables are not
    // messed around.
    #[test]
    fn getting_locations() {
        unsafe {
            env::set_var("HOME", "/home/someone");
            env::set_var("USERPROFILE", "C:\\Users\\someone");
            assert_eq!(
                sys_wallpaper_dir(),
                PathBuf::from("/home/someone/Pictures/wallpapers")
            );
            env::remove_var("HOME");
            assert_eq!(
                sys_wallpaper_dir(),
                PathBuf::from("C:\\Users\\someone")
                    .join("Pictures")
                    .join("wallpapers")
            );
            env::remove_var("USERPROFILE");
            assert_eq!(sys_wallpaper_dir(), PathBuf::from("wallpapers"));
        }
    }
}
