//! Downloads the listed wallpapers into a local directory.
//!
//! Files already present are never downloaded again, presence alone counts. One failed download
//! is logged and the batch moves on.

pub mod listing;
mod remote;

pub use listing::{DownloadTarget, ListingEntry};
pub use remote::{HttpRemote, Remote, RemoteError};

use reqwest::Url;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

use listing::Listing;

pub const DEFAULT_API: &str = "https://wallpaper-carousel-production.up.railway.app";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid API address {0}")]
    BadAddress(String),
    #[error("failed to fetch the wallpaper listing: {0}")]
    Remote(#[from] RemoteError),
    #[error("malformed wallpaper listing: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure of a single file, never fatal for the batch.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// What a [`Fetcher::fetch`] run did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FetchReport {
    /// Number of entries the server listed, usable or not.
    pub listed: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct Fetcher<R: Remote> {
    remote: R,
    api: String,
}

impl<R: Remote> Fetcher<R> {
    pub fn new(remote: R, api: impl Into<String>) -> Self {
        Self {
            remote,
            api: api.into(),
        }
    }

    /// URL of the listing endpoint for `category`, an empty category means all of them.
    ///
    /// # Errors
    /// Fails if the configured API base is not a valid URL.
    pub fn listing_url(&self, category: &str) -> Result<String, FetchError> {
        let base = format!("{}/api/v1/wallpapers", self.api.trim_end_matches('/'));
        let url = Url::parse_with_params(&base, &[("category", category)])
            .map_err(|err| FetchError::BadAddress(format!("{base}: {err}")))?;
        Ok(url.into())
    }

    /// Queries the listing for `category`.
    ///
    /// # Errors
    /// Network failures, non-2xx statuses and bodies that are not the expected JSON.
    pub fn listing(&self, category: &str) -> Result<Vec<ListingEntry>, FetchError> {
        let url = self.listing_url(category)?;
        log::debug!("requesting {url}");
        let body = self.remote.get(&url)?;
        let listing: Listing = serde_json::from_reader(body)?;
        Ok(listing.into_entries())
    }

    /// Downloads every listed wallpaper of `category` missing from `dir`.
    ///
    /// # Errors
    /// Only a failure to get the listing is returned, per-file failures are counted in the
    /// report.
    pub fn fetch(&self, category: &str, dir: &Path) -> Result<FetchReport, FetchError> {
        let entries = self.listing(category)?;
        let mut report = FetchReport {
            listed: entries.len(),
            ..FetchReport::default()
        };
        log::info!(
            "{} wallpapers listed, downloading into {}",
            report.listed,
            dir.display()
        );

        for target in listing::targets(entries, dir) {
            let name = target
                .path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            if target.path.exists() {
                log::info!("skip: {name}");
                report.skipped += 1;
                continue;
            }
            log::info!("downloading: {name}");
            match self.download(&target) {
                Ok(bytes) => {
                    log::debug!("{name}: {bytes} bytes");
                    report.downloaded += 1;
                }
                Err(err) => {
                    log::warn!("failed to download {name}: {err}");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    fn download(&self, target: &DownloadTarget) -> Result<u64, DownloadError> {
        let mut body = self.remote.get(&target.url)?;
        let mut file = fs::File::create(&target.path)?;
        io::copy(&mut body, &mut file).map_err(|err| {
            // A truncated file would be skipped forever after
            drop(file);
            if let Err(rm_err) = fs::remove_file(&target.path) {
                log::debug!("cannot remove {}: {rm_err}", target.path.display());
            }
            DownloadError::Io(err)
        })
    }
}

/// Creates `dir` and its parents if missing.
///
/// # Errors
/// See [`fs::create_dir_all`].
pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    if !dir.is_dir() {
        fs::create_dir_all(dir)?;
        log::debug!("created {}", dir.display());
    }
    Ok(())
}

/// Removes everything inside `dir`, keeping `dir` itself.
///
/// # Errors
/// Stops at the first entry that cannot be removed.
pub fn clean(dir: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
        removed += 1;
    }
    log::info!("removed {removed} entries from {}", dir.display());
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::{Cursor, Read};

    #[derive(Default)]
    struct MemRemote {
        bodies: HashMap<String, Vec<u8>>,
    }

    impl Remote for MemRemote {
        fn get(&self, url: &str) -> Result<Box<dyn Read>, RemoteError> {
            self.bodies
                .get(url)
                .map(|body| Box::new(Cursor::new(body.clone())) as Box<dyn Read>)
                .ok_or(RemoteError::Status(404))
        }
    }

    #[test]
    fn listing_urls() {
        let fetcher = Fetcher::new(MemRemote::default(), "https://api.test/");
        assert_eq!(
            fetcher.listing_url("").unwrap(),
            "https://api.test/api/v1/wallpapers?category="
        );
        assert_eq!(
            fetcher.listing_url("sci fi&more").unwrap(),
            "https://api.test/api/v1/wallpapers?category=sci+fi%26more"
        );
        assert!(Fetcher::new(MemRemote::default(), "nowhere").listing_url("").is_err());
    }

    #[test]
    fn failures_do_not_stop_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let mut remote = MemRemote::default();
        remote.bodies.insert(
            "https://api.test/api/v1/wallpapers?category=".to_string(),
            br#"{"data":{"wallpapers":["https://h/gone.png","https://h/ok.png"]}}"#.to_vec(),
        );
        remote
            .bodies
            .insert("https://h/ok.png".to_string(), b"png".to_vec());

        let fetcher = Fetcher::new(remote, "https://api.test");
        let report = fetcher.fetch("", dir.path()).unwrap();
        assert_eq!(
            report,
            FetchReport {
                listed: 2,
                downloaded: 1,
                skipped: 0,
                failed: 1,
            }
        );
        assert!(!dir.path().join("gone.png").exists());
        assert_eq!(fs::read(dir.path().join("ok.png")).unwrap(), b"png");
    }

    /// Sends a few bytes of every body, then drops the connection.
    struct Truncating;

    struct Reset;

    impl Read for Reset {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::ConnectionReset))
        }
    }

    impl Remote for Truncating {
        fn get(&self, _: &str) -> Result<Box<dyn Read>, RemoteError> {
            Ok(Box::new(Cursor::new(b"\x89PNG".to_vec()).chain(Reset)))
        }
    }

    #[test]
    fn truncated_download_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let target = DownloadTarget {
            url: "https://h/cut.png".to_string(),
            path: dir.path().join("cut.png"),
        };

        let result = Fetcher::new(Truncating, "https://api.test").download(&target);
        assert!(matches!(result, Err(DownloadError::Io(_))));
        assert!(!target.path.exists());
    }

    #[test]
    fn bad_listing_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut remote = MemRemote::default();
        remote.bodies.insert(
            "https://api.test/api/v1/wallpapers?category=".to_string(),
            b"<html>oops</html>".to_vec(),
        );
        let fetcher = Fetcher::new(remote, "https://api.test");
        assert!(matches!(
            fetcher.fetch("", dir.path()),
            Err(FetchError::Json(_))
        ));

        let fetcher = Fetcher::new(MemRemote::default(), "https://api.test");
        assert!(matches!(
            fetcher.fetch("anime", dir.path()),
            Err(FetchError::Remote(RemoteError::Status(404)))
        ));
    }

    #[test]
    fn clean_keeps_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.jpg"), b"a").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("b.jpg"), b"b").unwrap();

        assert_eq!(clean(dir.path()).unwrap(), 2);
        assert!(dir.path().is_dir());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn ensure_nested_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("Pictures").join("wallpapers");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        ensure_dir(&nested).unwrap();
    }
}
