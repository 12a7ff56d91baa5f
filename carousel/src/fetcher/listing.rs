//! Shape of the wallpaper listing and its normalisation into download targets.

use reqwest::Url;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct Listing {
    data: Option<ListingData>,
}

#[derive(Debug, Default, Deserialize)]
struct ListingData {
    wallpapers: Option<Vec<ListingEntry>>,
}

/// One element of `data.wallpapers`.
///
/// The server has sent both bare URLs and records over time, anything else is kept as
/// [`ListingEntry::Other`] so that one odd element does not fail the whole listing.
#[derive(Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ListingEntry {
    Url(String),
    Record {
        #[serde(rename = "imgLink")]
        img_link: Option<String>,
    },
    Other(serde_json::Value),
}

/// A remote image and where it lands on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadTarget {
    pub url: String,
    pub path: PathBuf,
}

impl Listing {
    /// Entries under `data.wallpapers`, empty if either key is missing or null.
    #[must_use]
    pub fn into_entries(self) -> Vec<ListingEntry> {
        self.data
            .and_then(|data| data.wallpapers)
            .unwrap_or_default()
    }
}

impl ListingEntry {
    fn url(&self) -> Option<&str> {
        match self {
            ListingEntry::Url(url) | ListingEntry::Record { img_link: Some(url) } => {
                Some(url.as_str())
            }
            _ => None,
        }
    }
}

/// Last path segment of `url`, ignoring query and fragment.
///
/// Returns [`None`] for URLs that cannot be parsed or whose path ends with a `/`.
#[must_use]
pub fn file_name(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let name = parsed.path_segments()?.next_back()?;
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}

/// Resolves listing entries into [`DownloadTarget`]s under `dir`, keeping listing order.
///
/// Entries without a usable URL are dropped here so the download loop only sees good targets.
pub fn targets(entries: Vec<ListingEntry>, dir: &Path) -> Vec<DownloadTarget> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let Some(url) = entry.url() else {
                log::debug!("listing entry {index}: no image link, skipping");
                return None;
            };
            let Some(name) = file_name(url) else {
                log::debug!("listing entry {index}: cannot derive a file name from {url}, skipping");
                return None;
            };
            Some(DownloadTarget {
                path: dir.join(name),
                url: url.to_string(),
            })
        })
        .collect()
}
