//! Parameter file fetching and placement.
//!
//! The [`Fetcher`] trait turns a `(filename, source)` pair into a readable
//! file under a save directory. [`DefaultFetcher`] implements it for local
//! directories, HTTP(S) URLs, and the Hugging Face Hub.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use hf_hub::api::sync::Api;
use hf_hub::{Repo, RepoType};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::source::Source;

const DOWNLOAD_TIMEOUT_SECS: u64 = 600;
const MAX_RETRIES: u32 = 3;

/// Parameter fetch error.
#[derive(Error, Debug)]
pub enum FetchError {
    /// IO error while placing a file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP response with a non-success status
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// Response status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// Hugging Face Hub API error
    #[error("Hub error: {0}")]
    Hub(#[from] hf_hub::api::sync::ApiError),

    /// Local source file does not exist
    #[error("Local parameter file not found: {}", .0.display())]
    LocalFileMissing(PathBuf),

    /// Downloaded content does not match the expected checksum
    #[error("Checksum mismatch for {filename}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Filename being verified.
        filename: String,
        /// Expected SHA-256 hex digest.
        expected: String,
        /// Actual SHA-256 hex digest.
        actual: String,
    },
}

/// How fetched files are placed into the save directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStrategy {
    /// Symlink to the original file. Falls back to copying on non-Unix.
    Symlink,
    /// Copy the file contents.
    Copy,
}

impl Default for LinkStrategy {
    fn default() -> Self {
        if cfg!(unix) {
            LinkStrategy::Symlink
        } else {
            LinkStrategy::Copy
        }
    }
}

/// Behavior knobs for [`DefaultFetcher`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchOptions {
    /// Re-fetch files already present in the save directory.
    pub overwrite: bool,
    /// How local and Hub-cached files are placed into the save directory.
    pub link_strategy: LinkStrategy,
    /// Expected SHA-256 hex digests keyed by filename, checked after download.
    pub checksums: HashMap<String, String>,
}

/// Strategy for materializing a named parameter file from a source.
pub trait Fetcher: Send + Sync {
    /// Fetches `filename` from `source` into `save_dir` and returns the
    /// path of the resulting file.
    fn fetch(&self, filename: &str, source: &Source, save_dir: &Path)
        -> Result<PathBuf, FetchError>;
}

/// Parameter file fetcher.
///
/// Handles downloading, verifying, and placing parameter files.
pub struct DefaultFetcher {
    client: Client,
    hub: Api,
    options: FetchOptions,
}

impl DefaultFetcher {
    /// Create a fetcher with default options.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_options(FetchOptions::default())
    }

    /// Create a fetcher with custom options.
    pub fn with_options(options: FetchOptions) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());

        Ok(Self {
            client,
            hub: Api::new()?,
            options,
        })
    }

    fn fetch_url(&self, base: &str, filename: &str, target: &Path) -> Result<(), FetchError> {
        let url = format!("{base}/{filename}");
        log::debug!("Downloading {url}");
        let content = self.download_with_retry(&url)?;
        verify_checksum(&self.options.checksums, filename, &content)?;
        fs::write(target, content)?;
        Ok(())
    }

    fn download_with_retry(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut attempt = 0;
        loop {
            match self.download_file(url) {
                Ok(content) => return Ok(content),
                Err(e) => {
                    attempt += 1;
                    if attempt >= MAX_RETRIES {
                        return Err(e);
                    }
                    log::warn!("Download attempt {attempt} failed: {e}, retrying...");
                }
            }
        }
    }

    fn download_file(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send()?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes()?;
        Ok(bytes.to_vec())
    }

    fn fetch_local(&self, dir: &Path, filename: &str, target: &Path) -> Result<(), FetchError> {
        let source_file = dir.join(filename);
        if !source_file.is_file() {
            return Err(FetchError::LocalFileMissing(source_file));
        }
        log::debug!("Linking local file {}", source_file.display());
        let source_file = source_file.canonicalize()?;
        place_file(&source_file, target, self.options.link_strategy)
    }

    fn fetch_hub(
        &self,
        repo_id: &str,
        revision: Option<&str>,
        filename: &str,
        target: &Path,
    ) -> Result<(), FetchError> {
        let repo = match revision {
            Some(revision) => self.hub.repo(Repo::with_revision(
                repo_id.to_string(),
                RepoType::Model,
                revision.to_string(),
            )),
            None => self.hub.model(repo_id.to_string()),
        };

        log::debug!("Fetching {filename} from Hub repo {repo_id}");
        let cached = repo.get(filename)?;
        place_file(&cached, target, self.options.link_strategy)
    }
}

impl Fetcher for DefaultFetcher {
    fn fetch(&self, filename: &str, source: &Source, save_dir: &Path)
        -> Result<PathBuf, FetchError> {
        fs::create_dir_all(save_dir)?;
        let destination = save_dir.join(filename);

        if destination.exists() && !self.options.overwrite {
            log::debug!("Using existing file {}", destination.display());
            return Ok(destination);
        }

        // Stage beside the destination, swap in only after the fetch succeeds
        let staging = save_dir.join(format!("{filename}.part"));
        remove_stale(&staging)?;

        match source {
            Source::Local(dir) => self.fetch_local(dir, filename, &staging)?,
            Source::Url(base) => self.fetch_url(base, filename, &staging)?,
            Source::HuggingFace { repo_id, revision } => {
                self.fetch_hub(repo_id, revision.as_deref(), filename, &staging)?;
            }
        }

        remove_stale(&destination)?;
        fs::rename(&staging, &destination)?;
        Ok(destination)
    }
}

/// Links or copies `source_file` to `target` per the strategy.
fn place_file(source_file: &Path, target: &Path, strategy: LinkStrategy) -> Result<(), FetchError> {
    match strategy {
        LinkStrategy::Symlink => {
            #[cfg(unix)]
            std::os::unix::fs::symlink(source_file, target)?;
            #[cfg(not(unix))]
            fs::copy(source_file, target)?;
        }
        LinkStrategy::Copy => {
            fs::copy(source_file, target)?;
        }
    }
    Ok(())
}

/// Removes a leftover file or dangling symlink at `path`, if any.
fn remove_stale(path: &Path) -> Result<(), FetchError> {
    match fs::symlink_metadata(path) {
        Ok(_) => {
            fs::remove_file(path)?;
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Verifies `content` against the checksum registered for `filename`, if any.
fn verify_checksum(
    checksums: &HashMap<String, String>,
    filename: &str,
    content: &[u8],
) -> Result<(), FetchError> {
    if let Some(expected) = checksums.get(filename) {
        let actual = hex::encode(Sha256::digest(content));
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(FetchError::ChecksumMismatch {
                filename: filename.to_string(),
                expected: expected.clone(),
                actual,
            });
        }
    }
    Ok(())
}
