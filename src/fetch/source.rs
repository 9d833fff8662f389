//! Parameter source classification.
//!
//! A [`Source`] names where parameter files live: a local directory, an
//! HTTP(S) base URL, or a Hugging Face Hub repository.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Where parameter files are fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    /// Local directory containing the parameter files.
    Local(PathBuf),
    /// HTTP(S) base URL; filenames are appended to it.
    Url(String),
    /// Hugging Face Hub repository.
    HuggingFace {
        /// Repository id, e.g. `speechbrain/asr-crdnn-rnnlm-librispeech`.
        repo_id: String,
        /// Branch, tag, or commit; `None` means the default branch.
        revision: Option<String>,
    },
}

impl Source {
    /// Classifies a source string.
    ///
    /// Strings with an `http://` or `https://` prefix are URLs, strings
    /// naming an existing directory are local, and everything else is
    /// treated as a Hub repository id, optionally suffixed `@revision`.
    pub fn parse(s: &str) -> Self {
        if is_url(s) {
            return Source::url(s);
        }
        let path = Path::new(s);
        if path.is_dir() {
            return Source::Local(path.to_path_buf());
        }
        match s.split_once('@') {
            Some((repo_id, revision)) => Source::HuggingFace {
                repo_id: repo_id.to_string(),
                revision: Some(revision.to_string()),
            },
            None => Source::hugging_face(s),
        }
    }

    /// Source rooted at a local directory.
    pub fn local(dir: impl Into<PathBuf>) -> Self {
        Source::Local(dir.into())
    }

    /// Source rooted at an HTTP(S) base URL.
    ///
    /// A trailing slash on `base` is dropped so filenames join cleanly.
    pub fn url(base: impl Into<String>) -> Self {
        let base = base.into();
        Source::Url(base.trim_end_matches('/').to_string())
    }

    /// Hub repository at its default revision.
    pub fn hugging_face(repo_id: impl Into<String>) -> Self {
        Source::HuggingFace {
            repo_id: repo_id.into(),
            revision: None,
        }
    }
}

fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

impl From<&str> for Source {
    fn from(s: &str) -> Self {
        Source::parse(s)
    }
}

impl From<String> for Source {
    fn from(s: String) -> Self {
        Source::parse(&s)
    }
}

impl From<PathBuf> for Source {
    fn from(dir: PathBuf) -> Self {
        Source::Local(dir)
    }
}

impl From<&Path> for Source {
    fn from(dir: &Path) -> Self {
        Source::Local(dir.to_path_buf())
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Local(dir) => write!(f, "{}", dir.display()),
            Source::Url(base) => write!(f, "{base}"),
            Source::HuggingFace {
                repo_id,
                revision: None,
            } => write!(f, "{repo_id}"),
            Source::HuggingFace {
                repo_id,
                revision: Some(revision),
            } => write!(f, "{repo_id}@{revision}"),
        }
    }
}
