//! Error types for the pretrainer.

use thiserror::Error;

/// Pretrainer error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Parameter file fetch error
    #[error("Fetch error: {0}")]
    Fetch(#[from] crate::fetch::FetchError),

    /// A load hook failed for a named loadable
    #[error("Loading parameters into \"{name}\" failed: {source}")]
    Load {
        /// Name the loadable was registered under.
        name: String,
        /// The underlying hook failure.
        #[source]
        source: crate::load::LoadError,
    },

    /// No load strategy is available for a registered loadable
    #[error(
        "No load strategy for \"{name}\" of kind {kind}: \
         register a custom hook or implement Transferable or Recoverable"
    )]
    NoLoadStrategy {
        /// Name the loadable was registered under.
        name: String,
        /// Type description reported by the loadable.
        kind: String,
    },
}

/// Result type alias for pretrainer operations.
pub type Result<T> = std::result::Result<T, Error>;
