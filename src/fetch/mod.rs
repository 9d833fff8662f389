//! Fetching parameter files from local, URL, and Hub sources.

pub mod fetcher;
pub mod source;

pub use fetcher::{DefaultFetcher, FetchError, FetchOptions, Fetcher, LinkStrategy};
pub use source::Source;
