//! Pretrainer - fetching pretrained model parameters and loading them into
//! named in-memory objects.
//!
//! Register loadables under names, point a [`Pretrainer`] at a source (a
//! local directory, an HTTP(S) URL, or a Hugging Face Hub repository), and
//! call [`Pretrainer::fetch_and_load`]. Each loadable's parameter file is
//! `<name>.ckpt` under the source; fetched copies land in the save
//! directory and are loaded through a custom hook, parameter transfer, or
//! checkpoint recovery, in that order.

pub mod defaults;
pub mod device;
pub mod error;

pub mod fetch;
pub mod load;

pub use error::{Error, Result};

pub use device::{Device, ParseDeviceError};

pub use fetch::{DefaultFetcher, FetchError, FetchOptions, Fetcher, LinkStrategy, Source};

pub use load::{
    shared, CustomLoadHook, LoadError, Loadable, Pretrainer, Recoverable, SharedLoadable,
    Transferable,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
