//! Default values and locations for fetched parameter files.

use std::path::PathBuf;

/// Extension appended to a loadable's name to form its parameter filename.
pub const PARAMFILE_EXT: &str = ".ckpt";

/// Directory name used under the platform cache directory by [`default_save_dir`].
pub const SAVE_DIR_NAME: &str = "pretrainer";

/// Default directory for fetched parameter files.
///
/// Resolves to `<platform cache dir>/pretrainer`, falling back to `/tmp` when
/// the platform cache directory cannot be determined.
pub fn default_save_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(SAVE_DIR_NAME)
}
