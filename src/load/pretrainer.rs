//! Orchestration of fetching and loading pretrained parameters.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::defaults;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::fetch::{DefaultFetcher, Fetcher, Source};
use crate::load::loadable::{CustomLoadHook, LoadError, Loadable, SharedLoadable};

/// Orchestrates parameter fetching and loading for a set of named objects.
///
/// Loadables are registered under names. [`fetch_parameters`] fetches
/// `<name>.ckpt` for each of them from one source, and [`fetch_and_load`]
/// additionally runs each loadable's load hook on its fetched file.
///
/// [`fetch_parameters`]: Pretrainer::fetch_parameters
/// [`fetch_and_load`]: Pretrainer::fetch_and_load
pub struct Pretrainer {
    save_dir: PathBuf,
    loadables: IndexMap<String, SharedLoadable>,
    custom_hooks: IndexMap<String, CustomLoadHook>,
    fetcher: Box<dyn Fetcher>,
}

impl Pretrainer {
    /// Create a pretrainer that fetches with [`DefaultFetcher`] into `save_dir`.
    pub fn new(save_dir: impl Into<PathBuf>) -> Result<Self> {
        let fetcher = DefaultFetcher::new()?;
        Ok(Self::with_fetcher(save_dir, Box::new(fetcher)))
    }

    /// Create a pretrainer with a custom fetch strategy.
    pub fn with_fetcher(save_dir: impl Into<PathBuf>, fetcher: Box<dyn Fetcher>) -> Self {
        Self {
            save_dir: save_dir.into(),
            loadables: IndexMap::new(),
            custom_hooks: IndexMap::new(),
            fetcher,
        }
    }

    /// Register loadables under their names.
    ///
    /// Registering a name again replaces the previous loadable.
    pub fn add_loadables(&mut self, loadables: impl IntoIterator<Item = (String, SharedLoadable)>) {
        for (name, loadable) in loadables {
            self.add_loadable(name, loadable);
        }
    }

    /// Register one loadable under `name`.
    pub fn add_loadable(&mut self, name: impl Into<String>, loadable: SharedLoadable) {
        self.loadables.insert(name.into(), loadable);
    }

    /// Register a custom load hook for the loadable named `name`.
    ///
    /// A custom hook takes priority over the loadable's own capabilities.
    pub fn add_custom_hook<F>(&mut self, name: impl Into<String>, hook: F)
    where
        F: Fn(&mut dyn Loadable, &Path, Option<&Device>) -> std::result::Result<(), LoadError>
            + Send
            + Sync
            + 'static,
    {
        self.custom_hooks.insert(name.into(), Box::new(hook));
    }

    /// Directory fetched parameter files are placed in.
    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    /// Names of the registered loadables, in registration order.
    pub fn loadable_names(&self) -> impl Iterator<Item = &str> {
        self.loadables.keys().map(String::as_str)
    }

    /// Number of registered loadables.
    pub fn len(&self) -> usize {
        self.loadables.len()
    }

    /// Whether no loadables are registered.
    pub fn is_empty(&self) -> bool {
        self.loadables.is_empty()
    }

    /// Fetch one parameter file per registered loadable from `source`.
    ///
    /// The file for a loadable named `n` is `n.ckpt`. Returns the fetched
    /// paths keyed by loadable name, in registration order.
    pub fn fetch_parameters(&self, source: &Source) -> Result<IndexMap<String, PathBuf>> {
        let mut paramfiles = IndexMap::with_capacity(self.loadables.len());
        for name in self.loadables.keys() {
            let filename = format!("{name}{}", defaults::PARAMFILE_EXT);
            let path = self.fetcher.fetch(&filename, source, &self.save_dir)?;
            paramfiles.insert(name.clone(), path);
        }
        Ok(paramfiles)
    }

    /// Fetch parameter files from `source` and load every registered
    /// loadable from its file.
    ///
    /// Loading stops at the first failure, leaving later loadables
    /// untouched. `device` is forwarded to each load hook.
    pub fn fetch_and_load(&self, source: &Source, device: Option<&Device>) -> Result<()> {
        let paramfiles = self.fetch_parameters(source)?;
        log::info!("Loading pretrained weights from {source}");
        self.call_load_hooks(&paramfiles, device)
    }

    /// Finds the right load hook for every loadable and calls it.
    fn call_load_hooks(
        &self,
        paramfiles: &IndexMap<String, PathBuf>,
        device: Option<&Device>,
    ) -> Result<()> {
        for (name, loadable) in &self.loadables {
            // fetch_parameters produced one path per registered loadable
            let path = &paramfiles[name.as_str()];

            let mut guard = loadable.lock().map_err(|_| Error::Load {
                name: name.clone(),
                source: LoadError::LockPoisoned,
            })?;

            let outcome = if let Some(hook) = self.custom_hooks.get(name) {
                log::debug!("Loading {name} with custom hook");
                hook(&mut *guard, path, device)
            } else if let Some(transferable) = guard.as_transferable() {
                log::debug!("Loading {name} via parameter transfer");
                transferable.transfer_from(path, device)
            } else if let Some(recoverable) = guard.as_recoverable() {
                log::debug!("Loading {name} via checkpoint recovery");
                recoverable.load_from(path, false, device)
            } else {
                return Err(Error::NoLoadStrategy {
                    name: name.clone(),
                    kind: guard.kind().to_string(),
                });
            };

            outcome.map_err(|e| Error::Load {
                name: name.clone(),
                source: e,
            })?;
        }
        Ok(())
    }
}
