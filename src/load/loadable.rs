//! Loadable objects and their capability interfaces.

use std::any::Any;
use std::error::Error as StdError;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::device::Device;

/// Error produced by a load hook.
#[derive(Error, Debug)]
pub enum LoadError {
    /// IO error while reading a parameter file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Parameter file contents could not be interpreted
    #[error("Malformed parameter file: {0}")]
    MalformedFile(String),

    /// A shared loadable's lock was poisoned by a panicking holder
    #[error("Loadable mutex poisoned")]
    LockPoisoned,

    /// Any other hook failure
    #[error("{0}")]
    Other(#[from] Box<dyn StdError + Send + Sync>),
}

/// Object that can receive pretrained parameters.
///
/// Implementors advertise how they load through [`as_transferable`] and
/// [`as_recoverable`]. Both default to `None`, which leaves a custom hook
/// as the only way to load such an object.
///
/// [`as_transferable`]: Loadable::as_transferable
/// [`as_recoverable`]: Loadable::as_recoverable
pub trait Loadable: Send {
    /// Type description used in error messages.
    fn kind(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Parameter-transfer capability, if this object has one.
    fn as_transferable(&mut self) -> Option<&mut dyn Transferable> {
        None
    }

    /// Checkpoint-recovery capability, if this object has one.
    fn as_recoverable(&mut self) -> Option<&mut dyn Recoverable> {
        None
    }

    /// Escape hatch for custom hooks that need the concrete type.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Objects that load pretrained parameters from a file.
pub trait Transferable {
    /// Reads parameters from `path` into `self`, targeting `device` when
    /// one is given.
    fn transfer_from(&mut self, path: &Path, device: Option<&Device>) -> Result<(), LoadError>;
}

/// Objects that restore their state from a checkpoint file.
pub trait Recoverable {
    /// Reads checkpoint state from `path` into `self`. `end_of_epoch`
    /// distinguishes epoch-boundary restores from mid-epoch ones.
    fn load_from(
        &mut self,
        path: &Path,
        end_of_epoch: bool,
        device: Option<&Device>,
    ) -> Result<(), LoadError>;
}

/// Shared handle to a loadable, usable by the caller and the pretrainer.
pub type SharedLoadable = Arc<Mutex<dyn Loadable>>;

/// Wraps a loadable in a [`SharedLoadable`] handle.
pub fn shared<L: Loadable + 'static>(loadable: L) -> SharedLoadable {
    Arc::new(Mutex::new(loadable))
}

/// Load hook registered for a specific loadable name.
///
/// Receives the loadable, the fetched parameter file, and the target device.
pub type CustomLoadHook =
    Box<dyn Fn(&mut dyn Loadable, &Path, Option<&Device>) -> Result<(), LoadError> + Send + Sync>;
