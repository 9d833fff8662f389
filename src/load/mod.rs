//! Loading fetched parameter files into registered objects.

pub mod loadable;
pub mod pretrainer;

pub use loadable::{
    shared, CustomLoadHook, LoadError, Loadable, Recoverable, SharedLoadable, Transferable,
};
pub use pretrainer::Pretrainer;
