//! Target device descriptions passed through to load hooks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Compute device a loadable's parameters should end up on.
///
/// The pretrainer itself never touches device memory; the device is carried
/// through [`fetch_and_load`](crate::Pretrainer::fetch_and_load) into each
/// load hook, which decides what to do with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// Host memory.
    Cpu,
    /// CUDA device with the given ordinal.
    Cuda(usize),
    /// Metal device with the given ordinal.
    Metal(usize),
}

impl Default for Device {
    fn default() -> Self {
        Device::Cpu
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(ordinal) => write!(f, "cuda:{ordinal}"),
            Device::Metal(ordinal) => write!(f, "metal:{ordinal}"),
        }
    }
}

/// Error returned when a device string cannot be parsed.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Unrecognized device '{0}': expected 'cpu', 'cuda[:N]', or 'metal[:N]'")]
pub struct ParseDeviceError(String);

impl FromStr for Device {
    type Err = ParseDeviceError;

    /// Parses `"cpu"`, `"cuda"`, `"metal"`, or the latter two with an
    /// explicit ordinal such as `"cuda:1"`. A missing ordinal means device 0;
    /// `"cpu"` takes no ordinal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, ordinal) = match s.split_once(':') {
            Some((kind, ordinal)) => {
                let ordinal = ordinal
                    .parse::<usize>()
                    .map_err(|_| ParseDeviceError(s.to_string()))?;
                (kind, Some(ordinal))
            }
            None => (s, None),
        };
        match (kind, ordinal) {
            ("cpu", None) => Ok(Device::Cpu),
            ("cuda", ordinal) => Ok(Device::Cuda(ordinal.unwrap_or(0))),
            ("metal", ordinal) => Ok(Device::Metal(ordinal.unwrap_or(0))),
            _ => Err(ParseDeviceError(s.to_string())),
        }
    }
}
