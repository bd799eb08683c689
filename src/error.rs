//! Error types for enumeration, device access and configuration.

use std::path::PathBuf;

use thiserror::Error;

use crate::settings::{SettingId, SettingValue};
use crate::traits::Facing;

/// Failure while listing the cameras present on the system.
///
/// Never fatal: callers degrade to "no camera available".
#[derive(Debug, Error)]
pub enum EnumerationError {
    /// The platform failed while reporting devices.
    #[error("camera enumeration failed: {0}")]
    Backend(String),
    /// The same device index was reported more than once.
    #[error("device index {0} reported more than once")]
    DuplicateIndex(u32),
}

/// Failure to obtain a device handle. Nothing is held when this is returned.
#[derive(Debug, Error)]
pub enum AcquireError {
    /// Device with the given index was not found.
    #[error("device {0} not found")]
    DeviceNotFound(u32),
    /// The device exists but could not be opened.
    #[error("failed to open device {index}: {reason}")]
    DeviceOpenFailed {
        /// Device index.
        index: u32,
        /// Platform-reported reason.
        reason: String,
    },
}

/// Failure to resolve the characteristics of a facing.
#[derive(Debug, Error)]
pub enum AccessError {
    /// No enumerated device points this way.
    #[error("no camera facing {0}")]
    NoDeviceForFacing(Facing),
    /// The device could not be acquired.
    #[error(transparent)]
    Acquire(#[from] AcquireError),
    /// The device was opened but reported no usable parameter set.
    #[error("device {index} returned no parameter set")]
    ParametersUnavailable {
        /// Device index.
        index: u32,
    },
}

/// Failure to load or save configuration and persisted settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The file is not valid TOML for the expected structure.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },
    /// Values could not be serialized.
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Failure to change a setting's persisted value.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Neither the core table nor the extension provider knows the id.
    #[error("unknown setting id {0}")]
    UnknownSetting(SettingId),
    /// The value does not satisfy the setting's constraint.
    #[error("value {value} rejected by setting {key}")]
    Rejected {
        /// Storage key of the setting.
        key: String,
        /// Rejected value.
        value: SettingValue,
    },
    /// The store failed to persist the value.
    #[error(transparent)]
    Store(#[from] ConfigError),
}
