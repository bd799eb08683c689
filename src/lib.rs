//! Pi-Cam-Settings: camera capability resolution and a device-aware settings cache
//!
//! This library resolves which camera points which way, reads each facing's
//! capabilities through a scoped device handle exactly once, and caches setting
//! descriptors that are selectively flushed when the active camera changes.
//! Hardware access sits behind traits, enabling both production use with V4L2
//! devices and testing with mock hardware.

pub mod characteristics;
pub mod config;
pub mod device;
pub mod error;
pub mod extra;
pub mod registry;
pub mod session;
pub mod settings;
pub mod store;
pub mod traits;

#[cfg(test)]
pub mod mock;

pub use characteristics::{CameraCharacteristics, CharacteristicsResolver, DeviceGuard};
pub use config::{Config, FacingOverride};
pub use device::V4L2Hardware;
pub use error::{AccessError, AcquireError, ConfigError, EnumerationError, SettingsError};
pub use extra::{ExtraSettingsProvider, NoExtraSettings};
pub use registry::DeviceRegistry;
pub use session::CameraSession;
pub use settings::{
    Constraint, CoreSetting, FactoryContext, FactoryTable, KeyIndex, Setting, SettingId,
    SettingValue, SettingsCache,
};
pub use store::{MemoryStore, SettingsStore, TomlStore};
pub use traits::{CameraHardware, DeviceHandle, Facing, FourCC, ParameterSet, PhysicalDevice, Size};
