//! Device registry: the enumerated cameras and the canonical device per facing.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::error::EnumerationError;
use crate::traits::{CameraHardware, Facing, PhysicalDevice};

/// Every enumerated camera plus the lowest-indexed device of each facing.
///
/// Built once, read-only afterward.
#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    devices: Vec<PhysicalDevice>,
    first_back: Option<u32>,
    first_front: Option<u32>,
}

impl DeviceRegistry {
    /// Enumerate the hardware and build a registry from the result.
    pub fn build<H: CameraHardware>(hardware: &H) -> Result<Self, EnumerationError> {
        let devices = hardware.enumerate_devices()?;
        let registry = Self::from_devices(devices)?;
        info!(
            devices = registry.devices.len(),
            first_back = ?registry.first_back,
            first_front = ?registry.first_front,
            "Camera registry built"
        );
        Ok(registry)
    }

    /// Build a registry from an enumeration result.
    ///
    /// Devices are kept in index order. Fails if an index appears twice.
    pub fn from_devices(mut devices: Vec<PhysicalDevice>) -> Result<Self, EnumerationError> {
        let mut seen = HashSet::with_capacity(devices.len());
        for device in &devices {
            if !seen.insert(device.index) {
                return Err(EnumerationError::DuplicateIndex(device.index));
            }
        }
        devices.sort_by_key(|device| device.index);

        let mut first_back = None;
        let mut first_front = None;
        // Walk from the highest index down so the lowest match is written last.
        for device in devices.iter().rev() {
            match device.facing {
                Facing::Back => first_back = Some(device.index),
                Facing::Front => first_front = Some(device.index),
            }
        }

        debug!(?first_back, ?first_front, "Selected canonical devices");

        Ok(Self {
            devices,
            first_back,
            first_front,
        })
    }

    /// Whether any device points the given way.
    pub const fn has_facing(&self, facing: Facing) -> bool {
        self.first_index(facing).is_some()
    }

    /// Lowest device index with the given facing.
    pub const fn first_index(&self, facing: Facing) -> Option<u32> {
        match facing {
            Facing::Back => self.first_back,
            Facing::Front => self.first_front,
        }
    }

    /// Device description by index.
    pub fn device(&self, index: u32) -> Option<&PhysicalDevice> {
        self.devices.iter().find(|device| device.index == index)
    }

    /// All devices in index order.
    pub fn devices(&self) -> &[PhysicalDevice] {
        &self.devices
    }

    /// Whether enumeration found no cameras.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
