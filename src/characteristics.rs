//! Per-facing capability descriptors, resolved through a scoped device handle.

use std::collections::HashMap;
use std::ops::{Deref, RangeInclusive};
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::error::{AccessError, AcquireError};
use crate::registry::DeviceRegistry;
use crate::traits::{
    CameraHardware, DeviceHandle, Facing, FourCC, ParameterSet, PhysicalDevice, Size,
};

/// Immutable snapshot of what a camera supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraCharacteristics {
    device: PhysicalDevice,
    pixel_formats: Vec<FourCC>,
    picture_sizes: Vec<Size>,
    exposure_range: Option<RangeInclusive<i64>>,
    focus_modes: Vec<String>,
}

impl CameraCharacteristics {
    /// Build a descriptor from a device and the parameters read from it.
    ///
    /// Picture sizes are deduplicated and ordered largest first. A reversed
    /// exposure range has its bounds swapped.
    #[must_use]
    pub fn new(device: PhysicalDevice, parameters: ParameterSet) -> Self {
        let mut picture_sizes = parameters.picture_sizes;
        picture_sizes.sort_by(|a, b| b.area().cmp(&a.area()).then(b.cmp(a)));
        picture_sizes.dedup();

        Self {
            device,
            pixel_formats: parameters.pixel_formats,
            picture_sizes,
            exposure_range: parameters.exposure_range.map(|range| {
                let (start, end) = range.into_inner();
                start.min(end)..=start.max(end)
            }),
            focus_modes: parameters.focus_modes,
        }
    }

    /// The device this descriptor was read from.
    pub const fn device(&self) -> &PhysicalDevice {
        &self.device
    }

    /// Direction the device points.
    pub const fn facing(&self) -> Facing {
        self.device.facing
    }

    /// Supported pixel formats.
    pub fn pixel_formats(&self) -> &[FourCC] {
        &self.pixel_formats
    }

    /// Supported picture sizes, largest first.
    pub fn picture_sizes(&self) -> &[Size] {
        &self.picture_sizes
    }

    /// Largest supported picture size.
    pub fn largest_picture_size(&self) -> Option<Size> {
        self.picture_sizes.first().copied()
    }

    /// Exposure compensation range, if adjustable.
    pub const fn exposure_range(&self) -> Option<&RangeInclusive<i64>> {
        self.exposure_range.as_ref()
    }

    /// Supported focus modes.
    pub fn focus_modes(&self) -> &[String] {
        &self.focus_modes
    }
}

/// An acquired device handle, released exactly once when dropped.
///
/// Only a successful acquisition produces a guard, so a handle that was
/// never acquired can never be released.
pub struct DeviceGuard<D: DeviceHandle> {
    index: u32,
    handle: D,
}

impl<D: DeviceHandle> DeviceGuard<D> {
    /// Acquire device `index` from `hardware`.
    pub fn acquire<H>(hardware: &H, index: u32) -> Result<Self, AcquireError>
    where
        H: CameraHardware<Handle = D>,
    {
        let handle = hardware.acquire(index)?;
        debug!(index, "Acquired camera device");
        Ok(Self { index, handle })
    }

    /// Index of the held device.
    pub const fn index(&self) -> u32 {
        self.index
    }
}

impl<D: DeviceHandle> Deref for DeviceGuard<D> {
    type Target = D;

    fn deref(&self) -> &D {
        &self.handle
    }
}

impl<D: DeviceHandle> Drop for DeviceGuard<D> {
    fn drop(&mut self) {
        self.handle.release();
        debug!(index = self.index, "Released camera device");
    }
}

/// Resolves and memoizes the characteristics of the canonical device per facing.
pub struct CharacteristicsResolver<H: CameraHardware> {
    hardware: H,
    registry: DeviceRegistry,
    cache: HashMap<Facing, Arc<CameraCharacteristics>>,
}

impl<H: CameraHardware> CharacteristicsResolver<H> {
    /// Create a resolver over an already built registry.
    pub fn new(hardware: H, registry: DeviceRegistry) -> Self {
        Self {
            hardware,
            registry,
            cache: HashMap::new(),
        }
    }

    /// The registry facings are resolved against.
    pub const fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Whether any device points the given way.
    pub const fn has_facing(&self, facing: Facing) -> bool {
        self.registry.has_facing(facing)
    }

    /// Characteristics of the lowest-indexed device with the given facing.
    ///
    /// The first successful call per facing opens the device once; later
    /// calls return the cached descriptor. Failures are not cached.
    pub fn characteristics(
        &mut self,
        facing: Facing,
    ) -> Result<Arc<CameraCharacteristics>, AccessError> {
        if let Some(cached) = self.cache.get(&facing) {
            return Ok(Arc::clone(cached));
        }

        let index = self
            .registry
            .first_index(facing)
            .ok_or(AccessError::NoDeviceForFacing(facing))?;
        let device = self
            .registry
            .device(index)
            .cloned()
            .ok_or(AccessError::NoDeviceForFacing(facing))?;

        let characteristics = {
            let guard = DeviceGuard::acquire(&self.hardware, index)?;
            let Some(parameters) = guard.parameters() else {
                error!(index, %facing, "Camera returned no parameters");
                return Err(AccessError::ParametersUnavailable { index });
            };
            Arc::new(CameraCharacteristics::new(device, parameters))
        };

        info!(
            index,
            %facing,
            formats = characteristics.pixel_formats().len(),
            sizes = characteristics.picture_sizes().len(),
            "Resolved camera characteristics"
        );
        self.cache.insert(facing, Arc::clone(&characteristics));
        Ok(characteristics)
    }
}
