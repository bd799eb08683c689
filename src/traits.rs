//! Core value types and the hardware boundary traits.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{AcquireError, EnumerationError};

/// Pixel format representation (e.g., YUYV, MJPG).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// Create a new `FourCC` from a 4-byte array.
    #[must_use]
    pub const fn new(code: &[u8; 4]) -> Self {
        Self(*code)
    }

    /// YUYV pixel format (4:2:2 packed).
    pub const YUYV: Self = Self::new(b"YUYV");
    /// MJPEG pixel format (Motion JPEG).
    pub const MJPG: Self = Self::new(b"MJPG");
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl From<v4l::FourCC> for FourCC {
    fn from(fourcc: v4l::FourCC) -> Self {
        Self(fourcc.repr)
    }
}

impl From<FourCC> for v4l::FourCC {
    fn from(fourcc: FourCC) -> Self {
        Self::new(&fourcc.0)
    }
}

/// Picture dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// Create a new size.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of pixels covered by this size.
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Direction a physical camera points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Facing the user (selfie camera, built-in laptop webcam).
    Front,
    /// Facing away from the user.
    Back,
}

impl Facing {
    /// Both facings, back first.
    pub const ALL: [Self; 2] = [Self::Back, Self::Front];
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Front => write!(f, "front"),
            Self::Back => write!(f, "back"),
        }
    }
}

impl FromStr for Facing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "front" => Ok(Self::Front),
            "back" | "rear" => Ok(Self::Back),
            other => Err(format!("unknown facing '{other}' (expected 'front' or 'back')")),
        }
    }
}

/// A camera as reported by enumeration. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalDevice {
    /// Device index (e.g., 0 for /dev/video0).
    pub index: u32,
    /// Direction the device points.
    pub facing: Facing,
    /// Card/device name.
    pub card: String,
    /// Driver name.
    pub driver: String,
    /// Bus information.
    pub bus_info: String,
}

impl PhysicalDevice {
    /// Create a device description with empty identification strings.
    #[must_use]
    pub const fn new(index: u32, facing: Facing) -> Self {
        Self {
            index,
            facing,
            card: String::new(),
            driver: String::new(),
            bus_info: String::new(),
        }
    }

    /// Set the card name.
    #[must_use]
    pub fn with_card<S: Into<String>>(mut self, card: S) -> Self {
        self.card = card.into();
        self
    }
}

/// Capability parameters read from an acquired device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    /// Supported pixel formats.
    pub pixel_formats: Vec<FourCC>,
    /// Supported picture sizes, across all formats.
    pub picture_sizes: Vec<Size>,
    /// Exposure control range, if the device exposes one.
    pub exposure_range: Option<RangeInclusive<i64>>,
    /// Supported focus modes.
    pub focus_modes: Vec<String>,
}

/// A device handle held while capability parameters are read.
///
/// Handles are only ever released through
/// [`DeviceGuard`](crate::characteristics::DeviceGuard), exactly once.
pub trait DeviceHandle {
    /// Read the capability parameter set. `None` when the device reports none.
    fn parameters(&self) -> Option<ParameterSet>;

    /// Return the device to the system.
    fn release(&mut self);
}

/// Abstraction over camera enumeration and device acquisition.
pub trait CameraHardware {
    /// Handle type returned by a successful acquisition.
    type Handle: DeviceHandle;

    /// List every camera the system reports.
    fn enumerate_devices(&self) -> Result<Vec<PhysicalDevice>, EnumerationError>;

    /// Open the device with the given index.
    fn acquire(&self, index: u32) -> Result<Self::Handle, AcquireError>;
}
