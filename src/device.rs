//! V4L2 hardware implementation using the v4l crate.

use std::io;

use tracing::{debug, warn};
use v4l::capability::Flags;
use v4l::context;
use v4l::framesize::FrameSizeEnum;
use v4l::video::Capture;
use v4l::Device;

use crate::config::FacingOverride;
use crate::error::{AcquireError, EnumerationError};
use crate::traits::{
    CameraHardware, DeviceHandle, Facing, FourCC, ParameterSet, PhysicalDevice, Size,
};

/// `V4L2_CID_AUTO_EXPOSURE_BIAS`: exposure compensation.
const CID_AUTO_EXPOSURE_BIAS: u32 = 0x009a_0913;
/// `V4L2_CID_FOCUS_AUTO`: continuous autofocus.
const CID_FOCUS_AUTO: u32 = 0x009a_090c;
/// `V4L2_CID_FOCUS_ABSOLUTE`: manual focus distance.
const CID_FOCUS_ABSOLUTE: u32 = 0x009a_090a;

/// Card name fragments of cameras that face the user.
const USER_FACING_HINTS: [&str; 5] = ["integrated", "front", "facetime", "user", "built-in"];

/// Cameras reachable through Video4Linux2 device nodes.
#[derive(Debug, Clone, Default)]
pub struct V4L2Hardware {
    overrides: Vec<FacingOverride>,
}

impl V4L2Hardware {
    /// Create the backend with the given facing rules.
    #[must_use]
    pub const fn new(overrides: Vec<FacingOverride>) -> Self {
        Self { overrides }
    }
}

/// Decide which way a V4L2 device points.
///
/// V4L2 reports no facing, so a matching override wins, then card names that
/// read like a built-in user-facing webcam, then `Back`.
pub fn classify_facing(card: &str, bus_info: &str, overrides: &[FacingOverride]) -> Facing {
    if let Some(rule) = overrides.iter().find(|rule| rule.matches(card, bus_info)) {
        return rule.facing;
    }

    let card = card.to_lowercase();
    if USER_FACING_HINTS.iter().any(|hint| card.contains(hint)) {
        Facing::Front
    } else {
        Facing::Back
    }
}

/// Describe node `index` as a camera, or `None` when it cannot capture video.
fn capture_device(
    index: usize,
    flags: Flags,
    card: String,
    driver: String,
    bus_info: String,
    overrides: &[FacingOverride],
) -> Option<PhysicalDevice> {
    if !flags.contains(Flags::VIDEO_CAPTURE) {
        debug!(index, %card, "Skipping non-capture node");
        return None;
    }
    let Ok(index) = u32::try_from(index) else {
        warn!(index, "Skipping node with out of range index");
        return None;
    };

    Some(PhysicalDevice {
        index,
        facing: classify_facing(&card, &bus_info, overrides),
        card,
        driver,
        bus_info,
    })
}

impl CameraHardware for V4L2Hardware {
    type Handle = V4L2Handle;

    fn enumerate_devices(&self) -> Result<Vec<PhysicalDevice>, EnumerationError> {
        let mut devices = Vec::new();

        for node in context::enum_devices() {
            let index = node.index();
            let caps = match Device::new(index).and_then(|device| device.query_caps()) {
                Ok(caps) => caps,
                Err(err) => {
                    warn!(index, error = %err, "Skipping unreadable video node");
                    continue;
                }
            };

            if let Some(device) = capture_device(
                index,
                caps.capabilities,
                caps.card,
                caps.driver,
                caps.bus,
                &self.overrides,
            ) {
                debug!(index, card = %device.card, facing = %device.facing, "Found capture device");
                devices.push(device);
            }
        }

        Ok(devices)
    }

    fn acquire(&self, index: u32) -> Result<Self::Handle, AcquireError> {
        let device = Device::new(index as usize).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => AcquireError::DeviceNotFound(index),
            _ => AcquireError::DeviceOpenFailed {
                index,
                reason: err.to_string(),
            },
        })?;

        Ok(V4L2Handle {
            index,
            device: Some(device),
        })
    }
}

/// An open V4L2 device node.
pub struct V4L2Handle {
    index: u32,
    device: Option<Device>,
}

impl DeviceHandle for V4L2Handle {
    fn parameters(&self) -> Option<ParameterSet> {
        let device = self.device.as_ref()?;

        let formats = match device.enum_formats() {
            Ok(formats) if !formats.is_empty() => formats,
            Ok(_) => return None,
            Err(err) => {
                warn!(index = self.index, error = %err, "Failed to enumerate formats");
                return None;
            }
        };

        let mut picture_sizes = Vec::new();
        for format in &formats {
            let Ok(framesizes) = device.enum_framesizes(format.fourcc) else {
                continue;
            };
            for framesize in framesizes {
                match framesize.size {
                    FrameSizeEnum::Discrete(size) => {
                        picture_sizes.push(Size::new(size.width, size.height));
                    }
                    FrameSizeEnum::Stepwise(range) => {
                        picture_sizes.push(Size::new(range.min_width, range.min_height));
                        picture_sizes.push(Size::new(range.max_width, range.max_height));
                    }
                }
            }
        }

        let controls = device.query_controls().unwrap_or_default();
        let exposure_range = controls
            .iter()
            .find(|control| control.id == CID_AUTO_EXPOSURE_BIAS)
            .map(|control| control.minimum..=control.maximum);

        let mut focus_modes = Vec::new();
        if controls.iter().any(|control| control.id == CID_FOCUS_AUTO) {
            focus_modes.push("auto".to_owned());
            focus_modes.push("continuous-picture".to_owned());
        }
        if controls.iter().any(|control| control.id == CID_FOCUS_ABSOLUTE) {
            focus_modes.push("manual".to_owned());
        }
        if focus_modes.is_empty() {
            focus_modes.push("fixed".to_owned());
        }

        Some(ParameterSet {
            pixel_formats: formats.iter().map(|format| FourCC::from(format.fourcc)).collect(),
            picture_sizes,
            exposure_range,
            focus_modes,
        })
    }

    fn release(&mut self) {
        // Dropping the device closes the node.
        self.device.take();
    }
}
