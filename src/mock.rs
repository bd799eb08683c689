//! Mock hardware for testing without cameras.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use crate::error::{AcquireError, EnumerationError};
use crate::traits::{
    CameraHardware, DeviceHandle, FourCC, ParameterSet, PhysicalDevice, Size,
};

/// Acquire/release counters shared between the hardware and its handles.
#[derive(Debug, Default)]
pub struct Counters {
    acquired: Cell<u32>,
    released: Cell<u32>,
}

impl Counters {
    /// Successful acquisitions so far.
    pub fn acquired(&self) -> u32 {
        self.acquired.get()
    }

    /// Releases so far.
    pub fn released(&self) -> u32 {
        self.released.get()
    }
}

/// Mock hardware with call counting and injectable failures.
pub struct MockHardware {
    devices: Vec<PhysicalDevice>,
    fail_enumeration: bool,
    failing_acquire: RefCell<HashSet<u32>>,
    missing_parameters: RefCell<HashSet<u32>>,
    attempts: Cell<u32>,
    counters: Rc<Counters>,
}

impl MockHardware {
    /// Create mock hardware reporting the given devices.
    #[must_use]
    pub fn new(devices: Vec<PhysicalDevice>) -> Self {
        Self {
            devices,
            fail_enumeration: false,
            failing_acquire: RefCell::new(HashSet::new()),
            missing_parameters: RefCell::new(HashSet::new()),
            attempts: Cell::new(0),
            counters: Rc::new(Counters::default()),
        }
    }

    /// Make enumeration fail.
    #[must_use]
    pub fn with_enumeration_failure(mut self) -> Self {
        self.fail_enumeration = true;
        self
    }

    /// Make acquisition of `index` fail until cleared.
    pub fn fail_acquire(&self, index: u32, fail: bool) {
        toggle(&self.failing_acquire, index, fail);
    }

    /// Make the handle for `index` report no parameter set until cleared.
    pub fn withhold_parameters(&self, index: u32, withhold: bool) {
        toggle(&self.missing_parameters, index, withhold);
    }

    /// Acquisition attempts, including failed ones.
    pub fn attempts(&self) -> u32 {
        self.attempts.get()
    }

    /// Shared counters.
    pub fn counters(&self) -> &Counters {
        &self.counters
    }
}

fn toggle(set: &RefCell<HashSet<u32>>, index: u32, on: bool) {
    let mut set = set.borrow_mut();
    if on {
        set.insert(index);
    } else {
        set.remove(&index);
    }
}

impl CameraHardware for MockHardware {
    type Handle = MockHandle;

    fn enumerate_devices(&self) -> Result<Vec<PhysicalDevice>, EnumerationError> {
        if self.fail_enumeration {
            return Err(EnumerationError::Backend("mock enumeration failure".to_owned()));
        }
        Ok(self.devices.clone())
    }

    fn acquire(&self, index: u32) -> Result<Self::Handle, AcquireError> {
        self.attempts.set(self.attempts.get() + 1);

        if !self.devices.iter().any(|device| device.index == index) {
            return Err(AcquireError::DeviceNotFound(index));
        }
        if self.failing_acquire.borrow().contains(&index) {
            return Err(AcquireError::DeviceOpenFailed {
                index,
                reason: "mock device busy".to_owned(),
            });
        }

        self.counters.acquired.set(self.counters.acquired.get() + 1);
        let parameters = if self.missing_parameters.borrow().contains(&index) {
            None
        } else {
            Some(mock_parameters())
        };

        Ok(MockHandle {
            parameters,
            counters: Rc::clone(&self.counters),
        })
    }
}

/// Handle returned by [`MockHardware`].
pub struct MockHandle {
    parameters: Option<ParameterSet>,
    counters: Rc<Counters>,
}

impl DeviceHandle for MockHandle {
    fn parameters(&self) -> Option<ParameterSet> {
        self.parameters.clone()
    }

    fn release(&mut self) {
        self.counters.released.set(self.counters.released.get() + 1);
    }
}

/// Parameter set every mock device reports.
pub fn mock_parameters() -> ParameterSet {
    ParameterSet {
        pixel_formats: vec![FourCC::YUYV, FourCC::MJPG],
        picture_sizes: vec![Size::new(640, 480), Size::new(1280, 720), Size::new(1920, 1080)],
        exposure_range: Some(-3..=3),
        focus_modes: vec!["auto".to_owned(), "continuous-picture".to_owned()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Facing;

    #[test]
    fn test_mock_counts_acquire_and_release() {
        let hardware = MockHardware::new(vec![PhysicalDevice::new(0, Facing::Back)]);

        let mut handle = hardware.acquire(0).expect("acquire should succeed");
        assert_eq!(hardware.counters().acquired(), 1);
        assert_eq!(hardware.counters().released(), 0);

        handle.release();
        assert_eq!(hardware.counters().released(), 1);
    }

    #[test]
    fn test_mock_unknown_index() {
        let hardware = MockHardware::new(Vec::new());

        assert!(matches!(
            hardware.acquire(3),
            Err(AcquireError::DeviceNotFound(3))
        ));
        assert_eq!(hardware.attempts(), 1);
        assert_eq!(hardware.counters().acquired(), 0);
    }

    #[test]
    fn test_mock_withheld_parameters() {
        let hardware = MockHardware::new(vec![PhysicalDevice::new(0, Facing::Back)]);
        hardware.withhold_parameters(0, true);

        let handle = hardware.acquire(0).expect("acquire should succeed");
        assert!(handle.parameters().is_none());
    }
}
