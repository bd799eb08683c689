//! Integration tests using vivid virtual cameras.
//!
//! These tests require:
//! - The `integration` feature flag: `cargo test --features integration`
//! - The vivid kernel module loaded, e.g. `modprobe vivid n_devs=2`
//! - Access to /dev/video* devices (may require sudo or video group membership)
//!
//! vivid cards are named "vivid", so without overrides every vivid device is
//! classified as facing back.

#![cfg(feature = "integration")]
#![allow(clippy::panic)]

use pi_cam_settings::{
    AccessError, CameraHardware, CameraSession, CharacteristicsResolver, CoreSetting, DeviceGuard,
    DeviceHandle, DeviceRegistry, Facing, FacingOverride, MemoryStore, NoExtraSettings,
    SettingsCache, V4L2Hardware,
};
use serial_test::serial;

/// Macro to fail test if vivid is not available.
///
/// Returns the registry built over all V4L2 devices and the lowest vivid index.
/// Integration tests MUST have vivid loaded - they should fail, not silently skip.
macro_rules! require_vivid {
    ($hardware:expr) => {{
        let registry = DeviceRegistry::build(&$hardware).expect("enumeration should succeed");
        let index = registry
            .devices()
            .iter()
            .find(|device| device.driver.contains("vivid"))
            .map(|device| device.index)
            .unwrap_or_else(|| {
                panic!(
                    "vivid virtual camera not available.\n\
                     Load vivid with: sudo modprobe vivid n_devs=2\n\
                     Or run unit tests only: cargo test --lib"
                )
            });
        (registry, index)
    }};
}

#[test]
#[serial]
fn test_vivid_enumeration() {
    let hardware = V4L2Hardware::default();
    let (registry, index) = require_vivid!(hardware);

    let device = registry.device(index).expect("vivid device should be registered");
    println!("vivid device: video{} {} [{}]", device.index, device.card, device.bus_info);
    assert!(registry.has_facing(device.facing));
}

#[test]
#[serial]
fn test_vivid_parameters() {
    let hardware = V4L2Hardware::default();
    let (_, index) = require_vivid!(hardware);

    let guard = DeviceGuard::acquire(&hardware, index).expect("acquire should succeed");
    let parameters = guard.parameters().expect("vivid should report parameters");

    println!("Formats: {:?}", parameters.pixel_formats);
    println!("Sizes: {:?}", parameters.picture_sizes);
    assert!(!parameters.pixel_formats.is_empty());
    assert!(!parameters.picture_sizes.is_empty());
    assert!(!parameters.focus_modes.is_empty());
}

#[test]
#[serial]
fn test_vivid_override_to_front() {
    let hardware = V4L2Hardware::default();
    let (registry, index) = require_vivid!(hardware);
    let card = registry
        .device(index)
        .map(|device| device.card.clone())
        .expect("vivid device should be registered");

    let hardware = V4L2Hardware::new(vec![FacingOverride {
        card: Some(card),
        bus_info: None,
        facing: Facing::Front,
    }]);
    let registry = DeviceRegistry::build(&hardware).expect("enumeration should succeed");
    assert!(registry.has_facing(Facing::Front));
}

#[test]
#[serial]
fn test_vivid_characteristics_cached() {
    let hardware = V4L2Hardware::default();
    let (registry, index) = require_vivid!(hardware);
    let facing = registry
        .device(index)
        .map(|device| device.facing)
        .expect("vivid device should be registered");

    let mut resolver = CharacteristicsResolver::new(hardware, registry);
    let first = resolver.characteristics(facing).expect("characteristics should resolve");
    let second = resolver.characteristics(facing).expect("characteristics should resolve");

    assert!(std::sync::Arc::ptr_eq(&first, &second));
    assert!(first.largest_picture_size().is_some());
}

#[test]
#[serial]
fn test_vivid_session_settings() {
    let hardware = V4L2Hardware::default();
    let (registry, index) = require_vivid!(hardware);
    let facing = registry
        .device(index)
        .map(|device| device.facing)
        .expect("vivid device should be registered");
    let missing = Facing::ALL.into_iter().find(|f| !registry.has_facing(*f));

    let settings = SettingsCache::new(Box::new(MemoryStore::new()), Box::new(NoExtraSettings));
    let mut session = CameraSession::new(CharacteristicsResolver::new(hardware, registry), settings);
    session.switch_to(facing).expect("switch should succeed");

    let focus = session
        .settings()
        .value(CoreSetting::FocusMode.id())
        .expect("core setting");
    println!("Focus mode: {focus}");

    if let Some(missing) = missing {
        assert!(matches!(
            session.switch_to(missing),
            Err(AccessError::NoDeviceForFacing(_))
        ));
    }
}

#[test]
#[serial]
fn test_vivid_acquire_missing_index() {
    let hardware = V4L2Hardware::default();
    let _ = require_vivid!(hardware);

    assert!(hardware.acquire(999).is_err());
}
