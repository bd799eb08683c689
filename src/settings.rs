//! Lazily built setting descriptors, cached by id and selectively flushed when
//! the active camera changes.
//!
//! A [`Setting`] describes one persisted preference: its storage key, its
//! default, the values it accepts and whether it depends on the camera that
//! was active when it was built. Descriptors are built on first use by the
//! [`FactoryTable`] (or the [`ExtraSettingsProvider`] for ids the table does
//! not know) and kept until [`SettingsCache::flush`] drops the camera-dependent
//! ones.

use std::collections::HashMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::characteristics::CameraCharacteristics;
use crate::error::SettingsError;
use crate::extra::ExtraSettingsProvider;
use crate::store::SettingsStore;

/// Small integer identifying a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SettingId(pub u32);

impl fmt::Display for SettingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted setting value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    /// On/off preference.
    Bool(bool),
    /// Numeric preference.
    Int(i64),
    /// Textual preference, usually one of a fixed set of choices.
    Text(String),
}

impl SettingValue {
    fn same_kind(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "\"{value}\""),
        }
    }
}

/// Values a setting accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// Any value of the same kind as the default.
    Any,
    /// One of the listed strings.
    Choices(Vec<String>),
    /// An integer within the range.
    Range(RangeInclusive<i64>),
}

impl Constraint {
    fn choices(values: &[&str]) -> Self {
        Self::Choices(values.iter().map(|&value| value.to_owned()).collect())
    }
}

/// Descriptor of one persisted setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    key: String,
    default: SettingValue,
    constraint: Constraint,
    flush_on_device_change: bool,
}

impl Setting {
    /// A setting accepting any value of the default's kind, kept across
    /// camera changes.
    #[must_use]
    pub fn new<S: Into<String>>(key: S, default: SettingValue) -> Self {
        Self {
            key: key.into(),
            default,
            constraint: Constraint::Any,
            flush_on_device_change: false,
        }
    }

    /// Restrict accepted values.
    #[must_use]
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = constraint;
        self
    }

    /// Mark the setting as depending on the active camera.
    #[must_use]
    pub fn flushed_on_device_change(mut self) -> Self {
        self.flush_on_device_change = true;
        self
    }

    /// Storage key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Value used when nothing valid is stored.
    pub const fn default_value(&self) -> &SettingValue {
        &self.default
    }

    /// Accepted values.
    pub const fn constraint(&self) -> &Constraint {
        &self.constraint
    }

    /// Whether the cache drops this descriptor when the camera changes.
    pub const fn flush_on_device_change(&self) -> bool {
        self.flush_on_device_change
    }

    /// Whether `value` may be stored for this setting.
    pub fn accepts(&self, value: &SettingValue) -> bool {
        match (&self.constraint, value) {
            (Constraint::Any, value) => value.same_kind(&self.default),
            (Constraint::Choices(choices), SettingValue::Text(text)) => choices.contains(text),
            (Constraint::Range(range), SettingValue::Int(number)) => range.contains(number),
            _ => false,
        }
    }

    /// The stored value if it is acceptable, the default otherwise.
    pub fn current(&self, store: &dyn SettingsStore) -> SettingValue {
        match store.read(&self.key) {
            Some(value) if self.accepts(&value) => value,
            Some(value) => {
                debug!(key = %self.key, %value, "Ignoring stored value outside constraint");
                self.default.clone()
            }
            None => self.default.clone(),
        }
    }
}

/// Mapping from storage key to setting id.
#[derive(Debug, Clone, Default)]
pub struct KeyIndex {
    keys: HashMap<String, SettingId>,
}

impl KeyIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `key` to `id`, returning the id it replaced.
    pub fn insert<S: Into<String>>(&mut self, key: S, id: SettingId) -> Option<SettingId> {
        self.keys.insert(key.into(), id)
    }

    /// Id registered for `key`.
    pub fn get(&self, key: &str) -> Option<SettingId> {
        self.keys.get(key).copied()
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no keys are registered.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Ambient state a factory may consult while building a descriptor.
pub struct FactoryContext<'a> {
    /// Persisted values.
    pub store: &'a dyn SettingsStore,
    /// Characteristics of the active camera, when one is known.
    pub capabilities: Option<&'a CameraCharacteristics>,
}

/// Builds the descriptor for one setting id.
pub type SettingFactory = Box<dyn Fn(&FactoryContext<'_>) -> Setting>;

/// The settings built into the application, in id order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum CoreSetting {
    /// Tag captures with location.
    RecordLocation = 0,
    /// Video quality of the back camera.
    VideoQualityBack = 1,
    /// Video quality of the front camera.
    VideoQualityFront = 2,
    /// Time-lapse frame interval in milliseconds; 0 disables time lapse.
    TimeLapseFrameInterval = 3,
    /// Picture size of the back camera.
    PictureSizeBack = 4,
    /// Picture size of the front camera.
    PictureSizeFront = 5,
    /// JPEG encoding quality.
    JpegQuality = 6,
    /// Focus mode.
    FocusMode = 7,
    /// Photo flash mode.
    FlashMode = 8,
    /// Video torch mode.
    VideoCameraFlashMode = 9,
    /// Scene mode.
    SceneMode = 10,
    /// Exposure compensation value.
    ExposureCompensationValue = 11,
    /// Video effect.
    VideoEffect = 12,
    /// Last used camera device index.
    CameraId = 13,
    /// HDR enabled.
    CameraHdr = 14,
    /// HDR+ enabled.
    CameraHdrPlus = 15,
    /// Camera first-use hint has been shown.
    CameraFirstUseHintShown = 16,
    /// Video first-use hint has been shown.
    VideoFirstUseHintShown = 17,
    /// Module shown at startup.
    StartupModuleIndex = 18,
    /// Last used camera module.
    CameraModuleLastUsed = 19,
    /// Panorama orientation.
    PanoOrientation = 20,
    /// Composition grid lines.
    GridLines = 21,
    /// Release notes version last shown.
    ReleaseDialogLastShownVersion = 22,
    /// Whether the back camera has been seen to support flash.
    FlashSupportedBackCamera = 23,
    /// Settings upgrade version.
    StrictUpgradeVersion = 24,
    /// HDR+ result requested by the calling intent.
    RequestReturnHdrPlus = 25,
    /// Refocus viewer cling still to be shown.
    ShouldShowRefocusViewerCling = 26,
    /// Manual exposure compensation enabled.
    ExposureCompensationEnabled = 27,
    /// User picked an aspect ratio.
    UserSelectedAspectRatio = 28,
    /// Self-timer countdown in seconds.
    CountdownDuration = 29,
    /// Flash mode while HDR+ is on.
    HdrPlusFlashMode = 30,
    /// Settings button cling still to be shown.
    ShouldShowSettingsButtonCling = 31,
}

const FLASH_MODES: &[&str] = &["auto", "on", "off"];
const VIDEO_QUALITIES: &[&str] = &["large", "medium", "small"];

impl CoreSetting {
    /// Every core setting, in id order.
    pub const ALL: [Self; 32] = [
        Self::RecordLocation,
        Self::VideoQualityBack,
        Self::VideoQualityFront,
        Self::TimeLapseFrameInterval,
        Self::PictureSizeBack,
        Self::PictureSizeFront,
        Self::JpegQuality,
        Self::FocusMode,
        Self::FlashMode,
        Self::VideoCameraFlashMode,
        Self::SceneMode,
        Self::ExposureCompensationValue,
        Self::VideoEffect,
        Self::CameraId,
        Self::CameraHdr,
        Self::CameraHdrPlus,
        Self::CameraFirstUseHintShown,
        Self::VideoFirstUseHintShown,
        Self::StartupModuleIndex,
        Self::CameraModuleLastUsed,
        Self::PanoOrientation,
        Self::GridLines,
        Self::ReleaseDialogLastShownVersion,
        Self::FlashSupportedBackCamera,
        Self::StrictUpgradeVersion,
        Self::RequestReturnHdrPlus,
        Self::ShouldShowRefocusViewerCling,
        Self::ExposureCompensationEnabled,
        Self::UserSelectedAspectRatio,
        Self::CountdownDuration,
        Self::HdrPlusFlashMode,
        Self::ShouldShowSettingsButtonCling,
    ];

    /// Cache id.
    pub const fn id(self) -> SettingId {
        SettingId(self as u32)
    }

    /// Persisted storage key.
    pub const fn key(self) -> &'static str {
        match self {
            Self::RecordLocation => "pref_camera_recordlocation_key",
            Self::VideoQualityBack => "pref_video_quality_back_key",
            Self::VideoQualityFront => "pref_video_quality_front_key",
            Self::TimeLapseFrameInterval => "pref_video_time_lapse_frame_interval_key",
            Self::PictureSizeBack => "pref_camera_picturesize_back_key",
            Self::PictureSizeFront => "pref_camera_picturesize_front_key",
            Self::JpegQuality => "pref_camera_jpegquality_key",
            Self::FocusMode => "pref_camera_focusmode_key",
            Self::FlashMode => "pref_camera_flashmode_key",
            Self::VideoCameraFlashMode => "pref_camera_video_flashmode_key",
            Self::SceneMode => "pref_camera_scenemode_key",
            Self::ExposureCompensationValue => "pref_camera_exposure_key",
            Self::VideoEffect => "pref_video_effect_key",
            Self::CameraId => "pref_camera_id_key",
            Self::CameraHdr => "pref_camera_hdr_key",
            Self::CameraHdrPlus => "pref_camera_hdr_plus_key",
            Self::CameraFirstUseHintShown => "pref_camera_first_use_hint_shown_key",
            Self::VideoFirstUseHintShown => "pref_video_first_use_hint_shown_key",
            Self::StartupModuleIndex => "camera.startup_module",
            Self::CameraModuleLastUsed => "pref_camera_module_last_used_index",
            Self::PanoOrientation => "pref_camera_pano_orientation",
            Self::GridLines => "pref_camera_grid_lines",
            Self::ReleaseDialogLastShownVersion => "pref_release_dialog_last_shown_version",
            Self::FlashSupportedBackCamera => "pref_flash_supported_back_camera",
            Self::StrictUpgradeVersion => "pref_strict_upgrade_version",
            Self::RequestReturnHdrPlus => "pref_request_return_hdr_plus",
            Self::ShouldShowRefocusViewerCling => "pref_should_show_refocus_viewer_cling",
            Self::ExposureCompensationEnabled => "pref_camera_exposure_compensation_key",
            Self::UserSelectedAspectRatio => "pref_user_selected_aspect_ratio",
            Self::CountdownDuration => "pref_camera_countdown_duration_key",
            Self::HdrPlusFlashMode => "pref_hdr_plus_flash_mode",
            Self::ShouldShowSettingsButtonCling => "pref_should_show_settings_button_cling",
        }
    }

    /// Core setting with the given id.
    pub fn from_id(id: SettingId) -> Option<Self> {
        Self::ALL.get(usize::try_from(id.0).ok()?).copied()
    }

    /// Build the descriptor.
    pub fn build(self, context: &FactoryContext<'_>) -> Setting {
        let key = self.key();
        let text = |value: &str| SettingValue::Text(value.to_owned());

        match self {
            Self::RecordLocation
            | Self::CameraHdr
            | Self::CameraHdrPlus
            | Self::GridLines
            | Self::FlashSupportedBackCamera
            | Self::RequestReturnHdrPlus
            | Self::ExposureCompensationEnabled
            | Self::UserSelectedAspectRatio => Setting::new(key, SettingValue::Bool(false)),
            Self::CameraFirstUseHintShown
            | Self::VideoFirstUseHintShown
            | Self::ShouldShowRefocusViewerCling
            | Self::ShouldShowSettingsButtonCling => Setting::new(key, SettingValue::Bool(true)),
            Self::VideoQualityBack | Self::VideoQualityFront => Setting::new(key, text("large"))
                .with_constraint(Constraint::choices(VIDEO_QUALITIES)),
            Self::TimeLapseFrameInterval => Setting::new(key, SettingValue::Int(0))
                .with_constraint(Constraint::Range(0..=60_000)),
            // Empty means the largest size the camera supports.
            Self::PictureSizeBack | Self::PictureSizeFront => Setting::new(key, text("")),
            Self::JpegQuality => Setting::new(key, text("superfine"))
                .with_constraint(Constraint::choices(&["normal", "fine", "superfine"])),
            Self::FocusMode => focus_mode_setting(key, context.capabilities),
            Self::FlashMode => Setting::new(key, text("auto"))
                .with_constraint(Constraint::choices(FLASH_MODES))
                .flushed_on_device_change(),
            Self::VideoCameraFlashMode => Setting::new(key, text("off"))
                .with_constraint(Constraint::choices(&["on", "off"]))
                .flushed_on_device_change(),
            Self::SceneMode => Setting::new(key, text("auto"))
                .with_constraint(Constraint::choices(&[
                    "auto",
                    "action",
                    "night",
                    "portrait",
                    "landscape",
                ]))
                .flushed_on_device_change(),
            Self::ExposureCompensationValue => exposure_setting(key, context.capabilities),
            Self::VideoEffect => Setting::new(key, text("none")),
            Self::CameraId => Setting::new(key, SettingValue::Int(0))
                .with_constraint(Constraint::Range(0..=i64::from(u32::MAX))),
            Self::StartupModuleIndex | Self::CameraModuleLastUsed => {
                Setting::new(key, SettingValue::Int(0))
                    .with_constraint(Constraint::Range(0..=i64::from(u32::MAX)))
            }
            Self::PanoOrientation => Setting::new(key, text("horizontal")).with_constraint(
                Constraint::choices(&["horizontal", "vertical", "wideangle", "fisheye"]),
            ),
            Self::ReleaseDialogLastShownVersion => Setting::new(key, text("")),
            Self::StrictUpgradeVersion => Setting::new(key, SettingValue::Int(0)),
            Self::CountdownDuration => Setting::new(key, SettingValue::Int(0))
                .with_constraint(Constraint::Range(0..=10)),
            Self::HdrPlusFlashMode => Setting::new(key, text("off"))
                .with_constraint(Constraint::choices(FLASH_MODES))
                .flushed_on_device_change(),
        }
    }
}

fn focus_mode_setting(key: &str, capabilities: Option<&CameraCharacteristics>) -> Setting {
    let modes = capabilities.map_or(&[][..], CameraCharacteristics::focus_modes);
    let setting = match modes.first() {
        None => Setting::new(key, SettingValue::Text("auto".to_owned())),
        Some(first) => {
            let default = if modes.iter().any(|mode| mode == "auto") {
                "auto"
            } else {
                first.as_str()
            };
            Setting::new(key, SettingValue::Text(default.to_owned()))
                .with_constraint(Constraint::Choices(modes.to_vec()))
        }
    };
    setting.flushed_on_device_change()
}

fn exposure_setting(key: &str, capabilities: Option<&CameraCharacteristics>) -> Setting {
    let range = capabilities
        .and_then(CameraCharacteristics::exposure_range)
        .filter(|range| !range.is_empty())
        .cloned()
        .unwrap_or(0..=0);
    let default = 0_i64.clamp(*range.start(), *range.end());

    Setting::new(key, SettingValue::Int(default))
        .with_constraint(Constraint::Range(range))
        .flushed_on_device_change()
}

/// Factories for the ids the application knows, plus the keys they persist under.
pub struct FactoryTable {
    factories: HashMap<SettingId, SettingFactory>,
    keys: Vec<(String, SettingId)>,
}

impl FactoryTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            keys: Vec::new(),
        }
    }

    /// The table of built-in settings.
    #[must_use]
    pub fn core() -> Self {
        let mut table = Self::new();
        for setting in CoreSetting::ALL {
            table.register(
                setting.id(),
                setting.key(),
                Box::new(move |context| setting.build(context)),
            );
        }
        table
    }

    /// Register `factory` for `id`, persisted under `key`.
    pub fn register<S: Into<String>>(&mut self, id: SettingId, key: S, factory: SettingFactory) {
        self.keys.push((key.into(), id));
        self.factories.insert(id, factory);
    }

    fn build(&self, id: SettingId, context: &FactoryContext<'_>) -> Option<Setting> {
        self.factories.get(&id).map(|factory| factory(context))
    }

    fn key_index(&self) -> KeyIndex {
        let mut index = KeyIndex::new();
        for (key, id) in &self.keys {
            index.insert(key.as_str(), *id);
        }
        index
    }
}

impl Default for FactoryTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Sparse, lazily populated cache of setting descriptors.
///
/// Single-threaded: callers serialise `get` and `flush`.
pub struct SettingsCache {
    factories: FactoryTable,
    extra: Box<dyn ExtraSettingsProvider>,
    store: Box<dyn SettingsStore>,
    capabilities: Option<Arc<CameraCharacteristics>>,
    key_index: KeyIndex,
    entries: HashMap<SettingId, Arc<Setting>>,
    /// At least the greatest id present; `None` when nothing was cached since
    /// the last flush emptied the tail.
    watermark: Option<SettingId>,
}

impl SettingsCache {
    /// Cache over the built-in settings.
    pub fn new(store: Box<dyn SettingsStore>, extra: Box<dyn ExtraSettingsProvider>) -> Self {
        Self::with_factories(FactoryTable::core(), store, extra)
    }

    /// Cache over a custom factory table.
    pub fn with_factories(
        factories: FactoryTable,
        store: Box<dyn SettingsStore>,
        extra: Box<dyn ExtraSettingsProvider>,
    ) -> Self {
        let mut key_index = factories.key_index();
        extra.extend_key_index(&mut key_index);
        debug!(keys = key_index.len(), "Settings key index built");

        Self {
            factories,
            extra,
            store,
            capabilities: None,
            key_index,
            entries: HashMap::new(),
            watermark: None,
        }
    }

    /// Supply the characteristics of the active camera to later builds.
    ///
    /// Descriptors already cached are unaffected until the next `flush`.
    pub fn set_capabilities(&mut self, capabilities: Option<Arc<CameraCharacteristics>>) {
        self.capabilities = capabilities;
    }

    /// Characteristics currently supplied to factories.
    pub fn capabilities(&self) -> Option<&CameraCharacteristics> {
        self.capabilities.as_deref()
    }

    /// Descriptor for `id`, building and caching it on first use.
    ///
    /// `None` when neither the core table nor the extension provider knows
    /// the id; such misses are not cached.
    pub fn get(&mut self, id: SettingId) -> Option<Arc<Setting>> {
        if let Some(setting) = self.entries.get(&id) {
            trace!(%id, "Settings cache hit");
            return Some(Arc::clone(setting));
        }

        let context = FactoryContext {
            store: self.store.as_ref(),
            capabilities: self.capabilities.as_deref(),
        };
        let setting = match self.factories.build(id, &context) {
            Some(setting) => setting,
            None => self.extra.build_from_id(id, &context)?,
        };
        let setting = Arc::new(setting);

        debug!(%id, key = setting.key(), "Settings cache miss, built descriptor");
        self.entries.insert(id, Arc::clone(&setting));
        if self.watermark.map_or(true, |max| id > max) {
            self.watermark = Some(id);
        }
        Some(setting)
    }

    /// Id registered for a storage key.
    pub fn get_id(&self, key: &str) -> Option<SettingId> {
        self.key_index.get(key)
    }

    /// Drop every cached descriptor that depends on the active camera.
    ///
    /// Call exactly when the active camera changes.
    pub fn flush(&mut self) {
        let Some(max) = self.watermark else {
            return;
        };

        let mut flushed = 0_usize;
        for raw in 0..=max.0 {
            let id = SettingId(raw);
            if self
                .entries
                .get(&id)
                .is_some_and(|setting| setting.flush_on_device_change())
            {
                self.entries.remove(&id);
                flushed += 1;
            }
        }

        // Trim trailing absences only.
        let mut watermark = Some(max);
        while let Some(id) = watermark {
            if self.entries.contains_key(&id) {
                break;
            }
            watermark = id.0.checked_sub(1).map(SettingId);
        }
        self.watermark = watermark;

        debug!(
            flushed,
            remaining = self.entries.len(),
            watermark = ?self.watermark,
            "Flushed device-dependent settings"
        );
    }

    /// Current value of `id`: the stored value if acceptable, else the default.
    pub fn value(&mut self, id: SettingId) -> Option<SettingValue> {
        let setting = self.get(id)?;
        Some(setting.current(self.store.as_ref()))
    }

    /// Persist a new value for `id`.
    pub fn set_value(&mut self, id: SettingId, value: SettingValue) -> Result<(), SettingsError> {
        let setting = self.get(id).ok_or(SettingsError::UnknownSetting(id))?;
        if !setting.accepts(&value) {
            return Err(SettingsError::Rejected {
                key: setting.key().to_owned(),
                value,
            });
        }
        self.store.write(setting.key(), value)?;
        Ok(())
    }

    /// Upper bound on the greatest cached id.
    pub const fn watermark(&self) -> Option<SettingId> {
        self.watermark
    }

    /// Whether a descriptor for `id` is cached.
    pub fn contains(&self, id: SettingId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of cached descriptors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
