//! Application configuration loaded from TOML.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::error::ConfigError;
use crate::traits::Facing;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// File the setting values are persisted to.
    pub settings_path: PathBuf,
    /// Facing the session starts on.
    pub default_facing: Facing,
    /// Rules assigning a facing to specific devices.
    pub facing_overrides: Vec<FacingOverride>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings_path: PathBuf::from("camera-settings.toml"),
            default_facing: Facing::Back,
            facing_overrides: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, falling back to defaults if it is missing.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!(
                path = %path.display(),
                "Configuration file not found, using defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }
}

/// Assigns a facing to devices whose card name or bus matches.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FacingOverride {
    /// Card name to match, case-insensitive.
    pub card: Option<String>,
    /// Bus information to match exactly.
    pub bus_info: Option<String>,
    /// Facing to assign.
    pub facing: Facing,
}

impl FacingOverride {
    /// Whether this rule applies to a device. A rule with no criteria never applies.
    pub fn matches(&self, card: &str, bus_info: &str) -> bool {
        if self.card.is_none() && self.bus_info.is_none() {
            return false;
        }
        let card_ok = self
            .card
            .as_ref()
            .map_or(true, |wanted| wanted.eq_ignore_ascii_case(card));
        let bus_ok = self
            .bus_info
            .as_ref()
            .map_or(true, |wanted| wanted == bus_info);
        card_ok && bus_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let config = Config::load(&dir.path().join("absent.toml")).expect("load should succeed");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_overrides() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("camera.toml");
        std::fs::write(
            &path,
            r#"
default_facing = "front"

[[facing_overrides]]
card = "HD Pro Webcam C920"
facing = "front"

[[facing_overrides]]
bus_info = "platform:rp1-cfe"
facing = "back"
"#,
        )
        .expect("write should succeed");

        let config = Config::load(&path).expect("load should succeed");
        assert_eq!(config.default_facing, Facing::Front);
        assert_eq!(config.settings_path, PathBuf::from("camera-settings.toml"));
        assert_eq!(config.facing_overrides.len(), 2);
        assert!(config.facing_overrides[0].matches("hd pro webcam c920", "usb-0000:00:14.0-1"));
        assert!(config.facing_overrides[1].matches("imx708", "platform:rp1-cfe"));
        assert!(!config.facing_overrides[1].matches("imx708", "platform:other"));
    }

    #[test]
    fn test_empty_override_never_matches() {
        let rule = FacingOverride {
            card: None,
            bus_info: None,
            facing: Facing::Front,
        };
        assert!(!rule.matches("anything", "anywhere"));
    }

    #[test]
    fn test_invalid_facing_rejected() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("camera.toml");
        std::fs::write(&path, "default_facing = \"sideways\"\n").expect("write should succeed");

        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }
}
