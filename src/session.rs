//! Ties the active camera to the settings cache.

use std::sync::Arc;

use tracing::info;

use crate::characteristics::{CameraCharacteristics, CharacteristicsResolver};
use crate::error::AccessError;
use crate::settings::SettingsCache;
use crate::traits::{CameraHardware, Facing};

/// The active camera and the settings that depend on it.
pub struct CameraSession<H: CameraHardware> {
    resolver: CharacteristicsResolver<H>,
    settings: SettingsCache,
    active: Option<Facing>,
}

impl<H: CameraHardware> CameraSession<H> {
    /// Create a session with no active camera.
    pub fn new(resolver: CharacteristicsResolver<H>, settings: SettingsCache) -> Self {
        Self {
            resolver,
            settings,
            active: None,
        }
    }

    /// Make the camera facing `facing` active.
    ///
    /// On a change of facing the cache receives the new characteristics and
    /// drops its device-dependent settings. Re-selecting the active facing
    /// leaves the cache alone. On failure the previous camera stays active.
    pub fn switch_to(
        &mut self,
        facing: Facing,
    ) -> Result<Arc<CameraCharacteristics>, AccessError> {
        let characteristics = self.resolver.characteristics(facing)?;

        if self.active != Some(facing) {
            info!(from = ?self.active, to = %facing, "Active camera changed");
            self.settings.set_capabilities(Some(Arc::clone(&characteristics)));
            self.settings.flush();
            self.active = Some(facing);
        }
        Ok(characteristics)
    }

    /// Facing of the active camera.
    pub const fn active(&self) -> Option<Facing> {
        self.active
    }

    /// Resolver backing this session.
    pub const fn resolver(&self) -> &CharacteristicsResolver<H> {
        &self.resolver
    }

    /// Settings for the active camera.
    pub fn settings(&mut self) -> &mut SettingsCache {
        &mut self.settings
    }
}
