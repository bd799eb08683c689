//! Extension point for settings the core table does not know.

use crate::settings::{FactoryContext, KeyIndex, Setting, SettingId};

/// Supplies settings beyond the built-in table.
///
/// Consulted once at cache construction for keys, and on every cache miss for
/// an id the core table does not know.
pub trait ExtraSettingsProvider {
    /// Register additional key to id mappings.
    fn extend_key_index(&self, index: &mut KeyIndex);

    /// Build the descriptor for `id`, or `None` if this provider does not know it.
    fn build_from_id(&self, id: SettingId, context: &FactoryContext<'_>) -> Option<Setting>;
}

/// Provider that adds nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExtraSettings;

impl ExtraSettingsProvider for NoExtraSettings {
    fn extend_key_index(&self, _index: &mut KeyIndex) {}

    fn build_from_id(&self, _id: SettingId, _context: &FactoryContext<'_>) -> Option<Setting> {
        None
    }
}
