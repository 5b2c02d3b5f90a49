//! Enabled extension filter.

use crate::model::descriptor::ExtensionDescriptor;
use crate::settings::SettingsSnapshot;

/// Catalog descriptors whose id is enabled in the current settings.
///
/// Pure: the output depends only on the two inputs, in catalog order.
pub fn enabled_extensions(
    catalog: &[ExtensionDescriptor],
    settings: &SettingsSnapshot,
) -> Vec<ExtensionDescriptor> {
    catalog
        .iter()
        .filter(|descriptor| settings.is_enabled(&descriptor.id))
        .cloned()
        .collect()
}
