//! Per-field options registry.
//!
//! Maps `(entity name, field name)` to the [`AttachmentOptions`] declared for
//! that field. Populated once during application wiring, read-only from then
//! on.

use std::collections::HashMap;

use affix_core::AttachmentOptions;

#[derive(Debug, Default)]
pub struct FieldRegistry {
    fields: HashMap<&'static str, HashMap<&'static str, AttachmentOptions>>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        FieldRegistry::default()
    }

    /// Declare options for one attachment field. Re-registering the same
    /// field replaces the previous options.
    pub fn register(
        &mut self,
        entity: &'static str,
        field: &'static str,
        options: AttachmentOptions,
    ) -> &mut Self {
        self.fields.entry(entity).or_default().insert(field, options);
        self
    }

    /// Options for a field, falling back to defaults for fields that were
    /// never explicitly registered.
    pub fn options_for(&self, entity: &str, field: &str) -> AttachmentOptions {
        self.fields
            .get(entity)
            .and_then(|fields| fields.get(field))
            .cloned()
            .unwrap_or_default()
    }
}
