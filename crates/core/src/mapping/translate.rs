//! Pure translation between canonical slots and provider custom fields
//!
//! Both directions are functions of `(canonical or response, mapping slice)`
//! only. Mappings whose direction excludes the operation are skipped.

use tracing::debug;
use unibridge_domain::{CanonicalObject, CustomFieldValues, ExtraFields, FieldMapping};

/// Build the custom field side channel for `desunify`.
///
/// Each write-enabled mapping reads its slot from `field_mappings`, falling
/// back to the canonical attribute of the same name. Absent slots are
/// skipped. Values in `field_mappings` that no mapping covers are dropped.
pub fn to_remote(canonical: &CanonicalObject, mappings: &[FieldMapping]) -> CustomFieldValues {
    mappings
        .iter()
        .filter(|m| m.active && m.direction.applies_on_write())
        .filter_map(|m| {
            let value = canonical.slot_value(&m.standard_slot)?;
            Some((m.remote_field_id.clone(), value))
        })
        .collect()
}

/// Translate provider custom fields back to slot names for `unify`.
///
/// Values are coerced to the mapping's declared type; values that cannot be
/// coerced are kept as the provider sent them. Provider fields with no
/// matching mapping are dropped.
pub fn to_canonical(custom_fields: &CustomFieldValues, mappings: &[FieldMapping]) -> ExtraFields {
    mappings
        .iter()
        .filter(|m| m.active && m.direction.applies_on_read())
        .filter_map(|m| {
            let raw = custom_fields.get(&m.remote_field_id)?;
            let value = m.data_type.coerce(raw).unwrap_or_else(|| {
                debug!(
                    slot = %m.standard_slot,
                    data_type = %m.data_type,
                    "custom field value kept verbatim; coercion failed"
                );
                raw.clone()
            });
            Some((m.standard_slot.clone(), value))
        })
        .collect()
}
