//! Merge rules for pulled objects
//!
//! A pull overwrites canonical fields but keeps the local identity and any
//! locally-set `field_mappings` slots the latest pull did not carry.

use unibridge_domain::{CanonicalFields, CanonicalObject};
use uuid::Uuid;

/// Combine a freshly pulled object with the stored one, if any.
pub fn merge_pulled(existing: Option<CanonicalObject>, pulled: CanonicalObject) -> CanonicalObject {
    let Some(existing) = existing else {
        return pulled;
    };

    let CanonicalObject { id, fields, field_mappings, created_at, .. } = existing;
    let mut merged = pulled;
    merged.id = id;
    merged.created_at = created_at;

    if let (CanonicalFields::Comment(new), CanonicalFields::Comment(old)) =
        (&mut merged.fields, &fields)
    {
        if new.ticket_id.is_none() {
            new.ticket_id = old.ticket_id;
        }
    }

    for (slot, value) in field_mappings {
        merged.field_mappings.entry(slot).or_insert(value);
    }
    merged
}

/// Point a child object at its parent's canonical id.
pub fn link_parent(object: &mut CanonicalObject, parent_id: Uuid) {
    if let CanonicalFields::Comment(comment) = &mut object.fields {
        comment.ticket_id = Some(parent_id);
    }
}
