//! Snapshot-based change detection.
//!
//! A tracked field is dirty when its current snapshot-encoded value differs
//! from the stored snapshot entry. The comparison is strictly field by
//! field and the encoding reduces references to ids, so dirty detection
//! never walks into referents.

use std::collections::BTreeMap;

use serde_json::{json, Value as JsonValue};

use crate::core::field::Maybe;
use crate::core::value::{Related, Value};
use crate::entity::entity::Entity;
use crate::entity::state::Snapshot;

/// Reduced encoding of a field slot for snapshots.
pub(crate) fn encode_slot(slot: &Maybe<Value>) -> Snapshot {
    match slot {
        Maybe::Unset => Snapshot::Unset,
        Maybe::Null => Snapshot::Encoded(JsonValue::Null),
        Maybe::Value(v) => Snapshot::Encoded(encode_value(v)),
    }
}

/// Reduced encoding of a value: id for a reference, list of ids for a
/// collection, (id, metadata) for a wrapper, the scalar itself otherwise.
pub(crate) fn encode_value(value: &Value) -> JsonValue {
    match value {
        Value::Bool(b) => json!(b),
        Value::Int(i) => json!(i),
        Value::Float(f) => json!(f),
        Value::String(s) => json!(s),
        Value::StringList(items) => json!(items),
        Value::Timestamp(ts) => json!(ts.to_rfc3339()),
        Value::Date(d) => json!(d.to_string()),
        Value::Json(j) => j.clone(),
        Value::Ref(e) => json!(e.id()),
        Value::RefList(es) => JsonValue::Array(es.iter().map(|e| json!(e.id())).collect()),
        Value::Wrapper(r) => encode_wrapper(r),
        Value::WrapperList(rs) => JsonValue::Array(rs.iter().map(encode_wrapper).collect()),
    }
}

fn encode_wrapper(related: &Related) -> JsonValue {
    json!({
        "id": related.entity.id(),
        "metadata": related.metadata,
    })
}

impl Entity {
    /// True iff any tracked field's current encoded value differs from its
    /// snapshot. A tracked field with no snapshot entry counts as dirty.
    pub fn is_dirty(&self) -> bool {
        for (name, slot) in self.tracked_values() {
            let current = encode_slot(&slot);
            match self.snapshot_entry(&name) {
                Some(stored) if stored == current => {}
                _ => return true,
            }
        }
        false
    }

    /// Changed tracked fields and their current in-memory values.
    pub fn changed_fields(&self) -> BTreeMap<String, Maybe<Value>> {
        let mut changed = BTreeMap::new();
        for (name, slot) in self.tracked_values() {
            let current = encode_slot(&slot);
            match self.snapshot_entry(&name) {
                Some(stored) if stored == current => {}
                _ => {
                    changed.insert(name, slot);
                }
            }
        }
        changed
    }

    /// Snapshot every tracked field's current value. Idempotent.
    pub fn mark_clean(&self) {
        let entries = self
            .tracked_values()
            .into_iter()
            .map(|(name, slot)| {
                let encoded = encode_slot(&slot);
                (name, encoded)
            })
            .collect();
        self.store_snapshot_entries(entries);
    }

    /// Clear the snapshot so every tracked field reads as changed.
    pub fn mark_dirty(&self) {
        let mut data = self.write();
        data.state.snapshot.clear();
    }

    /// Refresh the snapshot only for the named fields (intersected with the
    /// tracked set). The store's merge path relies on this so that user
    /// edits to fields absent from the merge payload stay dirty.
    pub fn update_snapshot_for<'a, I: IntoIterator<Item = &'a str>>(&self, names: I) {
        let mut wanted: Vec<&str> = Vec::new();
        for name in names {
            if self.schema().is_tracked(name) {
                wanted.push(name);
            }
        }
        if wanted.is_empty() {
            return;
        }
        let entries = self
            .tracked_values()
            .into_iter()
            .filter(|(name, _)| wanted.contains(&name.as_str()))
            .map(|(name, slot)| {
                let encoded = encode_slot(&slot);
                (name, encoded)
            })
            .collect();
        self.store_snapshot_entries(entries);
    }
}
