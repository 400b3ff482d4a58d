use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value as JsonValue;

/// Snapshot entry for one tracked field, in the reduced encoding: an entity
/// reference snapshots as its id, a reference list as the list of ids, a
/// metadata wrapper as an (id, metadata) pair, a scalar as itself. The
/// encoding never recurses into referents, so cyclic relationship graphs
/// cannot send dirty detection into an infinite walk.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Snapshot {
    Unset,
    Encoded(JsonValue),
}

/// Internal per-instance bookkeeping.
///
/// Lives in its own slot next to the field map, not inside it, so ordinary
/// field assignment can never rebuild or lose it.
#[derive(Debug, Default)]
pub(crate) struct EntityState {
    /// Tracked field name -> server-confirmed value at last-clean time.
    pub snapshot: BTreeMap<String, Snapshot>,
    /// Fields that appeared in any server payload merged into this instance.
    pub received: BTreeSet<String>,
    /// Locally constructed, not yet saved.
    pub is_new: bool,
}
