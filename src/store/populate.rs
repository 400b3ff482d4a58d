//! Field-aware population.
//!
//! `populate` fetches exactly the requested field paths that an entity has
//! not yet received. Paths are dotted and arbitrarily deep
//! (`"files.path"`, `"studio.parent.parent.name"`); for collections every
//! element is checked. A call where everything is already present makes no
//! transport request.

use std::collections::HashSet;

use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};

use crate::core::error::{Result, StoreError};
use crate::core::field::Maybe;
use crate::entity::Entity;
use crate::ops;
use crate::store::store::EntityStore;

impl EntityStore {
    /// Fetch the missing segments of the requested paths and merge them
    /// into the cached instances. With `force` the requested roots are
    /// refetched even when present. Idempotent once everything requested
    /// has been received.
    pub async fn populate(&self, entity: &Entity, fields: &[&str], force: bool) -> Result<()> {
        let missing = missing_paths(entity, fields, force)?;
        if missing.is_empty() {
            debug!(
                type_name = entity.type_name(),
                id = %entity.id(),
                "populate: nothing missing"
            );
            return Ok(());
        }

        let type_name = entity.type_name().to_string();
        let id = entity.id();

        // The merge lands on whatever instance the identity map holds for
        // this id; register this one first if the id is not cached.
        if self.cached(&type_name, &id).is_none() {
            self.insert_cache(entity.clone());
        }

        debug!(%type_name, %id, paths = ?missing, "populating");
        let operation = ops::find_operation(&type_name);
        let result = self
            .transport()
            .execute(&operation, json!({ "id": id, "fields": missing }))
            .await?;

        match result.get(&operation) {
            None | Some(JsonValue::Null) => {
                warn!(%type_name, %id, "populate target no longer exists");
                Ok(())
            }
            Some(payload) => {
                self.ingest(&type_name, payload.clone())?;
                Ok(())
            }
        }
    }
}

/// Full dotted paths (relative to `entity`) that are not yet received by
/// the entity graph, preserving request order without duplicates.
pub(crate) fn missing_paths(entity: &Entity, fields: &[&str], force: bool) -> Result<Vec<String>> {
    let mut missing = Vec::new();
    let mut seen = HashSet::new();
    for path in fields {
        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(StoreError::Payload(format!("malformed field path '{}'", path)));
        }
        collect_missing(entity, &segments, path, force, &mut missing, &mut seen)?;
    }
    Ok(missing)
}

fn collect_missing(
    entity: &Entity,
    segments: &[&str],
    full_path: &str,
    force: bool,
    out: &mut Vec<String>,
    seen: &mut HashSet<String>,
) -> Result<()> {
    let root = segments[0];
    entity.schema().require_field(root)?;

    if force || !entity.has_received(root) {
        if seen.insert(full_path.to_string()) {
            out.push(full_path.to_string());
        }
        return Ok(());
    }
    if segments.len() == 1 {
        return Ok(());
    }

    // Root present: walk into the referent(s) to check deeper segments.
    if let Maybe::Value(value) = entity.get(root)? {
        for referent in value.entities() {
            collect_missing(&referent, &segments[1..], full_path, force, out, seen)?;
        }
    }
    Ok(())
}
