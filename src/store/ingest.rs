//! Payload ingestion: the construction interception protocol.
//!
//! Every payload-to-entity construction funnels through the store so the
//! identity map can intercept it. Nested entity records are hoisted into
//! the cache and substituted by reference before the parent is validated;
//! a payload naming an already-cached id merges into the cached instance
//! instead of building a second one.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::core::error::{Result, StoreError};
use crate::core::field::Maybe;
use crate::core::scalars::{FuzzyDate, Timestamp};
use crate::core::value::{Related, Value};
use crate::entity::Entity;
use crate::schema::entity::EntitySchema;
use crate::schema::field::FieldType;
use crate::store::cache::CacheEntry;
use crate::store::store::{EntityStore, StoreInner};

/// Payload type tag key.
const TYPE_TAG: &str = "__typename";

impl EntityStore {
    /// Construct (or merge) an entity from a server payload.
    ///
    /// `declared_type` may be an interface; the payload's type tag then
    /// selects the concrete member. A tag that names neither the declared
    /// type nor a member of it fails with a type mismatch and nothing is
    /// cached for the offending record.
    pub fn ingest(&self, declared_type: &str, payload: JsonValue) -> Result<Entity> {
        let mut inner = self.lock();
        self.ingest_locked(&mut inner, declared_type, payload)
    }

    pub(crate) fn ingest_locked(
        &self,
        inner: &mut StoreInner,
        declared_type: &str,
        payload: JsonValue,
    ) -> Result<Entity> {
        let mut map = match payload {
            JsonValue::Object(map) => map,
            other => {
                return Err(StoreError::Payload(format!(
                    "expected an object payload for {}, got {}",
                    declared_type, other
                )))
            }
        };

        let tag = match map.remove(TYPE_TAG) {
            Some(JsonValue::String(tag)) => Some(tag),
            Some(other) => {
                return Err(StoreError::Payload(format!(
                    "non-string type tag: {}",
                    other
                )))
            }
            None => None,
        };
        let schema = self.registry().resolve(declared_type, tag.as_deref())?;

        match payload_id(&map) {
            Some(id) => self.ingest_identified(inner, schema, id, map),
            // No id: construct normally, still hoisting any nested records.
            None => {
                let (fields, received) = self.convert_fields(inner, &schema, map)?;
                Entity::from_parts(schema, None, fields, received)
            }
        }
    }

    fn ingest_identified(
        &self,
        inner: &mut StoreInner,
        schema: std::sync::Arc<EntitySchema>,
        id: String,
        map: Map<String, JsonValue>,
    ) -> Result<Entity> {
        let type_name = schema.type_name().to_string();
        let key = (type_name.clone(), id.clone());

        if let Some(entry) = inner.cache.get(&key) {
            if entry.is_expired() {
                debug!(%type_name, %id, "evicting expired entry before ingest");
                inner.cache.remove(&key);
            } else {
                let entity = entry.entity.clone();
                self.merge_into(inner, &entity, &schema, map)?;
                return Ok(entity);
            }
        }

        let (fields, received) = self.convert_fields(inner, &schema, map)?;

        // A cyclic payload (a nested record referring back to this id) may
        // have cached this entity during pre-processing; merge into it
        // instead of clobbering the identity.
        if let Some(entry) = inner.cache.get(&key) {
            if !entry.is_expired() {
                let entity = entry.entity.clone();
                for (field, slot) in fields {
                    entity.set(&field, slot)?;
                }
                entity.mark_received(received.iter().cloned());
                entity.update_snapshot_for(received.iter().map(|s| s.as_str()));
                return Ok(entity);
            }
        }

        let entity = Entity::from_parts(schema, Some(id), fields, received)?;
        let ttl = self.ttl_for(inner, &type_name);
        inner
            .cache
            .insert(key, CacheEntry::new(entity.clone(), ttl));
        Ok(entity)
    }

    /// Cache-hit merge: processed payload fields are assigned through the
    /// normal setters (validation and inverse sync included), the received
    /// set is unioned with the payload keys, and the snapshot is refreshed
    /// only for the fields the payload actually carried — a blanket
    /// mark-clean here would silently discard pending user edits.
    fn merge_into(
        &self,
        inner: &mut StoreInner,
        entity: &Entity,
        schema: &EntitySchema,
        map: Map<String, JsonValue>,
    ) -> Result<()> {
        let mut present: Vec<String> = Vec::new();
        for (key, raw) in map {
            let Some(field) = resolve_payload_key(schema, &key) else {
                continue;
            };
            let slot = self.convert_field(inner, schema, &field, raw)?;
            entity.set(&field, slot)?;
            present.push(field);
        }
        entity.mark_received(present.iter().cloned());
        entity.update_snapshot_for(present.iter().map(|s| s.as_str()));
        Ok(())
    }

    fn convert_fields(
        &self,
        inner: &mut StoreInner,
        schema: &EntitySchema,
        map: Map<String, JsonValue>,
    ) -> Result<(BTreeMap<String, Maybe<Value>>, BTreeSet<String>)> {
        let mut fields = BTreeMap::new();
        let mut received = BTreeSet::new();
        for (key, raw) in map {
            let Some(field) = resolve_payload_key(schema, &key) else {
                continue;
            };
            let slot = self.convert_field(inner, schema, &field, raw)?;
            received.insert(field.clone());
            fields.insert(field, slot);
        }
        Ok((fields, received))
    }

    /// Convert one raw payload value to a typed slot, recursively hoisting
    /// nested entity records through the interception protocol.
    fn convert_field(
        &self,
        inner: &mut StoreInner,
        schema: &EntitySchema,
        field: &str,
        raw: JsonValue,
    ) -> Result<Maybe<Value>> {
        if raw.is_null() {
            return Ok(Maybe::Null);
        }
        let descriptor = schema.require_field(field)?;
        let fail = |message: String| StoreError::Validation {
            type_name: schema.type_name().to_string(),
            field: field.to_string(),
            message,
        };

        let value = match &descriptor.field_type {
            FieldType::Bool => Value::Bool(
                raw.as_bool()
                    .ok_or_else(|| fail(format!("expected a boolean, got {}", raw)))?,
            ),
            FieldType::Int => Value::Int(
                raw.as_i64()
                    .ok_or_else(|| fail(format!("expected an integer, got {}", raw)))?,
            ),
            FieldType::Float => Value::Float(
                raw.as_f64()
                    .ok_or_else(|| fail(format!("expected a number, got {}", raw)))?,
            ),
            FieldType::String => Value::String(
                raw.as_str()
                    .ok_or_else(|| fail(format!("expected a string, got {}", raw)))?
                    .to_string(),
            ),
            FieldType::StringList => {
                let items = raw
                    .as_array()
                    .ok_or_else(|| fail(format!("expected a string list, got {}", raw)))?;
                let mut list = Vec::with_capacity(items.len());
                for item in items {
                    list.push(
                        item.as_str()
                            .ok_or_else(|| fail(format!("non-string list item: {}", item)))?
                            .to_string(),
                    );
                }
                Value::StringList(list)
            }
            FieldType::Timestamp => {
                let text = raw
                    .as_str()
                    .ok_or_else(|| fail(format!("expected a timestamp string, got {}", raw)))?;
                Value::Timestamp(Timestamp::parse(text)?)
            }
            FieldType::Date => {
                let text = raw
                    .as_str()
                    .ok_or_else(|| fail(format!("expected a date string, got {}", raw)))?;
                Value::Date(FuzzyDate::parse(text)?)
            }
            FieldType::Json => Value::Json(raw),
            FieldType::Ref(target) => Value::Ref(self.ingest_locked(inner, target, raw)?),
            FieldType::RefList(target) => {
                let items = raw
                    .as_array()
                    .ok_or_else(|| fail(format!("expected a list of records, got {}", raw)))?;
                let mut list = Vec::with_capacity(items.len());
                for item in items {
                    list.push(self.ingest_locked(inner, target, item.clone())?);
                }
                Value::RefList(list)
            }
            FieldType::Wrapper(target) => {
                Value::Wrapper(self.convert_wrapper(inner, schema, field, target, raw)?)
            }
            FieldType::WrapperList(target) => {
                let items = raw
                    .as_array()
                    .ok_or_else(|| fail(format!("expected a list of wrappers, got {}", raw)))?;
                let mut list = Vec::with_capacity(items.len());
                for item in items {
                    list.push(self.convert_wrapper(inner, schema, field, target, item.clone())?);
                }
                Value::WrapperList(list)
            }
        };
        Ok(Maybe::Value(value))
    }

    /// Wrapper record: the referent sits under the relationship's entity
    /// key; every other key is wrapper metadata.
    fn convert_wrapper(
        &self,
        inner: &mut StoreInner,
        schema: &EntitySchema,
        field: &str,
        target: &str,
        raw: JsonValue,
    ) -> Result<Related> {
        let entity_key = schema
            .relationship(field)
            .and_then(|rel| rel.wrapper.as_ref())
            .map(|w| w.entity_key.clone())
            .ok_or_else(|| StoreError::Validation {
                type_name: schema.type_name().to_string(),
                field: field.to_string(),
                message: "wrapper field lacks wrapper metadata".to_string(),
            })?;

        let JsonValue::Object(mut map) = raw else {
            return Err(StoreError::Validation {
                type_name: schema.type_name().to_string(),
                field: field.to_string(),
                message: "expected a wrapper record, got a non-object".to_string(),
            });
        };

        let referent_raw = map.remove(&entity_key).ok_or_else(|| StoreError::Validation {
            type_name: schema.type_name().to_string(),
            field: field.to_string(),
            message: format!("wrapper record missing '{}'", entity_key),
        })?;
        let entity = self.ingest_locked(inner, target, referent_raw)?;
        let metadata: BTreeMap<String, JsonValue> = map.into_iter().collect();
        Ok(Related::with_metadata(entity, metadata))
    }
}

/// Map a payload key to the declared field it feeds: either the field name
/// itself, or a relationship's `query_field` when read payloads use a
/// different key than the local field. Unknown keys are skipped.
fn resolve_payload_key(schema: &EntitySchema, key: &str) -> Option<String> {
    if key == "id" {
        return None;
    }
    if schema.declares(key) {
        return Some(key.to_string());
    }
    schema
        .relationship_by_query_field(key)
        .map(|rel| rel.field.clone())
}

fn payload_id(map: &Map<String, JsonValue>) -> Option<String> {
    match map.get("id") {
        Some(JsonValue::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(JsonValue::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}
