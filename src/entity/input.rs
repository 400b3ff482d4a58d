//! Mutation input building.
//!
//! A new entity emits every tracked or conversion-declared field that is
//! not `Unset`, under the create-input schema, without an id. An existing
//! entity emits the id plus only the tracked fields that differ from the
//! snapshot, under the update-input schema. `Unset` is never emitted;
//! explicit `Null` always is, when the field qualifies.

use serde_json::{json, Map, Value as JsonValue};

use crate::core::error::{Result, StoreError};
use crate::core::field::Maybe;
use crate::core::value::{Related, Value};
use crate::entity::dirty::encode_value;
use crate::entity::entity::Entity;
use crate::schema::relationship::Relationship;

/// Which mutation lifecycle an input payload targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Create,
    Update,
}

/// A built mutation input: the lifecycle, the input schema tag, and the
/// input object itself.
#[derive(Debug, Clone)]
pub struct EntityInput {
    pub kind: InputKind,
    pub input_type: String,
    pub input: JsonValue,
}

impl EntityInput {
    /// True when an update input carries nothing beyond the id.
    pub fn is_empty_update(&self) -> bool {
        self.kind == InputKind::Update
            && self
                .input
                .as_object()
                .map(|m| m.keys().all(|k| k == "id"))
                .unwrap_or(false)
    }
}

impl Entity {
    pub fn to_input(&self) -> Result<EntityInput> {
        if self.is_new() {
            self.to_create_input()
        } else {
            self.to_update_input()
        }
    }

    fn to_create_input(&self) -> Result<EntityInput> {
        let schema = self.schema().clone();
        let input_type = schema
            .create_input()
            .ok_or_else(|| StoreError::CreateUnsupported(schema.type_name().to_string()))?
            .to_string();

        let mut input = Map::new();
        for name in schema.input_fields() {
            let slot = self.get(name)?;
            if slot.is_unset() {
                continue;
            }
            if let Some((key, encoded)) = self.convert_field(name, &slot)? {
                input.insert(key, encoded);
            }
        }
        Ok(EntityInput {
            kind: InputKind::Create,
            input_type,
            input: JsonValue::Object(input),
        })
    }

    fn to_update_input(&self) -> Result<EntityInput> {
        let schema = self.schema().clone();
        let input_type = schema
            .update_input()
            .ok_or_else(|| StoreError::UpdateUnsupported(schema.type_name().to_string()))?
            .to_string();

        let mut input = Map::new();
        input.insert("id".to_string(), json!(self.id()));
        for (name, slot) in self.changed_fields() {
            if let Some((key, encoded)) = self.convert_field(&name, &slot)? {
                input.insert(key, encoded);
            }
        }
        Ok(EntityInput {
            kind: InputKind::Update,
            input_type,
            input: JsonValue::Object(input),
        })
    }

    /// Apply the declared conversion for one field. Returns the input key
    /// and wire value, or `None` when the field has no write path (read-only
    /// resolvers, relationships without a target field).
    fn convert_field(&self, name: &str, slot: &Maybe<Value>) -> Result<Option<(String, JsonValue)>> {
        let schema = self.schema();
        if let Some(descriptor) = schema.field(name) {
            if descriptor.read_only {
                return Ok(None);
            }
        }

        if let Some(rel) = schema.relationship(name) {
            let Some(target) = rel.target_field.as_deref() else {
                return Ok(None);
            };
            let encoded = match slot {
                Maybe::Unset => return Ok(None),
                Maybe::Null => JsonValue::Null,
                Maybe::Value(v) => convert_relationship_value(rel, v),
            };
            return Ok(Some((target.to_string(), encoded)));
        }

        if let Some(conversion) = schema.conversion(name) {
            let encoded = match slot {
                Maybe::Unset => return Ok(None),
                Maybe::Null => JsonValue::Null,
                Maybe::Value(v) => encode_value(v),
            };
            return Ok(Some((conversion.input_key.clone(), encoded)));
        }

        Ok(None)
    }
}

fn convert_relationship_value(rel: &Relationship, value: &Value) -> JsonValue {
    match value {
        Value::Ref(e) => json!(e.id()),
        Value::RefList(es) => JsonValue::Array(es.iter().map(|e| json!(e.id())).collect()),
        Value::Wrapper(r) => wrapper_input(rel, r),
        Value::WrapperList(rs) => {
            JsonValue::Array(rs.iter().map(|r| wrapper_input(rel, r)).collect())
        }
        other => encode_value(other),
    }
}

/// Wrapper input record: the referent id under the relationship's id key,
/// plus the wrapper's own metadata fields.
fn wrapper_input(rel: &Relationship, related: &Related) -> JsonValue {
    let id_key = rel
        .wrapper
        .as_ref()
        .map(|w| w.input_id_key.as_str())
        .unwrap_or("id");
    let mut record = Map::new();
    record.insert(id_key.to_string(), json!(related.entity.id()));
    for (key, value) in &related.metadata {
        record.insert(key.clone(), value.clone());
    }
    JsonValue::Object(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::catalog::{image_schema, scene_schema, studio_schema};

    #[test]
    fn test_new_entity_emits_all_set_fields_without_id() {
        let scene = Entity::new(
            scene_schema().unwrap(),
            vec![
                ("title", Maybe::Value("X".into())),
                ("rating100", Maybe::Null),
            ],
        )
        .unwrap();
        let built = scene.to_input().unwrap();
        assert_eq!(built.kind, InputKind::Create);
        assert_eq!(built.input_type, "SceneCreateInput");
        let obj = built.input.as_object().unwrap();
        assert_eq!(obj.get("title"), Some(&json!("X")));
        assert_eq!(obj.get("rating100"), Some(&JsonValue::Null));
        assert!(!obj.contains_key("id"));
        assert!(!obj.contains_key("details"), "Unset must be omitted");
    }

    #[test]
    fn test_existing_entity_emits_only_dirty_fields() {
        let scene = Entity::new(scene_schema().unwrap(), vec![]).unwrap();
        scene.set("title", Maybe::Value("Original".into())).unwrap();
        scene.set("rating100", Maybe::Value(70i64.into())).unwrap();
        scene.update_id("123").unwrap();
        scene.mark_clean();

        scene.set("title", Maybe::Value("Updated".into())).unwrap();
        let built = scene.to_input().unwrap();
        assert_eq!(built.kind, InputKind::Update);
        let obj = built.input.as_object().unwrap();
        assert_eq!(obj.get("id"), Some(&json!("123")));
        assert_eq!(obj.get("title"), Some(&json!("Updated")));
        assert!(!obj.contains_key("rating100"));
    }

    #[test]
    fn test_clean_existing_entity_emits_only_id() {
        let scene = Entity::new(scene_schema().unwrap(), vec![]).unwrap();
        scene.update_id("123").unwrap();
        scene.mark_clean();
        let built = scene.to_input().unwrap();
        assert!(built.is_empty_update());
    }

    #[test]
    fn test_relationship_emits_target_key_with_ids() {
        let scene = Entity::new(scene_schema().unwrap(), vec![]).unwrap();
        let studio = Entity::new(studio_schema().unwrap(), vec![]).unwrap();
        let sid = studio.id();
        scene.set("studio", Maybe::Value(Value::Ref(studio))).unwrap();
        let built = scene.to_input().unwrap();
        let obj = built.input.as_object().unwrap();
        assert_eq!(obj.get("studio_id"), Some(&json!(sid)));
        assert!(!obj.contains_key("studio"));
    }

    #[test]
    fn test_create_unsupported_type_refuses() {
        let image = Entity::new(image_schema().unwrap(), vec![]).unwrap();
        let err = image.to_input().unwrap_err();
        assert!(matches!(err, StoreError::CreateUnsupported(_)));
    }

    #[test]
    fn test_read_only_fields_never_emitted() {
        let scene = Entity::new(scene_schema().unwrap(), vec![]).unwrap();
        scene
            .set("play_count", Maybe::Value(9i64.into()))
            .unwrap();
        let built = scene.to_input().unwrap();
        assert!(!built.input.as_object().unwrap().contains_key("play_count"));
    }
}
