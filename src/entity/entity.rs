use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::error::{Result, StoreError};
use crate::core::field::Maybe;
use crate::core::value::Value;
use crate::entity::state::{EntityState, Snapshot};
use crate::schema::entity::EntitySchema;
use crate::schema::field::FieldType;

/// Shared handle to one entity.
///
/// Cloning the handle clones the `Arc`, not the entity: every clone refers
/// to the same instance, which is what the identity map hands out. Equality
/// compares `(type_name, id)`; use [`Entity::ptr_eq`] for instance identity.
#[derive(Clone)]
pub struct Entity {
    shared: Arc<EntityShared>,
}

struct EntityShared {
    schema: Arc<EntitySchema>,
    data: RwLock<EntityData>,
}

pub(crate) struct EntityData {
    pub id: String,
    pub fields: BTreeMap<String, Maybe<Value>>,
    pub state: EntityState,
}

/// Legacy marker some older payload producers used for unsaved entities.
pub(crate) const LEGACY_NEW_ID: &str = "new";

/// 32-hex token minted for locally constructed entities.
pub(crate) fn mint_local_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

pub(crate) fn is_local_id(id: &str) -> bool {
    id == LEGACY_NEW_ID || (id.len() == 32 && id.bytes().all(|b| b.is_ascii_hexdigit()))
}

impl Entity {
    /// Direct (user-facing) construction.
    ///
    /// Without an id a fresh 32-hex token is minted and the entity is new.
    /// Field values are validated against the declared types; the snapshot
    /// is initialized after validation so a freshly built entity is clean.
    pub fn new(schema: Arc<EntitySchema>, fields: Vec<(&str, Maybe<Value>)>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for (name, value) in fields {
            map.insert(name.to_string(), value);
        }
        Self::from_parts(schema, None, map, BTreeSet::new())
    }

    /// Construction with every knob exposed; the store's ingestion path and
    /// `new` both funnel through here.
    pub(crate) fn from_parts(
        schema: Arc<EntitySchema>,
        id: Option<String>,
        fields: BTreeMap<String, Maybe<Value>>,
        received: BTreeSet<String>,
    ) -> Result<Self> {
        let (id, is_new) = match id {
            Some(id) if !id.is_empty() && id != LEGACY_NEW_ID => (id, false),
            _ => (mint_local_id(), true),
        };

        let mut all_fields: BTreeMap<String, Maybe<Value>> = schema
            .fields()
            .map(|f| (f.name.clone(), Maybe::Unset))
            .collect();
        for (name, value) in fields {
            let descriptor = schema.require_field(&name)?;
            if let Maybe::Value(v) = &value {
                validate_value(&schema, &descriptor.field_type, &name, v)?;
            }
            all_fields.insert(name, value);
        }

        let entity = Self {
            shared: Arc::new(EntityShared {
                schema,
                data: RwLock::new(EntityData {
                    id,
                    fields: all_fields,
                    state: EntityState {
                        snapshot: BTreeMap::new(),
                        received,
                        is_new,
                    },
                }),
            }),
        };
        entity.mark_clean();
        Ok(entity)
    }

    pub fn schema(&self) -> &Arc<EntitySchema> {
        &self.shared.schema
    }

    pub fn type_name(&self) -> &str {
        self.shared.schema.type_name()
    }

    pub fn id(&self) -> String {
        self.read().id.clone()
    }

    /// True iff the id is a locally minted token (or the legacy `"new"`
    /// marker) and the instance has not been saved.
    pub fn is_new(&self) -> bool {
        let data = self.read();
        data.state.is_new && is_local_id(&data.id)
    }

    /// Replace the locally minted id with the server-assigned one. Happens
    /// exactly once, on the first successful save.
    pub fn update_id(&self, server_id: &str) -> Result<()> {
        let mut data = self.write();
        if !data.state.is_new {
            return Err(StoreError::IdAlreadyAssigned {
                type_name: self.type_name().to_string(),
                id: data.id.clone(),
            });
        }
        data.id = server_id.to_string();
        data.state.is_new = false;
        Ok(())
    }

    /// Current value of a declared field, possibly `Unset`.
    pub fn get(&self, field: &str) -> Result<Maybe<Value>> {
        self.shared.schema.require_field(field)?;
        Ok(self.read().fields.get(field).cloned().unwrap_or_default())
    }

    /// Validated assignment. Relationship fields mirror the change onto the
    /// peer's inverse field when that side is loaded; see the relationship
    /// helpers for the sync rules.
    pub fn set(&self, field: &str, value: Maybe<Value>) -> Result<()> {
        let old = self.assign(field, value.clone())?;
        if self.shared.schema.relationship(field).is_some() {
            self.sync_inverse(field, &old, &value);
        }
        Ok(())
    }

    /// Assignment without inverse sync; used for mirror writes and merges
    /// of the inverse side itself.
    pub(crate) fn set_no_sync(&self, field: &str, value: Maybe<Value>) -> Result<()> {
        self.assign(field, value)?;
        Ok(())
    }

    fn assign(&self, field: &str, value: Maybe<Value>) -> Result<Maybe<Value>> {
        let descriptor = self.shared.schema.require_field(field)?;
        if let Maybe::Value(v) = &value {
            validate_value(&self.shared.schema, &descriptor.field_type, field, v)?;
        }
        let mut data = self.write();
        let old = data
            .fields
            .insert(field.to_string(), value)
            .unwrap_or_default();
        Ok(old)
    }

    pub fn received_fields(&self) -> BTreeSet<String> {
        self.read().state.received.clone()
    }

    pub fn has_received(&self, field: &str) -> bool {
        self.read().state.received.contains(field)
    }

    pub(crate) fn mark_received<I: IntoIterator<Item = String>>(&self, names: I) {
        let mut data = self.write();
        data.state.received.extend(names);
    }

    /// Compact one-line form: the declared short-repr fields that hold a
    /// value, or `TypeName(id=...)` when none do.
    pub fn short_repr(&self) -> String {
        let data = self.read();
        let mut parts = Vec::new();
        for name in self.shared.schema.short_repr_fields() {
            if let Some(Maybe::Value(v)) = data.fields.get(name) {
                parts.push(format!("{}={}", name, v));
            }
        }
        if parts.is_empty() {
            format!("{}(id={})", self.type_name(), data.id)
        } else {
            format!("{}({})", self.type_name(), parts.join(", "))
        }
    }

    /// Instance identity: true iff both handles refer to the same object.
    pub fn ptr_eq(a: &Entity, b: &Entity) -> bool {
        Arc::ptr_eq(&a.shared, &b.shared)
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, EntityData> {
        self.shared.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, EntityData> {
        self.shared
            .data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Clone of the tracked fields' current values; callers encode or diff
    /// outside the lock.
    pub(crate) fn tracked_values(&self) -> Vec<(String, Maybe<Value>)> {
        let data = self.read();
        self.shared
            .schema
            .tracked()
            .map(|name| {
                (
                    name.to_string(),
                    data.fields.get(name).cloned().unwrap_or_default(),
                )
            })
            .collect()
    }

    pub(crate) fn snapshot_entry(&self, field: &str) -> Option<Snapshot> {
        self.read().state.snapshot.get(field).cloned()
    }

    pub(crate) fn store_snapshot_entries(&self, entries: Vec<(String, Snapshot)>) {
        let mut data = self.write();
        for (name, snapshot) in entries {
            data.state.snapshot.insert(name, snapshot);
        }
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.type_name() == other.type_name() && self.id() == other.id()
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_repr())
    }
}

impl fmt::Display for Entity {
    /// Full textual form: id plus every set field, in declaration order
    /// (alphabetical, deterministic). Relationship values render through
    /// the short repr with list truncation, so bidirectional fan-out stays
    /// bounded.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.read();
        write!(f, "{}(id={}", self.type_name(), data.id)?;
        for (name, value) in &data.fields {
            match value {
                Maybe::Unset => continue,
                Maybe::Null => write!(f, ", {}=null", name)?,
                Maybe::Value(v) => write!(f, ", {}={}", name, v)?,
            }
        }
        write!(f, ")")
    }
}

fn validate_value(
    schema: &EntitySchema,
    field_type: &FieldType,
    field: &str,
    value: &Value,
) -> Result<()> {
    let fail = |message: String| StoreError::Validation {
        type_name: schema.type_name().to_string(),
        field: field.to_string(),
        message,
    };

    match field_type {
        FieldType::Ref(target) => match value {
            Value::Ref(e) => check_referent(schema, field, target, e),
            other => Err(fail(format!(
                "expected a {} reference, got {}",
                target,
                other.type_name()
            ))),
        },
        FieldType::RefList(target) => match value {
            Value::RefList(es) => {
                for e in es {
                    check_referent(schema, field, target, e)?;
                }
                Ok(())
            }
            other => Err(fail(format!(
                "expected a list of {} references, got {}",
                target,
                other.type_name()
            ))),
        },
        FieldType::Wrapper(target) => match value {
            Value::Wrapper(r) => check_referent(schema, field, target, &r.entity),
            other => Err(fail(format!(
                "expected a {} wrapper, got {}",
                target,
                other.type_name()
            ))),
        },
        FieldType::WrapperList(target) => match value {
            Value::WrapperList(rs) => {
                for r in rs {
                    check_referent(schema, field, target, &r.entity)?;
                }
                Ok(())
            }
            other => Err(fail(format!(
                "expected a list of {} wrappers, got {}",
                target,
                other.type_name()
            ))),
        },
        scalar => {
            if scalar.accepts_scalar(value) {
                Ok(())
            } else {
                Err(fail(format!(
                    "expected {:?}, got {}",
                    scalar,
                    value.type_name()
                )))
            }
        }
    }
}

fn check_referent(schema: &EntitySchema, field: &str, target: &str, entity: &Entity) -> Result<()> {
    let concrete = entity.schema();
    if concrete.type_name() == target || concrete.implements() == Some(target) {
        Ok(())
    } else {
        Err(StoreError::Validation {
            type_name: schema.type_name().to_string(),
            field: field.to_string(),
            message: format!(
                "expected a {} reference, got {}",
                target,
                concrete.type_name()
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::catalog::{scene_schema, studio_schema};

    #[test]
    fn test_new_entity_mints_32_hex_id() {
        let scene = Entity::new(scene_schema().unwrap(), vec![]).unwrap();
        let id = scene.id();
        assert_eq!(id.len(), 32);
        assert!(id.bytes().all(|b| b.is_ascii_hexdigit()));
        assert!(scene.is_new());
    }

    #[test]
    fn test_update_id_happens_exactly_once() {
        let scene = Entity::new(scene_schema().unwrap(), vec![]).unwrap();
        scene.update_id("456").unwrap();
        assert_eq!(scene.id(), "456");
        assert!(!scene.is_new());
        assert!(scene.update_id("789").is_err());
    }

    #[test]
    fn test_set_validates_declared_type() {
        let scene = Entity::new(scene_schema().unwrap(), vec![]).unwrap();
        assert!(scene.set("title", Maybe::Value("X".into())).is_ok());
        assert!(scene.set("rating100", Maybe::Value(Value::Bool(true))).is_err());
        assert!(scene.set("nonexistent", Maybe::Value(1i64.into())).is_err());
    }

    #[test]
    fn test_set_rejects_wrong_referent_type() {
        let scene = Entity::new(scene_schema().unwrap(), vec![]).unwrap();
        let other_scene = Entity::new(scene_schema().unwrap(), vec![]).unwrap();
        let err = scene
            .set("studio", Maybe::Value(Value::Ref(other_scene)))
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation { .. }));
    }

    #[test]
    fn test_short_repr_falls_back_to_id() {
        let studio = Entity::new(studio_schema().unwrap(), vec![]).unwrap();
        assert!(studio.short_repr().starts_with("Studio(id="));

        studio.set("name", Maybe::Value("Acme".into())).unwrap();
        assert_eq!(studio.short_repr(), "Studio(name='Acme')");
    }

    #[test]
    fn test_unset_fields_do_not_render() {
        let studio = Entity::new(studio_schema().unwrap(), vec![]).unwrap();
        studio.set("name", Maybe::Value("Acme".into())).unwrap();
        studio.set("details", Maybe::Null).unwrap();
        let repr = studio.to_string();
        assert!(repr.contains("name='Acme'"));
        assert!(repr.contains("details=null"));
        assert!(!repr.contains("rating100"));
    }
}
