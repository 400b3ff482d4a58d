//! In-memory relationship helpers and inverse synchronization.
//!
//! When a relationship field is assigned, the change is mirrored onto the
//! peer's inverse field iff that side is currently loaded. An `Unset`
//! inverse is left alone: syncing it would require a fetch, and setters
//! never perform I/O. All helpers operate purely in memory; persistence
//! happens on save.

use tracing::warn;

use crate::core::error::{Result, StoreError};
use crate::core::field::Maybe;
use crate::core::value::{Related, Value};
use crate::entity::entity::Entity;
use crate::schema::field::FieldType;

impl Entity {
    /// Mirror a relationship assignment onto peers' inverse fields. Runs
    /// after the owning field has been assigned; diffs old vs new referents
    /// so reassignment detaches the previous peer.
    pub(crate) fn sync_inverse(&self, field: &str, old: &Maybe<Value>, new: &Maybe<Value>) {
        let Some(rel) = self.schema().relationship(field) else {
            return;
        };
        let Some(inverse_field) = rel.inverse_query_field.clone() else {
            return;
        };

        let old_peers = old.value().map(Value::entities).unwrap_or_default();
        let new_peers = new.value().map(Value::entities).unwrap_or_default();

        for peer in &old_peers {
            if !new_peers.iter().any(|p| p.id() == peer.id()) {
                detach_inverse(self, peer, &inverse_field);
            }
        }
        for peer in &new_peers {
            if !old_peers.iter().any(|p| p.id() == peer.id()) {
                attach_inverse(self, peer, &inverse_field);
            }
        }
    }

    /// Append a peer to a list relationship. An `Unset` (or `Null`) field
    /// initializes to an empty list first; a peer already present by id is
    /// left alone.
    pub fn add_related(&self, field: &str, peer: &Entity) -> Result<()> {
        let (is_list, wrapped) = self.relationship_shape(field)?;
        if !is_list {
            return Err(self.relation_misuse(field, "add_related requires a list relationship"));
        }

        let updated = match self.get(field)? {
            Maybe::Unset | Maybe::Null => {
                if wrapped {
                    Value::WrapperList(vec![Related::new(peer.clone())])
                } else {
                    Value::RefList(vec![peer.clone()])
                }
            }
            Maybe::Value(Value::RefList(mut items)) => {
                if items.iter().any(|e| e.id() == peer.id()) {
                    return Ok(());
                }
                items.push(peer.clone());
                Value::RefList(items)
            }
            Maybe::Value(Value::WrapperList(mut items)) => {
                if items.iter().any(|r| r.entity.id() == peer.id()) {
                    return Ok(());
                }
                items.push(Related::new(peer.clone()));
                Value::WrapperList(items)
            }
            Maybe::Value(other) => {
                return Err(self.relation_misuse(
                    field,
                    &format!("expected a list value, found {}", other.type_name()),
                ))
            }
        };
        self.set(field, Maybe::Value(updated))
    }

    /// Remove a peer (by id) from a list relationship. No-op when the field
    /// is `Unset` or the peer is absent.
    pub fn remove_related(&self, field: &str, peer: &Entity) -> Result<()> {
        let (is_list, _) = self.relationship_shape(field)?;
        if !is_list {
            return Err(self.relation_misuse(field, "remove_related requires a list relationship"));
        }

        let updated = match self.get(field)? {
            Maybe::Value(Value::RefList(items)) => {
                if !items.iter().any(|e| e.id() == peer.id()) {
                    return Ok(());
                }
                Value::RefList(items.into_iter().filter(|e| e.id() != peer.id()).collect())
            }
            Maybe::Value(Value::WrapperList(items)) => {
                if !items.iter().any(|r| r.entity.id() == peer.id()) {
                    return Ok(());
                }
                Value::WrapperList(
                    items
                        .into_iter()
                        .filter(|r| r.entity.id() != peer.id())
                        .collect(),
                )
            }
            _ => return Ok(()),
        };
        self.set(field, Maybe::Value(updated))
    }

    /// Assign a single-valued relationship; `None` clears it to explicit
    /// null.
    pub fn set_related(&self, field: &str, peer: Option<&Entity>) -> Result<()> {
        let (is_list, wrapped) = self.relationship_shape(field)?;
        if is_list {
            return Err(self.relation_misuse(field, "set_related requires a single-valued relationship"));
        }
        let slot = match peer {
            None => Maybe::Null,
            Some(p) if wrapped => Maybe::Value(Value::Wrapper(Related::new(p.clone()))),
            Some(p) => Maybe::Value(Value::Ref(p.clone())),
        };
        self.set(field, slot)
    }

    fn relationship_shape(&self, field: &str) -> Result<(bool, bool)> {
        let rel = self
            .schema()
            .relationship(field)
            .ok_or_else(|| self.relation_misuse(field, "not a relationship field"))?;
        let wrapped = matches!(
            self.schema().require_field(field)?.field_type,
            FieldType::Wrapper(_) | FieldType::WrapperList(_)
        );
        Ok((rel.is_list, wrapped))
    }

    fn relation_misuse(&self, field: &str, message: &str) -> StoreError {
        StoreError::Validation {
            type_name: self.type_name().to_string(),
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

fn attach_inverse(owner: &Entity, peer: &Entity, inverse_field: &str) {
    let Ok(current) = peer.get(inverse_field) else {
        return;
    };
    if current.is_unset() {
        return;
    }
    let updated = match current {
        Maybe::Null | Maybe::Value(Value::Ref(_)) => Maybe::Value(Value::Ref(owner.clone())),
        Maybe::Value(Value::Wrapper(_)) => {
            Maybe::Value(Value::Wrapper(Related::new(owner.clone())))
        }
        Maybe::Value(Value::RefList(mut items)) => {
            if items.iter().any(|e| e.id() == owner.id()) {
                return;
            }
            items.push(owner.clone());
            Maybe::Value(Value::RefList(items))
        }
        Maybe::Value(Value::WrapperList(mut items)) => {
            if items.iter().any(|r| r.entity.id() == owner.id()) {
                return;
            }
            items.push(Related::new(owner.clone()));
            Maybe::Value(Value::WrapperList(items))
        }
        Maybe::Unset | Maybe::Value(_) => return,
    };
    if let Err(err) = peer.set_no_sync(inverse_field, updated) {
        warn!(
            peer = peer.type_name(),
            field = inverse_field,
            %err,
            "inverse sync skipped"
        );
    }
}

fn detach_inverse(owner: &Entity, peer: &Entity, inverse_field: &str) {
    let Ok(current) = peer.get(inverse_field) else {
        return;
    };
    let updated = match current {
        Maybe::Value(Value::Ref(e)) if e.id() == owner.id() => Maybe::Null,
        Maybe::Value(Value::Wrapper(r)) if r.entity.id() == owner.id() => Maybe::Null,
        Maybe::Value(Value::RefList(items)) => {
            if !items.iter().any(|e| e.id() == owner.id()) {
                return;
            }
            Maybe::Value(Value::RefList(
                items.into_iter().filter(|e| e.id() != owner.id()).collect(),
            ))
        }
        Maybe::Value(Value::WrapperList(items)) => {
            if !items.iter().any(|r| r.entity.id() == owner.id()) {
                return;
            }
            Maybe::Value(Value::WrapperList(
                items
                    .into_iter()
                    .filter(|r| r.entity.id() != owner.id())
                    .collect(),
            ))
        }
        _ => return,
    };
    if let Err(err) = peer.set_no_sync(inverse_field, updated) {
        warn!(
            peer = peer.type_name(),
            field = inverse_field,
            %err,
            "inverse sync skipped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::catalog::{gallery_schema, scene_schema, studio_schema};

    #[test]
    fn test_inverse_sync_requires_loaded_inverse() {
        let scene = Entity::new(scene_schema().unwrap(), vec![]).unwrap();
        let gallery = Entity::new(gallery_schema().unwrap(), vec![]).unwrap();

        // Inverse side unset: no sync.
        scene.add_related("galleries", &gallery).unwrap();
        assert!(gallery.get("scenes").unwrap().is_unset());

        // Load the inverse side, then sync happens.
        let scene2 = Entity::new(scene_schema().unwrap(), vec![]).unwrap();
        let gallery2 = Entity::new(gallery_schema().unwrap(), vec![]).unwrap();
        gallery2
            .set_no_sync("scenes", Maybe::Value(Value::RefList(vec![])))
            .unwrap();
        scene2.add_related("galleries", &gallery2).unwrap();
        let scenes = gallery2.get("scenes").unwrap();
        match scenes {
            Maybe::Value(Value::RefList(items)) => {
                assert_eq!(items.len(), 1);
                assert!(Entity::ptr_eq(&items[0], &scene2));
            }
            other => panic!("unexpected inverse value: {:?}", other),
        }
    }

    #[test]
    fn test_add_is_idempotent_by_id() {
        let scene = Entity::new(scene_schema().unwrap(), vec![]).unwrap();
        let gallery = Entity::new(gallery_schema().unwrap(), vec![]).unwrap();
        scene.add_related("galleries", &gallery).unwrap();
        scene.add_related("galleries", &gallery).unwrap();
        match scene.get("galleries").unwrap() {
            Maybe::Value(Value::RefList(items)) => assert_eq!(items.len(), 1),
            other => panic!("unexpected value: {:?}", other),
        }
    }

    #[test]
    fn test_remove_detaches_loaded_inverse() {
        let scene = Entity::new(scene_schema().unwrap(), vec![]).unwrap();
        let gallery = Entity::new(gallery_schema().unwrap(), vec![]).unwrap();
        gallery
            .set_no_sync("scenes", Maybe::Value(Value::RefList(vec![])))
            .unwrap();
        scene.add_related("galleries", &gallery).unwrap();
        scene.remove_related("galleries", &gallery).unwrap();

        match gallery.get("scenes").unwrap() {
            Maybe::Value(Value::RefList(items)) => assert!(items.is_empty()),
            other => panic!("unexpected value: {:?}", other),
        }
    }

    #[test]
    fn test_hierarchy_both_sides_maintained() {
        let parent = Entity::new(studio_schema().unwrap(), vec![]).unwrap();
        let child = Entity::new(studio_schema().unwrap(), vec![]).unwrap();
        parent
            .set_no_sync("child_studios", Maybe::Value(Value::RefList(vec![])))
            .unwrap();

        child.set_related("parent", Some(&parent)).unwrap();
        match parent.get("child_studios").unwrap() {
            Maybe::Value(Value::RefList(items)) => {
                assert_eq!(items.len(), 1);
                assert!(Entity::ptr_eq(&items[0], &child));
            }
            other => panic!("unexpected value: {:?}", other),
        }

        // Clearing the parent detaches the child from the loaded list.
        child.set_related("parent", None).unwrap();
        match parent.get("child_studios").unwrap() {
            Maybe::Value(Value::RefList(items)) => assert!(items.is_empty()),
            other => panic!("unexpected value: {:?}", other),
        }
    }

    #[test]
    fn test_single_valued_misuse_rejected() {
        let scene = Entity::new(scene_schema().unwrap(), vec![]).unwrap();
        let studio = Entity::new(studio_schema().unwrap(), vec![]).unwrap();
        assert!(scene.add_related("studio", &studio).is_err());
        assert!(scene.set_related("galleries", None).is_err());
    }
}
