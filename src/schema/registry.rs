use std::collections::HashMap;
use std::sync::Arc;

use crate::core::error::{Result, StoreError};
use crate::schema::entity::EntitySchema;

/// Registry of entity schemas keyed by type name.
///
/// Copy-on-write: adding a schema produces a new registry and leaves the
/// old one untouched, so handed-out clones stay valid without locking.
#[derive(Clone, Default)]
pub struct SchemaRegistry {
    types: Arc<HashMap<String, Arc<EntitySchema>>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self {
            types: Arc::new(HashMap::new()),
        }
    }

    pub fn with_schema(self, schema: Arc<EntitySchema>) -> Result<Self> {
        let name = schema.type_name().to_string();
        if self.types.contains_key(&name) {
            return Err(StoreError::Configuration(format!(
                "type '{}' registered twice",
                name
            )));
        }
        let mut types = (*self.types).clone();
        types.insert(name, schema);
        Ok(Self {
            types: Arc::new(types),
        })
    }

    pub fn get(&self, type_name: &str) -> Result<Arc<EntitySchema>> {
        self.types
            .get(type_name)
            .cloned()
            .ok_or_else(|| StoreError::UnknownType(type_name.to_string()))
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    pub fn list_types(&self) -> Vec<&str> {
        self.types.keys().map(|s| s.as_str()).collect()
    }

    /// Whether a concrete schema satisfies a declared type: either the
    /// declared type itself, or a member of the declared interface.
    pub fn is_assignable(&self, declared: &str, concrete: &EntitySchema) -> bool {
        concrete.type_name() == declared || concrete.implements() == Some(declared)
    }

    /// Resolve the constructor type for a payload.
    ///
    /// A payload type tag selects the concrete schema; it must identify the
    /// declared type or one of its concrete members. Without a tag the
    /// declared type must itself be concrete (registered).
    pub fn resolve(&self, declared: &str, type_tag: Option<&str>) -> Result<Arc<EntitySchema>> {
        match type_tag {
            None => self.get(declared),
            Some(tag) => {
                let schema = self.types.get(tag).ok_or_else(|| StoreError::TypeMismatch {
                    expected: declared.to_string(),
                    actual: tag.to_string(),
                })?;
                if self.is_assignable(declared, schema) {
                    Ok(schema.clone())
                } else {
                    Err(StoreError::TypeMismatch {
                        expected: declared.to_string(),
                        actual: tag.to_string(),
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field::FieldType;

    fn registry() -> SchemaRegistry {
        let base = EntitySchema::builder("VideoFile")
            .implements("BaseFile")
            .field("path", FieldType::String)
            .build()
            .unwrap();
        let tag = EntitySchema::builder("Tag")
            .field("name", FieldType::String)
            .build()
            .unwrap();
        SchemaRegistry::new()
            .with_schema(base)
            .unwrap()
            .with_schema(tag)
            .unwrap()
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let reg = registry();
        let dup = EntitySchema::builder("Tag").build().unwrap();
        assert!(reg.with_schema(dup).is_err());
    }

    #[test]
    fn test_resolve_concrete_member_of_interface() {
        let reg = registry();
        let schema = reg.resolve("BaseFile", Some("VideoFile")).unwrap();
        assert_eq!(schema.type_name(), "VideoFile");
    }

    #[test]
    fn test_resolve_rejects_foreign_tag() {
        let reg = registry();
        let err = reg.resolve("BaseFile", Some("Tag")).unwrap_err();
        assert!(matches!(err, StoreError::TypeMismatch { .. }));
    }

    #[test]
    fn test_resolve_interface_without_tag_fails() {
        let reg = registry();
        assert!(reg.resolve("BaseFile", None).is_err());
    }
}
