use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::core::error::{Result, StoreError};
use crate::schema::field::{Conversion, FieldDescriptor, FieldType};
use crate::schema::relationship::Relationship;

/// Frozen per-type metadata: declared fields, the tracked set participating
/// in dirty detection, write-path conversions, relationship metadata, input
/// payload tags, and the fields used for the compact textual form.
///
/// Built once at schema-load time and shared immutably.
#[derive(Debug)]
pub struct EntitySchema {
    type_name: String,
    implements: Option<String>,
    fields: BTreeMap<String, FieldDescriptor>,
    tracked: BTreeSet<String>,
    conversions: BTreeMap<String, Conversion>,
    relationships: BTreeMap<String, Relationship>,
    create_input: Option<String>,
    update_input: Option<String>,
    short_repr_fields: Vec<String>,
}

impl EntitySchema {
    pub fn builder(type_name: &str) -> EntitySchemaBuilder {
        EntitySchemaBuilder {
            type_name: type_name.to_string(),
            implements: None,
            fields: BTreeMap::new(),
            tracked: BTreeSet::new(),
            conversions: BTreeMap::new(),
            relationships: BTreeMap::new(),
            create_input: None,
            update_input: None,
            short_repr_fields: Vec::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Interface this type is a concrete member of, if any.
    pub fn implements(&self) -> Option<&str> {
        self.implements.as_deref()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.values()
    }

    pub fn declares(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn require_field(&self, name: &str) -> Result<&FieldDescriptor> {
        self.fields.get(name).ok_or_else(|| StoreError::UnknownField {
            type_name: self.type_name.clone(),
            field: name.to_string(),
        })
    }

    pub fn is_tracked(&self, name: &str) -> bool {
        self.tracked.contains(name)
    }

    pub fn tracked(&self) -> impl Iterator<Item = &str> {
        self.tracked.iter().map(|s| s.as_str())
    }

    pub fn conversion(&self, name: &str) -> Option<&Conversion> {
        self.conversions.get(name)
    }

    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.get(name)
    }

    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.values()
    }

    /// Relationship whose `query_field` matches a payload key.
    pub fn relationship_by_query_field(&self, key: &str) -> Option<&Relationship> {
        self.relationships.values().find(|r| r.query_field == key)
    }

    pub fn create_input(&self) -> Option<&str> {
        self.create_input.as_deref()
    }

    pub fn update_input(&self) -> Option<&str> {
        self.update_input.as_deref()
    }

    pub fn short_repr_fields(&self) -> &[String] {
        &self.short_repr_fields
    }

    /// Names emitted for a new entity: every tracked or conversion-declared
    /// field plus every writable relationship.
    pub fn input_fields(&self) -> BTreeSet<&str> {
        let mut names: BTreeSet<&str> = self.tracked.iter().map(|s| s.as_str()).collect();
        names.extend(self.conversions.keys().map(|s| s.as_str()));
        names.extend(
            self.relationships
                .values()
                .filter(|r| r.target_field.is_some())
                .map(|r| r.field.as_str()),
        );
        names
    }
}

pub struct EntitySchemaBuilder {
    type_name: String,
    implements: Option<String>,
    fields: BTreeMap<String, FieldDescriptor>,
    tracked: BTreeSet<String>,
    conversions: BTreeMap<String, Conversion>,
    relationships: BTreeMap<String, Relationship>,
    create_input: Option<String>,
    update_input: Option<String>,
    short_repr_fields: Vec<String>,
}

impl EntitySchemaBuilder {
    pub fn implements(mut self, interface: &str) -> Self {
        self.implements = Some(interface.to_string());
        self
    }

    pub fn create_input(mut self, tag: &str) -> Self {
        self.create_input = Some(tag.to_string());
        self
    }

    pub fn update_input(mut self, tag: &str) -> Self {
        self.update_input = Some(tag.to_string());
        self
    }

    /// Declare a field that is displayed but not diffed.
    pub fn field(mut self, name: &str, field_type: FieldType) -> Self {
        self.fields
            .insert(name.to_string(), FieldDescriptor::new(name, field_type));
        self
    }

    /// Declare a tracked scalar field whose input key equals its name.
    pub fn tracked_field(self, name: &str, field_type: FieldType) -> Self {
        let key = name.to_string();
        self.tracked_field_as(name, &key, field_type)
    }

    /// Declare a tracked scalar field with an explicit input key.
    pub fn tracked_field_as(mut self, name: &str, input_key: &str, field_type: FieldType) -> Self {
        self.fields
            .insert(name.to_string(), FieldDescriptor::new(name, field_type));
        self.tracked.insert(name.to_string());
        self.conversions
            .insert(name.to_string(), Conversion::new(input_key));
        self
    }

    /// Declare a server-managed resolver field; never emitted on writes.
    pub fn read_only_field(mut self, name: &str, field_type: FieldType) -> Self {
        self.fields
            .insert(name.to_string(), FieldDescriptor::read_only(name, field_type));
        self
    }

    /// Declare a relationship. The field descriptor is derived from the
    /// metadata; writable relationships join the tracked set so they
    /// participate in dirty detection.
    pub fn relationship(mut self, rel: Relationship) -> Self {
        let field_type = match (rel.is_list, rel.wrapper.is_some()) {
            (false, false) => FieldType::Ref(rel.inverse_type.clone()),
            (true, false) => FieldType::RefList(rel.inverse_type.clone()),
            (false, true) => FieldType::Wrapper(rel.inverse_type.clone()),
            (true, true) => FieldType::WrapperList(rel.inverse_type.clone()),
        };
        let name = rel.field.clone();
        self.fields
            .insert(name.clone(), FieldDescriptor::new(&name, field_type));
        if rel.target_field.is_some() {
            self.tracked.insert(name.clone());
        }
        self.relationships.insert(name, rel);
        self
    }

    pub fn short_repr(mut self, fields: &[&str]) -> Self {
        self.short_repr_fields = fields.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn build(self) -> Result<Arc<EntitySchema>> {
        for name in &self.short_repr_fields {
            if !self.fields.contains_key(name) {
                return Err(StoreError::UnknownField {
                    type_name: self.type_name.clone(),
                    field: name.clone(),
                });
            }
        }
        for name in &self.tracked {
            if !self.fields.contains_key(name) {
                return Err(StoreError::UnknownField {
                    type_name: self.type_name.clone(),
                    field: name.clone(),
                });
            }
        }
        Ok(Arc::new(EntitySchema {
            type_name: self.type_name,
            implements: self.implements,
            fields: self.fields,
            tracked: self.tracked,
            conversions: self.conversions,
            relationships: self.relationships,
            create_input: self.create_input,
            update_input: self.update_input,
            short_repr_fields: self.short_repr_fields,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::relationship::Relationship;

    #[test]
    fn test_builder_tracks_writable_relationships() {
        let schema = EntitySchema::builder("Scene")
            .update_input("SceneUpdateInput")
            .tracked_field("title", FieldType::String)
            .relationship(Relationship::single("studio", "studio_id", "Studio"))
            .relationship(Relationship::read_only_list("files", "BaseFile"))
            .build()
            .unwrap();

        assert!(schema.is_tracked("title"));
        assert!(schema.is_tracked("studio"));
        assert!(!schema.is_tracked("files"));
        assert_eq!(
            schema.field("studio").unwrap().field_type,
            FieldType::Ref("Studio".into())
        );
    }

    #[test]
    fn test_builder_rejects_unknown_short_repr_field() {
        let result = EntitySchema::builder("Scene")
            .short_repr(&["missing"])
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_input_fields_union() {
        let schema = EntitySchema::builder("Scene")
            .tracked_field("title", FieldType::String)
            .read_only_field("play_count", FieldType::Int)
            .relationship(Relationship::list("tags", "tag_ids", "Tag"))
            .build()
            .unwrap();

        let names = schema.input_fields();
        assert!(names.contains("title"));
        assert!(names.contains("tags"));
        assert!(!names.contains("play_count"));
    }
}
