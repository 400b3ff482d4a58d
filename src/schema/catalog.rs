//! Built-in schemas for the remote media catalog.
//!
//! One `EntitySchema` per remote type, wired with the relationship metadata
//! the runtime needs for hoisting, dirty tracking, and inverse sync. The
//! file types are concrete members of the `BaseFile` interface; the
//! interface itself is not registered, so payloads for it must carry a
//! type tag.

use std::sync::Arc;

use crate::core::error::Result;
use crate::schema::entity::EntitySchema;
use crate::schema::field::FieldType;
use crate::schema::registry::SchemaRegistry;
use crate::schema::relationship::{QueryStrategy, Relationship, WrapperSpec};

/// Registry with every built-in media-catalog schema.
pub fn default_registry() -> Result<SchemaRegistry> {
    let mut registry = SchemaRegistry::new();
    for schema in [
        scene_schema()?,
        performer_schema()?,
        studio_schema()?,
        tag_schema()?,
        gallery_schema()?,
        image_schema()?,
        group_schema()?,
        scene_marker_schema()?,
        video_file_schema()?,
        image_file_schema()?,
    ] {
        registry = registry.with_schema(schema)?;
    }
    Ok(registry)
}

pub fn scene_schema() -> Result<Arc<EntitySchema>> {
    EntitySchema::builder("Scene")
        .create_input("SceneCreateInput")
        .update_input("SceneUpdateInput")
        .tracked_field("title", FieldType::String)
        .tracked_field("code", FieldType::String)
        .tracked_field("details", FieldType::String)
        .tracked_field("director", FieldType::String)
        .tracked_field("urls", FieldType::StringList)
        .tracked_field("date", FieldType::Date)
        .tracked_field("rating100", FieldType::Int)
        .tracked_field("organized", FieldType::Bool)
        .read_only_field("created_at", FieldType::Timestamp)
        .read_only_field("updated_at", FieldType::Timestamp)
        .read_only_field("play_count", FieldType::Int)
        .relationship(Relationship::single("studio", "studio_id", "Studio"))
        .relationship(Relationship::list("performers", "performer_ids", "Performer"))
        .relationship(Relationship::list("tags", "tag_ids", "Tag"))
        .relationship(
            Relationship::list("galleries", "gallery_ids", "Gallery")
                .strategy(QueryStrategy::DirectField)
                .inverse_field("scenes"),
        )
        .relationship(Relationship::wrapped_list(
            "groups",
            "groups",
            "Group",
            WrapperSpec::new("group", "group_id"),
        ))
        .relationship(
            Relationship::read_only_list("markers", "SceneMarker").inverse_field("scene"),
        )
        .relationship(Relationship::read_only_list("files", "BaseFile"))
        .short_repr(&["title"])
        .build()
}

pub fn performer_schema() -> Result<Arc<EntitySchema>> {
    EntitySchema::builder("Performer")
        .create_input("PerformerCreateInput")
        .update_input("PerformerUpdateInput")
        .tracked_field("name", FieldType::String)
        .tracked_field("disambiguation", FieldType::String)
        .tracked_field("details", FieldType::String)
        .tracked_field("birthdate", FieldType::Date)
        .tracked_field("urls", FieldType::StringList)
        .tracked_field("rating100", FieldType::Int)
        .tracked_field("favorite", FieldType::Bool)
        .tracked_field("alias_list", FieldType::StringList)
        .read_only_field("created_at", FieldType::Timestamp)
        .read_only_field("updated_at", FieldType::Timestamp)
        .read_only_field("scene_count", FieldType::Int)
        .relationship(Relationship::list("tags", "tag_ids", "Tag"))
        .short_repr(&["name", "disambiguation"])
        .build()
}

pub fn studio_schema() -> Result<Arc<EntitySchema>> {
    EntitySchema::builder("Studio")
        .create_input("StudioCreateInput")
        .update_input("StudioUpdateInput")
        .tracked_field("name", FieldType::String)
        .tracked_field("details", FieldType::String)
        .tracked_field("url", FieldType::String)
        .tracked_field("rating100", FieldType::Int)
        .tracked_field("favorite", FieldType::Bool)
        .read_only_field("created_at", FieldType::Timestamp)
        .read_only_field("updated_at", FieldType::Timestamp)
        .read_only_field("scene_count", FieldType::Int)
        .relationship(
            Relationship::single("parent", "parent_id", "Studio")
                .query_field("parent_studio")
                .strategy(QueryStrategy::DirectField)
                .inverse_field("child_studios"),
        )
        .relationship(
            Relationship::read_only_list("child_studios", "Studio").inverse_field("parent"),
        )
        .relationship(Relationship::list("tags", "tag_ids", "Tag"))
        .short_repr(&["name"])
        .build()
}

pub fn tag_schema() -> Result<Arc<EntitySchema>> {
    EntitySchema::builder("Tag")
        .create_input("TagCreateInput")
        .update_input("TagUpdateInput")
        .tracked_field("name", FieldType::String)
        .tracked_field("description", FieldType::String)
        .tracked_field("aliases", FieldType::StringList)
        .tracked_field("favorite", FieldType::Bool)
        .read_only_field("created_at", FieldType::Timestamp)
        .read_only_field("updated_at", FieldType::Timestamp)
        .read_only_field("scene_count", FieldType::Int)
        .relationship(
            Relationship::list("parents", "parent_ids", "Tag")
                .strategy(QueryStrategy::DirectField)
                .inverse_field("children"),
        )
        .relationship(
            Relationship::list("children", "child_ids", "Tag")
                .strategy(QueryStrategy::DirectField)
                .inverse_field("parents"),
        )
        .short_repr(&["name"])
        .build()
}

pub fn gallery_schema() -> Result<Arc<EntitySchema>> {
    EntitySchema::builder("Gallery")
        .create_input("GalleryCreateInput")
        .update_input("GalleryUpdateInput")
        .tracked_field("title", FieldType::String)
        .tracked_field("code", FieldType::String)
        .tracked_field("details", FieldType::String)
        .tracked_field("photographer", FieldType::String)
        .tracked_field("urls", FieldType::StringList)
        .tracked_field("date", FieldType::Date)
        .tracked_field("rating100", FieldType::Int)
        .tracked_field("organized", FieldType::Bool)
        .read_only_field("created_at", FieldType::Timestamp)
        .read_only_field("updated_at", FieldType::Timestamp)
        .read_only_field("image_count", FieldType::Int)
        .relationship(Relationship::single("studio", "studio_id", "Studio"))
        .relationship(Relationship::list("performers", "performer_ids", "Performer"))
        .relationship(Relationship::list("tags", "tag_ids", "Tag"))
        .relationship(
            Relationship::list("scenes", "scene_ids", "Scene")
                .strategy(QueryStrategy::DirectField)
                .inverse_field("galleries"),
        )
        .short_repr(&["title"])
        .build()
}

pub fn image_schema() -> Result<Arc<EntitySchema>> {
    // Images are ingested by the server; the remote exposes no create
    // mutation for them.
    EntitySchema::builder("Image")
        .update_input("ImageUpdateInput")
        .tracked_field("title", FieldType::String)
        .tracked_field("code", FieldType::String)
        .tracked_field("details", FieldType::String)
        .tracked_field("urls", FieldType::StringList)
        .tracked_field("date", FieldType::Date)
        .tracked_field("rating100", FieldType::Int)
        .tracked_field("organized", FieldType::Bool)
        .read_only_field("created_at", FieldType::Timestamp)
        .read_only_field("updated_at", FieldType::Timestamp)
        .relationship(Relationship::single("studio", "studio_id", "Studio"))
        .relationship(Relationship::list("performers", "performer_ids", "Performer"))
        .relationship(Relationship::list("tags", "tag_ids", "Tag"))
        .relationship(Relationship::list("galleries", "gallery_ids", "Gallery"))
        .relationship(
            Relationship::read_only_list("visual_files", "BaseFile"),
        )
        .short_repr(&["title"])
        .build()
}

pub fn group_schema() -> Result<Arc<EntitySchema>> {
    EntitySchema::builder("Group")
        .create_input("GroupCreateInput")
        .update_input("GroupUpdateInput")
        .tracked_field("name", FieldType::String)
        .tracked_field("aliases", FieldType::String)
        .tracked_field("duration", FieldType::Int)
        .tracked_field("date", FieldType::Date)
        .tracked_field("director", FieldType::String)
        .tracked_field("synopsis", FieldType::String)
        .tracked_field("rating100", FieldType::Int)
        .read_only_field("created_at", FieldType::Timestamp)
        .read_only_field("updated_at", FieldType::Timestamp)
        .read_only_field("scene_count", FieldType::Int)
        .relationship(Relationship::single("studio", "studio_id", "Studio"))
        .relationship(Relationship::list("tags", "tag_ids", "Tag"))
        .short_repr(&["name"])
        .build()
}

pub fn scene_marker_schema() -> Result<Arc<EntitySchema>> {
    EntitySchema::builder("SceneMarker")
        .create_input("SceneMarkerCreateInput")
        .update_input("SceneMarkerUpdateInput")
        .tracked_field("title", FieldType::String)
        .tracked_field("seconds", FieldType::Float)
        .read_only_field("created_at", FieldType::Timestamp)
        .read_only_field("updated_at", FieldType::Timestamp)
        .relationship(
            Relationship::single("scene", "scene_id", "Scene")
                .strategy(QueryStrategy::DirectField)
                .inverse_field("markers"),
        )
        .relationship(Relationship::single("primary_tag", "primary_tag_id", "Tag"))
        .relationship(Relationship::list("tags", "tag_ids", "Tag"))
        .short_repr(&["title", "seconds"])
        .build()
}

pub fn video_file_schema() -> Result<Arc<EntitySchema>> {
    EntitySchema::builder("VideoFile")
        .implements("BaseFile")
        .field("path", FieldType::String)
        .field("basename", FieldType::String)
        .field("size", FieldType::Int)
        .field("format", FieldType::String)
        .field("width", FieldType::Int)
        .field("height", FieldType::Int)
        .field("duration", FieldType::Float)
        .field("video_codec", FieldType::String)
        .field("audio_codec", FieldType::String)
        .field("frame_rate", FieldType::Float)
        .field("bit_rate", FieldType::Int)
        .short_repr(&["path"])
        .build()
}

pub fn image_file_schema() -> Result<Arc<EntitySchema>> {
    EntitySchema::builder("ImageFile")
        .implements("BaseFile")
        .field("path", FieldType::String)
        .field("basename", FieldType::String)
        .field("size", FieldType::Int)
        .field("format", FieldType::String)
        .field("width", FieldType::Int)
        .field("height", FieldType::Int)
        .short_repr(&["path"])
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_registers_all_types() {
        let registry = default_registry().unwrap();
        for name in [
            "Scene",
            "Performer",
            "Studio",
            "Tag",
            "Gallery",
            "Image",
            "Group",
            "SceneMarker",
            "VideoFile",
            "ImageFile",
        ] {
            assert!(registry.contains(name), "missing {}", name);
        }
    }

    #[test]
    fn test_file_types_are_base_file_members() {
        let registry = default_registry().unwrap();
        let video = registry.get("VideoFile").unwrap();
        assert!(registry.is_assignable("BaseFile", &video));
    }

    #[test]
    fn test_image_has_no_create_input() {
        let registry = default_registry().unwrap();
        let image = registry.get("Image").unwrap();
        assert!(image.create_input().is_none());
        assert_eq!(image.update_input(), Some("ImageUpdateInput"));
    }
}
