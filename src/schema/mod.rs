pub mod catalog;
pub mod entity;
pub mod field;
pub mod registry;
pub mod relationship;

pub use catalog::default_registry;
pub use entity::{EntitySchema, EntitySchemaBuilder};
pub use field::{Conversion, FieldDescriptor, FieldType};
pub use registry::SchemaRegistry;
pub use relationship::{QueryStrategy, Relationship, WrapperSpec};
