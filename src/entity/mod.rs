mod dirty;
mod entity;
mod input;
mod relations;
mod state;

pub use entity::Entity;
pub use input::{EntityInput, InputKind};
