//! Operation naming glue.
//!
//! The remote schema derives its operation and result keys mechanically
//! from type names; this module owns those derivations so the store and
//! facade never hand-roll strings.

use lazy_static::lazy_static;
use std::collections::HashSet;

/// First letter lowercased: `Scene` -> `scene`, `SceneMarker` -> `sceneMarker`.
pub fn camel(type_name: &str) -> String {
    let mut chars = type_name.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// `SceneMarker` -> `scene_marker`.
pub fn snake(type_name: &str) -> String {
    let mut out = String::with_capacity(type_name.len() + 4);
    for (i, c) in type_name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Naive plural, with the `-y` -> `-ies` rule the remote follows.
pub fn pluralize(name: &str) -> String {
    if let Some(stem) = name.strip_suffix('y') {
        format!("{}ies", stem)
    } else {
        format!("{}s", name)
    }
}

/// Single-entity lookup: `findScene`. Doubles as the result key.
pub fn find_operation(type_name: &str) -> String {
    format!("find{}", type_name)
}

/// Filtered listing: `findScenes`. Doubles as the result key.
pub fn find_many_operation(type_name: &str) -> String {
    format!("find{}", pluralize(type_name))
}

/// Items key inside a listing result: `scenes`, `galleries`.
pub fn result_items_key(type_name: &str) -> String {
    pluralize(&snake(type_name))
}

/// Per-type filter variable key: `scene_filter`.
pub fn filter_variable_key(type_name: &str) -> String {
    format!("{}_filter", snake(type_name))
}

/// Mutation key for create: `sceneCreate`.
pub fn create_operation(type_name: &str) -> String {
    format!("{}Create", camel(type_name))
}

/// Mutation key for update: `sceneUpdate`.
pub fn update_operation(type_name: &str) -> String {
    format!("{}Update", camel(type_name))
}

/// Mutation key for destroy: `sceneDestroy`.
pub fn destroy_operation(type_name: &str) -> String {
    format!("{}Destroy", camel(type_name))
}

lazy_static! {
    /// Server-side path settings that must never be written remotely: a
    /// successful write can point the server at a missing or wrong
    /// directory and brick the installation. Refused before any transport
    /// call.
    pub static ref PROTECTED_CONFIG_KEYS: HashSet<&'static str> = {
        let mut keys = HashSet::new();
        for key in [
            "databasePath",
            "backupDirectoryPath",
            "generatedPath",
            "metadataPath",
            "cachePath",
            "blobsPath",
            "pluginsPath",
            "scrapersPath",
            "ffmpegPath",
            "ffprobePath",
        ] {
            keys.insert(key);
        }
        keys
    };
}
