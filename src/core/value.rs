use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value as JsonValue;

use crate::core::scalars::{FuzzyDate, Timestamp};
use crate::entity::Entity;

/// A metadata-bearing reference: a referent entity plus the wrapper's own
/// scalar fields (e.g. an ordering index or a description). Used by
/// relationships whose payload wraps the peer instead of embedding it raw.
#[derive(Debug, Clone)]
pub struct Related {
    pub entity: Entity,
    pub metadata: BTreeMap<String, JsonValue>,
}

impl Related {
    pub fn new(entity: Entity) -> Self {
        Self {
            entity,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(entity: Entity, metadata: BTreeMap<String, JsonValue>) -> Self {
        Self { entity, metadata }
    }
}

impl PartialEq for Related {
    fn eq(&self, other: &Self) -> bool {
        self.entity == other.entity && self.metadata == other.metadata
    }
}

/// A typed field value.
///
/// Scalar variants mirror the remote schema's scalar set; the reference
/// variants hold live entity handles so that a parent never owns a detached
/// copy of a nested entity once the store has hoisted it.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    StringList(Vec<String>),
    Timestamp(Timestamp),
    Date(FuzzyDate),
    /// Untyped passthrough for scalar payloads the schema does not model.
    Json(JsonValue),
    Ref(Entity),
    RefList(Vec<Entity>),
    Wrapper(Related),
    WrapperList(Vec<Related>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "BOOL",
            Self::Int(_) => "INT",
            Self::Float(_) => "FLOAT",
            Self::String(_) => "STRING",
            Self::StringList(_) => "STRING_LIST",
            Self::Timestamp(_) => "TIMESTAMP",
            Self::Date(_) => "DATE",
            Self::Json(_) => "JSON",
            Self::Ref(_) => "REF",
            Self::RefList(_) => "REF_LIST",
            Self::Wrapper(_) => "WRAPPER",
            Self::WrapperList(_) => "WRAPPER_LIST",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Self::Ref(e) => Some(e),
            Self::Wrapper(r) => Some(&r.entity),
            _ => None,
        }
    }

    /// Referent entities, for both single and list reference variants.
    pub fn entities(&self) -> Vec<Entity> {
        match self {
            Self::Ref(e) => vec![e.clone()],
            Self::RefList(es) => es.clone(),
            Self::Wrapper(r) => vec![r.entity.clone()],
            Self::WrapperList(rs) => rs.iter().map(|r| r.entity.clone()).collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Self::Ref(_) | Self::RefList(_) | Self::Wrapper(_) | Self::WrapperList(_)
        )
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(fl) => write!(f, "{}", fl),
            Self::String(s) => write!(f, "'{}'", s),
            Self::StringList(items) => write!(f, "{:?}", items),
            Self::Timestamp(ts) => write!(f, "{}", ts),
            Self::Date(d) => write!(f, "{}", d),
            Self::Json(j) => write!(f, "{}", j),
            Self::Ref(e) => write!(f, "{}", e.short_repr()),
            Self::RefList(es) => write_truncated(f, es.iter().map(|e| e.short_repr())),
            Self::Wrapper(r) => write!(f, "{}", r.entity.short_repr()),
            Self::WrapperList(rs) => write_truncated(f, rs.iter().map(|r| r.entity.short_repr())),
        }
    }
}

/// List rendering for relationship values: at most two elements, then a
/// "N more" suffix, so bidirectional fan-out cannot explode the output.
const REPR_LIST_LIMIT: usize = 2;

fn write_truncated(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = String>,
) -> fmt::Result {
    let items: Vec<String> = items.collect();
    let shown: Vec<&str> = items
        .iter()
        .take(REPR_LIST_LIMIT)
        .map(|s| s.as_str())
        .collect();
    if items.len() > REPR_LIST_LIMIT {
        write!(
            f,
            "[{}, ... {} more]",
            shown.join(", "),
            items.len() - REPR_LIST_LIMIT
        )
    } else {
        write!(f, "[{}]", shown.join(", "))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Timestamp> for Value {
    fn from(ts: Timestamp) -> Self {
        Self::Timestamp(ts)
    }
}

impl From<FuzzyDate> for Value {
    fn from(d: FuzzyDate) -> Self {
        Self::Date(d)
    }
}

impl From<Entity> for Value {
    fn from(e: Entity) -> Self {
        Self::Ref(e)
    }
}

impl From<Vec<Entity>> for Value {
    fn from(es: Vec<Entity>) -> Self {
        Self::RefList(es)
    }
}
