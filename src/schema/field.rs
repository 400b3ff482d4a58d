use crate::core::value::Value;

/// Declared type of an entity field.
///
/// Reference variants name the referent entity type (or interface); the
/// wrapper variants describe relationships whose payload wraps the peer in
/// a metadata-bearing record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Bool,
    Int,
    Float,
    String,
    StringList,
    Timestamp,
    Date,
    Json,
    Ref(String),
    RefList(String),
    Wrapper(String),
    WrapperList(String),
}

impl FieldType {
    pub fn referent(&self) -> Option<&str> {
        match self {
            Self::Ref(t) | Self::RefList(t) | Self::Wrapper(t) | Self::WrapperList(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_reference(&self) -> bool {
        self.referent().is_some()
    }

    pub fn is_wrapper(&self) -> bool {
        matches!(self, Self::Wrapper(_) | Self::WrapperList(_))
    }

    /// Multi-valued fields need list-shaped filter criteria; see the find
    /// DSL translation.
    pub fn is_list(&self) -> bool {
        matches!(
            self,
            Self::StringList | Self::RefList(_) | Self::WrapperList(_)
        )
    }

    /// Whether a scalar value is acceptable for this declared type.
    /// Reference checks live with the entity, which knows its own schema.
    pub fn accepts_scalar(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::Bool, Value::Bool(_))
                | (Self::Int, Value::Int(_))
                | (Self::Float, Value::Float(_))
                | (Self::Float, Value::Int(_))
                | (Self::String, Value::String(_))
                | (Self::StringList, Value::StringList(_))
                | (Self::Timestamp, Value::Timestamp(_))
                | (Self::Date, Value::Date(_))
                | (Self::Json, Value::Json(_))
        )
    }
}

/// A declared field: name, type, and whether the server alone may write it.
/// Read-only resolver fields (counts and the like) are displayed but never
/// emitted in mutation input.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,
    pub read_only: bool,
}

impl FieldDescriptor {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            read_only: false,
        }
    }

    pub fn read_only(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            read_only: true,
        }
    }
}

/// Write-path conversion for a plain (non-relationship) field: the input
/// payload key and how the in-memory value maps onto the wire.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub input_key: String,
}

impl Conversion {
    pub fn new(input_key: &str) -> Self {
        Self {
            input_key: input_key.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_acceptance() {
        assert!(FieldType::Int.accepts_scalar(&Value::Int(3)));
        assert!(FieldType::Float.accepts_scalar(&Value::Int(3)));
        assert!(!FieldType::Int.accepts_scalar(&Value::Float(3.0)));
        assert!(!FieldType::String.accepts_scalar(&Value::Bool(true)));
    }

    #[test]
    fn test_list_detection() {
        assert!(FieldType::RefList("Tag".into()).is_list());
        assert!(FieldType::StringList.is_list());
        assert!(!FieldType::Ref("Studio".into()).is_list());
    }

    #[test]
    fn test_referent() {
        assert_eq!(
            FieldType::WrapperList("Group".into()).referent(),
            Some("Group")
        );
        assert_eq!(FieldType::Bool.referent(), None);
    }
}
