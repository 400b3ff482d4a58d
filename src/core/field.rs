use std::fmt;

/// Three-state slot for an entity field.
///
/// Every declared field is in exactly one of three states:
///
/// - `Unset` — never observed from a server response and never assigned
///   locally. Excluded from both reads and writes.
/// - `Null` — explicitly observed as, or assigned to, the absent value.
///   Included in writes as an explicit null.
/// - `Value(v)` — a typed value. Included in writes.
///
/// The distinction lets the serializer tell "preserve the server value"
/// (omit) apart from "clear the server value" (send null). Transitions
/// between the three states are free in any direction; `Null` and `Unset`
/// are never interchanged silently.
#[derive(Debug, Clone, PartialEq)]
pub enum Maybe<T> {
    Unset,
    Null,
    Value(T),
}

/// The default slot is the sentinel, for any payload type.
impl<T> Default for Maybe<T> {
    fn default() -> Self {
        Maybe::Unset
    }
}

impl<T> Maybe<T> {
    /// True iff this slot is the unset sentinel. Identity, not value,
    /// comparison: user types cannot fool it through `PartialEq`.
    pub fn is_unset(&self) -> bool {
        matches!(self, Maybe::Unset)
    }

    /// True iff this slot is not the unset sentinel. A set slot may still
    /// be `Null`; consumers treat it as the declared (nullable) field type.
    pub fn is_set(&self) -> bool {
        !self.is_unset()
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Maybe::Null)
    }

    /// The inner value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Maybe::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Maybe::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Collapse to the nullable view: `None` for `Unset`, `Some(None)` for
    /// `Null`, `Some(Some(v))` for a value.
    pub fn as_nullable(&self) -> Option<Option<&T>> {
        match self {
            Maybe::Unset => None,
            Maybe::Null => Some(None),
            Maybe::Value(v) => Some(Some(v)),
        }
    }

    pub fn as_ref(&self) -> Maybe<&T> {
        match self {
            Maybe::Unset => Maybe::Unset,
            Maybe::Null => Maybe::Null,
            Maybe::Value(v) => Maybe::Value(v),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Maybe<U> {
        match self {
            Maybe::Unset => Maybe::Unset,
            Maybe::Null => Maybe::Null,
            Maybe::Value(v) => Maybe::Value(f(v)),
        }
    }
}

impl<T> From<Option<T>> for Maybe<T> {
    /// `None` maps to explicit `Null`, never to `Unset`.
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => Maybe::Value(v),
            None => Maybe::Null,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Maybe<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Maybe::Unset => write!(f, "UNSET"),
            Maybe::Null => write!(f, "null"),
            Maybe::Value(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_is_not_set() {
        let slot: Maybe<i64> = Maybe::Unset;
        assert!(slot.is_unset());
        assert!(!slot.is_set());
    }

    #[test]
    fn test_null_is_set() {
        let slot: Maybe<i64> = Maybe::Null;
        assert!(slot.is_set());
        assert!(!slot.is_unset());
        assert!(slot.is_null());
        assert_eq!(slot.as_nullable(), Some(None));
    }

    #[test]
    fn test_value_round_trip() {
        let slot = Maybe::Value(42);
        assert_eq!(slot.value(), Some(&42));
        assert_eq!(slot.as_nullable(), Some(Some(&42)));
    }

    #[test]
    fn test_option_conversion_maps_none_to_null() {
        let slot: Maybe<i64> = None.into();
        assert!(slot.is_null());
        assert!(!slot.is_unset());
    }

    #[test]
    fn test_diagnostic_form() {
        let slot: Maybe<i64> = Maybe::Unset;
        assert_eq!(slot.to_string(), "UNSET");
    }
}
