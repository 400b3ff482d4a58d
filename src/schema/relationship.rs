/// How the inverse side of a relationship is read from the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStrategy {
    /// The peer exposes the inverse as a plain list field in its payload.
    DirectField,
    /// The peer exposes only a count; reading the full list means querying
    /// the peer type with an INCLUDES filter on the owning id.
    FilterQuery,
    /// The peer payload wraps each referent in a metadata-bearing record.
    ComplexObject,
}

/// Keys used by complex-object relationships: where the referent sits in a
/// wrapper record on read, and which input key carries its id on write.
#[derive(Debug, Clone)]
pub struct WrapperSpec {
    pub entity_key: String,
    pub input_id_key: String,
}

impl WrapperSpec {
    pub fn new(entity_key: &str, input_id_key: &str) -> Self {
        Self {
            entity_key: entity_key.to_string(),
            input_id_key: input_id_key.to_string(),
        }
    }
}

/// Declarative metadata for one relationship field on an owning type.
#[derive(Debug, Clone)]
pub struct Relationship {
    /// Local field name on the owning type.
    pub field: String,
    /// Key in create/update input payloads. `None` marks a read-only
    /// relationship that is never emitted.
    pub target_field: Option<String>,
    pub is_list: bool,
    /// Key in read payloads; may differ from `target_field`.
    pub query_field: String,
    /// Peer entity type name.
    pub inverse_type: String,
    /// Field on the peer holding this owning entity. Absent when the peer
    /// exposes only a count or filter; inverse sync is skipped then.
    pub inverse_query_field: Option<String>,
    pub query_strategy: QueryStrategy,
    /// Present iff `query_strategy` is `ComplexObject`.
    pub wrapper: Option<WrapperSpec>,
}

impl Relationship {
    /// Single-valued relationship written as `<target_field>: <id>`.
    pub fn single(field: &str, target_field: &str, inverse_type: &str) -> Self {
        Self {
            field: field.to_string(),
            target_field: Some(target_field.to_string()),
            is_list: false,
            query_field: field.to_string(),
            inverse_type: inverse_type.to_string(),
            inverse_query_field: None,
            query_strategy: QueryStrategy::FilterQuery,
            wrapper: None,
        }
    }

    /// List relationship written as `<target_field>: [<id>, ...]`.
    pub fn list(field: &str, target_field: &str, inverse_type: &str) -> Self {
        Self {
            field: field.to_string(),
            target_field: Some(target_field.to_string()),
            is_list: true,
            query_field: field.to_string(),
            inverse_type: inverse_type.to_string(),
            inverse_query_field: None,
            query_strategy: QueryStrategy::FilterQuery,
            wrapper: None,
        }
    }

    /// List relationship the peer stores only server-side; never emitted.
    pub fn read_only_list(field: &str, inverse_type: &str) -> Self {
        Self {
            field: field.to_string(),
            target_field: None,
            is_list: true,
            query_field: field.to_string(),
            inverse_type: inverse_type.to_string(),
            inverse_query_field: None,
            query_strategy: QueryStrategy::DirectField,
            wrapper: None,
        }
    }

    /// Complex-object list relationship: wrapper records on read, wrapper
    /// input records on write.
    pub fn wrapped_list(
        field: &str,
        target_field: &str,
        inverse_type: &str,
        wrapper: WrapperSpec,
    ) -> Self {
        Self {
            field: field.to_string(),
            target_field: Some(target_field.to_string()),
            is_list: true,
            query_field: field.to_string(),
            inverse_type: inverse_type.to_string(),
            inverse_query_field: None,
            query_strategy: QueryStrategy::ComplexObject,
            wrapper: Some(wrapper),
        }
    }

    pub fn query_field(mut self, key: &str) -> Self {
        self.query_field = key.to_string();
        self
    }

    pub fn inverse_field(mut self, key: &str) -> Self {
        self.inverse_query_field = Some(key.to_string());
        self
    }

    pub fn strategy(mut self, strategy: QueryStrategy) -> Self {
        self.query_strategy = strategy;
        self
    }
}
