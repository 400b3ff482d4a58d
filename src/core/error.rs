use thiserror::Error;

/// Failures reported by the transport layer, categorized so callers can
/// distinguish remote rejections from plumbing problems.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("GraphQL error: {0}")]
    Graphql(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Subscriptions are not supported by this transport")]
    SubscriptionUnsupported,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Validation failed for {type_name}.{field}: {message}")]
    Validation {
        type_name: String,
        field: String,
        message: String,
    },

    #[error("Type mismatch: payload tagged '{actual}' is not {expected} or a concrete subtype")]
    TypeMismatch { expected: String, actual: String },

    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("Malformed payload: {0}")]
    Payload(String),

    #[error("Type '{0}' is not registered")]
    UnknownType(String),

    #[error("'{field}' is not a declared field of {type_name}")]
    UnknownField { type_name: String, field: String },

    #[error("Invalid identifier '{0}': expected a positive integer id")]
    InvalidIdentifier(String),

    #[error("Protected configuration key '{0}' cannot be written")]
    ProtectedConfiguration(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Invalid filter criterion '{0}'")]
    InvalidFilter(String),

    #[error("{type_name} {id} is missing required fields: {fields:?}")]
    MissingFields {
        type_name: String,
        id: String,
        fields: Vec<String>,
    },

    #[error("Query matched {count} results, exceeding the limit of {limit}; use find_iter")]
    ResultLimit { count: usize, limit: usize },

    #[error("{0} objects cannot be created, only updated")]
    CreateUnsupported(String),

    #[error("{0} objects cannot be written")]
    UpdateUnsupported(String),

    #[error("Id of {type_name} already assigned: {id}")]
    IdAlreadyAssigned { type_name: String, id: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;
