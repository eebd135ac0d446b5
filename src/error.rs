//! Error types for mapping operations.

use thiserror::Error;

/// Errors raised while declaring schemas or mapping records to SQLite.
#[derive(Debug, Error)]
pub enum Error {
    /// A column type name has no storage mapping.
    #[error("unsupported column type: {0}")]
    UnsupportedType(String),

    /// Insert attempted while a relation points at a record that was never saved.
    #[error("{schema}.{field} references an unsaved {target} record")]
    UnresolvedReference {
        schema: String,
        field: String,
        target: String,
    },

    /// Update or delete attempted on a record that has no identity yet.
    #[error("{0} record has no id; save it before updating or deleting it")]
    MissingIdentity(String),

    #[error("{schema} instance with id {id} does not exist")]
    NotFound { schema: String, id: i64 },

    #[error("{schema} is missing a value for field {field}")]
    MissingField { schema: String, field: String },

    #[error("{schema} has no field named {field}")]
    UnknownField { schema: String, field: String },

    #[error("{schema} declares field {field} more than once")]
    DuplicateField { schema: String, field: String },

    #[error("{schema}.{field} expects {expected}, got {actual}")]
    TypeMismatch {
        schema: String,
        field: String,
        expected: String,
        actual: String,
    },

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("resolving {schema} exceeded the relation depth limit of {max_depth}")]
    RelationDepthExceeded { schema: String, max_depth: usize },

    /// Store-level failure, passed through unchanged.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
