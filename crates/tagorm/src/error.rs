//! Error types for tagorm

use thiserror::Error;

/// Result type alias for tagorm operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for statement building, record mapping and execution
#[derive(Debug, Error)]
pub enum OrmError {
    /// Malformed condition or statement (placeholder mismatch, missing table, ...)
    #[error("Build error: {0}")]
    Build(String),

    /// A tagged field with an unusable tag
    #[error("Tag error on {type_name}.{field}: {message}")]
    Tag {
        type_name: String,
        field: String,
        message: String,
    },

    /// Zero or several columns flagged both `key` and `auto`
    #[error("{type_name} needs exactly one auto key column, found {found}")]
    AutoKey { type_name: String, found: usize },

    /// A column name that the record mapping does not know
    #[error("{type_name} has no column '{column}'")]
    UnknownColumn { type_name: String, column: String },

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Execution error reported by a non-Postgres driver
    #[error("Driver error: {0}")]
    Driver(String),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Update or delete guarded by an optimistic lock column matched no row
    #[error("Optimistic lock conflict: {0}")]
    OptimisticLock(String),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Transaction state error (nested begin, commit without begin)
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a build error
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an optimistic lock error
    pub fn optimistic_lock(message: impl Into<String>) -> Self {
        Self::OptimisticLock(message.into())
    }

    /// Create a transaction state error
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction(message.into())
    }

    /// Check if this is a build error
    pub fn is_build(&self) -> bool {
        matches!(self, Self::Build(_))
    }

    /// Check if this is a record mapping error
    pub fn is_mapping(&self) -> bool {
        matches!(
            self,
            Self::Tag { .. } | Self::AutoKey { .. } | Self::UnknownColumn { .. }
        )
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is an optimistic lock conflict
    pub fn is_optimistic_lock(&self) -> bool {
        matches!(self, Self::OptimisticLock(_))
    }

    /// Classify a tokio_postgres error by SQLSTATE into a constraint error when possible
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                "23514" => return Self::CheckViolation(format!("{}: {}", constraint, message)),
                _ => {}
            }
        }
        Self::Query(err)
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for OrmError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates_match_variants() {
        assert!(OrmError::build("x").is_build());
        assert!(OrmError::not_found("x").is_not_found());
        assert!(OrmError::optimistic_lock("x").is_optimistic_lock());
        assert!(!OrmError::optimistic_lock("x").is_not_found());
        assert!(
            OrmError::AutoKey {
                type_name: "Book".into(),
                found: 0
            }
            .is_mapping()
        );
    }

    #[test]
    fn display_includes_context() {
        let err = OrmError::Tag {
            type_name: "Book".into(),
            field: "title".into(),
            message: "empty column name".into(),
        };
        assert_eq!(
            err.to_string(),
            "Tag error on Book.title: empty column name"
        );
    }
}
