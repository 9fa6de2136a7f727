use thiserror::Error;

/// Error types for the reconciliation engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The uploaded file could not be decoded; nothing was persisted.
    #[error("parse error: {0}")]
    Parse(#[from] parser::ParseError),

    /// A business rule was violated; the offending field is named so the
    /// caller can attribute the failure.
    #[error("validation failed on {field}: {message}")]
    Validation { field: &'static str, message: String },

    /// A referenced row does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i32 },

    /// Byte-identical content was already imported for this account.
    #[error("statement with identical content already imported for account {account_id}")]
    Duplicate { account_id: i32 },

    /// Error from the database operations
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Error from blob storage I/O
    #[error("storage error: {0}")]
    Storage(String),
}

impl EngineError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        EngineError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: i32) -> Self {
        EngineError::NotFound { entity, id }
    }
}

/// Type alias for Result with EngineError
pub type Result<T> = std::result::Result<T, EngineError>;
