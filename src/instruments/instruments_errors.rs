use diesel::result::Error as DieselError;
use thiserror::Error;

use crate::errors::DatabaseError;

/// Custom error type for instrument-related operations
#[derive(Debug, Error)]
pub enum InstrumentError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed for field '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Remote store lookup failed: {0}")]
    RemoteStore(String),

    #[error("Remote store write failed: {0}")]
    RemoteWrite(String),

    #[error("Local cache mirror failed: {0}")]
    CacheMirror(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl InstrumentError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        InstrumentError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<DieselError> for InstrumentError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => InstrumentError::NotFound("Record not found".to_string()),
            _ => InstrumentError::Database(err.to_string()),
        }
    }
}

impl From<DatabaseError> for InstrumentError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::QueryFailed(DieselError::NotFound) => {
                InstrumentError::NotFound("Record not found".to_string())
            }
            _ => InstrumentError::Database(err.to_string()),
        }
    }
}

impl From<crate::errors::Error> for InstrumentError {
    fn from(err: crate::errors::Error) -> Self {
        match err {
            crate::errors::Error::Database(db) => db.into(),
            crate::errors::Error::Instrument(msg) => InstrumentError::Database(msg),
        }
    }
}

/// Result type for instrument operations
pub type Result<T> = std::result::Result<T, InstrumentError>;
