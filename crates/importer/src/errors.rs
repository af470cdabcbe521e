//! Importer error types

use bibstore_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Malformed record at {location}: {message}")]
    MalformedRecord { location: String, message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ImportError {
    pub fn malformed(location: impl Into<String>, message: impl ToString) -> Self {
        ImportError::MalformedRecord {
            location: location.into(),
            message: message.to_string(),
        }
    }
}

impl From<AppError> for ImportError {
    fn from(e: AppError) -> Self {
        match e {
            AppError::Configuration { message } => ImportError::Config(message),
            other => ImportError::Database(other.to_string()),
        }
    }
}

impl From<sea_orm::DbErr> for ImportError {
    fn from(e: sea_orm::DbErr) -> Self {
        ImportError::Database(e.to_string())
    }
}
