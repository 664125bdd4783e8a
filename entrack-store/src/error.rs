use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Tracking error: {0}")]
    Tracker(#[from] entrack_core::Error),

    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Flush not found: {0}")]
    FlushNotFound(String),

    #[error("Update not found: {0}")]
    UpdateNotFound(String),

    #[error("Unknown class: {0}")]
    UnknownClass(String),

    #[error("Entity not managed: {0}")]
    NotManaged(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}
