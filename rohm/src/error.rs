use config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {

    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("WRONGTYPE Operation against key '{key}' holding the wrong kind of value")]
    WrongType { key: String },

    #[error("Backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum AppError {

    #[error("Model {model} is missing an identifier at '{attribute}', save the model it points to first")]
    MissingId { model: &'static str, attribute: &'static str },

    #[error("Invalid model declaration: {0}")]
    Structural(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Attribute '{attribute}' of {model} is not indexed")]
    NotIndexed { model: &'static str, attribute: String },

    #[error("Unable to decode field '{field}' of '{key}': {message}")]
    Codec { key: String, field: String, message: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn structural(msg: impl Into<String>) -> Self {
        AppError::Structural(msg.into())
    }

    pub fn codec(key: &str, field: &str, message: impl Into<String>) -> Self {
        AppError::Codec { key: key.to_string(), field: field.to_string(), message: message.into() }
    }
}
