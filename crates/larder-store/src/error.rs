use thiserror::Error;

/// Everything the storage layer can fail with
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("No record with id {0}")]
    NotFound(String),

    #[error("Database schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: i64, supported: i64 },

    #[error("Stored value could not be decoded: {0}")]
    Corrupt(String),

    #[error("Database lock poisoned by a panicked writer")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Sort raw SQLite failures into constraint errors and everything else
    pub(crate) fn from_write(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, msg)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::ConstraintViolation(
                    msg.clone().unwrap_or_else(|| "constraint failed".to_string()),
                )
            }
            _ => StoreError::Sqlite(err),
        }
    }
}
