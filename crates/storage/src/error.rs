use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique, foreign-key or check constraint rejected the write.
    #[error("Constraint violation: {0}")]
    Conflict(String),

    /// A stored value could not be turned back into a model.
    #[error("Corrupt row: {0}")]
    Decode(String),

    /// The backend refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Classifies a driver error, turning constraint violations into
    /// [`StoreError::Conflict`].
    pub fn from_database(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err)
                if db_err.is_unique_violation()
                    || db_err.is_foreign_key_violation()
                    || db_err.is_check_violation() =>
            {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                StoreError::Conflict(constraint)
            }
            _ => StoreError::Database(err),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
