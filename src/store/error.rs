//! Store Errors

/// Errors raised by a storage backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row could not be turned back into a domain value
    #[error("Corrupted {table} row: {reason}")]
    Corrupted { table: &'static str, reason: String },
}

impl StoreError {
    pub fn corrupted(table: &'static str, reason: impl ToString) -> Self {
        Self::Corrupted {
            table,
            reason: reason.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
