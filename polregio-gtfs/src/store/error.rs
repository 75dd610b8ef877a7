//! Record store error types.

/// Errors from the record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// SQLite failed
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored value cannot be mapped back onto its type
    #[error("invalid value {value:?} in {table}.{column}")]
    InvalidValue {
        table: &'static str,
        column: &'static str,
        value: String,
    },
}
