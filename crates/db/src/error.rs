#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("ledger entry {0} not found")]
    LedgerNotFound(i64),
}

pub type Result<T> = std::result::Result<T, DbError>;
