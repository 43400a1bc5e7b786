#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("time parse error: {0}")]
    TimeParse(#[from] chrono::ParseError),
    #[error("project id must not be empty")]
    EmptyProjectId,
}

pub type Result<T> = std::result::Result<T, DbError>;

impl From<DbError> for watchdog_core::StoreError {
    fn from(err: DbError) -> Self {
        watchdog_core::StoreError::Backend(err.to_string())
    }
}
