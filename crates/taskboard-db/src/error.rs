use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Corrupt row: {0}")]
    Decode(String),

    #[error(transparent)]
    Domain(#[from] taskboard_core::Error),

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for taskboard_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound(what) => taskboard_core::Error::NotFound(what.to_string()),
            Error::Conflict(msg) => taskboard_core::Error::Conflict(msg),
            Error::Domain(err) => err,
            Error::Sqlx(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                taskboard_core::Error::Conflict(db_err.message().to_string())
            }
            other => {
                tracing::error!("Database failure: {}", other);
                taskboard_core::Error::Storage(other.to_string())
            }
        }
    }
}
