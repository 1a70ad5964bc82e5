use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Weak password: {0}")]
    WeakPassword(String),

    #[error("Password hashing error: {0}")]
    Hashing(String),

    #[error(transparent)]
    Core(#[from] taskboard_core::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Error::InvalidToken(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
