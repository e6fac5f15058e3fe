use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountError {
    #[error("AccountNotFound: {0}")]
    NotFound(String),

    #[error("AccountAlreadyExists: {0}")]
    AlreadyExists(String),

    #[error("AccountUnderFunded: {0}")]
    UnderFunded(String),

    #[error("InvalidAmount: {0}")]
    InvalidAmount(Decimal),
}

impl AccountError {
    /// HTTP status the API layer reports for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AccountError::NotFound(_) => 404,
            AccountError::AlreadyExists(_)
            | AccountError::UnderFunded(_)
            | AccountError::InvalidAmount(_) => 400,
        }
    }
}

pub type AccountResult<T> = Result<T, AccountError>;
