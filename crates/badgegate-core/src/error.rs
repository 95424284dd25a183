use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid tag format: {0}")]
    InvalidTagFormat(String),

    #[error("Invalid holder name: {0}")]
    InvalidHolderName(String),

    #[error("Invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
