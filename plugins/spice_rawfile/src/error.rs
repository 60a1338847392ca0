use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum Error {
    #[error("invalid rawfile header: {0}")]
    Header(String),

    #[error("rawfile data section does not match header: {0}")]
    Data(String),

    #[error("unsupported rawfile feature: {0}")]
    Unsupported(String),
}
