use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum VendError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("print error: {0}")]
    Print(String),
    #[error("invalid state: {0}")]
    State(String),
    #[error("io error: {0}")]
    Io(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
