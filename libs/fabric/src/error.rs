use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Invalid content length: {0}")]
    InvalidLength(String),

    #[error("Truncated body: declared {declared} bytes, received {received}")]
    Truncated { declared: usize, received: usize },

    #[error("{0} timeout exceeded")]
    Timeout(&'static str),

    #[error("Config error: {0}")]
    Config(#[from] muster_core::Error),

    #[error("{0}")]
    Custom(String),
}

pub type Result<T> = std::result::Result<T, Error>;
