use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Fabric error: {0}")]
    Fabric(#[from] muster_fabric::Error),

    #[error("Cannot flatten argument: {0}")]
    Flatten(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
