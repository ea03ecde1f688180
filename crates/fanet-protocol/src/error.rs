use fanet_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error(transparent)]
    Config(#[from] CoreError),

    #[error("learning strategy requires a non-empty population")]
    EmptyPopulation,
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
