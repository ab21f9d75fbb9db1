//! Error taxonomy for the PIR protocol.
//!
//! Every fallible operation surfaces its failure as one of these variants;
//! nothing is retried or silently corrected inside the crate.

use thiserror::Error;

/// Protocol error.
#[derive(Debug, Error)]
pub enum Error {
    /// Construction-time configuration inconsistency. Fatal, aborts setup.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Record packing out of the declared bit width, or malformed input
    /// to a database operation.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Rounding landed outside the valid symbol range during record
    /// recovery. Usually indicates parameter misconfiguration or noise
    /// overflow.
    #[error("decoding error: {0}")]
    Decoding(String),

    /// Logical record index outside the database's addressable range.
    #[error("index {index} out of range (record count {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// A request handler was invoked before `Server::preprocess`.
    #[error("server has not been preprocessed")]
    NotPreprocessed,

    /// Cryptographic key generation failed.
    #[error("key generation error: {0}")]
    KeyGen(String),

    /// Decryption produced a value inconsistent with the expected range;
    /// the noise budget was exceeded.
    #[error("decryption error: {0}")]
    Decryption(String),

    /// Wire serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
