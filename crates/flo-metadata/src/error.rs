//! Error types for the flo metadata crate.

use thiserror::Error;

/// Errors that can occur during metadata operations.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error(transparent)]
    Format(#[from] flo_format::FormatError),

    #[error("metadata failed to parse: {0}")]
    Parse(String),

    #[error("metadata failed to serialize: {0}")]
    Serialize(String),
}

impl From<rmp_serde::decode::Error> for MetadataError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        MetadataError::Parse(err.to_string())
    }
}

impl From<rmp_serde::encode::Error> for MetadataError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        MetadataError::Serialize(err.to_string())
    }
}

impl From<rmpv::decode::Error> for MetadataError {
    fn from(err: rmpv::decode::Error) -> Self {
        MetadataError::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MetadataError>;
