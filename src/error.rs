//! Error types for the scanner.
//!
//! Only setup failures are fatal. Anything that goes wrong while probing a
//! single candidate is folded into a negative verdict instead.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid query name {name:?}: {reason}")]
    InvalidQueryName { name: String, reason: &'static str },

    #[error("unknown record type {0:?}")]
    InvalidRecordType(String),

    #[error("failed to read input {path}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write output {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("failed to start runtime: {0}")]
    Runtime(#[source] io::Error),
}

impl Error {
    pub(crate) fn invalid_name(name: &str, reason: &'static str) -> Self {
        Error::InvalidQueryName {
            name: name.to_string(),
            reason,
        }
    }
}
