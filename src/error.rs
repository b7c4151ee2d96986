//! Unified error type.

use thiserror::Error;

/// The error type returned by catnip's fallible infrastructure operations.
///
/// Application-level errors (400, 403, 404, etc.) are expressed as
/// [`HttpException`](crate::HttpException) values and rendered as responses,
/// never as `Error`s. This type surfaces infrastructure failures: binding to a
/// port, accepting a connection, or reading configuration.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{addr}`: {source}")]
    InvalidAddress {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("config: {0}")]
    Config(String),
}
