//! Unified error type.

use crate::schema::SchemaError;

/// The error type returned by schemagate's fallible operations.
///
/// Request-level failures (404, 406, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, never as `Error`s. Schema
/// violations in particular are recovered at the gate. This type surfaces
/// setup and infrastructure failures: a bad bind address, a socket error, or
/// a schema that cannot be loaded.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{0}`")]
    InvalidAddress(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}
