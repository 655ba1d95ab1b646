//! Middleware layer.
//!
//! Middleware wraps a [`Handler`](crate::Handler) and returns another
//! handler, so it composes with routing without the router knowing about it.
//!
//! Built-in middleware:
//! - [`validate`]: JSON Schema validation of the request body, answering
//!   `406 Not Acceptable` with every violation before the handler runs.

pub mod validate;

pub use validate::{Rejection, ValidationGate, validate_schema};
