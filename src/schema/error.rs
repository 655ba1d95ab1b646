/// Errors raised while loading or compiling schemas.
///
/// Validation failures are not errors at this level; they are collected as
/// violation messages and answered by the gate.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A schema file could not be read.
    #[error("failed to load schema: {0}")]
    LoadFailed(String),

    /// The schema document is not a valid schema.
    #[error("failed to compile schema `{name}`: {message}")]
    CompileFailed { name: String, message: String },

    /// The schema source is not valid JSON.
    #[error("schema is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// No schema registered under the given operation name.
    #[error("no schema registered for operation `{0}`")]
    NoSchema(String),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
