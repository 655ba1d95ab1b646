//! Schemas, the validation interface, and the registry that holds them.
//!
//! A [`Schema`] is a JSON Schema document paired with something that can
//! check documents against it. The default checker is
//! [`JsonSchemaValidator`], backed by the `jsonschema` crate; any other
//! [`SchemaValidator`] can be bound with [`Schema::with_validator`].

pub mod config;
pub mod error;
pub mod registry;
mod strict;

use std::fmt;
use std::sync::Arc;

use jsonschema::error::ValidationErrorKind;
use serde_json::Value;

pub use config::{RegistryConfig, SchemaDraft};
pub use error::{Result, SchemaError};
pub use registry::SchemaRegistry;

/// A parsed request body.
///
/// Object, array, string, number, boolean or null; validators match on it
/// structurally.
pub type Document = Value;

// ── Validation interface ──────────────────────────────────────────────────────

/// Checks a document against one compiled schema.
///
/// Returns every violation found, in the order the implementation discovers
/// them. An empty vector means the document is valid. Implementations must
/// be deterministic: the same document always yields the same messages.
pub trait SchemaValidator: Send + Sync {
    fn validate(&self, document: &Document) -> Vec<String>;
}

/// [`SchemaValidator`] backed by the `jsonschema` crate.
pub struct JsonSchemaValidator {
    inner: jsonschema::Validator,
}

impl JsonSchemaValidator {
    /// Compiles `schema` for the given dialect.
    pub fn compile(name: &str, schema: &Value, draft: SchemaDraft) -> Result<Self> {
        let inner = jsonschema::options()
            .with_draft(draft.as_jsonschema())
            .build(schema)
            .map_err(|err| SchemaError::CompileFailed {
                name: name.to_owned(),
                message: err.to_string(),
            })?;
        Ok(Self { inner })
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, document: &Document) -> Vec<String> {
        self.inner
            .iter_errors(document)
            .map(|err| {
                let message = match &err.kind {
                    ValidationErrorKind::Required { property: Value::String(property) } => {
                        format!("'{property}' is a required property")
                    }
                    _ => err.to_string(),
                };
                let path = err.instance_path.to_string();
                if path.is_empty() {
                    message
                } else {
                    format!("{path}: {message}")
                }
            })
            .collect()
    }
}

// ── Schema ────────────────────────────────────────────────────────────────────

/// A named, compiled schema. Immutable once built.
#[derive(Clone)]
pub struct Schema {
    name: String,
    document: Value,
    validator: Arc<dyn SchemaValidator>,
}

impl Schema {
    /// Compiles `document` with the default `jsonschema` validator.
    ///
    /// Strict mode is applied to a copy; [`Schema::document`] returns the
    /// schema that was actually compiled.
    pub fn compile(name: impl Into<String>, document: &Value, config: &RegistryConfig) -> Result<Self> {
        let name = name.into();
        let mut document = document.clone();
        if config.strict_mode {
            strict::apply(&mut document);
        }
        let validator = JsonSchemaValidator::compile(&name, &document, config.draft)?;
        Ok(Self::with_validator(name, document, Arc::new(validator)))
    }

    /// Binds a schema document to a custom validator.
    ///
    /// `document` is kept for documentation only; `validator` alone decides
    /// what is valid.
    pub fn with_validator(
        name: impl Into<String>,
        document: Value,
        validator: Arc<dyn SchemaValidator>,
    ) -> Self {
        Self { name: name.into(), document, validator }
    }

    /// Operation name this schema is registered under.
    pub fn name(&self) -> &str { &self.name }

    /// The schema document, for documentation output.
    pub fn document(&self) -> &Value { &self.document }

    pub fn title(&self) -> Option<&str> {
        self.document.get("title").and_then(Value::as_str)
    }

    pub fn description(&self) -> Option<&str> {
        self.document.get("description").and_then(Value::as_str)
    }

    /// Every violation of this schema by `document`.
    pub fn validate(&self, document: &Document) -> Vec<String> {
        self.validator.validate(document)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("document", &self.document)
            .finish_non_exhaustive()
    }
}
