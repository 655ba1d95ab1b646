/// JSON Schema dialect used to compile registered schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaDraft {
    Draft4,
    Draft6,
    Draft7,
    Draft201909,
    Draft202012,
}

impl SchemaDraft {
    pub(crate) fn as_jsonschema(self) -> jsonschema::Draft {
        match self {
            Self::Draft4      => jsonschema::Draft::Draft4,
            Self::Draft6      => jsonschema::Draft::Draft6,
            Self::Draft7      => jsonschema::Draft::Draft7,
            Self::Draft201909 => jsonschema::Draft::Draft201909,
            Self::Draft202012 => jsonschema::Draft::Draft202012,
        }
    }
}

/// Controls how schemas are compiled and loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Dialect for compiled schemas. Defaults to Draft 4.
    pub draft: SchemaDraft,
    /// When true, object schemas that do not mention `additionalProperties`
    /// reject undeclared fields.
    pub strict_mode: bool,
    /// Maximum number of schemas loaded from a directory.
    pub max_schemas_from_directory: usize,
    /// Maximum bytes allowed per schema file loaded from a directory.
    pub max_schema_file_size: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            draft: SchemaDraft::Draft4,
            strict_mode: false,
            max_schemas_from_directory: 256,
            max_schema_file_size: 256 * 1024,
        }
    }
}
