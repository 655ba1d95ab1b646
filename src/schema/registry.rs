use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::config::RegistryConfig;
use super::error::{Result, SchemaError};
use super::Schema;

const SCHEMA_SUFFIX: &str = ".schema.json";

/// Operation-name-keyed registry of compiled schemas.
///
/// Built once at startup from static configuration and never mutated while
/// serving; hand out [`Arc<Schema>`]s to the gates that need them.
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<Schema>>,
    config: RegistryConfig,
}

impl SchemaRegistry {
    /// Create an empty registry with default config.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty registry with explicit config.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            schemas: HashMap::new(),
            config,
        }
    }

    /// Register a schema under `name` from a JSON string.
    pub fn register(&mut self, name: &str, schema_json: &str) -> Result<Arc<Schema>> {
        let schema: Value = serde_json::from_str(schema_json)?;
        self.register_value(name, &schema)
    }

    /// Register a schema under `name` from a JSON value.
    ///
    /// Re-registering a name replaces the previous schema.
    pub fn register_value(&mut self, name: &str, schema: &Value) -> Result<Arc<Schema>> {
        let compiled = Arc::new(Schema::compile(name, schema, &self.config)?);
        self.schemas.insert(name.to_owned(), Arc::clone(&compiled));
        debug!(operation = name, "schema registered");
        Ok(compiled)
    }

    /// Load from embedded `(name, json)` pairs.
    ///
    /// ```rust
    /// use schemagate::schema::SchemaRegistry;
    ///
    /// let registry = SchemaRegistry::from_embedded(&[
    ///     ("add_todo", r#"{"type":"object","required":["title"]}"#),
    /// ]).unwrap();
    /// assert!(registry.get("add_todo").is_some());
    /// ```
    pub fn from_embedded(schemas: &[(&str, &str)]) -> Result<Self> {
        Self::from_embedded_with_config(schemas, RegistryConfig::default())
    }

    pub fn from_embedded_with_config(schemas: &[(&str, &str)], config: RegistryConfig) -> Result<Self> {
        let mut registry = Self::with_config(config);
        for (name, schema) in schemas {
            registry.register(name, schema)?;
        }
        Ok(registry)
    }

    /// Load every `<name>.schema.json` file in `path`.
    pub fn from_directory(path: &Path) -> Result<Self> {
        Self::from_directory_with_config(path, RegistryConfig::default())
    }

    /// Load every `<name>.schema.json` file in `path` with explicit config.
    ///
    /// Other files are ignored. Symlinked schema files, more than
    /// `max_schemas_from_directory` schemas, or a file over
    /// `max_schema_file_size` bytes fail the whole load.
    pub fn from_directory_with_config(path: &Path, config: RegistryConfig) -> Result<Self> {
        let mut registry = Self::with_config(config);

        let entries = std::fs::read_dir(path)
            .map_err(|err| SchemaError::LoadFailed(format!("{}: {err}", path.display())))?;

        let mut candidates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| SchemaError::LoadFailed(err.to_string()))?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let Some(name) = file_name.strip_suffix(SCHEMA_SUFFIX) else {
                continue;
            };
            if name.is_empty() {
                return Err(SchemaError::LoadFailed(format!(
                    "schema file has no operation name: {file_name}"
                )));
            }

            let file_type = entry
                .file_type()
                .map_err(|err| SchemaError::LoadFailed(err.to_string()))?;
            if file_type.is_symlink() {
                return Err(SchemaError::LoadFailed(format!(
                    "refusing to load schema symlink: {file_name}"
                )));
            }
            if file_type.is_file() {
                candidates.push((name.to_owned(), entry.path()));
            }
        }

        if candidates.len() > registry.config.max_schemas_from_directory {
            return Err(SchemaError::LoadFailed(format!(
                "schema count exceeds configured max ({}): {}",
                registry.config.max_schemas_from_directory,
                candidates.len()
            )));
        }

        candidates.sort();
        for (name, file_path) in candidates {
            let content = read_limited(&file_path, registry.config.max_schema_file_size)?;
            registry.register(&name, &content)?;
        }

        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Schema>> {
        self.schemas.get(name).cloned()
    }

    /// Like [`get`](Self::get), but a missing schema is an error.
    pub fn require(&self, name: &str) -> Result<Arc<Schema>> {
        self.get(name).ok_or_else(|| SchemaError::NoSchema(name.to_owned()))
    }

    /// Registered operation names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn read_limited(path: &Path, max_bytes: usize) -> Result<String> {
    let file = std::fs::File::open(path)
        .map_err(|err| SchemaError::LoadFailed(format!("failed opening schema {}: {err}", path.display())))?;

    let read_limit = u64::try_from(max_bytes.saturating_add(1)).unwrap_or(u64::MAX);
    let mut content = String::new();
    file.take(read_limit)
        .read_to_string(&mut content)
        .map_err(|err| SchemaError::LoadFailed(format!("failed reading schema {}: {err}", path.display())))?;

    if content.len() > max_bytes {
        return Err(SchemaError::LoadFailed(format!(
            "schema file too large (over {max_bytes} bytes): {}",
            path.display()
        )));
    }
    Ok(content)
}
