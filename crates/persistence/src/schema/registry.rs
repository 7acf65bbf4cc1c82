//! Load-time schema registry.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::ValidationError;

use super::ResourceType;
use super::definition::ResourceSchema;
use super::errors::SchemaError;
use super::loader::SchemaLoader;

/// Registry of resource schemas keyed by [`ResourceType`].
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<ResourceType, ResourceSchema>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the embedded schema table.
    pub fn embedded() -> Self {
        let mut registry = Self::new();
        for schema in SchemaLoader::new().load_embedded() {
            registry.schemas.insert(schema.resource_type, schema);
        }
        registry
    }

    /// Creates a registry from the embedded table with JSON overrides applied.
    pub fn load_from_json(json: &Value) -> Result<Self, SchemaError> {
        let mut registry = Self::embedded();
        for schema in SchemaLoader::new().load_from_json(json)? {
            registry.replace(schema);
        }
        Ok(registry)
    }

    /// Creates a registry from the embedded table with overrides read from a file.
    pub fn load_from_path(path: &Path) -> Result<Self, SchemaError> {
        let mut registry = Self::embedded();
        for schema in SchemaLoader::new().load_config(path)? {
            registry.replace(schema);
        }
        Ok(registry)
    }

    /// Registers a schema, refusing to overwrite an existing one.
    pub fn register(&mut self, schema: ResourceSchema) -> Result<(), SchemaError> {
        if self.schemas.contains_key(&schema.resource_type) {
            return Err(SchemaError::Duplicate {
                resource_type: schema.resource_type,
            });
        }
        self.schemas.insert(schema.resource_type, schema);
        Ok(())
    }

    /// Registers a schema, overwriting any existing one.
    pub fn replace(&mut self, schema: ResourceSchema) {
        debug!(resource_type = %schema.resource_type, "Registering schema");
        self.schemas.insert(schema.resource_type, schema);
    }

    /// Returns the schema for a type.
    pub fn get(&self, resource_type: ResourceType) -> Result<&ResourceSchema, ValidationError> {
        self.schemas
            .get(&resource_type)
            .ok_or_else(|| ValidationError::UnsupportedResourceType {
                resource_type: resource_type.to_string(),
            })
    }

    /// Returns true if a schema is registered for the type.
    pub fn contains(&self, resource_type: ResourceType) -> bool {
        self.schemas.contains_key(&resource_type)
    }

    /// Number of registered schemas.
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Returns true if no schemas are registered.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_embedded_registry() {
        let registry = SchemaRegistry::embedded();
        assert_eq!(registry.len(), ResourceType::ALL.len());
        assert!(registry.get(ResourceType::Service).unwrap().has_href());
    }

    #[test]
    fn test_missing_schema_is_unsupported() {
        let registry = SchemaRegistry::new();
        let err = registry.get(ResourceType::Service).unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedResourceType { .. }));
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = SchemaRegistry::embedded();
        let err = registry
            .register(ResourceSchema::new(ResourceType::Hub))
            .unwrap_err();
        assert!(matches!(err, SchemaError::Duplicate { .. }));
    }

    #[test]
    fn test_json_overrides_embedded() {
        let registry = SchemaRegistry::load_from_json(&json!([{
            "resourceType": "Service",
            "properties": {"id": "string", "name": "string"},
            "required": ["name"]
        }]))
        .unwrap();

        let service = registry.get(ResourceType::Service).unwrap();
        assert_eq!(service.required, vec!["name".to_string()]);
        assert!(!service.has_href());
        assert!(registry.contains(ResourceType::ServiceOrder));
    }
}
