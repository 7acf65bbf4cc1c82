//! Schema loading.
//!
//! Schemas come from two sources:
//! - the embedded table compiled into the binary
//! - a JSON document (inline or on disk) that overrides embedded entries

use std::path::Path;

use serde_json::{Value, json};

use super::definition::{DefaultRule, IdKind, PropertyType, ResourceSchema};
use super::errors::SchemaError;
use super::ResourceType;

/// Properties shared by every catalog and inventory entity.
const ENTITY_STRINGS: &[&str] = &[
    "id",
    "href",
    "name",
    "description",
    "@type",
    "@baseType",
    "@schemaLocation",
];

const ENTITY_DATES: &[&str] = &["creationDate", "lastUpdate"];

fn entity(resource_type: ResourceType) -> ResourceSchema {
    ResourceSchema::new(resource_type)
        .with_properties(ENTITY_STRINGS, PropertyType::String)
        .with_properties(ENTITY_DATES, PropertyType::DateTime)
}

fn catalog_entity(resource_type: ResourceType) -> ResourceSchema {
    entity(resource_type)
        .with_properties(&["version", "lifecycleStatus"], PropertyType::String)
        .with_property("validFor", PropertyType::Object)
        .with_default("lifecycleStatus", DefaultRule::Value(json!("In design")))
}

/// Loader for resource schemas.
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaLoader;

impl SchemaLoader {
    /// Creates a loader.
    pub fn new() -> Self {
        Self
    }

    /// Returns the built-in schema table.
    pub fn load_embedded(&self) -> Vec<ResourceSchema> {
        vec![
            entity(ResourceType::Service)
                .with_base_type("Entity")
                .with_properties(
                    &["state", "category", "serviceType", "startMode", "serviceDate"],
                    PropertyType::String,
                )
                .with_properties(
                    &["isBundle", "isServiceEnabled", "hasStarted", "isStateful"],
                    PropertyType::Boolean,
                )
                .with_properties(&["startDate", "endDate"], PropertyType::DateTime)
                .with_properties(
                    &[
                        "serviceCharacteristic",
                        "serviceRelationship",
                        "supportingService",
                        "relatedParty",
                        "note",
                        "place",
                        "feature",
                        "serviceOrderItem",
                    ],
                    PropertyType::Array,
                )
                .with_property("serviceSpecification", PropertyType::Object)
                .with_partial_content(),
            catalog_entity(ResourceType::ServiceCatalog)
                .with_id_kind(IdKind::Numeric)
                .with_property("id", PropertyType::Integer)
                .with_properties(&["category", "relatedParty"], PropertyType::Array)
                .with_partial_content(),
            catalog_entity(ResourceType::ServiceCategory)
                .with_property("parentId", PropertyType::String)
                .with_property("isRoot", PropertyType::Boolean)
                .with_properties(&["category", "serviceCandidate"], PropertyType::Array)
                .with_default("isRoot", DefaultRule::Value(json!(false))),
            catalog_entity(ResourceType::ServiceCandidate)
                .with_property("category", PropertyType::Array)
                .with_property("serviceSpecification", PropertyType::Object)
                .with_required("serviceSpecification"),
            catalog_entity(ResourceType::ServiceSpecification)
                .with_property("isBundle", PropertyType::Boolean)
                .with_properties(
                    &[
                        "specCharacteristic",
                        "attachment",
                        "relatedParty",
                        "resourceSpecification",
                        "serviceSpecRelationship",
                        "serviceLevelSpecification",
                    ],
                    PropertyType::Array,
                )
                .with_property("targetServiceSchema", PropertyType::Object)
                .with_partial_content(),
            entity(ResourceType::ServiceOrder)
                .with_properties(
                    &[
                        "category",
                        "externalId",
                        "priority",
                        "state",
                        "cancellationReason",
                    ],
                    PropertyType::String,
                )
                .with_properties(
                    &[
                        "orderDate",
                        "completionDate",
                        "requestedStartDate",
                        "requestedCompletionDate",
                        "expectedCompletionDate",
                        "startDate",
                        "cancellationDate",
                    ],
                    PropertyType::DateTime,
                )
                .with_properties(
                    &[
                        "note",
                        "relatedParty",
                        "orderRelationship",
                        "serviceOrderItem",
                        "externalReference",
                    ],
                    PropertyType::Array,
                )
                .with_required("serviceOrderItem")
                .with_default("state", DefaultRule::Value(json!("acknowledged")))
                .with_default("orderDate", DefaultRule::Now)
                .with_create_excluded("completionDate")
                .with_create_excluded("expectedCompletionDate")
                .with_create_excluded("startDate")
                .with_async_create(ResourceType::Monitor)
                .with_partial_content(),
            ResourceSchema::new(ResourceType::Hub)
                .with_properties(&["id", "callback", "query"], PropertyType::String)
                .with_required("callback"),
            ResourceSchema::new(ResourceType::Monitor)
                .with_properties(
                    &["id", "href", "sourceHref", "state", "@type", "@baseType"],
                    PropertyType::String,
                )
                .with_properties(ENTITY_DATES, PropertyType::DateTime)
                .with_properties(&["request", "response"], PropertyType::Object),
            ResourceSchema::new(ResourceType::Event)
                .with_properties(&["id", "eventId", "eventType"], PropertyType::String)
                .with_property("eventTime", PropertyType::DateTime)
                .with_property("event", PropertyType::Object),
        ]
    }

    /// Parses schemas from JSON.
    ///
    /// Accepts an array of schemas, an object with a `schemas` array, or a
    /// single schema object.
    pub fn load_from_json(&self, json: &Value) -> Result<Vec<ResourceSchema>, SchemaError> {
        let items: Vec<Value> = if let Some(array) = json.as_array() {
            array.clone()
        } else if let Some(array) = json.get("schemas").and_then(|s| s.as_array()) {
            array.clone()
        } else if json.get("resourceType").is_some() {
            vec![json.clone()]
        } else {
            return Err(SchemaError::Parse {
                message: "expected a schema, an array of schemas or {\"schemas\": [...]}"
                    .to_string(),
            });
        };

        items
            .into_iter()
            .map(|item| {
                serde_json::from_value(item).map_err(|e| SchemaError::Parse {
                    message: e.to_string(),
                })
            })
            .collect()
    }

    /// Reads and parses a schema file.
    pub fn load_config(&self, path: &Path) -> Result<Vec<ResourceSchema>, SchemaError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| SchemaError::ConfigLoadFailed {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        let json: Value =
            serde_json::from_str(&content).map_err(|e| SchemaError::ConfigLoadFailed {
                path: path.display().to_string(),
                message: format!("invalid JSON: {}", e),
            })?;

        self.load_from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_covers_every_type() {
        let schemas = SchemaLoader::new().load_embedded();
        for rt in ResourceType::ALL {
            assert!(
                schemas.iter().any(|s| s.resource_type == rt),
                "missing embedded schema for {}",
                rt
            );
        }
    }

    #[test]
    fn test_service_order_contract() {
        let schemas = SchemaLoader::new().load_embedded();
        let order = schemas
            .iter()
            .find(|s| s.resource_type == ResourceType::ServiceOrder)
            .unwrap();
        assert!(order.has_href());
        assert!(order.async_create.is_some());
        assert_eq!(order.required, vec!["serviceOrderItem".to_string()]);
        assert_eq!(order.property_type("orderDate"), Some(PropertyType::DateTime));
    }

    #[test]
    fn test_load_from_json_forms() {
        let loader = SchemaLoader::new();
        let single = json!({"resourceType": "Hub", "properties": {"callback": "string"}});
        assert_eq!(loader.load_from_json(&single).unwrap().len(), 1);

        let wrapped = json!({"schemas": [single.clone(), {"resourceType": "Monitor"}]});
        assert_eq!(loader.load_from_json(&wrapped).unwrap().len(), 2);

        assert!(loader.load_from_json(&json!({"foo": 1})).is_err());
        assert!(
            loader
                .load_from_json(&json!([{"resourceType": "Patient"}]))
                .is_err()
        );
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = SchemaLoader::new()
            .load_config(Path::new("/nonexistent/schemas.json"))
            .unwrap_err();
        assert!(matches!(err, SchemaError::ConfigLoadFailed { .. }));
    }
}
