//! Resource schema definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::ResourceType;

/// Property types a schema can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyType {
    /// Free text.
    String,
    /// Whole number.
    Integer,
    /// Any number.
    Number,
    /// `true` or `false`.
    Boolean,
    /// RFC 3339 instant.
    DateTime,
    /// Nested object.
    Object,
    /// List of values.
    Array,
}

impl PropertyType {
    /// Returns true for types a query criterion can address directly.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, PropertyType::Object | PropertyType::Array)
    }
}

/// How identifiers are generated for a resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum IdKind {
    /// String UUID v4.
    #[default]
    Uuid,
    /// Positive integer.
    Numeric,
}

impl IdKind {
    /// Generates a fresh identifier of this kind.
    ///
    /// Numeric ids are drawn from a v4 UUID and kept within 53 bits so they
    /// survive a round trip through any JSON number.
    pub fn generate(&self) -> Value {
        let uuid = Uuid::new_v4();
        match self {
            IdKind::Uuid => Value::String(uuid.to_string()),
            IdKind::Numeric => {
                let n = (uuid.as_u128() as u64) & ((1u64 << 53) - 1);
                Value::from(n.max(1))
            }
        }
    }
}

/// An assignment rule applied on create when the property is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum DefaultRule {
    /// A fixed value.
    Value(Value),
    /// The current instant.
    Now,
    /// A fresh UUID.
    Uuid,
}

/// Declares that creates of this type may complete asynchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsyncContract {
    /// The type used to track the in-flight operation.
    pub monitor: ResourceType,
}

fn default_state_fields() -> Vec<String> {
    vec!["state".to_string(), "status".to_string()]
}

/// The load-time schema of one resource type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSchema {
    /// The type this schema describes.
    pub resource_type: ResourceType,

    /// Value stamped into `@baseType` on create.
    #[serde(default)]
    pub base_type: Option<String>,

    /// Declared top-level properties.
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyType>,

    /// Properties every document must carry.
    #[serde(default)]
    pub required: Vec<String>,

    /// How ids are generated.
    #[serde(default)]
    pub id_kind: IdKind,

    /// Business defaults applied on create.
    #[serde(default)]
    pub defaults: BTreeMap<String, DefaultRule>,

    /// Properties a caller may not set on create.
    #[serde(default)]
    pub create_excluded: Vec<String>,

    /// Whether the list operation declares a 206 response.
    #[serde(default)]
    pub partial_content: bool,

    /// Present when create may answer 202 with a monitor.
    #[serde(default)]
    pub async_create: Option<AsyncContract>,

    /// Fields whose change turns an update into a state change event.
    #[serde(default = "default_state_fields")]
    pub state_fields: Vec<String>,
}

impl ResourceSchema {
    /// Creates a schema with no properties.
    pub fn new(resource_type: ResourceType) -> Self {
        Self {
            resource_type,
            base_type: None,
            properties: BTreeMap::new(),
            required: Vec::new(),
            id_kind: IdKind::Uuid,
            defaults: BTreeMap::new(),
            create_excluded: Vec::new(),
            partial_content: false,
            async_create: None,
            state_fields: default_state_fields(),
        }
    }

    /// Declares a property.
    pub fn with_property(mut self, name: impl Into<String>, ty: PropertyType) -> Self {
        self.properties.insert(name.into(), ty);
        self
    }

    /// Declares several properties of the same type.
    pub fn with_properties(mut self, names: &[&str], ty: PropertyType) -> Self {
        for name in names {
            self.properties.insert((*name).to_string(), ty);
        }
        self
    }

    /// Marks a property as required.
    pub fn with_required(mut self, name: impl Into<String>) -> Self {
        self.required.push(name.into());
        self
    }

    /// Adds an assignment rule.
    pub fn with_default(mut self, name: impl Into<String>, rule: DefaultRule) -> Self {
        self.defaults.insert(name.into(), rule);
        self
    }

    /// Excludes a property from the create shape.
    pub fn with_create_excluded(mut self, name: impl Into<String>) -> Self {
        self.create_excluded.push(name.into());
        self
    }

    /// Sets the `@baseType` stamped on create.
    pub fn with_base_type(mut self, base_type: impl Into<String>) -> Self {
        self.base_type = Some(base_type.into());
        self
    }

    /// Sets the identifier kind.
    pub fn with_id_kind(mut self, id_kind: IdKind) -> Self {
        self.id_kind = id_kind;
        self
    }

    /// Declares a 206 response for list.
    pub fn with_partial_content(mut self) -> Self {
        self.partial_content = true;
        self
    }

    /// Declares the async create contract with the given monitor type.
    pub fn with_async_create(mut self, monitor: ResourceType) -> Self {
        self.async_create = Some(AsyncContract { monitor });
        self
    }

    /// Returns true if documents of this type carry an `href`.
    pub fn has_href(&self) -> bool {
        self.properties.contains_key("href")
    }

    /// Returns the declared type of a top-level property.
    pub fn property_type(&self, name: &str) -> Option<PropertyType> {
        self.properties.get(name).copied()
    }

    /// Returns the type of a property if it is a scalar.
    ///
    /// Dotted paths resolve through their first segment only; a path into an
    /// object or array has no scalar type.
    pub fn scalar_type(&self, path: &str) -> Option<PropertyType> {
        if path.contains('.') {
            return None;
        }
        self.property_type(path).filter(PropertyType::is_scalar)
    }

    /// Returns true if the property is declared as a scalar.
    pub fn is_scalar(&self, name: &str) -> bool {
        self.scalar_type(name).is_some()
    }

    /// Returns true if the field participates in state-change detection.
    pub fn is_state_field(&self, name: &str) -> bool {
        self.state_fields.iter().any(|f| f == name)
    }
}
