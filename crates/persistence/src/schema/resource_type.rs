//! The closed set of resource types the broker serves.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::errors::SchemaError;

/// A resource type known to the schema registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceType {
    /// A service instance.
    Service,
    /// A catalog of service specifications.
    ServiceCatalog,
    /// A grouping of catalog entries.
    ServiceCategory,
    /// A service specification offered through a category.
    ServiceCandidate,
    /// The specification a service is built from.
    ServiceSpecification,
    /// An order to provision or change services.
    ServiceOrder,
    /// A webhook subscription.
    Hub,
    /// An in-flight asynchronous operation.
    Monitor,
    /// A transient event document used during fan-out.
    Event,
}

impl ResourceType {
    /// Every resource type, in declaration order.
    pub const ALL: [ResourceType; 9] = [
        ResourceType::Service,
        ResourceType::ServiceCatalog,
        ResourceType::ServiceCategory,
        ResourceType::ServiceCandidate,
        ResourceType::ServiceSpecification,
        ResourceType::ServiceOrder,
        ResourceType::Hub,
        ResourceType::Monitor,
        ResourceType::Event,
    ];

    /// The type name as it appears in `@type` and event types.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Service => "Service",
            ResourceType::ServiceCatalog => "ServiceCatalog",
            ResourceType::ServiceCategory => "ServiceCategory",
            ResourceType::ServiceCandidate => "ServiceCandidate",
            ResourceType::ServiceSpecification => "ServiceSpecification",
            ResourceType::ServiceOrder => "ServiceOrder",
            ResourceType::Hub => "Hub",
            ResourceType::Monitor => "Monitor",
            ResourceType::Event => "Event",
        }
    }

    /// The storage collection (lowercased type name).
    pub fn collection(&self) -> String {
        self.as_str().to_lowercase()
    }

    /// The key a document is nested under inside an event (`serviceOrder`).
    pub fn event_key(&self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_lowercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    /// Returns true for types the broker itself manages.
    pub fn is_internal(&self) -> bool {
        matches!(self, ResourceType::Hub | ResourceType::Event)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceType::ALL
            .iter()
            .find(|rt| rt.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| SchemaError::UnknownResourceType {
                name: s.to_string(),
            })
    }
}

impl Serialize for ResourceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResourceType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
