//! Event envelopes and change classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use tmf_persistence::schema::ResourceType;
use tmf_persistence::types::format_datetime;

/// The service verb that produced a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// List a collection.
    List,
    /// Retrieve one resource.
    Show,
    /// Create a resource.
    Create,
    /// Replace a resource.
    Update,
    /// Merge into a resource.
    Patch,
    /// Delete a resource.
    Remove,
}

impl Verb {
    /// Returns true for verbs that do not change state.
    pub fn is_read(&self) -> bool {
        matches!(self, Verb::List | Verb::Show)
    }
}

/// The kind of change an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A resource was created.
    Creation,
    /// A resource was deleted.
    Remove,
    /// A resource changed without a state transition.
    AttributeValueChange,
    /// A state field changed.
    StateChange,
}

impl EventKind {
    fn suffix(&self) -> &'static str {
        match self {
            EventKind::Creation => "Creation",
            EventKind::Remove => "Remove",
            EventKind::AttributeValueChange => "AttributeValueChange",
            EventKind::StateChange => "StateChange",
        }
    }

    /// The event type name, e.g. `ServiceOrderStateChangeNotification`.
    pub fn event_type(&self, resource_type: ResourceType) -> String {
        format!("{}{}Notification", resource_type.as_str(), self.suffix())
    }
}

/// Classifies a change.
///
/// Read verbs produce nothing. An update or patch is a state change when any
/// of `state_fields` differs between `before` and `after`.
pub fn classify(
    verb: Verb,
    before: Option<&Value>,
    after: Option<&Value>,
    state_fields: &[String],
) -> Option<EventKind> {
    match verb {
        Verb::List | Verb::Show => None,
        Verb::Create => Some(EventKind::Creation),
        Verb::Remove => Some(EventKind::Remove),
        Verb::Update | Verb::Patch => {
            let changed = state_fields.iter().any(|field| {
                let old = before.and_then(|doc| doc.get(field));
                let new = after.and_then(|doc| doc.get(field));
                old != new
            });
            if changed {
                Some(EventKind::StateChange)
            } else {
                Some(EventKind::AttributeValueChange)
            }
        }
    }
}

/// A change notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    /// Unique event id.
    pub event_id: String,
    /// RFC 3339 time the event was raised.
    pub event_time: String,
    /// `<Type><Kind>Notification`.
    pub event_type: String,
    /// `{ <eventKey>: <document> }`.
    pub event: Map<String, Value>,
}

impl EventEnvelope {
    /// Wraps a document in a new envelope.
    pub fn new(resource_type: ResourceType, kind: EventKind, doc: Value) -> Self {
        Self::at(resource_type, kind, doc, Utc::now())
    }

    /// Wraps a document in a new envelope raised at `time`.
    pub fn at(resource_type: ResourceType, kind: EventKind, doc: Value, time: DateTime<Utc>) -> Self {
        let mut event = Map::new();
        event.insert(resource_type.event_key(), doc);
        Self {
            event_id: Uuid::new_v4().to_string(),
            event_time: format_datetime(&time),
            event_type: kind.event_type(resource_type),
            event,
        }
    }

    /// The wrapped document.
    pub fn resource(&self) -> Option<&Value> {
        self.event.values().next()
    }

    /// The envelope as a JSON value.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("eventId".to_string(), Value::String(self.event_id.clone()));
        map.insert("eventTime".to_string(), Value::String(self.event_time.clone()));
        map.insert("eventType".to_string(), Value::String(self.event_type.clone()));
        map.insert("event".to_string(), Value::Object(self.event.clone()));
        Value::Object(map)
    }

    /// The transient event document: the envelope keyed by `id = eventId`.
    pub fn to_document(&self) -> Value {
        let mut doc = self.to_value();
        if let Some(map) = doc.as_object_mut() {
            map.insert("id".to_string(), Value::String(self.event_id.clone()));
        }
        doc
    }
}
