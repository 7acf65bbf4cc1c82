//! Payload preparation: type coercion, server-stamped attributes, business
//! defaults and cleanup of internal fields.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use tracing::debug;

use tmf_persistence::schema::{DefaultRule, PropertyType, ResourceSchema};
use tmf_persistence::types::{format_datetime, parse_datetime};

use crate::context::RequestContext;
use crate::error::{ServiceError, ServiceResult};

/// Returns the payload as an object map, or a 400.
pub fn as_object(payload: Value) -> ServiceResult<Map<String, Value>> {
    match payload {
        Value::Object(map) => Ok(map),
        other => Err(ServiceError::bad_request(format!(
            "request body must be a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Converts string-encoded values to the declared property type.
///
/// Numbers and booleans sent as strings are converted; date-times are
/// normalized to RFC 3339 UTC with milliseconds. Values that do not parse
/// are left as sent.
pub fn coerce_payload(doc: &mut Map<String, Value>, schema: &ResourceSchema) {
    for (name, value) in doc.iter_mut() {
        let Some(ty) = schema.property_type(name) else {
            continue;
        };
        if let Some(coerced) = coerce_value(value, ty) {
            *value = coerced;
        }
    }
}

fn coerce_value(value: &Value, ty: PropertyType) -> Option<Value> {
    let Value::String(s) = value else {
        return None;
    };
    let trimmed = s.trim();
    match ty {
        PropertyType::Integer => trimmed.parse::<i64>().ok().map(Value::from),
        PropertyType::Number => trimmed
            .parse::<i64>()
            .ok()
            .map(Value::from)
            .or_else(|| {
                trimmed
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
            }),
        PropertyType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        PropertyType::DateTime => {
            parse_datetime(trimmed).map(|dt| Value::String(format_datetime(&dt)))
        }
        _ => None,
    }
}

/// Stamps the server-owned attributes of a new document.
///
/// `id` is always generated. `href` is derived when the schema declares it
/// and the caller omitted it. `creationDate` and `lastUpdate` are stamped
/// when declared. `@type` and `@baseType` are filled in if absent.
pub fn stamp_common(
    doc: &mut Map<String, Value>,
    schema: &ResourceSchema,
    ctx: &RequestContext,
    now: DateTime<Utc>,
) {
    let id = schema.id_kind.generate();
    let id_text = match &id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    doc.insert("id".to_string(), id);

    if schema.has_href() && !doc.contains_key("href") {
        doc.insert(
            "href".to_string(),
            Value::String(format!("{}/{}", ctx.collection_url(), id_text)),
        );
    }

    let stamp = Value::String(format_datetime(&now));
    for field in ["creationDate", "lastUpdate"] {
        if schema.properties.contains_key(field) {
            doc.insert(field.to_string(), stamp.clone());
        }
    }

    if schema.properties.contains_key("@type") {
        doc.entry("@type")
            .or_insert_with(|| Value::String(schema.resource_type.to_string()));
    }
    if let Some(base_type) = &schema.base_type {
        doc.entry("@baseType")
            .or_insert_with(|| Value::String(base_type.clone()));
    }
}

/// Applies the schema's business defaults to absent properties.
pub fn apply_defaults(doc: &mut Map<String, Value>, schema: &ResourceSchema, now: DateTime<Utc>) {
    for (name, rule) in &schema.defaults {
        if doc.contains_key(name) {
            continue;
        }
        let value = match rule {
            DefaultRule::Value(v) => v.clone(),
            DefaultRule::Now => Value::String(format_datetime(&now)),
            DefaultRule::Uuid => Value::String(uuid::Uuid::new_v4().to_string()),
        };
        doc.insert(name.clone(), value);
    }
}

/// Fills required-but-missing properties with generated sample values.
pub fn fill_required_samples(
    doc: &mut Map<String, Value>,
    schema: &ResourceSchema,
    now: DateTime<Utc>,
) {
    for name in &schema.required {
        if doc.contains_key(name) {
            continue;
        }
        let sample = match schema.property_type(name) {
            Some(PropertyType::Integer) | Some(PropertyType::Number) => json!(0),
            Some(PropertyType::Boolean) => json!(false),
            Some(PropertyType::DateTime) => Value::String(format_datetime(&now)),
            Some(PropertyType::Object) => json!({}),
            Some(PropertyType::Array) => json!([{}]),
            Some(PropertyType::String) | None => Value::String(format!("sample-{}", name)),
        };
        debug!(resource_type = %schema.resource_type, property = %name, "Filling required property with sample value");
        doc.insert(name.clone(), sample);
    }
}

/// Fails with 400 naming the first required property that is missing.
pub fn check_required(doc: &Map<String, Value>, schema: &ResourceSchema) -> ServiceResult<()> {
    match schema.required.iter().find(|name| !doc.contains_key(*name)) {
        Some(field) => Err(ServiceError::bad_request(format!(
            "missing required field: {}",
            field
        ))),
        None => Ok(()),
    }
}

/// Removes properties a caller may not set on create.
pub fn strip_create_excluded(doc: &mut Map<String, Value>, schema: &ResourceSchema) {
    for name in &schema.create_excluded {
        doc.remove(name);
    }
}

/// Prepares an update or patch body: coerces it, drops the identity fields
/// and stamps `lastUpdate` when declared.
pub fn prepare_modification(
    payload: Value,
    schema: &ResourceSchema,
    now: DateTime<Utc>,
) -> ServiceResult<Map<String, Value>> {
    let mut doc = as_object(payload)?;
    coerce_payload(&mut doc, schema);
    doc.remove("id");
    doc.remove("href");
    doc.remove("creationDate");
    if schema.properties.contains_key("lastUpdate") {
        doc.insert(
            "lastUpdate".to_string(),
            Value::String(format_datetime(&now)),
        );
    }
    Ok(doc)
}

/// Removes every field whose name starts with `_`, at any depth.
pub fn strip_internal_fields(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|key, _| !key.starts_with('_'));
            map.values_mut().for_each(strip_internal_fields);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_internal_fields),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use tmf_persistence::schema::{IdKind, ResourceType, SchemaRegistry};

    fn schema(rt: ResourceType) -> ResourceSchema {
        SchemaRegistry::embedded().get(rt).unwrap().clone()
    }

    fn object(value: Value) -> Map<String, Value> {
        as_object(value).unwrap()
    }

    #[test]
    fn test_as_object_rejects_non_objects() {
        assert!(as_object(json!([1])).is_err());
        assert!(as_object(json!("x")).is_err());
        assert!(as_object(json!({})).is_ok());
    }

    #[test]
    fn test_coerce_payload() {
        let schema = schema(ResourceType::Service);
        let mut doc = object(json!({
            "isBundle": "TRUE",
            "startDate": "2024-03-01T10:00:00+02:00",
            "endDate": "whenever",
            "name": "fiber",
            "unknown": "1"
        }));
        coerce_payload(&mut doc, &schema);
        assert_eq!(doc["isBundle"], json!(true));
        assert_eq!(doc["startDate"], json!("2024-03-01T08:00:00.000Z"));
        assert_eq!(doc["endDate"], json!("whenever"));
        assert_eq!(doc["unknown"], json!("1"));
    }

    #[test]
    fn test_coerce_numbers() {
        assert_eq!(coerce_value(&json!("42"), PropertyType::Integer), Some(json!(42)));
        assert_eq!(coerce_value(&json!("1.5"), PropertyType::Number), Some(json!(1.5)));
        assert_eq!(coerce_value(&json!("x"), PropertyType::Number), None);
        assert_eq!(coerce_value(&json!(7), PropertyType::Integer), None);
    }

    #[test]
    fn test_stamp_common() {
        let schema = schema(ResourceType::Service);
        let ctx = RequestContext::new(ResourceType::Service, "createService", Method::POST)
            .with_base_url("http://x/tmf-api")
            .with_path("/serviceInventory/v4/service");
        let now = parse_datetime("2024-05-01T00:00:00Z").unwrap();
        let mut doc = object(json!({"id": "caller-id", "name": "svc1"}));

        stamp_common(&mut doc, &schema, &ctx, now);

        let id = doc["id"].as_str().unwrap().to_string();
        assert_ne!(id, "caller-id");
        assert_eq!(
            doc["href"],
            json!(format!("http://x/tmf-api/serviceInventory/v4/service/{}", id))
        );
        assert_eq!(doc["creationDate"], json!("2024-05-01T00:00:00.000Z"));
        assert_eq!(doc["lastUpdate"], doc["creationDate"]);
        assert_eq!(doc["@type"], json!("Service"));
        assert_eq!(doc["@baseType"], json!("Entity"));
    }

    #[test]
    fn test_stamp_keeps_caller_type() {
        let schema = schema(ResourceType::Service);
        let ctx = RequestContext::new(ResourceType::Service, "createService", Method::POST);
        let mut doc = object(json!({"@type": "FiberService"}));
        stamp_common(&mut doc, &schema, &ctx, Utc::now());
        assert_eq!(doc["@type"], json!("FiberService"));
    }

    #[test]
    fn test_numeric_ids() {
        let schema = schema(ResourceType::ServiceCatalog);
        assert_eq!(schema.id_kind, IdKind::Numeric);
        let ctx = RequestContext::new(ResourceType::ServiceCatalog, "create", Method::POST);
        let mut doc = Map::new();
        stamp_common(&mut doc, &schema, &ctx, Utc::now());
        let id = doc["id"].as_u64().unwrap();
        assert!(doc["href"].as_str().unwrap().ends_with(&format!("/{}", id)));
    }

    #[test]
    fn test_defaults_and_exclusions() {
        let schema = schema(ResourceType::ServiceOrder);
        let now = parse_datetime("2024-05-01T00:00:00Z").unwrap();
        let mut doc = object(json!({"state": "inProgress", "completionDate": "2024-01-01"}));

        apply_defaults(&mut doc, &schema, now);
        strip_create_excluded(&mut doc, &schema);

        assert_eq!(doc["state"], json!("inProgress"));
        assert_eq!(doc["orderDate"], json!("2024-05-01T00:00:00.000Z"));
        assert!(!doc.contains_key("completionDate"));
    }

    #[test]
    fn test_required_samples() {
        let schema = schema(ResourceType::ServiceOrder);
        let mut doc = Map::new();
        assert!(check_required(&doc, &schema).is_err());

        fill_required_samples(&mut doc, &schema, Utc::now());
        assert_eq!(doc["serviceOrderItem"], json!([{}]));
        assert!(check_required(&doc, &schema).is_ok());
    }

    #[test]
    fn test_prepare_modification() {
        let schema = schema(ResourceType::Service);
        let now = parse_datetime("2024-05-01T00:00:00Z").unwrap();
        let doc = prepare_modification(
            json!({"id": "other", "href": "x", "isBundle": "false", "state": "active"}),
            &schema,
            now,
        )
        .unwrap();
        assert!(!doc.contains_key("id"));
        assert!(!doc.contains_key("href"));
        assert_eq!(doc["isBundle"], json!(false));
        assert_eq!(doc["lastUpdate"], json!("2024-05-01T00:00:00.000Z"));
    }

    #[test]
    fn test_strip_internal_fields() {
        let mut doc = json!({
            "_id": "abc",
            "name": "x",
            "nested": {"_rev": 1, "keep": true},
            "items": [{"_id": 1, "id": "i"}]
        });
        strip_internal_fields(&mut doc);
        assert_eq!(
            doc,
            json!({"name": "x", "nested": {"keep": true}, "items": [{"id": "i"}]})
        );
    }
}
