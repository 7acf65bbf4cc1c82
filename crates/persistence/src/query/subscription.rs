//! Hub subscription filters.
//!
//! A hub's `query` uses the criterion grammar of list requests in strict
//! form-urlencoded shape: `eventType=ServiceCreationNotification&event.service.state=active`.
//! Anything that does not parse cleanly is rejected so the hub matches nothing,
//! including an operator suffix list queries would drop.

use url::form_urlencoded;

use crate::error::ValidationError;
use crate::schema::ResourceSchema;
use crate::types::Criteria;

use super::builder::{UnknownOperator, criteria_from_pairs};

/// Parses a subscription filter into criteria against the given schema.
///
/// Empty text, an empty key or an empty value is an error.
pub fn parse_subscription_filter(
    text: &str,
    schema: &ResourceSchema,
) -> Result<Criteria, ValidationError> {
    let text = text.trim();
    let text = text.strip_prefix('?').unwrap_or(text);
    if text.is_empty() {
        return Err(invalid("filter is empty"));
    }

    let mut pairs = Vec::new();
    for piece in text.split('&') {
        let (key, value) = form_urlencoded::parse(piece.as_bytes())
            .next()
            .ok_or_else(|| invalid("empty clause"))?;
        if !piece.contains('=') {
            return Err(invalid(&format!("clause '{}' has no value", piece)));
        }
        if key.trim().is_empty() {
            return Err(invalid(&format!("clause '{}' has no key", piece)));
        }
        if value.trim().is_empty() {
            return Err(invalid(&format!("clause '{}' has no value", piece)));
        }
        pairs.push((key.into_owned(), value.into_owned()));
    }

    let criteria = criteria_from_pairs(
        pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        schema,
        UnknownOperator::Reject,
    )?;
    if criteria.is_empty() {
        return Err(invalid("filter has no usable criteria"));
    }
    Ok(criteria)
}

fn invalid(message: &str) -> ValidationError {
    ValidationError::InvalidFilter {
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ResourceType, SchemaRegistry};
    use crate::types::{Condition, FieldValue};

    fn event_schema() -> ResourceSchema {
        SchemaRegistry::embedded()
            .get(ResourceType::Event)
            .unwrap()
            .clone()
    }

    #[test]
    fn test_parses_event_type_filter() {
        let criteria =
            parse_subscription_filter("eventType=ServiceCreationNotification", &event_schema())
                .unwrap();
        assert_eq!(
            criteria.get("eventType"),
            Some(&vec![Condition::Eq(FieldValue::from(
                "ServiceCreationNotification"
            ))])
        );
    }

    #[test]
    fn test_decodes_and_combines_clauses() {
        let criteria = parse_subscription_filter(
            "?eventType=ServiceCreationNotification,ServiceRemoveNotification&event.service.name=svc%201",
            &event_schema(),
        )
        .unwrap();
        assert_eq!(criteria.len(), 2);
        assert_eq!(
            criteria.get("event.service.name"),
            Some(&vec![Condition::Eq(FieldValue::from("svc 1"))])
        );
        assert!(matches!(
            criteria.get("eventType").map(|c| &c[0]),
            Some(Condition::In(values)) if values.len() == 2
        ));
    }

    #[test]
    fn test_rejects_unknown_operator_suffix() {
        let err = parse_subscription_filter(
            "eventType.like=ServiceRemoveNotification&event.service.name=svc1",
            &event_schema(),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidFilter { .. }));
    }

    #[test]
    fn test_rejects_malformed_filters() {
        for text in ["", "   ", "eventType", "eventType=", "=x", "a=1&&b=2", "eventTime.gt=never"] {
            assert!(
                parse_subscription_filter(text, &event_schema()).is_err(),
                "expected rejection of {:?}",
                text
            );
        }
    }
}
