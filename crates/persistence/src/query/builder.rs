//! Translation of request arguments into a [`Query`].
//!
//! Reserved keys:
//!
//! | Key      | Meaning                                   |
//! |----------|-------------------------------------------|
//! | `fields` | comma-separated projection                |
//! | `offset` | rows to skip                              |
//! | `limit`  | page size (defaulted and clamped)         |
//! | `sort`   | `field,-field2,+field3`                   |
//! | `filter` | post-filter expression ([`PathFilter`])   |
//!
//! Every other key is a criterion. `field.gte=...` style suffixes become
//! operator conditions when `field` is a scalar property of the schema, and
//! comma-separated values become `In`.

use std::collections::BTreeMap;

use chrono::SubsecRound;
use tracing::{debug, warn};

use crate::error::ValidationError;
use crate::schema::{PropertyType, ResourceSchema};
use crate::types::{
    Condition, Criteria, FieldValue, OPERATOR_SUFFIXES, Query, SortDirective, parse_datetime,
};

use super::filter::PathFilter;

/// Fields every non-empty projection carries.
pub const MANDATORY_FIELDS: &[&str] = &["id", "href", "@type"];

const RESERVED_KEYS: &[&str] = &["fields", "offset", "limit", "sort", "filter"];

/// Default page size.
pub const DEFAULT_LIMIT: u64 = 100;

/// Page size ceiling.
pub const MAX_LIMIT: u64 = 1000;

/// Builds queries from flat request arguments.
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder {
    default_limit: u64,
    max_limit: u64,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT, MAX_LIMIT)
    }
}

impl QueryBuilder {
    /// Creates a builder with the given page size default and ceiling.
    pub fn new(default_limit: u64, max_limit: u64) -> Self {
        Self {
            default_limit: default_limit.min(max_limit),
            max_limit,
        }
    }

    /// The configured page size ceiling.
    pub fn max_limit(&self) -> u64 {
        self.max_limit
    }

    /// Builds a query from request arguments.
    pub fn build(
        &self,
        args: &BTreeMap<String, String>,
        schema: &ResourceSchema,
    ) -> Result<Query, ValidationError> {
        let mut query = Query::new();

        if let Some(fields) = args.get("fields") {
            query = query.with_projection(
                fields
                    .split(',')
                    .map(str::trim)
                    .filter(|f| !f.is_empty()),
            );
        }

        if let Some(offset) = args.get("offset") {
            query.options.skip = parse_count("offset", offset)?;
        }

        let limit = match args.get("limit") {
            Some(limit) => parse_count("limit", limit)?,
            None => self.default_limit,
        };
        if limit > self.max_limit {
            debug!(requested = limit, max = self.max_limit, "Clamping limit");
        }
        query.options.limit = Some(limit.min(self.max_limit));

        if let Some(sort) = args.get("sort") {
            query.sorting = SortDirective::parse_list(sort);
        }

        if let Some(filter) = args.get("filter").filter(|f| !f.trim().is_empty()) {
            query.post_filter = Some(PathFilter::parse(filter)?);
        }

        for (key, value) in args {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            if let Some((path, condition)) =
                criterion(key, value, schema, UnknownOperator::Drop)?
            {
                query.criteria.add(path, condition);
            }
        }

        Ok(query)
    }
}

/// Adds the identity and schema-required fields to a non-empty projection.
pub fn add_mandatory_projection_fields(mut query: Query, schema: &ResourceSchema) -> Query {
    if query.options.projection.is_empty() {
        return query;
    }
    let projection = &mut query.options.projection;
    projection.extend(MANDATORY_FIELDS.iter().map(|f| (*f).to_string()));
    projection.extend(schema.required.iter().cloned());
    query
}

/// How a criterion with an unsupported operator suffix is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnknownOperator {
    /// Log and skip the criterion.
    Drop,
    /// Fail with [`ValidationError::InvalidFilter`].
    Reject,
}

/// Builds criteria from `(key, value)` pairs using the criterion rules.
pub(crate) fn criteria_from_pairs<'a, I>(
    pairs: I,
    schema: &ResourceSchema,
    unknown: UnknownOperator,
) -> Result<Criteria, ValidationError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut criteria = Criteria::new();
    for (key, value) in pairs {
        if let Some((path, condition)) = criterion(key, value, schema, unknown)? {
            criteria.add(path, condition);
        }
    }
    Ok(criteria)
}

/// Interprets one criterion key/value pair.
///
/// Returns `None` when the key carries an unsupported operator suffix and
/// `unknown` is [`UnknownOperator::Drop`].
fn criterion(
    key: &str,
    value: &str,
    schema: &ResourceSchema,
    unknown: UnknownOperator,
) -> Result<Option<(String, Condition)>, ValidationError> {
    if let Some((prefix, suffix)) = key.rsplit_once('.') {
        if let Some(ty) = schema.scalar_type(prefix) {
            if !OPERATOR_SUFFIXES.contains(&suffix) {
                if unknown == UnknownOperator::Reject {
                    return Err(ValidationError::InvalidFilter {
                        message: format!("unsupported operator '{}' in '{}'", suffix, key),
                    });
                }
                warn!(
                    resource_type = %schema.resource_type,
                    parameter = key,
                    "Dropping criterion with unsupported operator"
                );
                return Ok(None);
            }
            let condition = if suffix == "eq" {
                equality(key, value, Some(ty))?
            } else {
                let operand = coerce(key, value, Some(ty))?;
                // Suffix membership was checked above.
                Condition::from_operator(suffix, operand).ok_or_else(|| {
                    ValidationError::InvalidQuery {
                        parameter: key.to_string(),
                        message: format!("unsupported operator '{}'", suffix),
                    }
                })?
            };
            return Ok(Some((prefix.to_string(), condition)));
        }
    }

    let ty = schema.scalar_type(key);
    Ok(Some((key.to_string(), equality(key, value, ty)?)))
}

fn equality(
    parameter: &str,
    value: &str,
    ty: Option<PropertyType>,
) -> Result<Condition, ValidationError> {
    if value.contains(',') {
        let values = value
            .split(',')
            .map(|v| coerce(parameter, v.trim(), ty))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Condition::In(values))
    } else {
        Ok(Condition::Eq(coerce(parameter, value, ty)?))
    }
}

/// Coerces a raw query value to the declared property type.
pub fn coerce(
    parameter: &str,
    value: &str,
    ty: Option<PropertyType>,
) -> Result<FieldValue, ValidationError> {
    let invalid = |expected: &str| ValidationError::InvalidQuery {
        parameter: parameter.to_string(),
        message: format!("'{}' is not a valid {}", value, expected),
    };

    match ty {
        Some(PropertyType::Integer) => value
            .trim()
            .parse::<i64>()
            .map(FieldValue::Integer)
            .map_err(|_| invalid("integer")),
        Some(PropertyType::Number) => {
            let trimmed = value.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                return Ok(FieldValue::Integer(i));
            }
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(FieldValue::Float)
                .ok_or_else(|| invalid("number"))
        }
        Some(PropertyType::Boolean) => match value.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(FieldValue::Bool(true)),
            "false" => Ok(FieldValue::Bool(false)),
            _ => Err(invalid("boolean")),
        },
        Some(PropertyType::DateTime) => parse_datetime(value)
            .map(|dt| FieldValue::DateTime(dt.round_subsecs(3)))
            .ok_or_else(|| invalid("date-time")),
        _ => Ok(FieldValue::String(value.to_string())),
    }
}

fn parse_count(parameter: &str, value: &str) -> Result<u64, ValidationError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| ValidationError::InvalidQuery {
            parameter: parameter.to_string(),
            message: format!("'{}' is not a non-negative integer", value),
        })
}
