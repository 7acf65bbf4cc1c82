//! Backend-neutral query representation.
//!
//! A [`Query`] describes what to fetch without saying how: criteria,
//! sorting, skip/limit, projection and an optional post-filter. Every
//! backend translates the same structure into its native calls and must
//! produce identical results for it.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::query::PathFilter;

use super::value::FieldValue;

/// A single constraint on one field.
///
/// A literal criterion in a request is always [`Condition::Eq`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    /// Equal to.
    Eq(FieldValue),
    /// Not equal to (also matches a missing field).
    Ne(FieldValue),
    /// Greater than.
    Gt(FieldValue),
    /// Greater than or equal to.
    Gte(FieldValue),
    /// Less than.
    Lt(FieldValue),
    /// Less than or equal to.
    Lte(FieldValue),
    /// Equal to any of the values.
    In(Vec<FieldValue>),
}

impl Condition {
    /// Builds a condition from an operator name.
    ///
    /// Returns `None` for anything outside the supported operator set.
    pub fn from_operator(operator: &str, value: FieldValue) -> Option<Self> {
        match operator {
            "eq" => Some(Condition::Eq(value)),
            "ne" => Some(Condition::Ne(value)),
            "gt" => Some(Condition::Gt(value)),
            "gte" => Some(Condition::Gte(value)),
            "lt" => Some(Condition::Lt(value)),
            "lte" => Some(Condition::Lte(value)),
            _ => None,
        }
    }

    /// Returns the operator name.
    pub fn operator(&self) -> &'static str {
        match self {
            Condition::Eq(_) => "eq",
            Condition::Ne(_) => "ne",
            Condition::Gt(_) => "gt",
            Condition::Gte(_) => "gte",
            Condition::Lt(_) => "lt",
            Condition::Lte(_) => "lte",
            Condition::In(_) => "in",
        }
    }
}

/// Operator suffixes recognised in `field.operator` criterion keys.
pub const OPERATOR_SUFFIXES: &[&str] = &["eq", "ne", "gt", "gte", "lt", "lte"];

/// Criteria keyed by dotted document path.
///
/// Conditions on the same path are combined with AND, which is how a range
/// such as `creationDate.gte=..&creationDate.lt=..` is expressed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Criteria(BTreeMap<String, Vec<Condition>>);

impl Criteria {
    /// Creates empty criteria.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a condition on a path.
    pub fn add(&mut self, path: impl Into<String>, condition: Condition) {
        self.0.entry(path.into()).or_default().push(condition);
    }

    /// Builder form of [`Criteria::add`].
    pub fn with(mut self, path: impl Into<String>, condition: Condition) -> Self {
        self.add(path, condition);
        self
    }

    /// Merges another set of criteria into this one.
    pub fn extend(&mut self, other: Criteria) {
        for (path, conditions) in other.0 {
            self.0.entry(path).or_default().extend(conditions);
        }
    }

    /// Iterates over `(path, conditions)` pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<Condition>)> {
        self.0.iter()
    }

    /// Returns the conditions on a path.
    pub fn get(&self, path: &str) -> Option<&Vec<Condition>> {
        self.0.get(path)
    }

    /// Returns true if no conditions are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of constrained paths.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    Ascending,
    /// Descending order.
    Descending,
}

/// A sort directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDirective {
    /// The field to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

impl SortDirective {
    /// Parses a single sort key (e.g., "-creationDate" for descending).
    pub fn parse(s: &str) -> Self {
        if let Some(stripped) = s.strip_prefix('-') {
            Self {
                field: stripped.to_string(),
                direction: SortDirection::Descending,
            }
        } else {
            Self {
                field: s.strip_prefix('+').unwrap_or(s).to_string(),
                direction: SortDirection::Ascending,
            }
        }
    }

    /// Parses a comma-separated sort list (`field,-field2,+field3`).
    pub fn parse_list(s: &str) -> Vec<Self> {
        s.split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty() && *key != "-" && *key != "+")
            .map(Self::parse)
            .collect()
    }

    /// Creates an ascending directive.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Creates a descending directive.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// Paging and projection options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Number of matching rows to skip.
    pub skip: u64,
    /// Maximum number of rows to return.
    pub limit: Option<u64>,
    /// Fields to return; empty means the whole document.
    pub projection: BTreeSet<String>,
}

/// A complete, backend-neutral query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Query {
    /// Field constraints, all of which must hold.
    pub criteria: Criteria,
    /// Sort directives, applied in order.
    pub sorting: Vec<SortDirective>,
    /// Skip, limit and projection.
    pub options: QueryOptions,
    /// Filter applied to the returned page by the service layer.
    #[serde(skip)]
    pub post_filter: Option<PathFilter>,
}

impl Query {
    /// Creates an empty query (matches everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query addressing a single document by id.
    pub fn by_id(id: FieldValue) -> Self {
        Self::new().with_condition("id", Condition::Eq(id))
    }

    /// Adds a condition.
    pub fn with_condition(mut self, path: impl Into<String>, condition: Condition) -> Self {
        self.criteria.add(path, condition);
        self
    }

    /// Adds a sort directive.
    pub fn with_sort(mut self, sort: SortDirective) -> Self {
        self.sorting.push(sort);
        self
    }

    /// Sets the number of rows to skip.
    pub fn with_skip(mut self, skip: u64) -> Self {
        self.options.skip = skip;
        self
    }

    /// Sets the row limit.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.options.limit = Some(limit);
        self
    }

    /// Adds fields to the projection.
    pub fn with_projection<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options
            .projection
            .extend(fields.into_iter().map(Into::into));
        self
    }

    /// Returns the id this query is pinned to, if it has an `id` equality.
    pub fn id_value(&self) -> Option<&FieldValue> {
        self.criteria.get("id").and_then(|conditions| {
            conditions.iter().find_map(|c| match c {
                Condition::Eq(v) => Some(v),
                _ => None,
            })
        })
    }
}
