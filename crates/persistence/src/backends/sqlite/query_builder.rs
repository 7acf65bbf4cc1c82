//! Translation of a [`Query`] into SQL over the `documents` table.
//!
//! Every condition is guarded by `json_type` so that range operators only
//! compare values of a compatible JSON type, matching the in-process
//! semantics in [`crate::query::compare`]. Date-times are normalized with
//! `strftime` on both sides so instants compare regardless of offset.

use chrono::SubsecRound;
use rusqlite::ToSql;
use rusqlite::types::ToSqlOutput;

use crate::types::{Condition, Criteria, FieldValue, SortDirection, SortDirective, format_datetime};

/// A bound SQL parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// String parameter.
    String(String),
    /// Integer parameter.
    Integer(i64),
    /// Float parameter.
    Float(f64),
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            SqlParam::String(s) => s.to_sql(),
            SqlParam::Integer(i) => i.to_sql(),
            SqlParam::Float(f) => f.to_sql(),
        }
    }
}

const DATETIME_FORMAT: &str = "'%Y-%m-%d %H:%M:%f'";

/// Returns the SQLite JSON path for a dotted field (`$."a"."b"`).
pub fn json_path(field: &str) -> String {
    let mut path = String::from("$");
    for segment in field.split('.') {
        path.push_str(".\"");
        path.push_str(&segment.replace('"', "\\\""));
        path.push('"');
    }
    path
}

/// Accumulates SQL text and positional parameters.
#[derive(Debug, Default)]
pub struct SqlBuilder {
    params: Vec<SqlParam>,
}

impl SqlBuilder {
    /// Creates a builder with no parameters bound.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a parameter and returns its placeholder.
    pub fn bind(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        format!("?{}", self.params.len())
    }

    /// The parameters bound so far.
    pub fn params(&self) -> &[SqlParam] {
        &self.params
    }

    /// Returns the `WHERE` body for a collection and its criteria.
    pub fn where_clause(&mut self, collection: &str, criteria: &Criteria) -> String {
        let collection = self.bind(SqlParam::String(collection.to_string()));
        let mut clauses = vec![format!("collection = {}", collection)];
        for (field, conditions) in criteria.iter() {
            let path = self.bind(SqlParam::String(json_path(field)));
            for condition in conditions {
                clauses.push(self.condition(&path, condition));
            }
        }
        clauses.join(" AND ")
    }

    /// Returns the `ORDER BY` body, always ending with insertion order.
    pub fn order_by(&mut self, sorting: &[SortDirective]) -> String {
        let mut terms: Vec<String> = sorting
            .iter()
            .map(|directive| {
                let path = self.bind(SqlParam::String(json_path(&directive.field)));
                let direction = match directive.direction {
                    SortDirection::Ascending => "ASC",
                    SortDirection::Descending => "DESC",
                };
                format!("json_extract(data, {}) {}", path, direction)
            })
            .collect();
        terms.push("seq ASC".to_string());
        terms.join(", ")
    }

    /// Returns the `LIMIT ... OFFSET ...` clause.
    pub fn limit_offset(&mut self, limit: Option<u64>, skip: u64) -> String {
        let limit = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
        let skip = i64::try_from(skip).unwrap_or(i64::MAX);
        let limit = self.bind(SqlParam::Integer(limit));
        let skip = self.bind(SqlParam::Integer(skip));
        format!("LIMIT {} OFFSET {}", limit, skip)
    }

    fn condition(&mut self, path: &str, condition: &Condition) -> String {
        match condition {
            Condition::Eq(value) => self.equals(path, value),
            Condition::Ne(value) => format!("NOT COALESCE({}, 0)", self.equals(path, value)),
            Condition::In(values) if values.is_empty() => "0".to_string(),
            Condition::In(values) => {
                let alternatives: Vec<String> =
                    values.iter().map(|v| self.equals(path, v)).collect();
                format!("({})", alternatives.join(" OR "))
            }
            Condition::Gt(value) => self.compare(path, ">", value),
            Condition::Gte(value) => self.compare(path, ">=", value),
            Condition::Lt(value) => self.compare(path, "<", value),
            Condition::Lte(value) => self.compare(path, "<=", value),
        }
    }

    fn equals(&mut self, path: &str, value: &FieldValue) -> String {
        match value {
            FieldValue::Null => format!("(json_extract(data, {}) IS NULL)", path),
            FieldValue::Bool(b) => format!(
                "(json_type(data, {}) = '{}')",
                path,
                if *b { "true" } else { "false" }
            ),
            other => self.compare(path, "=", other),
        }
    }

    fn compare(&mut self, path: &str, op: &str, value: &FieldValue) -> String {
        match value {
            FieldValue::Null => "0".to_string(),
            FieldValue::Bool(b) => format!(
                "(json_type(data, {path}) IN ('true', 'false') AND json_extract(data, {path}) {op} {})",
                i64::from(*b)
            ),
            FieldValue::Integer(i) => {
                let param = self.bind(SqlParam::Integer(*i));
                format!(
                    "(json_type(data, {path}) IN ('integer', 'real') AND json_extract(data, {path}) {op} {param})"
                )
            }
            FieldValue::Float(f) => {
                let param = self.bind(SqlParam::Float(*f));
                format!(
                    "(json_type(data, {path}) IN ('integer', 'real') AND json_extract(data, {path}) {op} {param})"
                )
            }
            FieldValue::String(s) => {
                let param = self.bind(SqlParam::String(s.clone()));
                format!(
                    "(json_type(data, {path}) = 'text' AND json_extract(data, {path}) {op} {param})"
                )
            }
            FieldValue::DateTime(dt) => {
                let param = self.bind(SqlParam::String(format_datetime(&dt.round_subsecs(3))));
                format!(
                    "(json_type(data, {path}) = 'text' AND strftime({fmt}, json_extract(data, {path})) {op} strftime({fmt}, {param}))",
                    fmt = DATETIME_FORMAT
                )
            }
        }
    }
}
