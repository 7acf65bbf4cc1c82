//! Post-filter expressions.
//!
//! A JSONPath filter applied to each returned row:
//!
//! ```text
//! $[?(@.state == 'active' && @.version >= 2)]
//! @.category != 'internal' || @.isBundle == true
//! ```
//!
//! The `$[?( ... )]` wrapper is optional. The expression is compiled once by
//! [`PathFilter::parse`] and evaluated against a row as the sole element of
//! a one-item array, so the row matches when the filter selects it.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use jsonpath_rust::JsonPath;
use serde_json::Value;

use crate::error::ValidationError;

/// Deepest bracket or negation nesting a filter may use.
const MAX_FILTER_DEPTH: usize = 64;

/// A compiled post-filter.
#[derive(Clone)]
pub struct PathFilter {
    source: String,
    path: Arc<JsonPath>,
}

impl PathFilter {
    /// Compiles a filter expression.
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(invalid("filter is empty".to_string()));
        }

        let depth = nesting_depth(trimmed);
        if depth > MAX_FILTER_DEPTH {
            return Err(invalid(format!(
                "filter nests {} levels deep, at most {} allowed",
                depth, MAX_FILTER_DEPTH
            )));
        }

        let expression = if trimmed.starts_with('$') {
            trimmed.to_string()
        } else {
            format!("$[?({})]", trimmed)
        };

        let path: JsonPath =
            JsonPath::from_str(&expression).map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            source: text.to_string(),
            path: Arc::new(path),
        })
    }

    /// Returns true if the document satisfies the filter.
    pub fn matches(&self, doc: &Value) -> bool {
        let candidates = Value::Array(vec![doc.clone()]);
        match self.path.find(&candidates) {
            Value::Array(selected) => selected.iter().any(|v| !v.is_null()),
            Value::Null => false,
            _ => true,
        }
    }

    /// The expression text as given.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for PathFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathFilter")
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for PathFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl PartialEq for PathFilter {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Maximum nesting of `(`, `[` and `!` outside string literals.
///
/// Consecutive negations count as nesting; `!=` does not.
fn nesting_depth(text: &str) -> usize {
    let mut depth = 0usize;
    let mut negations = 0usize;
    let mut max = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            '!' if chars.peek() != Some(&'=') => negations += 1,
            c if c.is_whitespace() => continue,
            _ => negations = 0,
        }
        max = max.max(depth + negations);
    }
    max
}

fn invalid(message: String) -> ValidationError {
    ValidationError::InvalidFilter { message }
}
