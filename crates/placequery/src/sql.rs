//! Literal encoding for every value interpolated into generated SQL.
//!
//! All user-supplied strings go through one of these functions; builders never
//! quote by hand. Region and place-type values use single-quoted literals,
//! brand values and JSON-array entries use double-quoted literals. In both
//! cases backslashes are doubled first, then the enclosing quote character is
//! backslash-escaped, so a value can never end its own literal.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// `'value'` with `\` doubled and embedded `'` escaped as `\'`.
pub fn single_quoted(value: &str) -> String {
    format!("'{}'", escape_backslashes(value).replace('\'', "\\'"))
}

/// `"value"` with `\` doubled and embedded `"` escaped as `\"`.
pub fn double_quoted(value: &str) -> String {
    format!("\"{}\"", escape_backslashes(value).replace('"', "\\\""))
}

/// `"""value"""` for large geometry literals. WKT never contains quotes, but an
/// embedded `"` is escaped so the literal cannot be closed early.
pub fn triple_quoted(value: &str) -> String {
    format!("\"\"\"{}\"\"\"", escape_backslashes(value).replace('"', "\\\""))
}

fn escape_backslashes(value: &str) -> String {
    value.replace('\\', "\\\\")
}

/// Comma-separated single-quoted list, e.g. `'a', 'b'`.
pub fn single_quoted_list<S: AsRef<str>>(values: &[S]) -> String {
    values.iter().map(|v| single_quoted(v.as_ref())).join(", ")
}

/// Comma-separated double-quoted list, e.g. `"a", "b"`.
pub fn double_quoted_list<S: AsRef<str>>(values: &[S]) -> String {
    values.iter().map(|v| double_quoted(v.as_ref())).join(", ")
}

/// Column and field names are interpolated bare, so they must be plain identifiers.
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// A column or JSON key name that has been checked with [`is_identifier`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        is_identifier(&name).then_some(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Render a number the way it should appear in SQL (no trailing `.0` for integers).
pub fn number(value: f64) -> String {
    format!("{value}")
}

/// `WHERE a AND b AND c`, or an empty string when there are no predicates.
pub fn where_clause<S: AsRef<str>>(predicates: &[S]) -> String {
    if predicates.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", predicates.iter().map(AsRef::as_ref).join(" AND "))
    }
}

/// Join SQL pieces with single spaces, skipping empty ones.
pub fn join_parts(parts: &[&str]) -> String {
    parts.iter().filter(|p| !p.is_empty()).join(" ")
}
