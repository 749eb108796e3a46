//! The warehouse's columnar JSON result encoding.
//!
//! A `jobs.query` response carries its rows as `rows: [{f: [{v: value}, ...]}]`
//! alongside `schema: {fields: [{name}, ...]}`. Repeated (array) columns are
//! double-wrapped: the cell's `v` is itself a list of `{v: ...}` objects, and
//! `RECORD` columns nest another `{f: [...]}`. [`QueryTable::from_response`]
//! strips all of that at the boundary so interpreters only ever see [`Cell`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for `POST projects/{id}/queries`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub query: String,
    pub use_legacy_sql: bool,
    pub max_results: u32,
}

impl QueryRequest {
    pub fn standard_sql(query: impl Into<String>, max_results: u32) -> Self {
        Self {
            query: query.into(),
            use_legacy_sql: false,
            max_results,
        }
    }
}

/// Raw `jobs.query` response, exactly as it comes off the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(default)]
    pub schema: Option<TableSchema>,
    #[serde(default)]
    pub rows: Option<Vec<RawRow>>,
    /// Serialized as a decimal string by the API.
    #[serde(default)]
    pub total_rows: Option<String>,
    #[serde(default)]
    pub job_complete: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableSchema {
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRow {
    #[serde(default)]
    pub f: Vec<RawCell>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCell {
    #[serde(default)]
    pub v: Value,
}

/// Error envelope returned alongside non-2xx statuses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: Option<ApiErrorDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// A single decoded result value.
///
/// Scalars stay as the API's string form; callers convert with
/// [`Cell::as_i64`] / [`Cell::as_f64`] when they know the column type.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Scalar(String),
    Array(Vec<Cell>),
    Record(Vec<Cell>),
}

impl Cell {
    /// Decode one `v` payload, unwrapping `{v: ...}` array items and `{f: [...]}` records.
    pub fn decode(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::String(s) => Self::Scalar(s.clone()),
            Value::Bool(b) => Self::Scalar(b.to_string()),
            Value::Number(n) => Self::Scalar(n.to_string()),
            Value::Array(items) => Self::Array(items.iter().map(Self::decode).collect()),
            Value::Object(map) => {
                if let Some(Value::Array(fields)) = map.get("f") {
                    Self::Record(
                        fields
                            .iter()
                            .map(|field| field.get("v").map_or(Self::Null, Self::decode))
                            .collect(),
                    )
                } else if let Some(inner) = map.get("v") {
                    Self::decode(inner)
                } else {
                    Self::Scalar(value.to_string())
                }
            }
        }
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_str().and_then(|s| {
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        })
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_str().and_then(|s| s.parse().ok())
    }

    pub fn as_array(&self) -> Option<&[Self]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Scalar(s) => write!(f, "{s}"),
            Self::Array(items) | Self::Record(items) => {
                let open = if matches!(self, Self::Array(_)) { '[' } else { '{' };
                let close = if open == '[' { ']' } else { '}' };
                write!(f, "{open}")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "{close}")
            }
        }
    }
}

/// A decoded result table: column names plus rows of [`Cell`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryTable {
    pub fields: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    /// Row count reported by the server, which may exceed `rows.len()` when paged.
    pub total_rows: Option<u64>,
}

impl QueryTable {
    pub fn from_response(response: &QueryResponse) -> Self {
        let fields = response
            .schema
            .as_ref()
            .map(|s| s.fields.iter().map(|f| f.name.clone()).collect())
            .unwrap_or_default();
        let rows = response
            .rows
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|row| row.f.iter().map(|cell| Cell::decode(&cell.v)).collect())
            .collect();
        let total_rows = response.total_rows.as_deref().and_then(|s| s.parse().ok());
        Self {
            fields,
            rows,
            total_rows,
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let response: QueryResponse = serde_json::from_str(json)?;
        Ok(Self::from_response(&response))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.eq_ignore_ascii_case(name))
    }

    /// True when the server holds more rows than were returned.
    pub fn is_truncated(&self) -> bool {
        self.total_rows
            .is_some_and(|total| total > self.rows.len() as u64)
    }
}
