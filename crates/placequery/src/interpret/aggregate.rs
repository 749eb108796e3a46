use std::fmt;

use itertools::Itertools;
use placequery_warehouse::{LatLng, QueryTable};

pub const NO_AGGREGATE_RESULTS: &str =
    "Query returned no results.\n(Note: Aggregations may require a minimum count to appear).";

/// `total_count` → `Total Count`, `h3_index` → `H3 Index`.
pub fn field_label(name: &str) -> String {
    name.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars
                .next()
                .map_or_else(String::new, |first| first.to_uppercase().chain(chars).collect())
        })
        .join(" ")
}

/// Rows of labelled values, shown in an info window at `anchor`.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSummary {
    pub anchor: LatLng,
    pub rows: Vec<Vec<(String, String)>>,
}

impl AggregateSummary {
    pub fn from_table(table: &QueryTable, anchor: LatLng) -> Self {
        let labels: Vec<String> = table.fields.iter().map(|f| field_label(f)).collect();
        let rows = table
            .rows
            .iter()
            .map(|row| {
                labels
                    .iter()
                    .zip(row)
                    .map(|(label, cell)| (label.clone(), cell.to_string()))
                    .collect()
            })
            .collect();
        Self { anchor, rows }
    }

    /// No rows is a normal outcome, e.g. every group fell under the threshold.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of the first row's column with this label.
    pub fn first_value(&self, label: &str) -> Option<&str> {
        self.rows
            .first()?
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for AggregateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rows.is_empty() {
            return f.write_str(NO_AGGREGATE_RESULTS);
        }
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                writeln!(f, "----")?;
            }
            for (label, value) in row {
                writeln!(f, "{label}: {value}")?;
            }
        }
        Ok(())
    }
}
