//! # Flattening Engine
//!
//! Turns a heterogeneous [`RecordSet`] into a rectangular [`Table`].
//!
//! ## Columns
//!
//! The header is the sorted union, across all records, of:
//! - every top-level key, except the container key when it holds an object
//! - every key one level inside the container object
//!
//! ## Cells
//!
//! For each (record, column) the nested container value wins over a
//! same-named top-level value; a missing column is an empty cell.
//!
//! ```text
//! {"id":"1","content":{"name":"x"}}         age,id,name
//! {"id":"2","content":{"name":"y","age":5}}  ->  ,1,x
//!                                            5,2,y
//! ```

use log::{debug, info};
use serde_json::Value;
use std::collections::BTreeSet;

use super::shape::{Record, RecordSet};

/// Reserved top-level key whose object is expanded into columns.
pub const CONTAINER_KEY: &str = "content";

/// Separator between the parts of a formatted array or object.
const PART_SEPARATOR: &str = "; ";

/// A rendered, rectangular table. Every row has exactly `header.len()` cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.rows.is_empty()
    }

    /// Renders as comma-separated text: header line, then one line per
    /// row, joined by `\n` with no trailing newline.
    pub fn render(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        lines.push(render_line(&self.header));
        lines.extend(self.rows.iter().map(|row| render_line(row)));
        lines.join("\n")
    }
}

/// Flattens records into a table, keeping record order as row order.
pub fn flatten(records: &RecordSet) -> Table {
    if records.is_empty() {
        info!("Record set is empty, producing empty table");
        return Table {
            header: Vec::new(),
            rows: Vec::new(),
        };
    }

    let header = column_set(records);
    debug!("Columns: {:?}", header);

    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|record| {
            header
                .iter()
                .map(|column| lookup(record, column).map(format_value).unwrap_or_default())
                .collect()
        })
        .collect();

    info!(
        "📊 Flattened {} records into {} columns",
        rows.len(),
        header.len()
    );
    Table { header, rows }
}

/// Sorted union of direct and container-expanded keys.
pub fn column_set(records: &RecordSet) -> Vec<String> {
    let mut columns = BTreeSet::new();
    for record in records {
        let container = container(record);
        for key in record.keys() {
            if container.is_some() && key == CONTAINER_KEY {
                continue;
            }
            columns.insert(key.clone());
        }
        if let Some(nested) = container {
            columns.extend(nested.keys().cloned());
        }
    }
    columns.into_iter().collect()
}

fn container(record: &Record) -> Option<&Record> {
    record.get(CONTAINER_KEY).and_then(Value::as_object)
}

/// Nested value first, then the top-level value.
fn lookup<'a>(record: &'a Record, column: &str) -> Option<&'a Value> {
    match container(record) {
        Some(nested) => nested.get(column).or_else(|| {
            if column == CONTAINER_KEY {
                None
            } else {
                record.get(column)
            }
        }),
        None => record.get(column),
    }
}

/// Formats one JSON value as cell text.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.trim().to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => format_number(number),
        Value::Array(items) => items
            .iter()
            .map(format_value)
            .collect::<Vec<_>>()
            .join(PART_SEPARATOR),
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| format!("{}:{}", key, format_value(value)))
            .collect::<Vec<_>>()
            .join(PART_SEPARATOR),
        Value::Null => String::new(),
    }
}

/// Integers as-is; whole floats as plain digits, never `.0` or exponent form.
fn format_number(number: &serde_json::Number) -> String {
    if let Some(float) = number.as_f64().filter(|_| number.is_f64()) {
        if float == 0.0 {
            return "0".to_string();
        }
        if float.is_finite() && float.fract() == 0.0 {
            return format!("{:.0}", float);
        }
    }
    number.to_string()
}

/// Quotes a field holding a comma, a double quote or a line break,
/// doubling inner quotes. Everything else passes through.
pub fn escape_field(field: &str) -> String {
    let needs_quoting = field.chars().any(|c| c == ',' || c == '"' || is_line_break(c));
    if needs_quoting {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0B}' | '\u{0C}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

fn render_line(fields: &[String]) -> String {
    fields
        .iter()
        .map(|field| escape_field(field))
        .collect::<Vec<_>>()
        .join(",")
}
