use serde_json::Value;

use crate::core::types::{Row, RowSet};

/// MaxCompute's textual NULL.
pub const NULL_SENTINEL: &str = "\\N";

pub fn is_null_sentinel(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.eq_ignore_ascii_case(NULL_SENTINEL))
}

/// Downstream consumers expect the NULL sentinel as an empty string, not as a JSON null.
pub fn normalize_value(value: Value) -> Value {
    if is_null_sentinel(&value) {
        Value::String(String::new())
    } else {
        value
    }
}

pub fn normalize_row(columns: &[String], values: Vec<Value>) -> Row {
    let mut row = Row::with_capacity(columns.len());
    for (name, value) in columns.iter().zip(values) {
        row.insert(name.clone(), normalize_value(value));
    }
    row
}

pub fn normalize_rows(set: RowSet) -> Vec<Row> {
    let RowSet { columns, rows } = set;
    rows.into_iter()
        .map(|values| normalize_row(&columns, values))
        .collect()
}

/// Reads a column as text the way catalog readers expect: NULL becomes "".
pub fn text_field(row: &Row, column: &str) -> String {
    match row.get(column) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
