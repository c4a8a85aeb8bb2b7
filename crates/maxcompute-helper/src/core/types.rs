use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One result row: column name to value, in select-list order.
pub type Row = serde_json::Map<String, Value>;

/// Total record count paired with one materialized page of rows.
///
/// `total` comes from a separate count query, so `rows.len() <= total` is not
/// guaranteed when the underlying data changes between the two queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult<T> {
    pub total: u64,
    pub rows: Vec<T>,
}

impl<T> PageResult<T> {
    pub fn new(total: u64, rows: Vec<T>) -> Self {
        Self { total, rows }
    }

    pub fn empty() -> Self {
        Self {
            total: 0,
            rows: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMetaInfo {
    pub table_name: String,
    #[serde(default)]
    pub comment: String,
}

impl TableMetaInfo {
    pub fn new(table_name: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            comment: comment.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableColumnMetaInfo {
    pub table_name: String,
    pub field_name: String,
    #[serde(default)]
    pub comment: String,
}

/// A column as described by the native client's table schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(default)]
    pub comment: String,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            comment: comment.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub columns: Vec<ColumnDef>,
    #[serde(default)]
    pub partition_columns: Vec<ColumnDef>,
}

/// Raw tabular output of a transport, before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}
