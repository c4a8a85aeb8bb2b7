use crate::core::types::{TableColumnMetaInfo, TableSchema};
use crate::error::{AppError, AppResult};

/// Regular columns first, then partition columns, each in schema order.
pub fn merge_columns(table: &str, schema: TableSchema) -> Vec<TableColumnMetaInfo> {
    schema
        .columns
        .into_iter()
        .chain(schema.partition_columns)
        .map(|c| TableColumnMetaInfo {
            table_name: table.to_string(),
            field_name: c.name,
            comment: c.comment,
        })
        .collect()
}

/// Table names end up inside catalog SQL string literals, so only plain
/// identifiers are accepted.
pub fn ensure_table_name(table: &str) -> AppResult<()> {
    if is_safe_identifier(table) {
        Ok(())
    } else {
        Err(AppError::InvalidRequest(format!(
            "invalid table identifier: {table}"
        )))
    }
}

pub(crate) fn is_safe_identifier(s: &str) -> bool {
    // [A-Za-z_][A-Za-z0-9_]*
    let mut chars = s.chars();
    let Some(first) = chars.next() else { return false };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
