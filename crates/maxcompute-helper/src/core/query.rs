use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::types::{PageResult, Row};
use crate::error::{AppError, AppResult};

/// Which half of a paginated query is being executed.
///
/// Transports use it to pick per-query settings; the native client runs the
/// windowed query with full table scan enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Count,
    Window,
}

/// Drops trailing statement terminators (and trailing whitespace) so the
/// query can be embedded as a subquery.
pub fn strip_terminators(sql: &str) -> &str {
    sql.trim_end_matches(|c: char| c == ';' || c.is_whitespace())
}

pub fn count_sql(base: &str) -> String {
    format!("select count(1) from ({}) z", strip_terminators(base))
}

/// Zero-based row offset of a 1-based page.
pub fn page_offset(page: u32, size: u32) -> u64 {
    u64::from(page.saturating_sub(1)) * u64::from(size)
}

pub fn window_sql(base: &str, page: u32, size: u32) -> String {
    format!(
        "select z.* from ({}) z limit {}, {}",
        strip_terminators(base),
        page_offset(page, size),
        size
    )
}

pub fn check_window(page: u32, size: u32) -> AppResult<()> {
    if page < 1 {
        return Err(AppError::InvalidRequest("page index starts at 1".into()));
    }
    if size < 1 {
        return Err(AppError::InvalidRequest("page size must be at least 1".into()));
    }
    Ok(())
}

/// Reads the count out of the first row of a count query. A missing row counts as zero.
pub fn parse_count(rows: &[Row]) -> AppResult<u64> {
    let Some(first) = rows.first() else {
        return Ok(0);
    };
    // Single-column result; the last value wins if a driver adds extras.
    let Some(value) = first.values().last() else {
        return Ok(0);
    };
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .ok_or_else(|| AppError::SqlExec(format!("count query returned {n}"))),
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| AppError::SqlExec(format!("count query returned {s:?}"))),
        Value::Null => Ok(0),
        other => Err(AppError::SqlExec(format!("count query returned {other}"))),
    }
}

/// Count-then-window pagination over `sql`.
///
/// The count query runs first; a zero count returns an empty page without
/// issuing the windowed query. The two queries are not isolated from each
/// other, so `total` may disagree with the rows under concurrent writes.
pub fn page_query_map<E>(sql: &str, page: u32, size: u32, mut execute: E) -> AppResult<PageResult<Row>>
where
    E: FnMut(&str, QueryKind) -> AppResult<Vec<Row>>,
{
    check_window(page, size)?;

    let counting = count_sql(sql);
    tracing::info!(sql = %counting, "executing page count query");
    let count_rows = execute(&counting, QueryKind::Count)?;
    let total = parse_count(&count_rows)?;
    if total == 0 {
        return Ok(PageResult::empty());
    }

    let windowed = window_sql(sql, page, size);
    tracing::info!(sql = %windowed, "executing page query");
    let rows = execute(&windowed, QueryKind::Window)?;
    Ok(PageResult::new(total, rows))
}

pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Row>) -> AppResult<Vec<T>> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(Value::Object(row)).map_err(|e| AppError::RowDecode(e.to_string()))
        })
        .collect()
}

pub fn decode_page<T: DeserializeOwned>(page: PageResult<Row>) -> AppResult<PageResult<T>> {
    let PageResult { total, rows } = page;
    Ok(PageResult::new(total, decode_rows(rows)?))
}
