//! SQL-session transport: everything, including metadata, goes through plain
//! SQL against the warehouse's `Information_Schema`.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::normalize::{normalize_rows, text_field};
use crate::core::query::{self, QueryKind};
use crate::core::schema::ensure_table_name;
use crate::core::types::{PageResult, Row, RowSet, TableColumnMetaInfo, TableMetaInfo};
use crate::core::vendor::{sql_exec_error, VendorError};
use crate::error::{AppError, AppResult};

const SELECT_ALL_TABLES_SQL: &str = "select table_name, table_comment from Information_Schema.TABLES";

#[derive(Clone, Serialize, Deserialize)]
pub struct JdbcConnParam {
    pub access_id: String,
    pub access_key: String,
    /// MaxCompute API endpoint, e.g. `http://service.cn-hangzhou.maxcompute.aliyun.com/api`.
    pub endpoint: String,
    pub project_name: String,
}

impl JdbcConnParam {
    pub fn connection_url(&self) -> String {
        format!(
            "jdbc:odps:{}?project={}&useProjectTimeZone=true",
            self.endpoint, self.project_name
        )
    }
}

impl fmt::Debug for JdbcConnParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JdbcConnParam")
            .field("access_id", &self.access_id)
            .field("access_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("project_name", &self.project_name)
            .finish()
    }
}

/// An open SQL session. Not shared between callers.
pub trait SqlSession {
    /// Runs a query to completion. Statement and cursor are released before returning.
    fn execute_query(&mut self, sql: &str) -> Result<RowSet, VendorError>;

    fn close(self) -> Result<(), VendorError>
    where
        Self: Sized,
    {
        Ok(())
    }
}

pub trait SqlDriver {
    type Session: SqlSession;

    fn connect(&self, url: &str, user: &str, password: &str) -> Result<Self::Session, VendorError>;
}

pub struct JdbcClient<S> {
    param: JdbcConnParam,
    session: S,
}

impl<S: SqlSession> JdbcClient<S> {
    pub fn connect<D>(param: JdbcConnParam, driver: &D) -> AppResult<Self>
    where
        D: SqlDriver<Session = S>,
    {
        let url = param.connection_url();
        tracing::debug!(%url, "opening sql session");
        let session = driver
            .connect(&url, &param.access_id, &param.access_key)
            .map_err(|e| {
                tracing::error!(%url, error = %e, "failed to open sql session");
                AppError::DriverLoad(e.message)
            })?;
        Ok(Self { param, session })
    }

    pub fn from_session(param: JdbcConnParam, session: S) -> Self {
        Self { param, session }
    }

    pub fn param(&self) -> &JdbcConnParam {
        &self.param
    }

    pub fn table_infos(&mut self) -> AppResult<Vec<TableMetaInfo>> {
        let rows = self.query_data(SELECT_ALL_TABLES_SQL)?;
        Ok(rows
            .iter()
            .map(|r| TableMetaInfo::new(text_field(r, "table_name"), text_field(r, "table_comment")))
            .collect())
    }

    pub fn fields_by_table(&mut self, table: &str) -> AppResult<Vec<TableColumnMetaInfo>> {
        ensure_table_name(table)?;
        let sql = format!(
            "select column_name, column_comment from Information_Schema.COLUMNS where table_name = '{table}'"
        );
        let rows = self.query_data(&sql)?;
        Ok(rows
            .iter()
            .map(|r| TableColumnMetaInfo {
                table_name: table.to_string(),
                field_name: text_field(r, "column_name"),
                comment: text_field(r, "column_comment"),
            })
            .collect())
    }

    pub fn query_data(&mut self, sql: &str) -> AppResult<Vec<Row>> {
        let set = self
            .session
            .execute_query(sql)
            .map_err(|e| sql_exec_error("execute query", e))?;
        Ok(normalize_rows(set))
    }

    /// One window of `sql`, without the count query.
    pub fn query_page(&mut self, sql: &str, page: u32, size: u32) -> AppResult<Vec<Row>> {
        query::check_window(page, size)?;
        let windowed = query::window_sql(sql, page, size);
        tracing::info!(sql = %windowed, "executing page query");
        self.query_data(&windowed)
    }

    pub fn page_query_map(&mut self, sql: &str, page: u32, size: u32) -> AppResult<PageResult<Row>> {
        query::page_query_map(sql, page, size, |stmt, _: QueryKind| self.query_data(stmt))
    }

    pub fn page_query<T: DeserializeOwned>(
        &mut self,
        sql: &str,
        page: u32,
        size: u32,
    ) -> AppResult<PageResult<T>> {
        query::decode_page(self.page_query_map(sql, page, size)?)
    }

    /// Closes the session. A close failure is logged and otherwise ignored.
    pub fn close(self) {
        if let Err(e) = self.session.close() {
            tracing::warn!(error = %e, "failed to close sql session");
        }
    }
}
