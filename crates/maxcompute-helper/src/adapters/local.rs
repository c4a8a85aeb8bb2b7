//! SQLite-backed warehouse for offline work and tests.
//!
//! It speaks both transport contracts: as a [`SqlSession`] it answers plain
//! SQL, including the `Information_Schema.TABLES` / `COLUMNS` catalog queries
//! (served from an attached in-memory database), and as an [`OdpsClient`] it
//! runs jobs synchronously and keeps their results until fetched.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use rusqlite::{types::ValueRef, Connection, OpenFlags, Row as SqliteRow};
use serde_json::Value;
use url::Url;

use crate::adapters::jdbc::{SqlDriver, SqlSession};
use crate::adapters::sdk::{JobId, OdpsClient, OdpsConnector, TaskSettings};
use crate::core::types::{ColumnDef, RowSet, TableMetaInfo, TableSchema};
use crate::core::vendor::VendorError;
use crate::error::{AppError, AppResult};

const BUSY_TIMEOUT: Duration = Duration::from_millis(2_000);

const CATALOG_DDL: &str = "
    DROP TABLE IF EXISTS information_schema.TABLES;
    DROP TABLE IF EXISTS information_schema.COLUMNS;
    CREATE TABLE information_schema.TABLES (table_name TEXT NOT NULL, table_comment TEXT);
    CREATE TABLE information_schema.COLUMNS (
        table_name TEXT NOT NULL,
        column_name TEXT NOT NULL,
        column_comment TEXT
    );
    INSERT INTO information_schema.TABLES (table_name, table_comment)
        SELECT name, '' FROM main.sqlite_master
        WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
        ORDER BY name;
    INSERT INTO information_schema.COLUMNS (table_name, column_name, column_comment)
        SELECT m.name, p.name, '' FROM main.sqlite_master m, pragma_table_info(m.name) p
        WHERE m.type = 'table' AND m.name NOT LIKE 'sqlite_%'
        ORDER BY m.name, p.cid;
";

impl From<rusqlite::Error> for VendorError {
    fn from(e: rusqlite::Error) -> Self {
        // Prepare-time syntax errors carry their code inside SqlInputError.
        if let rusqlite::Error::SqlInputError { error, .. } = &e {
            return VendorError::with_code(format!("{:?}", error.code), e.to_string());
        }
        match e.sqlite_error_code() {
            Some(code) => VendorError::with_code(format!("{code:?}"), e.to_string()),
            None => VendorError::new(e.to_string()),
        }
    }
}

pub struct SqliteWarehouse {
    conn: Connection,
    jobs: HashMap<JobId, RowSet>,
    next_job: u64,
}

impl SqliteWarehouse {
    pub fn open(path: &Path) -> AppResult<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
        let conn = Connection::open_with_flags(path, flags)
            .map_err(|e| AppError::DriverLoad(format!("{}: {e}", path.display())))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| AppError::DriverLoad(e.to_string()))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> AppResult<Self> {
        let _ = conn.busy_timeout(BUSY_TIMEOUT);
        conn.execute_batch("ATTACH DATABASE ':memory:' AS information_schema;")
            .map_err(|e| AppError::DriverLoad(e.to_string()))?;
        let warehouse = Self {
            conn,
            jobs: HashMap::new(),
            next_job: 0,
        };
        warehouse.refresh_catalog()?;
        Ok(warehouse)
    }

    /// Rebuilds the `Information_Schema` snapshot. Tables created after the
    /// last refresh are not visible to catalog queries until this runs again.
    pub fn refresh_catalog(&self) -> AppResult<()> {
        self.conn
            .execute_batch(CATALOG_DDL)
            .map_err(|e| AppError::SqlExec(format!("refresh catalog: {e}")))
    }

    /// Runs DDL/DML that returns no rows, e.g. when seeding the warehouse.
    pub fn execute_batch(&self, sql: &str) -> AppResult<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| AppError::SqlExec(e.to_string()))?;
        self.refresh_catalog()
    }

    fn run(&self, sql: &str) -> Result<RowSet, VendorError> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let width = columns.len();

        let mut rows = Vec::new();
        let mut cursor = stmt.query([])?;
        while let Some(row) = cursor.next()? {
            rows.push(row_values(row, width)?);
        }
        Ok(RowSet { columns, rows })
    }
}

fn row_values(row: &SqliteRow<'_>, width: usize) -> Result<Vec<Value>, VendorError> {
    let mut out = Vec::with_capacity(width);
    for i in 0..width {
        let v = match row.get_ref(i)? {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(x) => Value::from(x),
            ValueRef::Real(x) => Value::from(x),
            ValueRef::Text(t) => Value::from(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => serde_json::json!({
                "$type": "blob",
                "base64": STANDARD.encode(b),
                "size": b.len()
            }),
        };
        out.push(v);
    }
    Ok(out)
}

impl SqlSession for SqliteWarehouse {
    fn execute_query(&mut self, sql: &str) -> Result<RowSet, VendorError> {
        self.run(sql)
    }

    fn close(self) -> Result<(), VendorError> {
        self.conn.close().map_err(|(_, e)| e.into())
    }
}

impl OdpsClient for SqliteWarehouse {
    fn list_tables(&self) -> Result<Vec<TableMetaInfo>, VendorError> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM main.sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let tables = stmt
            .query_map([], |r| r.get::<_, String>(0))?
            .map(|name| name.map(|n| TableMetaInfo::new(n, "")))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tables)
    }

    fn table_schema(&self, table: &str) -> Result<TableSchema, VendorError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
        let columns = stmt
            .query_map([table], |r| r.get::<_, String>(0))?
            .map(|name| name.map(|n| ColumnDef::new(n, "")))
            .collect::<Result<Vec<_>, _>>()?;
        if columns.is_empty() {
            return Err(VendorError::new(format!("Table not found - {table}")));
        }
        // SQLite has no partitions.
        Ok(TableSchema {
            columns,
            partition_columns: Vec::new(),
        })
    }

    fn table_ddl(&self, table: &str) -> Result<String, VendorError> {
        let ddl: Option<String> = self
            .conn
            .query_row(
                "SELECT sql FROM main.sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |r| r.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    VendorError::new(format!("Table not found - {table}"))
                }
                other => other.into(),
            })?;
        Ok(ddl.unwrap_or_default())
    }

    fn submit(&mut self, sql: &str, settings: &TaskSettings) -> Result<JobId, VendorError> {
        // Every local table fits a single scan; hints are only recorded.
        tracing::debug!(hints = ?settings.hints(), "local sql task");
        let set = self.run(sql)?;
        self.next_job += 1;
        let job = JobId(format!("local-{}", self.next_job));
        self.jobs.insert(job.clone(), set);
        Ok(job)
    }

    fn wait_for_success(&mut self, job: &JobId) -> Result<(), VendorError> {
        if self.jobs.contains_key(job) {
            Ok(())
        } else {
            Err(VendorError::new(format!("unknown instance {job}")))
        }
    }

    fn fetch_records(&mut self, job: &JobId) -> Result<RowSet, VendorError> {
        self.jobs
            .remove(job)
            .ok_or_else(|| VendorError::new(format!("unknown instance {job}")))
    }
}

/// Opens a [`SqliteWarehouse`] at a fixed path, whatever the connection url says.
#[derive(Debug, Clone)]
pub struct SqliteDriver {
    pub path: PathBuf,
}

impl SqlDriver for SqliteDriver {
    type Session = SqliteWarehouse;

    fn connect(&self, url: &str, _user: &str, _password: &str) -> Result<SqliteWarehouse, VendorError> {
        tracing::debug!(%url, path = %self.path.display(), "serving sql session from local warehouse");
        SqliteWarehouse::open(&self.path).map_err(|e| VendorError::new(e.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct SqliteConnector {
    pub path: PathBuf,
}

impl OdpsConnector for SqliteConnector {
    type Client = SqliteWarehouse;

    fn connect(
        &self,
        endpoint: &Url,
        project: &str,
        _access_id: &str,
        _access_key: &str,
    ) -> Result<SqliteWarehouse, VendorError> {
        tracing::debug!(%endpoint, project, path = %self.path.display(), "serving odps client from local warehouse");
        SqliteWarehouse::open(&self.path).map_err(|e| VendorError::new(e.to_string()))
    }
}
