//! Native-client transport: catalog calls for metadata and submit/wait/fetch
//! jobs for SQL.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::normalize::normalize_rows;
use crate::core::query::{self, QueryKind};
use crate::core::schema::merge_columns;
use crate::core::types::{PageResult, Row, RowSet, TableColumnMetaInfo, TableMetaInfo, TableSchema};
use crate::core::vendor::{auth_or_sql_exec_error, classify_auth, sql_exec_error, VendorError};
use crate::error::{AppError, AppResult};

pub const DEFAULT_ENDPOINT: &str = "http://service.odps.aliyun.com/api";
pub const FULL_SCAN_SETTING: &str = "odps.sql.allow.fullscan";

#[derive(Clone, Serialize, Deserialize)]
pub struct SdkConnParam {
    pub access_id: String,
    pub access_key: String,
    /// Falls back to [`DEFAULT_ENDPOINT`] when missing or empty.
    #[serde(default)]
    pub endpoint: Option<String>,
    pub project_name: String,
}

impl SdkConnParam {
    pub fn resolved_endpoint(&self) -> AppResult<Url> {
        let raw = match self.endpoint.as_deref().map(str::trim) {
            Some(e) if !e.is_empty() => e,
            _ => DEFAULT_ENDPOINT,
        };
        let url = Url::parse(raw).map_err(|e| AppError::MaxComputeEndpoint(format!("{raw}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(AppError::MaxComputeEndpoint(raw.to_string()));
        }
        Ok(url)
    }
}

impl fmt::Debug for SdkConnParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdkConnParam")
            .field("access_id", &self.access_id)
            .field("access_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("project_name", &self.project_name)
            .finish()
    }
}

/// Per-job execution settings, passed with every submission instead of being
/// stored on the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskSettings {
    /// Required when a query reads more than one partition.
    pub full_scan: bool,
}

impl TaskSettings {
    pub fn full_scan() -> Self {
        Self { full_scan: true }
    }

    pub fn hints(&self) -> BTreeMap<String, String> {
        let mut hints = BTreeMap::new();
        if self.full_scan {
            hints.insert(FULL_SCAN_SETTING.to_string(), "true".to_string());
        }
        hints
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait OdpsClient {
    fn list_tables(&self) -> Result<Vec<TableMetaInfo>, VendorError>;

    fn table_schema(&self, table: &str) -> Result<TableSchema, VendorError>;

    fn table_ddl(&self, table: &str) -> Result<String, VendorError>;

    fn submit(&mut self, sql: &str, settings: &TaskSettings) -> Result<JobId, VendorError>;

    /// Blocks until the job finishes; a failed job is an error.
    fn wait_for_success(&mut self, job: &JobId) -> Result<(), VendorError>;

    fn fetch_records(&mut self, job: &JobId) -> Result<RowSet, VendorError>;
}

pub trait OdpsConnector {
    type Client: OdpsClient;

    fn connect(
        &self,
        endpoint: &Url,
        project: &str,
        access_id: &str,
        access_key: &str,
    ) -> Result<Self::Client, VendorError>;
}

pub struct SdkClient<C> {
    param: SdkConnParam,
    client: C,
}

impl<C: OdpsClient> SdkClient<C> {
    pub fn connect<K>(param: SdkConnParam, connector: &K) -> AppResult<Self>
    where
        K: OdpsConnector<Client = C>,
    {
        let endpoint = param.resolved_endpoint()?;
        tracing::debug!(%endpoint, project = %param.project_name, "building odps client");
        let client = connector
            .connect(&endpoint, &param.project_name, &param.access_id, &param.access_key)
            .map_err(|e| match classify_auth(&e) {
                Some(failure) => failure.into(),
                None => AppError::MaxComputeEndpoint(format!("{endpoint}: {}", e.message)),
            })?;
        Ok(Self { param, client })
    }

    pub fn from_client(param: SdkConnParam, client: C) -> Self {
        Self { param, client }
    }

    pub fn param(&self) -> &SdkConnParam {
        &self.param
    }

    pub fn table_infos(&self) -> AppResult<Vec<TableMetaInfo>> {
        self.client
            .list_tables()
            .map_err(|e| auth_or_sql_exec_error("list tables", e))
    }

    pub fn fields_by_table(&self, table: &str) -> AppResult<Vec<TableColumnMetaInfo>> {
        let schema = self
            .client
            .table_schema(table)
            .map_err(|e| sql_exec_error("read table schema", e))?;
        Ok(merge_columns(table, schema))
    }

    pub fn table_ddl(&self, table: &str) -> AppResult<String> {
        self.client
            .table_ddl(table)
            .map_err(|e| sql_exec_error("read table ddl", e))
    }

    /// Hands every table's DDL to `on_table`, in catalog order.
    pub fn list_all_ddl<F>(&self, mut on_table: F) -> AppResult<()>
    where
        F: FnMut(&str, &str) -> AppResult<()>,
    {
        for table in self.table_infos()? {
            let ddl = self.table_ddl(&table.table_name)?;
            on_table(&table.table_name, &ddl)?;
        }
        Ok(())
    }

    pub fn query_data(&mut self, sql: &str, settings: TaskSettings) -> AppResult<Vec<Row>> {
        if settings.full_scan {
            tracing::info!("full table scan enabled for multi-partition query");
        }
        let set = self
            .run_job(sql, &settings)
            .map_err(|e| sql_exec_error("execute sql task", e))?;
        Ok(normalize_rows(set))
    }

    fn run_job(&mut self, sql: &str, settings: &TaskSettings) -> Result<RowSet, VendorError> {
        let job = self.client.submit(sql, settings)?;
        tracing::debug!(%job, "sql task submitted");
        self.client.wait_for_success(&job)?;
        self.client.fetch_records(&job)
    }

    pub fn query_page(
        &mut self,
        sql: &str,
        page: u32,
        size: u32,
        settings: TaskSettings,
    ) -> AppResult<Vec<Row>> {
        query::check_window(page, size)?;
        let windowed = query::window_sql(sql, page, size);
        tracing::info!(sql = %windowed, "executing page query");
        self.query_data(&windowed, settings)
    }

    /// The count runs without full scan; the window always runs with it.
    pub fn page_query_map(&mut self, sql: &str, page: u32, size: u32) -> AppResult<PageResult<Row>> {
        query::page_query_map(sql, page, size, |stmt, kind| {
            let settings = match kind {
                QueryKind::Count => TaskSettings::default(),
                QueryKind::Window => TaskSettings::full_scan(),
            };
            self.query_data(stmt, settings)
        })
    }

    pub fn page_query<T: DeserializeOwned>(
        &mut self,
        sql: &str,
        page: u32,
        size: u32,
    ) -> AppResult<PageResult<T>> {
        query::decode_page(self.page_query_map(sql, page, size)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ColumnDef;
    use serde::Deserialize;
    use serde_json::json;
    use std::collections::HashMap;

    /// Runs jobs through a responder and remembers the settings each job got.
    #[derive(Default)]
    struct FakeOdps {
        tables_error: Option<VendorError>,
        submitted: Vec<(String, TaskSettings)>,
        results: HashMap<JobId, RowSet>,
        failing_jobs: Vec<JobId>,
        fail_on: Option<&'static str>,
        count: u64,
    }

    impl OdpsClient for FakeOdps {
        fn list_tables(&self) -> Result<Vec<TableMetaInfo>, VendorError> {
            match &self.tables_error {
                Some(e) => Err(e.clone()),
                None => Ok(vec![
                    TableMetaInfo::new("ods_cust", "customers"),
                    TableMetaInfo::new("ods_order", ""),
                ]),
            }
        }

        fn table_schema(&self, table: &str) -> Result<TableSchema, VendorError> {
            if table == "missing" {
                return Err(VendorError::with_code("ODPS-0130131", "Table not found"));
            }
            Ok(TableSchema {
                columns: vec![ColumnDef::new("id", "pk"), ColumnDef::new("name", "")],
                partition_columns: vec![ColumnDef::new("ds", "partition day")],
            })
        }

        fn table_ddl(&self, table: &str) -> Result<String, VendorError> {
            Ok(format!("CREATE TABLE {table} (id BIGINT);"))
        }

        fn submit(&mut self, sql: &str, settings: &TaskSettings) -> Result<JobId, VendorError> {
            self.submitted.push((sql.to_string(), *settings));
            let job = JobId(format!("job-{}", self.submitted.len()));
            let set = if sql.starts_with("select count(1)") {
                RowSet {
                    columns: vec!["_c0".into()],
                    rows: vec![vec![json!(self.count.to_string())]],
                }
            } else {
                RowSet {
                    columns: vec!["id".into(), "name".into()],
                    rows: vec![vec![json!(11), json!("\\N")], vec![json!(12), json!("bo")]],
                }
            };
            if self.fail_on.is_some_and(|p| sql.contains(p)) {
                self.failing_jobs.push(job.clone());
            }
            self.results.insert(job.clone(), set);
            Ok(job)
        }

        fn wait_for_success(&mut self, job: &JobId) -> Result<(), VendorError> {
            if self.failing_jobs.contains(job) {
                Err(VendorError::new("ODPS-0130071: Semantic analysis exception"))
            } else {
                Ok(())
            }
        }

        fn fetch_records(&mut self, job: &JobId) -> Result<RowSet, VendorError> {
            self.results
                .remove(job)
                .ok_or_else(|| VendorError::new(format!("unknown job {job}")))
        }
    }

    fn param(endpoint: Option<&str>) -> SdkConnParam {
        SdkConnParam {
            access_id: "id".into(),
            access_key: "secret".into(),
            endpoint: endpoint.map(String::from),
            project_name: "proj".into(),
        }
    }

    fn client(fake: FakeOdps) -> SdkClient<FakeOdps> {
        SdkClient::from_client(param(None), fake)
    }

    #[test]
    fn endpoint_defaults_and_validation() {
        assert_eq!(param(None).resolved_endpoint().unwrap().as_str(), DEFAULT_ENDPOINT);
        assert_eq!(param(Some("  ")).resolved_endpoint().unwrap().as_str(), DEFAULT_ENDPOINT);
        assert!(param(Some("http://service.cn-shanghai.maxcompute.aliyun.com/api"))
            .resolved_endpoint()
            .is_ok());
        for bad in ["service.odps.aliyun.com", "ftp://service.odps.aliyun.com/api", "http://"] {
            let err = param(Some(bad)).resolved_endpoint().unwrap_err();
            assert_eq!(err.code(), "MAX_COMPUTE_ENDPOINT_ERR", "{bad}");
        }
    }

    struct RejectingConnector(VendorError);

    impl OdpsConnector for RejectingConnector {
        type Client = FakeOdps;

        fn connect(&self, _: &Url, _: &str, _: &str, _: &str) -> Result<FakeOdps, VendorError> {
            Err(self.0.clone())
        }
    }

    #[test]
    fn connect_failures_map_to_endpoint_or_auth_codes() {
        let err = SdkClient::connect(param(None), &RejectingConnector(VendorError::new("bad host")))
            .err()
            .unwrap();
        assert_eq!(err.code(), "MAX_COMPUTE_ENDPOINT_ERR");

        let denied = VendorError::with_code("ODPS-0420095", "denied");
        let err = SdkClient::connect(param(None), &RejectingConnector(denied)).err().unwrap();
        assert_eq!(err.code(), "MAX_COMPUTE_PROJECT_ERR");
    }

    #[test]
    fn table_listing_maps_auth_failures() {
        let cases = [
            ("ODPS-0410051:Invalid credentials - accessKeyId not found", "MAX_COMPUTE_UNAME_ERR"),
            ("ODPS-0410042:Invalid signature value", "MAX_COMPUTE_PWD_ERR"),
            ("ODPS-0420095: Access Denied - project", "MAX_COMPUTE_PROJECT_ERR"),
            ("connect timed out", "MAX_COMPUTE_SQL_EXEC_ERR"),
        ];
        for (message, code) in cases {
            let c = client(FakeOdps {
                tables_error: Some(VendorError::new(message)),
                ..FakeOdps::default()
            });
            assert_eq!(c.table_infos().unwrap_err().code(), code, "{message}");
        }
    }

    #[test]
    fn fields_include_partition_columns_last() {
        let c = client(FakeOdps::default());
        let fields = c.fields_by_table("ods_cust").unwrap();
        let names: Vec<&str> = fields.iter().map(|f| f.field_name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "ds"]);
        assert_eq!(
            c.fields_by_table("missing").unwrap_err().code(),
            "MAX_COMPUTE_SQL_EXEC_ERR"
        );
    }

    #[test]
    fn settings_render_to_hints() {
        assert!(TaskSettings::default().hints().is_empty());
        let hints = TaskSettings::full_scan().hints();
        assert_eq!(hints.get(FULL_SCAN_SETTING).map(String::as_str), Some("true"));
    }

    #[test]
    fn page_query_windows_with_full_scan_only() {
        let mut c = client(FakeOdps {
            count: 25,
            ..FakeOdps::default()
        });
        let page = c.page_query_map("select * from ods_cust;", 2, 10).unwrap();
        assert_eq!(page.total, 25);
        assert_eq!(page.rows[0]["name"], json!(""));

        let submitted = &c.client.submitted;
        assert_eq!(submitted.len(), 2);
        assert_eq!(submitted[0].0, "select count(1) from (select * from ods_cust) z");
        assert!(!submitted[0].1.full_scan);
        assert_eq!(submitted[1].0, "select z.* from (select * from ods_cust) z limit 10, 10");
        assert!(submitted[1].1.full_scan);
    }

    #[test]
    fn settings_do_not_leak_between_jobs() {
        let mut c = client(FakeOdps::default());
        c.query_data("select 1", TaskSettings::full_scan()).unwrap();
        c.query_data("select 2", TaskSettings::default()).unwrap();
        let flags: Vec<bool> = c.client.submitted.iter().map(|(_, s)| s.full_scan).collect();
        assert_eq!(flags, vec![true, false]);
    }

    #[test]
    fn zero_count_submits_a_single_job() {
        let mut c = client(FakeOdps::default());
        let page = c.page_query_map("select * from ods_cust", 1, 10).unwrap();
        assert_eq!(page, PageResult::empty());
        assert_eq!(c.client.submitted.len(), 1);
    }

    #[test]
    fn failed_job_is_a_sql_exec_error() {
        let mut c = client(FakeOdps {
            count: 3,
            fail_on: Some("limit"),
            ..FakeOdps::default()
        });
        let err = c.page_query_map("select * from ods_cust", 1, 10).unwrap_err();
        assert_eq!(err.code(), "MAX_COMPUTE_SQL_EXEC_ERR");
    }

    #[derive(Debug, Deserialize)]
    struct Cust {
        id: u32,
        name: String,
    }

    #[test]
    fn typed_page_query() {
        let mut c = client(FakeOdps {
            count: 2,
            ..FakeOdps::default()
        });
        let page: PageResult<Cust> = c.page_query("select * from ods_cust", 1, 10).unwrap();
        assert_eq!(page.rows.len(), 2);
        assert_eq!(page.rows[0].id, 11);
        assert_eq!(page.rows[0].name, "");
        assert_eq!(page.rows[1].name, "bo");
    }

    #[test]
    fn ddl_listing_walks_every_table() {
        let c = client(FakeOdps::default());
        let mut seen = Vec::new();
        c.list_all_ddl(|table, ddl| {
            seen.push((table.to_string(), ddl.to_string()));
            Ok(())
        })
        .unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].0, "ods_order");
        assert!(seen[1].1.starts_with("CREATE TABLE ods_order"));
    }
}
