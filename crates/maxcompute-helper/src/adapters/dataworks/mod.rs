//! DataWorks OpenAPI transport: metadata catalog and file listings, plus the
//! connection parameters the other transports are derived from.

pub mod http;
pub mod signer;
pub mod types;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::adapters::jdbc::JdbcConnParam;
use crate::adapters::sdk::{SdkConnParam, DEFAULT_ENDPOINT};
use crate::core::limits::DEFAULT_PAGE_SIZE;
use crate::core::paging::{collect_pages, for_each_page, Page};
use crate::error::{AppError, AppResult};

use self::types::{
    CheckMetaTableRequest, FileEntry, ListFilesRequest, MetaDbInfo, MetaDbInfoRequest,
    MetaTableListRequest, TableEntity,
};

/// The only compute engine the connector talks to.
pub const SUPPORTED_DATASOURCE: &str = "odps";

const DEV_ENV: &str = "dev";

#[derive(Clone, Serialize, Deserialize)]
pub struct DataWorksConnParam {
    pub region: String,
    pub access_id: String,
    pub access_key: String,
    /// OpenAPI endpoint, e.g. `dataworks.cn-hangzhou.aliyuncs.com`.
    pub endpoint: String,
    #[serde(default = "default_datasource_type")]
    pub datasource_type: String,
    pub project: String,
    #[serde(default)]
    pub project_env: String,
}

fn default_datasource_type() -> String {
    SUPPORTED_DATASOURCE.to_string()
}

impl fmt::Debug for DataWorksConnParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataWorksConnParam")
            .field("region", &self.region)
            .field("access_id", &self.access_id)
            .field("access_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("datasource_type", &self.datasource_type)
            .field("project", &self.project)
            .field("project_env", &self.project_env)
            .finish()
    }
}

impl DataWorksConnParam {
    /// Name of the warehouse project backing this workspace environment.
    pub fn warehouse_project(&self) -> String {
        if self.project_env == DEV_ENV {
            format!("{}_dev", self.project)
        } else {
            self.project.clone()
        }
    }

    /// Metadata GUID of the workspace. DataWorks addresses it by the
    /// workspace name; only the warehouse project carries the `_dev` suffix.
    pub fn app_guid(&self) -> String {
        format!("{}.{}", self.datasource_type, self.project)
    }

    pub fn table_guid(&self, table: &str) -> String {
        format!("{}.{}", self.app_guid(), table)
    }

    pub fn maxcompute_endpoint(&self) -> String {
        format!("http://service.{}.maxcompute.aliyun.com/api", self.region)
    }

    pub fn ensure_supported(&self) -> AppResult<()> {
        if self.datasource_type == SUPPORTED_DATASOURCE {
            Ok(())
        } else {
            Err(AppError::UnsupportedDatasource(self.datasource_type.clone()))
        }
    }

    pub fn jdbc_conn_param(&self) -> AppResult<JdbcConnParam> {
        self.ensure_supported()?;
        Ok(JdbcConnParam {
            access_id: self.access_id.clone(),
            access_key: self.access_key.clone(),
            endpoint: self.maxcompute_endpoint(),
            project_name: self.warehouse_project(),
        })
    }

    pub fn sdk_conn_param(&self) -> AppResult<SdkConnParam> {
        self.ensure_supported()?;
        Ok(SdkConnParam {
            access_id: self.access_id.clone(),
            access_key: self.access_key.clone(),
            endpoint: Some(DEFAULT_ENDPOINT.to_string()),
            project_name: self.warehouse_project(),
        })
    }
}

/// The DataWorks actions the connector uses. Failures carry the remote
/// error code and message.
pub trait DataWorksApi {
    fn get_meta_db_info(&self, req: &MetaDbInfoRequest) -> AppResult<MetaDbInfo>;

    fn get_meta_db_table_list(&self, req: &MetaTableListRequest) -> AppResult<Page<TableEntity>>;

    fn check_meta_table(&self, req: &CheckMetaTableRequest) -> AppResult<bool>;

    fn list_files(&self, req: &ListFilesRequest) -> AppResult<Page<FileEntry>>;
}

pub struct DataWorksClient<A> {
    param: DataWorksConnParam,
    api: A,
}

impl<A: DataWorksApi> DataWorksClient<A> {
    /// Fails with an unsupported-datasource error for any engine but `odps`.
    pub fn new(param: DataWorksConnParam, api: A) -> AppResult<Self> {
        param.ensure_supported()?;
        Ok(Self { param, api })
    }

    pub fn param(&self) -> &DataWorksConnParam {
        &self.param
    }

    pub fn db_info(&self) -> AppResult<MetaDbInfo> {
        self.api.get_meta_db_info(&MetaDbInfoRequest {
            app_guid: self.param.app_guid(),
            data_source_type: self.param.datasource_type.clone(),
        })
    }

    pub fn list_all_tables(&self) -> AppResult<Vec<TableEntity>> {
        self.list_all_tables_with(Some(i64::from(DEFAULT_PAGE_SIZE)))
    }

    pub fn list_all_tables_with(&self, page_size: Option<i64>) -> AppResult<Vec<TableEntity>> {
        let app_guid = self.param.app_guid();
        collect_pages(page_size, |page_number, page_size| {
            self.api.get_meta_db_table_list(&MetaTableListRequest {
                app_guid: app_guid.clone(),
                data_source_type: self.param.datasource_type.clone(),
                page_number,
                page_size,
            })
        })
    }

    pub fn check_table_exists(&self, table: &str) -> AppResult<bool> {
        self.api.check_meta_table(&CheckMetaTableRequest {
            table_guid: self.param.table_guid(table),
            data_source_type: self.param.datasource_type.clone(),
        })
    }

    /// Streams the files under `folder` page by page into `on_page`.
    pub fn list_all_files<C>(
        &self,
        page_size: Option<i64>,
        folder: &str,
        use_type: Option<&str>,
        file_types: Option<&str>,
        on_page: C,
    ) -> AppResult<()>
    where
        C: FnMut(Vec<FileEntry>) -> AppResult<()>,
    {
        let fetch = |page_number, page_size| {
            self.api.list_files(&ListFilesRequest {
                project_identifier: self.param.project.clone(),
                file_folder_path: folder.to_string(),
                use_type: use_type.map(str::to_string),
                file_types: file_types.map(str::to_string),
                page_number,
                page_size,
            })
        };
        for_each_page(page_size, fetch, on_page)
    }
}
