//! Request parameters and response payloads of the DataWorks OpenAPI
//! (`dataworks-public`, version 2020-05-18).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A DataWorks RPC action: its name, flat query parameters and the shape of
/// its `Data` payload.
pub trait ApiRequest {
    const ACTION: &'static str;
    type Data: DeserializeOwned;

    fn params(&self) -> Vec<(&'static str, String)>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaDbInfoRequest {
    /// `odps.{project}`
    pub app_guid: String,
    pub data_source_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MetaDbInfo {
    pub app_guid: Option<String>,
    pub name: Option<String>,
    pub comment: Option<String>,
    pub owner_id: Option<String>,
    pub project_id: Option<i64>,
    pub project_name: Option<String>,
    pub env_type: Option<String>,
    pub location: Option<String>,
    pub create_time: Option<i64>,
    pub last_modify_time: Option<i64>,
    #[serde(rename = "Type")]
    pub kind: Option<String>,
}

impl ApiRequest for MetaDbInfoRequest {
    const ACTION: &'static str = "GetMetaDBInfo";
    type Data = MetaDbInfo;

    fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("AppGuid", self.app_guid.clone()),
            ("DataSourceType", self.data_source_type.clone()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaTableListRequest {
    pub app_guid: String,
    pub data_source_type: String,
    pub page_number: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableEntity {
    pub table_guid: String,
    pub table_name: String,
    #[serde(default)]
    pub database_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MetaTableListData {
    pub total_count: u64,
    pub table_entity_list: Vec<TableEntity>,
}

impl ApiRequest for MetaTableListRequest {
    const ACTION: &'static str = "GetMetaDBTableList";
    type Data = MetaTableListData;

    fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("AppGuid", self.app_guid.clone()),
            ("DataSourceType", self.data_source_type.clone()),
            ("PageNumber", self.page_number.to_string()),
            ("PageSize", self.page_size.to_string()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckMetaTableRequest {
    /// `odps.{project}.{table}`
    pub table_guid: String,
    pub data_source_type: String,
}

impl ApiRequest for CheckMetaTableRequest {
    const ACTION: &'static str = "CheckMetaTable";
    type Data = bool;

    fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("TableGuid", self.table_guid.clone()),
            ("DataSourceType", self.data_source_type.clone()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFilesRequest {
    pub project_identifier: String,
    pub file_folder_path: String,
    /// Functional module the files belong to, e.g. `NORMAL` or `MANUAL`.
    pub use_type: Option<String>,
    /// Comma separated file code types, e.g. `10` for ODPS SQL.
    pub file_types: Option<String>,
    pub page_number: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FileEntry {
    pub file_id: i64,
    pub file_name: String,
    pub file_type: i32,
    pub file_folder_id: Option<String>,
    pub use_type: Option<String>,
    pub owner: Option<String>,
    pub node_id: Option<i64>,
    pub content: Option<String>,
    pub last_edit_time: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ListFilesData {
    pub total_count: u64,
    pub page_number: u32,
    pub page_size: u32,
    pub files: Vec<FileEntry>,
}

impl ApiRequest for ListFilesRequest {
    const ACTION: &'static str = "ListFiles";
    type Data = ListFilesData;

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("ProjectIdentifier", self.project_identifier.clone()),
            ("FileFolderPath", self.file_folder_path.clone()),
            ("PageNumber", self.page_number.to_string()),
            ("PageSize", self.page_size.to_string()),
        ];
        if let Some(use_type) = self.use_type.as_ref().filter(|s| !s.is_empty()) {
            params.push(("UseType", use_type.clone()));
        }
        if let Some(file_types) = self.file_types.as_ref().filter(|s| !s.is_empty()) {
            params.push(("FileTypes", file_types.clone()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_file_filters_are_omitted_when_blank() {
        let mut req = ListFilesRequest {
            project_identifier: "proj".into(),
            file_folder_path: "".into(),
            use_type: Some("".into()),
            file_types: None,
            page_number: 1,
            page_size: 100,
        };
        let keys: Vec<&str> = req.params().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["ProjectIdentifier", "FileFolderPath", "PageNumber", "PageSize"]);

        req.file_types = Some("10,23".into());
        assert!(req.params().contains(&("FileTypes", "10,23".to_string())));
    }

    #[test]
    fn files_payload_tolerates_missing_fields() {
        let data: ListFilesData = serde_json::from_str(
            r#"{"TotalCount": 2, "PageNumber": 1, "PageSize": 10,
                "Files": [{"FileId": 7, "FileName": "ods_cust.sql", "FileType": 10}]}"#,
        )
        .unwrap();
        assert_eq!(data.total_count, 2);
        assert_eq!(data.files[0].file_name, "ods_cust.sql");
        assert_eq!(data.files[0].owner, None);
    }
}
