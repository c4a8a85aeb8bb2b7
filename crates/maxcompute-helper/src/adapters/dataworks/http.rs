//! HTTP client for the DataWorks OpenAPI.
//!
//! Requests are RPC style: a GET on the endpoint root with `Action`,
//! `Version`, `Format`, `RegionId` and the action parameters in the query
//! string. Request signing is delegated to a [`RequestSigner`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use super::types::{
    ApiRequest, CheckMetaTableRequest, FileEntry, ListFilesRequest, MetaDbInfo, MetaDbInfoRequest,
    MetaTableListRequest, TableEntity,
};
use super::{DataWorksApi, DataWorksConnParam};
use crate::core::paging::Page;
use crate::error::{AppError, AppResult};

pub const API_VERSION: &str = "2020-05-18";

/// Adds authentication to an outgoing request.
///
/// Implementations receive the complete parameter set and insert whatever
/// the signature scheme needs (nonce, timestamp, signature).
pub trait RequestSigner: Send + Sync {
    fn sign(
        &self,
        method: &str,
        params: &mut BTreeMap<String, String>,
        access_id: &str,
        access_key: &str,
    ) -> AppResult<()>;
}

/// Configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout duration.
    pub timeout: Duration,
    /// User agent string.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("maxcompute-helper/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Blocking DataWorks client. Each call drives its request on a private
/// current-thread runtime, so it must not be used from inside another async
/// runtime.
pub struct HttpDataWorksApi {
    base_url: Url,
    region: String,
    access_id: String,
    access_key: String,
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
    signer: Arc<dyn RequestSigner>,
}

impl HttpDataWorksApi {
    pub fn new(
        param: &DataWorksConnParam,
        signer: Arc<dyn RequestSigner>,
        config: HttpClientConfig,
    ) -> AppResult<Self> {
        let base_url = endpoint_url(&param.endpoint)?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| AppError::Internal(format!("build http client: {e}")))?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        Ok(Self {
            base_url,
            region: param.region.clone(),
            access_id: param.access_id.clone(),
            access_key: param.access_key.clone(),
            client,
            runtime,
            signer,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn request_params<R: ApiRequest>(&self, req: &R) -> AppResult<BTreeMap<String, String>> {
        let mut params = BTreeMap::new();
        params.insert("Action".to_string(), R::ACTION.to_string());
        params.insert("Version".to_string(), API_VERSION.to_string());
        params.insert("Format".to_string(), "JSON".to_string());
        params.insert("RegionId".to_string(), self.region.clone());
        for (key, value) in req.params() {
            params.insert(key.to_string(), value);
        }
        self.signer
            .sign("GET", &mut params, &self.access_id, &self.access_key)?;
        Ok(params)
    }

    fn call<R: ApiRequest>(&self, req: &R) -> AppResult<R::Data> {
        let params = self.request_params(req)?;
        tracing::debug!(action = R::ACTION, url = %self.base_url, "calling DataWorks OpenAPI");

        let (status, body) = self.runtime.block_on(async {
            let resp = self
                .client
                .get(self.base_url.clone())
                .query(&params)
                .send()
                .await
                .map_err(|e| transport_error(R::ACTION, e))?;
            let status = resp.status().as_u16();
            let body = resp.text().await.map_err(|e| transport_error(R::ACTION, e))?;
            Ok::<_, AppError>((status, body))
        })?;

        decode_response(R::ACTION, status, &body)
    }
}

fn transport_error(action: &str, e: reqwest::Error) -> AppError {
    tracing::error!(action, error = %e, "DataWorks request failed");
    AppError::OpenApi {
        code: "Transport".to_string(),
        message: format!("{action}: {e}"),
    }
}

/// Accepts a bare host (`dataworks.cn-shanghai.aliyuncs.com`) or a full
/// http(s) URL.
pub(crate) fn endpoint_url(endpoint: &str) -> AppResult<Url> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(AppError::DataWorksEndpoint("empty endpoint".into()));
    }
    let raw = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("https://{endpoint}/")
    };
    let url = Url::parse(&raw).map_err(|e| AppError::DataWorksEndpoint(format!("{endpoint}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(AppError::DataWorksEndpoint(endpoint.to_string()));
    }
    Ok(url)
}

/// Both the product envelope (`ErrorCode`/`ErrorMessage`) and the gateway
/// envelope (`Code`/`Message`) are accepted.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Envelope<T> {
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default = "Option::default")]
    data: Option<T>,
}

pub(crate) fn decode_response<T: DeserializeOwned>(action: &str, status: u16, body: &str) -> AppResult<T> {
    let status_ok = (200..300).contains(&status);
    let envelope: Envelope<T> = match serde_json::from_str(body) {
        Ok(e) => e,
        Err(e) if status_ok => return Err(AppError::Json(e)),
        Err(_) => {
            return Err(AppError::OpenApi {
                code: format!("HTTP{status}"),
                message: body.chars().take(256).collect(),
            })
        }
    };

    if status_ok && envelope.success != Some(false) {
        if let Some(data) = envelope.data {
            return Ok(data);
        }
    }

    let code = envelope
        .error_code
        .or(envelope.code)
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| {
            if status_ok {
                "MissingData".to_string()
            } else {
                format!("HTTP{status}")
            }
        });
    let message = envelope
        .error_message
        .or(envelope.message)
        .unwrap_or_else(|| format!("{action} returned no data"));
    tracing::error!(
        action,
        status,
        request_id = envelope.request_id.as_deref().unwrap_or(""),
        %code,
        %message,
        "DataWorks OpenAPI error"
    );
    Err(AppError::OpenApi { code, message })
}

impl DataWorksApi for HttpDataWorksApi {
    fn get_meta_db_info(&self, req: &MetaDbInfoRequest) -> AppResult<MetaDbInfo> {
        self.call(req)
    }

    fn get_meta_db_table_list(&self, req: &MetaTableListRequest) -> AppResult<Page<TableEntity>> {
        let data = self.call(req)?;
        Ok(Page::new(data.table_entity_list, data.total_count))
    }

    fn check_meta_table(&self, req: &CheckMetaTableRequest) -> AppResult<bool> {
        self.call(req)
    }

    fn list_files(&self, req: &ListFilesRequest) -> AppResult<Page<FileEntry>> {
        let data = self.call(req)?;
        Ok(Page::new(data.files, data.total_count))
    }
}
