use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unsupported datasource type: {0}")]
    UnsupportedDatasource(String),

    #[error("invalid MaxCompute endpoint: {0}")]
    MaxComputeEndpoint(String),

    #[error("invalid DataWorks endpoint: {0}")]
    DataWorksEndpoint(String),

    #[error("MaxCompute rejected the access id")]
    InvalidCredentials,

    #[error("MaxCompute rejected the access key signature")]
    InvalidSignature,

    #[error("MaxCompute project does not exist or access was denied")]
    AccessDenied,

    #[error("sql execution failed: {0}")]
    SqlExec(String),

    #[error("failed to load driver or open connection: {0}")]
    DriverLoad(String),

    #[error("DataWorks OpenAPI error {code}: {message}")]
    OpenApi { code: String, message: String },

    #[error("failed to decode row: {0}")]
    RowDecode(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<figment::Error> for AppError {
    fn from(e: figment::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "INVALID_REQUEST",
            AppError::UnsupportedDatasource(_) => "DATA_WORKS_ENGINE_SUPPORT_ERR",
            AppError::MaxComputeEndpoint(_) => "MAX_COMPUTE_ENDPOINT_ERR",
            AppError::DataWorksEndpoint(_) => "DATA_WORKS_ENDPOINT_ERR",
            AppError::InvalidCredentials => "MAX_COMPUTE_UNAME_ERR",
            AppError::InvalidSignature => "MAX_COMPUTE_PWD_ERR",
            AppError::AccessDenied => "MAX_COMPUTE_PROJECT_ERR",
            AppError::SqlExec(_) => "MAX_COMPUTE_SQL_EXEC_ERR",
            AppError::DriverLoad(_) => "MAX_COMPUTE_JDBC_DRIVE_LOAD_ERR",
            AppError::OpenApi { .. } => "DATA_WORKS_API_ERR",
            AppError::RowDecode(_) => "ROW_DECODE_ERR",
            AppError::Config(_) => "CONFIG_ERR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Json(_) => "JSON_ERROR",
            AppError::Internal(_) => "SYSTEM_INNER_ERR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
