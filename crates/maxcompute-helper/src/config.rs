//! Layered configuration: `maxcompute.toml` (or an explicit path), then
//! `MAXCOMPUTE_*` environment variables. Nested keys use `__`, e.g.
//! `MAXCOMPUTE_JDBC__ACCESS_KEY`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::adapters::dataworks::http::HttpClientConfig;
use crate::adapters::dataworks::DataWorksConnParam;
use crate::adapters::jdbc::JdbcConnParam;
use crate::adapters::sdk::SdkConnParam;
use crate::error::AppResult;

pub const DEFAULT_CONFIG_FILE: &str = "maxcompute.toml";
pub const ENV_PREFIX: &str = "MAXCOMPUTE_";

const LOCAL_PROJECT: &str = "local";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// SQL session, metadata through `Information_Schema`.
    #[default]
    Jdbc,
    /// Native client, metadata through catalog calls.
    Sdk,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HelperConfig {
    #[serde(default)]
    pub transport: Transport,

    /// Local warehouse file the binary runs against.
    #[serde(default = "default_database")]
    pub database: PathBuf,

    #[serde(default)]
    pub jdbc: Option<JdbcConnParam>,

    #[serde(default)]
    pub sdk: Option<SdkConnParam>,

    #[serde(default)]
    pub dataworks: Option<DataWorksConnParam>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub http: HttpConfig,
}

fn default_database() -> PathBuf {
    PathBuf::from("warehouse.db")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, error. `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Colored output on stderr.
    #[serde(default)]
    pub ansi: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            ansi: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: None,
        }
    }
}

impl HttpConfig {
    pub fn client_config(&self) -> HttpClientConfig {
        let mut config = HttpClientConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            ..HttpClientConfig::default()
        };
        if let Some(agent) = self.user_agent.as_ref().filter(|a| !a.is_empty()) {
            config.user_agent = agent.clone();
        }
        config
    }
}

impl HelperConfig {
    /// Loads `path` (default [`DEFAULT_CONFIG_FILE`]; a missing file is
    /// treated as empty) and applies environment overrides.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        Self::from_figment(
            Figment::new()
                .merge(Toml::file(file))
                .merge(Env::prefixed(ENV_PREFIX).split("__")),
        )
    }

    pub fn from_figment(figment: Figment) -> AppResult<Self> {
        Ok(figment.extract()?)
    }

    /// `[jdbc]` if present, else derived from `[dataworks]`, else an
    /// anonymous parameter set for the local warehouse.
    pub fn jdbc_param(&self) -> AppResult<JdbcConnParam> {
        if let Some(p) = &self.jdbc {
            return Ok(p.clone());
        }
        if let Some(dw) = &self.dataworks {
            return dw.jdbc_conn_param();
        }
        Ok(JdbcConnParam {
            access_id: String::new(),
            access_key: String::new(),
            endpoint: self.database.display().to_string(),
            project_name: LOCAL_PROJECT.to_string(),
        })
    }

    /// Same precedence as [`HelperConfig::jdbc_param`].
    pub fn sdk_param(&self) -> AppResult<SdkConnParam> {
        if let Some(p) = &self.sdk {
            return Ok(p.clone());
        }
        if let Some(dw) = &self.dataworks {
            return dw.sdk_conn_param();
        }
        Ok(SdkConnParam {
            access_id: String::new(),
            access_key: String::new(),
            endpoint: None,
            project_name: LOCAL_PROJECT.to_string(),
        })
    }
}
