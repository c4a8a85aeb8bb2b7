use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{HelperConfig, Transport};

#[derive(Parser, Debug, Clone)]
#[command(name = "maxcompute-helper", version)]
pub struct Args {
    /// Configuration file. Defaults to maxcompute.toml in the working directory.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Logging level (stderr). Also supports RUST_LOG.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Local warehouse file.
    #[arg(long)]
    pub database: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub transport: Option<Transport>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List tables with their comments.
    Tables,
    /// List the columns of a table, partition columns last.
    Columns { table: String },
    /// Run a query and print every row.
    Query {
        sql: String,
        /// Allow reading more than one partition (native-client transport).
        #[arg(long)]
        full_scan: bool,
    },
    /// Print one page of a query together with the total row count.
    Page {
        sql: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 100)]
        size: u32,
    },
    /// Print the DDL of every table (native-client transport).
    Ddl,
    /// DataWorks OpenAPI calls, configured by the `[dataworks]` section.
    #[command(subcommand)]
    Dataworks(DataWorksCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum DataWorksCommand {
    /// Metadata of the workspace's warehouse database.
    Info,
    /// Every table registered in the metadata catalog.
    Tables {
        #[arg(long, default_value_t = 100)]
        page_size: i64,
    },
    /// Whether the metadata catalog knows a table.
    TableExists { table: String },
    /// Files under a folder, streamed page by page.
    Files {
        #[arg(long, default_value = "")]
        folder: String,
        #[arg(long)]
        use_type: Option<String>,
        /// Comma separated file type codes.
        #[arg(long)]
        file_types: Option<String>,
        #[arg(long, default_value_t = 100)]
        page_size: i64,
    },
}

impl Args {
    /// Command-line flags win over file and environment values.
    pub fn apply(&self, config: &mut HelperConfig) {
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(database) = &self.database {
            config.database = database.clone();
        }
        if let Some(transport) = self.transport {
            config.transport = transport;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::{providers::{Format, Toml}, Figment};

    #[test]
    fn page_defaults() {
        let args = Args::parse_from(["maxcompute-helper", "page", "select * from t"]);
        assert_eq!(
            args.command,
            Command::Page {
                sql: "select * from t".into(),
                page: 1,
                size: 100
            }
        );
    }

    #[test]
    fn dataworks_subcommands_parse() {
        let args = Args::parse_from([
            "maxcompute-helper",
            "dataworks",
            "files",
            "--folder",
            "Business Flow/ods",
            "--file-types",
            "10",
        ]);
        assert_eq!(
            args.command,
            Command::Dataworks(DataWorksCommand::Files {
                folder: "Business Flow/ods".into(),
                use_type: None,
                file_types: Some("10".into()),
                page_size: 100,
            })
        );

        let args = Args::parse_from(["maxcompute-helper", "dataworks", "table-exists", "ods_cust"]);
        assert_eq!(
            args.command,
            Command::Dataworks(DataWorksCommand::TableExists { table: "ods_cust".into() })
        );
    }

    #[test]
    fn flags_override_config() {
        let mut config =
            HelperConfig::from_figment(Figment::new().merge(Toml::string("transport = \"jdbc\""))).unwrap();
        let args = Args::parse_from([
            "maxcompute-helper",
            "--transport",
            "sdk",
            "--database",
            "/tmp/other.db",
            "--log-level",
            "debug",
            "query",
            "--full-scan",
            "select 1",
        ]);
        args.apply(&mut config);
        assert_eq!(config.transport, Transport::Sdk);
        assert_eq!(config.database, PathBuf::from("/tmp/other.db"));
        assert_eq!(config.logging.level, "debug");
        assert!(matches!(args.command, Command::Query { full_scan: true, .. }));
    }
}
