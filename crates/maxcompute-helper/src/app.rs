//! Command dispatch for the binary. Every result goes to the NDJSON writer.

use std::io::Write;
use std::sync::Arc;

use serde_json::json;

use crate::adapters::dataworks::http::HttpDataWorksApi;
use crate::adapters::dataworks::signer::RpcSigner;
use crate::adapters::dataworks::{DataWorksApi, DataWorksClient};
use crate::adapters::jdbc::{JdbcClient, SqlSession};
use crate::adapters::local::{SqliteConnector, SqliteDriver};
use crate::adapters::output::NdjsonWriter;
use crate::adapters::sdk::{OdpsClient, SdkClient, TaskSettings};
use crate::cli::{Args, Command, DataWorksCommand};
use crate::config::{HelperConfig, LoggingConfig, Transport};
use crate::error::{AppError, AppResult};
use crate::logging;

pub fn run<W: Write>(args: Args, out: &mut NdjsonWriter<W>) -> AppResult<()> {
    let mut config = match HelperConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            // No configured level yet; log the failure with the flag or the default.
            logging::init(&LoggingConfig {
                level: args.log_level.clone().unwrap_or_else(|| LoggingConfig::default().level),
                ..LoggingConfig::default()
            });
            return Err(e);
        }
    };
    args.apply(&mut config);
    logging::init(&config.logging);
    tracing::debug!(
        transport = ?config.transport,
        database = %config.database.display(),
        "starting"
    );

    let command = match args.command {
        Command::Dataworks(command) => {
            let param = config
                .dataworks
                .clone()
                .ok_or_else(|| AppError::Config("missing [dataworks] section".into()))?;
            let api = HttpDataWorksApi::new(&param, Arc::new(RpcSigner), config.http.client_config())?;
            let client = DataWorksClient::new(param, api)?;
            return run_dataworks(&client, command, out);
        }
        other => other,
    };

    match config.transport {
        Transport::Jdbc => {
            let driver = SqliteDriver {
                path: config.database.clone(),
            };
            let client = JdbcClient::connect(config.jdbc_param()?, &driver)?;
            run_jdbc(client, command, out)
        }
        Transport::Sdk => {
            let connector = SqliteConnector {
                path: config.database.clone(),
            };
            let client = SdkClient::connect(config.sdk_param()?, &connector)?;
            run_sdk(client, command, out)
        }
    }
}

/// Runs `command` over a SQL session and closes it afterwards, whatever the outcome.
pub fn run_jdbc<S: SqlSession, W: Write>(
    mut client: JdbcClient<S>,
    command: Command,
    out: &mut NdjsonWriter<W>,
) -> AppResult<()> {
    let result = jdbc_command(&mut client, command, out);
    client.close();
    result
}

fn jdbc_command<S: SqlSession, W: Write>(
    client: &mut JdbcClient<S>,
    command: Command,
    out: &mut NdjsonWriter<W>,
) -> AppResult<()> {
    match command {
        Command::Tables => out.write_all_lines(&client.table_infos()?),
        Command::Columns { table } => out.write_all_lines(&client.fields_by_table(&table)?),
        Command::Query { sql, full_scan } => {
            if full_scan {
                tracing::warn!("--full-scan only applies to the sdk transport");
            }
            out.write_all_lines(&client.query_data(&sql)?)
        }
        Command::Page { sql, page, size } => out.write_json_line(&client.page_query_map(&sql, page, size)?),
        Command::Ddl => Err(AppError::InvalidRequest(
            "ddl requires the sdk transport".into(),
        )),
        Command::Dataworks(_) => Err(not_a_sql_command()),
    }
}

pub fn run_sdk<C: OdpsClient, W: Write>(
    mut client: SdkClient<C>,
    command: Command,
    out: &mut NdjsonWriter<W>,
) -> AppResult<()> {
    match command {
        Command::Tables => out.write_all_lines(&client.table_infos()?),
        Command::Columns { table } => out.write_all_lines(&client.fields_by_table(&table)?),
        Command::Query { sql, full_scan } => {
            let settings = TaskSettings { full_scan };
            out.write_all_lines(&client.query_data(&sql, settings)?)
        }
        Command::Page { sql, page, size } => out.write_json_line(&client.page_query_map(&sql, page, size)?),
        Command::Ddl => client.list_all_ddl(|table, ddl| out.write_json_line(&json!({ "table": table, "ddl": ddl }))),
        Command::Dataworks(_) => Err(not_a_sql_command()),
    }
}

fn not_a_sql_command() -> AppError {
    AppError::InvalidRequest("dataworks commands do not run over a sql transport".into())
}

pub fn run_dataworks<A: DataWorksApi, W: Write>(
    client: &DataWorksClient<A>,
    command: DataWorksCommand,
    out: &mut NdjsonWriter<W>,
) -> AppResult<()> {
    match command {
        DataWorksCommand::Info => out.write_json_line(&client.db_info()?),
        DataWorksCommand::Tables { page_size } => {
            out.write_all_lines(&client.list_all_tables_with(Some(page_size))?)
        }
        DataWorksCommand::TableExists { table } => {
            let exists = client.check_table_exists(&table)?;
            out.write_json_line(&json!({ "table": table, "exists": exists }))
        }
        DataWorksCommand::Files {
            folder,
            use_type,
            file_types,
            page_size,
        } => client.list_all_files(
            Some(page_size),
            &folder,
            use_type.as_deref(),
            file_types.as_deref(),
            |files| out.write_all_lines(&files),
        ),
    }
}
