//! tabledao
//!
//! Command-line access to environment-prefixed DynamoDB tables. Records are
//! read and written as JSON objects.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{Map, Value};
use std::sync::Arc;
use tabledao::{
    config::{Environment, Settings},
    DynamoDbClient, TableDao,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// tabledao
///
/// CRUD and scan operations against prefixed DynamoDB tables.
#[derive(Parser, Debug)]
#[command(name = "tabledao")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base table name (the prefix is added), e.g. USERS
    #[arg(short, long, global = true)]
    table: Option<String>,

    /// Name of the table's hash key attribute
    #[arg(long, global = true, default_value = "id")]
    primary_id: String,

    /// Table name prefix (overrides DYNAMODB_TABLE_PREFIX env var)
    #[arg(long, global = true)]
    prefix: Option<String>,

    /// Environment: dev, qa, prod (overrides ENVIRONMENT env var)
    #[arg(short, long, global = true, ignore_case = true)]
    env: Option<Environment>,

    /// DynamoDB endpoint URL (overrides DYNAMODB_ENDPOINT_URL env var)
    #[arg(long, global = true)]
    endpoint_url: Option<String>,

    /// Log level: trace, debug, info, warn, error (overrides LOG_LEVEL env var)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the table if it does not exist
    Init,
    /// Load a record by id (consistent read)
    Get { id: String },
    /// Write a record; attributes it does not model are kept on an existing row
    Create {
        /// Record as a JSON object
        record: String,
    },
    /// Update a record; null attributes are removed from the stored row
    Update {
        /// Record as a JSON object
        record: String,
    },
    /// Delete a record by id
    Delete { id: String },
    /// Parallel scan for rows where COLUMN equals VALUE
    Scan {
        #[arg(long)]
        column: String,
        #[arg(long)]
        value: String,
        /// Number of parallel scan segments (overrides DYNAMODB_SCAN_SEGMENTS)
        #[arg(long)]
        segments: Option<u32>,
    },
    /// Check connectivity to DynamoDB
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration first (before logging, so we can use log_level)
    let mut settings = Settings::load()?;

    // Override settings with CLI arguments
    if let Some(prefix) = args.prefix.clone() {
        settings.table_prefix = Some(prefix);
    }
    if let Some(env) = args.env {
        settings.environment = env;
    }
    if let Some(endpoint_url) = args.endpoint_url.clone() {
        settings.dynamodb_endpoint_url = Some(endpoint_url);
    }
    if let Some(log_level) = args.log_level.clone() {
        settings.log_level = log_level;
    }

    init_tracing(&settings.log_level, args.log_format);
    settings.validate()?;

    tracing::info!(
        app_name = %settings.app_name,
        version = %settings.app_version,
        environment = %settings.environment,
        table_prefix = ?settings.table_prefix,
        "Starting"
    );

    let default_segments = settings.scan_segments;
    let client = Arc::new(DynamoDbClient::connect(settings).await);

    if let Command::Health = args.command {
        if !client.health_check().await {
            anyhow::bail!("DynamoDB health check failed");
        }
        print_json(&serde_json::json!({ "healthy": true }))?;
        return Ok(());
    }

    let table = args
        .table
        .as_deref()
        .context("--table is required for this command")?;
    let dao = TableDao::connect(client, table, &args.primary_id).await?;

    match args.command {
        Command::Init => {
            print_json(&serde_json::json!({
                "table": dao.table_name(),
                "base_table": dao.base_table_name(),
                "primary_id": dao.primary_id(),
            }))?;
        }
        Command::Get { id } => {
            let record: Option<Value> = dao.get(&id).await?;
            match record {
                Some(record) => print_json(&record)?,
                None => anyhow::bail!(
                    "No record with {} = {} in {}",
                    dao.primary_id(),
                    id,
                    dao.table_name()
                ),
            }
        }
        Command::Create { record } => {
            dao.create(&parse_record(&record)?).await?;
            tracing::info!(table = %dao.table_name(), "Record created");
        }
        Command::Update { record } => {
            dao.update(&parse_record(&record)?).await?;
            tracing::info!(table = %dao.table_name(), "Record updated");
        }
        Command::Delete { id } => {
            let mut key = Map::new();
            key.insert(dao.primary_id().to_string(), Value::String(id));
            dao.delete(&Value::Object(key)).await?;
            tracing::info!(table = %dao.table_name(), "Record deleted");
        }
        Command::Scan {
            column,
            value,
            segments,
        } => {
            let records: Vec<Value> = dao
                .scan(segments.unwrap_or(default_segments), &column, &value)
                .await?;
            print_json(&Value::Array(records))?;
        }
        Command::Health => unreachable!("handled before opening the table"),
    }

    Ok(())
}

/// Parse a JSON object from the command line
fn parse_record(raw: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(raw).context("Record is not valid JSON")?;
    if !value.is_object() {
        anyhow::bail!("Record must be a JSON object");
    }
    Ok(value)
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Initialize tracing subscriber with the specified log level
///
/// Logs go to stderr so that stdout carries only command output.
fn init_tracing(log_level: &str, format: LogFormat) {
    // Build filter from RUST_LOG env var or use provided log level
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let console_layer = match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed(),
    };

    tracing_subscriber::registry().with(console_layer).init();
}
