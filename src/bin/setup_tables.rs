//! CLI tool to create a set of prefixed DynamoDB tables
//!
//! Usage:
//!   cargo run --bin setup_tables -- --prefix QA --table USERS --table ORDERS:order_id
//!
//! For local development with DynamoDB Local:
//!   DYNAMODB_ENDPOINT_URL=http://localhost:8001 cargo run --bin setup_tables -- --prefix JDOE --table USERS

use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use tabledao::config::{create_dynamodb_client, Settings};
use tabledao::db::{initialize_table, TableName};

/// Create prefixed DynamoDB tables
#[derive(Parser, Debug)]
#[command(name = "setup_tables")]
#[command(about = "Create prefixed DynamoDB tables for tabledao")]
struct Args {
    /// DynamoDB endpoint URL (for local development)
    #[arg(long)]
    endpoint_url: Option<String>,

    /// Table name prefix, e.g. QA, PRODUCTION or a developer's name
    #[arg(long, env = "DYNAMODB_TABLE_PREFIX")]
    prefix: String,

    /// Table to create as NAME or NAME:PRIMARY_ID (primary id defaults to "id")
    #[arg(long = "table", required = true)]
    tables: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load()?;
    if let Some(url) = args.endpoint_url {
        settings.dynamodb_endpoint_url = Some(url);
    }
    if let Some(url) = &settings.dynamodb_endpoint_url {
        println!("Using DynamoDB endpoint: {}", url);
    }

    let client = create_dynamodb_client(&settings).await;
    let timeout = Duration::from_secs(settings.table_ready_timeout_seconds);

    println!("\n🚀 Setting up DynamoDB tables with prefix {}...\n", args.prefix);

    let mut failures = 0;
    for table_arg in &args.tables {
        let (base, primary_id) = parse_table_arg(table_arg);

        let table = match TableName::new(&args.prefix, base) {
            Ok(table) => table,
            Err(e) => {
                println!("❌ Invalid table {}: {}", table_arg, e);
                failures += 1;
                continue;
            }
        };

        match initialize_table(&client, table.full(), primary_id, timeout).await {
            Ok(true) => println!("✅ Created table: {} (key: {})", table, primary_id),
            Ok(false) => println!("⏭️  Table already exists: {}", table),
            Err(e) => {
                println!("❌ Failed to create table {}: {}", table, e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} table(s) could not be set up", failures);
    }

    println!("\n✅ Table setup complete!\n");

    Ok(())
}

/// Split `NAME[:PRIMARY_ID]`
fn parse_table_arg(arg: &str) -> (&str, &str) {
    match arg.split_once(':') {
        Some((name, primary_id)) if !primary_id.is_empty() => (name, primary_id),
        Some((name, _)) => (name, "id"),
        None => (arg, "id"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_table_arg() {
        assert_eq!(parse_table_arg("USERS"), ("USERS", "id"));
        assert_eq!(parse_table_arg("ORDERS:order_id"), ("ORDERS", "order_id"));
        assert_eq!(parse_table_arg("ORDERS:"), ("ORDERS", "id"));
    }
}
