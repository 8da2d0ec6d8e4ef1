//! Table initialization
//!
//! Creates a DAO's table on first use and waits for it to become ACTIVE.

use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType, TableStatus,
};
use aws_sdk_dynamodb::Client as DynamoDbSdkClient;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::error::DaoError;

/// Delay between DescribeTable polls while waiting for ACTIVE
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Make sure `table_name` exists with a string hash key named `primary_id`.
///
/// Returns `true` if this call created the table.
pub async fn initialize_table(
    client: &DynamoDbSdkClient,
    table_name: &str,
    primary_id: &str,
    timeout: Duration,
) -> Result<bool, DaoError> {
    let created = match describe_status(client, table_name).await? {
        Some(_) => false,
        None => create_table(client, table_name, primary_id).await?,
    };

    wait_until_active(client, table_name, timeout).await?;

    if created {
        tracing::info!(table = %table_name, primary_id = %primary_id, "Created table");
    } else {
        tracing::debug!(table = %table_name, "Table already exists");
    }

    Ok(created)
}

/// Current table status, or `None` if the table does not exist
async fn describe_status(
    client: &DynamoDbSdkClient,
    table_name: &str,
) -> Result<Option<TableStatus>, DaoError> {
    match client.describe_table().table_name(table_name).send().await {
        Ok(output) => Ok(output.table.and_then(|table| table.table_status)),
        Err(e)
            if e.as_service_error()
                .map(|se| se.is_resource_not_found_exception())
                .unwrap_or(false) =>
        {
            Ok(None)
        }
        Err(e) => Err(DaoError::from_sdk("DescribeTable", table_name, e)),
    }
}

async fn create_table(
    client: &DynamoDbSdkClient,
    table_name: &str,
    primary_id: &str,
) -> Result<bool, DaoError> {
    let attribute = AttributeDefinition::builder()
        .attribute_name(primary_id)
        .attribute_type(ScalarAttributeType::S)
        .build()
        .map_err(|e| DaoError::InvalidArgument(e.to_string()))?;

    let key = KeySchemaElement::builder()
        .attribute_name(primary_id)
        .key_type(KeyType::Hash)
        .build()
        .map_err(|e| DaoError::InvalidArgument(e.to_string()))?;

    let result = client
        .create_table()
        .table_name(table_name)
        .attribute_definitions(attribute)
        .key_schema(key)
        .billing_mode(BillingMode::PayPerRequest)
        .send()
        .await;

    match result {
        Ok(_) => Ok(true),
        // Someone else created it between our describe and create
        Err(e)
            if e.as_service_error()
                .map(|se| se.is_resource_in_use_exception())
                .unwrap_or(false) =>
        {
            Ok(false)
        }
        Err(e) => Err(DaoError::from_sdk("CreateTable", table_name, e)),
    }
}

async fn wait_until_active(
    client: &DynamoDbSdkClient,
    table_name: &str,
    timeout: Duration,
) -> Result<(), DaoError> {
    poll_until_active(table_name, timeout, POLL_INTERVAL, || {
        describe_status(client, table_name)
    })
    .await
}

/// Poll `describe` until it reports ACTIVE.
///
/// The status is always checked once more after the last sleep, so the table
/// gets the whole `timeout` before `TableNotReady` is returned.
async fn poll_until_active<F, Fut>(
    table_name: &str,
    timeout: Duration,
    interval: Duration,
    mut describe: F,
) -> Result<(), DaoError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<TableStatus>, DaoError>>,
{
    let deadline = Instant::now() + timeout;

    loop {
        if let Some(TableStatus::Active) = describe().await? {
            return Ok(());
        }

        if Instant::now() >= deadline {
            return Err(DaoError::TableNotReady {
                table: table_name.to_string(),
                waited: timeout,
            });
        }

        tracing::debug!(table = %table_name, "Waiting for table to become ACTIVE");
        sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{create_dynamodb_client, Settings};
    use std::future::ready;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_poll_gives_up_with_table_not_ready() {
        let result = poll_until_active(
            "QA_USERS",
            Duration::from_millis(30),
            Duration::from_millis(5),
            || ready(Ok(Some(TableStatus::Creating))),
        )
        .await;

        match result {
            Err(DaoError::TableNotReady { table, waited }) => {
                assert_eq!(table, "QA_USERS");
                assert_eq!(waited, Duration::from_millis(30));
            }
            other => panic!("expected TableNotReady, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_poll_checks_again_after_last_sleep() {
        // The interval is longer than the timeout: one sleep, then a final look
        let calls = AtomicUsize::new(0);
        let result = poll_until_active(
            "QA_USERS",
            Duration::from_millis(10),
            Duration::from_millis(20),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                ready(Ok(Some(TableStatus::Creating)))
            },
        )
        .await;

        assert!(matches!(result, Err(DaoError::TableNotReady { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_poll_returns_once_active() {
        let calls = AtomicUsize::new(0);
        let result = poll_until_active(
            "QA_USERS",
            Duration::from_secs(5),
            Duration::from_millis(1),
            || {
                let status = if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    TableStatus::Creating
                } else {
                    TableStatus::Active
                };
                ready(Ok(Some(status)))
            },
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_poll_propagates_describe_errors() {
        let result = poll_until_active(
            "QA_USERS",
            Duration::from_secs(5),
            Duration::from_millis(1),
            || ready(Err(DaoError::InvalidArgument("boom".to_string()))),
        )
        .await;

        assert!(matches!(result, Err(DaoError::InvalidArgument(_))));
    }

    async fn local_client() -> DynamoDbSdkClient {
        let mut settings = Settings::default();
        settings.dynamodb_endpoint_url = std::env::var("DYNAMODB_ENDPOINT_URL").ok();
        settings.aws_access_key_id = Some("local".to_string());
        settings.aws_secret_access_key = Some("local".to_string());
        create_dynamodb_client(&settings).await
    }

    fn unique_table() -> String {
        format!("T{}_USERS", uuid::Uuid::new_v4().simple())
    }

    #[tokio::test]
    #[ignore = "requires DynamoDB Local (set DYNAMODB_ENDPOINT_URL)"]
    async fn test_initialize_twice_local() {
        let client = local_client().await;
        let table = unique_table();
        let timeout = Duration::from_secs(30);

        assert!(initialize_table(&client, &table, "id", timeout).await.unwrap());
        assert!(!initialize_table(&client, &table, "id", timeout).await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires DynamoDB Local (set DYNAMODB_ENDPOINT_URL)"]
    async fn test_concurrent_initialize_local() {
        let client = local_client().await;
        let table = unique_table();
        let timeout = Duration::from_secs(30);

        let (first, second) = tokio::join!(
            initialize_table(&client, &table, "id", timeout),
            initialize_table(&client, &table, "id", timeout),
        );

        let created = [first.unwrap(), second.unwrap()];
        assert_eq!(created.iter().filter(|created| **created).count(), 1);
    }
}
