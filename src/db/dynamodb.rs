//! DynamoDB client wrapper
//!
//! This module provides the connection shared by every DAO: the AWS DynamoDB
//! SDK client together with the settings it was built from.

use aws_sdk_dynamodb::Client as DynamoDbSdkClient;
use std::sync::Arc;

use crate::config::{create_dynamodb_client, Settings};

/// DynamoDB connection shared by table DAOs.
#[derive(Clone)]
pub struct DynamoDbClient {
    /// Application settings
    settings: Arc<Settings>,

    /// AWS DynamoDB SDK client
    client: DynamoDbSdkClient,
}

impl DynamoDbClient {
    /// Wrap an existing SDK client.
    pub fn new(settings: Arc<Settings>, client: DynamoDbSdkClient) -> Self {
        Self { settings, client }
    }

    /// Build the SDK client from settings and wrap it.
    pub async fn connect(settings: Settings) -> Self {
        tracing::debug!(
            region = %settings.aws_region,
            dynamodb_endpoint = ?settings.dynamodb_endpoint_url,
            "Creating DynamoDB client"
        );

        let client = create_dynamodb_client(&settings).await;
        Self::new(Arc::new(settings), client)
    }

    /// Get a reference to the underlying AWS SDK client
    pub fn client(&self) -> &DynamoDbSdkClient {
        &self.client
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Configured table name prefix, if any
    pub fn table_prefix(&self) -> Option<&str> {
        self.settings.table_prefix.as_deref()
    }

    /// Check if the DynamoDB connection is healthy
    ///
    /// Performs a simple list_tables operation to verify connectivity.
    pub async fn health_check(&self) -> bool {
        match self.client.list_tables().limit(1).send().await {
            Ok(_) => {
                tracing::debug!("DynamoDB health check passed");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "DynamoDB health check failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_table_prefix_from_settings() {
        let mut settings = Settings::default();
        settings.table_prefix = Some("QA".to_string());
        settings.dynamodb_endpoint_url = Some("http://localhost:8001".to_string());

        let client = DynamoDbClient::connect(settings).await;
        assert_eq!(client.table_prefix(), Some("QA"));
    }
}
