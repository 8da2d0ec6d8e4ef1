//! Table data-access objects
//!
//! `TableDao` maps any serde-serializable record onto rows of one
//! environment-prefixed table. Every operation builds its own
//! [`MapperConfig`], delegates to the SDK, and on failure logs a structured
//! error event before returning the error to the caller.
//!
//! The [`Dao`] trait lets a concrete, typed DAO get the whole CRUD surface by
//! exposing its `TableDao`.

use async_trait::async_trait;
use futures::future::try_join_all;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_dynamo::{from_item, to_item};
use std::sync::Arc;
use std::time::Duration;

use crate::config::MAX_SCAN_SEGMENTS;
use crate::db::expression::{build_update, key_for_id, key_of, without_nulls, Item, ScanFilter};
use crate::db::mapper::{ConsistentReads, MapperConfig, SaveBehavior};
use crate::db::schema::initialize_table;
use crate::db::table::TableName;
use crate::db::DynamoDbClient;
use crate::error::DaoError;

/// CRUD and scan access to a single prefixed table
#[derive(Clone)]
pub struct TableDao {
    client: Arc<DynamoDbClient>,
    table: TableName,
    primary_id: String,
}

impl TableDao {
    /// Open `base_table_name` using the table prefix from settings.
    pub async fn connect(
        client: Arc<DynamoDbClient>,
        base_table_name: &str,
        primary_id: &str,
    ) -> Result<Self, DaoError> {
        let prefix = client.table_prefix().unwrap_or_default().to_string();
        Self::open(client, &prefix, base_table_name, primary_id).await
    }

    /// Open `{prefix}_{base_table_name}`, creating the table if needed.
    ///
    /// The prefix is required; an empty one fails with
    /// [`DaoError::MissingTablePrefix`].
    pub async fn open(
        client: Arc<DynamoDbClient>,
        prefix: &str,
        base_table_name: &str,
        primary_id: &str,
    ) -> Result<Self, DaoError> {
        let result = Self::initialize(client, prefix, base_table_name, primary_id).await;

        if let Err(e) = &result {
            e.log();
            tracing::error!(
                base_table = %base_table_name,
                "Could not initialize connection to DynamoDB; check the system clock (ntp) and DNS"
            );
        }

        result
    }

    async fn initialize(
        client: Arc<DynamoDbClient>,
        prefix: &str,
        base_table_name: &str,
        primary_id: &str,
    ) -> Result<Self, DaoError> {
        let table = TableName::new(prefix, base_table_name)?;
        tracing::info!(table = %table, primary_id = %primary_id, "Initializing DynamoDB table");

        let timeout = Duration::from_secs(client.settings().table_ready_timeout_seconds);
        initialize_table(client.client(), table.full(), primary_id, timeout).await?;

        Ok(Self::attach(client, table, primary_id))
    }

    /// Wrap a table that is known to exist, without touching DynamoDB.
    pub fn attach(client: Arc<DynamoDbClient>, table: TableName, primary_id: &str) -> Self {
        Self {
            client,
            table,
            primary_id: primary_id.to_string(),
        }
    }

    /// Physical table name, e.g. `QA_USERS`
    pub fn table_name(&self) -> &str {
        self.table.full()
    }

    /// Table name without the prefix, e.g. `USERS`
    pub fn base_table_name(&self) -> &str {
        self.table.base()
    }

    /// Name of the hash key attribute
    pub fn primary_id(&self) -> &str {
        &self.primary_id
    }

    /// Configuration pinning calls to this DAO's table
    fn table_config(&self) -> MapperConfig {
        MapperConfig::for_table(self.table.full())
    }

    fn consistent_config(&self) -> MapperConfig {
        let reads = MapperConfig::new().with_consistent_reads(ConsistentReads::Consistent);
        MapperConfig::merge(&reads, &self.table_config())
    }

    fn save_config(&self, behavior: SaveBehavior) -> MapperConfig {
        let save = MapperConfig::new().with_save_behavior(behavior);
        MapperConfig::merge(&save, &self.table_config())
    }

    /// Load a record by id with a consistent read.
    pub async fn get<T: DeserializeOwned>(&self, id: &str) -> Result<Option<T>, DaoError> {
        self.load_with(id, &self.consistent_config()).await
    }

    /// Write a record. Like `update`, attributes stored on an existing row
    /// that the record does not model are kept; use `save_with` and
    /// [`SaveBehavior::Clobber`] to replace the row outright.
    pub async fn create<T: Serialize + ?Sized>(&self, model: &T) -> Result<(), DaoError> {
        self.save_with(model, &self.save_config(SaveBehavior::Update)).await
    }

    /// Update the stored row from a record: non-null attributes are written,
    /// null attributes are removed, other stored attributes are kept.
    pub async fn update<T: Serialize + ?Sized>(&self, model: &T) -> Result<(), DaoError> {
        self.save_with(model, &self.save_config(SaveBehavior::Update)).await
    }

    /// Delete the row keyed by the record's primary key.
    pub async fn delete<T: Serialize + ?Sized>(&self, model: &T) -> Result<(), DaoError> {
        self.delete_with(model, &self.consistent_config()).await
    }

    /// Parallel scan for rows whose `column_name` equals `value`.
    pub async fn scan<T: DeserializeOwned>(
        &self,
        total_segments: u32,
        column_name: &str,
        value: &str,
    ) -> Result<Vec<T>, DaoError> {
        let filter = ScanFilter::equals(column_name, value);
        self.scan_with(total_segments, &filter, &self.consistent_config())
            .await
    }

    /// Load a record by id. `config` is laid over this DAO's table config.
    pub async fn load_with<T: DeserializeOwned>(
        &self,
        id: &str,
        config: &MapperConfig,
    ) -> Result<Option<T>, DaoError> {
        let config = MapperConfig::merge(&self.table_config(), config);
        let table_name = config.table_name(self.table.base());

        let output = self
            .client
            .client()
            .get_item()
            .table_name(&table_name)
            .set_key(Some(key_for_id(&self.primary_id, id)))
            .consistent_read(config.consistent_reads().is_consistent())
            .send()
            .await
            .map_err(|e| DaoError::from_sdk("GetItem", &table_name, e))
            .inspect_err(DaoError::log)?;

        match output.item {
            Some(item) => {
                let record = from_item(item)
                    .map_err(DaoError::from)
                    .inspect_err(DaoError::log)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Save a record according to the config's save behavior.
    pub async fn save_with<T: Serialize + ?Sized>(
        &self,
        model: &T,
        config: &MapperConfig,
    ) -> Result<(), DaoError> {
        let config = MapperConfig::merge(&self.table_config(), config);
        let table_name = config.table_name(self.table.base());

        let item = self.serialize(model).inspect_err(DaoError::log)?;
        let key = key_of(&item, &self.primary_id).inspect_err(DaoError::log)?;

        match config.save_behavior() {
            SaveBehavior::Clobber => {
                self.client
                    .client()
                    .put_item()
                    .table_name(&table_name)
                    .set_item(Some(without_nulls(item)))
                    .send()
                    .await
                    .map_err(|e| DaoError::from_sdk("PutItem", &table_name, e))
                    .inspect_err(DaoError::log)?;
            }
            behavior => {
                let plan = build_update(&item, &self.primary_id, behavior == SaveBehavior::Update);

                self.client
                    .client()
                    .update_item()
                    .table_name(&table_name)
                    .set_key(Some(key))
                    .set_update_expression(plan.expression.clone())
                    .set_expression_attribute_names(plan.names())
                    .set_expression_attribute_values(plan.values())
                    .send()
                    .await
                    .map_err(|e| DaoError::from_sdk("UpdateItem", &table_name, e))
                    .inspect_err(DaoError::log)?;
            }
        }

        tracing::debug!(table = %table_name, behavior = ?config.save_behavior(), "Saved record");
        Ok(())
    }

    /// Delete the row keyed by the record's primary key.
    pub async fn delete_with<T: Serialize + ?Sized>(
        &self,
        model: &T,
        config: &MapperConfig,
    ) -> Result<(), DaoError> {
        let config = MapperConfig::merge(&self.table_config(), config);
        let table_name = config.table_name(self.table.base());

        let item = self.serialize(model).inspect_err(DaoError::log)?;
        let key = key_of(&item, &self.primary_id).inspect_err(DaoError::log)?;

        self.client
            .client()
            .delete_item()
            .table_name(&table_name)
            .set_key(Some(key))
            .send()
            .await
            .map_err(|e| DaoError::from_sdk("DeleteItem", &table_name, e))
            .inspect_err(DaoError::log)?;

        tracing::debug!(table = %table_name, "Deleted record");
        Ok(())
    }

    /// Scan all segments concurrently and collect matching records.
    ///
    /// Records come back grouped by segment, in segment order.
    pub async fn scan_with<T: DeserializeOwned>(
        &self,
        total_segments: u32,
        filter: &ScanFilter,
        config: &MapperConfig,
    ) -> Result<Vec<T>, DaoError> {
        if total_segments == 0 || total_segments > MAX_SCAN_SEGMENTS {
            let err = DaoError::InvalidArgument(format!(
                "total_segments must be between 1 and {}, got {}",
                MAX_SCAN_SEGMENTS, total_segments
            ));
            err.log();
            return Err(err);
        }

        let config = MapperConfig::merge(&self.table_config(), config);
        let table_name = config.table_name(self.table.base());
        let consistent = config.consistent_reads().is_consistent();

        let segments = (0..total_segments).map(|segment| {
            self.scan_segment(&table_name, segment, total_segments, filter, consistent)
        });
        let pages = try_join_all(segments).await.inspect_err(DaoError::log)?;

        let records = pages
            .into_iter()
            .flatten()
            .map(|item| from_item(item).map_err(DaoError::from))
            .collect::<Result<Vec<T>, _>>()
            .inspect_err(DaoError::log)?;

        tracing::debug!(
            table = %table_name,
            total_segments = total_segments,
            matched = records.len(),
            "Scan complete"
        );

        Ok(records)
    }

    /// Read every page of one scan segment
    async fn scan_segment(
        &self,
        table_name: &str,
        segment: u32,
        total_segments: u32,
        filter: &ScanFilter,
        consistent: bool,
    ) -> Result<Vec<Item>, DaoError> {
        let mut items = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let output = self
                .client
                .client()
                .scan()
                .table_name(table_name)
                .segment(segment as i32)
                .total_segments(total_segments as i32)
                .consistent_read(consistent)
                .filter_expression(&filter.expression)
                .set_expression_attribute_names(Some(filter.names.clone()))
                .set_expression_attribute_values(Some(filter.values.clone()))
                .set_limit(filter.page_size)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| DaoError::from_sdk("Scan", table_name, e))?;

            items.extend(output.items.unwrap_or_default());

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(items)
    }

    fn serialize<T: Serialize + ?Sized>(&self, model: &T) -> Result<Item, DaoError> {
        Ok(to_item(model)?)
    }
}

/// A typed DAO over one table.
///
/// Implementors only supply the backing [`TableDao`]; the CRUD surface is
/// provided.
#[async_trait]
pub trait Dao: Send + Sync {
    type Model: Serialize + DeserializeOwned + Send + Sync;

    fn table(&self) -> &TableDao;

    async fn get(&self, id: &str) -> Result<Option<Self::Model>, DaoError> {
        self.table().get(id).await
    }

    async fn create(&self, model: &Self::Model) -> Result<(), DaoError> {
        self.table().create(model).await
    }

    async fn update(&self, model: &Self::Model) -> Result<(), DaoError> {
        self.table().update(model).await
    }

    async fn delete(&self, model: &Self::Model) -> Result<(), DaoError> {
        self.table().delete(model).await
    }

    async fn scan(
        &self,
        total_segments: u32,
        column_name: &str,
        value: &str,
    ) -> Result<Vec<Self::Model>, DaoError> {
        self.table().scan(total_segments, column_name, value).await
    }

    fn table_name(&self) -> &str {
        self.table().table_name()
    }

    fn base_table_name(&self) -> &str {
        self.table().base_table_name()
    }
}
