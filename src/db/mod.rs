//! Database module
//!
//! Contains the DynamoDB connection, table naming, mapper configuration and
//! the generic data access layer.

pub mod dao;
pub mod dynamodb;
pub mod expression;
pub mod mapper;
pub mod schema;
pub mod table;

pub use dao::{Dao, TableDao};
pub use dynamodb::DynamoDbClient;
pub use expression::{Item, ScanFilter};
pub use mapper::{ConsistentReads, MapperConfig, SaveBehavior, TableNameOverride};
pub use schema::initialize_table;
pub use table::TableName;
