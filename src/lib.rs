//! Generic DynamoDB data-access objects with environment-prefixed tables

// Public modules
pub mod config;
pub mod db;
pub mod error;

// Re-export commonly used types
pub use config::Settings;
pub use db::{Dao, DynamoDbClient, MapperConfig, TableDao, TableName};
pub use error::DaoError;
