//! Application settings and configuration
//!
//! This module provides configuration management for the DAO layer,
//! loading settings from environment variables with sensible defaults.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;

/// Upper bound DynamoDB accepts for `TotalSegments` on a parallel scan
pub const MAX_SCAN_SEGMENTS: u32 = 1_000_000;

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[value(alias = "dev")]
    Development,
    #[value(alias = "staging", alias = "stage")]
    Qa,
    #[value(alias = "prod")]
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Qa => write!(f, "qa"),
            Environment::Production => write!(f, "production"),
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Development
    }
}

impl std::str::FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "qa" | "staging" | "stage" => Ok(Environment::Qa),
            "production" | "prod" => Ok(Environment::Production),
            _ => anyhow::bail!("Invalid environment: {}. Expected: development, qa, or production", s),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    // App settings
    pub app_name: String,
    pub app_version: String,
    pub environment: Environment,
    pub log_level: String,

    // AWS settings
    pub aws_region: String,
    #[serde(skip_serializing)]
    pub aws_access_key_id: Option<String>,
    #[serde(skip_serializing)]
    pub aws_secret_access_key: Option<String>,
    pub dynamodb_endpoint_url: Option<String>,

    // Table naming
    /// Prefix separating environments and developers, e.g. `QA` or `JDOE`
    pub table_prefix: Option<String>,

    /// How long to wait for a freshly created table to become ACTIVE
    pub table_ready_timeout_seconds: u64,

    /// Default number of segments for parallel scans
    pub scan_segments: u32,
}

impl Settings {
    /// Load settings from environment variables with defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignored in production typically)
        dotenvy::dotenv().ok();

        let settings = Self {
            // App settings
            app_name: env_or_default("APP_NAME", "tabledao"),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: env_or_default("ENVIRONMENT", "development")
                .parse()
                .unwrap_or_default(),
            log_level: env_or_default("LOG_LEVEL", "info"),

            // AWS settings
            aws_region: env_or_default("AWS_REGION", "us-east-1"),
            aws_access_key_id: env::var("AWS_ACCESS_KEY_ID").ok(),
            aws_secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
            dynamodb_endpoint_url: env::var("DYNAMODB_ENDPOINT_URL").ok(),

            // Table naming
            table_prefix: env::var("DYNAMODB_TABLE_PREFIX").ok(),
            table_ready_timeout_seconds: env_or_default("DYNAMODB_TABLE_READY_TIMEOUT", "60")
                .parse()
                .context("Invalid DYNAMODB_TABLE_READY_TIMEOUT value")?,
            scan_segments: env_or_default("DYNAMODB_SCAN_SEGMENTS", "4")
                .parse()
                .context("Invalid DYNAMODB_SCAN_SEGMENTS value")?,
        };

        // Validate settings
        settings.validate()?;

        Ok(settings)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if self.scan_segments == 0 || self.scan_segments > MAX_SCAN_SEGMENTS {
            anyhow::bail!(
                "scan_segments must be between 1 and {}, got {}",
                MAX_SCAN_SEGMENTS,
                self.scan_segments
            );
        }

        if self.table_ready_timeout_seconds == 0 {
            anyhow::bail!("table_ready_timeout_seconds must be > 0");
        }

        if self.aws_access_key_id.is_some() != self.aws_secret_access_key.is_some() {
            anyhow::bail!("AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be set together");
        }

        if self.is_production() && self.table_prefix.is_none() {
            tracing::warn!("Running in production without DYNAMODB_TABLE_PREFIX; tables cannot be opened");
        }

        Ok(())
    }

    /// Static credentials, when both halves are configured
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        match (&self.aws_access_key_id, &self.aws_secret_access_key) {
            (Some(key), Some(secret)) => Some((key.as_str(), secret.as_str())),
            _ => None,
        }
    }

    /// Check if running in production mode
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "tabledao".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: Environment::Development,
            log_level: "info".to_string(),
            aws_region: "us-east-1".to_string(),
            aws_access_key_id: None,
            aws_secret_access_key: None,
            dynamodb_endpoint_url: None,
            table_prefix: None,
            table_ready_timeout_seconds: 60,
            scan_segments: 4,
        }
    }
}

/// Helper function to get environment variable with default
fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.app_name, "tabledao");
        assert_eq!(settings.scan_segments, 4);
        assert!(settings.table_prefix.is_none());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!("development".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("QA".parse::<Environment>().unwrap(), Environment::Qa);
        assert_eq!("staging".parse::<Environment>().unwrap(), Environment::Qa);
        assert_eq!("production".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert!("sandbox".parse::<Environment>().is_err());
    }

    #[test]
    fn test_is_production() {
        let mut settings = Settings::default();
        assert!(!settings.is_production());

        settings.environment = Environment::Production;
        assert!(settings.is_production());
        // Missing prefix in production only warns; opening a table is what fails
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_environment_display() {
        assert_eq!(Environment::Qa.to_string(), "qa");
        assert_eq!(Environment::Production.to_string(), "production");
    }

    #[test]
    fn test_scan_segments_bounds() {
        let mut settings = Settings::default();
        settings.scan_segments = 0;
        assert!(settings.validate().is_err());

        settings.scan_segments = MAX_SCAN_SEGMENTS + 1;
        assert!(settings.validate().is_err());

        settings.scan_segments = MAX_SCAN_SEGMENTS;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_credentials_must_be_paired() {
        let mut settings = Settings::default();
        settings.aws_access_key_id = Some("AKIDEXAMPLE".to_string());
        assert!(settings.validate().is_err());
        assert!(settings.static_credentials().is_none());

        settings.aws_secret_access_key = Some("secret".to_string());
        assert!(settings.validate().is_ok());
        assert_eq!(settings.static_credentials(), Some(("AKIDEXAMPLE", "secret")));
    }

    #[test]
    fn test_secrets_not_serialized() {
        let mut settings = Settings::default();
        settings.aws_access_key_id = Some("AKIDEXAMPLE".to_string());
        settings.aws_secret_access_key = Some("secret".to_string());

        let json = serde_json::to_string(&settings).unwrap();
        assert!(!json.contains("AKIDEXAMPLE"));
        assert!(!json.contains("secret"));
    }
}
