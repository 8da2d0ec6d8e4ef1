//! Environment-prefixed table names
//!
//! Every physical table is named `{prefix}_{base}`, which keeps development,
//! QA, production and per-developer tables apart in a single account:
//!
//! - `QA_USERS`
//! - `PRODUCTION_USERS`
//! - `JDOE_USERS`

use std::fmt;

use crate::error::DaoError;

const MIN_TABLE_NAME_LEN: usize = 3;
const MAX_TABLE_NAME_LEN: usize = 255;

/// A validated, prefixed DynamoDB table name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    prefix: String,
    base: String,
    full: String,
}

impl TableName {
    /// Compose a table name from a required prefix and a base name
    pub fn new(prefix: &str, base: &str) -> Result<Self, DaoError> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Err(DaoError::MissingTablePrefix);
        }

        let full = format!("{}_{}", prefix, base);
        if base.trim().is_empty() {
            return Err(DaoError::InvalidTableName {
                name: full,
                reason: "base table name is required".to_string(),
            });
        }
        validate(&full)?;

        Ok(Self {
            prefix: prefix.to_string(),
            base: base.to_string(),
            full,
        })
    }

    /// Physical table name, as sent to DynamoDB
    pub fn full(&self) -> &str {
        &self.full
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

/// Check a physical name against DynamoDB's naming rules
pub(crate) fn validate(name: &str) -> Result<(), DaoError> {
    let invalid = |reason: String| DaoError::InvalidTableName {
        name: name.to_string(),
        reason,
    };

    if name.len() < MIN_TABLE_NAME_LEN || name.len() > MAX_TABLE_NAME_LEN {
        return Err(invalid(format!(
            "length must be between {} and {} characters",
            MIN_TABLE_NAME_LEN, MAX_TABLE_NAME_LEN
        )));
    }

    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
    {
        return Err(invalid(format!("character '{}' is not allowed", bad)));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_name() {
        let name = TableName::new("QA", "USERS").unwrap();
        assert_eq!(name.full(), "QA_USERS");
        assert_eq!(name.base(), "USERS");
        assert_eq!(name.prefix(), "QA");
        assert_eq!(name.to_string(), "QA_USERS");
    }

    #[test]
    fn test_developer_prefix() {
        let name = TableName::new("JDOE", "USERS").unwrap();
        assert_eq!(name.full(), "JDOE_USERS");
    }

    #[test]
    fn test_prefix_is_trimmed() {
        let name = TableName::new("  PRODUCTION ", "USERS").unwrap();
        assert_eq!(name.full(), "PRODUCTION_USERS");
    }

    #[test]
    fn test_missing_prefix_rejected() {
        assert!(matches!(TableName::new("", "USERS"), Err(DaoError::MissingTablePrefix)));
        assert!(matches!(TableName::new("   ", "USERS"), Err(DaoError::MissingTablePrefix)));
    }

    #[test]
    fn test_empty_base_rejected() {
        for base in ["", "   "] {
            let err = TableName::new("PRODUCTION", base).unwrap_err();
            assert!(matches!(err, DaoError::InvalidTableName { reason, .. } if reason.contains("base")));
        }
    }

    #[test]
    fn test_invalid_characters_rejected() {
        let err = TableName::new("QA", "USER ACCOUNTS").unwrap_err();
        assert!(matches!(err, DaoError::InvalidTableName { .. }));
    }

    #[test]
    fn test_length_limits() {
        assert!(TableName::new("Q", "").is_err());
        assert!(TableName::new("Q", "A").is_ok());
        assert!(TableName::new("QA", &"X".repeat(253)).is_err());
        assert!(TableName::new("QA", &"X".repeat(252)).is_ok());
    }
}
