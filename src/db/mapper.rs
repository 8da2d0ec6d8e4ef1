//! Per-call mapper configuration
//!
//! Each DAO call builds a `MapperConfig` describing how the record is read or
//! written. Configurations compose: `MapperConfig::merge` lays an override
//! configuration over a base one, field by field.

/// Read consistency requested from DynamoDB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsistentReads {
    Consistent,
    #[default]
    Eventual,
}

impl ConsistentReads {
    pub fn is_consistent(self) -> bool {
        self == ConsistentReads::Consistent
    }
}

/// How a save treats the row already stored under the same key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveBehavior {
    /// Write modeled attributes, remove attributes whose value is null,
    /// leave unmodeled attributes on the stored row untouched.
    #[default]
    Update,
    /// Like `Update`, but null attributes are left alone.
    UpdateSkipNullAttributes,
    /// Replace the entire row.
    Clobber,
}

/// Rewrites the table name a call is sent to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableNameOverride {
    /// Use this name verbatim
    Replacement(String),
    /// Prepend this string to the base name
    Prefix(String),
}

impl TableNameOverride {
    pub fn resolve(&self, base: &str) -> String {
        match self {
            TableNameOverride::Replacement(name) => name.clone(),
            TableNameOverride::Prefix(prefix) => format!("{}{}", prefix, base),
        }
    }
}

/// Mapper configuration; unset fields fall back to the defaults
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapperConfig {
    pub consistent_reads: Option<ConsistentReads>,
    pub save_behavior: Option<SaveBehavior>,
    pub table_name_override: Option<TableNameOverride>,
}

impl MapperConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_consistent_reads(mut self, reads: ConsistentReads) -> Self {
        self.consistent_reads = Some(reads);
        self
    }

    pub fn with_save_behavior(mut self, behavior: SaveBehavior) -> Self {
        self.save_behavior = Some(behavior);
        self
    }

    pub fn with_table_name_override(mut self, table_override: TableNameOverride) -> Self {
        self.table_name_override = Some(table_override);
        self
    }

    /// Shorthand for a config that replaces the table name
    pub fn for_table(name: impl Into<String>) -> Self {
        Self::new().with_table_name_override(TableNameOverride::Replacement(name.into()))
    }

    /// Lay `overrides` over `base`: every field set in `overrides` wins
    pub fn merge(base: &MapperConfig, overrides: &MapperConfig) -> MapperConfig {
        MapperConfig {
            consistent_reads: overrides.consistent_reads.or(base.consistent_reads),
            save_behavior: overrides.save_behavior.or(base.save_behavior),
            table_name_override: overrides
                .table_name_override
                .clone()
                .or_else(|| base.table_name_override.clone()),
        }
    }

    pub fn consistent_reads(&self) -> ConsistentReads {
        self.consistent_reads.unwrap_or_default()
    }

    pub fn save_behavior(&self) -> SaveBehavior {
        self.save_behavior.unwrap_or_default()
    }

    /// Physical table name for `base` under this configuration
    pub fn table_name(&self, base: &str) -> String {
        match &self.table_name_override {
            Some(table_override) => table_override.resolve(base),
            None => base.to_string(),
        }
    }
}
