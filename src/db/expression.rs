//! Key extraction and expression building
//!
//! Placeholders are used for every attribute name so that records may use
//! DynamoDB reserved words (`name`, `status`, ...) as field names.

use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;

use crate::error::DaoError;

/// A DynamoDB item
pub type Item = HashMap<String, AttributeValue>;

/// Key map for a record id
pub fn key_for_id(primary_id: &str, id: &str) -> Item {
    HashMap::from([(primary_id.to_string(), AttributeValue::S(id.to_string()))])
}

/// Pull the primary key out of a serialized record
pub fn key_of(item: &Item, primary_id: &str) -> Result<Item, DaoError> {
    match item.get(primary_id) {
        Some(AttributeValue::S(id)) => Ok(key_for_id(primary_id, id)),
        Some(_) => Err(DaoError::InvalidKey {
            attribute: primary_id.to_string(),
        }),
        None => Err(DaoError::MissingKey {
            attribute: primary_id.to_string(),
        }),
    }
}

/// Drop NULL attributes, so a full put does not store explicit nulls
pub fn without_nulls(mut item: Item) -> Item {
    item.retain(|_, value| !matches!(value, AttributeValue::Null(_)));
    item
}

/// An UpdateItem expression with its placeholder maps
#[derive(Debug, Default, PartialEq)]
pub struct UpdatePlan {
    /// `None` when there is nothing to set or remove beyond the key
    pub expression: Option<String>,
    pub names: HashMap<String, String>,
    pub values: Item,
}

impl UpdatePlan {
    pub fn names(&self) -> Option<HashMap<String, String>> {
        (!self.names.is_empty()).then(|| self.names.clone())
    }

    pub fn values(&self) -> Option<Item> {
        (!self.values.is_empty()).then(|| self.values.clone())
    }
}

/// Build the update for a serialized record
///
/// Non-null attributes are SET. Null attributes are REMOVEd when
/// `remove_nulls` is true and skipped otherwise. The key attribute is never
/// part of the expression.
pub fn build_update(item: &Item, primary_id: &str, remove_nulls: bool) -> UpdatePlan {
    let mut attributes: Vec<(&String, &AttributeValue)> = item
        .iter()
        .filter(|(name, _)| name.as_str() != primary_id)
        .collect();
    attributes.sort_by(|a, b| a.0.cmp(b.0));

    let mut plan = UpdatePlan::default();
    let mut set_clauses = Vec::new();
    let mut remove_clauses = Vec::new();

    for (index, (name, value)) in attributes.into_iter().enumerate() {
        let is_null = matches!(value, AttributeValue::Null(_));
        if is_null && !remove_nulls {
            continue;
        }

        let name_placeholder = format!("#a{}", index);
        plan.names.insert(name_placeholder.clone(), name.clone());

        if is_null {
            remove_clauses.push(name_placeholder);
        } else {
            let value_placeholder = format!(":v{}", index);
            set_clauses.push(format!("{} = {}", name_placeholder, value_placeholder));
            plan.values.insert(value_placeholder, value.clone());
        }
    }

    let mut sections = Vec::new();
    if !set_clauses.is_empty() {
        sections.push(format!("SET {}", set_clauses.join(", ")));
    }
    if !remove_clauses.is_empty() {
        sections.push(format!("REMOVE {}", remove_clauses.join(", ")));
    }
    if !sections.is_empty() {
        plan.expression = Some(sections.join(" "));
    }

    plan
}

/// Equality filter on a single string column
#[derive(Debug, Clone, PartialEq)]
pub struct ScanFilter {
    pub expression: String,
    pub names: HashMap<String, String>,
    pub values: Item,
    /// Items evaluated per Scan request; `None` lets DynamoDB fill 1 MB pages
    pub page_size: Option<i32>,
}

impl ScanFilter {
    pub fn equals(column: &str, value: &str) -> Self {
        Self {
            expression: "#col = :val1".to_string(),
            names: HashMap::from([("#col".to_string(), column.to_string())]),
            values: HashMap::from([(":val1".to_string(), AttributeValue::S(value.to_string()))]),
            page_size: None,
        }
    }

    pub fn with_page_size(mut self, page_size: i32) -> Self {
        self.page_size = Some(page_size);
        self
    }
}
