//! Loaded rows.
//!
//! A [`Record`] is the attribute storage of one loaded entity row. Rows
//! fetched through a piggy-back query carry extra attributes keyed by the
//! aliased column name (`customer_name`) and are marked read-only.

use sea_query::Value;
use std::collections::HashMap;

/// Attribute storage of one loaded entity row
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    entity: String,
    attributes: HashMap<String, Value>,
    readonly: bool,
}

impl Record {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            attributes: HashMap::new(),
            readonly: false,
        }
    }

    /// Builder-style attribute setter
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    pub fn set_readonly(&mut self, readonly: bool) {
        self.readonly = readonly;
    }
}
