//! Test doubles for the data-access layer.
//!
//! Enabled for unit tests and behind the `test-helpers` feature.

use crate::error::PiggyBackError;
use crate::executor::{LifeError, LifeExecutor};
use crate::piggy_back::AssociationLoader;
use crate::record::Record;
use crate::schema::AssociationDescriptor;
use may_postgres::types::ToSql;
use may_postgres::Row;
use sea_query::Value;
use std::cell::{Cell, RefCell};

/// In-memory association loader
///
/// Holds target records per entity type and answers a traversal by matching
/// the target key column against the owner's key value. Counts every load so
/// tests can tell the joined path from the fallback path.
#[derive(Debug, Default)]
pub struct MemoryLoader {
    records: Vec<Record>,
    loads: Cell<usize>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, record: Record) -> Self {
        self.records.push(record);
        self
    }

    /// Number of traversals performed so far
    pub fn loads(&self) -> usize {
        self.loads.get()
    }
}

impl AssociationLoader for MemoryLoader {
    fn load(
        &self,
        owner: &Record,
        association: &AssociationDescriptor,
    ) -> Result<Option<Record>, PiggyBackError> {
        self.loads.set(self.loads.get() + 1);
        let Some(key) = owner.get(association.owner_key()) else {
            return Ok(None);
        };
        if crate::schema::column::is_null(key) {
            return Ok(None);
        }
        Ok(self
            .records
            .iter()
            .find(|r| {
                r.entity() == association.target_type
                    && r.get(association.target_key()) == Some(key)
            })
            .cloned())
    }
}

/// Executor that records every SQL statement and returns no rows
#[derive(Debug, Default)]
pub struct MockExecutor {
    captured_sql: RefCell<Vec<String>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn captured_sql(&self) -> Vec<String> {
        self.captured_sql.borrow().clone()
    }
}

impl LifeExecutor for MockExecutor {
    fn query_all(&self, query: &str, _params: &[&dyn ToSql]) -> Result<Vec<Row>, LifeError> {
        self.captured_sql.borrow_mut().push(query.to_string());
        Ok(Vec::new())
    }
}

/// Convenience for building text values as a database driver would return them
pub fn text(value: &str) -> Value {
    Value::from(value.to_string())
}
