//! Generated piggy-back readers.
//!
//! Each exposed (association, column) pair gets a reader named
//! `<association>_<column>`. A reader returns the joined value when the row
//! carries it and otherwise traverses the association through an
//! [`AssociationLoader`], so callers see the same value whichever way the row
//! was loaded.

use crate::error::{poisoned, PiggyBackError};
use crate::record::Record;
use crate::schema::{AssociationDescriptor, ColumnMeta};
use sea_query::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;

/// Live association traversal, provided by the data-access layer
pub trait AssociationLoader {
    /// Load the single target row of `association` for `owner`.
    ///
    /// Returns `Ok(None)` when the owner has no associated row.
    fn load(
        &self,
        owner: &Record,
        association: &AssociationDescriptor,
    ) -> Result<Option<Record>, PiggyBackError>;
}

type ReaderFn =
    dyn Fn(&Record, &dyn AssociationLoader) -> Result<Value, PiggyBackError> + Send + Sync;

/// A generated reader method
#[derive(Clone)]
pub struct Accessor {
    name: String,
    association: Arc<AssociationDescriptor>,
    column: ColumnMeta,
    reader: Arc<ReaderFn>,
}

impl std::fmt::Debug for Accessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accessor")
            .field("name", &self.name)
            .field("association", &self.association.association_name)
            .field("column", &self.column.name)
            .finish()
    }
}

impl Accessor {
    /// Build the reader for one column of `association`.
    pub fn generate(association: Arc<AssociationDescriptor>, column: ColumnMeta) -> Self {
        let name = format!("{}_{}", association.association_name, column.name);

        let reader: Arc<ReaderFn> = {
            let alias = name.clone();
            let association = Arc::clone(&association);
            let column = column.clone();
            Arc::new(move |record: &Record, loader: &dyn AssociationLoader| {
                if let Some(value) = record.get(&alias) {
                    log::trace!("{alias}: reading joined column");
                    return column.type_cast(value);
                }

                log::trace!("{alias}: loading association {}", association.association_name);
                #[cfg(feature = "metrics")]
                METRICS.record_fallback_load();

                match loader.load(record, &association)? {
                    Some(target) => {
                        let value = target.get(&column.name).ok_or_else(|| {
                            PiggyBackError::UnknownColumn {
                                entity: association.target_type.clone(),
                                column: column.name.clone(),
                            }
                        })?;
                        column.type_cast(value)
                    }
                    None => Ok(column.column_type.null_value()),
                }
            })
        };

        Self {
            name,
            association,
            column,
            reader,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn association(&self) -> &AssociationDescriptor {
        &self.association
    }

    pub fn column(&self) -> &ColumnMeta {
        &self.column
    }

    /// Read the attribute from `record`, traversing the association if needed.
    pub fn read(
        &self,
        record: &Record,
        loader: &dyn AssociationLoader,
    ) -> Result<Value, PiggyBackError> {
        (self.reader)(record, loader)
    }
}

/// Per-entity method tables of generated readers
#[derive(Debug, Default)]
pub struct AccessorTable {
    methods: RwLock<HashMap<String, HashMap<String, Accessor>>>,
}

impl AccessorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `accessor` to `entity`'s table.
    pub fn define(&self, entity: &str, accessor: Accessor) -> Result<(), PiggyBackError> {
        let mut methods = self.methods.write().map_err(poisoned)?;
        methods
            .entry(entity.to_string())
            .or_default()
            .insert(accessor.name.clone(), accessor);
        Ok(())
    }

    /// Find a reader on `lineage[0]` or the nearest ancestor defining it.
    pub fn find(&self, lineage: &[String], name: &str) -> Result<Option<Accessor>, PiggyBackError> {
        let methods = self.methods.read().map_err(poisoned)?;
        Ok(lineage
            .iter()
            .filter_map(|entity| methods.get(entity))
            .find_map(|table| table.get(name))
            .cloned())
    }

    /// Reader names visible on `lineage[0]`, sorted
    pub fn names(&self, lineage: &[String]) -> Result<Vec<String>, PiggyBackError> {
        let methods = self.methods.read().map_err(poisoned)?;
        let mut names: Vec<String> = lineage
            .iter()
            .filter_map(|entity| methods.get(entity))
            .flat_map(|table| table.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}
