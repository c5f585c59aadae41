//! Entity schema metadata.
//!
//! The [`Schema`] is the catalog piggy-back declarations are validated
//! against: entity tables, primary keys, columns, associations and the
//! single-table-inheritance parent of each entity type.
//!
//! # Example
//!
//! ```
//! use piggyback::schema::{ColumnType, EntityDef, Schema};
//!
//! let mut schema = Schema::new();
//! schema.define(
//!     EntityDef::new("Customer", "customers")
//!         .column("id", ColumnType::Integer)
//!         .column("name", ColumnType::String),
//! );
//! schema.define(
//!     EntityDef::new("Order", "orders")
//!         .column("id", ColumnType::Integer)
//!         .column("customer_id", ColumnType::Integer)
//!         .belongs_to("customer", "Customer"),
//! );
//!
//! let customer = schema.resolve_association("Order", "customer").unwrap();
//! assert_eq!(customer.foreign_key_column, "customer_id");
//! ```

pub mod association;
pub mod column;

pub use association::{AssociationDef, AssociationDescriptor, AssociationKind};
pub use column::{ColumnMeta, ColumnType};

use crate::error::PiggyBackError;
use heck::ToSnakeCase;
use std::collections::{BTreeSet, HashMap};

/// Metadata of one entity type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDef {
    /// Entity type name (e.g. `Order`)
    pub name: String,
    /// Table; subtypes inherit their parent's when `None`
    pub table_name: Option<String>,
    /// Primary key column; inherited when `None`, `id` at the root
    pub primary_key: Option<String>,
    /// Single-table-inheritance discriminator column
    pub inheritance_column: String,
    /// Supertype, if this entity is a subtype
    pub parent: Option<String>,
    /// Own columns, in declaration order
    pub columns: Vec<ColumnMeta>,
    /// Own associations
    pub associations: Vec<AssociationDef>,
    /// Explicitly defined reader methods; generated readers never shadow these
    pub methods: BTreeSet<String>,
}

impl EntityDef {
    /// A root entity type stored in `table_name`
    pub fn new(name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table_name: Some(table_name.into()),
            primary_key: None,
            inheritance_column: "type".to_string(),
            parent: None,
            columns: Vec::new(),
            associations: Vec::new(),
            methods: BTreeSet::new(),
        }
    }

    /// A subtype sharing its parent's table
    pub fn subtype(name: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table_name: None,
            primary_key: None,
            inheritance_column: "type".to_string(),
            parent: Some(parent.into()),
            columns: Vec::new(),
            associations: Vec::new(),
            methods: BTreeSet::new(),
        }
    }

    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = Some(column.into());
        self
    }

    pub fn inheritance_column(mut self, column: impl Into<String>) -> Self {
        self.inheritance_column = column.into();
        self
    }

    pub fn column(self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.column_meta(ColumnMeta::new(name, column_type))
    }

    pub fn column_meta(mut self, column: ColumnMeta) -> Self {
        self.columns.push(column);
        self
    }

    pub fn belongs_to(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.association(AssociationDef::new(name, AssociationKind::BelongsTo, target))
    }

    pub fn has_one(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.association(AssociationDef::new(name, AssociationKind::HasOne, target))
    }

    pub fn has_many(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.association(AssociationDef::new(name, AssociationKind::HasMany, target))
    }

    pub fn has_many_through(self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.association(AssociationDef::new(
            name,
            AssociationKind::HasManyThrough,
            target,
        ))
    }

    pub fn association(mut self, association: AssociationDef) -> Self {
        self.associations.push(association);
        self
    }

    /// Declare an explicit reader method
    pub fn method(mut self, name: impl Into<String>) -> Self {
        self.methods.insert(name.into());
        self
    }
}

/// Catalog of entity metadata
#[derive(Debug, Clone, Default)]
pub struct Schema {
    entities: HashMap<String, EntityDef>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define (or redefine) an entity type
    pub fn define(&mut self, entity: EntityDef) -> &mut Self {
        self.entities.insert(entity.name.clone(), entity);
        self
    }

    /// Add a column to an already defined entity type
    ///
    /// # Errors
    ///
    /// Returns [`PiggyBackError::UnknownEntity`] if the entity is not defined.
    pub fn add_column(&mut self, entity: &str, column: ColumnMeta) -> Result<(), PiggyBackError> {
        let def = self
            .entities
            .get_mut(entity)
            .ok_or_else(|| PiggyBackError::UnknownEntity(entity.to_string()))?;
        def.columns.push(column);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`PiggyBackError::UnknownEntity`] if the entity is not defined.
    pub fn entity(&self, name: &str) -> Result<&EntityDef, PiggyBackError> {
        self.entities
            .get(name)
            .ok_or_else(|| PiggyBackError::UnknownEntity(name.to_string()))
    }

    /// The entity followed by its ancestors, nearest first
    ///
    /// # Errors
    ///
    /// Returns [`PiggyBackError::UnknownEntity`] if the entity or one of its
    /// ancestors is not defined.
    pub fn lineage(&self, name: &str) -> Result<Vec<&EntityDef>, PiggyBackError> {
        let mut chain = Vec::new();
        let mut current = Some(name);
        while let Some(entity_name) = current {
            if chain.iter().any(|e: &&EntityDef| e.name == entity_name) {
                break;
            }
            let def = self.entity(entity_name)?;
            current = def.parent.as_deref();
            chain.push(def);
        }
        Ok(chain)
    }

    /// Names of the entity and its ancestors, nearest first
    pub fn lineage_names(&self, name: &str) -> Result<Vec<String>, PiggyBackError> {
        Ok(self
            .lineage(name)?
            .into_iter()
            .map(|e| e.name.clone())
            .collect())
    }

    pub fn table_name(&self, entity: &str) -> Result<String, PiggyBackError> {
        self.lineage(entity)?
            .into_iter()
            .find_map(|e| e.table_name.clone())
            .ok_or_else(|| PiggyBackError::UnknownEntity(entity.to_string()))
    }

    pub fn primary_key(&self, entity: &str) -> Result<String, PiggyBackError> {
        Ok(self
            .lineage(entity)?
            .into_iter()
            .find_map(|e| e.primary_key.clone())
            .unwrap_or_else(|| "id".to_string()))
    }

    /// All columns of the entity, ancestors' first, in declaration order
    pub fn columns(&self, entity: &str) -> Result<Vec<&ColumnMeta>, PiggyBackError> {
        let mut columns: Vec<&ColumnMeta> = Vec::new();
        for def in self.lineage(entity)?.into_iter().rev() {
            for column in &def.columns {
                if !columns.iter().any(|c| c.name == column.name) {
                    columns.push(column);
                }
            }
        }
        Ok(columns)
    }

    pub fn column(&self, entity: &str, column: &str) -> Result<Option<&ColumnMeta>, PiggyBackError> {
        Ok(self.columns(entity)?.into_iter().find(|c| c.name == column))
    }

    /// Type discriminator column, owned by the root of the hierarchy
    pub fn inheritance_column(&self, entity: &str) -> Result<&str, PiggyBackError> {
        self.lineage(entity)?
            .last()
            .map(|root| root.inheritance_column.as_str())
            .ok_or_else(|| PiggyBackError::UnknownEntity(entity.to_string()))
    }

    /// Columns holding user data, in declaration order
    pub fn content_columns(&self, entity: &str) -> Result<Vec<&ColumnMeta>, PiggyBackError> {
        let primary_key = self.primary_key(entity)?;
        let inheritance_column = self.inheritance_column(entity)?;
        Ok(self
            .columns(entity)?
            .into_iter()
            .filter(|c| c.is_content(&primary_key, inheritance_column))
            .collect())
    }

    /// Whether the entity or an ancestor defines an explicit method `name`
    pub fn has_method(&self, entity: &str, name: &str) -> Result<bool, PiggyBackError> {
        Ok(self
            .lineage(entity)?
            .into_iter()
            .any(|e| e.methods.contains(name)))
    }

    /// Resolve a to-one association into its descriptor.
    ///
    /// Associations are looked up on the entity first, then its ancestors.
    ///
    /// # Errors
    ///
    /// - [`PiggyBackError::UnknownEntity`] if the owner or target entity is not defined
    /// - [`PiggyBackError::UnknownAssociation`] if no association has that name
    /// - [`PiggyBackError::UnsupportedAssociationKind`] for `has_many` / `has_many_through`
    pub fn resolve_association(
        &self,
        entity: &str,
        association: &str,
    ) -> Result<AssociationDescriptor, PiggyBackError> {
        let (declaring, def) = self
            .lineage(entity)?
            .into_iter()
            .find_map(|e| {
                e.associations
                    .iter()
                    .find(|a| a.name == association)
                    .map(|a| (e, a))
            })
            .ok_or_else(|| PiggyBackError::UnknownAssociation {
                entity: entity.to_string(),
                association: association.to_string(),
            })?;

        if !def.kind.is_to_one() {
            return Err(PiggyBackError::UnsupportedAssociationKind {
                entity: entity.to_string(),
                association: association.to_string(),
                kind: def.kind,
            });
        }

        let foreign_key_column = match (&def.foreign_key, def.kind) {
            (Some(fk), _) => fk.clone(),
            (None, AssociationKind::BelongsTo) => format!("{}_id", def.name),
            (None, _) => format!("{}_id", declaring.name.to_snake_case()),
        };

        Ok(AssociationDescriptor {
            kind: def.kind,
            association_name: def.name.clone(),
            owner_type: entity.to_string(),
            owner_table_name: self.table_name(entity)?,
            owner_primary_key: self.primary_key(entity)?,
            target_type: def.target.clone(),
            target_table_name: self.table_name(&def.target)?,
            target_primary_key: self.primary_key(&def.target)?,
            foreign_key_column,
        })
    }
}
