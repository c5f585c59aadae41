//! Piggy-back attributes.
//!
//! A piggy-back declaration exposes columns of a `belongs_to` or `has_one`
//! target on the owning entity. The declaration is compiled once into a
//! select fragment and a LEFT JOIN; a query that names it in its `piggy`
//! option gets both folded into its select list and joins, so the target
//! columns come back on the owner's rows under `<association>_<column>`.
//!
//! # Example
//!
//! ```
//! use piggyback::piggy_back::{FindOptions, PiggyBack};
//! use piggyback::schema::{ColumnType, EntityDef, Schema};
//!
//! let mut schema = Schema::new();
//! schema
//!     .define(
//!         EntityDef::new("Customer", "customers")
//!             .column("id", ColumnType::Integer)
//!             .column("name", ColumnType::String),
//!     )
//!     .define(
//!         EntityDef::new("Order", "orders")
//!             .column("id", ColumnType::Integer)
//!             .column("customer_id", ColumnType::Integer)
//!             .belongs_to("customer", "Customer"),
//!     );
//!
//! let piggy = PiggyBack::new(schema);
//! piggy.piggy_back("Order", "customer", "customer", &["name"]).unwrap();
//!
//! let mut options = FindOptions::new().piggy("customer");
//! piggy.add_piggy_back("Order", &mut options).unwrap();
//! assert_eq!(options.select.as_deref(), Some("orders.*, customers.name AS customer_name"));
//! assert_eq!(
//!     options.joins.as_deref(),
//!     Some("LEFT JOIN customers ON customers.id = orders.customer_id")
//! );
//! assert_eq!(options.readonly, Some(true));
//! ```

pub mod accessor;
pub mod columns;
pub mod fragment;
pub mod merge;
pub mod registry;

pub use accessor::{Accessor, AccessorTable, AssociationLoader};
pub use fragment::{CompiledFragment, FragmentSynthesizer, JoinStyle, Quoting};
pub use merge::{FindOptions, PiggyDirective};
pub use registry::Registry;

use crate::config::{EntityDeclaration, PiggyBackSettings};
use crate::error::PiggyBackError;
use crate::record::Record;
use crate::schema::Schema;
use sea_query::{Alias, Asterisk, Query, SelectStatement, Value};
use serde::Deserialize;
use std::sync::Arc;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// A piggy-back declaration in configuration form
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Declaration {
    pub name: String,
    /// Association the attributes come from
    pub from: String,
    /// Target columns; empty means every content column
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl Declaration {
    pub fn new(name: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            from: from.into(),
            attributes: Vec::new(),
        }
    }

    pub fn attributes<S: Into<String>>(mut self, attributes: impl IntoIterator<Item = S>) -> Self {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }
}

/// Piggy-back support layered over a [`Schema`]
#[derive(Debug)]
pub struct PiggyBack {
    schema: Schema,
    synthesizer: FragmentSynthesizer,
    registry: Registry,
    accessors: AccessorTable,
}

impl PiggyBack {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            synthesizer: FragmentSynthesizer::default(),
            registry: Registry::new(),
            accessors: AccessorTable::new(),
        }
    }

    /// Build with the rendering options of `settings` and apply its declarations.
    ///
    /// # Errors
    ///
    /// Returns the first declaration error, see [`PiggyBack::declare_all`].
    pub fn with_settings(schema: Schema, settings: &PiggyBackSettings) -> Result<Self, PiggyBackError> {
        let mut piggy = Self::new(schema);
        piggy.synthesizer = FragmentSynthesizer::new(settings.quoting, settings.join_style);
        piggy.declare_all(&settings.declarations)?;
        Ok(piggy)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Mutable schema access; existing declarations keep their bound columns.
    pub fn schema_mut(&mut self) -> &mut Schema {
        &mut self.schema
    }

    pub fn synthesizer(&self) -> FragmentSynthesizer {
        self.synthesizer
    }

    /// Declare piggy-back `name` on `entity`, exposing `attributes` of the
    /// `from` association (every content column when empty).
    ///
    /// Generates a `<from>_<attribute>` reader per column unless `entity` or
    /// an ancestor already has a method or reader of that name.
    ///
    /// # Errors
    ///
    /// - [`PiggyBackError::UnknownEntity`] / [`PiggyBackError::UnknownAssociation`]
    /// - [`PiggyBackError::UnsupportedAssociationKind`] for to-many associations
    /// - [`PiggyBackError::UnknownColumn`] for attributes the target lacks
    pub fn piggy_back<S: AsRef<str>>(
        &self,
        entity: &str,
        name: &str,
        from: &str,
        attributes: &[S],
    ) -> Result<(), PiggyBackError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::declare_span(entity, name).entered();

        let association = self.schema.resolve_association(entity, from)?;
        let columns = columns::select_columns(&self.schema, &association.target_type, attributes)?;
        let fragment = self.synthesizer.synthesize(&association, &columns);
        let lineage = self.schema.lineage_names(entity)?;

        if self.registry.register(&lineage, name, fragment)?.is_some() {
            log::warn!("piggy back {name} redeclared on {entity}, replacing previous declaration");
        } else {
            log::debug!(
                "piggy back {name} declared on {entity} from {from} ({} columns)",
                columns.len()
            );
        }

        let association = Arc::new(association);
        for column in columns {
            let accessor = Accessor::generate(Arc::clone(&association), column);
            if self.schema.has_method(entity, accessor.name())?
                || self.accessors.find(&lineage, accessor.name())?.is_some()
            {
                log::debug!("{entity}#{} already defined, not generating reader", accessor.name());
                continue;
            }
            self.accessors.define(entity, accessor)?;
        }
        Ok(())
    }

    /// Declare from the configuration form.
    pub fn declare(&self, entity: &str, declaration: &Declaration) -> Result<(), PiggyBackError> {
        self.piggy_back(entity, &declaration.name, &declaration.from, &declaration.attributes)
    }

    /// Apply every declaration in order.
    ///
    /// A failing declaration does not stop the ones after it.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered.
    pub fn declare_all(&self, declarations: &[EntityDeclaration]) -> Result<(), PiggyBackError> {
        let mut first_error = None;
        for decl in declarations {
            if let Err(err) = self.piggy_back(&decl.entity, &decl.name, &decl.from, &decl.attributes) {
                log::warn!("piggy back {} on {} rejected: {err}", decl.name, decl.entity);
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// The compiled fragment `name` resolves to for `entity`
    pub fn fragment(&self, entity: &str, name: &str) -> Result<Arc<CompiledFragment>, PiggyBackError> {
        self.registry.resolve(&self.schema.lineage_names(entity)?, name)
    }

    /// Piggy-back names effective on `entity`, sorted
    pub fn piggy_back_names(&self, entity: &str) -> Result<Vec<String>, PiggyBackError> {
        self.registry.names(&self.schema.lineage_names(entity)?)
    }

    /// Fold the `piggy` directive of `options` into its select and joins.
    ///
    /// Without a directive `options` is left untouched. Otherwise select
    /// defaults to `<table>.*` and joins to empty, each named fragment is
    /// appended in order, the query is forced read-only and the directive is
    /// removed. Returns the applied fragments.
    ///
    /// # Errors
    ///
    /// Returns [`PiggyBackError::UnknownPiggyBack`] for a name not declared on
    /// `entity`, leaving `options` unchanged.
    pub fn add_piggy_back(
        &self,
        entity: &str,
        options: &mut FindOptions,
    ) -> Result<Vec<Arc<CompiledFragment>>, PiggyBackError> {
        if options.piggy.is_none() {
            return Ok(Vec::new());
        }

        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::merge_span(entity).entered();

        let lineage = self.schema.lineage_names(entity)?;
        let table = self.schema.table_name(entity)?;
        let fragments = merge::merge(
            options,
            || self.synthesizer.default_select(&table),
            |name| self.registry.resolve(&lineage, name),
        )?;

        #[cfg(feature = "metrics")]
        METRICS.record_merge();
        log::debug!("merged {} piggy backs into {entity} query", fragments.len());

        Ok(fragments)
    }

    /// Apply the named piggy-backs to a `SelectStatement`.
    ///
    /// All names are resolved before `query` is touched.
    pub fn apply_to_select(
        &self,
        entity: &str,
        directive: impl Into<PiggyDirective>,
        query: &mut SelectStatement,
    ) -> Result<Vec<Arc<CompiledFragment>>, PiggyBackError> {
        let directive = directive.into();
        let lineage = self.schema.lineage_names(entity)?;
        let fragments = directive
            .names()
            .into_iter()
            .map(|name| self.registry.resolve(&lineage, name))
            .collect::<Result<Vec<_>, _>>()?;
        for fragment in &fragments {
            fragment.apply(query);
        }
        Ok(fragments)
    }

    /// `SELECT <table>.* FROM <table>` with the named piggy-backs applied
    pub fn select_statement(
        &self,
        entity: &str,
        directive: impl Into<PiggyDirective>,
    ) -> Result<SelectStatement, PiggyBackError> {
        let table = self.schema.table_name(entity)?;
        let mut query = Query::select();
        query
            .column((Alias::new(table.clone()), Asterisk))
            .from(Alias::new(table));
        self.apply_to_select(entity, directive, &mut query)?;
        Ok(query)
    }

    /// Call the generated reader `name` on `record`.
    ///
    /// # Errors
    ///
    /// - [`PiggyBackError::UnknownAccessor`] if no reader `name` exists for the record's entity
    /// - [`PiggyBackError::TypeCast`] if the value does not fit the column type
    /// - errors from `loader` on the fallback path
    pub fn read(
        &self,
        record: &Record,
        name: &str,
        loader: &dyn AssociationLoader,
    ) -> Result<Value, PiggyBackError> {
        let accessor = self
            .accessor(record.entity(), name)?
            .ok_or_else(|| PiggyBackError::UnknownAccessor {
                entity: record.entity().to_string(),
                accessor: name.to_string(),
            })?;
        accessor.read(record, loader)
    }

    pub fn accessor(&self, entity: &str, name: &str) -> Result<Option<Accessor>, PiggyBackError> {
        self.accessors.find(&self.schema.lineage_names(entity)?, name)
    }

    /// Reader names available on `entity`, inherited ones included
    pub fn accessors(&self, entity: &str) -> Result<Vec<String>, PiggyBackError> {
        self.accessors.names(&self.schema.lineage_names(entity)?)
    }
}
