//! # Piggyback
//!
//! Piggy-back attributes for the Lifeguard ORM: read columns of a
//! `belongs_to` or `has_one` target straight off the owning entity's rows,
//! fetched with a single LEFT JOIN instead of one query per association.
//!
//! See [`piggy_back`] for declaring and merging, [`finder`] for running the
//! merged query through a [`LifeExecutor`].

pub mod config;
pub mod error;
pub mod executor;
pub mod finder;
pub mod metrics;
pub mod pagination;
pub mod piggy_back;
pub mod record;
pub mod schema;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
#[cfg(test)]
mod tests_cfg;

pub use config::{EntityDeclaration, PiggyBackSettings};
pub use error::PiggyBackError;
pub use executor::{ExecutorLoader, LifeError, LifeExecutor, MayPostgresExecutor};
pub use pagination::PaginateOptions;
pub use piggy_back::{
    AssociationLoader, CompiledFragment, Declaration, FindOptions, JoinStyle, PiggyBack,
    PiggyDirective, Quoting,
};
pub use record::Record;
pub use schema::{AssociationKind, ColumnMeta, ColumnType, EntityDef, Schema};
