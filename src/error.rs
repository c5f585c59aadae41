//! Error types for piggy-back declaration, merging and reading.
//!
//! Declaration errors are raised while an entity's piggy-backs are being
//! registered and abort that declaration only. Merge errors abort the query
//! before it reaches the database.

use crate::executor::LifeError;
use crate::schema::AssociationKind;

/// Error type for piggy-back operations
#[derive(Debug)]
pub enum PiggyBackError {
    /// Entity type is not defined in the schema
    UnknownEntity(String),
    /// Association name does not resolve on the entity or its ancestors
    UnknownAssociation { entity: String, association: String },
    /// Association is not a to-one kind (`belongs_to` / `has_one`)
    UnsupportedAssociationKind {
        entity: String,
        association: String,
        kind: AssociationKind,
    },
    /// Explicit attribute is not a column of the target entity
    UnknownColumn { entity: String, column: String },
    /// Directive names a piggy-back not registered for the entity or its ancestors
    UnknownPiggyBack { entity: String, name: String },
    /// No generated or inherited reader with this name
    UnknownAccessor { entity: String, accessor: String },
    /// Stored value could not be cast to the column's declared type
    TypeCast {
        column: String,
        expected: String,
        value: String,
    },
    /// A registry lock was poisoned by a panicking writer
    RegistryPoisoned(String),
    /// Settings could not be loaded
    Config(String),
    /// Underlying executor failed
    Execution(LifeError),
}

impl std::fmt::Display for PiggyBackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PiggyBackError::UnknownEntity(entity) => write!(f, "Unknown entity: {entity}"),
            PiggyBackError::UnknownAssociation {
                entity,
                association,
            } => write!(f, "Unknown association {association} on {entity}"),
            PiggyBackError::UnsupportedAssociationKind {
                entity,
                association,
                kind,
            } => write!(
                f,
                "Can't piggy back {kind} association {association} on {entity}"
            ),
            PiggyBackError::UnknownColumn { entity, column } => {
                write!(f, "Unknown column {column} on {entity}")
            }
            PiggyBackError::UnknownPiggyBack { entity, name } => {
                write!(f, "Unknown piggy back {name} for {entity}")
            }
            PiggyBackError::UnknownAccessor { entity, accessor } => {
                write!(f, "No piggy back reader {accessor} on {entity}")
            }
            PiggyBackError::TypeCast {
                column,
                expected,
                value,
            } => write!(
                f,
                "Cannot cast value {value} of column {column} to {expected}"
            ),
            PiggyBackError::RegistryPoisoned(msg) => {
                write!(f, "Piggy back registry lock poisoned: {msg}")
            }
            PiggyBackError::Config(msg) => write!(f, "Piggy back configuration error: {msg}"),
            PiggyBackError::Execution(e) => write!(f, "Execution error: {e}"),
        }
    }
}

impl std::error::Error for PiggyBackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PiggyBackError::Execution(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LifeError> for PiggyBackError {
    fn from(error: LifeError) -> Self {
        PiggyBackError::Execution(error)
    }
}

impl From<config::ConfigError> for PiggyBackError {
    fn from(error: config::ConfigError) -> Self {
        PiggyBackError::Config(error.to_string())
    }
}

/// Map a poisoned lock into [`PiggyBackError::RegistryPoisoned`].
pub(crate) fn poisoned<T>(err: std::sync::PoisonError<T>) -> PiggyBackError {
    PiggyBackError::RegistryPoisoned(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_kind_display_names_kind() {
        let err = PiggyBackError::UnsupportedAssociationKind {
            entity: "Customer".to_string(),
            association: "orders".to_string(),
            kind: AssociationKind::HasMany,
        };
        let display = err.to_string();
        assert!(display.contains("has_many"));
        assert!(display.contains("orders"));
        assert!(display.contains("Customer"));
    }

    #[test]
    fn test_execution_error_has_source() {
        use std::error::Error;

        let err = PiggyBackError::from(LifeError::ParseError("boom".to_string()));
        assert!(err.source().is_some());
        assert!(err.to_string().contains("boom"));
    }
}
