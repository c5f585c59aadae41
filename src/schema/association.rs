//! Association definitions and resolved association descriptors.

/// Kind of association between entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssociationKind {
    /// One-to-one relationship, foreign key on the target table
    HasOne,
    /// One-to-many relationship
    HasMany,
    /// Many-to-one relationship, foreign key on the owner table
    BelongsTo,
    /// Many-to-many relationship through a join table
    HasManyThrough,
}

impl AssociationKind {
    /// Whether a single target row can be joined flatly onto the owner row
    pub fn is_to_one(self) -> bool {
        matches!(self, AssociationKind::BelongsTo | AssociationKind::HasOne)
    }
}

impl std::fmt::Display for AssociationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AssociationKind::HasOne => "has_one",
            AssociationKind::HasMany => "has_many",
            AssociationKind::BelongsTo => "belongs_to",
            AssociationKind::HasManyThrough => "has_many_through",
        };
        f.write_str(name)
    }
}

/// An association as declared on an entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationDef {
    /// Association name (e.g. `customer`)
    pub name: String,
    /// Kind of association
    pub kind: AssociationKind,
    /// Name of the target entity type (e.g. `Customer`)
    pub target: String,
    /// Foreign key column; defaulted from the kind when `None`
    pub foreign_key: Option<String>,
}

impl AssociationDef {
    pub fn new(name: impl Into<String>, kind: AssociationKind, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            target: target.into(),
            foreign_key: None,
        }
    }

    pub fn foreign_key(mut self, column: impl Into<String>) -> Self {
        self.foreign_key = Some(column.into());
        self
    }
}

/// A fully resolved to-one association
///
/// Built by [`Schema::resolve_association`](crate::schema::Schema::resolve_association);
/// immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationDescriptor {
    /// `BelongsTo` or `HasOne`
    pub kind: AssociationKind,
    /// Association name, used as the alias prefix
    pub association_name: String,
    /// Owner entity type name
    pub owner_type: String,
    /// Owner table
    pub owner_table_name: String,
    /// Owner primary key column
    pub owner_primary_key: String,
    /// Target entity type name
    pub target_type: String,
    /// Target table
    pub target_table_name: String,
    /// Target primary key column
    pub target_primary_key: String,
    /// Foreign key column: on the owner for `BelongsTo`, on the target for `HasOne`
    pub foreign_key_column: String,
}

impl AssociationDescriptor {
    /// Owner attribute whose value identifies the target row
    pub fn owner_key(&self) -> &str {
        match self.kind {
            AssociationKind::BelongsTo => &self.foreign_key_column,
            _ => &self.owner_primary_key,
        }
    }

    /// Target column matched against [`owner_key`](Self::owner_key)
    pub fn target_key(&self) -> &str {
        match self.kind {
            AssociationKind::BelongsTo => &self.target_primary_key,
            _ => &self.foreign_key_column,
        }
    }
}
