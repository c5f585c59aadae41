//! SQL fragment synthesis.
//!
//! A declaration compiles into a [`CompiledFragment`]: a select-list suffix
//! with one aliased column per exposed attribute and a single LEFT JOIN to
//! the association's table. The join direction follows the side that stores
//! the foreign key:
//!
//! - `belongs_to`: `LEFT JOIN customers ON customers.id = orders.customer_id`
//! - `has_one`: `LEFT JOIN profiles ON profiles.customer_id = customers.id`
//!
//! Fragments keep their typed parts next to the rendered strings so they can
//! also be applied to a `sea_query::SelectStatement`.

use crate::schema::{AssociationDescriptor, AssociationKind, ColumnMeta};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_query::{Alias, Expr, ExprTrait, JoinType, SelectStatement};
use serde::Deserialize;
use std::borrow::Cow;

static PLAIN_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("failed to build identifier pattern"));

/// PostgreSQL reserved key words; these never work as bare identifiers
const RESERVED_WORDS: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric",
    "authorization", "binary", "both", "case", "cast", "check", "collate", "collation",
    "column", "concurrently", "constraint", "create", "cross", "current_catalog",
    "current_date", "current_role", "current_schema", "current_time", "current_timestamp",
    "current_user", "default", "deferrable", "desc", "distinct", "do", "else", "end",
    "except", "false", "fetch", "for", "foreign", "freeze", "from", "full", "grant",
    "group", "having", "ilike", "in", "initially", "inner", "intersect", "into", "is",
    "isnull", "join", "lateral", "leading", "left", "like", "limit", "localtime",
    "localtimestamp", "natural", "not", "notnull", "null", "offset", "on", "only", "or",
    "order", "outer", "overlaps", "placing", "primary", "references", "returning", "right",
    "select", "session_user", "similar", "some", "symmetric", "system_user", "table",
    "tablesample", "then", "to", "trailing", "true", "union", "unique", "user", "using",
    "variadic", "verbose", "when", "where", "window", "with",
];

/// Whether `ident` can be emitted bare: lowercase (unfolded) and not reserved
fn is_plain(ident: &str) -> bool {
    PLAIN_IDENTIFIER.is_match(ident) && !RESERVED_WORDS.contains(&ident)
}

/// Identifier quoting policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quoting {
    /// Quote identifiers that are not lowercase words, and reserved words
    #[default]
    WhenNeeded,
    /// Quote every identifier
    Always,
}

/// Keyword used for the synthesized join
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinStyle {
    #[default]
    LeftJoin,
    LeftOuterJoin,
}

impl JoinStyle {
    fn keyword(self) -> &'static str {
        match self {
            JoinStyle::LeftJoin => "LEFT JOIN",
            JoinStyle::LeftOuterJoin => "LEFT OUTER JOIN",
        }
    }
}

/// Quote an identifier with double quotes, doubling embedded quotes.
pub fn quote_ident(ident: &str, quoting: Quoting) -> Cow<'_, str> {
    if quoting == Quoting::WhenNeeded && is_plain(ident) {
        Cow::Borrowed(ident)
    } else {
        Cow::Owned(format!("\"{}\"", ident.replace('"', "\"\"")))
    }
}

fn qualified(table: &str, column: &str, quoting: Quoting) -> String {
    format!("{}.{}", quote_ident(table, quoting), quote_ident(column, quoting))
}

/// One aliased target column in the select list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectItem {
    /// Target table
    pub table: String,
    /// Target column
    pub column: ColumnMeta,
    /// `<association>_<column>`
    pub alias: String,
}

/// `table.target_column = owner_table.owner_column`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOn {
    pub table: String,
    pub target_column: String,
    pub owner_table: String,
    pub owner_column: String,
}

/// Precomputed select/join fragments of one declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFragment {
    /// Comma-leading select-list suffix
    pub select_fragment: String,
    /// A single LEFT JOIN clause
    pub join_fragment: String,
    /// Typed select items, in declaration order
    pub selects: Vec<SelectItem>,
    /// Typed join equation
    pub join: JoinOn,
}

impl CompiledFragment {
    /// Apply the fragment to a `SelectStatement`.
    pub fn apply(&self, query: &mut SelectStatement) {
        for item in &self.selects {
            query.expr_as(
                Expr::col((Alias::new(item.table.clone()), Alias::new(item.column.name.clone()))),
                Alias::new(item.alias.clone()),
            );
        }
        let join = &self.join;
        query.join(
            JoinType::LeftJoin,
            Alias::new(join.table.clone()),
            Expr::col((Alias::new(join.table.clone()), Alias::new(join.target_column.clone())))
                .equals((Alias::new(join.owner_table.clone()), Alias::new(join.owner_column.clone()))),
        );
    }
}

/// Builds [`CompiledFragment`]s with a fixed quoting policy and join style
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FragmentSynthesizer {
    pub quoting: Quoting,
    pub join_style: JoinStyle,
}

impl FragmentSynthesizer {
    pub fn new(quoting: Quoting, join_style: JoinStyle) -> Self {
        Self { quoting, join_style }
    }

    /// `<owner_table>.*`, the select list a piggy-back query starts from
    pub fn default_select(&self, owner_table: &str) -> String {
        format!("{}.*", quote_ident(owner_table, self.quoting))
    }

    pub fn synthesize(
        &self,
        association: &AssociationDescriptor,
        columns: &[ColumnMeta],
    ) -> CompiledFragment {
        let target = &association.target_table_name;

        let selects: Vec<SelectItem> = columns
            .iter()
            .map(|column| SelectItem {
                table: target.clone(),
                column: column.clone(),
                alias: format!("{}_{}", association.association_name, column.name),
            })
            .collect();

        let select_fragment = selects
            .iter()
            .map(|item| {
                format!(
                    ", {} AS {}",
                    qualified(&item.table, &item.column.name, self.quoting),
                    quote_ident(&item.alias, self.quoting)
                )
            })
            .collect::<String>();

        // The foreign key lives on the owner for belongs_to and on the target for has_one.
        let join = match association.kind {
            AssociationKind::BelongsTo => JoinOn {
                table: target.clone(),
                target_column: association.target_primary_key.clone(),
                owner_table: association.owner_table_name.clone(),
                owner_column: association.foreign_key_column.clone(),
            },
            _ => JoinOn {
                table: target.clone(),
                target_column: association.foreign_key_column.clone(),
                owner_table: association.owner_table_name.clone(),
                owner_column: association.owner_primary_key.clone(),
            },
        };

        let join_fragment = format!(
            "{} {} ON {} = {}",
            self.join_style.keyword(),
            quote_ident(&join.table, self.quoting),
            qualified(&join.table, &join.target_column, self.quoting),
            qualified(&join.owner_table, &join.owner_column, self.quoting),
        );

        CompiledFragment {
            select_fragment,
            join_fragment,
            selects,
            join,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnType, EntityDef, Schema};
    use crate::tests_cfg::shop_schema;
    use sea_query::{Asterisk, PostgresQueryBuilder, Query};

    fn name_column() -> ColumnMeta {
        ColumnMeta::new("name", ColumnType::String)
    }

    #[test]
    fn test_belongs_to_fragment() {
        let schema = shop_schema();
        let desc = schema.resolve_association("Order", "customer").unwrap();
        let fragment = FragmentSynthesizer::default().synthesize(&desc, &[name_column()]);

        assert_eq!(fragment.select_fragment, ", customers.name AS customer_name");
        assert_eq!(
            fragment.join_fragment,
            "LEFT JOIN customers ON customers.id = orders.customer_id"
        );
    }

    #[test]
    fn test_has_one_fragment_joins_on_target_foreign_key() {
        let schema = shop_schema();
        let desc = schema.resolve_association("Customer", "profile").unwrap();
        let bio = ColumnMeta::new("bio", ColumnType::Text);
        let level = ColumnMeta::new("level", ColumnType::Integer);
        let fragment = FragmentSynthesizer::default().synthesize(&desc, &[bio, level]);

        assert_eq!(
            fragment.select_fragment,
            ", profiles.bio AS profile_bio, profiles.level AS profile_level"
        );
        assert_eq!(
            fragment.join_fragment,
            "LEFT JOIN profiles ON profiles.customer_id = customers.id"
        );
    }

    #[test]
    fn test_join_direction_matches_kind() {
        let schema = shop_schema();
        let synth = FragmentSynthesizer::default();
        let cases = [
            ("Order", "customer"),
            ("Order", "buyer"),
            ("Profile", "customer"),
            ("Customer", "profile"),
        ];
        for (entity, association) in cases {
            let desc = schema.resolve_association(entity, association).unwrap();
            let join = synth.synthesize(&desc, &[]).join;
            match desc.kind {
                AssociationKind::BelongsTo => {
                    assert_eq!(join.target_column, desc.target_primary_key);
                    assert_eq!(join.owner_column, desc.foreign_key_column);
                }
                _ => {
                    assert_eq!(join.target_column, desc.foreign_key_column);
                    assert_eq!(join.owner_column, desc.owner_primary_key);
                }
            }
        }
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("customers", Quoting::WhenNeeded), "customers");
        assert_eq!(quote_ident("order items", Quoting::WhenNeeded), "\"order items\"");
        assert_eq!(quote_ident("we\"ird", Quoting::WhenNeeded), "\"we\"\"ird\"");
        assert_eq!(quote_ident("customers", Quoting::Always), "\"customers\"");
    }

    #[test]
    fn test_quote_mixed_case_and_reserved_words() {
        assert_eq!(quote_ident("displayName", Quoting::WhenNeeded), "\"displayName\"");
        assert_eq!(quote_ident("Orders", Quoting::WhenNeeded), "\"Orders\"");
        assert_eq!(quote_ident("user", Quoting::WhenNeeded), "\"user\"");
        assert_eq!(quote_ident("order", Quoting::WhenNeeded), "\"order\"");
        assert_eq!(quote_ident("user_id", Quoting::WhenNeeded), "user_id");
        assert_eq!(quote_ident("type", Quoting::WhenNeeded), "type");
    }

    #[test]
    fn test_reserved_table_and_mixed_case_column_fragment() {
        let mut schema = Schema::new();
        schema
            .define(
                EntityDef::new("User", "user")
                    .column("id", ColumnType::Integer)
                    .column("displayName", ColumnType::String),
            )
            .define(
                EntityDef::new("Order", "order")
                    .column("id", ColumnType::Integer)
                    .column("user_id", ColumnType::Integer)
                    .belongs_to("user", "User"),
            );
        let desc = schema.resolve_association("Order", "user").unwrap();
        let column = ColumnMeta::new("displayName", ColumnType::String);
        let synth = FragmentSynthesizer::default();
        let fragment = synth.synthesize(&desc, &[column]);

        assert_eq!(
            fragment.select_fragment,
            ", \"user\".\"displayName\" AS \"user_displayName\""
        );
        assert_eq!(
            fragment.join_fragment,
            "LEFT JOIN \"user\" ON \"user\".id = \"order\".user_id"
        );
        assert_eq!(synth.default_select("order"), "\"order\".*");
        assert_eq!(fragment.selects[0].alias, "user_displayName");
    }

    #[test]
    fn test_always_quoting_and_outer_join() {
        let schema = shop_schema();
        let desc = schema.resolve_association("Order", "customer").unwrap();
        let synth = FragmentSynthesizer::new(Quoting::Always, JoinStyle::LeftOuterJoin);
        let fragment = synth.synthesize(&desc, &[name_column()]);

        assert_eq!(
            fragment.select_fragment,
            ", \"customers\".\"name\" AS \"customer_name\""
        );
        assert_eq!(
            fragment.join_fragment,
            "LEFT OUTER JOIN \"customers\" ON \"customers\".\"id\" = \"orders\".\"customer_id\""
        );
        assert_eq!(synth.default_select("orders"), "\"orders\".*");
    }

    #[test]
    fn test_apply_to_select_statement() {
        let schema = shop_schema();
        let desc = schema.resolve_association("Order", "customer").unwrap();
        let fragment = FragmentSynthesizer::default().synthesize(&desc, &[name_column()]);

        let mut query = Query::select();
        query
            .column((Alias::new("orders"), Asterisk))
            .from(Alias::new("orders"));
        fragment.apply(&mut query);
        let sql = query.to_string(PostgresQueryBuilder);

        assert!(sql.contains(r#""customers"."name" AS "customer_name""#), "{sql}");
        assert!(
            sql.contains(r#"LEFT JOIN "customers" ON "customers"."id" = "orders"."customer_id""#),
            "{sql}"
        );
    }
}
