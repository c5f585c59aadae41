//! Query option bag and the piggy-back merge step.

use crate::error::PiggyBackError;
use crate::piggy_back::fragment::CompiledFragment;
use serde::Deserialize;
use std::sync::Arc;

/// Piggy-back directive of a query: one name or an ordered list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PiggyDirective {
    One(String),
    Many(Vec<String>),
}

impl PiggyDirective {
    pub fn names(&self) -> Vec<&str> {
        match self {
            PiggyDirective::One(name) => vec![name.as_str()],
            PiggyDirective::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for PiggyDirective {
    fn from(name: &str) -> Self {
        PiggyDirective::One(name.to_string())
    }
}

impl From<String> for PiggyDirective {
    fn from(name: String) -> Self {
        PiggyDirective::One(name)
    }
}

impl<S: Into<String>> From<Vec<S>> for PiggyDirective {
    fn from(names: Vec<S>) -> Self {
        PiggyDirective::Many(names.into_iter().map(Into::into).collect())
    }
}

/// Options of a find query
///
/// `select` and `joins` are raw SQL; `piggy` is consumed by the merge step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FindOptions {
    pub select: Option<String>,
    pub joins: Option<String>,
    pub conditions: Option<String>,
    pub order: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub include: Vec<String>,
    pub readonly: Option<bool>,
    pub piggy: Option<PiggyDirective>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn piggy(mut self, directive: impl Into<PiggyDirective>) -> Self {
        self.piggy = Some(directive.into());
        self
    }

    pub fn select(mut self, select: impl Into<String>) -> Self {
        self.select = Some(select.into());
        self
    }

    pub fn joins(mut self, joins: impl Into<String>) -> Self {
        self.joins = Some(joins.into());
        self
    }

    pub fn conditions(mut self, conditions: impl Into<String>) -> Self {
        self.conditions = Some(conditions.into());
        self
    }

    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn readonly(mut self, readonly: bool) -> Self {
        self.readonly = Some(readonly);
        self
    }
}

/// Fold the piggy-back directive of `options` into its select and joins.
///
/// Every name is resolved before `options` is touched, so a failed lookup
/// leaves the options exactly as they were. Without a directive this is a
/// no-op returning an empty list; otherwise the directive is consumed, the
/// query is forced read-only and the applied fragments are returned in order.
pub fn merge<F>(
    options: &mut FindOptions,
    default_select: impl FnOnce() -> String,
    mut resolve: F,
) -> Result<Vec<Arc<CompiledFragment>>, PiggyBackError>
where
    F: FnMut(&str) -> Result<Arc<CompiledFragment>, PiggyBackError>,
{
    let Some(directive) = options.piggy.as_ref() else {
        return Ok(Vec::new());
    };

    let fragments = directive
        .names()
        .into_iter()
        .map(&mut resolve)
        .collect::<Result<Vec<_>, _>>()?;

    let select = options.select.get_or_insert_with(default_select);
    let joins = options.joins.get_or_insert_with(String::new);
    for fragment in &fragments {
        select.push_str(&fragment.select_fragment);
        if !joins.is_empty() {
            joins.push(' ');
        }
        joins.push_str(&fragment.join_fragment);
    }

    options.readonly = Some(true);
    options.piggy = None;
    Ok(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piggy_back::fragment::JoinOn;

    fn fragment(table: &str, column: &str) -> Arc<CompiledFragment> {
        Arc::new(CompiledFragment {
            select_fragment: format!(", {table}.{column} AS x_{column}"),
            join_fragment: format!("LEFT JOIN {table} ON {table}.id = orders.x_id"),
            selects: Vec::new(),
            join: JoinOn {
                table: table.to_string(),
                target_column: "id".to_string(),
                owner_table: "orders".to_string(),
                owner_column: "x_id".to_string(),
            },
        })
    }

    fn resolver(name: &str) -> Result<Arc<CompiledFragment>, PiggyBackError> {
        match name {
            "customer" => Ok(fragment("customers", "name")),
            "shipper" => Ok(fragment("shippers", "code")),
            other => Err(PiggyBackError::UnknownPiggyBack {
                entity: "Order".to_string(),
                name: other.to_string(),
            }),
        }
    }

    fn orders_star() -> String {
        "orders.*".to_string()
    }

    #[test]
    fn test_no_directive_is_noop() {
        let mut options = FindOptions::new().conditions("total > 10");
        let before = options.clone();
        let applied = merge(&mut options, orders_star, resolver).unwrap();
        assert!(applied.is_empty());
        assert_eq!(options, before);
    }

    #[test]
    fn test_single_name_defaults_select_and_joins() {
        let mut options = FindOptions::new().piggy("customer");
        merge(&mut options, orders_star, resolver).unwrap();

        assert_eq!(options.select.as_deref(), Some("orders.*, customers.name AS x_name"));
        assert_eq!(
            options.joins.as_deref(),
            Some("LEFT JOIN customers ON customers.id = orders.x_id")
        );
        assert_eq!(options.readonly, Some(true));
        assert!(options.piggy.is_none());
    }

    #[test]
    fn test_caller_values_are_kept_as_prefix() {
        let mut options = FindOptions::new()
            .select("orders.id")
            .joins("INNER JOIN regions ON regions.id = orders.region_id")
            .readonly(false)
            .piggy(vec!["customer", "shipper"]);
        let applied = merge(&mut options, orders_star, resolver).unwrap();

        assert_eq!(applied.len(), 2);
        assert_eq!(
            options.select.as_deref(),
            Some("orders.id, customers.name AS x_name, shippers.code AS x_code")
        );
        assert_eq!(
            options.joins.as_deref(),
            Some(
                "INNER JOIN regions ON regions.id = orders.region_id \
                 LEFT JOIN customers ON customers.id = orders.x_id \
                 LEFT JOIN shippers ON shippers.id = orders.x_id"
            )
        );
        assert_eq!(options.readonly, Some(true));
    }

    #[test]
    fn test_unknown_name_leaves_options_untouched() {
        let mut options = FindOptions::new().piggy(vec!["customer", "ghost"]);
        let before = options.clone();
        let err = merge(&mut options, orders_star, resolver).unwrap_err();

        assert!(matches!(err, PiggyBackError::UnknownPiggyBack { ref name, .. } if name == "ghost"));
        assert_eq!(options, before);
    }

    #[test]
    fn test_equal_requests_merge_identically() {
        let mut first = FindOptions::new().piggy(vec!["customer", "shipper"]);
        let mut second = FindOptions::new().piggy(vec!["customer", "shipper"]);
        merge(&mut first, orders_star, resolver).unwrap();
        merge(&mut second, orders_star, resolver).unwrap();

        assert_eq!(first.select, second.select);
        assert_eq!(first.joins, second.joins);
        assert_eq!(
            first.select.as_deref(),
            Some("orders.*, customers.name AS x_name, shippers.code AS x_code")
        );
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_directive_still_forces_readonly() {
        let mut options = FindOptions::new().piggy(Vec::<String>::new());
        merge(&mut options, orders_star, resolver).unwrap();
        assert_eq!(options.select.as_deref(), Some("orders.*"));
        assert_eq!(options.joins.as_deref(), Some(""));
        assert_eq!(options.readonly, Some(true));
    }

    #[test]
    fn test_directive_deserializes_from_string_or_list() {
        let one: PiggyDirective = serde_json::from_str("\"customer\"").unwrap();
        let many: PiggyDirective = serde_json::from_str("[\"customer\", \"shipper\"]").unwrap();
        assert_eq!(one.names(), vec!["customer"]);
        assert_eq!(many.names(), vec!["customer", "shipper"]);
    }
}
