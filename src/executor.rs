//! Query execution over `may_postgres`.
//!
//! [`LifeExecutor`] abstracts the database so the finder and the reader
//! fallback can run against a live client or a test double. Rows are decoded
//! into [`Record`]s using the schema's column types.

use crate::error::PiggyBackError;
use crate::piggy_back::AssociationLoader;
use crate::record::Record;
use crate::schema::{AssociationDescriptor, ColumnMeta, ColumnType, Schema};
use may_postgres::types::ToSql;
use may_postgres::{Client, Error as PostgresError, Row};
use sea_query::{Alias, Asterisk, Expr, ExprTrait, PostgresQueryBuilder, Query, Value};
use std::fmt;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;
#[cfg(feature = "metrics")]
use std::time::Instant;

/// `LifeExecutor` error type
#[derive(Debug)]
pub enum LifeError {
    /// `PostgreSQL` error from `may_postgres`
    PostgresError(PostgresError),
    /// Row parsing/conversion error
    ParseError(String),
}

impl fmt::Display for LifeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifeError::PostgresError(e) => write!(f, "PostgreSQL error: {e}"),
            LifeError::ParseError(s) => write!(f, "Parse error: {s}"),
        }
    }
}

impl std::error::Error for LifeError {}

impl From<PostgresError> for LifeError {
    fn from(err: PostgresError) -> Self {
        LifeError::PostgresError(err)
    }
}

/// Trait for executing read queries
///
/// # Examples
///
/// ```no_run
/// use piggyback::executor::{LifeExecutor, LifeError, MayPostgresExecutor};
///
/// # fn example(client: may_postgres::Client) -> Result<(), LifeError> {
/// let executor = MayPostgresExecutor::new(client);
/// let rows = executor.query_all("SELECT id FROM orders", &[])?;
/// let ids: Vec<i32> = rows.iter().map(|r| r.get(0)).collect();
/// # Ok(())
/// # }
/// ```
pub trait LifeExecutor {
    /// Execute a query and return all rows
    ///
    /// # Errors
    ///
    /// Returns `LifeError` if the query execution fails.
    fn query_all(&self, query: &str, params: &[&dyn ToSql]) -> Result<Vec<Row>, LifeError>;
}

/// `LifeExecutor` over a `may_postgres::Client`
pub struct MayPostgresExecutor {
    client: Client,
}

impl MayPostgresExecutor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn into_client(self) -> Client {
        self.client
    }
}

impl LifeExecutor for MayPostgresExecutor {
    fn query_all(&self, query: &str, params: &[&dyn ToSql]) -> Result<Vec<Row>, LifeError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::execute_query_span(query).entered();

        #[cfg(feature = "metrics")]
        let start = Instant::now();
        let result = self.client.query(query, params).map_err(|e| {
            #[cfg(feature = "metrics")]
            METRICS.record_query_error();
            LifeError::PostgresError(e)
        });

        #[cfg(feature = "metrics")]
        METRICS.record_query(start.elapsed());

        result
    }
}

fn decode<'a, T>(row: &'a Row, name: &str, column_type: ColumnType) -> Result<Value, LifeError>
where
    T: may_postgres::types::FromSql<'a> + Into<Value>,
{
    let value = row
        .try_get::<&str, Option<T>>(name)
        .map_err(|e| parse_error(name, column_type, e))?;
    Ok(value.map(Into::into).unwrap_or_else(|| column_type.null_value()))
}

fn parse_error(name: &str, column_type: ColumnType, err: impl fmt::Display) -> LifeError {
    LifeError::ParseError(format!("column {name} as {column_type}: {err}"))
}

/// Decode column `name` of `row` as `column_type`.
///
/// NULL decodes to the column type's typed null.
pub fn decode_column(row: &Row, name: &str, column_type: ColumnType) -> Result<Value, LifeError> {
    match column_type {
        ColumnType::Integer => decode::<i32>(row, name, column_type),
        ColumnType::BigInteger => decode::<i64>(row, name, column_type),
        ColumnType::Float => decode::<f32>(row, name, column_type),
        ColumnType::Double => decode::<f64>(row, name, column_type),
        ColumnType::Decimal => decode::<rust_decimal::Decimal>(row, name, column_type),
        ColumnType::String | ColumnType::Text => decode::<String>(row, name, column_type),
        ColumnType::Boolean => decode::<bool>(row, name, column_type),
        ColumnType::Date => decode::<chrono::NaiveDate>(row, name, column_type),
        ColumnType::Time => decode::<chrono::NaiveTime>(row, name, column_type),
        ColumnType::Timestamp => decode::<chrono::NaiveDateTime>(row, name, column_type),
        ColumnType::Uuid => decode::<uuid::Uuid>(row, name, column_type),
        ColumnType::Json => decode::<serde_json::Value>(row, name, column_type),
        ColumnType::Binary => decode::<Vec<u8>>(row, name, column_type),
    }
}

/// Decode the `columns` present in `row` into a [`Record`] of `entity`.
///
/// Columns the row does not carry are skipped.
pub fn decode_record(row: &Row, entity: &str, columns: &[ColumnMeta]) -> Result<Record, LifeError> {
    let mut record = Record::new(entity);
    for column in columns {
        if row.columns().iter().any(|c| c.name() == column.name) {
            record.set(column.name.clone(), decode_column(row, &column.name, column.column_type)?);
        }
    }
    Ok(record)
}

/// SQL that loads the single target row of `association` for `key`
pub fn association_sql(association: &AssociationDescriptor, key: &Value) -> String {
    let table = &association.target_table_name;
    Query::select()
        .column(Asterisk)
        .from(Alias::new(table.clone()))
        .and_where(
            Expr::col((
                Alias::new(table.clone()),
                Alias::new(association.target_key().to_string()),
            ))
            .eq(key.clone()),
        )
        .limit(1)
        .to_string(PostgresQueryBuilder)
}

/// [`AssociationLoader`] that traverses associations with one query per call
pub struct ExecutorLoader<'a, E: LifeExecutor + ?Sized> {
    executor: &'a E,
    schema: &'a Schema,
}

impl<'a, E: LifeExecutor + ?Sized> ExecutorLoader<'a, E> {
    pub fn new(executor: &'a E, schema: &'a Schema) -> Self {
        Self { executor, schema }
    }
}

impl<E: LifeExecutor + ?Sized> AssociationLoader for ExecutorLoader<'_, E> {
    fn load(
        &self,
        owner: &Record,
        association: &AssociationDescriptor,
    ) -> Result<Option<Record>, PiggyBackError> {
        let key = owner
            .get(association.owner_key())
            .ok_or_else(|| PiggyBackError::UnknownColumn {
                entity: owner.entity().to_string(),
                column: association.owner_key().to_string(),
            })?;
        if crate::schema::column::is_null(key) {
            return Ok(None);
        }

        let sql = association_sql(association, key);
        log::debug!("loading {} for {}: {sql}", association.association_name, owner.entity());
        let rows = self.executor.query_all(&sql, &[])?;

        let Some(row) = rows.first() else {
            return Ok(None);
        };
        let columns: Vec<ColumnMeta> = self
            .schema
            .columns(&association.target_type)?
            .into_iter()
            .cloned()
            .collect();
        Ok(Some(decode_record(row, &association.target_type, &columns)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::MockExecutor;
    use crate::tests_cfg::shop_schema;

    #[test]
    fn test_decode_failure_is_parse_error() {
        let err = parse_error("total", ColumnType::Decimal, "invalid byte length");
        assert!(matches!(err, LifeError::ParseError(_)));
        assert_eq!(
            err.to_string(),
            "Parse error: column total as decimal: invalid byte length"
        );
    }

    #[test]
    fn test_association_sql_belongs_to() {
        let schema = shop_schema();
        let desc = schema.resolve_association("Order", "customer").unwrap();
        let sql = association_sql(&desc, &Value::from(7i32));
        assert_eq!(
            sql,
            r#"SELECT * FROM "customers" WHERE "customers"."id" = 7 LIMIT 1"#
        );
    }

    #[test]
    fn test_association_sql_has_one() {
        let schema = shop_schema();
        let desc = schema.resolve_association("Customer", "profile").unwrap();
        let sql = association_sql(&desc, &Value::from(3i32));
        assert_eq!(
            sql,
            r#"SELECT * FROM "profiles" WHERE "profiles"."customer_id" = 3 LIMIT 1"#
        );
    }

    #[test]
    fn test_loader_queries_executor() {
        let schema = shop_schema();
        let executor = MockExecutor::new();
        let loader = ExecutorLoader::new(&executor, &schema);
        let desc = schema.resolve_association("Order", "customer").unwrap();
        let order = Record::new("Order").with("customer_id", 7i32);

        assert!(loader.load(&order, &desc).unwrap().is_none());
        let captured = executor.captured_sql();
        assert_eq!(captured.len(), 1);
        assert!(captured[0].contains(r#""customers"."id" = 7"#));
    }

    #[test]
    fn test_loader_skips_null_key() {
        let schema = shop_schema();
        let executor = MockExecutor::new();
        let loader = ExecutorLoader::new(&executor, &schema);
        let desc = schema.resolve_association("Order", "customer").unwrap();
        let order = Record::new("Order").with("customer_id", Value::Int(None));

        assert!(loader.load(&order, &desc).unwrap().is_none());
        assert!(executor.captured_sql().is_empty());
    }

    #[test]
    fn test_loader_requires_owner_key() {
        let schema = shop_schema();
        let executor = MockExecutor::new();
        let loader = ExecutorLoader::new(&executor, &schema);
        let desc = schema.resolve_association("Order", "customer").unwrap();

        let err = loader.load(&Record::new("Order"), &desc).unwrap_err();
        assert!(matches!(err, PiggyBackError::UnknownColumn { ref column, .. } if column == "customer_id"));
    }
}
