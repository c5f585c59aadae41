//! Finder: renders a [`FindOptions`] bag to SQL and loads records.

use crate::error::PiggyBackError;
use crate::executor::{decode_column, decode_record, LifeExecutor};
use crate::piggy_back::fragment::{quote_ident, Quoting};
use crate::piggy_back::{CompiledFragment, FindOptions, PiggyBack};
use crate::record::Record;
use crate::schema::ColumnMeta;
use std::sync::Arc;

/// Render `options` as a SELECT on `table`.
///
/// `select`, `joins`, `conditions` and `order` are raw SQL and are inserted
/// as given; a missing select list becomes `<table>.*`.
pub fn construct_finder_sql(table: &str, options: &FindOptions, quoting: Quoting) -> String {
    let table = quote_ident(table, quoting);
    let mut sql = match options.select.as_deref() {
        Some(select) => format!("SELECT {select} FROM {table}"),
        None => format!("SELECT {table}.* FROM {table}"),
    };

    if let Some(joins) = options.joins.as_deref().filter(|j| !j.is_empty()) {
        sql.push(' ');
        sql.push_str(joins);
    }
    if let Some(conditions) = options.conditions.as_deref() {
        sql.push_str(&format!(" WHERE ({conditions})"));
    }
    if let Some(order) = options.order.as_deref() {
        sql.push_str(&format!(" ORDER BY {order}"));
    }
    if let Some(limit) = options.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    if let Some(offset) = options.offset {
        sql.push_str(&format!(" OFFSET {offset}"));
    }
    sql
}

impl PiggyBack {
    fn prepare(
        &self,
        entity: &str,
        options: &FindOptions,
    ) -> Result<(String, FindOptions, Vec<Arc<CompiledFragment>>), PiggyBackError> {
        let mut options = options.clone();
        let fragments = self.add_piggy_back(entity, &mut options)?;
        let table = self.schema().table_name(entity)?;
        let sql = construct_finder_sql(&table, &options, self.synthesizer().quoting);
        Ok((sql, options, fragments))
    }

    /// SQL a find on `entity` with `options` runs, piggy-backs merged
    pub fn construct_finder_sql(
        &self,
        entity: &str,
        options: &FindOptions,
    ) -> Result<String, PiggyBackError> {
        Ok(self.prepare(entity, options)?.0)
    }

    /// Run a find on `entity` and decode the rows.
    ///
    /// Records carry the entity's columns plus one attribute per piggy-backed
    /// alias, and are read-only when the merged options say so.
    ///
    /// # Errors
    ///
    /// Merge errors are returned before anything is sent to `executor`.
    pub fn find_all<E: LifeExecutor + ?Sized>(
        &self,
        executor: &E,
        entity: &str,
        options: &FindOptions,
    ) -> Result<Vec<Record>, PiggyBackError> {
        let (sql, options, fragments) = self.prepare(entity, options)?;
        log::debug!("find {entity}: {sql}");

        let rows = executor.query_all(&sql, &[])?;

        let columns: Vec<ColumnMeta> = self
            .schema()
            .columns(entity)?
            .into_iter()
            .cloned()
            .collect();
        let readonly = options.readonly.unwrap_or(false);

        rows.iter()
            .map(|row| -> Result<Record, PiggyBackError> {
                let mut record = decode_record(row, entity, &columns)?;
                for item in fragments.iter().flat_map(|f| f.selects.iter()) {
                    if row.columns().iter().any(|c| c.name() == item.alias) {
                        let value = decode_column(row, &item.alias, item.column.column_type)?;
                        record.set(item.alias.clone(), value);
                    }
                }
                record.set_readonly(readonly);
                Ok(record)
            })
            .collect()
    }
}
