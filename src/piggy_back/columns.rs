//! Column selection for a piggy-back declaration.

use crate::error::PiggyBackError;
use crate::schema::{ColumnMeta, Schema};

/// Resolve the target columns a declaration exposes.
///
/// An empty `attributes` list selects every content column of `target`, in
/// schema order. The wildcard is expanded here, once: columns added to the
/// target later are not picked up by an existing declaration. A non-empty
/// list selects exactly those columns, in the order given.
///
/// # Errors
///
/// Returns [`PiggyBackError::UnknownColumn`] for any attribute that is not a
/// column of `target`.
pub fn select_columns<S: AsRef<str>>(
    schema: &Schema,
    target: &str,
    attributes: &[S],
) -> Result<Vec<ColumnMeta>, PiggyBackError> {
    if attributes.is_empty() {
        return Ok(schema
            .content_columns(target)?
            .into_iter()
            .cloned()
            .collect());
    }

    attributes
        .iter()
        .map(|name| {
            let name = name.as_ref();
            schema
                .column(target, name)?
                .cloned()
                .ok_or_else(|| PiggyBackError::UnknownColumn {
                    entity: target.to_string(),
                    column: name.to_string(),
                })
        })
        .collect()
}
