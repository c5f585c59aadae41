//! Column metadata and type casting.
//!
//! Every column of an entity carries a declared [`ColumnType`]. Values read
//! from a record are passed through [`ColumnMeta::type_cast`] so that a joined
//! piggy-back column (which may arrive as raw text) reads exactly like the
//! native column on the target entity.

use crate::error::PiggyBackError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use sea_query::Value;
use std::str::FromStr;

/// Declared type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Integer,
    BigInteger,
    Float,
    Double,
    Decimal,
    String,
    Text,
    Boolean,
    Date,
    Time,
    Timestamp,
    Uuid,
    Json,
    Binary,
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ColumnType::Integer => "integer",
            ColumnType::BigInteger => "big_integer",
            ColumnType::Float => "float",
            ColumnType::Double => "double",
            ColumnType::Decimal => "decimal",
            ColumnType::String => "string",
            ColumnType::Text => "text",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::Time => "time",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Uuid => "uuid",
            ColumnType::Json => "json",
            ColumnType::Binary => "binary",
        };
        f.write_str(name)
    }
}

impl ColumnType {
    /// The NULL value of this type's `Value` variant
    pub fn null_value(self) -> Value {
        match self {
            ColumnType::Integer => Value::Int(None),
            ColumnType::BigInteger => Value::BigInt(None),
            ColumnType::Float => Value::Float(None),
            ColumnType::Double => Value::Double(None),
            ColumnType::Decimal => Value::Decimal(None),
            ColumnType::String | ColumnType::Text => Value::String(None),
            ColumnType::Boolean => Value::Bool(None),
            ColumnType::Date => Value::ChronoDate(None),
            ColumnType::Time => Value::ChronoTime(None),
            ColumnType::Timestamp => Value::ChronoDateTime(None),
            ColumnType::Uuid => Value::Uuid(None),
            ColumnType::Json => Value::Json(None),
            ColumnType::Binary => Value::Bytes(None),
        }
    }
}

/// Column metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    /// Column name
    pub name: String,
    /// Declared type
    pub column_type: ColumnType,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }

    /// Whether this column holds user data, as opposed to bookkeeping.
    ///
    /// Primary keys, foreign keys (`*_id`), counter caches (`*_count`) and the
    /// inheritance column are not content columns.
    pub fn is_content(&self, primary_key: &str, inheritance_column: &str) -> bool {
        !(self.name == primary_key
            || self.name == inheritance_column
            || self.name.ends_with("_id")
            || self.name.ends_with("_count"))
    }

    /// Cast a stored value to this column's declared type.
    ///
    /// NULL of any variant becomes the typed NULL of the column. Text values
    /// are parsed (`"42"` to an integer, `"2024-01-31"` to a date, ...).
    ///
    /// # Errors
    ///
    /// Returns [`PiggyBackError::TypeCast`] if the value cannot represent the
    /// declared type.
    pub fn type_cast(&self, value: &Value) -> Result<Value, PiggyBackError> {
        if is_null(value) {
            return Ok(self.column_type.null_value());
        }
        let cast = match self.column_type {
            ColumnType::Integer => as_i64(value).and_then(|i| i32::try_from(i).ok()).map(Value::from),
            ColumnType::BigInteger => as_i64(value).map(Value::from),
            ColumnType::Float => as_f64(value).map(|f| Value::from(f as f32)),
            ColumnType::Double => as_f64(value).map(Value::from),
            ColumnType::Decimal => as_decimal(value).map(Value::from),
            ColumnType::String | ColumnType::Text => as_text(value).map(Value::from),
            ColumnType::Boolean => as_bool(value).map(Value::from),
            ColumnType::Date => as_date(value).map(Value::from),
            ColumnType::Time => as_time(value).map(Value::from),
            ColumnType::Timestamp => as_timestamp(value).map(Value::from),
            ColumnType::Uuid => as_uuid(value).map(Value::from),
            ColumnType::Json => as_json(value).map(Value::from),
            ColumnType::Binary => as_bytes(value).map(Value::from),
        };
        cast.ok_or_else(|| PiggyBackError::TypeCast {
            column: self.name.clone(),
            expected: self.column_type.to_string(),
            value: format!("{value:?}"),
        })
    }
}

/// Whether `value` is SQL NULL, whatever its variant.
pub fn is_null(value: &Value) -> bool {
    matches!(
        value,
        Value::Bool(None)
            | Value::TinyInt(None)
            | Value::SmallInt(None)
            | Value::Int(None)
            | Value::BigInt(None)
            | Value::TinyUnsigned(None)
            | Value::SmallUnsigned(None)
            | Value::Unsigned(None)
            | Value::BigUnsigned(None)
            | Value::Float(None)
            | Value::Double(None)
            | Value::String(None)
            | Value::Char(None)
            | Value::Bytes(None)
            | Value::Json(None)
            | Value::ChronoDate(None)
            | Value::ChronoTime(None)
            | Value::ChronoDateTime(None)
            | Value::ChronoDateTimeUtc(None)
            | Value::Uuid(None)
            | Value::Decimal(None)
    )
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::TinyInt(Some(i)) => Some(i64::from(*i)),
        Value::SmallInt(Some(i)) => Some(i64::from(*i)),
        Value::Int(Some(i)) => Some(i64::from(*i)),
        Value::BigInt(Some(i)) => Some(*i),
        Value::TinyUnsigned(Some(u)) => Some(i64::from(*u)),
        Value::SmallUnsigned(Some(u)) => Some(i64::from(*u)),
        Value::Unsigned(Some(u)) => Some(i64::from(*u)),
        Value::BigUnsigned(Some(u)) => i64::try_from(*u).ok(),
        Value::Bool(Some(b)) => Some(i64::from(*b)),
        Value::String(Some(s)) => s.trim().parse().ok(),
        Value::Decimal(Some(d)) => d.trunc().to_string().parse().ok(),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Float(Some(f)) => Some(f64::from(*f)),
        Value::Double(Some(d)) => Some(*d),
        Value::String(Some(s)) => s.trim().parse().ok(),
        Value::Decimal(Some(d)) => d.to_string().parse().ok(),
        _ => as_i64(value).map(|i| i as f64),
    }
}

fn as_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Decimal(Some(d)) => Some(Decimal::clone(d)),
        Value::String(Some(s)) => Decimal::from_str(s.trim()).ok(),
        Value::Float(Some(f)) => Decimal::from_str(&f.to_string()).ok(),
        Value::Double(Some(d)) => Decimal::from_str(&d.to_string()).ok(),
        _ => as_i64(value).map(Decimal::from),
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(Some(s)) => Some(s.to_string()),
        Value::Char(Some(c)) => Some(c.to_string()),
        Value::Bool(Some(b)) => Some(b.to_string()),
        Value::Float(Some(f)) => Some(f.to_string()),
        Value::Double(Some(d)) => Some(d.to_string()),
        Value::Decimal(Some(d)) => Some(d.to_string()),
        Value::Uuid(Some(u)) => Some(u.to_string()),
        Value::ChronoDate(Some(d)) => Some(d.to_string()),
        Value::ChronoTime(Some(t)) => Some(t.to_string()),
        Value::ChronoDateTime(Some(dt)) => Some(dt.to_string()),
        Value::Json(Some(j)) => Some(j.to_string()),
        _ => as_i64(value).map(|i| i.to_string()),
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(Some(b)) => Some(*b),
        Value::String(Some(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "t" | "true" | "1" | "y" | "yes" | "on" => Some(true),
            "f" | "false" | "0" | "n" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => as_i64(value).map(|i| i != 0),
    }
}

fn as_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::ChronoDate(Some(d)) => Some(NaiveDate::clone(d)),
        Value::ChronoDateTime(Some(dt)) => Some(dt.date()),
        Value::String(Some(s)) => {
            let s = s.trim();
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .or_else(|| parse_timestamp(s).map(|dt| dt.date()))
        }
        _ => None,
    }
}

fn as_time(value: &Value) -> Option<NaiveTime> {
    match value {
        Value::ChronoTime(Some(t)) => Some(NaiveTime::clone(t)),
        Value::ChronoDateTime(Some(dt)) => Some(dt.time()),
        Value::String(Some(s)) => {
            let s = s.trim();
            NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
                .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
                .ok()
        }
        _ => None,
    }
}

fn as_timestamp(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::ChronoDateTime(Some(dt)) => Some(NaiveDateTime::clone(dt)),
        Value::ChronoDateTimeUtc(Some(dt)) => Some(dt.naive_utc()),
        Value::ChronoDate(Some(d)) => d.and_hms_opt(0, 0, 0),
        Value::String(Some(s)) => parse_timestamp(s.trim()),
        _ => None,
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

fn as_uuid(value: &Value) -> Option<uuid::Uuid> {
    match value {
        Value::Uuid(Some(u)) => Some(uuid::Uuid::clone(u)),
        Value::String(Some(s)) => uuid::Uuid::parse_str(s.trim()).ok(),
        _ => None,
    }
}

fn as_json(value: &Value) -> Option<serde_json::Value> {
    match value {
        Value::Json(Some(j)) => Some(serde_json::Value::clone(j)),
        Value::String(Some(s)) => serde_json::from_str(s).ok(),
        _ => None,
    }
}

fn as_bytes(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::Bytes(Some(b)) => Some(b.to_vec()),
        Value::String(Some(s)) => Some(s.as_bytes().to_vec()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_columns_exclude_bookkeeping() {
        let pk = ColumnMeta::new("id", ColumnType::Integer);
        let fk = ColumnMeta::new("customer_id", ColumnType::Integer);
        let counter = ColumnMeta::new("orders_count", ColumnType::Integer);
        let sti = ColumnMeta::new("type", ColumnType::String);
        let name = ColumnMeta::new("name", ColumnType::String);

        assert!(!pk.is_content("id", "type"));
        assert!(!fk.is_content("id", "type"));
        assert!(!counter.is_content("id", "type"));
        assert!(!sti.is_content("id", "type"));
        assert!(name.is_content("id", "type"));
    }

    #[test]
    fn test_cast_string_to_integer() {
        let col = ColumnMeta::new("age", ColumnType::Integer);
        let cast = col.type_cast(&Value::from("42".to_string())).unwrap();
        assert_eq!(cast, Value::from(42i32));
    }

    #[test]
    fn test_cast_string_to_date() {
        let col = ColumnMeta::new("born_on", ColumnType::Date);
        let cast = col.type_cast(&Value::from("1999-12-31".to_string())).unwrap();
        let expected = NaiveDate::from_ymd_opt(1999, 12, 31).unwrap();
        assert_eq!(cast, Value::from(expected));
    }

    #[test]
    fn test_cast_string_to_timestamp() {
        let col = ColumnMeta::new("created_at", ColumnType::Timestamp);
        let cast = col
            .type_cast(&Value::from("2024-03-01 12:30:00".to_string()))
            .unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        assert_eq!(cast, Value::from(expected));
    }

    #[test]
    fn test_cast_boolean_text() {
        let col = ColumnMeta::new("active", ColumnType::Boolean);
        assert_eq!(col.type_cast(&Value::from("t".to_string())).unwrap(), Value::from(true));
        assert_eq!(col.type_cast(&Value::from("0".to_string())).unwrap(), Value::from(false));
        assert!(col.type_cast(&Value::from("maybe".to_string())).is_err());
    }

    #[test]
    fn test_cast_null_is_typed() {
        let col = ColumnMeta::new("age", ColumnType::Integer);
        assert_eq!(col.type_cast(&Value::String(None)).unwrap(), Value::Int(None));
    }

    #[test]
    fn test_cast_native_value_is_unchanged() {
        let col = ColumnMeta::new("score", ColumnType::BigInteger);
        assert_eq!(col.type_cast(&Value::from(7i64)).unwrap(), Value::from(7i64));
    }

    #[test]
    fn test_cast_failure_names_column() {
        let col = ColumnMeta::new("age", ColumnType::Integer);
        let err = col.type_cast(&Value::from("forty".to_string())).unwrap_err();
        match err {
            PiggyBackError::TypeCast { column, expected, .. } => {
                assert_eq!(column, "age");
                assert_eq!(expected, "integer");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cast_json_text() {
        let col = ColumnMeta::new("prefs", ColumnType::Json);
        let cast = col
            .type_cast(&Value::from(r#"{"theme":"dark"}"#.to_string()))
            .unwrap();
        assert_eq!(cast, Value::from(serde_json::json!({"theme": "dark"})));
    }
}
