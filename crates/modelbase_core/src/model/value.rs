//! Attribute values and their conversions to SQL, JSON and text.
//!
//! # Invariants
//! - Dates travel as ISO-8601 text (`YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS[.f]`)
//!   both in storage and in JSON.
//! - Coercion is driven by the declared column type, never by the shape of
//!   a string alone.

use crate::schema::ColumnType;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::{Value as SqlValue, ValueRef};
use std::fmt::{Display, Formatter};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const SQL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// One attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
            Self::Bool(_) => "boolean",
            Self::Date(_) => "date",
            Self::DateTime(_) => "datetime",
        }
    }

    /// Deterministic, unambiguous rendering used by model representations.
    pub fn repr(&self) -> String {
        match self {
            Self::Null => "None".to_string(),
            Self::Integer(value) => value.to_string(),
            Self::Real(value) => format!("{value:?}"),
            Self::Text(value) => format!("{value:?}"),
            Self::Bool(value) => value.to_string(),
            Self::Date(value) => value.format(DATE_FORMAT).to_string(),
            Self::DateTime(value) => value.format(DATETIME_FORMAT).to_string(),
        }
    }

    /// Converts `self` into the representation `kind` stores.
    ///
    /// Returns the untouched value on mismatch so callers can report it.
    pub fn coerce(self, kind: ColumnType) -> Result<Value, Value> {
        match (kind, self) {
            (_, Self::Null) => Ok(Self::Null),
            (ColumnType::Integer, value @ Self::Integer(_)) => Ok(value),
            (ColumnType::Real, value @ Self::Real(_)) => Ok(value),
            (ColumnType::Real, Self::Integer(value)) => Ok(Self::Real(value as f64)),
            (ColumnType::Text, value @ Self::Text(_)) => Ok(value),
            (ColumnType::Boolean, value @ Self::Bool(_)) => Ok(value),
            (ColumnType::Boolean, Self::Integer(0)) => Ok(Self::Bool(false)),
            (ColumnType::Boolean, Self::Integer(1)) => Ok(Self::Bool(true)),
            (ColumnType::Date, value @ Self::Date(_)) => Ok(value),
            (ColumnType::Date, Self::Text(text)) => match parse_date(&text) {
                Some(date) => Ok(Self::Date(date)),
                None => Err(Self::Text(text)),
            },
            (ColumnType::DateTime, value @ Self::DateTime(_)) => Ok(value),
            (ColumnType::DateTime, Self::Date(date)) => date
                .and_hms_opt(0, 0, 0)
                .map(Self::DateTime)
                .ok_or(Self::Date(date)),
            (ColumnType::DateTime, Self::Text(text)) => match parse_datetime(&text) {
                Some(datetime) => Ok(Self::DateTime(datetime)),
                None => Err(Self::Text(text)),
            },
            (_, value) => Err(value),
        }
    }

    pub(crate) fn to_sql(&self) -> SqlValue {
        match self {
            Self::Null => SqlValue::Null,
            Self::Integer(value) => SqlValue::Integer(*value),
            Self::Real(value) => SqlValue::Real(*value),
            Self::Text(value) => SqlValue::Text(value.clone()),
            Self::Bool(value) => SqlValue::Integer(i64::from(*value)),
            Self::Date(value) => SqlValue::Text(value.format(DATE_FORMAT).to_string()),
            Self::DateTime(value) => SqlValue::Text(value.format(DATETIME_FORMAT).to_string()),
        }
    }

    /// Decodes one stored cell according to its declared column type.
    pub(crate) fn from_sql(kind: ColumnType, cell: ValueRef<'_>) -> Result<Value, String> {
        let decoded = match (kind, cell) {
            (_, ValueRef::Null) => Some(Self::Null),
            (ColumnType::Integer, ValueRef::Integer(value)) => Some(Self::Integer(value)),
            (ColumnType::Real, ValueRef::Real(value)) => Some(Self::Real(value)),
            (ColumnType::Real, ValueRef::Integer(value)) => Some(Self::Real(value as f64)),
            (ColumnType::Boolean, ValueRef::Integer(0)) => Some(Self::Bool(false)),
            (ColumnType::Boolean, ValueRef::Integer(1)) => Some(Self::Bool(true)),
            (ColumnType::Text, ValueRef::Text(bytes)) => {
                std::str::from_utf8(bytes).ok().map(|text| Self::Text(text.to_string()))
            }
            (ColumnType::Date, ValueRef::Text(bytes)) => std::str::from_utf8(bytes)
                .ok()
                .and_then(parse_date)
                .map(Self::Date),
            (ColumnType::DateTime, ValueRef::Text(bytes)) => std::str::from_utf8(bytes)
                .ok()
                .and_then(parse_datetime)
                .map(Self::DateTime),
            _ => None,
        };
        decoded.ok_or_else(|| {
            format!(
                "stored {} value cannot be read as {kind}",
                cell.data_type()
            )
        })
    }

    pub(crate) fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Integer(value) => serde_json::Value::from(*value),
            Self::Real(value) => serde_json::Number::from_f64(*value)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::Text(value) => serde_json::Value::String(value.clone()),
            Self::Bool(value) => serde_json::Value::Bool(*value),
            Self::Date(value) => serde_json::Value::String(value.format(DATE_FORMAT).to_string()),
            Self::DateTime(value) => {
                serde_json::Value::String(value.format(DATETIME_FORMAT).to_string())
            }
        }
    }

    /// Maps a scalar JSON value. Arrays and objects have no column type.
    pub(crate) fn from_json(value: serde_json::Value) -> Option<Value> {
        match value {
            serde_json::Value::Null => Some(Self::Null),
            serde_json::Value::Bool(value) => Some(Self::Bool(value)),
            serde_json::Value::Number(number) => number
                .as_i64()
                .map(Self::Integer)
                .or_else(|| number.as_f64().map(Self::Real)),
            serde_json::Value::String(value) => Some(Self::Text(value)),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.repr())
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).ok()
}

/// Full timestamps contain a `T` (or a space, as SQLite writes them); a bare
/// calendar date is read as midnight.
fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.contains('T') {
        return NaiveDateTime::parse_from_str(text, DATETIME_FORMAT).ok();
    }
    if text.contains(' ') {
        return NaiveDateTime::parse_from_str(text, SQL_DATETIME_FORMAT).ok();
    }
    parse_date(text).and_then(|date| date.and_hms_opt(0, 0, 0))
}

macro_rules! value_from {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for Value {
                fn from(value: $source) -> Self {
                    Self::$variant(value.into())
                }
            }
        )*
    };
}

value_from! {
    i64 => Integer,
    i32 => Integer,
    u32 => Integer,
    f64 => Real,
    bool => Bool,
    String => Text,
    &str => Text,
    NaiveDate => Date,
    NaiveDateTime => DateTime,
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::Value;
    use crate::schema::ColumnType;
    use chrono::NaiveDate;

    fn jon_birthdate() -> NaiveDate {
        NaiveDate::from_ymd_opt(1986, 4, 4).unwrap()
    }

    #[test]
    fn coerce_parses_dates_only_for_date_columns() {
        assert_eq!(
            Value::from("1986-04-04").coerce(ColumnType::Date),
            Ok(Value::Date(jon_birthdate()))
        );
        assert_eq!(
            Value::from("1986-04-04").coerce(ColumnType::Text),
            Ok(Value::from("1986-04-04"))
        );
        assert_eq!(
            Value::from("1986-04-04T00:00:00").coerce(ColumnType::DateTime),
            Ok(Value::DateTime(jon_birthdate().and_hms_opt(0, 0, 0).unwrap()))
        );
        assert_eq!(
            Value::from("1986-04-04").coerce(ColumnType::DateTime),
            Ok(Value::DateTime(jon_birthdate().and_hms_opt(0, 0, 0).unwrap()))
        );
        assert_eq!(
            Value::from("20240101").coerce(ColumnType::Date),
            Err(Value::from("20240101"))
        );
    }

    #[test]
    fn coerce_widens_integers_and_rejects_mismatches() {
        assert_eq!(Value::from(3).coerce(ColumnType::Real), Ok(Value::Real(3.0)));
        assert_eq!(Value::from(1).coerce(ColumnType::Boolean), Ok(Value::Bool(true)));
        assert_eq!(Value::Null.coerce(ColumnType::Date), Ok(Value::Null));
        assert_eq!(
            Value::from("42").coerce(ColumnType::Integer),
            Err(Value::from("42"))
        );
        assert_eq!(Value::from(2).coerce(ColumnType::Boolean), Err(Value::from(2)));
    }

    #[test]
    fn repr_is_quoted_and_iso_formatted() {
        assert_eq!(Value::from("Jon \"J\"").repr(), "\"Jon \\\"J\\\"\"");
        assert_eq!(Value::from(35).repr(), "35");
        assert_eq!(Value::from(1.5).repr(), "1.5");
        assert_eq!(Value::Null.repr(), "None");
        assert_eq!(Value::Date(jon_birthdate()).repr(), "1986-04-04");
        assert_eq!(
            Value::DateTime(jon_birthdate().and_hms_opt(13, 5, 0).unwrap()).repr(),
            "1986-04-04T13:05:00"
        );
    }

    #[test]
    fn json_scalars_map_to_values() {
        assert_eq!(Value::from_json(serde_json::json!(7)), Some(Value::Integer(7)));
        assert_eq!(Value::from_json(serde_json::json!(0.5)), Some(Value::Real(0.5)));
        assert_eq!(Value::from_json(serde_json::json!(null)), Some(Value::Null));
        assert_eq!(Value::from_json(serde_json::json!([1, 2])), None);
        assert_eq!(
            Value::Date(jon_birthdate()).to_json(),
            serde_json::json!("1986-04-04")
        );
    }
}
