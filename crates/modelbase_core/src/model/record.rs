//! Name to value maps exchanged between entities and storage.

use super::error::{ModelError, ModelResult};
use super::value::Value;
use super::ModelId;
use crate::schema::PRIMARY_KEY;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::btree_map::{self, BTreeMap};

/// Flat attribute map, iterated in attribute-name order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    values: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.values.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub(crate) fn retain(&mut self, keep: impl FnMut(&String, &mut Value) -> bool) {
        self.values.retain(keep);
    }

    /// Removes the primary key; missing or null means "not saved yet".
    pub fn take_id(&mut self) -> ModelResult<Option<ModelId>> {
        self.take_optional(PRIMARY_KEY, "integer", |value| match value {
            Value::Integer(value) => Some(value),
            _ => None,
        })
    }

    pub fn take_i64(&mut self, name: &str) -> ModelResult<i64> {
        required(name, self.take_opt_i64(name)?)
    }

    pub fn take_opt_i64(&mut self, name: &str) -> ModelResult<Option<i64>> {
        self.take_optional(name, "integer", |value| match value {
            Value::Integer(value) => Some(value),
            _ => None,
        })
    }

    pub fn take_f64(&mut self, name: &str) -> ModelResult<f64> {
        required(name, self.take_opt_f64(name)?)
    }

    pub fn take_opt_f64(&mut self, name: &str) -> ModelResult<Option<f64>> {
        self.take_optional(name, "real", |value| match value {
            Value::Real(value) => Some(value),
            Value::Integer(value) => Some(value as f64),
            _ => None,
        })
    }

    pub fn take_text(&mut self, name: &str) -> ModelResult<String> {
        required(name, self.take_opt_text(name)?)
    }

    pub fn take_opt_text(&mut self, name: &str) -> ModelResult<Option<String>> {
        self.take_optional(name, "text", |value| match value {
            Value::Text(value) => Some(value),
            _ => None,
        })
    }

    pub fn take_bool(&mut self, name: &str) -> ModelResult<bool> {
        required(name, self.take_opt_bool(name)?)
    }

    pub fn take_opt_bool(&mut self, name: &str) -> ModelResult<Option<bool>> {
        self.take_optional(name, "boolean", |value| match value {
            Value::Bool(value) => Some(value),
            _ => None,
        })
    }

    pub fn take_date(&mut self, name: &str) -> ModelResult<NaiveDate> {
        required(name, self.take_opt_date(name)?)
    }

    pub fn take_opt_date(&mut self, name: &str) -> ModelResult<Option<NaiveDate>> {
        self.take_optional(name, "date", |value| match value {
            Value::Date(value) => Some(value),
            _ => None,
        })
    }

    pub fn take_datetime(&mut self, name: &str) -> ModelResult<NaiveDateTime> {
        required(name, self.take_opt_datetime(name)?)
    }

    pub fn take_opt_datetime(&mut self, name: &str) -> ModelResult<Option<NaiveDateTime>> {
        self.take_optional(name, "datetime", |value| match value {
            Value::DateTime(value) => Some(value),
            _ => None,
        })
    }

    fn take_optional<T>(
        &mut self,
        name: &str,
        expected: &str,
        extract: impl FnOnce(Value) -> Option<T>,
    ) -> ModelResult<Option<T>> {
        match self.values.remove(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => {
                let found = value.type_name();
                extract(value).map(Some).ok_or_else(|| {
                    ModelError::InvalidModelAttribute(format!(
                        "attribute `{name}` expects {expected}, got {found}"
                    ))
                })
            }
        }
    }
}

fn required<T>(name: &str, value: Option<T>) -> ModelResult<T> {
    value.ok_or_else(|| {
        ModelError::InvalidModelAttribute(format!("attribute `{name}` is required"))
    })
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// Conjunction of `column = value` conditions for `select`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((column.into(), value.into()));
        self
    }

    pub fn conditions(&self) -> &[(String, Value)] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// `a=1, b="x"` sorted by column, for logs.
    pub(crate) fn describe(&self) -> String {
        let mut parts: Vec<String> = self
            .conditions
            .iter()
            .map(|(column, value)| format!("{column}={}", value.repr()))
            .collect();
        parts.sort();
        parts.join(", ")
    }
}
