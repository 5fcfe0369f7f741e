//! Row records: one decoded result row as an ordered column-name-to-value mapping.

use crate::core::{Result, UsqlError};
use rusqlite::types::{FromSql, Value, ValueRef};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// One result row keyed by column name, in result column order.
///
/// Column names are kept exactly as the driver reports them. Inserting a
/// name that is already present replaces its value in place, so a result
/// with duplicate column names yields the last value at the first position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Row::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Row {
            columns: Vec::with_capacity(capacity),
        }
    }

    /// Inserts a column value, returning the previous value for that name.
    pub fn insert(&mut self, column: impl Into<String>, value: Value) -> Option<Value> {
        let column = column.into();
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.columns.push((column, value));
                None
            }
        }
    }

    /// Returns the raw value of a column, matching the name exactly.
    pub fn get_value(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Converts a column value with rusqlite's `FromSql`.
    ///
    /// # Errors
    ///
    /// `UsqlError::MissingColumn` if the row has no such column and
    /// `UsqlError::Conversion` if the value does not fit `T`.
    pub fn get<T: FromSql>(&self, column: &str) -> Result<T> {
        let value = self
            .get_value(column)
            .ok_or_else(|| UsqlError::MissingColumn(column.to_string()))?;
        T::column_result(ValueRef::from(value)).map_err(|source| UsqlError::Conversion {
            column: column.to_string(),
            source,
        })
    }

    pub fn contains_column(&self, column: &str) -> bool {
        self.get_value(column).is_some()
    }

    /// Column names in result order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}

struct SerializeValue<'a>(&'a Value);

impl Serialize for SerializeValue<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.0 {
            Value::Null => serializer.serialize_none(),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Real(f) => serializer.serialize_f64(*f),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Blob(b) => serializer.serialize_bytes(b),
        }
    }
}

/// Serializes as a map in column order.
impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, &SerializeValue(value))?;
        }
        map.end()
    }
}
