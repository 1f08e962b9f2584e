//! Column-name to value mappings, as produced by a SQLite cursor or a CSV record.

use anyhow::Context;
use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row as _, TypeInfo, ValueRef};
use std::fmt::{Display, Formatter};

use crate::Result;

/// A single value in a `Row`.
///
/// The variants mirror the SQLite storage classes, plus `Date` which is produced when a stored ISO
/// 8601 string has already been converted into a calendar date.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Date(NaiveDate),
}

impl Field {
    pub fn text(value: impl Into<String>) -> Self {
        Field::Text(value.into())
    }

    /// Returns the string content when this field holds text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Field::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::Null => write!(f, "NULL"),
            Field::Integer(i) => write!(f, "{i}"),
            Field::Real(r) => write!(f, "{r}"),
            Field::Text(s) => write!(f, "{s}"),
            Field::Blob(b) => write!(f, "<{} bytes>", b.len()),
            Field::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl Serialize for Field {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Field::Null => serializer.serialize_none(),
            Field::Integer(i) => serializer.serialize_i64(*i),
            Field::Real(r) => serializer.serialize_f64(*r),
            Field::Text(s) => serializer.serialize_str(s),
            Field::Blob(b) => serializer.serialize_bytes(b),
            Field::Date(_) => serializer.serialize_str(&self.to_string()),
        }
    }
}

/// An ordered mapping from column name to `Field`. Column order is the order in which the columns
/// were described by the source (cursor column descriptors or the CSV header).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Row {
    fields: Vec<(String, Field)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`, replacing the value in place if the column is already present.
    pub fn set(&mut self, name: impl Into<String>, value: Field) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Builder-style `set`.
    pub fn with(mut self, name: impl Into<String>, value: Field) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, field)| field)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Maps a SQLite result row using its column descriptors.
    pub(crate) fn from_sqlite(row: &SqliteRow) -> Result<Self> {
        let mut out = Row::new();
        for column in row.columns() {
            let ix = column.ordinal();
            let raw = row
                .try_get_raw(ix)
                .with_context(|| format!("Unable to read column '{}'", column.name()))?;
            let field = if raw.is_null() {
                Field::Null
            } else {
                // The value's own storage class, not the declared column type.
                let storage = raw.type_info().name().to_string();
                match storage.as_str() {
                    "INTEGER" => Field::Integer(row.try_get_unchecked(ix)?),
                    "REAL" => Field::Real(row.try_get_unchecked(ix)?),
                    "BLOB" => Field::Blob(row.try_get_unchecked(ix)?),
                    _ => Field::Text(row.try_get_unchecked(ix)?),
                }
            };
            out.fields.push((column.name().to_string(), field));
        }
        Ok(out)
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<String>,
    V: Into<String>,
{
    /// Collects text fields, e.g. from a CSV record zipped with its headers.
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.set(k, Field::Text(v.into()));
        }
        row
    }
}

impl Serialize for Row {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, field) in &self.fields {
            map.serialize_entry(name, field)?;
        }
        map.end()
    }
}
