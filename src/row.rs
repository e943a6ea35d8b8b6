// row.rs - Result sets and row materialization
//
// A fetched result set keeps the column descriptors reported by the server
// next to the positional row values. Turning rows into name-keyed records
// never drops, renames or reorders a column.

use crate::error::{HarnessError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single column value, as far as the harness cares about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl SqlValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v.into())
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Int(v) => write!(f, "{}", v),
            SqlValue::Float(v) => write!(f, "{:?}", v),
            SqlValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// Column descriptor from result-set metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Everything fetched from one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<SqlValue>>,
}

/// A row keyed by column name. Comparison ignores column order.
pub type Record = BTreeMap<String, SqlValue>;

impl ResultSet {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row. The value count must match the column count.
    pub fn push_row(&mut self, row: Vec<SqlValue>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(HarnessError::mismatch(
                "row width",
                &self.columns.len(),
                &row.len(),
            ));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Value at `(row, column)`, both zero based.
    pub fn value(&self, row: usize, column: usize) -> Option<&SqlValue> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Map every row to a record keyed by column name.
    ///
    /// Fails if the result set reports the same column name twice, since a
    /// keyed record could not hold both values.
    pub fn records(&self) -> Result<Vec<Record>> {
        let mut seen = std::collections::BTreeSet::new();
        for name in self.column_names() {
            if !seen.insert(name) {
                return Err(HarnessError::mismatch(
                    "result set columns",
                    "unique column names",
                    &self.column_names().collect::<Vec<_>>(),
                ));
            }
        }

        Ok(self
            .rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .map(|c| c.name.clone())
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect())
    }

    /// Map every row through a typed record mapping.
    pub fn decode<T: FromRecord>(&self) -> Result<Vec<T>> {
        self.records()?.into_iter().map(T::from_record).collect()
    }
}

/// Typed view of a record.
///
/// Implementations must consume every column, so a record with extra or
/// missing columns fails to decode.
pub trait FromRecord: Sized {
    fn from_record(record: Record) -> Result<Self>;
}

/// Helper for `FromRecord` impls: pulls typed fields out of a record and
/// checks at the end that nothing was left behind.
pub struct RecordReader {
    record: Record,
}

impl RecordReader {
    pub fn new(record: Record) -> Self {
        Self { record }
    }

    fn take(&mut self, name: &str) -> Result<SqlValue> {
        self.record.remove(name).ok_or_else(|| {
            HarnessError::mismatch(
                "record fields",
                &format!("column `{}`", name),
                &self.record.keys().collect::<Vec<_>>(),
            )
        })
    }

    fn wrong_type(name: &str, wanted: &str, got: SqlValue) -> HarnessError {
        HarnessError::mismatch(format!("type of column `{}`", name), wanted, &got)
    }

    pub fn int(&mut self, name: &str) -> Result<i64> {
        match self.take(name)? {
            SqlValue::Int(v) => Ok(v),
            other => Err(Self::wrong_type(name, "integer", other)),
        }
    }

    pub fn float(&mut self, name: &str) -> Result<f64> {
        match self.take(name)? {
            SqlValue::Float(v) => Ok(v),
            other => Err(Self::wrong_type(name, "float", other)),
        }
    }

    pub fn text(&mut self, name: &str) -> Result<String> {
        match self.take(name)? {
            SqlValue::Text(v) => Ok(v),
            other => Err(Self::wrong_type(name, "text", other)),
        }
    }

    /// Finish decoding; any column not taken is an error.
    pub fn finish(self) -> Result<()> {
        if self.record.is_empty() {
            Ok(())
        } else {
            Err(HarnessError::mismatch(
                "record fields",
                &Vec::<String>::new(),
                &self.record.keys().collect::<Vec<_>>(),
            ))
        }
    }
}
