// session.rs - ODBC session against the cluster head node
//
// Blocking, single connection, autocommit on. Each call allocates a statement
// on the shared connection, runs the batch to completion and materializes the
// first result set before returning.

use crate::config::{ClusterConfig, Credentials};
use crate::error::Result;
use crate::fixtures::{SqlExecutor, NO_ROW_COUNT};
use crate::row::{Column, ResultSet, SqlValue};
use odbc_api::{Connection, ConnectionOptions, Cursor, DataType, Environment, Nullable};
use std::sync::OnceLock;

static ENVIRONMENT: OnceLock<Environment> = OnceLock::new();

/// The process-wide ODBC environment, created on first use.
fn environment() -> Result<&'static Environment> {
    if let Some(env) = ENVIRONMENT.get() {
        return Ok(env);
    }
    let env = Environment::new()?;
    Ok(ENVIRONMENT.get_or_init(|| env))
}

pub struct OdbcSession {
    conn: Connection<'static>,
}

impl OdbcSession {
    pub fn connect(config: &ClusterConfig, credentials: &Credentials) -> Result<Self> {
        let conn = environment()?.connect_with_connection_string(
            &config.connection_string(credentials),
            ConnectionOptions::default(),
        )?;
        conn.set_autocommit(config.autocommit)?;
        tracing::info!("✓ Connected to {}/{}", config.server, config.database);
        Ok(Self { conn })
    }
}

impl Drop for OdbcSession {
    fn drop(&mut self) {
        tracing::debug!("Closing ODBC connection");
    }
}

impl SqlExecutor for OdbcSession {
    fn execute(&mut self, sql: &str) -> Result<i64> {
        tracing::debug!("execute: {}", sql);
        let mut stmt = self.conn.preallocate()?;
        let has_result_set = stmt.execute(sql, ())?.is_some();
        if has_result_set {
            tracing::debug!("Ignoring result set produced by `{}`", sql);
        }
        let count = stmt.row_count()?;
        Ok(count.map_or(NO_ROW_COUNT, |n| n as i64))
    }

    fn query(&mut self, sql: &str) -> Result<ResultSet> {
        tracing::debug!("query: {}", sql);
        let mut stmt = self.conn.preallocate()?;
        let result = match stmt.execute(sql, ())? {
            Some(mut cursor) => read_result_set(&mut cursor),
            None => Ok(ResultSet::default()),
        };
        result
    }
}

/// How a column's values are pulled out of the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Int,
    Float,
    Text,
}

impl From<DataType> for ValueKind {
    fn from(data_type: DataType) -> Self {
        match data_type {
            DataType::TinyInt
            | DataType::SmallInt
            | DataType::Integer
            | DataType::BigInt
            | DataType::Bit => ValueKind::Int,
            DataType::Real | DataType::Double | DataType::Float { .. } => ValueKind::Float,
            _ => ValueKind::Text,
        }
    }
}

fn read_result_set<C: Cursor>(cursor: &mut C) -> Result<ResultSet> {
    let count = cursor.num_result_cols()?;
    let mut columns = Vec::new();
    let mut kinds = Vec::new();
    for index in 1..=count.max(0) as u16 {
        columns.push(Column::new(cursor.col_name(index)?));
        kinds.push(ValueKind::from(cursor.col_data_type(index)?));
    }

    let mut result = ResultSet::new(columns);
    let mut text = Vec::new();
    while let Some(mut row) = cursor.next_row()? {
        let mut values = Vec::with_capacity(kinds.len());
        for (offset, kind) in kinds.iter().enumerate() {
            let index = offset as u16 + 1;
            let value = match kind {
                ValueKind::Int => {
                    let mut v = Nullable::<i64>::null();
                    row.get_data(index, &mut v)?;
                    v.into_opt().map_or(SqlValue::Null, SqlValue::Int)
                }
                // Fetched as binary doubles, never through text, so no digits are lost.
                ValueKind::Float => {
                    let mut v = Nullable::<f64>::null();
                    row.get_data(index, &mut v)?;
                    v.into_opt().map_or(SqlValue::Null, SqlValue::Float)
                }
                ValueKind::Text => {
                    text.clear();
                    if row.get_text(index, &mut text)? {
                        SqlValue::Text(String::from_utf8_lossy(&text).into_owned())
                    } else {
                        SqlValue::Null
                    }
                }
            };
            values.push(value);
        }
        result.push_row(values)?;
    }

    tracing::debug!("Fetched {} rows", result.len());
    Ok(result)
}
