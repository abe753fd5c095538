// =============================================================================
// SQLITE — Session concrète au-dessus de rusqlite
// =============================================================================
//
// Une SqliteSession détient UNE connexion. Elle ouvre une transaction
// paresseusement au premier statement ; commit/rollback la ferment.
// Tant que l'appelant ne valide pas, rien n'est durable.
//
// Les clés étrangères sont activées à l'ouverture : sans elles, SQLite
// ignorerait le chaînage des tables de données sur l'identité.
//
// =============================================================================

use std::path::Path;

use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use tracing::trace;

use super::{Row, Session, Statement, StorageResult};
use crate::core::value::Value;

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::String(s) => ToSqlOutput::from(s.as_str()),
            Value::Integer(i) => ToSqlOutput::from(*i),
            Value::Float(f) => ToSqlOutput::from(*f),
            Value::Boolean(b) => ToSqlOutput::from(*b),
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
        })
    }
}

fn value_from_ref(cell: ValueRef<'_>) -> Value {
    match cell {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

pub struct SqliteSession {
    connection: Connection,
}

impl SqliteSession {
    /// Ouvre (ou crée) une base fichier
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Self::configure(Connection::open(path)?)
    }

    /// Base éphémère, détruite avec la session
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::configure(Connection::open_in_memory()?)
    }

    fn configure(connection: Connection) -> StorageResult<Self> {
        connection.pragma_update(None, "foreign_keys", true)?;
        Ok(SqliteSession { connection })
    }

    /// Une transaction est-elle en cours ?
    pub fn in_transaction(&self) -> bool {
        !self.connection.is_autocommit()
    }
}

impl Session for SqliteSession {
    fn execute(&mut self, statement: &Statement) -> StorageResult<Vec<Row>> {
        if self.connection.is_autocommit() {
            self.connection.execute_batch("BEGIN")?;
        }
        trace!(params = statement.params.len(), "sqlite execute");

        let mut prepared = self.connection.prepare(&statement.sql)?;
        let columns: Vec<String> = prepared.column_names().into_iter().map(String::from).collect();
        let mut rows = prepared.query(params_from_iter(statement.params.iter()))?;

        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let values = (0..columns.len())
                .map(|idx| row.get_ref(idx).map(value_from_ref))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            result.push(Row::new(columns.clone(), values));
        }
        Ok(result)
    }

    fn commit(&mut self) -> StorageResult<()> {
        if self.in_transaction() {
            self.connection.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    fn rollback(&mut self) -> StorageResult<()> {
        if self.in_transaction() {
            self.connection.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }
}
