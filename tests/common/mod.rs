#![allow(dead_code)]

use metarust::backend::sql::{SqlBackend, SqliteDialect};
use metarust::backend::sqlite::SqliteSession;
use metarust::backend::{Row, Session, Statement, StorageResult};
use metarust::core::value::Value;
use metarust::{provision, UserInterface};

/// Base en mémoire provisionnée, interface de l'utilisateur root
pub fn interface() -> UserInterface<SqliteSession> {
    let mut session = SqliteSession::open_in_memory().unwrap();
    let root = provision(&mut session, &SqlBackend::new(SqliteDialect)).unwrap();
    UserInterface::new(root, session)
}

/// Session qui garde le texte de chaque statement exécuté
pub struct Recording<S> {
    pub inner: S,
    pub log: Vec<String>,
}

impl<S: Session> Session for Recording<S> {
    fn execute(&mut self, statement: &Statement) -> StorageResult<Vec<Row>> {
        self.log.push(statement.sql.clone());
        self.inner.execute(statement)
    }

    fn commit(&mut self) -> StorageResult<()> {
        self.inner.commit()
    }

    fn rollback(&mut self) -> StorageResult<()> {
        self.inner.rollback()
    }
}

pub fn recording_interface() -> UserInterface<Recording<SqliteSession>> {
    let mut session = SqliteSession::open_in_memory().unwrap();
    let root = provision(&mut session, &SqlBackend::new(SqliteDialect)).unwrap();
    UserInterface::new(
        root,
        Recording {
            inner: session,
            log: Vec::new(),
        },
    )
}

/// Requête brute sur la session de l'interface
pub fn query<S: Session>(ui: &mut UserInterface<S>, sql: &str, params: Vec<Value>) -> Vec<Row> {
    ui.session_mut()
        .execute(&Statement::new(sql, params))
        .unwrap()
}
