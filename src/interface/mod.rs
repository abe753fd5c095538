// =============================================================================
// INTERFACE — Le point d'entrée d'un utilisateur sur le métamodèle
// =============================================================================
//
// Une UserInterface réunit, pour UN utilisateur :
//   - une session (la connexion empruntée, utilisée de façon synchrone)
//   - le backend SQL qui fabrique les statements
//   - les caches (structure + permissions), propres à cette instance
//
// Le flux d'une opération :
//
//   cache ──(miss)──▶ backend.select_*() ──▶ session.execute() ──▶ *_from_row
//
// Les opérations sont réparties par thème :
//   class       → classes, attributs, assignations, vues
//   object      → création, lecture, modification d'objets
//   association → définition et parcours des associations
//   permission  → utilisateurs, groupes, droits effectifs
//
// Les frontières de transaction appartiennent à l'appelant : rien n'est
// validé tant qu'il n'a pas appelé `commit`.
//
// =============================================================================

mod association;
mod class;
mod object;
mod permission;

use tracing::{debug, info};

use crate::backend::sql::dml::returned_id;
use crate::backend::sql::{SqlBackend, SqlDialect, SqliteDialect};
use crate::backend::{Row, Session, Statement};
use crate::core::cache::{PermissionCache, StructureCache};
use crate::core::metamodel::{UserId, DEFAULT_VIEW_PREFIX};
use crate::error::MetaResult;

/// Nom de l'utilisateur créé au provisionnement
pub const ROOT_USER: &str = "root";

/// Crée les zones de la base et l'utilisateur racine.
///
/// À exécuter une seule fois, avant toute UserInterface. Le DDL et
/// l'insertion de `root` sont validés ensemble.
pub fn provision<S: Session, D: SqlDialect>(
    session: &mut S,
    backend: &SqlBackend<D>,
) -> MetaResult<UserId> {
    for statement in backend.bootstrap() {
        debug!(sql = %statement, "provision");
        session.execute(&statement)?;
    }
    let rows = session.execute(&backend.insert_user(ROOT_USER))?;
    let root = UserId(returned_id(&rows)?);
    session.commit()?;
    info!(dialect = %backend.dialect.dialect_name(), root = %root, "database provisioned");
    Ok(root)
}

pub struct UserInterface<S: Session, D: SqlDialect = SqliteDialect> {
    user: UserId,
    session: S,
    backend: SqlBackend<D>,
    structure: StructureCache,
    permissions: PermissionCache,
    view_prefix: String,
}

impl<S: Session> UserInterface<S, SqliteDialect> {
    pub fn new(user: UserId, session: S) -> Self {
        Self::with_backend(user, session, SqlBackend::new(SqliteDialect))
    }
}

impl<S: Session, D: SqlDialect> UserInterface<S, D> {
    pub fn with_backend(user: UserId, session: S, backend: SqlBackend<D>) -> Self {
        UserInterface {
            user,
            session,
            backend,
            structure: StructureCache::new(),
            permissions: PermissionCache::new(),
            view_prefix: DEFAULT_VIEW_PREFIX.to_string(),
        }
    }

    /// Change le préfixe des vues de lecture (`v_` par défaut)
    pub fn with_view_prefix(mut self, prefix: &str) -> Self {
        self.view_prefix = prefix.to_string();
        self
    }

    /// L'utilisateur pour qui les objets sont créés
    pub fn user(&self) -> UserId {
        self.user
    }

    pub fn view_prefix(&self) -> &str {
        &self.view_prefix
    }

    pub fn backend(&self) -> &SqlBackend<D> {
        &self.backend
    }

    /// Accès direct à la session, pour l'hôte
    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn commit(&mut self) -> MetaResult<()> {
        self.session.commit()?;
        Ok(())
    }

    /// Annule la transaction en cours et vide les caches, qui peuvent
    /// contenir des définitions jamais validées.
    pub fn rollback(&mut self) -> MetaResult<()> {
        self.session.rollback()?;
        self.structure = StructureCache::new();
        self.permissions = PermissionCache::new();
        Ok(())
    }

    /// Rend la session à l'hôte. Les caches sont abandonnés avec l'interface.
    pub fn into_session(self) -> S {
        self.session
    }

    fn run(&mut self, statement: &Statement) -> MetaResult<Vec<Row>> {
        debug!(sql = %statement, "execute");
        Ok(self.session.execute(statement)?)
    }

    fn run_all(&mut self, statements: Vec<Statement>) -> MetaResult<()> {
        for statement in &statements {
            self.run(statement)?;
        }
        Ok(())
    }

    /// Première ligne d'une requête de recherche, décodée
    fn fetch_one<T, F>(&mut self, statement: &Statement, decode: F) -> MetaResult<Option<T>>
    where
        F: FnOnce(&Row) -> crate::backend::StorageResult<T>,
    {
        let rows = self.run(statement)?;
        match rows.first() {
            Some(row) => Ok(Some(decode(row)?)),
            None => Ok(None),
        }
    }
}
