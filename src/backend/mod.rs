// =============================================================================
// BACKEND — Couche d'abstraction pour le stockage relationnel
// =============================================================================
//
// Le backend traduit les concepts du métamodèle en opérations concrètes :
//   - SchemaManager : le DDL (tables, colonnes, index, vues, tables d'arêtes)
//   - SqlBackend    : le DDL ET le DML, paramétrés par un dialecte
//   - Session       : le collaborateur externe qui EXÉCUTE les statements
//
// Le cœur (module core) ne connaît JAMAIS les backends. C'est l'interface
// qui demande un statement au backend puis le passe à la session.
//
//   UserInterface ──plan──▶ SqlBackend<D> ──Statement──▶ Session ──▶ DB
//
// =============================================================================

pub mod sql;
pub mod sqlite;

use std::fmt;

use thiserror::Error;

use crate::core::hierarchy::ViewPlan;
use crate::core::metamodel::{Association, Attribute, AttributeAssignment, Class};
use crate::core::value::Value;

/// Erreurs remontées par une session.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Erreur d'un autre moteur, transmise sous forme de texte
    #[error("engine error: {0}")]
    Engine(String),

    /// Une ligne ne contient pas ce que le moteur attendait
    #[error("unexpected row shape: {0}")]
    Decode(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Un statement à exécuter : texte SQL + paramètres positionnels.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Statement {
            sql: sql.into(),
            params,
        }
    }

    /// Statement sans paramètre (DDL)
    pub fn ddl(sql: impl Into<String>) -> Self {
        Statement::new(sql, Vec::new())
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql)
    }
}

/// Une ligne de résultat : noms de colonnes et valeurs, dans l'ordre.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub columns: Vec<String>,
    pub values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Row { columns, values }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
    }

    fn require(&self, column: &str) -> StorageResult<&Value> {
        self.get(column)
            .ok_or_else(|| StorageError::Decode(format!("missing column '{}'", column)))
    }

    pub fn get_i64(&self, column: &str) -> StorageResult<i64> {
        self.require(column)?
            .as_i64()
            .ok_or_else(|| StorageError::Decode(format!("column '{}' is not an integer", column)))
    }

    pub fn get_opt_i64(&self, column: &str) -> StorageResult<Option<i64>> {
        match self.require(column)? {
            Value::Null => Ok(None),
            value => value.as_i64().map(Some).ok_or_else(|| {
                StorageError::Decode(format!("column '{}' is not an integer", column))
            }),
        }
    }

    pub fn get_str(&self, column: &str) -> StorageResult<&str> {
        self.require(column)?
            .as_str()
            .ok_or_else(|| StorageError::Decode(format!("column '{}' is not text", column)))
    }

    pub fn get_opt_str(&self, column: &str) -> StorageResult<Option<&str>> {
        match self.require(column)? {
            Value::Null => Ok(None),
            value => value.as_str().map(Some).ok_or_else(|| {
                StorageError::Decode(format!("column '{}' is not text", column))
            }),
        }
    }

    pub fn get_bool(&self, column: &str) -> StorageResult<bool> {
        self.require(column)?
            .as_bool()
            .ok_or_else(|| StorageError::Decode(format!("column '{}' is not a boolean", column)))
    }

    /// Paires (colonne, valeur), sauf les colonnes listées
    pub fn into_pairs_except<'a>(
        self,
        excluded: &'a [&'a str],
    ) -> impl Iterator<Item = (String, Value)> + 'a {
        self.columns
            .into_iter()
            .zip(self.values)
            .filter(move |(column, _)| !excluded.contains(&column.as_str()))
    }
}

/// Le collaborateur externe : exécuter un statement, valider, annuler.
///
/// Une session est utilisée de façon synchrone par une seule interface.
/// Les frontières de transaction appartiennent à l'appelant.
pub trait Session {
    fn execute(&mut self, statement: &Statement) -> StorageResult<Vec<Row>>;
    fn commit(&mut self) -> StorageResult<()>;
    fn rollback(&mut self) -> StorageResult<()>;
}

impl<S: Session + ?Sized> Session for Box<S> {
    fn execute(&mut self, statement: &Statement) -> StorageResult<Vec<Row>> {
        (**self).execute(statement)
    }

    fn commit(&mut self) -> StorageResult<()> {
        (**self).commit()
    }

    fn rollback(&mut self) -> StorageResult<()> {
        (**self).rollback()
    }
}

/// Le DDL dynamique, implémenté par moteur cible.
///
/// Chaque méthode retourne les statements à exécuter ; la logique des
/// classes et attributs n'écrit jamais de SQL brut.
pub trait SchemaManager {
    /// Table physique d'une classe, liée à celle du parent sur l'identité
    fn create_table(&self, class: &Class, parent: Option<&Class>) -> Vec<Statement>;

    /// Colonne d'un attribut dans la table de SA classe
    fn add_column(
        &self,
        class: &Class,
        attribute: &Attribute,
        assignment: &AttributeAssignment,
    ) -> Vec<Statement>;

    /// Index secondaire sur la colonne d'un attribut indexé
    fn create_index(&self, class: &Class, attribute: &Attribute) -> Vec<Statement>;

    /// Vue de lecture dénormalisée (création ou remplacement)
    fn create_or_replace_view(&self, plan: &ViewPlan) -> Vec<Statement>;

    /// Table d'arêtes d'une association
    fn create_edge_table(
        &self,
        association: &Association,
        origin: &Class,
        target: &Class,
    ) -> Vec<Statement>;

    /// Nom du moteur cible
    fn name(&self) -> &str;
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> Row {
        Row::new(
            vec!["id".into(), "name".into(), "parent_id".into(), "indexed".into()],
            vec![
                Value::Integer(3),
                Value::from("person"),
                Value::Null,
                Value::Integer(1),
            ],
        )
    }

    #[test]
    fn test_row_typed_getters() {
        let row = sample_row();
        assert_eq!(row.get_i64("id").unwrap(), 3);
        assert_eq!(row.get_str("name").unwrap(), "person");
        assert_eq!(row.get_opt_i64("parent_id").unwrap(), None);
        assert!(row.get_bool("indexed").unwrap());
    }

    #[test]
    fn test_row_missing_column() {
        let row = sample_row();
        assert!(matches!(row.get_i64("nope"), Err(StorageError::Decode(_))));
        assert!(matches!(row.get_i64("name"), Err(StorageError::Decode(_))));
    }

    #[test]
    fn test_row_pairs_except() {
        let pairs: Vec<_> = sample_row().into_pairs_except(&["id", "indexed"]).collect();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0, "name");
    }

    #[test]
    fn test_statement_display_is_sql() {
        let stmt = Statement::new("SELECT 1", vec![Value::Integer(1)]);
        assert_eq!(stmt.to_string(), "SELECT 1");
    }
}
