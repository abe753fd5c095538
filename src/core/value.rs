// =============================================================================
// VALUE — Les types de stockage et les valeurs concrètes
// =============================================================================
//
// Un Attribut porte un "descripteur de type de stockage". Pour le cœur,
// ce descripteur est OPAQUE : il ne sert qu'à générer la colonne côté
// backend. On fournit quelques types standard (traduits par le dialecte)
// et un type Custom transmis tel quel au moteur (VARCHAR(100), TIMESTAMPTZ...).
//
// Les valeurs (Value) sont ce qui circule entre le cœur et la session :
// paramètres des statements, cellules des lignes lues, attributs d'objets.
//
// =============================================================================

use std::fmt;

/// Descripteur de type de stockage d'un attribut.
///
/// Les variantes standard sont traduites par le dialecte SQL ; `Custom`
/// est recopié verbatim dans le DDL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BaseType {
    /// Chaîne de caractères (→ TEXT)
    String,
    /// Entier (→ BIGINT / INTEGER)
    Integer,
    /// Flottant (→ DOUBLE PRECISION / REAL)
    Float,
    /// Booléen (→ BOOLEAN)
    Boolean,
    /// Type natif du moteur, non interprété
    Custom(std::string::String),
}

impl BaseType {
    /// Raccourci pour un type natif (`BaseType::custom("VARCHAR(100)")`)
    pub fn custom(descriptor: &str) -> Self {
        BaseType::Custom(descriptor.to_string())
    }

    /// Relit un descripteur tel qu'il est stocké dans le catalogue.
    ///
    /// Inverse de `Display` : les noms standard redonnent la variante
    /// standard, tout le reste devient `Custom`.
    pub fn parse(descriptor: &str) -> Self {
        match descriptor {
            "String" => BaseType::String,
            "Int" => BaseType::Integer,
            "Float" => BaseType::Float,
            "Bool" => BaseType::Boolean,
            other => BaseType::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseType::String => write!(f, "String"),
            BaseType::Integer => write!(f, "Int"),
            BaseType::Float => write!(f, "Float"),
            BaseType::Boolean => write!(f, "Bool"),
            BaseType::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// Une valeur concrète : paramètre de statement ou cellule lue.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(std::string::String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Ramène une valeur au type déclaré de sa colonne.
    ///
    /// SQLite ne connaît ni BOOLEAN ni la distinction 5 / 5.0 : un booléen
    /// se relit en 0/1 et un entier écrit dans une colonne REAL se relit en
    /// flottant. Les autres combinaisons sont laissées telles quelles.
    pub fn coerce(self, storage_type: &BaseType) -> Value {
        match (self, storage_type) {
            (Value::Integer(i), BaseType::Boolean) => Value::Boolean(i != 0),
            (Value::Integer(i), BaseType::Float) => Value::Float(i as f64),
            (value, _) => value,
        }
    }

    /// Lecture booléenne tolérante : SQLite stocke les BOOLEAN en 0/1.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            Value::Integer(i) => Some(*i != 0),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Null => write!(f, "NULL"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<std::string::String> for Value {
    fn from(s: std::string::String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}
