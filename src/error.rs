use std::fmt;

use thiserror::Error;

use crate::backend::StorageError;

/// Le type d'entité concerné par une recherche infructueuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Class,
    Attribute,
    Association,
    Object,
    Group,
    User,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::Class => "class",
            EntityKind::Attribute => "attribute",
            EntityKind::Association => "association",
            EntityKind::Object => "object",
            EntityKind::Group => "group",
            EntityKind::User => "user",
        };
        f.write_str(label)
    }
}

/// Erreurs du moteur de métamodèle.
///
/// `NotFound` n'est levée qu'après un échec du cache ET du stockage.
/// Les erreurs de session remontent telles quelles (`Storage`), sans
/// nouvelle tentative ni rollback automatique.
#[derive(Debug, Error)]
pub enum MetaError {
    #[error("{kind} not found: {key}")]
    NotFound { kind: EntityKind, key: String },

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("association '{association}' has no target for this object")]
    EmptyTraversal { association: String },

    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

impl MetaError {
    pub fn not_found(kind: EntityKind, key: impl fmt::Display) -> Self {
        MetaError::NotFound {
            kind,
            key: key.to_string(),
        }
    }
}

pub type MetaResult<T> = std::result::Result<T, MetaError>;
