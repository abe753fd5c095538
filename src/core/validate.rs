// =============================================================================
// VALIDATE — Vérification des noms et des références avant toute écriture
// =============================================================================
//
// Les noms de classes, d'attributs et d'associations deviennent des noms
// de tables et de colonnes. On les contraint donc AVANT d'émettre le
// moindre statement :
//   - identifiant SQL simple : [A-Za-z_][A-Za-z0-9_]*, 63 caractères max
//   - `id` est réservé (colonne d'identité de chaque table)
//   - `meta` est réservé aux classes (table des métadonnées d'objets)
//
// Toute violation est une ConstraintViolation.
//
// =============================================================================

use std::fmt;

use crate::error::MetaError;

/// Longueur maximale d'un identifiant (limite PostgreSQL)
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Colonne d'identité partagée par toutes les tables de données
pub const IDENTITY_COLUMN: &str = "id";

/// Table des métadonnées d'objets dans la zone de données
pub const META_TABLE: &str = "meta";

/// Erreur de validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation error: {}", self.message)
    }
}

impl From<ValidationError> for MetaError {
    fn from(err: ValidationError) -> Self {
        MetaError::ConstraintViolation(err.message)
    }
}

/// Vérifie qu'un nom est un identifiant SQL simple.
pub fn validate_identifier(kind: &str, name: &str) -> Result<(), ValidationError> {
    let mut chars = name.chars();
    let first_ok = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);

    if !first_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ValidationError {
            message: format!("{} name '{}' is not a plain identifier", kind, name),
        });
    }
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(ValidationError {
            message: format!(
                "{} name '{}' exceeds {} characters",
                kind, name, MAX_IDENTIFIER_LEN
            ),
        });
    }
    Ok(())
}

pub fn validate_class_name(name: &str) -> Result<(), ValidationError> {
    validate_identifier("class", name)?;
    if name.eq_ignore_ascii_case(META_TABLE) {
        return Err(ValidationError {
            message: format!("class name '{}' is reserved", name),
        });
    }
    Ok(())
}

pub fn validate_attribute_name(name: &str) -> Result<(), ValidationError> {
    validate_identifier("attribute", name)?;
    if name.eq_ignore_ascii_case(IDENTITY_COLUMN) {
        return Err(ValidationError {
            message: format!("attribute name '{}' is reserved", name),
        });
    }
    Ok(())
}

pub fn validate_association_name(name: &str) -> Result<(), ValidationError> {
    validate_identifier("association", name)
}

/// Les groupes ne deviennent pas des tables : on exige juste un nom non vide.
pub fn validate_group_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError {
            message: "group name must not be empty".to_string(),
        });
    }
    Ok(())
}
