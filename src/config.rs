// =============================================================================
// CONFIG — Paramètres du moteur, lus depuis un fichier TOML
// =============================================================================
//
// Ordre de résolution :
//   1. chemin explicite (argument de la ligne de commande)
//   2. variable d'environnement METARUST_CONFIG
//   3. valeurs par défaut (SQLite en mémoire, préfixe de vue `v_`)
//
//   database    = "meta.db"
//   dialect     = "sqlite"      # ou "postgres"
//   log_level   = "info"
//   view_prefix = "v_"
//   provision   = true
//
// =============================================================================

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::metamodel::DEFAULT_VIEW_PREFIX;
use crate::error::{MetaError, MetaResult};

pub const CONFIG_ENV: &str = "METARUST_CONFIG";

/// Base SQLite éphémère
pub const IN_MEMORY: &str = ":memory:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub database: String,
    pub dialect: DialectKind,
    pub log_level: Option<String>,
    pub view_prefix: String,
    /// Exécuter le provisionnement au démarrage
    pub provision: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database: IN_MEMORY.to_string(),
            dialect: DialectKind::Sqlite,
            log_level: Some(String::from("info")),
            view_prefix: DEFAULT_VIEW_PREFIX.to_string(),
            provision: true,
        }
    }
}

impl EngineConfig {
    pub fn from_sources(cli_path: Option<&str>) -> MetaResult<Self> {
        let env_path = std::env::var(CONFIG_ENV).ok();

        if let Some(path) = cli_path {
            if path.is_empty() {
                return Err(MetaError::Config("configuration path must not be empty".into()));
            }
        }

        let config = if let Some(path) = cli_path {
            Self::load_from_path(path)?
        } else if let Some(path) = env_path.as_deref().filter(|p| !p.is_empty()) {
            Self::load_from_path(path)?
        } else {
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Lit un fichier ; un chemin de base relatif est résolu par rapport
    /// au dossier du fichier.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> MetaResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let mut config: EngineConfig = toml::from_str(&raw)?;

        if config.database != IN_MEMORY && Path::new(&config.database).is_relative() {
            let base = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            config.database = base.join(&config.database).to_string_lossy().into_owned();
        }
        Ok(config)
    }

    pub fn validate(&self) -> MetaResult<()> {
        if self.database.trim().is_empty() {
            return Err(MetaError::Config("database must not be empty".into()));
        }
        if self.view_prefix.is_empty() {
            return Err(MetaError::Config("view_prefix must not be empty".into()));
        }
        Ok(())
    }

    pub fn is_in_memory(&self) -> bool {
        self.database == IN_MEMORY
    }
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("metarust.toml");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(config.is_in_memory());
        assert_eq!(config.dialect, DialectKind::Sqlite);
        assert_eq!(config.view_prefix, "v_");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "dialect = \"postgres\"\nprovision = false\n");
        let config = EngineConfig::from_sources(path.to_str()).unwrap();
        assert_eq!(config.dialect, DialectKind::Postgres);
        assert!(!config.provision);
        assert!(config.is_in_memory());
    }

    #[test]
    fn test_relative_database_resolved_next_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "database = \"meta.db\"\n");
        let config = EngineConfig::load_from_path(&path).unwrap();
        assert_eq!(Path::new(&config.database), dir.path().join("meta.db"));
    }

    #[test]
    fn test_empty_view_prefix_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "view_prefix = \"\"\n");
        let err = EngineConfig::from_sources(path.to_str()).unwrap_err();
        assert!(matches!(err, MetaError::Config(_)));
    }

    #[test]
    fn test_empty_path_rejected() {
        assert!(matches!(EngineConfig::from_sources(Some("")), Err(MetaError::Config(_))));
    }

    #[test]
    fn test_unknown_dialect_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "dialect = \"oracle\"\n");
        assert!(matches!(EngineConfig::load_from_path(&path), Err(MetaError::Toml(_))));
    }
}
