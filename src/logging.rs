// =============================================================================
// LOGGING — Initialisation de tracing
// =============================================================================
//
// Le niveau vient de METARUST_LOG s'il est défini, sinon de la
// configuration (`log_level`), sinon `info`.
//
// =============================================================================

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::EngineConfig;
use crate::error::{MetaError, MetaResult};

pub const LOG_ENV: &str = "METARUST_LOG";

pub fn init_logging(config: &EngineConfig) -> MetaResult<()> {
    let env_filter = build_env_filter(config)?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_level(true))
        .try_init()
        .map_err(|err| MetaError::Config(format!("logger already initialised: {err}")))?;

    Ok(())
}

fn build_env_filter(config: &EngineConfig) -> MetaResult<EnvFilter> {
    let from_env = std::env::var(LOG_ENV).ok().filter(|d| !d.is_empty());
    let directive = from_env
        .as_deref()
        .or(config.log_level.as_deref())
        .unwrap_or("info");
    EnvFilter::try_new(directive)
        .map_err(|err| MetaError::Config(format!("invalid log level '{directive}': {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_from_config() {
        let config = EngineConfig {
            log_level: Some("metarust=debug".into()),
            ..EngineConfig::default()
        };
        assert!(build_env_filter(&config).is_ok());
    }

    #[test]
    fn test_invalid_directive() {
        let config = EngineConfig {
            log_level: Some("metarust=loud".into()),
            ..EngineConfig::default()
        };
        if std::env::var(LOG_ENV).is_err() {
            assert!(matches!(build_env_filter(&config), Err(MetaError::Config(_))));
        }
    }
}
