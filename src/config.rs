use serde::{Deserialize, Serialize};

use std::{env, fs, path::Path, time::Duration};

const CONFIG_PATH_VAR: &str = "NOTES_STORE_CONFIG";
const ENV_PREFIX: &str = "NOTES_STORE_";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub postgres: Option<PostgresConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub dsn: String,
    #[serde(with = "humantime_serde", default = "default_connect_timeout")]
    pub connect_timeout: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to read configuration from environment: {0}")]
    Env(#[from] envy::Error),

    #[error("postgres backend selected but no dsn configured")]
    MissingDsn,
}

// Flat shape of the environment variables, e.g. NOTES_STORE_PG_DSN.
#[derive(Debug, Deserialize)]
struct EnvConfig {
    #[serde(default)]
    backend: Backend,
    pg_dsn: Option<String>,
    #[serde(default, with = "humantime_serde")]
    pg_connect_timeout: Option<Duration>,
}

const fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

impl PostgresConfig {
    pub fn new(dsn: impl Into<String>) -> Self {
        Self {
            dsn: dsn.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl Config {
    #[must_use]
    pub const fn memory() -> Self {
        Self {
            backend: Backend::Memory,
            postgres: None,
        }
    }

    #[must_use]
    pub const fn postgres(postgres: PostgresConfig) -> Self {
        Self {
            backend: Backend::Postgres,
            postgres: Some(postgres),
        }
    }

    /// Checks that the selected backend has everything it needs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingDsn`] when the postgres backend is
    /// selected without a dsn.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend == Backend::Postgres
            && self
                .postgres
                .as_ref()
                .is_none_or(|pg| pg.dsn.trim().is_empty())
        {
            return Err(ConfigError::MissingDsn);
        }
        Ok(())
    }
}

/// Reads a YAML config file.
///
/// # Errors
///
/// Fails if the file cannot be read or parsed, or does not validate.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: Config = serde_yaml::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

/// Builds a config from `NOTES_STORE_*` variables.
///
/// # Errors
///
/// Fails if a variable is malformed or the result does not validate.
pub fn load_from_env_vars<I>(vars: I) -> Result<Config, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let env_config: EnvConfig = envy::prefixed(ENV_PREFIX).from_iter(vars)?;

    let config = Config {
        backend: env_config.backend,
        postgres: env_config.pg_dsn.map(|dsn| PostgresConfig {
            dsn,
            connect_timeout: env_config
                .pg_connect_timeout
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT),
        }),
    };
    config.validate()?;
    Ok(config)
}

/// Locates and loads the configuration.
///
/// Tries the file named by `NOTES_STORE_CONFIG`, then `config.yaml`, then
/// `config.example.yaml`, and finally the `NOTES_STORE_*` environment
/// variables.
///
/// # Errors
///
/// Fails if the chosen source is unreadable, malformed or incomplete.
pub fn load_config() -> Result<Config, ConfigError> {
    // Retrieve env variable
    let config_path = env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| "config.yaml".to_string());

    // Try env path
    if Path::new(&config_path).exists() {
        return load_config_from(Path::new(&config_path));
    }

    // Fallback to config.yaml
    if Path::new("config.yaml").exists() {
        tracing::warn!(
            "Config file '{}' not found, falling back to 'config.yaml'",
            config_path
        );
        return load_config_from(Path::new("config.yaml"));
    }

    // Fallback to config.example.yaml
    if Path::new("config.example.yaml").exists() {
        tracing::warn!(
            "Config file '{}' and 'config.yaml' not found, falling back to 'config.example.yaml'\
             \n This file should not be used and should be replaced with actual data",
            config_path
        );
        return load_config_from(Path::new("config.example.yaml"));
    }

    // Fallback to environment variables
    tracing::info!(
        "No config file found, attempting to load configuration from environment variables"
    );
    let config = load_from_env_vars(env::vars())?;
    tracing::info!("Successfully loaded configuration from environment variables");
    Ok(config)
}
