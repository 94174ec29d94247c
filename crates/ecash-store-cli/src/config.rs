use std::path::{Path, PathBuf};

use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};

pub const ENV_BACKEND: &str = "ECASH_STORE_BACKEND";
pub const ENV_REDB_PATH: &str = "ECASH_STORE_REDB_PATH";

pub const DEFAULT_REDB_FILE: &str = "ecash-store.redb";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Memory,
    #[default]
    Redb,
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Backend::Memory),
            "redb" => Ok(Backend::Redb),
            _ => Err(format!("Unknown storage backend: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Storage {
    #[serde(default)]
    pub backend: Backend,
    /// Redb file, relative paths are resolved against the work dir
    pub redb_path: Option<PathBuf>,
}

impl Storage {
    /// Storage from env
    pub fn from_env(mut self) -> Self {
        use std::env;

        if let Ok(backend_str) = env::var(ENV_BACKEND) {
            match backend_str.parse() {
                Ok(backend) => self.backend = backend,
                Err(err) => tracing::warn!("Ignoring {}: {}", ENV_BACKEND, err),
            }
        }

        if let Ok(path) = env::var(ENV_REDB_PATH) {
            self.redb_path = Some(PathBuf::from(path));
        }

        self
    }

    /// Location of the redb file
    pub fn redb_path(&self, work_dir: &Path) -> PathBuf {
        match &self.redb_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => work_dir.join(path),
            None => work_dir.join(DEFAULT_REDB_FILE),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub storage: Storage,
}

impl Settings {
    /// Load settings from `config_file`, falling back to defaults
    #[must_use]
    pub fn new(config_file: &Path) -> Self {
        let default_settings = Self::default();

        match Self::new_from_default(&default_settings, config_file) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::error!(
                    "Error reading config file, falling back to defaults. Error: {e:?}"
                );
                default_settings
            }
        }
    }

    fn new_from_default(default: &Settings, config_file: &Path) -> Result<Self, ConfigError> {
        let config: Config = Config::builder()
            // use defaults
            .add_source(Config::try_from(default)?)
            // override with file contents
            .add_source(File::from(config_file).required(false))
            .build()?;

        config.try_deserialize()
    }
}
