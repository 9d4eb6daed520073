use std::fs;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

pub const DEFAULT_CATALOG_URL: &str = "https://www.adlis.hcamazighite.dz/api/api/books/getAllFiles";
pub const DEFAULT_DOWNLOAD_DIR: &str = "pdf_downloads";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CHUNK_SIZE: usize = 1024;
pub const LOCAL_CONFIG_FILE: &str = "pdf-sync.json";

/// On-disk configuration. Every field is optional.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub catalog_url: Option<String>,
    #[serde(default)]
    pub download_dir: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub chunk_size: Option<usize>,
}

/// Values given on the command line; they win over the config file.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub catalog_url: Option<String>,
    pub download_dir: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncConfig {
    pub catalog_url: String,
    pub download_dir: Utf8PathBuf,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub chunk_size: usize,
}

impl SyncConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            download_dir: Utf8PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: default_user_agent(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Resolves configuration from an explicit file, `pdf-sync.json` in the
    /// working directory, or the user config directory, in that order.
    pub fn resolve(
        path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<SyncConfig, SyncError> {
        let config = match path {
            Some(path) => Self::load_file(Utf8Path::new(path))?,
            None => match Self::discover() {
                Some(found) => {
                    tracing::debug!(path = %found, "using discovered config file");
                    Self::load_file(&found)?
                }
                None => Config::default(),
            },
        };
        Self::resolve_config(config, overrides)
    }

    pub fn load_file(path: &Utf8Path) -> Result<Config, SyncError> {
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|_| SyncError::ConfigRead(path.to_path_buf()))?;
        serde_json::from_str(&content).map_err(|err| SyncError::ConfigParse(err.to_string()))
    }

    pub fn resolve_config(
        config: Config,
        overrides: ConfigOverrides,
    ) -> Result<SyncConfig, SyncError> {
        let defaults = SyncConfig::default();
        let resolved = SyncConfig {
            catalog_url: overrides
                .catalog_url
                .or(config.catalog_url)
                .unwrap_or(defaults.catalog_url)
                .trim()
                .to_string(),
            download_dir: overrides
                .download_dir
                .or(config.download_dir)
                .map(Utf8PathBuf::from)
                .unwrap_or(defaults.download_dir),
            timeout_secs: overrides
                .timeout_secs
                .or(config.timeout_secs)
                .unwrap_or(defaults.timeout_secs),
            user_agent: config.user_agent.unwrap_or(defaults.user_agent),
            chunk_size: config.chunk_size.unwrap_or(defaults.chunk_size),
        };
        validate(&resolved)?;
        Ok(resolved)
    }

    fn discover() -> Option<Utf8PathBuf> {
        let local = Utf8PathBuf::from(LOCAL_CONFIG_FILE);
        if local.as_std_path().exists() {
            return Some(local);
        }
        BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.config_dir().join("pdf-sync").join("config.json"))
                    .ok()
            })
            .filter(|path| path.as_std_path().exists())
    }
}

fn validate(config: &SyncConfig) -> Result<(), SyncError> {
    if config.catalog_url.is_empty() {
        return Err(SyncError::InvalidConfig("catalog url is empty".to_string()));
    }
    if !(config.catalog_url.starts_with("http://") || config.catalog_url.starts_with("https://")) {
        return Err(SyncError::InvalidConfig(format!(
            "catalog url must be http(s): {}",
            config.catalog_url
        )));
    }
    if config.download_dir.as_str().trim().is_empty() {
        return Err(SyncError::InvalidConfig(
            "download directory is empty".to_string(),
        ));
    }
    if config.timeout_secs == 0 {
        return Err(SyncError::InvalidConfig(
            "timeout must be at least one second".to_string(),
        ));
    }
    if config.chunk_size == 0 {
        return Err(SyncError::InvalidConfig(
            "chunk size must be positive".to_string(),
        ));
    }
    Ok(())
}

pub fn default_user_agent() -> String {
    format!("pdf-sync/{}", env!("CARGO_PKG_VERSION"))
}
