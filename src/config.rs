use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Environment variable overriding `storage.db_path`
pub const DB_PATH_ENV: &str = "ACCOUNTS_DB_PATH";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub files: FilesConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    pub rpc_port: u16,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StorageConfig {
    pub db_path: String,
    /// Keep data in a throwaway tree (demos and tests).
    #[serde(default)]
    pub temporary: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FilesConfig {
    /// Prefix for avatar URLs.
    pub base_url: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3333".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_addr: default_bind_addr(),
                rpc_port: 3333,
            },
            storage: StorageConfig {
                db_path: "./data/accounts".to_string(),
                temporary: false,
            },
            files: FilesConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn load_or_default(path: &str) -> Self {
        let mut config = if std::path::Path::new(path).exists() {
            match std::fs::read_to_string(path) {
                Ok(s) => Self::parse_or_default(&s, path),
                Err(e) => {
                    warn!("Error reading config {}: {}. Using defaults.", path, e);
                    Self::default()
                }
            }
        } else {
            info!("Config file not found at '{}'. Creating default.", path);
            let config = Self::default();
            match toml::to_string_pretty(&config) {
                Ok(s) => {
                    if let Err(e) = std::fs::write(path, s) {
                        warn!("Could not write default config to {}: {}", path, e);
                    }
                }
                Err(e) => warn!("Could not render default config: {}", e),
            }
            config
        };

        if let Ok(db_path) = std::env::var(DB_PATH_ENV) {
            config.storage.db_path = db_path;
        }
        config
    }

    fn parse_or_default(contents: &str, path: &str) -> Self {
        match toml::from_str(contents) {
            Ok(c) => {
                info!("Config loaded from {}", path);
                c
            }
            Err(e) => {
                warn!("Error parsing config {}: {}. Using defaults.", path, e);
                Self::default()
            }
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind_addr, self.server.rpc_port)
    }
}
