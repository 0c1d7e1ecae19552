use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub uploads: UploadConfig,
    /// Upper bound applied to the `limit` query parameter on list requests
    pub max_page_limit: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Mount point of the events routes (e.g. `/api/v3/app`)
    pub base_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Redb,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub mongodb_uri: String,
    pub database: String,
    /// Directory for the redb backend
    pub data_dir: String,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub dir: String,
    /// Maximum image size in bytes
    pub max_size: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            base_path: "/api/v3/app".to_string(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Mongo,
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            database: "events".to_string(),
            data_dir: "./data".to_string(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: "./uploads".to_string(),
            max_size: 5 * 1024 * 1024,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            uploads: UploadConfig::default(),
            max_page_limit: 100,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("PORT must be a port number, got '{raw}'"))
            })?,
            None => defaults.server.port,
        };

        let host = lookup("BIND_HOST").unwrap_or(defaults.server.host);
        let base_path = lookup("BASE_PATH").unwrap_or(defaults.server.base_path);

        let backend = match lookup("STORE_BACKEND")
            .unwrap_or_else(|| "mongodb".to_string())
            .to_lowercase()
            .as_str()
        {
            "mongodb" | "mongo" => StoreBackend::Mongo,
            "redb" => StoreBackend::Redb,
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "STORE_BACKEND must be 'mongodb' or 'redb', got '{other}'"
                )))
            }
        };

        let mongodb_uri = lookup("MONGODB_URI").unwrap_or(defaults.store.mongodb_uri);
        let database = lookup("DB_NAME").unwrap_or(defaults.store.database);
        let data_dir = lookup("DATA_DIR").unwrap_or(defaults.store.data_dir);

        let upload_dir = lookup("UPLOAD_DIR").unwrap_or(defaults.uploads.dir);
        let max_upload_size = lookup("MAX_UPLOAD_SIZE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.uploads.max_size);

        let max_page_limit = lookup("MAX_PAGE_LIMIT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_page_limit);

        let config = Config {
            server: ServerConfig {
                host,
                port,
                base_path,
            },
            store: StoreConfig {
                backend,
                mongodb_uri,
                database,
                data_dir,
            },
            uploads: UploadConfig {
                dir: upload_dir,
                max_size: max_upload_size,
            },
            max_page_limit,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.store.backend == StoreBackend::Mongo {
            if self.store.mongodb_uri.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "MONGODB_URI cannot be empty".to_string(),
                ));
            }
            if self.store.database.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "DB_NAME cannot be empty".to_string(),
                ));
            }
        }

        if self.uploads.max_size == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_UPLOAD_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.max_page_limit == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_PAGE_LIMIT must be greater than 0".to_string(),
            ));
        }

        if !self.server.base_path.starts_with('/') {
            return Err(ConfigError::ValidationError(format!(
                "BASE_PATH must start with '/', got '{}'",
                self.server.base_path
            )));
        }

        Ok(())
    }

    /// Address the HTTP listener binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.base_path, "/api/v3/app");
        assert_eq!(config.store.backend, StoreBackend::Mongo);
        assert_eq!(config.uploads.max_size, 5 * 1024 * 1024);
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("PORT", "8081"),
            ("MONGODB_URI", "mongodb://db:27017"),
            ("DB_NAME", "agenda"),
            ("STORE_BACKEND", "redb"),
        ])
        .unwrap();
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.store.mongodb_uri, "mongodb://db:27017");
        assert_eq!(config.store.database, "agenda");
        assert_eq!(config.store.backend, StoreBackend::Redb);
    }

    #[test]
    fn test_invalid_port_rejected() {
        assert!(load(&[("PORT", "http")]).is_err());
    }

    #[test]
    fn test_unknown_backend_rejected() {
        assert!(load(&[("STORE_BACKEND", "postgres")]).is_err());
    }

    #[test]
    fn test_empty_database_name_rejected() {
        assert!(load(&[("DB_NAME", " ")]).is_err());
    }

    #[test]
    fn test_relative_base_path_rejected() {
        assert!(load(&[("BASE_PATH", "api")]).is_err());
    }
}
