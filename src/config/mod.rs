use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub routes: RouteConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base address for relative request targets. Absolute targets bypass it.
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// Extra attempts allowed after a 401 when the credential changed mid-flight.
    pub retry_budget: u8,
    /// "Who am I" endpoints, tried in order during session hydration.
    pub identity_endpoints: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    pub login: String,
    pub dashboard: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub config_dir: PathBuf,
    pub download_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| env::var(key).ok())
    }

    /// Applies `SCHOOLOPS_*` overrides read through `lookup`. Blank values are ignored.
    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let env_value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        // API overrides
        if let Some(v) = env_value("SCHOOLOPS_API_BASE_URL") {
            self.api.base_url = v;
        }
        if let Some(v) = env_value("SCHOOLOPS_REQUEST_TIMEOUT_SECS") {
            self.api.request_timeout_secs = v.parse().unwrap_or(self.api.request_timeout_secs);
        }
        if let Some(v) = env_value("SCHOOLOPS_AUTH_RETRY_BUDGET") {
            self.api.retry_budget = v.parse().unwrap_or(self.api.retry_budget);
        }
        if let Some(v) = env_value("SCHOOLOPS_IDENTITY_ENDPOINTS") {
            let endpoints = split_list(&v);
            if !endpoints.is_empty() {
                self.api.identity_endpoints = endpoints;
            }
        }

        // Route overrides
        if let Some(v) = env_value("SCHOOLOPS_LOGIN_ROUTE") {
            self.routes.login = v;
        }
        if let Some(v) = env_value("SCHOOLOPS_DASHBOARD_ROUTE") {
            self.routes.dashboard = v;
        }

        // Storage overrides
        if let Some(v) = env_value("SCHOOLOPS_CONFIG_DIR") {
            self.storage.config_dir = PathBuf::from(v);
            self.storage.download_dir = self.storage.config_dir.join("downloads");
        }
        if let Some(v) = env_value("SCHOOLOPS_DOWNLOAD_DIR") {
            self.storage.download_dir = PathBuf::from(v);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            api: ApiConfig {
                base_url: "http://localhost:8000".to_string(),
                request_timeout_secs: 30,
                retry_budget: 1,
                identity_endpoints: default_identity_endpoints(),
            },
            routes: RouteConfig::default(),
            storage: StorageConfig::default(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            api: ApiConfig {
                base_url: "https://staging.schoolops.example.com".to_string(),
                request_timeout_secs: 15,
                retry_budget: 1,
                identity_endpoints: default_identity_endpoints(),
            },
            routes: RouteConfig::default(),
            storage: StorageConfig::default(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            api: ApiConfig {
                base_url: "https://schoolops.example.com".to_string(),
                request_timeout_secs: 10,
                retry_budget: 1,
                identity_endpoints: default_identity_endpoints(),
            },
            routes: RouteConfig::default(),
            storage: StorageConfig::default(),
        }
    }

    /// Development defaults pointed at an explicit API base, used by tests and embedders.
    pub fn for_base_url(base_url: impl Into<String>) -> Self {
        let mut config = Self::development();
        config.api.base_url = base_url.into();
        config
    }
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            login: "#/login".to_string(),
            dashboard: "#/dashboard".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let config_dir = default_config_dir();
        let download_dir = config_dir.join("downloads");
        Self {
            config_dir,
            download_dir,
        }
    }
}

fn default_identity_endpoints() -> Vec<String> {
    vec![
        "/api/auth/me".to_string(),
        "/api/auth/whoami".to_string(),
        "/api/users/me".to_string(),
    ]
}

fn default_config_dir() -> PathBuf {
    match env::var("HOME") {
        Ok(home) => PathBuf::from(home).join(".config").join("schoolops").join("console"),
        Err(_) => PathBuf::from(".schoolops"),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
