use std::{env, net::IpAddr, str::FromStr, time::Duration};

use dotenvy::dotenv;
use log::{debug, info, warn};
use serde::Deserialize;

pub use crate::errors::ConfigError;

// Server-specific configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub workers: usize,
    /// Resolve the client IP from `Forwarded` / `X-Forwarded-For` instead of the peer address
    pub trust_proxy_headers: bool,
}

// Application-specific configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub name: String,
    pub version: String,
    pub environment: Environment,
    pub log_level: String,
}

// Environment enum for different deployment environments
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Testing,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "testing" | "test" => Ok(Environment::Testing),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(format!(
                "Invalid environment: {}. Must be one of: development, testing, production",
                s
            )),
        }
    }
}

/// Which key-value backend holds the link and quota partitions
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Redis,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "redis" => Ok(StoreBackend::Redis),
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            _ => Err(format!(
                "Invalid store backend: {}. Must be one of: redis, memory",
                s
            )),
        }
    }
}

// Result type for configuration functions
type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Base connection URL; the database index is chosen per partition
    pub redis_url: String,
    pub links_db: i64,
    pub quota_db: i64,
}

/// Settings injected into the shortener service at construction time
#[derive(Debug, Clone, Deserialize)]
pub struct ShortenerConfig {
    /// Public domain used to build short URLs, e.g. `localhost:8000` or `sho.rt`
    pub domain: String,
    /// Requests a client may make per rate-limit window
    pub api_quota: i64,
    pub rate_limit_window: Duration,
    pub default_expiry_hours: u64,
    pub short_code_length: usize,
}

impl Default for ShortenerConfig {
    fn default() -> Self {
        Self {
            domain: "localhost:8000".to_string(),
            api_quota: 10,
            rate_limit_window: Duration::from_secs(30 * 60),
            default_expiry_hours: 24,
            short_code_length: 6,
        }
    }
}

// Config struct that matches our environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub app: AppConfig,
    pub store: StoreConfig,
    pub shortener: ShortenerConfig,
}

impl Config {
    // Load configuration from environment variables
    pub fn load() -> ConfigResult<Self> {
        match dotenv() {
            Ok(_) => debug!(".env file loaded successfully"),
            Err(e) => warn!("Could not load .env file: {}", e),
        }

        let server = ServerConfig {
            host: get_env_or_default("SERVER_HOST", "127.0.0.1")?,
            port: get_env_or_default("SERVER_PORT", "8000")?,
            workers: get_env_or_default("SERVER_WORKERS", "4")?,
            trust_proxy_headers: get_env_or_default("TRUST_PROXY_HEADERS", "false")?,
        };

        let version = option_env!("CARGO_PKG_VERSION")
            .unwrap_or("0.1.0")
            .to_string();

        let app = AppConfig {
            name: get_env_or_default("APP_NAME", "link-shortener")?,
            version: env::var("APP_VERSION").unwrap_or(version),
            environment: get_env_or_default("APP_ENVIRONMENT", "development")?,
            log_level: get_env_or_default("RUST_LOG", "info")?,
        };

        let store = StoreConfig {
            backend: get_env_or_default("STORE_BACKEND", "redis")?,
            redis_url: get_env_or_default("REDIS_URL", "redis://127.0.0.1:6379")?,
            links_db: get_env_or_default("REDIS_LINKS_DB", "0")?,
            quota_db: get_env_or_default("REDIS_QUOTA_DB", "1")?,
        };

        let defaults = ShortenerConfig::default();
        // API_QUOTE is the name older deployments used
        let quota_key = if env::var_os("API_QUOTA").is_none() && env::var_os("API_QUOTE").is_some() {
            "API_QUOTE"
        } else {
            "API_QUOTA"
        };
        let shortener = ShortenerConfig {
            domain: get_env_or_default("DOMAIN", &defaults.domain)?,
            api_quota: get_env_or_default(quota_key, &defaults.api_quota.to_string())?,
            rate_limit_window: Duration::from_secs(get_env_or_default(
                "RATE_LIMIT_WINDOW_SECONDS",
                &defaults.rate_limit_window.as_secs().to_string(),
            )?),
            default_expiry_hours: get_env_or_default(
                "DEFAULT_EXPIRY_HOURS",
                &defaults.default_expiry_hours.to_string(),
            )?,
            short_code_length: get_env_or_default(
                "SHORT_CODE_LENGTH",
                &defaults.short_code_length.to_string(),
            )?,
        };

        let config = Config {
            server,
            app,
            store,
            shortener,
        };
        config.validate()?;

        info!("Configuration loaded successfully");
        debug!("Loaded config: {:?}", config);

        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.shortener.domain.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "DOMAIN",
                reason: "must not be empty".to_string(),
            });
        }
        if self.shortener.api_quota <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "API_QUOTA",
                reason: "must be positive".to_string(),
            });
        }
        if self.shortener.rate_limit_window.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "RATE_LIMIT_WINDOW_SECONDS",
                reason: "must be at least one second".to_string(),
            });
        }
        if self.shortener.default_expiry_hours == 0 {
            return Err(ConfigError::InvalidValue {
                key: "DEFAULT_EXPIRY_HOURS",
                reason: "must be at least one hour".to_string(),
            });
        }
        if self.shortener.short_code_length == 0 {
            return Err(ConfigError::InvalidValue {
                key: "SHORT_CODE_LENGTH",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Helper function to get an env variable with a default value
fn get_env_or_default<T: FromStr>(key: &str, default: &str) -> ConfigResult<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| ConfigError::ParseError(format!("Could not parse {}: {}", key, e))),
        Err(env::VarError::NotPresent) => {
            debug!("{} not set, using default: {}", key, default);
            default.parse::<T>().map_err(|e| {
                ConfigError::ParseError(format!("Could not parse default for {}: {}", key, e))
            })
        }
        Err(e) => Err(ConfigError::EnvVarError(e)),
    }
}
