//! Application settings and configuration structures.

use std::fmt;
use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server configuration (host, port, timeout)
    pub server: ServerSettings,

    /// Storage backend configuration
    pub database: DatabaseSettings,

    /// Redis configuration
    pub redis: RedisSettings,

    /// Response cache configuration
    pub cache: CacheSettings,

    /// JWT authentication settings
    pub jwt: JwtSettings,

    /// Password hashing cost parameters
    pub password: PasswordSettings,

    /// Rate limiting configuration
    pub rate_limit: RateLimitSettings,

    /// CORS configuration
    pub cors: CorsSettings,

    /// Upload storage configuration
    pub uploads: UploadSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,

    /// Port number to listen on
    pub port: u16,

    /// Blanket per-request timeout in seconds
    pub request_timeout_secs: u64,
}

/// Which repository implementation backs the entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Postgres => write!(f, "postgres"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Repository backend
    pub backend: StorageBackend,

    /// Database connection URL, required for the postgres backend
    pub url: Option<String>,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections to maintain
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    pub acquire_timeout: u64,

    /// Apply embedded migrations on startup
    pub run_migrations: bool,
}

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    /// Redis connection URL. Caching is disabled when absent.
    pub url: Option<String>,
}

/// Where cached responses live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Redis at `redis.url`; caching is off when the URL is absent
    #[default]
    Redis,
    /// Process-local maps, for a single instance without Redis
    Memory,
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    pub enabled: bool,

    pub backend: CacheBackend,

    /// Expiry applied to every cached response
    pub ttl_seconds: u64,
}

/// JWT authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for signing tokens
    pub secret: String,

    /// Access token expiry in minutes
    pub access_token_expiry_minutes: i64,

    /// Password reset token expiry in minutes
    pub reset_token_expiry_minutes: i64,
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordSettings {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    /// Maximum requests per client per window
    pub requests_per_window: u32,

    /// Window length in seconds
    pub window_seconds: u64,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    /// Allowed origins (comma-separated in env)
    pub allowed_origins: Vec<String>,
}

/// Upload storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadSettings {
    /// Directory uploaded files are written to and served from
    pub dir: PathBuf,

    /// Maximum request body size for uploads in bytes
    pub max_bytes: usize,
}

/// Minimum required length for JWT secret (256 bits = 32 bytes)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. config/default.toml (base configuration)
    /// 2. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 3. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if the loaded values are inconsistent.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Config::builder()
            .set_default("environment", environment.clone())?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("server.request_timeout_secs", 30)?
            .set_default("database.backend", "postgres")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout", 30)?
            .set_default("database.run_migrations", true)?
            .set_default("cache.enabled", true)?
            .set_default("cache.ttl_seconds", 60)?
            .set_default("cache.backend", "redis")?
            .set_default("jwt.access_token_expiry_minutes", 60)?
            .set_default("jwt.reset_token_expiry_minutes", 15)?
            .set_default("password.memory_kib", 19456)?
            .set_default("password.iterations", 2)?
            .set_default("password.parallelism", 1)?
            .set_default("rate_limit.requests_per_window", 100)?
            .set_default("rate_limit.window_seconds", 60)?
            .set_default("cors.allowed_origins", vec!["http://localhost:3000"])?
            .set_default("uploads.dir", "uploads")?
            .set_default("uploads.max_bytes", 10 * 1024 * 1024_i64)?
            // Load from config files
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // APP__SERVER__PORT=3000 -> server.port = 3000
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .try_parsing(true),
            )
            // Map simple environment variables
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("database.backend", std::env::var("DATABASE_BACKEND").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("redis.url", std::env::var("REDIS_URL").ok())?
            .set_override_option("jwt.secret", std::env::var("JWT_SECRET").ok())?
            .set_override_option("uploads.dir", std::env::var("UPLOAD_DIR").ok())?
            .build()?
            .try_deserialize()
            .and_then(|settings: Self| {
                settings.validate()?;
                Ok(settings)
            })
    }

    /// Check cross-field constraints that deserialization cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::Message(format!(
                "JWT secret must be at least {} characters. Current length: {}",
                MIN_JWT_SECRET_LENGTH,
                self.jwt.secret.len()
            )));
        }

        if self.database.backend == StorageBackend::Postgres && self.database.url.is_none() {
            return Err(ConfigError::Message(
                "database.url (or DATABASE_URL) is required for the postgres backend".into(),
            ));
        }

        if self.rate_limit.window_seconds == 0 {
            return Err(ConfigError::Message(
                "rate_limit.window_seconds must be greater than zero".into(),
            ));
        }

        Ok(())
    }

    /// Self-contained settings: memory backend, no Redis, light password
    /// hashing and a fixed JWT secret. Used by tests and local demos.
    pub fn in_memory(uploads_dir: impl Into<PathBuf>) -> Self {
        Settings {
            server: ServerSettings {
                host: "127.0.0.1".into(),
                port: 3000,
                request_timeout_secs: 30,
            },
            database: DatabaseSettings {
                backend: StorageBackend::Memory,
                url: None,
                max_connections: 5,
                min_connections: 1,
                acquire_timeout: 5,
                run_migrations: false,
            },
            redis: RedisSettings { url: None },
            cache: CacheSettings {
                enabled: false,
                backend: CacheBackend::Redis,
                ttl_seconds: 60,
            },
            jwt: JwtSettings {
                secret: "local-development-secret-change-me-0123456789".into(),
                access_token_expiry_minutes: 60,
                reset_token_expiry_minutes: 15,
            },
            password: PasswordSettings {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
            },
            rate_limit: RateLimitSettings {
                requests_per_window: 1000,
                window_seconds: 60,
            },
            cors: CorsSettings {
                allowed_origins: vec!["*".into()],
            },
            uploads: UploadSettings {
                dir: uploads_dir.into(),
                max_bytes: 10 * 1024 * 1024,
            },
            environment: "development".into(),
        }
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Error details and reset tokens are withheld in production.
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Settings {
        Settings::in_memory("uploads")
    }

    #[test]
    fn test_validate_accepts_memory_backend_without_url() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_secret() {
        let mut settings = sample();
        settings.jwt.secret = "short".into();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_requires_url_for_postgres() {
        let mut settings = sample();
        settings.database.backend = StorageBackend::Postgres;
        assert!(settings.validate().is_err());

        settings.database.url = Some("postgres://localhost/crud".into());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_is_production() {
        let mut settings = sample();
        assert!(!settings.is_production());
        settings.environment = "Production".into();
        assert!(settings.is_production());
    }
}
