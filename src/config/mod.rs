use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

use crate::auth::password::DEFAULT_COST;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Path prefix every catalog route is nested under
    pub prefix: String,
    pub default_page_size: u32,
    pub max_page_size: u32,
    /// Number of products returned by the recent listing
    pub recent_limit: u32,
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// When unset the server runs on the in-process store
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_hours: i64,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    /// bcrypt work factor for stored password hashes
    pub password_cost: u32,
    /// Staff account seeded into the in-process store
    pub admin_username: Option<String>,
    #[serde(skip_serializing)]
    pub admin_password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub url_prefix: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set in {0:?}")]
    MissingJwtSecret(Environment),

    #[error("Invalid page size bounds: default {default} exceeds max {max}")]
    InvalidPageSize { default: u32, max: u32 },

    #[error("Invalid API prefix: {0}")]
    InvalidPrefix(String),

    #[error("Password cost must be between 4 and 31, got {0}")]
    InvalidPasswordCost(u32),

    #[error("CATALOG_ADMIN_USERNAME and CATALOG_ADMIN_PASSWORD must be set together")]
    IncompleteAdmin,
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

    fn with_env_overrides(mut self) -> Self {
        // API overrides
        if let Ok(v) = env::var("API_PREFIX") {
            self.api.prefix = v;
        }
        if let Ok(v) = env::var("API_DEFAULT_PAGE_SIZE") {
            self.api.default_page_size = v.parse().unwrap_or(self.api.default_page_size);
        }
        if let Ok(v) = env::var("API_MAX_PAGE_SIZE") {
            self.api.max_page_size = v.parse().unwrap_or(self.api.max_page_size);
        }
        if let Ok(v) = env::var("API_RECENT_LIMIT") {
            self.api.recent_limit = v.parse().unwrap_or(self.api.recent_limit);
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v).filter(|s| !s.trim().is_empty());
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_ACCESS_TOKEN_MINUTES") {
            self.security.access_token_minutes = v.parse().unwrap_or(self.security.access_token_minutes);
        }
        if let Ok(v) = env::var("SECURITY_REFRESH_TOKEN_HOURS") {
            self.security.refresh_token_hours = v.parse().unwrap_or(self.security.refresh_token_hours);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        }
        if let Ok(v) = env::var("SECURITY_PASSWORD_COST") {
            self.security.password_cost = v.parse().unwrap_or(self.security.password_cost);
        }
        if let Ok(v) = env::var("CATALOG_ADMIN_USERNAME") {
            self.security.admin_username = Some(v).filter(|s| !s.trim().is_empty());
        }
        if let Ok(v) = env::var("CATALOG_ADMIN_PASSWORD") {
            self.security.admin_password = Some(v).filter(|s| !s.is_empty());
        }

        // Media overrides
        if let Ok(v) = env::var("MEDIA_URL") {
            self.media.url_prefix = v;
        }

        self
    }

    /// Reject combinations the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.is_empty() && self.environment != Environment::Development {
            return Err(ConfigError::MissingJwtSecret(self.environment));
        }
        if self.api.default_page_size == 0 || self.api.default_page_size > self.api.max_page_size {
            return Err(ConfigError::InvalidPageSize {
                default: self.api.default_page_size,
                max: self.api.max_page_size,
            });
        }
        if !self.api.prefix.is_empty() && (!self.api.prefix.starts_with('/') || self.api.prefix.ends_with('/')) {
            return Err(ConfigError::InvalidPrefix(self.api.prefix.clone()));
        }
        if !(4..=31).contains(&self.security.password_cost) {
            return Err(ConfigError::InvalidPasswordCost(self.security.password_cost));
        }
        if self.security.admin_username.is_some() != self.security.admin_password.is_some() {
            return Err(ConfigError::IncompleteAdmin);
        }
        Ok(())
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            api: ApiConfig {
                prefix: "/api/v1".to_string(),
                default_page_size: 10,
                max_page_size: 100,
                recent_limit: 5,
                enable_request_logging: true,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                jwt_secret: "development-only-insecure-secret".to_string(),
                access_token_minutes: 60,
                refresh_token_hours: 24,
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                password_cost: 10,
                admin_username: None,
                admin_password: None,
            },
            media: MediaConfig {
                url_prefix: "/media/".to_string(),
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            api: ApiConfig {
                prefix: "/api/v1".to_string(),
                default_page_size: 10,
                max_page_size: 100,
                recent_limit: 5,
                enable_request_logging: true,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                access_token_minutes: 15,
                refresh_token_hours: 24,
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                password_cost: DEFAULT_COST,
                admin_username: None,
                admin_password: None,
            },
            media: MediaConfig {
                url_prefix: "/media/".to_string(),
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            api: ApiConfig {
                prefix: "/api/v1".to_string(),
                default_page_size: 10,
                max_page_size: 50,
                recent_limit: 5,
                enable_request_logging: false,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                access_token_minutes: 5,
                refresh_token_hours: 24,
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                password_cost: DEFAULT_COST,
                admin_username: None,
                admin_password: None,
            },
            media: MediaConfig {
                url_prefix: "/media/".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.api.default_page_size, 10);
        assert_eq!(config.api.recent_limit, 5);
        assert!(config.database.url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_production_requires_secret() {
        let mut config = AppConfig::production();
        assert!(matches!(config.validate(), Err(ConfigError::MissingJwtSecret(Environment::Production))));

        config.security.jwt_secret = "s3cret".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_page_size_bounds_checked() {
        let mut config = AppConfig::development();
        config.api.default_page_size = 500;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPageSize { .. })));
    }

    #[test]
    fn test_admin_credentials_come_in_pairs() {
        let mut config = AppConfig::development();
        config.security.admin_username = Some("admin".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::IncompleteAdmin)));

        config.security.admin_password = Some("pw".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_password_cost_bounds_checked() {
        let mut config = AppConfig::development();
        config.security.password_cost = 2;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPasswordCost(2))));
    }

    #[test]
    fn test_prefix_shape_checked() {
        let mut config = AppConfig::development();
        config.api.prefix = "/api/v1/".to_string();
        assert!(config.validate().is_err());
        config.api.prefix = String::new();
        assert!(config.validate().is_ok());
    }
}
