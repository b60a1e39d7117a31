//! Configuration management
//!
//! This module handles loading and parsing configuration for the blog.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Blog behaviour (listing sizes, similar-article limit)
    #[serde(default)]
    pub blog: BlogConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/blog.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Blog behaviour settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogConfig {
    /// Maximum number of posts returned by the similar-articles query
    #[serde(default = "default_similar_articles_limit")]
    pub similar_articles_limit: usize,
    /// Number of posts in the "latest articles" block on the index page
    #[serde(default = "default_latest_articles_count")]
    pub latest_articles_count: usize,
    /// Default page size for post listings
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            similar_articles_limit: default_similar_articles_limit(),
            latest_articles_count: default_latest_articles_count(),
            page_size: default_page_size(),
        }
    }
}

fn default_similar_articles_limit() -> usize {
    5
}

fn default_latest_articles_count() -> usize {
    5
}

fn default_page_size() -> u32 {
    10
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        // Empty file means defaults
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - NINJA_BLOG_SERVER_HOST
    /// - NINJA_BLOG_SERVER_PORT
    /// - NINJA_BLOG_SERVER_CORS_ORIGIN
    /// - NINJA_BLOG_DATABASE_DRIVER
    /// - NINJA_BLOG_DATABASE_URL
    /// - NINJA_BLOG_BLOG_SIMILAR_ARTICLES_LIMIT
    /// - NINJA_BLOG_BLOG_LATEST_ARTICLES_COUNT
    /// - NINJA_BLOG_BLOG_PAGE_SIZE
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("NINJA_BLOG_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("NINJA_BLOG_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("NINJA_BLOG_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(driver) = std::env::var("NINJA_BLOG_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("NINJA_BLOG_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(limit) = std::env::var("NINJA_BLOG_BLOG_SIMILAR_ARTICLES_LIMIT") {
            if let Ok(limit) = limit.parse::<usize>() {
                self.blog.similar_articles_limit = limit;
            }
        }
        if let Ok(count) = std::env::var("NINJA_BLOG_BLOG_LATEST_ARTICLES_COUNT") {
            if let Ok(count) = count.parse::<usize>() {
                self.blog.latest_articles_count = count;
            }
        }
        if let Ok(size) = std::env::var("NINJA_BLOG_BLOG_PAGE_SIZE") {
            if let Ok(size) = size.parse::<u32>() {
                self.blog.page_size = size;
            }
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Tests that touch process environment variables share this lock.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
