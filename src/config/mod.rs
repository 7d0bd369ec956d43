//! Configuration management
//!
//! This module handles loading and parsing configuration for Listora.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Canonical site URL used when nothing else is configured
pub const FALLBACK_SITE_URL: &str = "http://localhost:3000";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Public site configuration (canonical URL, robots, sitemaps)
    #[serde(default)]
    pub site: SiteConfig,
    /// Upload configuration
    #[serde(default)]
    pub upload: UploadConfig,
    /// Reference data seeding
    #[serde(default)]
    pub seed: SeedConfig,
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
    /// CORS allowed origin (for cookie-based auth)
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
    8080
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
    "data/listora.db".to_string()
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

/// Cache configuration
///
/// Cached sitemap data is invalidated by tag, never by age, so only the
/// capacity is configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached entries
    #[serde(default = "default_cache_capacity")]
    pub capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
        }
    }
}

fn default_cache_capacity() -> u64 {
    10_000
}

/// Public site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Canonical base URL. Overridden by `NEXT_PUBLIC_SERVER_URL` and
    /// `VERCEL_PROJECT_PRODUCTION_URL`.
    #[serde(default)]
    pub url: Option<String>,
    /// Paths listed as `Disallow` in robots.txt
    #[serde(default = "default_excluded_paths")]
    pub excluded_paths: Vec<String>,
    /// Extra sitemaps listed in robots.txt and the sitemap index
    #[serde(default)]
    pub additional_sitemaps: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            url: None,
            excluded_paths: default_excluded_paths(),
            additional_sitemaps: Vec::new(),
        }
    }
}

fn default_excluded_paths() -> Vec<String> {
    vec!["/admin".to_string(), "/api".to_string()]
}

impl SiteConfig {
    /// Canonical base URL without a trailing slash
    pub fn base_url(&self) -> String {
        resolve_site_url(None, None, self.url.as_deref())
    }
}

/// Resolve the canonical site URL.
///
/// Precedence: explicit server URL, then the production deployment host
/// (which carries no scheme), then the configured value, then
/// [`FALLBACK_SITE_URL`]. Blank values are skipped.
pub fn resolve_site_url(
    server_url: Option<&str>,
    production_host: Option<&str>,
    configured: Option<&str>,
) -> String {
    fn non_blank(v: Option<&str>) -> Option<&str> {
        v.map(str::trim).filter(|s| !s.is_empty())
    }

    let url = if let Some(url) = non_blank(server_url) {
        url.to_string()
    } else if let Some(host) = non_blank(production_host) {
        format!("https://{}", host)
    } else if let Some(url) = non_blank(configured) {
        url.to_string()
    } else {
        FALLBACK_SITE_URL.to_string()
    };

    url.trim_end_matches('/').to_string()
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Upload directory path
    #[serde(default = "default_upload_path")]
    pub path: PathBuf,
    /// Maximum file size in bytes (default: 10MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Allowed MIME types
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: default_upload_path(),
            max_file_size: default_max_file_size(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_upload_path() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/gif".to_string(),
        "image/webp".to_string(),
        "image/svg+xml".to_string(),
        "application/pdf".to_string(),
    ]
}

impl UploadConfig {
    /// Check if a MIME type is allowed
    pub fn is_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_types.iter().any(|t| t == mime_type)
    }

    /// Get file extension for a MIME type
    pub fn get_extension(&self, mime_type: &str) -> &'static str {
        match mime_type {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/svg+xml" => "svg",
            "application/pdf" => "pdf",
            _ => "bin",
        }
    }
}

/// Seed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    /// Seed reference data when the server starts
    #[serde(default = "default_seed_on_startup")]
    pub on_startup: bool,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            on_startup: default_seed_on_startup(),
        }
    }
}

fn default_seed_on_startup() -> bool {
    true
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
    ParseError { path: String, message: String },
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

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: format_yaml_error(&e),
        })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - LISTORA_SERVER_HOST
    /// - LISTORA_SERVER_PORT
    /// - LISTORA_SERVER_CORS_ORIGIN
    /// - LISTORA_DATABASE_DRIVER
    /// - LISTORA_DATABASE_URL
    /// - LISTORA_CACHE_CAPACITY
    /// - LISTORA_UPLOAD_PATH
    /// - LISTORA_SEED_ON_STARTUP
    ///
    /// The canonical site URL additionally honours `NEXT_PUBLIC_SERVER_URL`
    /// and `VERCEL_PROJECT_PRODUCTION_URL`.
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("LISTORA_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("LISTORA_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("LISTORA_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(driver) = std::env::var("LISTORA_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("LISTORA_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(capacity) = std::env::var("LISTORA_CACHE_CAPACITY") {
            if let Ok(capacity) = capacity.parse::<u64>() {
                self.cache.capacity = capacity;
            }
        }

        if let Ok(path) = std::env::var("LISTORA_UPLOAD_PATH") {
            self.upload.path = PathBuf::from(path);
        }

        if let Ok(flag) = std::env::var("LISTORA_SEED_ON_STARTUP") {
            if let Ok(flag) = flag.parse::<bool>() {
                self.seed.on_startup = flag;
            }
        }

        let server_url = std::env::var("NEXT_PUBLIC_SERVER_URL").ok();
        let production_host = std::env::var("VERCEL_PROJECT_PRODUCTION_URL").ok();
        if server_url.is_some() || production_host.is_some() {
            self.site.url = Some(resolve_site_url(
                server_url.as_deref(),
                production_host.as_deref(),
                self.site.url.as_deref(),
            ));
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

#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
