use std::env;
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub streaming: StreamingConfig,
    pub storage: StorageConfig,
    pub rate_limit: RateLimitConfig,
    pub notifications: NotificationsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origin for the web frontend.
    pub frontend_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamingConfig {
    /// Playback URL stamped onto newly created streams.
    pub playback_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum StorageBackend {
    Fs,
    Http,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Root directory for the filesystem object store.
    pub fs_root: String,
    /// Base endpoint (bucket URL) for the HTTP object store. Objects are PUT to `{endpoint}/{key}`.
    pub http_endpoint: Option<String>,
    /// Optional bearer token sent with HTTP object store uploads.
    pub http_token: Option<String>,
    /// Public URL prefix under which stored objects are served (CDN domain).
    pub cdn_base_url: String,
    /// Maximum accepted size for uploaded files.
    pub upload_max_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Allowed requests per second (per IP) for the /api surface
    pub api_per_second: u32,
    /// Burst size for the /api surface
    pub api_burst: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    /// How long a created help request stays in the registry.
    pub help_request_ttl_seconds: u64,
    /// How long a stream stays in the "already notified" set after being reported live.
    pub live_notified_ttl_seconds: u64,
}

impl NotificationsConfig {
    pub fn help_request_ttl(&self) -> Duration {
        Duration::from_secs(self.help_request_ttl_seconds)
    }

    pub fn live_notified_ttl(&self) -> Duration {
        Duration::from_secs(self.live_notified_ttl_seconds)
    }
}

/// Unset falls back to `default`; a value that is set but unrecognized is an error.
fn env_flag(name: &str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(v) => match v.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            _ => Err(ConfigError::InvalidValue(name.to_string())),
        },
        Err(_) => Ok(default),
    }
}

/// Unset falls back to `default`; a value that is set but does not parse is an error.
fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(v) => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let backend = match env::var("STORAGE_BACKEND") {
            Ok(v) => match v.to_lowercase().as_str() {
                "fs" | "file" | "local" => StorageBackend::Fs,
                "http" | "s3" => StorageBackend::Http,
                _ => return Err(ConfigError::InvalidValue("STORAGE_BACKEND".to_string())),
            },
            Err(_) => StorageBackend::Fs,
        };
        let http_endpoint = env::var("STORAGE_HTTP_ENDPOINT").ok();
        if backend == StorageBackend::Http && http_endpoint.is_none() {
            return Err(ConfigError::MissingEnv("STORAGE_HTTP_ENDPOINT".to_string()));
        }

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or(defaults.server.host),
                port: env_parse("PORT", defaults.server.port)?,
                frontend_url: env::var("FRONTEND_URL").unwrap_or(defaults.server.frontend_url),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or(defaults.database.url),
                max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 5)?,
            },
            streaming: StreamingConfig {
                playback_url: env::var("PLAYBACK_URL").unwrap_or(defaults.streaming.playback_url),
            },
            storage: StorageConfig {
                backend,
                fs_root: env::var("STORAGE_FS_ROOT").unwrap_or(defaults.storage.fs_root),
                http_endpoint,
                http_token: env::var("STORAGE_HTTP_TOKEN").ok(),
                cdn_base_url: env::var("CDN_BASE_URL").unwrap_or(defaults.storage.cdn_base_url),
                upload_max_bytes: env_parse("UPLOAD_MAX_BYTES", 5 * 1024 * 1024)?,
            },
            rate_limit: RateLimitConfig {
                api_per_second: env_parse("RATE_LIMIT_API_PER_SECOND", 5)?,
                api_burst: env_parse("RATE_LIMIT_API_BURST", 20)?,
            },
            notifications: NotificationsConfig {
                help_request_ttl_seconds: env_parse("HELP_REQUEST_TTL_SECONDS", 300u64)?,
                live_notified_ttl_seconds: env_parse("LIVE_NOTIFIED_TTL_SECONDS", 300u64)?,
            },
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                frontend_url: "http://localhost:3000".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://data/app.db".to_string(),
                max_connections: 5,
            },
            streaming: StreamingConfig {
                playback_url: "https://placeholder.m3u8".to_string(),
            },
            storage: StorageConfig {
                backend: StorageBackend::Fs,
                fs_root: "data/uploads".to_string(),
                http_endpoint: None,
                http_token: None,
                cdn_base_url: "http://localhost:8080/uploads".to_string(),
                upload_max_bytes: 5 * 1024 * 1024,
            },
            rate_limit: RateLimitConfig {
                api_per_second: 5,
                api_burst: 20,
            },
            notifications: NotificationsConfig {
                help_request_ttl_seconds: 300,
                live_notified_ttl_seconds: 300,
            },
        }
    }
}

// ============================================================================
// Watcher (notify-watch binary)
// ============================================================================

#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Base URL of the API, e.g. `http://localhost:8080/api`
    pub api_base_url: String,
    /// When set, help requests are polled for this expert only.
    pub expert_email: Option<String>,
    pub live: WidgetConfig,
    pub help: WidgetConfig,
    /// Write each alert sound to this WAV file instead of ringing the terminal bell.
    pub sound_file: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetConfig {
    pub enabled: bool,
    pub poll_interval: Duration,
    pub dismiss_after: Duration,
}

impl WidgetConfig {
    pub fn live_stream() -> Self {
        Self {
            enabled: true,
            poll_interval: Duration::from_secs(30),
            dismiss_after: Duration::from_secs(10),
        }
    }

    pub fn help_request() -> Self {
        Self {
            enabled: true,
            poll_interval: Duration::from_secs(15),
            dismiss_after: Duration::from_secs(20),
        }
    }
}

impl WatcherConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let api_base_url = env::var("NOTIFY_API_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8080/api".to_string());
        url::Url::parse(&api_base_url)
            .map_err(|_| ConfigError::InvalidValue("NOTIFY_API_BASE_URL".to_string()))?;

        let live_defaults = WidgetConfig::live_stream();
        let help_defaults = WidgetConfig::help_request();

        Ok(WatcherConfig {
            api_base_url,
            expert_email: env::var("NOTIFY_EXPERT_EMAIL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            live: WidgetConfig {
                enabled: env_flag("NOTIFY_LIVE_ENABLED", true)?,
                poll_interval: Duration::from_secs(env_parse(
                    "NOTIFY_LIVE_POLL_SECONDS",
                    live_defaults.poll_interval.as_secs(),
                )?),
                dismiss_after: Duration::from_secs(env_parse(
                    "NOTIFY_LIVE_DISMISS_SECONDS",
                    live_defaults.dismiss_after.as_secs(),
                )?),
            },
            help: WidgetConfig {
                enabled: env_flag("NOTIFY_HELP_ENABLED", true)?,
                poll_interval: Duration::from_secs(env_parse(
                    "NOTIFY_HELP_POLL_SECONDS",
                    help_defaults.poll_interval.as_secs(),
                )?),
                dismiss_after: Duration::from_secs(env_parse(
                    "NOTIFY_HELP_DISMISS_SECONDS",
                    help_defaults.dismiss_after.as_secs(),
                )?),
            },
            sound_file: env::var("NOTIFY_SOUND_FILE").ok(),
        })
    }
}
