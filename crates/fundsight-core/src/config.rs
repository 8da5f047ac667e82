//! Configuration module for Fundsight.
//!
//! Configuration comes from a flat key-value environment map. Typed structs
//! carry the values with per-field defaults; [`Config::from_env`] reads the
//! process environment, [`Config::from_map`] takes an explicit map (used in
//! tests), and [`Config::validate`] returns every problem found rather than
//! stopping at the first.

use std::collections::HashMap;
use std::fmt;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Top-level configuration for Fundsight.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub upstream: UpstreamConfig,
    pub rate_limits: RateLimitsConfig,
    pub scheduler: SchedulerConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// MySQL connection settings.
///
/// Either `MYSQL_URL` or the individual `MYSQL_{HOST,PORT,USER,PASSWORD,DATABASE}`
/// keys; a full URL wins when both are present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Bounded connection pool size shared by the API and the pipeline.
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// The effective connection URL.
    #[must_use]
    pub fn connect_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "mysql://{}:{}@{}:{}/{}",
                self.user, self.password, self.host, self.port, self.database
            ),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "127.0.0.1".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: String::new(),
            database: "fundsight".to_string(),
            max_connections: 10,
        }
    }
}

/// Redis connection settings for the rate-limiter bucket store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
}

impl RedisConfig {
    /// The effective connection URL.
    #[must_use]
    pub fn connect_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => match &self.password {
                Some(password) => {
                    format!("redis://:{}@{}:{}/", password, self.host, self.port)
                }
                None => format!("redis://{}:{}/", self.host, self.port),
            },
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "127.0.0.1".to_string(),
            port: 6379,
            password: None,
        }
    }
}

/// Upstream NAV API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the upstream API (no trailing slash).
    pub base_url: String,
    /// HTTP client timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.mfapi.in/mf".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Parameters of a single token bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BucketSettings {
    /// Maximum tokens the bucket holds.
    pub capacity: u32,
    /// Tokens restored per interval.
    pub refill_rate: f64,
    /// Refill interval in milliseconds.
    pub interval_ms: u64,
}

/// The three upstream admission buckets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitsConfig {
    pub per_second: BucketSettings,
    pub per_minute: BucketSettings,
    pub per_hour: BucketSettings,
    /// Key prefix in the shared store, e.g. `ratelimit:mfapi`.
    pub key_prefix: String,
}

impl Default for RateLimitsConfig {
    fn default() -> Self {
        Self {
            per_second: BucketSettings {
                capacity: 2,
                refill_rate: 2.0,
                interval_ms: 1_000,
            },
            per_minute: BucketSettings {
                capacity: 50,
                refill_rate: 50.0,
                interval_ms: 60_000,
            },
            per_hour: BucketSettings {
                capacity: 300,
                refill_rate: 300.0,
                interval_ms: 3_600_000,
            },
            key_prefix: "ratelimit:mfapi".to_string(),
        }
    }
}

/// Scheduled-sync settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Cron expression for the daily incremental sync, evaluated in IST.
    pub cron: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cron: "0 6 * * *".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing directive: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

fn parse_key<T>(map: &HashMap<String, String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match map.get(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: '{raw}'")),
        None => Ok(default),
    }
}

fn string_key(map: &HashMap<String, String>, key: &str, default: &str) -> String {
    map.get(key).cloned().unwrap_or_else(|| default.to_string())
}

fn bucket_from_map(
    map: &HashMap<String, String>,
    unit: &str,
    default: BucketSettings,
) -> anyhow::Result<BucketSettings> {
    Ok(BucketSettings {
        capacity: parse_key(
            map,
            &format!("RATE_LIMIT_PER_{unit}_CAPACITY"),
            default.capacity,
        )?,
        refill_rate: parse_key(
            map,
            &format!("RATE_LIMIT_PER_{unit}_REFILL_RATE"),
            default.refill_rate,
        )?,
        interval_ms: parse_key(
            map,
            &format!("RATE_LIMIT_PER_{unit}_INTERVAL_MS"),
            default.interval_ms,
        )?,
    })
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        let map: HashMap<String, String> = std::env::vars().collect();
        Self::from_map(&map)
    }

    /// Load configuration from an explicit key-value map.
    pub fn from_map(map: &HashMap<String, String>) -> anyhow::Result<Self> {
        let defaults = Config::default();

        let database = DatabaseConfig {
            url: map.get("MYSQL_URL").cloned(),
            host: string_key(map, "MYSQL_HOST", &defaults.database.host),
            port: parse_key(map, "MYSQL_PORT", defaults.database.port)?,
            user: string_key(map, "MYSQL_USER", &defaults.database.user),
            password: string_key(map, "MYSQL_PASSWORD", &defaults.database.password),
            database: string_key(map, "MYSQL_DATABASE", &defaults.database.database),
            max_connections: parse_key(
                map,
                "MYSQL_MAX_CONNECTIONS",
                defaults.database.max_connections,
            )?,
        };

        let redis = RedisConfig {
            url: map.get("REDIS_URL").cloned(),
            host: string_key(map, "REDIS_HOST", &defaults.redis.host),
            port: parse_key(map, "REDIS_PORT", defaults.redis.port)?,
            password: map.get("REDIS_PASSWORD").cloned(),
        };

        let upstream = UpstreamConfig {
            base_url: string_key(map, "MFAPI_BASE_URL", &defaults.upstream.base_url)
                .trim_end_matches('/')
                .to_string(),
            timeout_secs: parse_key(map, "MFAPI_TIMEOUT", defaults.upstream.timeout_secs)?,
        };

        let rate_limits = RateLimitsConfig {
            per_second: bucket_from_map(map, "SECOND", defaults.rate_limits.per_second)?,
            per_minute: bucket_from_map(map, "MINUTE", defaults.rate_limits.per_minute)?,
            per_hour: bucket_from_map(map, "HOUR", defaults.rate_limits.per_hour)?,
            key_prefix: string_key(
                map,
                "RATE_LIMIT_KEY_PREFIX",
                &defaults.rate_limits.key_prefix,
            ),
        };

        let scheduler = SchedulerConfig {
            cron: string_key(map, "SYNC_CRON_SCHEDULE", &defaults.scheduler.cron),
        };

        let server = ServerConfig {
            port: parse_key(map, "PORT", defaults.server.port)?,
        };

        let logging = LoggingConfig {
            level: string_key(map, "LOG_LEVEL", &defaults.logging.level),
        };

        Ok(Self {
            database,
            redis,
            upstream,
            rate_limits,
            scheduler,
            server,
            logging,
        })
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"rate_limits.per_second.capacity"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        let mut require_nonzero = |field: &str, ok: bool| {
            if !ok {
                errors.push(ValidationError {
                    field: field.into(),
                    message: "must be greater than 0".into(),
                });
            }
        };

        require_nonzero(
            "database.max_connections",
            self.database.max_connections > 0,
        );
        require_nonzero("upstream.timeout_secs", self.upstream.timeout_secs > 0);

        for (name, bucket) in [
            ("per_second", &self.rate_limits.per_second),
            ("per_minute", &self.rate_limits.per_minute),
            ("per_hour", &self.rate_limits.per_hour),
        ] {
            require_nonzero(&format!("rate_limits.{name}.capacity"), bucket.capacity > 0);
            require_nonzero(
                &format!("rate_limits.{name}.refill_rate"),
                bucket.refill_rate > 0.0,
            );
            require_nonzero(
                &format!("rate_limits.{name}.interval_ms"),
                bucket.interval_ms > 0,
            );
        }

        if self.rate_limits.key_prefix.is_empty() {
            errors.push(ValidationError {
                field: "rate_limits.key_prefix".into(),
                message: "must not be empty".into(),
            });
        }

        if self.upstream.base_url.is_empty() {
            errors.push(ValidationError {
                field: "upstream.base_url".into(),
                message: "must not be empty".into(),
            });
        }

        if self.scheduler.cron.split_whitespace().count() < 5 {
            errors.push(ValidationError {
                field: "scheduler.cron".into(),
                message: format!(
                    "'{}' is not a cron expression (expected at least 5 fields)",
                    self.scheduler.cron
                ),
            });
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}
