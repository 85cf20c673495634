//! Configuration management
//!
//! Everything is loadable from environment variables with documented
//! defaults, suitable for local development against a MinIO + Redis + Kafka
//! stack without any configuration at all.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Server defaults
// ============================================================================

/// Default REST bind host.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default REST bind port.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default graceful-shutdown grace period in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Feed defaults
// ============================================================================

/// Default manifest endpoint: the GDELT v2 translation last-update listing.
pub const DEFAULT_MANIFEST_URL: &str =
    "http://data.gdeltproject.org/gdeltv2/lastupdate-translation.txt";

/// Default coordinator tick period in seconds.
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 60;

/// Default retry-sweep period in seconds.
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 300;

/// Default TTL for committed archive hashes (7 days).
pub const DEFAULT_HASH_TTL_SECS: u64 = 7 * 24 * 3600;

/// Default TTL for send-status records (1 hour).
pub const DEFAULT_STATUS_TTL_SECS: u64 = 3600;

/// Default connect/read timeout for outbound HTTP in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;

/// Default manifest retry backoff start, cap, and attempt budget.
pub const DEFAULT_RETRY_PERIOD_MS: u64 = 1000;
pub const DEFAULT_RETRY_MAX_PERIOD_MS: u64 = 5000;
pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;

// ============================================================================
// Backend defaults
// ============================================================================

/// Default Redis connection URL.
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Default Kafka broker list.
pub const DEFAULT_KAFKA_BOOTSTRAP_SERVERS: &str = "localhost:9092";

/// Default topic for translation event (export) archives.
pub const DEFAULT_TOPIC_TRANSLATION_EXPORT: &str = "collector-event";

/// Default topic for translation mention archives.
pub const DEFAULT_TOPIC_TRANSLATION_MENTIONS: &str = "collector-mention";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub manifest: ManifestConfig,
    pub ingest: IngestConfig,
    pub redis: RedisConfig,
    pub kafka: KafkaConfig,
}

/// REST control-surface configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// Manifest endpoint and outbound HTTP policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestConfig {
    pub url: String,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub retry: HttpRetryConfig,
}

/// Retry policy for manifest fetches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpRetryConfig {
    /// Initial wait between attempts, in milliseconds.
    pub period_ms: u64,
    /// Cap on the wait between attempts, in milliseconds.
    pub max_period_ms: u64,
    pub max_attempts: u32,
}

/// Archive ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Scratch area for downloaded archives and per-archive extraction dirs.
    pub download_dir: PathBuf,
    pub check_interval_secs: u64,
    pub retry_interval_secs: u64,
}

/// Key-value store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    pub hash_ttl_secs: u64,
    pub status_ttl_secs: u64,
}

/// Message bus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaConfig {
    pub bootstrap_servers: String,
    pub translation_export_topic: String,
    pub translation_mentions_topic: String,
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Load configuration from the environment (and `.env`, if present).
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: env_string("COLLECTOR_HOST", DEFAULT_SERVER_HOST),
                port: env_parsed("COLLECTOR_PORT", DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: env_parsed(
                    "COLLECTOR_SHUTDOWN_TIMEOUT",
                    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                ),
            },
            manifest: ManifestConfig {
                url: env_string("GDELT_MANIFEST_URL", DEFAULT_MANIFEST_URL),
                connect_timeout_secs: env_parsed(
                    "HTTP_CONNECT_TIMEOUT_SECS",
                    DEFAULT_HTTP_TIMEOUT_SECS,
                ),
                read_timeout_secs: env_parsed("HTTP_READ_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS),
                retry: HttpRetryConfig {
                    period_ms: env_parsed("MANIFEST_RETRY_PERIOD_MS", DEFAULT_RETRY_PERIOD_MS),
                    max_period_ms: env_parsed(
                        "MANIFEST_RETRY_MAX_PERIOD_MS",
                        DEFAULT_RETRY_MAX_PERIOD_MS,
                    ),
                    max_attempts: env_parsed(
                        "MANIFEST_RETRY_MAX_ATTEMPTS",
                        DEFAULT_RETRY_MAX_ATTEMPTS,
                    ),
                },
            },
            ingest: IngestConfig {
                download_dir: std::env::var("GDELT_DOWNLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| std::env::temp_dir().join("gdelt-collector")),
                check_interval_secs: env_parsed(
                    "GDELT_CHECK_INTERVAL_SECS",
                    DEFAULT_CHECK_INTERVAL_SECS,
                ),
                retry_interval_secs: env_parsed(
                    "GDELT_RETRY_INTERVAL_SECS",
                    DEFAULT_RETRY_INTERVAL_SECS,
                ),
            },
            redis: RedisConfig {
                url: env_string("REDIS_URL", DEFAULT_REDIS_URL),
                hash_ttl_secs: env_parsed("GDELT_HASH_TTL_SECS", DEFAULT_HASH_TTL_SECS),
                status_ttl_secs: env_parsed("GDELT_STATUS_TTL_SECS", DEFAULT_STATUS_TTL_SECS),
            },
            kafka: KafkaConfig {
                bootstrap_servers: env_string(
                    "KAFKA_BOOTSTRAP_SERVERS",
                    DEFAULT_KAFKA_BOOTSTRAP_SERVERS,
                ),
                translation_export_topic: env_string(
                    "KAFKA_TOPIC_TRANSLATION_EXPORT",
                    DEFAULT_TOPIC_TRANSLATION_EXPORT,
                ),
                translation_mentions_topic: env_string(
                    "KAFKA_TOPIC_TRANSLATION_MENTIONS",
                    DEFAULT_TOPIC_TRANSLATION_MENTIONS,
                ),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration consistency.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }
        if self.manifest.url.is_empty() {
            anyhow::bail!("GDELT_MANIFEST_URL cannot be empty");
        }
        if self.manifest.retry.max_attempts == 0 {
            anyhow::bail!("MANIFEST_RETRY_MAX_ATTEMPTS must be greater than 0");
        }
        if self.manifest.retry.period_ms > self.manifest.retry.max_period_ms {
            anyhow::bail!(
                "MANIFEST_RETRY_PERIOD_MS ({}) cannot be greater than MANIFEST_RETRY_MAX_PERIOD_MS ({})",
                self.manifest.retry.period_ms,
                self.manifest.retry.max_period_ms
            );
        }
        if self.ingest.check_interval_secs == 0 {
            anyhow::bail!("GDELT_CHECK_INTERVAL_SECS must be greater than 0");
        }
        if self.ingest.retry_interval_secs == 0 {
            anyhow::bail!("GDELT_RETRY_INTERVAL_SECS must be greater than 0");
        }
        if self.redis.url.is_empty() {
            anyhow::bail!("REDIS_URL cannot be empty");
        }
        if self.kafka.bootstrap_servers.is_empty() {
            anyhow::bail!("KAFKA_BOOTSTRAP_SERVERS cannot be empty");
        }
        if self.kafka.translation_export_topic.is_empty()
            || self.kafka.translation_mentions_topic.is_empty()
        {
            anyhow::bail!("Kafka topic names cannot be empty");
        }
        Ok(())
    }
}

impl ManifestConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

impl IngestConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            manifest: ManifestConfig {
                url: DEFAULT_MANIFEST_URL.to_string(),
                connect_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
                read_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
                retry: HttpRetryConfig {
                    period_ms: DEFAULT_RETRY_PERIOD_MS,
                    max_period_ms: DEFAULT_RETRY_MAX_PERIOD_MS,
                    max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
                },
            },
            ingest: IngestConfig {
                download_dir: std::env::temp_dir().join("gdelt-collector"),
                check_interval_secs: DEFAULT_CHECK_INTERVAL_SECS,
                retry_interval_secs: DEFAULT_RETRY_INTERVAL_SECS,
            },
            redis: RedisConfig {
                url: DEFAULT_REDIS_URL.to_string(),
                hash_ttl_secs: DEFAULT_HASH_TTL_SECS,
                status_ttl_secs: DEFAULT_STATUS_TTL_SECS,
            },
            kafka: KafkaConfig {
                bootstrap_servers: DEFAULT_KAFKA_BOOTSTRAP_SERVERS.to_string(),
                translation_export_topic: DEFAULT_TOPIC_TRANSLATION_EXPORT.to_string(),
                translation_mentions_topic: DEFAULT_TOPIC_TRANSLATION_MENTIONS.to_string(),
            },
        }
    }
}
