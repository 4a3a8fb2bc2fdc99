// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ingestion service configuration
//!
//! Loaded from YAML; every section and field is optional and falls back to
//! the defaults below.
//!
//! ```yaml
//! intake:
//!   queue_capacity: 1000
//!   max_payload_chars: 1024
//! flush:
//!   workers: 32
//!   bulk_size: 64
//!   flush_interval_secs: 0.25
//!   idle_interval_ms: 100
//! bus:
//!   host: "127.0.0.1"
//!   port: 1883
//!   topics: ["iot/testing"]
//! store:
//!   uri: "telemetry.db"
//!   database: "admin"
//!   collection: "data"
//! ```

use crate::front_door::DEFAULT_MAX_PAYLOAD_CHARS;
use crate::worker::FlushSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Ingestion service configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub intake: IntakeConfig,
    pub flush: FlushConfig,
    pub bus: BusConfig,
    pub store: StoreConfig,
}

/// Front door and intake queue settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// Intake queue capacity (records)
    pub queue_capacity: usize,
    /// Payloads longer than this many characters are dropped unparsed
    pub max_payload_chars: usize,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
            max_payload_chars: DEFAULT_MAX_PAYLOAD_CHARS,
        }
    }
}

/// Flush engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlushConfig {
    /// Number of flush workers (one store session each)
    pub workers: usize,
    /// Records per bulk write
    pub bulk_size: usize,
    /// Maximum seconds between flushes of a non-empty buffer
    pub flush_interval_secs: f64,
    /// Worker sleep between loop iterations, in milliseconds
    pub idle_interval_ms: u64,
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self {
            workers: 32,
            bulk_size: 64,
            flush_interval_secs: 0.25,
            idle_interval_ms: 100,
        }
    }
}

/// Message bus settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub host: String,
    pub port: u16,
    /// Subscribed topic filters (`+` and `#` wildcards)
    pub topics: Vec<String>,
    /// Topic assigned to messages that arrive without one
    pub default_topic: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 1883,
            topics: vec!["iot/testing".to_string()],
            default_topic: "iot/testing".to_string(),
        }
    }
}

impl BusConfig {
    /// `host:port` bind address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Document store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Connection string (SQLite database path)
    pub uri: String,
    pub database: String,
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: "telemetry.db".to_string(),
            database: "admin".to_string(),
            collection: "data".to_string(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Parse configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Check the values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.intake.queue_capacity == 0 {
            return Err(ConfigError::Invalid("intake.queue_capacity must be > 0".into()));
        }
        if self.intake.max_payload_chars == 0 {
            return Err(ConfigError::Invalid("intake.max_payload_chars must be > 0".into()));
        }
        if self.flush.workers == 0 {
            return Err(ConfigError::Invalid("flush.workers must be > 0".into()));
        }
        if self.flush.bulk_size == 0 {
            return Err(ConfigError::Invalid("flush.bulk_size must be > 0".into()));
        }
        let interval = self.flush.flush_interval_secs;
        if !interval.is_finite() || interval <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "flush.flush_interval_secs must be a positive number, got {}",
                interval
            )));
        }
        Ok(())
    }

    /// Worker tuning derived from the `flush` section.
    pub fn flush_settings(&self) -> Result<FlushSettings, ConfigError> {
        let flush_interval = Duration::try_from_secs_f64(self.flush.flush_interval_secs)
            .map_err(|e| ConfigError::Invalid(format!("flush.flush_interval_secs: {}", e)))?;

        Ok(FlushSettings {
            bulk_size: self.flush.bulk_size,
            flush_interval,
            idle_interval: Duration::from_millis(self.flush.idle_interval_ms),
        })
    }
}

/// Config builder for fluent API
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    queue_capacity: Option<usize>,
    max_payload_chars: Option<usize>,
    workers: Option<usize>,
    bulk_size: Option<usize>,
    flush_interval: Option<Duration>,
    idle_interval: Option<Duration>,
    bus_host: Option<String>,
    bus_port: Option<u16>,
    topics: Option<Vec<String>>,
    store_uri: Option<String>,
    database: Option<String>,
    collection: Option<String>,
}

impl ConfigBuilder {
    /// Set intake queue capacity
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// Set payload size guard (characters)
    pub fn max_payload_chars(mut self, chars: usize) -> Self {
        self.max_payload_chars = Some(chars);
        self
    }

    /// Set number of flush workers
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Set records per bulk write
    pub fn bulk_size(mut self, size: usize) -> Self {
        self.bulk_size = Some(size);
        self
    }

    /// Set maximum time between flushes
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = Some(interval);
        self
    }

    /// Set worker idle sleep
    pub fn idle_interval(mut self, interval: Duration) -> Self {
        self.idle_interval = Some(interval);
        self
    }

    /// Set bus host
    pub fn bus_host(mut self, host: impl Into<String>) -> Self {
        self.bus_host = Some(host.into());
        self
    }

    /// Set bus port
    pub fn bus_port(mut self, port: u16) -> Self {
        self.bus_port = Some(port);
        self
    }

    /// Set subscribed topics
    pub fn topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = Some(topics.into_iter().map(Into::into).collect());
        self
    }

    /// Set store connection string
    pub fn store_uri(mut self, uri: impl Into<String>) -> Self {
        self.store_uri = Some(uri.into());
        self
    }

    /// Set database name
    pub fn database(mut self, name: impl Into<String>) -> Self {
        self.database = Some(name.into());
        self
    }

    /// Set collection name
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.collection = Some(name.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> Config {
        let defaults = Config::default();

        Config {
            intake: IntakeConfig {
                queue_capacity: self
                    .queue_capacity
                    .unwrap_or(defaults.intake.queue_capacity),
                max_payload_chars: self
                    .max_payload_chars
                    .unwrap_or(defaults.intake.max_payload_chars),
            },
            flush: FlushConfig {
                workers: self.workers.unwrap_or(defaults.flush.workers),
                bulk_size: self.bulk_size.unwrap_or(defaults.flush.bulk_size),
                flush_interval_secs: self
                    .flush_interval
                    .map(|d| d.as_secs_f64())
                    .unwrap_or(defaults.flush.flush_interval_secs),
                idle_interval_ms: self
                    .idle_interval
                    .map(|d| d.as_millis() as u64)
                    .unwrap_or(defaults.flush.idle_interval_ms),
            },
            bus: BusConfig {
                host: self.bus_host.unwrap_or(defaults.bus.host),
                port: self.bus_port.unwrap_or(defaults.bus.port),
                topics: self.topics.unwrap_or(defaults.bus.topics),
                default_topic: defaults.bus.default_topic,
            },
            store: StoreConfig {
                uri: self.store_uri.unwrap_or(defaults.store.uri),
                database: self.database.unwrap_or(defaults.store.database),
                collection: self.collection.unwrap_or(defaults.store.collection),
            },
        }
    }
}
