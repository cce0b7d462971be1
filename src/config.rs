//! Service configuration.
//!
//! Configuration is loaded once at startup and passed by reference to the
//! components that need it. Sources, highest priority first:
//! 1. Environment variables (with `ROUTEGATE_` prefix)
//! 2. TOML file at `CONFIG_PATH` (default `config/config.toml`)
//! 3. Default values
//!
//! # Example TOML Configuration
//!
//! ```toml
//! [routegate]
//! namespace = "Optimization"
//! job_id_prefix = "sg-"
//! cache_id = true
//! expiration_days = 7
//!
//! [routegate.store]
//! primary = "cluster"
//!
//! [[routegate.store.endpoints]]
//! name = "cluster"
//! [routegate.store.endpoints.sentinel]
//! prefix = "redis-"
//! name = "sentinel.infra.svc"
//! sentinel_port = 26379
//! master_name = "mymaster"
//!
//! [[routegate.store.endpoints]]
//! name = "standalone"
//! url = "redis://cache.infra.svc:6379"
//! ```
//!
//! The legacy shorthand `redis_host` (standalone host, port 6379) and
//! `redis_failover` (sentinel settings) is still accepted when no explicit
//! endpoint list is given.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CONFIG_PATH, DEFAULT_NAMESPACE, DEFAULT_RETENTION_DAYS, ENV_PREFIX, SECONDS_PER_DAY,
};

const DEFAULT_REDIS_PORT: u16 = 6379;
const DEFAULT_SENTINEL_PORT: u16 = 26379;

/// Top-level service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Key namespace for job records.
    pub namespace: String,

    /// Prepended to every generated job id.
    pub job_id_prefix: String,

    /// Reuse job ids for identical submissions. When `false` every
    /// submission gets a fresh id.
    pub cache_id: bool,

    /// Job record retention in days. Values `<= 0` mean the default of 7.
    pub expiration_days: i64,

    /// Legacy standalone Redis host.
    pub redis_host: Option<String>,

    /// Legacy sentinel-managed Redis cluster.
    pub redis_failover: Option<SentinelConfig>,

    /// Store endpoints.
    pub store: StoreConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            job_id_prefix: String::new(),
            cache_id: true,
            expiration_days: DEFAULT_RETENTION_DAYS as i64,
            redis_host: None,
            redis_failover: None,
            store: StoreConfig::default(),
        }
    }
}

/// Endpoint list and writable selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Name of the writable endpoint. Overrides per-endpoint `writable` flags.
    pub primary: Option<String>,

    /// Endpoints in read priority order.
    pub endpoints: Vec<EndpointConfig>,
}

/// One configured store endpoint. Exactly one of `url` or `sentinel` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub name: String,
    #[serde(default)]
    pub writable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentinel: Option<SentinelConfig>,
}

/// Sentinel discovery settings.
///
/// The sentinel address is `{prefix}{name}:{sentinel_port}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentinelConfig {
    #[serde(default)]
    pub prefix: String,
    pub name: String,
    #[serde(default = "default_sentinel_port")]
    pub sentinel_port: u16,
    pub master_name: String,
}

fn default_sentinel_port() -> u16 {
    DEFAULT_SENTINEL_PORT
}

impl SentinelConfig {
    /// Returns the `host:port` of the sentinel service.
    pub fn address(&self) -> String {
        format!("{}{}:{}", self.prefix, self.name, self.sentinel_port)
    }
}

/// Where an endpoint connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointTarget {
    /// A single node, `redis://host:port[/db]`.
    Standalone(String),
    /// The current master reported by a sentinel.
    Sentinel(SentinelConfig),
}

/// An endpoint with its target and writable flag resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    pub name: String,
    pub target: EndpointTarget,
    pub writable: bool,
}

impl ServiceConfig {
    /// Loads configuration from `CONFIG_PATH` and the environment.
    ///
    /// A missing file at the default path yields defaults; a missing file at
    /// an explicitly configured path is an error.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("CONFIG_PATH") {
            Ok(path) => Self::read_file(&path)?,
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::read_file(DEFAULT_CONFIG_PATH)?
            },
            Err(_) => Self::default(),
        };
        config.apply_env_overrides();
        tracing::info!(
            namespace = %config.namespace,
            cache_id = config.cache_id,
            expiration_days = config.expiration_days,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Loads configuration from a specific file path, then applies
    /// environment overrides.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn read_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;
        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML content (the `[routegate]` table).
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        #[derive(Deserialize)]
        struct FullConfig {
            #[serde(default)]
            routegate: ServiceConfig,
        }

        let full: FullConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(full.routegate)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `ROUTEGATE_*` overrides read through `lookup`.
    ///
    /// Unparsable values are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(namespace) = var("NAMESPACE") {
            self.namespace = namespace;
        }
        if let Some(prefix) = var("JOB_ID_PREFIX") {
            self.job_id_prefix = prefix;
        }
        if let Some(cache_id) = var("CACHE_ID") {
            match cache_id.parse() {
                Ok(v) => self.cache_id = v,
                Err(_) => tracing::warn!(value = %cache_id, "ignoring invalid ROUTEGATE_CACHE_ID"),
            }
        }
        if let Some(days) = var("EXPIRATION_DAYS") {
            match days.parse() {
                Ok(v) => self.expiration_days = v,
                Err(_) => {
                    tracing::warn!(value = %days, "ignoring invalid ROUTEGATE_EXPIRATION_DAYS");
                },
            }
        }
        if let Some(host) = var("REDIS_HOST") {
            self.redis_host = Some(host);
        }
        if let Some(primary) = var("STORE_PRIMARY") {
            self.store.primary = Some(primary);
        }
    }

    /// Record retention as a duration.
    pub fn retention(&self) -> Duration {
        let days = u64::try_from(self.expiration_days)
            .ok()
            .filter(|d| *d > 0)
            .unwrap_or(DEFAULT_RETENTION_DAYS);
        Duration::from_secs(days * SECONDS_PER_DAY)
    }

    /// Expands the endpoint configuration into the ordered endpoint list.
    ///
    /// Explicit `store.endpoints` win. Otherwise the legacy settings are used:
    /// the sentinel cluster first (named `failover`), then the standalone
    /// host (named `standalone`).
    ///
    /// The writable endpoint is the one named by `store.primary`; without it
    /// the per-endpoint flags are used; without any flag the first endpoint
    /// is writable.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] if no endpoint is configured, an endpoint has
    /// no target or both targets, `store.primary` names no endpoint, or the
    /// result does not have exactly one writable endpoint.
    pub fn resolved_endpoints(&self) -> Result<Vec<ResolvedEndpoint>, ConfigError> {
        let mut endpoints = if self.store.endpoints.is_empty() {
            self.legacy_endpoints()
        } else {
            self.store
                .endpoints
                .iter()
                .map(|e| {
                    let target = match (&e.url, &e.sentinel) {
                        (Some(url), None) => EndpointTarget::Standalone(url.clone()),
                        (None, Some(sentinel)) => EndpointTarget::Sentinel(sentinel.clone()),
                        _ => {
                            return Err(ConfigError::Invalid(format!(
                                "endpoint '{}' must set exactly one of url or sentinel",
                                e.name
                            )))
                        },
                    };
                    Ok(ResolvedEndpoint {
                        name: e.name.clone(),
                        target,
                        writable: e.writable,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        if endpoints.is_empty() {
            return Err(ConfigError::Invalid(
                "no store endpoint configured".to_string(),
            ));
        }

        if let Some(primary) = &self.store.primary {
            if !endpoints.iter().any(|e| &e.name == primary) {
                return Err(ConfigError::Invalid(format!(
                    "store.primary '{primary}' does not name a configured endpoint"
                )));
            }
            for e in &mut endpoints {
                e.writable = &e.name == primary;
            }
        } else if !endpoints.iter().any(|e| e.writable) {
            endpoints[0].writable = true;
        }

        let writable = endpoints.iter().filter(|e| e.writable).count();
        if writable != 1 {
            return Err(ConfigError::Invalid(format!(
                "exactly one writable endpoint required, found {writable}"
            )));
        }
        Ok(endpoints)
    }

    fn legacy_endpoints(&self) -> Vec<ResolvedEndpoint> {
        let mut endpoints = Vec::new();
        if let Some(sentinel) = &self.redis_failover {
            endpoints.push(ResolvedEndpoint {
                name: "failover".to_string(),
                target: EndpointTarget::Sentinel(sentinel.clone()),
                writable: false,
            });
        }
        if let Some(host) = self.redis_host.as_deref().filter(|h| !h.is_empty()) {
            endpoints.push(ResolvedEndpoint {
                name: "standalone".to_string(),
                target: EndpointTarget::Standalone(format!("redis://{host}:{DEFAULT_REDIS_PORT}")),
                writable: false,
            });
        }
        endpoints
    }

    /// Checks that the configuration can back a store client.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.is_empty() {
            return Err(ConfigError::Invalid("namespace must not be empty".to_string()));
        }
        self.resolved_endpoints().map(|_| ())
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading configuration file.
    Io {
        /// Path to the configuration file.
        path: String,
        /// Error message.
        error: String,
    },
    /// Parse error in configuration.
    Parse(String),
    /// The configuration parsed but is unusable.
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, error } => {
                write!(f, "failed to read config file '{path}': {error}")
            },
            Self::Parse(e) => write!(f, "failed to parse config: {e}"),
            Self::Invalid(e) => write!(f, "invalid config: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
