//! Multi-endpoint store client with read fallback.
//!
//! A [`StoreClient`] holds an ordered list of [`Endpoint`]s, exactly one of
//! which is writable. Writes go to the writable endpoint only. Reads try
//! every endpoint in list order and return the first success, so a replica
//! keeps serving lookups while the primary is down. If every endpoint fails,
//! the last endpoint's error is returned.
//!
//! Replicas may lag the primary; a fallback read can return stale data.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use routegate::store::client::{Endpoint, StoreClient};
//! use routegate::store::memory::InMemoryBackend;
//! use routegate::store::StoreBackend;
//!
//! # async fn example() -> Result<(), routegate::StoreError> {
//! let primary = Arc::new(InMemoryBackend::new());
//! let replica = Arc::new(InMemoryBackend::new());
//! let client = StoreClient::new(vec![
//!     Endpoint::writable("primary", primary.clone()),
//!     Endpoint::read_only("replica", replica.clone()),
//! ])?;
//!
//! replica.set("k", "from-replica", None).await?;
//! primary.set_unreachable(true);
//! assert_eq!(client.get("k").await?, "from-replica");
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::store::backend::{ScoreBound, ScoreRange, ScoredMember, StoreBackend, StoreError};

/// A named store endpoint.
#[derive(Clone)]
pub struct Endpoint {
    name: String,
    backend: Arc<dyn StoreBackend>,
    writable: bool,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, backend: Arc<dyn StoreBackend>, writable: bool) -> Self {
        Self {
            name: name.into(),
            backend,
            writable,
        }
    }

    /// The endpoint that receives writes.
    pub fn writable(name: impl Into<String>, backend: Arc<dyn StoreBackend>) -> Self {
        Self::new(name, backend, true)
    }

    /// A read replica.
    pub fn read_only(name: impl Into<String>, backend: Arc<dyn StoreBackend>) -> Self {
        Self::new(name, backend, false)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("writable", &self.writable)
            .finish_non_exhaustive()
    }
}

/// Store client routing writes to one endpoint and reads across all.
#[derive(Debug, Clone)]
pub struct StoreClient {
    endpoints: Vec<Endpoint>,
    primary: usize,
}

/// Tries `$call` on each endpoint in order, returning the first success.
macro_rules! read_fallback {
    ($self:ident, $key:expr, |$backend:ident| $call:expr) => {{
        let mut last_err = StoreError::NotFound {
            key: $key.to_string(),
        };
        for endpoint in &$self.endpoints {
            let $backend = &endpoint.backend;
            match $call.await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if err.is_not_found() {
                        tracing::debug!(endpoint = %endpoint.name, key = %$key, "key not found on endpoint");
                    } else {
                        tracing::warn!(
                            endpoint = %endpoint.name,
                            key = %$key,
                            error = %err,
                            "store read failed, trying next endpoint"
                        );
                    }
                    last_err = err;
                },
            }
        }
        Err(last_err)
    }};
}

impl StoreClient {
    /// Creates a client over `endpoints`, listed in read priority order.
    ///
    /// # Errors
    ///
    /// [`StoreError::Configuration`] if the list is empty or does not contain
    /// exactly one writable endpoint.
    pub fn new(endpoints: Vec<Endpoint>) -> Result<Self, StoreError> {
        if endpoints.is_empty() {
            return Err(StoreError::Configuration {
                message: "at least one store endpoint is required".to_string(),
            });
        }
        let writable: Vec<usize> = endpoints
            .iter()
            .enumerate()
            .filter(|(_, e)| e.writable)
            .map(|(i, _)| i)
            .collect();
        let [primary] = writable.as_slice() else {
            return Err(StoreError::Configuration {
                message: format!(
                    "exactly one writable store endpoint is required, found {}",
                    writable.len()
                ),
            });
        };
        Ok(Self {
            primary: *primary,
            endpoints,
        })
    }

    /// Connects to every endpoint in the service configuration.
    ///
    /// Each endpoint is connected and pinged up front; any failure aborts
    /// startup.
    #[cfg(feature = "redis")]
    pub async fn connect(config: &crate::config::ServiceConfig) -> Result<Self, StoreError> {
        use crate::config::EndpointTarget;
        use crate::store::redis::RedisBackend;

        let resolved = config
            .resolved_endpoints()
            .map_err(|e| StoreError::Configuration {
                message: e.to_string(),
            })?;
        let mut endpoints = Vec::with_capacity(resolved.len());
        for endpoint in resolved {
            let backend = match &endpoint.target {
                EndpointTarget::Standalone(url) => RedisBackend::new(url).await?,
                EndpointTarget::Sentinel(sentinel) => RedisBackend::from_sentinel(sentinel).await?,
            };
            tracing::info!(
                endpoint = %endpoint.name,
                writable = endpoint.writable,
                "store endpoint connected"
            );
            endpoints.push(Endpoint::new(
                endpoint.name,
                Arc::new(backend),
                endpoint.writable,
            ));
        }
        Self::new(endpoints)
    }

    /// Endpoints in read priority order.
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// The writable endpoint.
    pub fn primary(&self) -> &Endpoint {
        &self.endpoints[self.primary]
    }

    fn primary_backend(&self, op: &str, key: &str) -> &Arc<dyn StoreBackend> {
        let primary = self.primary();
        tracing::debug!(endpoint = %primary.name, op, key, "store write");
        &primary.backend
    }
}

#[async_trait]
impl StoreBackend for StoreClient {
    async fn get(&self, key: &str) -> Result<String, StoreError> {
        read_fallback!(self, key, |backend| backend.get(key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        self.primary_backend("set", key).set(key, value, ttl).await
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        self.primary_backend("set_if_absent", key)
            .set_if_absent(key, value, ttl)
            .await
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        read_fallback!(self, key, |backend| backend.exists(key))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        self.primary_backend("expire", key).expire(key, ttl).await
    }

    async fn del(&self, key: &str) -> Result<u64, StoreError> {
        self.primary_backend("del", key).del(key).await
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        read_fallback!(self, key, |backend| backend.hash_get_all(key))
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        self.primary_backend("hash_set", key)
            .hash_set(key, field, value)
            .await
    }

    async fn hash_del(&self, key: &str, fields: &[&str]) -> Result<u64, StoreError> {
        self.primary_backend("hash_del", key)
            .hash_del(key, fields)
            .await
    }

    async fn zadd(&self, key: &str, members: &[ScoredMember]) -> Result<u64, StoreError> {
        self.primary_backend("zadd", key).zadd(key, members).await
    }

    async fn zrem(&self, key: &str, members: &[&str]) -> Result<u64, StoreError> {
        self.primary_backend("zrem", key).zrem(key, members).await
    }

    async fn zrem_range_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<u64, StoreError> {
        self.primary_backend("zrem_range_by_score", key)
            .zrem_range_by_score(key, min, max)
            .await
    }

    async fn zrange_by_score(
        &self,
        key: &str,
        range: &ScoreRange,
    ) -> Result<Vec<String>, StoreError> {
        read_fallback!(self, key, |backend| backend.zrange_by_score(key, range))
    }

    async fn zrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, StoreError> {
        read_fallback!(self, key, |backend| backend.zrange(key, start, stop))
    }
}
