//! Redis store backend.
//!
//! [`RedisBackend`] implements [`StoreBackend`] with one Redis command per
//! trait method over a [`MultiplexedConnection`]. It connects either to a
//! standalone node by URL or to the current master of a sentinel-managed
//! cluster.
//!
//! # Sentinel
//!
//! [`RedisBackend::from_sentinel`] builds a [`SentinelClient`] for the
//! configured master. The sentinel address usually fronts several sentinel
//! pods, so it is listed a few times and each entry is tried in turn. When a
//! command fails with `READONLY` or a connection error, the master is looked
//! up again through sentinel and the command is retried once on the new
//! connection. A standalone backend never reconnects.
//!
//! # Usage
//!
//! ```rust,no_run
//! use routegate::store::redis::RedisBackend;
//! use routegate::store::JobStore;
//!
//! # async fn example() -> Result<(), routegate::StoreError> {
//! let backend = RedisBackend::new("redis://127.0.0.1:6379").await?;
//! let store = JobStore::new(backend);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use ::redis::aio::MultiplexedConnection;
use ::redis::sentinel::{SentinelClient, SentinelServerType};
use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::config::SentinelConfig;
use crate::store::backend::{ScoreBound, ScoreRange, ScoredMember, StoreBackend, StoreError};

/// Times the sentinel address is listed, so a lookup tries that many pods.
const SENTINEL_ATTEMPTS: usize = 6;

/// Redis store backend.
///
/// `MultiplexedConnection` is cheap to clone; each call clones the current
/// one so concurrent requests share one TCP connection.
#[derive(Clone)]
pub struct RedisBackend {
    conn: Arc<RwLock<MultiplexedConnection>>,
    sentinel: Option<Arc<SentinelLink>>,
    key_prefix: String,
}

/// Sentinel client kept for re-resolving the master.
struct SentinelLink {
    client: Mutex<SentinelClient>,
    master_name: String,
}

impl fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisBackend")
            .field(
                "sentinel_master",
                &self.sentinel.as_ref().map(|link| link.master_name.as_str()),
            )
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

impl RedisBackend {
    /// Connects to the node at `url` and pings it.
    ///
    /// The URL format is `redis://[:<password>@]<host>:<port>[/<db>]`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the client cannot be created, the
    /// connection cannot be established, or the ping fails.
    pub async fn new(url: &str) -> Result<Self, StoreError> {
        let conn = connect(url).await?;
        Ok(Self::with_connection(conn))
    }

    /// Connects to the master currently reported by sentinel.
    ///
    /// The backend keeps the sentinel client and follows later master
    /// changes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if no sentinel yields a reachable
    /// master.
    pub async fn from_sentinel(config: &SentinelConfig) -> Result<Self, StoreError> {
        let sentinel_url = format!("redis://{}", config.address());
        let mut client = SentinelClient::build(
            vec![sentinel_url.clone(); SENTINEL_ATTEMPTS],
            config.master_name.clone(),
            None,
            SentinelServerType::Master,
        )
        .map_err(|e| StoreError::Backend {
            message: format!("failed to create sentinel client for {sentinel_url}: {e}"),
            source: Some(Box::new(e)),
        })?;
        let conn = master_connection(&mut client, &config.master_name).await?;
        tracing::info!(
            sentinel = %sentinel_url,
            master = %config.master_name,
            "connected to redis master"
        );
        Ok(Self {
            conn: Arc::new(RwLock::new(conn)),
            sentinel: Some(Arc::new(SentinelLink {
                client: Mutex::new(client),
                master_name: config.master_name.clone(),
            })),
            key_prefix: String::new(),
        })
    }

    /// Wraps an existing connection.
    pub fn with_connection(conn: MultiplexedConnection) -> Self {
        Self {
            conn: Arc::new(RwLock::new(conn)),
            sentinel: None,
            key_prefix: String::new(),
        }
    }

    /// Prefixes every key with `{prefix}:`.
    ///
    /// Used for test isolation; production keys are unprefixed.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    fn key(&self, key: &str) -> String {
        if self.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.key_prefix, key)
        }
    }

    async fn query<T: ::redis::FromRedisValue>(
        &self,
        cmd: &::redis::Cmd,
        key: &str,
    ) -> Result<T, StoreError> {
        let mut conn = self.conn.read().await.clone();
        match cmd.query_async(&mut conn).await {
            Ok(value) => Ok(value),
            Err(err) if self.sentinel.is_some() && master_moved(&err) => {
                tracing::warn!(key, error = %err, "redis master unavailable, asking sentinel");
                let mut conn = self.reconnect().await?;
                cmd.query_async(&mut conn)
                    .await
                    .map_err(|e| map_redis_error(e, key))
            },
            Err(err) => Err(map_redis_error(err, key)),
        }
    }

    /// Looks the master up again and swaps in a connection to it.
    async fn reconnect(&self) -> Result<MultiplexedConnection, StoreError> {
        let Some(link) = &self.sentinel else {
            return Ok(self.conn.read().await.clone());
        };
        let mut client = link.client.lock().await;
        let conn = master_connection(&mut client, &link.master_name).await?;
        *self.conn.write().await = conn.clone();
        tracing::info!(master = %link.master_name, "reconnected to redis master");
        Ok(conn)
    }
}

/// Errors after which the current master may have changed.
fn master_moved(err: &::redis::RedisError) -> bool {
    err.code() == Some("READONLY")
        || err.is_io_error()
        || err.is_connection_dropped()
        || err.is_connection_refusal()
}

async fn connect(url: &str) -> Result<MultiplexedConnection, StoreError> {
    let client = ::redis::Client::open(url).map_err(|e| StoreError::Backend {
        message: format!("failed to create Redis client: {e}"),
        source: Some(Box::new(e)),
    })?;
    let mut conn = client
        .get_multiplexed_async_connection()
        .await
        .map_err(|e| StoreError::Backend {
            message: format!("failed to connect to Redis at {url}: {e}"),
            source: Some(Box::new(e)),
        })?;
    ping(&mut conn, url).await?;
    Ok(conn)
}

async fn master_connection(
    client: &mut SentinelClient,
    master_name: &str,
) -> Result<MultiplexedConnection, StoreError> {
    let mut conn = client
        .get_async_connection()
        .await
        .map_err(|e| StoreError::Backend {
            message: format!("sentinel could not resolve {master_name}: {e}"),
            source: Some(Box::new(e)),
        })?;
    ping(&mut conn, master_name).await?;
    Ok(conn)
}

async fn ping(conn: &mut MultiplexedConnection, target: &str) -> Result<(), StoreError> {
    let _: String = ::redis::cmd("PING")
        .query_async(conn)
        .await
        .map_err(|e| StoreError::Backend {
            message: format!("Redis at {target} did not answer PING: {e}"),
            source: Some(Box::new(e)),
        })?;
    Ok(())
}

/// Maps a Redis error to a [`StoreError::Backend`].
fn map_redis_error(err: ::redis::RedisError, key: &str) -> StoreError {
    StoreError::Backend {
        message: format!("Redis error for key {key}: {err}"),
        source: Some(Box::new(err)),
    }
}

fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl StoreBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<String, StoreError> {
        let mut cmd = ::redis::cmd("GET");
        cmd.arg(self.key(key));
        let value: Option<String> = self.query(&cmd, key).await?;
        value.ok_or_else(|| StoreError::NotFound {
            key: key.to_string(),
        })
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let mut cmd = ::redis::cmd("SET");
        cmd.arg(self.key(key)).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl_millis(ttl));
        }
        let _: String = self.query(&cmd, key).await?;
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        let mut cmd = ::redis::cmd("SET");
        cmd.arg(self.key(key)).arg(value).arg("NX");
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl_millis(ttl));
        }
        let reply: Option<String> = self.query(&cmd, key).await?;
        Ok(reply.is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut cmd = ::redis::cmd("EXISTS");
        cmd.arg(self.key(key));
        let count: u64 = self.query(&cmd, key).await?;
        Ok(count > 0)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut cmd = ::redis::cmd("PEXPIRE");
        cmd.arg(self.key(key)).arg(ttl_millis(ttl));
        let applied: u64 = self.query(&cmd, key).await?;
        Ok(applied == 1)
    }

    async fn del(&self, key: &str) -> Result<u64, StoreError> {
        let mut cmd = ::redis::cmd("DEL");
        cmd.arg(self.key(key));
        self.query(&cmd, key).await
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        let mut cmd = ::redis::cmd("HGETALL");
        cmd.arg(self.key(key));
        let fields: HashMap<String, String> = self.query(&cmd, key).await?;
        if fields.is_empty() {
            return Err(StoreError::NotFound {
                key: key.to_string(),
            });
        }
        Ok(fields)
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let mut cmd = ::redis::cmd("HSET");
        cmd.arg(self.key(key)).arg(field).arg(value);
        let _: u64 = self.query(&cmd, key).await?;
        Ok(())
    }

    async fn hash_del(&self, key: &str, fields: &[&str]) -> Result<u64, StoreError> {
        if fields.is_empty() {
            return Ok(0);
        }
        let mut cmd = ::redis::cmd("HDEL");
        cmd.arg(self.key(key));
        for field in fields {
            cmd.arg(*field);
        }
        self.query(&cmd, key).await
    }

    async fn zadd(&self, key: &str, members: &[ScoredMember]) -> Result<u64, StoreError> {
        if members.is_empty() {
            return Ok(0);
        }
        let mut cmd = ::redis::cmd("ZADD");
        cmd.arg(self.key(key));
        for m in members {
            cmd.arg(m.score).arg(&m.member);
        }
        self.query(&cmd, key).await
    }

    async fn zrem(&self, key: &str, members: &[&str]) -> Result<u64, StoreError> {
        if members.is_empty() {
            return Ok(0);
        }
        let mut cmd = ::redis::cmd("ZREM");
        cmd.arg(self.key(key));
        for member in members {
            cmd.arg(*member);
        }
        self.query(&cmd, key).await
    }

    async fn zrem_range_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<u64, StoreError> {
        let mut cmd = ::redis::cmd("ZREMRANGEBYSCORE");
        cmd.arg(self.key(key))
            .arg(min.to_string())
            .arg(max.to_string());
        self.query(&cmd, key).await
    }

    async fn zrange_by_score(
        &self,
        key: &str,
        range: &ScoreRange,
    ) -> Result<Vec<String>, StoreError> {
        let mut cmd = ::redis::cmd("ZRANGEBYSCORE");
        cmd.arg(self.key(key))
            .arg(range.min.to_string())
            .arg(range.max.to_string());
        if let Some((offset, count)) = range.limit {
            cmd.arg("LIMIT").arg(offset).arg(count);
        }
        self.query(&cmd, key).await
    }

    async fn zrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, StoreError> {
        let mut cmd = ::redis::cmd("ZRANGE");
        cmd.arg(self.key(key)).arg(start).arg(stop);
        self.query(&cmd, key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropped_connection_triggers_master_lookup() {
        let err = ::redis::RedisError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        ));
        assert!(master_moved(&err));
    }
}
