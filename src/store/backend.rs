//! Low-level key-value backend trait and supporting types.
//!
//! The [`StoreBackend`] trait is the contract every store endpoint implements.
//! It mirrors the subset of Redis commands the job store needs: plain string
//! values with TTL, hashes, and sorted sets.
//!
//! Backends are dumb KV stores. Job lifecycle rules, key naming and
//! serialization live in [`JobStore`](crate::store::JobStore), and endpoint
//! routing lives in [`StoreClient`](crate::store::StoreClient).

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

/// Errors that can occur during raw store operations.
///
/// # Examples
///
/// ```
/// use routegate::store::StoreError;
///
/// let err = StoreError::NotFound { key: "Optimization_abc".to_string() };
/// assert_eq!(err.to_string(), "key not found: Optimization_abc");
/// assert!(err.is_not_found());
/// ```
#[derive(Debug)]
pub enum StoreError {
    /// The requested key does not exist (or has expired).
    NotFound {
        /// The key that was not found.
        key: String,
    },

    /// The endpoint set or connection settings are unusable.
    Configuration {
        /// Human-readable description of the problem.
        message: String,
    },

    /// A network or backend-specific failure.
    Backend {
        /// Human-readable description of the error.
        message: String,
        /// The underlying error, if available.
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StoreError {
    /// Returns `true` for [`StoreError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub(crate) fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            source: None,
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { key } => write!(f, "key not found: {key}"),
            Self::Configuration { message } => {
                write!(f, "store configuration error: {message}")
            },
            Self::Backend { message, .. } => write!(f, "backend error: {message}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Backend {
                source: Some(src), ..
            } => Some(src.as_ref()),
            _ => None,
        }
    }
}

/// One end of a sorted-set score interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreBound {
    /// Unbounded below.
    NegInf,
    /// Unbounded above.
    PosInf,
    /// Includes the score itself.
    Inclusive(f64),
    /// Excludes the score itself.
    Exclusive(f64),
}

impl ScoreBound {
    /// Returns `true` if `score` is on the allowed side of this bound when
    /// used as a minimum.
    pub fn admits_above(&self, score: f64) -> bool {
        match *self {
            Self::NegInf => true,
            Self::PosInf => false,
            Self::Inclusive(b) => score >= b,
            Self::Exclusive(b) => score > b,
        }
    }

    /// Returns `true` if `score` is on the allowed side of this bound when
    /// used as a maximum.
    pub fn admits_below(&self, score: f64) -> bool {
        match *self {
            Self::NegInf => false,
            Self::PosInf => true,
            Self::Inclusive(b) => score <= b,
            Self::Exclusive(b) => score < b,
        }
    }
}

/// Renders the bound in Redis range syntax (`-inf`, `+inf`, `5`, `(5`).
impl fmt::Display for ScoreBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegInf => f.write_str("-inf"),
            Self::PosInf => f.write_str("+inf"),
            Self::Inclusive(b) => write!(f, "{b}"),
            Self::Exclusive(b) => write!(f, "({b}"),
        }
    }
}

/// A score interval with optional `(offset, count)` paging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreRange {
    pub min: ScoreBound,
    pub max: ScoreBound,
    pub limit: Option<(usize, usize)>,
}

impl ScoreRange {
    /// Creates an unpaged range.
    pub fn new(min: ScoreBound, max: ScoreBound) -> Self {
        Self {
            min,
            max,
            limit: None,
        }
    }

    /// Restricts the result to `count` members starting at `offset`.
    pub fn with_limit(mut self, offset: usize, count: usize) -> Self {
        self.limit = Some((offset, count));
        self
    }

    /// Returns `true` if `score` lies inside the interval.
    pub fn contains(&self, score: f64) -> bool {
        self.min.admits_above(score) && self.max.admits_below(score)
    }
}

/// A sorted-set member with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMember {
    pub score: f64,
    pub member: String,
}

impl ScoredMember {
    pub fn new(score: f64, member: impl Into<String>) -> Self {
        Self {
            score,
            member: member.into(),
        }
    }
}

/// Key-value backend for job persistence.
///
/// Implementations must be `Send + Sync`; handlers share one backend across
/// tasks. Every method maps onto a single Redis command.
///
/// # Errors
///
/// Methods that read a single key return [`StoreError::NotFound`] when the
/// key is absent. All methods return [`StoreError::Backend`] on transport or
/// type errors.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Reads a string value (`GET`).
    async fn get(&self, key: &str) -> Result<String, StoreError>;

    /// Writes a string value, optionally with a TTL (`SET .. PX`).
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Writes a string value only if the key is absent (`SET .. NX`).
    ///
    /// Returns `true` if this call created the key.
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError>;

    /// Returns `true` if the key exists (`EXISTS`).
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Sets a key's TTL (`PEXPIRE`). Returns `false` if the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Deletes a key of any type (`DEL`). Returns the number removed.
    async fn del(&self, key: &str) -> Result<u64, StoreError>;

    /// Reads every field of a hash (`HGETALL`).
    ///
    /// Returns [`StoreError::NotFound`] when the hash does not exist.
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError>;

    /// Sets one hash field (`HSET`).
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError>;

    /// Removes hash fields (`HDEL`). Returns the number removed.
    async fn hash_del(&self, key: &str, fields: &[&str]) -> Result<u64, StoreError>;

    /// Adds or rescores sorted-set members (`ZADD`). Returns the number added.
    async fn zadd(&self, key: &str, members: &[ScoredMember]) -> Result<u64, StoreError>;

    /// Removes sorted-set members (`ZREM`). Returns the number removed.
    async fn zrem(&self, key: &str, members: &[&str]) -> Result<u64, StoreError>;

    /// Removes members scored inside `[min, max]` (`ZREMRANGEBYSCORE`).
    async fn zrem_range_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<u64, StoreError>;

    /// Lists members by score, ascending (`ZRANGEBYSCORE`).
    ///
    /// A missing key yields an empty list.
    async fn zrange_by_score(&self, key: &str, range: &ScoreRange)
        -> Result<Vec<String>, StoreError>;

    /// Lists members by rank, ascending (`ZRANGE`). Negative indexes count
    /// from the end.
    async fn zrange(&self, key: &str, start: isize, stop: isize)
        -> Result<Vec<String>, StoreError>;
}

/// Shared handles forward to the inner backend.
#[async_trait]
impl<T: StoreBackend + ?Sized> StoreBackend for std::sync::Arc<T> {
    async fn get(&self, key: &str) -> Result<String, StoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        (**self).set(key, value, ttl).await
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        (**self).set_if_absent(key, value, ttl).await
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        (**self).exists(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        (**self).expire(key, ttl).await
    }

    async fn del(&self, key: &str) -> Result<u64, StoreError> {
        (**self).del(key).await
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        (**self).hash_get_all(key).await
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        (**self).hash_set(key, field, value).await
    }

    async fn hash_del(&self, key: &str, fields: &[&str]) -> Result<u64, StoreError> {
        (**self).hash_del(key, fields).await
    }

    async fn zadd(&self, key: &str, members: &[ScoredMember]) -> Result<u64, StoreError> {
        (**self).zadd(key, members).await
    }

    async fn zrem(&self, key: &str, members: &[&str]) -> Result<u64, StoreError> {
        (**self).zrem(key, members).await
    }

    async fn zrem_range_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<u64, StoreError> {
        (**self).zrem_range_by_score(key, min, max).await
    }

    async fn zrange_by_score(
        &self,
        key: &str,
        range: &ScoreRange,
    ) -> Result<Vec<String>, StoreError> {
        (**self).zrange_by_score(key, range).await
    }

    async fn zrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, StoreError> {
        (**self).zrange(key, start, stop).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn score_bound_renders_redis_syntax() {
        assert_eq!(ScoreBound::NegInf.to_string(), "-inf");
        assert_eq!(ScoreBound::PosInf.to_string(), "+inf");
        assert_eq!(ScoreBound::Inclusive(5.0).to_string(), "5");
        assert_eq!(ScoreBound::Exclusive(1.5).to_string(), "(1.5");
    }

    #[test]
    fn score_range_contains_respects_exclusivity() {
        let range = ScoreRange::new(ScoreBound::Exclusive(1.0), ScoreBound::Inclusive(3.0));
        assert!(!range.contains(1.0));
        assert!(range.contains(2.0));
        assert!(range.contains(3.0));
        assert!(!range.contains(3.5));

        let all = ScoreRange::new(ScoreBound::NegInf, ScoreBound::PosInf);
        assert!(all.contains(f64::MIN));
        assert!(all.contains(f64::MAX));
    }

    #[test]
    fn backend_error_exposes_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = StoreError::Backend {
            message: "connect failed".to_string(),
            source: Some(Box::new(io)),
        };
        assert_eq!(err.to_string(), "backend error: connect failed");
        assert!(err.source().is_some());
        assert!(StoreError::backend("x").source().is_none());
    }
}
