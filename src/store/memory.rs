//! In-memory store backend.
//!
//! [`InMemoryBackend`] implements [`StoreBackend`] over a `DashMap` of typed
//! entries (string, hash, sorted set), each with an optional expiry. Expired
//! entries are purged on access, so it behaves like a single Redis node for
//! tests and local development.
//!
//! # Simulated outages
//!
//! [`set_unreachable`](InMemoryBackend::set_unreachable) makes every call fail
//! with [`StoreError::Backend`] until it is switched back. Tests use this to
//! exercise the [`StoreClient`](crate::store::StoreClient) read fallback.
//!
//! # Examples
//!
//! ```
//! use routegate::store::memory::InMemoryBackend;
//! use routegate::store::StoreBackend;
//!
//! # async fn example() -> Result<(), routegate::StoreError> {
//! let backend = InMemoryBackend::new();
//! backend.set("k", "v", None).await?;
//! assert_eq!(backend.get("k").await?, "v");
//! # Ok(())
//! # }
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::store::backend::{ScoreBound, ScoreRange, ScoredMember, StoreBackend, StoreError};

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    Hash(HashMap<String, String>),
    /// Kept sorted by `(score, member)`.
    ZSet(Vec<ScoredMember>),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Hash(_) => "hash",
            Self::ZSet(_) => "zset",
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

fn wrong_type(key: &str, expected: &str, found: &Value) -> StoreError {
    StoreError::backend(format!(
        "WRONGTYPE key {key} holds a {} value, expected {expected}",
        found.type_name()
    ))
}

fn member_order(a: &ScoredMember, b: &ScoredMember) -> Ordering {
    a.score
        .total_cmp(&b.score)
        .then_with(|| a.member.cmp(&b.member))
}

/// Thread-safe in-memory backend using [`DashMap`].
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    data: DashMap<String, Entry>,
    unreachable: AtomicBool,
}

impl InMemoryBackend {
    /// Creates an empty in-memory backend.
    ///
    /// # Examples
    ///
    /// ```
    /// use routegate::store::memory::InMemoryBackend;
    ///
    /// let backend = InMemoryBackend::new();
    /// assert!(backend.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored keys, including ones not yet purged.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Simulates the node going down (`true`) or coming back (`false`).
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, AtomicOrdering::SeqCst);
    }

    fn check_reachable(&self) -> Result<(), StoreError> {
        if self.unreachable.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::backend("connection refused: endpoint unreachable"));
        }
        Ok(())
    }

    /// Drops the key if its TTL has passed. Must not be called while holding
    /// a reference into the map.
    fn purge_expired(&self, key: &str) {
        let now = Instant::now();
        self.data.remove_if(key, |_, entry| entry.is_expired(now));
    }

    fn prepare(&self, key: &str) -> Result<(), StoreError> {
        self.check_reachable()?;
        self.purge_expired(key);
        Ok(())
    }

    /// Removes the key if its collection value became empty.
    fn remove_if_empty(&self, key: &str) {
        self.data.remove_if(key, |_, entry| match &entry.value {
            Value::Hash(h) => h.is_empty(),
            Value::ZSet(z) => z.is_empty(),
            Value::Str(_) => false,
        });
    }

    fn expiry(ttl: Option<Duration>) -> Option<Instant> {
        ttl.map(|ttl| Instant::now() + ttl)
    }
}

#[async_trait]
impl StoreBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<String, StoreError> {
        self.prepare(key)?;
        let entry = self.data.get(key).ok_or_else(|| StoreError::NotFound {
            key: key.to_string(),
        })?;
        match &entry.value {
            Value::Str(s) => Ok(s.clone()),
            other => Err(wrong_type(key, "string", other)),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        self.check_reachable()?;
        self.data.insert(
            key.to_string(),
            Entry {
                value: Value::Str(value.to_string()),
                expires_at: Self::expiry(ttl),
            },
        );
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        self.prepare(key)?;
        match self.data.entry(key.to_string()) {
            MapEntry::Occupied(_) => Ok(false),
            MapEntry::Vacant(vacant) => {
                vacant.insert(Entry {
                    value: Value::Str(value.to_string()),
                    expires_at: Self::expiry(ttl),
                });
                Ok(true)
            },
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.prepare(key)?;
        Ok(self.data.contains_key(key))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        self.prepare(key)?;
        match self.data.get_mut(key) {
            Some(mut entry) => {
                entry.expires_at = Self::expiry(Some(ttl));
                Ok(true)
            },
            None => Ok(false),
        }
    }

    async fn del(&self, key: &str) -> Result<u64, StoreError> {
        self.prepare(key)?;
        Ok(u64::from(self.data.remove(key).is_some()))
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        self.prepare(key)?;
        let entry = self.data.get(key).ok_or_else(|| StoreError::NotFound {
            key: key.to_string(),
        })?;
        match &entry.value {
            Value::Hash(h) => Ok(h.clone()),
            other => Err(wrong_type(key, "hash", other)),
        }
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        self.prepare(key)?;
        let mut entry = self
            .data
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(Value::Hash(HashMap::new())));
        match &mut entry.value {
            Value::Hash(h) => {
                h.insert(field.to_string(), value.to_string());
                Ok(())
            },
            other => Err(wrong_type(key, "hash", other)),
        }
    }

    async fn hash_del(&self, key: &str, fields: &[&str]) -> Result<u64, StoreError> {
        self.prepare(key)?;
        let removed = match self.data.get_mut(key) {
            None => return Ok(0),
            Some(mut entry) => match &mut entry.value {
                Value::Hash(h) => fields.iter().filter(|f| h.remove(**f).is_some()).count(),
                other => return Err(wrong_type(key, "hash", other)),
            },
        };
        self.remove_if_empty(key);
        Ok(removed as u64)
    }

    async fn zadd(&self, key: &str, members: &[ScoredMember]) -> Result<u64, StoreError> {
        self.prepare(key)?;
        let mut entry = self
            .data
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(Value::ZSet(Vec::new())));
        let set = match &mut entry.value {
            Value::ZSet(z) => z,
            other => return Err(wrong_type(key, "zset", other)),
        };
        let mut added = 0;
        for new in members {
            match set.iter_mut().find(|m| m.member == new.member) {
                Some(existing) => existing.score = new.score,
                None => {
                    set.push(new.clone());
                    added += 1;
                },
            }
        }
        set.sort_by(member_order);
        Ok(added)
    }

    async fn zrem(&self, key: &str, members: &[&str]) -> Result<u64, StoreError> {
        self.prepare(key)?;
        let removed = match self.data.get_mut(key) {
            None => return Ok(0),
            Some(mut entry) => match &mut entry.value {
                Value::ZSet(z) => {
                    let before = z.len();
                    z.retain(|m| !members.contains(&m.member.as_str()));
                    before - z.len()
                },
                other => return Err(wrong_type(key, "zset", other)),
            },
        };
        self.remove_if_empty(key);
        Ok(removed as u64)
    }

    async fn zrem_range_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<u64, StoreError> {
        self.prepare(key)?;
        let range = ScoreRange::new(min, max);
        let removed = match self.data.get_mut(key) {
            None => return Ok(0),
            Some(mut entry) => match &mut entry.value {
                Value::ZSet(z) => {
                    let before = z.len();
                    z.retain(|m| !range.contains(m.score));
                    before - z.len()
                },
                other => return Err(wrong_type(key, "zset", other)),
            },
        };
        self.remove_if_empty(key);
        Ok(removed as u64)
    }

    async fn zrange_by_score(
        &self,
        key: &str,
        range: &ScoreRange,
    ) -> Result<Vec<String>, StoreError> {
        self.prepare(key)?;
        let Some(entry) = self.data.get(key) else {
            return Ok(Vec::new());
        };
        let set = match &entry.value {
            Value::ZSet(z) => z,
            other => return Err(wrong_type(key, "zset", other)),
        };
        let (offset, count) = range.limit.unwrap_or((0, usize::MAX));
        Ok(set
            .iter()
            .filter(|m| range.contains(m.score))
            .skip(offset)
            .take(count)
            .map(|m| m.member.clone())
            .collect())
    }

    async fn zrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, StoreError> {
        self.prepare(key)?;
        let Some(entry) = self.data.get(key) else {
            return Ok(Vec::new());
        };
        let set = match &entry.value {
            Value::ZSet(z) => z,
            other => return Err(wrong_type(key, "zset", other)),
        };
        let len = set.len() as isize;
        let start = if start < 0 { (len + start).max(0) } else { start };
        let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
        if len == 0 || start > stop || start >= len {
            return Ok(Vec::new());
        }
        Ok(set[start as usize..=stop as usize]
            .iter()
            .map(|m| m.member.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn get_missing_key_is_not_found() {
        let backend = InMemoryBackend::new();
        let err = backend.get("nope").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { ref key } if key == "nope"));
    }

    #[tokio::test]
    async fn set_if_absent_only_creates_once() {
        let backend = InMemoryBackend::new();
        assert!(backend.set_if_absent("k", "first", None).await.unwrap());
        assert!(!backend.set_if_absent("k", "second", None).await.unwrap());
        assert_eq!(backend.get("k").await.unwrap(), "first");
    }

    #[tokio::test(start_paused = true)]
    async fn ttl_expires_entries() {
        let backend = InMemoryBackend::new();
        backend
            .set("k", "v", Some(Duration::from_secs(10)))
            .await
            .unwrap();
        assert!(backend.exists("k").await.unwrap());

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(!backend.exists("k").await.unwrap());
        assert!(backend.get("k").await.unwrap_err().is_not_found());
        // an expired key can be claimed again
        assert!(backend.set_if_absent("k", "w", None).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn expire_applies_to_existing_keys_only() {
        let backend = InMemoryBackend::new();
        assert!(!backend.expire("k", Duration::from_secs(1)).await.unwrap());
        backend.set("k", "v", None).await.unwrap();
        assert!(backend.expire("k", Duration::from_secs(1)).await.unwrap());
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!backend.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn hash_operations() {
        let backend = InMemoryBackend::new();
        assert!(backend.hash_get_all("h").await.unwrap_err().is_not_found());

        backend.hash_set("h", "a", "1").await.unwrap();
        backend.hash_set("h", "b", "2").await.unwrap();
        let all = backend.hash_get_all("h").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["a"], "1");

        assert_eq!(backend.hash_del("h", &["a", "zz"]).await.unwrap(), 1);
        assert_eq!(backend.hash_del("h", &["b"]).await.unwrap(), 1);
        assert!(!backend.exists("h").await.unwrap());
    }

    #[tokio::test]
    async fn wrong_type_is_backend_error() {
        let backend = InMemoryBackend::new();
        backend.set("s", "v", None).await.unwrap();
        let err = backend.hash_set("s", "f", "v").await.unwrap_err();
        assert!(err.to_string().contains("WRONGTYPE"));
        assert!(backend.zrange("s", 0, -1).await.is_err());
    }

    #[tokio::test]
    async fn sorted_set_orders_by_score_then_member() {
        let backend = InMemoryBackend::new();
        let added = backend
            .zadd(
                "z",
                &[
                    ScoredMember::new(3.0, "c"),
                    ScoredMember::new(1.0, "b"),
                    ScoredMember::new(1.0, "a"),
                ],
            )
            .await
            .unwrap();
        assert_eq!(added, 3);
        assert_eq!(backend.zrange("z", 0, -1).await.unwrap(), vec!["a", "b", "c"]);

        // rescoring is not an addition
        assert_eq!(backend.zadd("z", &[ScoredMember::new(0.0, "c")]).await.unwrap(), 0);
        assert_eq!(backend.zrange("z", 0, 0).await.unwrap(), vec!["c"]);
        assert_eq!(backend.zrange("z", -2, -1).await.unwrap(), vec!["a", "b"]);
        assert!(backend.zrange("z", 5, 10).await.unwrap().is_empty());
        assert_eq!(backend.zrange("z", 1, 100).await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn range_by_score_with_limit() {
        let backend = InMemoryBackend::new();
        let members: Vec<_> = (1..=5)
            .map(|i| ScoredMember::new(f64::from(i), format!("m{i}")))
            .collect();
        backend.zadd("z", &members).await.unwrap();

        let range = ScoreRange::new(ScoreBound::Inclusive(2.0), ScoreBound::Exclusive(5.0));
        assert_eq!(
            backend.zrange_by_score("z", &range).await.unwrap(),
            vec!["m2", "m3", "m4"]
        );
        assert_eq!(
            backend
                .zrange_by_score("z", &range.with_limit(1, 1))
                .await
                .unwrap(),
            vec!["m3"]
        );
        assert!(backend
            .zrange_by_score("missing", &range)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn zrem_and_range_removal() {
        let backend = InMemoryBackend::new();
        let members: Vec<_> = (1..=4)
            .map(|i| ScoredMember::new(f64::from(i), format!("m{i}")))
            .collect();
        backend.zadd("z", &members).await.unwrap();

        assert_eq!(backend.zrem("z", &["m1", "nope"]).await.unwrap(), 1);
        let removed = backend
            .zrem_range_by_score("z", ScoreBound::NegInf, ScoreBound::Exclusive(4.0))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(backend.zrange("z", 0, -1).await.unwrap(), vec!["m4"]);
    }

    #[tokio::test]
    async fn unreachable_backend_fails_every_call() {
        let backend = InMemoryBackend::new();
        backend.set("k", "v", None).await.unwrap();
        backend.set_unreachable(true);
        assert!(matches!(
            backend.get("k").await,
            Err(StoreError::Backend { .. })
        ));
        assert!(backend.set("k", "w", None).await.is_err());

        backend.set_unreachable(false);
        assert_eq!(backend.get("k").await.unwrap(), "v");
    }

    #[tokio::test]
    async fn concurrent_set_if_absent_has_one_winner() {
        let backend = std::sync::Arc::new(InMemoryBackend::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let backend = backend.clone();
            handles.push(tokio::spawn(async move {
                backend
                    .set_if_absent("race", &format!("v{i}"), None)
                    .await
                    .unwrap()
            }));
        }
        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
