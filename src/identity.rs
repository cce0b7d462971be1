//! Job id derivation.
//!
//! A job id is the hex SHA-256 of the canonical request's JSON followed by
//! the caller's api key, with the configured prefix in front. Identical
//! submissions from the same caller therefore map to the same job and reuse
//! its result.
//!
//! Reuse is skipped, and the id salted with the current time in epoch
//! milliseconds, when either
//! - the existing job under the candidate id finished with an error, or
//! - id caching is disabled.
//!
//! Salting continues the same digest, so a forced id is still tied to the
//! content and caller.

use std::fmt;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::config::ServiceConfig;
use crate::domain::CanonicalRequest;
use crate::error::IdentityError;
use crate::store::{JobStore, StoreBackend};

type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Derives job ids for canonical requests.
///
/// # Examples
///
/// ```
/// use routegate::identity::JobIdGenerator;
///
/// let generator = JobIdGenerator::new().with_prefix("sg-").with_clock(|| 42);
/// assert_eq!(generator.prefix(), "sg-");
/// ```
#[derive(Clone)]
pub struct JobIdGenerator {
    prefix: String,
    cache_ids: bool,
    clock: Clock,
}

impl fmt::Debug for JobIdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobIdGenerator")
            .field("prefix", &self.prefix)
            .field("cache_ids", &self.cache_ids)
            .finish_non_exhaustive()
    }
}

impl Default for JobIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl JobIdGenerator {
    /// Creates a generator with no prefix, caching enabled and the system
    /// clock.
    pub fn new() -> Self {
        Self {
            prefix: String::new(),
            cache_ids: true,
            clock: Arc::new(|| chrono::Utc::now().timestamp_millis()),
        }
    }

    /// Creates a generator from `job_id_prefix` and `cache_id`.
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new()
            .with_prefix(config.job_id_prefix.clone())
            .with_cache_ids(config.cache_id)
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// `false` forces a fresh id for every submission.
    pub fn with_cache_ids(mut self, cache_ids: bool) -> Self {
        self.cache_ids = cache_ids;
        self
    }

    /// Replaces the epoch-milliseconds clock used for salting.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> i64 + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Current time in epoch milliseconds, from the configured clock.
    pub fn now_millis(&self) -> i64 {
        (self.clock)()
    }

    /// Derives the job id for `request` submitted with `api_key`.
    ///
    /// The store is only consulted when caching is enabled. A failed lookup
    /// counts as "no prior error".
    ///
    /// # Errors
    ///
    /// [`IdentityError::Serialization`] if the request cannot be serialized.
    pub async fn generate<B: StoreBackend>(
        &self,
        request: &CanonicalRequest,
        api_key: &str,
        store: &JobStore<B>,
    ) -> Result<String, IdentityError> {
        let bytes = request
            .to_canonical_bytes()
            .map_err(IdentityError::Serialization)?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        hasher.update(api_key.as_bytes());

        let candidate = format!("{}{}", self.prefix, hex::encode(hasher.clone().finalize()));
        if self.cache_ids && !store.exists_with_error(&candidate).await {
            return Ok(candidate);
        }

        let salt = self.now_millis();
        tracing::debug!(
            candidate = %candidate,
            cache_ids = self.cache_ids,
            salt,
            "forcing a fresh job id"
        );
        hasher.update(salt.to_string().as_bytes());
        Ok(format!("{}{}", self.prefix, hex::encode(hasher.finalize())))
    }
}
