//! Namespaced job record storage on top of a [`StoreBackend`].
//!
//! [`JobStore`] owns everything the backends do not: key naming,
//! serialization, retention, the start-time index, and the rule that a
//! terminal record never changes.
//!
//! # Key Schema
//!
//! | Key Pattern | Type | Purpose |
//! |-------------|------|---------|
//! | `{namespace}_{job_id}` | String (JSON) | Job record |
//! | `{namespace}_index` | Sorted Set | Job ids scored by start time (ms) |
//!
//! Records expire after the configured retention (7 days by default). Each
//! index write also drops members that started more than one retention
//! period before the job being indexed, so the index tracks live records.
//! [`JobStore::prune_index_before`] trims it on demand. Index upkeep is
//! best-effort and never fails a record write.
//!
//! # Concurrency
//!
//! [`JobStore::create_if_absent`] is the only concurrency control. Terminal
//! transitions read then write without compare-and-swap; two engines
//! reporting for the same job race and the last write wins.

use std::time::Duration;

use crate::config::ServiceConfig;
use crate::constants::{DEFAULT_NAMESPACE, DEFAULT_RETENTION_DAYS, INDEX_KEY_SUFFIX, SECONDS_PER_DAY};
use crate::domain::{JobRecord, ResultStatus};
use crate::error::JobError;
use crate::store::backend::{ScoreBound, ScoreRange, ScoredMember, StoreBackend, StoreError};

/// Result of [`JobStore::create_if_absent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// This call stored the record.
    Created(JobRecord),
    /// A record already existed under the id; it is returned unchanged.
    Existing(JobRecord),
}

impl CreateOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    pub fn record(&self) -> &JobRecord {
        match self {
            Self::Created(r) | Self::Existing(r) => r,
        }
    }

    pub fn into_record(self) -> JobRecord {
        match self {
            Self::Created(r) | Self::Existing(r) => r,
        }
    }
}

/// Job record store generic over the backend.
///
/// # Examples
///
/// ```
/// use routegate::domain::{JobRecord, JobState};
/// use routegate::store::memory::InMemoryBackend;
/// use routegate::store::JobStore;
///
/// # async fn example() -> Result<(), routegate::JobError> {
/// let store = JobStore::new(InMemoryBackend::new());
/// store.create_if_absent(JobRecord::pending("job-1", 1_000, None)).await?;
///
/// let done = store.complete("job-1", br#"{"code": 0, "routes": []}"#.to_vec()).await?;
/// assert_eq!(done.state(), JobState::Succeeded);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct JobStore<B: StoreBackend> {
    backend: B,
    namespace: String,
    ttl: Duration,
}

impl<B: StoreBackend> JobStore<B> {
    /// Creates a store with the default namespace and 7-day retention.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            namespace: DEFAULT_NAMESPACE.to_string(),
            ttl: Duration::from_secs(DEFAULT_RETENTION_DAYS * SECONDS_PER_DAY),
        }
    }

    /// Creates a store with namespace and retention from `config`.
    pub fn from_config(backend: B, config: &ServiceConfig) -> Self {
        Self::new(backend)
            .with_namespace(config.namespace.clone())
            .with_retention(config.retention())
    }

    /// Sets the key namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets how long records are kept.
    pub fn with_retention(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn retention(&self) -> Duration {
        self.ttl
    }

    /// Storage key of a job record.
    pub fn record_key(&self, id: &str) -> String {
        format!("{}_{}", self.namespace, id)
    }

    /// Storage key of the start-time index.
    pub fn index_key(&self) -> String {
        format!("{}_{}", self.namespace, INDEX_KEY_SUFFIX)
    }

    fn encode(record: &JobRecord) -> Result<String, JobError> {
        serde_json::to_string(record).map_err(|source| JobError::Serialization {
            id: record.id.clone(),
            source,
        })
    }

    fn decode(id: &str, raw: &str) -> Result<JobRecord, JobError> {
        serde_json::from_str(raw).map_err(|source| JobError::Serialization {
            id: id.to_string(),
            source,
        })
    }

    fn map_store_error(err: StoreError, id: &str) -> JobError {
        match err {
            StoreError::NotFound { .. } => JobError::NotFound { id: id.to_string() },
            other => JobError::Store(other),
        }
    }

    /// Adds the record to the start-time index and trims entries older than
    /// the retention window.
    ///
    /// Index upkeep is best-effort: the record is already stored, so a
    /// failure here is logged and never reported to the caller.
    async fn index(&self, record: &JobRecord) {
        if let Err(err) = self.try_index(record).await {
            tracing::warn!(job_id = %record.id, error = %err, "job index update failed");
        }
    }

    async fn try_index(&self, record: &JobRecord) -> Result<(), StoreError> {
        let index_key = self.index_key();
        self.backend
            .zadd(
                &index_key,
                &[ScoredMember::new(record.start_time as f64, record.id.clone())],
            )
            .await?;
        let retention_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        let cutoff = record.start_time.saturating_sub(retention_ms);
        self.backend
            .zrem_range_by_score(
                &index_key,
                ScoreBound::NegInf,
                ScoreBound::Exclusive(cutoff as f64),
            )
            .await?;
        self.backend.expire(&index_key, self.ttl).await?;
        Ok(())
    }

    /// Stores `record` under `id`, overwriting any previous record.
    ///
    /// The retention TTL is applied on every write, whatever the state.
    ///
    /// # Errors
    ///
    /// Fails only if the record itself cannot be written.
    pub async fn put(&self, id: &str, record: &JobRecord) -> Result<(), JobError> {
        let raw = Self::encode(record)?;
        self.backend
            .set(&self.record_key(id), &raw, Some(self.ttl))
            .await?;
        self.index(record).await;
        Ok(())
    }

    /// Fetches the record for `id`.
    ///
    /// # Errors
    ///
    /// [`JobError::NotFound`] if no readable endpoint has the record.
    pub async fn get(&self, id: &str) -> Result<JobRecord, JobError> {
        let raw = self
            .backend
            .get(&self.record_key(id))
            .await
            .map_err(|e| Self::map_store_error(e, id))?;
        Self::decode(id, &raw)
    }

    /// Returns `true` if a record exists for `id` and carries an error.
    ///
    /// Lookup failures are treated as "no error recorded" so a store outage
    /// never blocks admission.
    pub async fn exists_with_error(&self, id: &str) -> bool {
        match self.get(id).await {
            Ok(record) => record.has_error(),
            Err(JobError::NotFound { .. }) => false,
            Err(err) => {
                tracing::warn!(job_id = %id, error = %err, "error lookup failed, assuming no prior error");
                false
            },
        }
    }

    /// Stores `record` only if no record exists under its id.
    pub async fn create_if_absent(&self, record: JobRecord) -> Result<CreateOutcome, JobError> {
        let raw = Self::encode(&record)?;
        let created = self
            .backend
            .set_if_absent(&self.record_key(&record.id), &raw, Some(self.ttl))
            .await?;
        if created {
            self.index(&record).await;
            tracing::info!(job_id = %record.id, start_time = record.start_time, "job created");
            return Ok(CreateOutcome::Created(record));
        }
        let existing = self.get(&record.id).await?;
        tracing::debug!(job_id = %record.id, state = %existing.state(), "job already exists");
        Ok(CreateOutcome::Existing(existing))
    }

    async fn finish(
        &self,
        id: &str,
        payload: Vec<u8>,
        error: Option<String>,
    ) -> Result<JobRecord, JobError> {
        let mut record = self.get(id).await?;
        if record.state().is_terminal() {
            return Err(JobError::AlreadyTerminal { id: id.to_string() });
        }
        record.finish(payload, error);
        self.put(id, &record).await?;
        tracing::info!(job_id = %id, state = %record.state(), "job finished");
        Ok(record)
    }

    /// Records the engine's result envelope for a pending job.
    ///
    /// The payload is stored verbatim. A non-zero `code` or a non-empty
    /// `error` in the envelope marks the job failed; so does a payload that
    /// is not a result envelope at all.
    ///
    /// # Errors
    ///
    /// - [`JobError::NotFound`] if the job does not exist.
    /// - [`JobError::AlreadyTerminal`] if the job already finished.
    pub async fn complete(&self, id: &str, payload: Vec<u8>) -> Result<JobRecord, JobError> {
        let error = match ResultStatus::from_slice(&payload) {
            Ok(status) => status.failure(),
            Err(err) => Some(format!("unreadable optimization result: {err}")),
        };
        self.finish(id, payload, error).await
    }

    /// Marks a pending job failed without a result payload.
    pub async fn fail(&self, id: &str, message: impl Into<String>) -> Result<JobRecord, JobError> {
        let message = message.into();
        let message = if message.is_empty() {
            "optimization failed".to_string()
        } else {
            message
        };
        self.finish(id, Vec::new(), Some(message)).await
    }

    /// Deletes the record for `id` and drops it from the index.
    ///
    /// Returns `true` if a record was removed.
    pub async fn remove(&self, id: &str) -> Result<bool, JobError> {
        let removed = self.backend.del(&self.record_key(id)).await?;
        self.backend.zrem(&self.index_key(), &[id]).await?;
        Ok(removed > 0)
    }

    /// Lists ids of jobs started in `[from_ms, to_ms]`, oldest first.
    pub async fn list_started_between(
        &self,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<String>, JobError> {
        let range = ScoreRange::new(
            ScoreBound::Inclusive(from_ms as f64),
            ScoreBound::Inclusive(to_ms as f64),
        );
        Ok(self
            .backend
            .zrange_by_score(&self.index_key(), &range)
            .await?)
    }

    /// Lists the ids of the `count` most recently started jobs, newest last.
    pub async fn latest(&self, count: usize) -> Result<Vec<String>, JobError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let start = -isize::try_from(count).unwrap_or(isize::MAX);
        Ok(self.backend.zrange(&self.index_key(), start, -1).await?)
    }

    /// Drops index entries for jobs started before `before_ms`.
    ///
    /// Records themselves expire through their TTL.
    pub async fn prune_index_before(&self, before_ms: i64) -> Result<u64, JobError> {
        let pruned = self
            .backend
            .zrem_range_by_score(
                &self.index_key(),
                ScoreBound::NegInf,
                ScoreBound::Exclusive(before_ms as f64),
            )
            .await?;
        tracing::debug!(pruned, before_ms, "pruned job index");
        Ok(pruned)
    }
}
