//! The submit, lookup and record flow.
//!
//! [`AdmissionService`] validates a submission, derives its job id and
//! creates the pending record atomically. A second identical submission
//! attaches to the job created by the first. The external engine reports
//! back through [`AdmissionService::record_result`] or
//! [`AdmissionService::record_failure`].

use crate::config::ServiceConfig;
use crate::domain::{JobRecord, Submission};
use crate::error::AdmissionError;
use crate::identity::JobIdGenerator;
use crate::store::{JobStore, StoreBackend};
use crate::validation::validate;

/// Outcome of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    /// Job id the caller polls for the result.
    pub id: String,
    /// Non-fatal validation notes.
    pub warnings: Vec<String>,
    /// Some time window spans more than 24 hours.
    pub exceeds_24h: bool,
    /// `false` when the submission attached to an existing job.
    pub created: bool,
    /// The stored record, fresh or existing.
    pub record: JobRecord,
}

/// Admission flow over a job store.
#[derive(Debug)]
pub struct AdmissionService<B: StoreBackend> {
    store: JobStore<B>,
    ids: JobIdGenerator,
}

impl<B: StoreBackend> AdmissionService<B> {
    /// Creates a service with store and id settings taken from `config`.
    pub fn new(backend: B, config: &ServiceConfig) -> Self {
        Self::from_parts(
            JobStore::from_config(backend, config),
            JobIdGenerator::from_config(config),
        )
    }

    pub fn from_parts(store: JobStore<B>, ids: JobIdGenerator) -> Self {
        Self { store, ids }
    }

    pub fn store(&self) -> &JobStore<B> {
        &self.store
    }

    /// Admits a submission.
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::Validation`] if the submission is rejected; the
    ///   store is not touched.
    /// - [`AdmissionError::Identity`] or [`AdmissionError::Job`] on
    ///   serialization or store failure.
    pub async fn submit(
        &self,
        submission: Submission,
        api_key: &str,
    ) -> Result<Admission, AdmissionError> {
        let validated = validate(submission)?;
        let id = self
            .ids
            .generate(&validated.request, api_key, &self.store)
            .await?;

        let pending = JobRecord::pending(
            id.clone(),
            self.ids.now_millis(),
            validated.request.description.clone(),
        );
        let outcome = self.store.create_if_absent(pending).await?;
        let created = outcome.is_created();
        if !created {
            tracing::debug!(job_id = %id, "submission attached to existing job");
        }

        Ok(Admission {
            id,
            warnings: validated.warnings,
            exceeds_24h: validated.exceeds_24h,
            created,
            record: outcome.into_record(),
        })
    }

    /// Parses a raw JSON body and admits it.
    pub async fn submit_json(&self, body: &[u8], api_key: &str) -> Result<Admission, AdmissionError> {
        let submission = Submission::from_slice(body)?;
        self.submit(submission, api_key).await
    }

    /// Fetches the record for a job id.
    pub async fn lookup(&self, id: &str) -> Result<JobRecord, AdmissionError> {
        Ok(self.store.get(id).await?)
    }

    /// Records the engine's result envelope.
    pub async fn record_result(
        &self,
        id: &str,
        payload: Vec<u8>,
    ) -> Result<JobRecord, AdmissionError> {
        Ok(self.store.complete(id, payload).await?)
    }

    /// Records an engine failure without a result payload.
    pub async fn record_failure(
        &self,
        id: &str,
        message: impl Into<String>,
    ) -> Result<JobRecord, AdmissionError> {
        Ok(self.store.fail(id, message).await?)
    }
}
