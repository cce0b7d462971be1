//! Job record -- the stored lifecycle state of one submitted job.
//!
//! A [`JobRecord`] is created pending at submission time and moved exactly
//! once to a terminal state when the engine reports back. The result payload
//! is opaque bytes and is persisted as base64 inside the record's JSON.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state derived from a record's `is_end_state` and `error` fields.
///
/// ```text
/// Pending -> Succeeded | Failed
/// Succeeded, Failed -> (terminal, no transitions)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Submitted, waiting for the engine.
    Pending,
    /// Engine finished without error (terminal).
    Succeeded,
    /// Engine reported an error (terminal).
    Failed,
}

impl JobState {
    /// Returns `true` for `Succeeded` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Stored representation of one job.
///
/// # Examples
///
/// ```
/// use routegate::domain::{JobRecord, JobState};
///
/// let mut record = JobRecord::pending("job-1", 1_700_000_000_000, None);
/// assert_eq!(record.state(), JobState::Pending);
///
/// record.finish(b"{\"code\":0}".to_vec(), None);
/// assert_eq!(record.state(), JobState::Succeeded);
/// assert!(record.is_end_state);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    /// Fingerprint-derived job id.
    pub id: String,
    /// Submission time, epoch milliseconds.
    pub start_time: i64,
    #[serde(default)]
    pub description: Option<String>,
    /// Engine result envelope, stored verbatim.
    #[serde(default, with = "payload_base64")]
    pub result_payload: Vec<u8>,
    /// Error message; empty when the job has not failed.
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub is_end_state: bool,
}

impl JobRecord {
    /// Creates a pending record.
    pub fn pending(id: impl Into<String>, start_time: i64, description: Option<String>) -> Self {
        Self {
            id: id.into(),
            start_time,
            description,
            result_payload: Vec::new(),
            error: String::new(),
            is_end_state: false,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> JobState {
        if !self.is_end_state {
            JobState::Pending
        } else if self.error.is_empty() {
            JobState::Succeeded
        } else {
            JobState::Failed
        }
    }

    /// Returns `true` if the record has a non-empty error.
    pub fn has_error(&self) -> bool {
        !self.error.is_empty()
    }

    /// Moves the record to its terminal state.
    ///
    /// `error` of `None` (or empty) means success. Callers are responsible
    /// for checking that the record is still pending; see
    /// [`JobStore::complete`](crate::store::JobStore::complete).
    pub fn finish(&mut self, payload: Vec<u8>, error: Option<String>) {
        self.result_payload = payload;
        self.error = error.unwrap_or_default();
        self.is_end_state = true;
    }
}

mod payload_base64 {
    use base64::prelude::BASE64_STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64_STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64_STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
