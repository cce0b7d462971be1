//! Admission and result caching for a vehicle-routing optimization engine.
//!
//! `routegate` sits between API clients and an external optimization engine.
//! A submitted routing problem is validated, fingerprinted into a
//! content-addressable job id, and recorded as a pending job in a replicated
//! key-value store. The engine (not part of this crate) later records a
//! terminal result against the same id, and readers fetch it back through a
//! failover-aware read path.
//!
//! # Module Organization
//!
//! - [`domain`] - Submission, canonical request, job record and engine result types
//! - [`validation`] - Normalization and rule checks for submissions
//! - [`identity`] - Deterministic job id derivation with a forced-recreate escape hatch
//! - [`store`] - Store backends, the multi-endpoint [`StoreClient`](store::StoreClient),
//!   and the namespaced [`JobStore`](store::JobStore)
//! - [`admission`] - The submit/lookup/record flow wiring everything together
//! - [`config`] - Service configuration loaded from TOML and environment
//! - [`error`] - Error types for validation, identity, job storage and admission
//!
//! # Example
//!
//! ```
//! use routegate::admission::AdmissionService;
//! use routegate::config::ServiceConfig;
//! use routegate::store::memory::InMemoryBackend;
//!
//! # async fn example() -> Result<(), routegate::AdmissionError> {
//! let service = AdmissionService::new(InMemoryBackend::new(), &ServiceConfig::default());
//! let body = br#"{
//!     "locations": {"id": 1, "location": ["1.29,103.80", "1.30,103.82"]},
//!     "jobs": [{"id": 1, "location_index": 1}],
//!     "vehicles": [{"id": 1, "start_index": 0}]
//! }"#;
//! let admission = service.submit_json(body, "api-key").await?;
//! let record = service.lookup(&admission.id).await?;
//! assert!(!record.is_end_state);
//! # Ok(())
//! # }
//! ```

pub mod admission;
pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod identity;
#[cfg(feature = "logging")]
pub mod logging;
pub mod store;
pub mod validation;

pub use admission::{Admission, AdmissionService};
pub use config::ServiceConfig;
pub use domain::{CanonicalRequest, JobRecord, JobState, Submission};
pub use error::{AdmissionError, IdentityError, JobError, ValidationError, ValidationErrorKind};
pub use identity::JobIdGenerator;
pub use store::{JobStore, StoreBackend, StoreClient, StoreError};
pub use validation::{validate, Validated};
