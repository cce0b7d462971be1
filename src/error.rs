//! Error types for validation, job identity, job storage and admission.
//!
//! Each layer has its own error enum. [`AdmissionError`] aggregates them for
//! callers of [`AdmissionService`](crate::admission::AdmissionService).
//! Store backend errors live next to the backend trait as
//! [`StoreError`](crate::store::StoreError).

use std::fmt;

use thiserror::Error;

use crate::store::StoreError;

/// The rule a rejected submission violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationErrorKind {
    /// The body is not JSON of the expected shape.
    MalformedRequest,
    /// `locations.location` is neither a string nor a list of strings.
    InvalidLocationFormat,
    /// The approach count differs from the coordinate count.
    ApproachMismatch,
    /// An approach is not `"unrestricted"`, `"curb"` or `""`.
    InvalidApproachValue,
    /// A time window does not hold exactly two timestamps.
    InvalidWindowShape,
    /// A time window does not start strictly before it ends.
    NonChronologicalWindow,
    /// A timestamp exceeds the 32-bit ceiling.
    TimestampOutOfRange,
    /// Windows in a list overlap or are not in ascending order.
    OverlappingOrUnsortedWindows,
    /// `travel_cost` is not a supported objective.
    InvalidTravelCost,
    /// The customized cost matrix is not N x N.
    InvalidCostMatrixShape,
    /// `truck_size` is not three comma-separated dimensions.
    InvalidTruckSize,
    /// A location index points past the end of the location list.
    LocationIndexOutOfRange,
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MalformedRequest => "malformed_request",
            Self::InvalidLocationFormat => "invalid_location_format",
            Self::ApproachMismatch => "approach_mismatch",
            Self::InvalidApproachValue => "invalid_approach_value",
            Self::InvalidWindowShape => "invalid_window_shape",
            Self::NonChronologicalWindow => "non_chronological_window",
            Self::TimestampOutOfRange => "timestamp_out_of_range",
            Self::OverlappingOrUnsortedWindows => "overlapping_or_unsorted_windows",
            Self::InvalidTravelCost => "invalid_travel_cost",
            Self::InvalidCostMatrixShape => "invalid_cost_matrix_shape",
            Self::InvalidTruckSize => "invalid_truck_size",
            Self::LocationIndexOutOfRange => "location_index_out_of_range",
        };
        f.write_str(name)
    }
}

/// A submission was rejected. Carries the violated rule and an actionable
/// message that is surfaced to the caller verbatim.
///
/// # Examples
///
/// ```
/// use routegate::{ValidationError, ValidationErrorKind};
///
/// let err = ValidationError::new(ValidationErrorKind::InvalidTruckSize, "bad truck_size");
/// assert_eq!(err.kind, ValidationErrorKind::InvalidTruckSize);
/// assert_eq!(err.to_string(), "bad truck_size");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Which rule was violated.
    pub kind: ValidationErrorKind,
    /// Message for the caller.
    pub message: String,
}

impl ValidationError {
    /// Creates a validation error of the given kind.
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Errors raised while deriving a job id.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The canonical request could not be serialized for hashing.
    #[error("failed to serialize request for job id: {0}")]
    Serialization(#[source] serde_json::Error),
}

/// Errors raised by the [`JobStore`](crate::store::JobStore).
#[derive(Debug, Error)]
pub enum JobError {
    /// No record exists for the job id.
    #[error("job not found: {id}")]
    NotFound {
        /// The job id that was looked up.
        id: String,
    },

    /// The record is already in a terminal state and cannot change.
    #[error("job {id} is already in a terminal state")]
    AlreadyTerminal {
        /// The terminal job's id.
        id: String,
    },

    /// A record could not be encoded or decoded.
    #[error("job record {id} could not be (de)serialized: {source}")]
    Serialization {
        /// The job id.
        id: String,
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// The backing store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors surfaced by [`AdmissionService`](crate::admission::AdmissionService).
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// The submission was rejected before any store interaction.
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// The job id could not be derived.
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// Reading or writing the job record failed.
    #[error(transparent)]
    Job(#[from] JobError),
}

impl AdmissionError {
    /// Returns the validation rule that rejected the submission, if any.
    pub fn validation_kind(&self) -> Option<ValidationErrorKind> {
        match self {
            Self::Validation(err) => Some(err.kind),
            _ => None,
        }
    }
}
