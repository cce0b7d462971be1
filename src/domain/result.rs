//! Result envelope returned by the optimization engine.
//!
//! The envelope is stored verbatim as a job's result payload. Classification
//! reads only [`ResultStatus`], so a route body this crate cannot decode never
//! turns a successful job into a failed one. [`RoutingResult`] is the full
//! typed view for callers that inspect routes; unknown fields are ignored.

use serde::{Deserialize, Serialize};

use crate::domain::nullable::null_as_default;

/// An assignment constraint violation on a route or step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

/// Aggregate figures over all routes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routes: Option<u64>,
    #[serde(default)]
    pub unassigned: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waiting_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub violations: Vec<Violation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub delivery: Vec<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub pickup: Vec<u64>,
    #[serde(default)]
    pub distance: f64,
}

/// A task the engine could not assign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unassigned {
    pub id: u64,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub location: Vec<f64>,
}

/// One stop on a route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival: Option<f64>,
    /// Cumulative duration up to this step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waiting_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub location: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Vehicle load after this step.
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub load: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub location_index: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<u64>,
}

/// One vehicle's route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    #[serde(default)]
    pub vehicle: Option<u64>,
    #[serde(default)]
    pub cost: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<u64>,
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waiting_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub delivery: Vec<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub pickup: Vec<u64>,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The engine's result envelope.
///
/// `code` is 0 on success, 1 for an internal error, 2 for an input error and
/// 3 for a routing error.
///
/// # Examples
///
/// ```
/// use routegate::domain::RoutingResult;
///
/// let ok: RoutingResult = serde_json::from_str(r#"{"code": 0, "routes": []}"#).unwrap();
/// assert_eq!(ok.failure(), None);
///
/// let failed: RoutingResult =
///     serde_json::from_str(r#"{"code": 2, "error": "bad input", "routes": []}"#).unwrap();
/// assert_eq!(failed.failure().as_deref(), Some("bad input"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub summary: Option<Summary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub unassigned: Vec<Unassigned>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub routes: Vec<Route>,
}

impl RoutingResult {
    /// Returns the failure message if the engine reported an error.
    pub fn failure(&self) -> Option<String> {
        ResultStatus {
            code: self.code,
            error: self.error.clone(),
        }
        .failure()
    }
}

/// The status fields of a result envelope, with everything else ignored.
///
/// # Examples
///
/// ```
/// use routegate::domain::ResultStatus;
///
/// let status = ResultStatus::from_slice(br#"{"code": 0, "routes": null}"#).unwrap();
/// assert_eq!(status.failure(), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ResultStatus {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ResultStatus {
    /// Reads the status from a raw envelope.
    pub fn from_slice(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    /// Returns the failure message if the engine reported an error.
    ///
    /// A non-empty `error` wins; otherwise a non-zero `code` yields a
    /// generic message naming the code.
    pub fn failure(&self) -> Option<String> {
        match (&self.error, self.code) {
            (Some(error), _) if !error.is_empty() => Some(error.clone()),
            (_, Some(code)) if code != 0 => {
                Some(format!("optimization failed with code {code}"))
            },
            _ => None,
        }
    }
}
