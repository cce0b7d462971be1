//! Submission types: the typed form of a raw routing request body.
//!
//! A [`Submission`] is what a client sends. It is parsed with
//! [`Submission::from_slice`], which resolves the string-or-list location
//! field into a [`LocationInput`] before the rest of the body is decoded, so
//! a malformed location is reported as
//! [`InvalidLocationFormat`](crate::ValidationErrorKind::InvalidLocationFormat)
//! rather than as a generic decode failure.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::LOCATION_SEPARATOR;
use crate::domain::nullable::{null_as_default, nullable_rows};
use crate::error::{ValidationError, ValidationErrorKind};

/// Location coordinates as supplied by the caller.
///
/// Either one pre-joined string (`"lat,lng|lat,lng"`) or a list of
/// coordinate strings that is joined with `|`.
///
/// # Examples
///
/// ```
/// use routegate::domain::LocationInput;
///
/// let single = LocationInput::Single("1.29,103.80|1.30,103.82".to_string());
/// let multiple = LocationInput::Multiple(vec![
///     "1.29,103.80".to_string(),
///     "1.30,103.82".to_string(),
/// ]);
/// assert_eq!(single.normalize(), multiple.normalize());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocationInput {
    /// A single, already delimited coordinate string.
    Single(String),
    /// One coordinate string per location.
    Multiple(Vec<String>),
}

impl LocationInput {
    /// Builds the tagged form from a raw JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationErrorKind::InvalidLocationFormat`] for numbers,
    /// objects, booleans, null, or lists holding anything but strings.
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        match value {
            Value::String(s) => Ok(Self::Single(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(ValidationError::new(
                        ValidationErrorKind::InvalidLocationFormat,
                        format!(
                            "unable to convert {} to location string",
                            json_type_name(other)
                        ),
                    )),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Multiple),
            other => Err(ValidationError::new(
                ValidationErrorKind::InvalidLocationFormat,
                format!("{other} is not a valid location format"),
            )),
        }
    }

    /// Returns the canonical `|`-delimited coordinate string.
    pub fn normalize(&self) -> String {
        match self {
            Self::Single(s) => s.clone(),
            Self::Multiple(items) => items.join(&LOCATION_SEPARATOR.to_string()),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The location block of a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Locations {
    /// Caller-assigned id of the location set.
    pub id: u64,
    /// Coordinates, see [`LocationInput`].
    pub location: LocationInput,
    /// Optional side-of-street approach per coordinate.
    #[serde(default, deserialize_with = "null_as_default")]
    pub approaches: Vec<String>,
}

/// A single-stop task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: u64,
    pub location_index: u64,
    #[serde(default)]
    pub service: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub delivery: Vec<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pickup: Vec<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub time_windows: Vec<Vec<u64>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub skills: Vec<u64>,
    #[serde(default)]
    pub priority: Option<u64>,
    #[serde(default)]
    pub setup: Option<u64>,
    #[serde(default)]
    pub description: Option<String>,
    /// Legacy spelling of `time_windows`, folded in during validation.
    #[serde(default, skip_serializing, deserialize_with = "null_as_default")]
    pub time_window: Vec<Vec<u64>>,
}

/// One end (pickup or delivery) of a shipment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShipmentStep {
    pub id: u64,
    pub location_index: u64,
    #[serde(default)]
    pub service: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub time_windows: Vec<Vec<u64>>,
    #[serde(default)]
    pub setup: Option<u64>,
    #[serde(default)]
    pub description: Option<String>,
    /// Legacy spelling of `time_windows`, folded in during validation.
    #[serde(default, skip_serializing, deserialize_with = "null_as_default")]
    pub time_window: Vec<Vec<u64>>,
}

/// A paired pickup and delivery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub pickup: ShipmentStep,
    pub delivery: ShipmentStep,
    #[serde(default, deserialize_with = "null_as_default")]
    pub amount: Vec<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub skills: Vec<u64>,
    #[serde(default)]
    pub priority: Option<u64>,
}

/// A driver break.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Break {
    pub id: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub time_windows: Vec<Vec<u64>>,
    #[serde(default)]
    pub service: u64,
    #[serde(default)]
    pub description: Option<String>,
}

/// Per-vehicle cost settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleCosts {
    #[serde(default)]
    pub fixed: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_hour: Option<u64>,
}

/// A vehicle available for routing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: u64,
    #[serde(default)]
    pub start_index: Option<u64>,
    #[serde(default)]
    pub end_index: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub capacity: Vec<i64>,
    /// Availability as a single `[start, end]` pair; empty when unrestricted.
    #[serde(default, deserialize_with = "null_as_default")]
    pub time_window: Vec<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub skills: Vec<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub breaks: Vec<Break>,
    #[serde(default)]
    pub max_tasks: Option<u64>,
    #[serde(default)]
    pub costs: VehicleCosts,
    #[serde(default)]
    pub depot: Option<u64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_factor: Option<f64>,
}

/// A depot vehicles may start from or return to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Depot {
    pub id: u64,
    pub location_index: u64,
    #[serde(default)]
    pub description: Option<String>,
}

/// Objective settings as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveOptions {
    /// `distance`, `duration`, `air_distance` or `customized`; empty means default.
    #[serde(default)]
    pub travel_cost: String,
    #[serde(default)]
    pub minimise_num_depots: bool,
}

/// Routing preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingOptions {
    #[serde(default)]
    pub traffic_timestamp: Option<u64>,
    /// `"height,width,length"`.
    #[serde(default)]
    pub truck_size: Option<String>,
    #[serde(default)]
    pub truck_weight: Option<u64>,
    #[serde(default)]
    pub mode: Option<String>,
}

/// The options block of a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizationOptions {
    #[serde(default)]
    pub objective: ObjectiveOptions,
    #[serde(default)]
    pub routing: RoutingOptions,
}

/// A routing problem as submitted by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub locations: Locations,
    #[serde(default, deserialize_with = "null_as_default")]
    pub jobs: Vec<Job>,
    #[serde(deserialize_with = "null_as_default")]
    pub vehicles: Vec<Vehicle>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub shipments: Vec<Shipment>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub options: OptimizationOptions,
    #[serde(default, deserialize_with = "null_as_default")]
    pub depots: Vec<Depot>,
    /// Legacy spelling of `depots`, folded in during validation.
    #[serde(default, skip_serializing, deserialize_with = "null_as_default")]
    pub depot: Vec<Depot>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default, deserialize_with = "nullable_rows")]
    pub cost_matrix: Option<Vec<Vec<u64>>>,
}

impl Submission {
    /// Creates a submission with the given locations and vehicles and
    /// everything else empty.
    pub fn new(locations: Locations, vehicles: Vec<Vehicle>) -> Self {
        Self {
            locations,
            jobs: Vec::new(),
            vehicles,
            shipments: Vec::new(),
            description: None,
            options: OptimizationOptions::default(),
            depots: Vec::new(),
            depot: Vec::new(),
            mode: None,
            cost_matrix: None,
        }
    }

    /// Parses a JSON request body.
    ///
    /// # Errors
    ///
    /// - [`ValidationErrorKind::InvalidLocationFormat`] if `locations.location`
    ///   is not a string or a list of strings.
    /// - [`ValidationErrorKind::MalformedRequest`] for any other decode failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use routegate::domain::{LocationInput, Submission};
    /// use routegate::ValidationErrorKind;
    ///
    /// let ok = Submission::from_slice(
    ///     br#"{"locations": {"id": 1, "location": ["1,2", "3,4"]}, "vehicles": []}"#,
    /// )
    /// .unwrap();
    /// assert!(matches!(ok.locations.location, LocationInput::Multiple(_)));
    ///
    /// let err = Submission::from_slice(
    ///     br#"{"locations": {"id": 1, "location": 42}, "vehicles": []}"#,
    /// )
    /// .unwrap_err();
    /// assert_eq!(err.kind, ValidationErrorKind::InvalidLocationFormat);
    /// ```
    pub fn from_slice(body: &[u8]) -> Result<Self, ValidationError> {
        let value: Value = serde_json::from_slice(body).map_err(malformed)?;
        if let Some(location) = value.get("locations").and_then(|l| l.get("location")) {
            LocationInput::from_value(location)?;
        }
        serde_json::from_value(value).map_err(malformed)
    }
}

fn malformed(err: serde_json::Error) -> ValidationError {
    ValidationError::new(
        ValidationErrorKind::MalformedRequest,
        format!("invalid request body: {err}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn location_from_string_is_single() {
        let input = LocationInput::from_value(&json!("1,2|3,4")).unwrap();
        assert_eq!(input, LocationInput::Single("1,2|3,4".to_string()));
        assert_eq!(input.normalize(), "1,2|3,4");
    }

    #[test]
    fn location_from_list_joins_with_separator() {
        let input = LocationInput::from_value(&json!(["1,2", "3,4", "5,6"])).unwrap();
        assert_eq!(input.normalize(), "1,2|3,4|5,6");
    }

    #[test]
    fn location_rejects_number_object_and_mixed_list() {
        for value in [json!(12), json!({"lat": 1}), json!(["1,2", 3]), json!(null)] {
            let err = LocationInput::from_value(&value).unwrap_err();
            assert_eq!(err.kind, ValidationErrorKind::InvalidLocationFormat);
        }
    }

    #[test]
    fn mixed_list_names_offending_type() {
        let err = LocationInput::from_value(&json!(["1,2", true])).unwrap_err();
        assert_eq!(err.message, "unable to convert bool to location string");
    }

    #[test]
    fn from_slice_reports_malformed_body() {
        let err = Submission::from_slice(b"{not json").unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::MalformedRequest);

        let err = Submission::from_slice(br#"{"vehicles": []}"#).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::MalformedRequest);
    }

    #[test]
    fn from_slice_reads_legacy_aliases() {
        let submission = Submission::from_slice(
            br#"{
                "locations": {"id": 1, "location": "1,2|3,4"},
                "jobs": [{"id": 7, "location_index": 1, "time_window": [[0, 10]]}],
                "vehicles": [{"id": 1}],
                "depot": [{"id": 3, "location_index": 0}]
            }"#,
        )
        .unwrap();
        assert_eq!(submission.jobs[0].time_window, vec![vec![0, 10]]);
        assert!(submission.jobs[0].time_windows.is_empty());
        assert_eq!(submission.depot.len(), 1);
    }

    #[test]
    fn from_slice_reads_null_lists_as_empty() {
        let submission = Submission::from_slice(
            br#"{
                "locations": {"id": 1, "location": "1,2|3,4", "approaches": null},
                "jobs": [{"id": 7, "location_index": 1, "time_windows": null, "skills": null}],
                "vehicles": [{"id": 1, "time_window": null, "breaks": [{"id": 2, "time_windows": null}]}],
                "shipments": null,
                "depots": null,
                "cost_matrix": [[0, 1], null]
            }"#,
        )
        .unwrap();
        assert!(submission.locations.approaches.is_empty());
        assert!(submission.jobs[0].time_windows.is_empty());
        assert!(submission.vehicles[0].time_window.is_empty());
        assert!(submission.vehicles[0].breaks[0].time_windows.is_empty());
        assert!(submission.shipments.is_empty());
        assert!(submission.depots.is_empty());
        assert_eq!(submission.cost_matrix, Some(vec![vec![0, 1], Vec::new()]));
    }
}
