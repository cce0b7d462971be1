//! Validation rules exercised through raw JSON bodies, the way API callers
//! submit them.

use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use routegate::domain::Submission;
use routegate::{validate, Validated, ValidationError, ValidationErrorKind};

// ─── Helpers ────────────────────────────────────────────────────────────────

fn base(locations: Value) -> Value {
    json!({
        "locations": {"id": 1, "location": locations},
        "vehicles": [{"id": 1, "start_index": 0}]
    })
}

fn run(body: Value) -> Result<Validated, ValidationError> {
    let bytes = serde_json::to_vec(&body).unwrap();
    validate(Submission::from_slice(&bytes)?)
}

fn with_job_windows(windows: Value) -> Result<Validated, ValidationError> {
    let mut body = base(json!(["1,2", "3,4"]));
    body["jobs"] = json!([{"id": 1, "location_index": 1, "time_windows": windows}]);
    run(body)
}

fn kind(result: Result<Validated, ValidationError>) -> ValidationErrorKind {
    result.unwrap_err().kind
}

// ─── Time windows ───────────────────────────────────────────────────────────

#[test]
fn windows_touching_at_boundary_are_overlapping() {
    assert_eq!(
        kind(with_job_windows(json!([[0, 10], [10, 20]]))),
        ValidationErrorKind::OverlappingOrUnsortedWindows
    );
}

#[test]
fn disjoint_windows_are_accepted() {
    let validated = with_job_windows(json!([[0, 10], [20, 30]])).unwrap();
    assert!(!validated.exceeds_24h);
}

#[test]
fn day_long_window_sets_flag() {
    let validated = with_job_windows(json!([[0, 90000]])).unwrap();
    assert!(validated.exceeds_24h);
}

#[test]
fn reversed_window_is_non_chronological() {
    assert_eq!(
        kind(with_job_windows(json!([[5, 3]]))),
        ValidationErrorKind::NonChronologicalWindow
    );
}

#[test]
fn timestamp_past_u32_is_out_of_range() {
    assert_eq!(
        kind(with_job_windows(json!([[0, 4294967296u64]]))),
        ValidationErrorKind::TimestampOutOfRange
    );
}

// ─── Cost matrix ────────────────────────────────────────────────────────────

fn customized(matrix: Value) -> Result<Validated, ValidationError> {
    let mut body = base(json!("1,1|2,2|3,3"));
    body["options"] = json!({"objective": {"travel_cost": "customized"}});
    body["cost_matrix"] = matrix;
    run(body)
}

#[test]
fn square_cost_matrix_is_accepted() {
    let validated = customized(json!([[0, 1, 2], [1, 0, 3], [2, 3, 0]])).unwrap();
    assert_eq!(
        validated.request.options.objective.travel_cost.as_str(),
        "customized"
    );
}

#[test]
fn short_cost_matrix_names_expected_size() {
    let err = customized(json!([[0, 1, 2], [1, 0, 3]])).unwrap_err();
    assert_eq!(err.kind, ValidationErrorKind::InvalidCostMatrixShape);
    assert!(err.message.contains("3 x 3"), "message: {}", err.message);
}

#[test]
fn null_cost_matrix_row_is_wrong_shape() {
    let err = customized(json!([[0, 1, 2], null, [2, 3, 0]])).unwrap_err();
    assert_eq!(err.kind, ValidationErrorKind::InvalidCostMatrixShape);
}

// ─── Approaches ─────────────────────────────────────────────────────────────

#[test]
fn approach_count_mismatch_rejected() {
    let mut body = base(json!(["1,2", "3,4"]));
    body["locations"]["approaches"] = json!(["curb", "unrestricted", "curb"]);
    assert_eq!(kind(run(body)), ValidationErrorKind::ApproachMismatch);
}

#[test]
fn unknown_approach_rejected() {
    let mut body = base(json!(["1,2", "3,4"]));
    body["locations"]["approaches"] = json!(["curb", "bogus"]);
    assert_eq!(kind(run(body)), ValidationErrorKind::InvalidApproachValue);
}

// ─── Parsing boundary ───────────────────────────────────────────────────────

#[test]
fn numeric_location_is_invalid_format() {
    assert_eq!(
        kind(run(base(json!(42)))),
        ValidationErrorKind::InvalidLocationFormat
    );
}

#[test]
fn mixed_location_list_is_invalid_format() {
    assert_eq!(
        kind(run(base(json!(["1,2", 3])))),
        ValidationErrorKind::InvalidLocationFormat
    );
}

#[test]
fn string_and_list_forms_canonicalize_identically() {
    let joined = run(base(json!("1,2|3,4"))).unwrap();
    let listed = run(base(json!(["1,2", "3,4"]))).unwrap();
    assert_eq!(joined.request, listed.request);
    assert_eq!(
        joined.request.to_canonical_bytes().unwrap(),
        listed.request.to_canonical_bytes().unwrap()
    );
}

#[test]
fn legacy_aliases_normalize_to_canonical_fields() {
    let mut legacy = base(json!(["1,2", "3,4"]));
    legacy["jobs"] = json!([{"id": 1, "location_index": 1, "time_window": [[0, 10]]}]);
    legacy["depot"] = json!([{"id": 1, "location_index": 0}]);

    let mut modern = base(json!(["1,2", "3,4"]));
    modern["jobs"] = json!([{"id": 1, "location_index": 1, "time_windows": [[0, 10]]}]);
    modern["depots"] = json!([{"id": 1, "location_index": 0}]);

    assert_eq!(
        run(legacy).unwrap().request.to_canonical_bytes().unwrap(),
        run(modern).unwrap().request.to_canonical_bytes().unwrap()
    );
}

#[test]
fn vehicle_end_index_out_of_range() {
    let mut body = base(json!(["1,2"]));
    body["vehicles"] = json!([{"id": 4, "start_index": 0, "end_index": 1}]);
    let err = run(body).unwrap_err();
    assert_eq!(err.kind, ValidationErrorKind::LocationIndexOutOfRange);
    assert!(err.message.starts_with("vehicle 4 end_index 1"));
}

#[test]
fn null_lists_read_as_omitted() {
    let mut nulls = base(json!(["1,2", "3,4"]));
    nulls["locations"]["approaches"] = Value::Null;
    nulls["jobs"] = json!([{"id": 1, "location_index": 1, "time_windows": null, "delivery": null}]);
    nulls["vehicles"] = json!([{"id": 1, "start_index": 0, "time_window": null, "breaks": null}]);
    nulls["shipments"] = Value::Null;
    nulls["depots"] = Value::Null;

    let mut omitted = base(json!(["1,2", "3,4"]));
    omitted["jobs"] = json!([{"id": 1, "location_index": 1}]);

    assert_eq!(
        run(nulls).unwrap().request.to_canonical_bytes().unwrap(),
        run(omitted).unwrap().request.to_canonical_bytes().unwrap()
    );
}
