//! Submission validation.
//!
//! [`validate`] turns a [`Submission`] into a [`CanonicalRequest`] or
//! rejects it with the first rule it violates. Checks run in this order:
//!
//! 1. locations and approaches
//! 2. options (travel cost, cost matrix, mode, truck settings)
//! 3. jobs (location index, time windows)
//! 4. shipments (both steps)
//! 5. vehicles (start/end index, availability window, breaks)
//! 6. depots
//!
//! Legacy spellings are folded in on the way: a task's `time_window` is used
//! when `time_windows` is empty, and the submission's `depot` list is
//! appended to `depots`.

pub mod locations;
pub mod options;
pub mod time_window;

use crate::domain::{CanonicalRequest, Job, Shipment, ShipmentStep, Submission, Vehicle};
use crate::error::ValidationError;

use self::locations::{canonical_locations, check_index};
use self::options::check_options;
use self::time_window::{check_vehicle_window, check_windows};

/// A submission that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    pub request: CanonicalRequest,
    /// Non-fatal notes for the caller, e.g. ignored truck settings.
    pub warnings: Vec<String>,
    /// Some time window spans more than 24 hours.
    pub exceeds_24h: bool,
}

/// Validates and normalizes a submission.
///
/// # Errors
///
/// The [`ValidationError`] of the first violated rule.
///
/// # Examples
///
/// ```
/// use routegate::domain::Submission;
/// use routegate::validation::validate;
///
/// let submission = Submission::from_slice(br#"{
///     "locations": {"id": 1, "location": ["1.29,103.80", "1.30,103.82"]},
///     "jobs": [{"id": 1, "location_index": 1, "time_windows": [[0, 90000]]}],
///     "vehicles": [{"id": 1, "start_index": 0}]
/// }"#).unwrap();
///
/// let validated = validate(submission).unwrap();
/// assert_eq!(validated.request.locations.location, "1.29,103.80|1.30,103.82");
/// assert!(validated.exceeds_24h);
/// ```
pub fn validate(submission: Submission) -> Result<Validated, ValidationError> {
    let Submission {
        locations,
        jobs,
        vehicles,
        shipments,
        description,
        options,
        mut depots,
        depot,
        mode,
        cost_matrix,
    } = submission;

    let locations = canonical_locations(locations)?;
    let count = locations.count();

    let checked = check_options(options, mode, cost_matrix.as_deref(), count)?;
    let mut exceeds_24h = false;

    let jobs = jobs
        .into_iter()
        .map(|job| {
            let (job, long) = check_job(job, count)?;
            exceeds_24h |= long;
            Ok(job)
        })
        .collect::<Result<Vec<_>, ValidationError>>()?;

    let shipments = shipments
        .into_iter()
        .map(|shipment| {
            let (shipment, long) = check_shipment(shipment, count)?;
            exceeds_24h |= long;
            Ok(shipment)
        })
        .collect::<Result<Vec<_>, ValidationError>>()?;

    for vehicle in &vehicles {
        exceeds_24h |= check_vehicle(vehicle, count)?;
    }

    depots.extend(depot);
    for d in &depots {
        check_index(d.location_index, count, &format!("depot {} location_index", d.id))?;
    }

    if exceeds_24h {
        tracing::debug!("submission has a time window longer than 24h");
    }

    Ok(Validated {
        request: CanonicalRequest {
            locations,
            jobs,
            vehicles,
            shipments,
            description,
            options: checked.options,
            depots,
            mode: checked.mode,
            cost_matrix,
        },
        warnings: checked.warnings,
        exceeds_24h,
    })
}

fn fold_windows(canonical: &mut Vec<Vec<u64>>, legacy: &mut Vec<Vec<u64>>) {
    if canonical.is_empty() {
        *canonical = std::mem::take(legacy);
    } else {
        legacy.clear();
    }
}

fn check_job(mut job: Job, count: usize) -> Result<(Job, bool), ValidationError> {
    check_index(job.location_index, count, &format!("job {} location_index", job.id))?;
    fold_windows(&mut job.time_windows, &mut job.time_window);
    let long = check_windows(&job.time_windows)?;
    Ok((job, long))
}

fn check_step(step: &mut ShipmentStep, count: usize, side: &str) -> Result<bool, ValidationError> {
    check_index(
        step.location_index,
        count,
        &format!("shipment {side} {} location_index", step.id),
    )?;
    fold_windows(&mut step.time_windows, &mut step.time_window);
    check_windows(&step.time_windows)
}

fn check_shipment(
    mut shipment: Shipment,
    count: usize,
) -> Result<(Shipment, bool), ValidationError> {
    let pickup = check_step(&mut shipment.pickup, count, "pickup")?;
    let delivery = check_step(&mut shipment.delivery, count, "delivery")?;
    Ok((shipment, pickup || delivery))
}

fn check_vehicle(vehicle: &Vehicle, count: usize) -> Result<bool, ValidationError> {
    if let Some(start) = vehicle.start_index {
        check_index(start, count, &format!("vehicle {} start_index", vehicle.id))?;
    }
    if let Some(end) = vehicle.end_index {
        check_index(end, count, &format!("vehicle {} end_index", vehicle.id))?;
    }
    let mut long = check_vehicle_window(&vehicle.time_window)?;
    for b in &vehicle.breaks {
        long |= check_windows(&b.time_windows)?;
    }
    Ok(long)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Break, Depot, LocationInput, Locations, TravelCost};
    use crate::error::ValidationErrorKind;
    use pretty_assertions::assert_eq;

    fn submission(n: usize) -> Submission {
        let coords = (0..n).map(|i| format!("1.{i},103.{i}")).collect();
        Submission::new(
            Locations {
                id: 1,
                location: LocationInput::Multiple(coords),
                approaches: Vec::new(),
            },
            vec![Vehicle {
                id: 1,
                start_index: Some(0),
                ..Vehicle::default()
            }],
        )
    }

    fn job(id: u64, location_index: u64, windows: Vec<Vec<u64>>) -> Job {
        Job {
            id,
            location_index,
            time_windows: windows,
            ..Job::default()
        }
    }

    #[test]
    fn minimal_submission_is_canonicalized() {
        let validated = validate(submission(2)).unwrap();
        let request = validated.request;
        assert_eq!(request.locations.location, "1.0,103.0|1.1,103.1");
        assert_eq!(request.options.objective.travel_cost, TravelCost::Duration);
        assert_eq!(request.mode, None);
        assert!(validated.warnings.is_empty());
        assert!(!validated.exceeds_24h);
    }

    #[test]
    fn legacy_time_window_is_folded() {
        let mut s = submission(2);
        s.jobs.push(Job {
            time_window: vec![vec![0, 10]],
            ..job(1, 1, Vec::new())
        });
        let request = validate(s).unwrap().request;
        assert_eq!(request.jobs[0].time_windows, vec![vec![0, 10]]);
        assert!(request.jobs[0].time_window.is_empty());
    }

    #[test]
    fn canonical_windows_beat_legacy() {
        let mut s = submission(2);
        s.jobs.push(Job {
            time_window: vec![vec![5, 3]],
            ..job(1, 1, vec![vec![0, 10]])
        });
        let request = validate(s).unwrap().request;
        assert_eq!(request.jobs[0].time_windows, vec![vec![0, 10]]);
    }

    #[test]
    fn legacy_depot_list_is_appended() {
        let mut s = submission(2);
        s.depots.push(Depot {
            id: 1,
            location_index: 0,
            description: None,
        });
        s.depot.push(Depot {
            id: 2,
            location_index: 1,
            description: None,
        });
        let request = validate(s).unwrap().request;
        let ids: Vec<u64> = request.depots.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn out_of_range_indexes_rejected() {
        let mut s = submission(2);
        s.jobs.push(job(9, 2, Vec::new()));
        let err = validate(s).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::LocationIndexOutOfRange);
        assert!(err.message.starts_with("job 9 location_index 2"));

        let mut s = submission(2);
        s.vehicles[0].end_index = Some(5);
        assert_eq!(
            validate(s).unwrap_err().kind,
            ValidationErrorKind::LocationIndexOutOfRange
        );

        let mut s = submission(1);
        s.depot.push(Depot {
            id: 3,
            location_index: 1,
            description: None,
        });
        assert!(validate(s).unwrap_err().message.starts_with("depot 3"));
    }

    #[test]
    fn shipment_steps_are_checked() {
        let mut s = submission(3);
        s.shipments.push(Shipment {
            pickup: ShipmentStep {
                id: 1,
                location_index: 1,
                time_windows: vec![vec![0, 100]],
                ..ShipmentStep::default()
            },
            delivery: ShipmentStep {
                id: 2,
                location_index: 2,
                time_window: vec![vec![50, 40]],
                ..ShipmentStep::default()
            },
            ..Shipment::default()
        });
        assert_eq!(
            validate(s).unwrap_err().kind,
            ValidationErrorKind::NonChronologicalWindow
        );
    }

    #[test]
    fn vehicle_window_and_breaks_are_checked() {
        let mut s = submission(2);
        s.vehicles[0].time_window = vec![0, 100_000];
        assert!(validate(s).unwrap().exceeds_24h);

        let mut s = submission(2);
        s.vehicles[0].breaks.push(Break {
            id: 1,
            time_windows: vec![vec![0, 10], vec![5, 20]],
            ..Break::default()
        });
        assert_eq!(
            validate(s).unwrap_err().kind,
            ValidationErrorKind::OverlappingOrUnsortedWindows
        );
    }

    #[test]
    fn locations_are_checked_before_options() {
        let mut s = submission(2);
        s.locations.approaches = vec!["bogus".to_string()];
        s.options.objective.travel_cost = "time".to_string();
        assert_eq!(
            validate(s).unwrap_err().kind,
            ValidationErrorKind::ApproachMismatch
        );
    }

    #[test]
    fn exceeds_24h_from_any_task() {
        let mut s = submission(2);
        s.jobs.push(job(1, 1, vec![vec![0, 10]]));
        s.jobs.push(job(2, 1, vec![vec![0, 90_000]]));
        assert!(validate(s).unwrap().exceeds_24h);
    }

    #[test]
    fn top_level_mode_reconciled() {
        let mut s = submission(2);
        s.mode = Some("car".to_string());
        s.options.routing.truck_weight = Some(9000);
        let validated = validate(s).unwrap();
        assert_eq!(validated.request.mode.as_deref(), Some("car"));
        assert_eq!(validated.request.options.routing.mode.as_deref(), Some("car"));
        assert_eq!(validated.warnings, vec!["truck_weight is ignored as mode=car".to_string()]);
    }
}
