//! Objective, cost matrix, mode and truck option checks.

use crate::constants::CAR_MODES;
use crate::domain::{CanonicalObjective, CanonicalOptions, OptimizationOptions, TravelCost};
use crate::error::{ValidationError, ValidationErrorKind};

/// Options after validation, with the reconciled mode and any warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedOptions {
    pub options: CanonicalOptions,
    pub mode: Option<String>,
    pub warnings: Vec<String>,
}

/// Validates the options block.
///
/// `top_level_mode` is the submission's own `mode` field. The options-level
/// mode wins when both are set; the returned `mode` and
/// `options.routing.mode` are always equal.
pub fn check_options(
    options: OptimizationOptions,
    top_level_mode: Option<String>,
    cost_matrix: Option<&[Vec<u64>]>,
    location_count: usize,
) -> Result<CheckedOptions, ValidationError> {
    let travel_cost = parse_travel_cost(&options.objective.travel_cost)?;
    if travel_cost == TravelCost::Customized {
        check_cost_matrix(cost_matrix.unwrap_or_default(), location_count)?;
    }

    let mut routing = options.routing;
    let mode = routing.mode.clone().or(top_level_mode);
    routing.mode = mode.clone();

    let truck_size = routing.truck_size.as_deref().filter(|s| !s.is_empty());
    if let Some(size) = truck_size {
        if size.split(',').count() != 3 {
            return Err(ValidationError::new(
                ValidationErrorKind::InvalidTruckSize,
                "the input for 'truck_size' is not in the correct format. Please ensure that \
                 'truck_size' dimensions are specified as integer values",
            ));
        }
    }

    let mut warnings = Vec::new();
    if mode.as_deref().is_some_and(|m| CAR_MODES.contains(&m)) {
        if truck_size.is_some() {
            warnings.push("truck_size is ignored as mode=car".to_string());
        }
        if routing.truck_weight.is_some() {
            warnings.push("truck_weight is ignored as mode=car".to_string());
        }
    }

    Ok(CheckedOptions {
        options: CanonicalOptions {
            objective: CanonicalObjective {
                travel_cost,
                minimise_num_depots: options.objective.minimise_num_depots,
            },
            routing,
        },
        mode,
        warnings,
    })
}

fn parse_travel_cost(raw: &str) -> Result<TravelCost, ValidationError> {
    if raw.is_empty() {
        return Ok(TravelCost::default());
    }
    raw.parse().map_err(|()| {
        ValidationError::new(
            ValidationErrorKind::InvalidTravelCost,
            "invalid value for \"travel_cost\" specified. Please ensure that the \"travel_cost\" \
             belongs to the following options: \"distance\", \"duration\", \"air_distance\", or \
             \"customized\"",
        )
    })
}

fn check_cost_matrix(matrix: &[Vec<u64>], n: usize) -> Result<(), ValidationError> {
    if matrix.len() == n && matrix.iter().all(|row| row.len() == n) {
        return Ok(());
    }
    Err(ValidationError::new(
        ValidationErrorKind::InvalidCostMatrixShape,
        format!("invalid length of cost matrix. Its size should be {n} x {n}"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ObjectiveOptions, RoutingOptions};
    use pretty_assertions::assert_eq;

    fn with_cost(travel_cost: &str) -> OptimizationOptions {
        OptimizationOptions {
            objective: ObjectiveOptions {
                travel_cost: travel_cost.to_string(),
                minimise_num_depots: false,
            },
            routing: RoutingOptions::default(),
        }
    }

    fn with_routing(routing: RoutingOptions) -> OptimizationOptions {
        OptimizationOptions {
            routing,
            ..OptimizationOptions::default()
        }
    }

    #[test]
    fn unset_travel_cost_defaults_to_duration() {
        let checked = check_options(OptimizationOptions::default(), None, None, 2).unwrap();
        assert_eq!(checked.options.objective.travel_cost, TravelCost::Duration);
        assert!(checked.warnings.is_empty());
    }

    #[test]
    fn unknown_travel_cost_rejected() {
        let err = check_options(with_cost("time"), None, None, 2).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::InvalidTravelCost);
    }

    #[test]
    fn customized_requires_square_matrix() {
        let square = vec![vec![0, 1, 2], vec![1, 0, 3], vec![2, 3, 0]];
        assert!(check_options(with_cost("customized"), None, Some(square.as_slice()), 3).is_ok());

        let short = vec![vec![0, 1, 2], vec![1, 0, 3]];
        let err = check_options(with_cost("customized"), None, Some(short.as_slice()), 3).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::InvalidCostMatrixShape);
        assert_eq!(
            err.message,
            "invalid length of cost matrix. Its size should be 3 x 3"
        );

        let ragged = vec![vec![0, 1, 2], vec![1, 0], vec![2, 3, 0]];
        assert!(check_options(with_cost("customized"), None, Some(ragged.as_slice()), 3).is_err());

        let err = check_options(with_cost("customized"), None, None, 2).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::InvalidCostMatrixShape);
    }

    #[test]
    fn matrix_ignored_for_other_costs() {
        let short = vec![vec![0]];
        assert!(check_options(with_cost("distance"), None, Some(short.as_slice()), 3).is_ok());
    }

    #[test]
    fn options_mode_wins_over_top_level() {
        let options = with_routing(RoutingOptions {
            mode: Some("truck".to_string()),
            ..RoutingOptions::default()
        });
        let checked = check_options(options, Some("car".to_string()), None, 1).unwrap();
        assert_eq!(checked.mode.as_deref(), Some("truck"));
        assert_eq!(checked.options.routing.mode.as_deref(), Some("truck"));
    }

    #[test]
    fn top_level_mode_copied_into_options() {
        let checked =
            check_options(OptimizationOptions::default(), Some("4w".to_string()), None, 1).unwrap();
        assert_eq!(checked.options.routing.mode.as_deref(), Some("4w"));
        assert_eq!(checked.mode.as_deref(), Some("4w"));
    }

    #[test]
    fn truck_size_needs_three_fields() {
        let options = with_routing(RoutingOptions {
            truck_size: Some("200,210".to_string()),
            ..RoutingOptions::default()
        });
        let err = check_options(options, None, None, 1).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::InvalidTruckSize);

        let options = with_routing(RoutingOptions {
            truck_size: Some(String::new()),
            ..RoutingOptions::default()
        });
        assert!(check_options(options, None, None, 1).is_ok());
    }

    #[test]
    fn car_mode_warns_about_truck_settings() {
        let options = with_routing(RoutingOptions {
            truck_size: Some("200,210,600".to_string()),
            truck_weight: Some(5000),
            mode: Some("car".to_string()),
            ..RoutingOptions::default()
        });
        let checked = check_options(options, None, None, 1).unwrap();
        assert_eq!(
            checked.warnings,
            vec![
                "truck_size is ignored as mode=car".to_string(),
                "truck_weight is ignored as mode=car".to_string(),
            ]
        );
    }

    #[test]
    fn four_wheel_mode_warns_like_car() {
        let options = with_routing(RoutingOptions {
            truck_size: Some("200,210,600".to_string()),
            mode: Some("4w".to_string()),
            ..RoutingOptions::default()
        });
        let checked = check_options(options, None, None, 1).unwrap();
        assert_eq!(checked.warnings, vec!["truck_size is ignored as mode=car".to_string()]);

        let options = with_routing(RoutingOptions {
            truck_weight: Some(5000),
            ..RoutingOptions::default()
        });
        let checked = check_options(options, Some("4w".to_string()), None, 1).unwrap();
        assert_eq!(checked.warnings, vec!["truck_weight is ignored as mode=car".to_string()]);
    }

    #[test]
    fn truck_mode_does_not_warn() {
        let options = with_routing(RoutingOptions {
            truck_size: Some("200,210,600".to_string()),
            truck_weight: Some(5000),
            mode: Some("truck".to_string()),
            ..RoutingOptions::default()
        });
        assert!(check_options(options, None, None, 1).unwrap().warnings.is_empty());
    }
}
