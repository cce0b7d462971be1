//! The canonical request: a validated, normalized submission.
//!
//! A [`CanonicalRequest`] is only produced by
//! [`validate`](crate::validation::validate). Its serialized form is the input
//! to job id fingerprinting, so field order here is part of the job identity
//! contract: reordering fields changes every job id.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::LOCATION_SEPARATOR;
use crate::domain::request::{Depot, Job, RoutingOptions, Shipment, Vehicle};

/// Cost the optimizer minimises.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelCost {
    Distance,
    #[default]
    Duration,
    AirDistance,
    /// Costs come from the caller-supplied cost matrix.
    Customized,
}

impl TravelCost {
    /// Returns the wire name of this objective.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Distance => "distance",
            Self::Duration => "duration",
            Self::AirDistance => "air_distance",
            Self::Customized => "customized",
        }
    }
}

impl fmt::Display for TravelCost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TravelCost {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "distance" => Ok(Self::Distance),
            "duration" => Ok(Self::Duration),
            "air_distance" => Ok(Self::AirDistance),
            "customized" => Ok(Self::Customized),
            _ => Err(()),
        }
    }
}

/// Normalized location block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalLocations {
    pub id: u64,
    /// Coordinates joined with `|`.
    pub location: String,
    pub approaches: Vec<String>,
}

impl CanonicalLocations {
    /// Number of coordinates in the location string.
    pub fn count(&self) -> usize {
        self.location.split(LOCATION_SEPARATOR).count()
    }
}

/// Objective with the travel cost resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalObjective {
    pub travel_cost: TravelCost,
    pub minimise_num_depots: bool,
}

/// Options with defaults applied and mode reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalOptions {
    pub objective: CanonicalObjective,
    pub routing: RoutingOptions,
}

/// A submission that passed validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRequest {
    pub locations: CanonicalLocations,
    pub jobs: Vec<Job>,
    pub vehicles: Vec<Vehicle>,
    pub shipments: Vec<Shipment>,
    pub description: Option<String>,
    pub options: CanonicalOptions,
    pub depots: Vec<Depot>,
    /// Always equal to `options.routing.mode`.
    pub mode: Option<String>,
    pub cost_matrix: Option<Vec<Vec<u64>>>,
}

impl CanonicalRequest {
    /// Serializes the request into the exact bytes used for fingerprinting.
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn travel_cost_parses_known_names() {
        for cost in [
            TravelCost::Distance,
            TravelCost::Duration,
            TravelCost::AirDistance,
            TravelCost::Customized,
        ] {
            assert_eq!(cost.as_str().parse::<TravelCost>(), Ok(cost));
        }
        assert!("time".parse::<TravelCost>().is_err());
        assert_eq!(TravelCost::default(), TravelCost::Duration);
    }

    #[test]
    fn travel_cost_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&TravelCost::AirDistance).unwrap(),
            "\"air_distance\""
        );
    }

    #[test]
    fn location_count_splits_on_separator() {
        let locations = CanonicalLocations {
            id: 1,
            location: "1,2|3,4|5,6".to_string(),
            approaches: Vec::new(),
        };
        assert_eq!(locations.count(), 3);
    }
}
