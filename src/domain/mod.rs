//! Domain types for submissions, canonical requests, job records and engine results.

pub mod canonical;
pub mod nullable;
pub mod record;
pub mod request;
pub mod result;

pub use canonical::{CanonicalLocations, CanonicalObjective, CanonicalOptions, CanonicalRequest, TravelCost};
pub use record::{JobRecord, JobState};
pub use request::{
    Break, Depot, Job, LocationInput, Locations, ObjectiveOptions, OptimizationOptions,
    RoutingOptions, Shipment, ShipmentStep, Submission, Vehicle, VehicleCosts,
};
pub use result::{ResultStatus, RoutingResult};
