//! Location normalization, approach checks and index bounds.

use crate::domain::{CanonicalLocations, Locations};
use crate::error::{ValidationError, ValidationErrorKind};

const APPROACHES: [&str; 3] = ["unrestricted", "curb", ""];

/// Normalizes the location block and checks its approaches.
pub fn canonical_locations(locations: Locations) -> Result<CanonicalLocations, ValidationError> {
    let canonical = CanonicalLocations {
        id: locations.id,
        location: locations.location.normalize(),
        approaches: locations.approaches,
    };
    check_approaches(&canonical)?;
    Ok(canonical)
}

fn check_approaches(locations: &CanonicalLocations) -> Result<(), ValidationError> {
    if locations.approaches.is_empty() {
        return Ok(());
    }
    if locations.approaches.len() != locations.count() {
        return Err(ValidationError::new(
            ValidationErrorKind::ApproachMismatch,
            "the number of approaches specified are not equal to the number of location \
             coordinates provided in \"locations\" part. Please provide as many approaches as \
             locations in the location array",
        ));
    }
    if let Some(bad) = locations
        .approaches
        .iter()
        .find(|a| !APPROACHES.contains(&a.as_str()))
    {
        return Err(ValidationError::new(
            ValidationErrorKind::InvalidApproachValue,
            format!(
                "the approach {bad} is invalid. Please ensure that the approach belongs to the \
                 following options: \"curb\", \"unrestricted\", or \"\" (empty string)"
            ),
        ));
    }
    Ok(())
}

/// Checks that `index` addresses one of `count` locations.
///
/// `what` names the referencing field in the error message, e.g.
/// `"job 7 location_index"`.
pub fn check_index(index: u64, count: usize, what: &str) -> Result<(), ValidationError> {
    if usize::try_from(index).is_ok_and(|i| i < count) {
        return Ok(());
    }
    Err(ValidationError::new(
        ValidationErrorKind::LocationIndexOutOfRange,
        format!(
            "{what} {index} is out of range. The valid value range is [0, {count}) for the {count} \
             location(s) provided"
        ),
    ))
}
