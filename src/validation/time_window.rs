//! Time window checks.
//!
//! A window is `[start, end]` in seconds. Lists of windows must be sorted
//! ascending and strictly non-overlapping: a window may not start at or
//! before the previous window's end.

use crate::constants::{MAX_TIMESTAMP, SECONDS_PER_DAY};
use crate::error::{ValidationError, ValidationErrorKind};

/// Checks a list of windows. Returns `true` if any window spans more than
/// 24 hours.
///
/// Rules are checked per window in this order, first violation wins:
/// shape, chronology, timestamp range, ordering against the previous window.
///
/// # Examples
///
/// ```
/// use routegate::validation::time_window::check_windows;
/// use routegate::ValidationErrorKind;
///
/// assert_eq!(check_windows(&[vec![0, 10], vec![20, 30]]), Ok(false));
/// assert_eq!(check_windows(&[vec![0, 90_000]]), Ok(true));
///
/// let err = check_windows(&[vec![0, 10], vec![10, 20]]).unwrap_err();
/// assert_eq!(err.kind, ValidationErrorKind::OverlappingOrUnsortedWindows);
/// ```
pub fn check_windows(windows: &[Vec<u64>]) -> Result<bool, ValidationError> {
    let mut exceeds_24h = false;
    let mut previous_end: Option<u64> = None;
    for window in windows {
        let (start, end) = check_window(window)?;
        if end - start > SECONDS_PER_DAY {
            exceeds_24h = true;
        }
        if previous_end.is_some_and(|prev| start <= prev) {
            return Err(ValidationError::new(
                ValidationErrorKind::OverlappingOrUnsortedWindows,
                "overlapping time window or unsorted time windows. Please ensure that the time \
                 windows are ordered from earliest to latest and they do not overlap",
            ));
        }
        previous_end = Some(end);
    }
    Ok(exceeds_24h)
}

/// Checks one window and returns its bounds.
pub fn check_window(window: &[u64]) -> Result<(u64, u64), ValidationError> {
    let &[start, end] = window else {
        return Err(ValidationError::new(
            ValidationErrorKind::InvalidWindowShape,
            "invalid number of timestamp(s) for the time window. Each time window should contain \
             2 timestamps in the format [start_timestamp, end_timestamp]. Please ensure that all \
             time windows are specified correctly",
        ));
    };
    if start >= end {
        return Err(ValidationError::new(
            ValidationErrorKind::NonChronologicalWindow,
            "invalid time window. Each time window should be in the format [start_timestamp, \
             end_timestamp] where start_timestamp should be less/earlier than end_timestamp. \
             Please ensure that all time windows have valid and chronological timestamps",
        ));
    }
    for ts in [start, end] {
        if ts > MAX_TIMESTAMP {
            return Err(ValidationError::new(
                ValidationErrorKind::TimestampOutOfRange,
                format!(
                    "invalid timestamp value {ts}. Please provide a timestamp value less than \
                     {MAX_TIMESTAMP}"
                ),
            ));
        }
    }
    Ok((start, end))
}

/// Checks a vehicle's single availability window. An empty window means the
/// vehicle is always available.
pub fn check_vehicle_window(window: &[u64]) -> Result<bool, ValidationError> {
    if window.is_empty() {
        return Ok(false);
    }
    let (start, end) = check_window(window)?;
    Ok(end - start > SECONDS_PER_DAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(windows: &[Vec<u64>]) -> ValidationErrorKind {
        check_windows(windows).unwrap_err().kind
    }

    #[test]
    fn empty_list_is_valid() {
        assert_eq!(check_windows(&[]), Ok(false));
    }

    #[test]
    fn touching_windows_overlap() {
        assert_eq!(
            kind(&[vec![0, 10], vec![10, 20]]),
            ValidationErrorKind::OverlappingOrUnsortedWindows
        );
    }

    #[test]
    fn unsorted_windows_rejected() {
        assert_eq!(
            kind(&[vec![20, 30], vec![0, 10]]),
            ValidationErrorKind::OverlappingOrUnsortedWindows
        );
    }

    #[test]
    fn shape_checked_first() {
        assert_eq!(kind(&[vec![1]]), ValidationErrorKind::InvalidWindowShape);
        assert_eq!(kind(&[vec![1, 2, 3]]), ValidationErrorKind::InvalidWindowShape);
        assert_eq!(kind(&[vec![]]), ValidationErrorKind::InvalidWindowShape);
    }

    #[test]
    fn chronology_checked_before_range() {
        assert_eq!(kind(&[vec![5, 3]]), ValidationErrorKind::NonChronologicalWindow);
        assert_eq!(kind(&[vec![7, 7]]), ValidationErrorKind::NonChronologicalWindow);
        // both out of range and reversed: chronology wins
        assert_eq!(
            kind(&[vec![5_000_000_000, 4_294_967_296]]),
            ValidationErrorKind::NonChronologicalWindow
        );
    }

    #[test]
    fn timestamp_ceiling_is_inclusive() {
        assert_eq!(check_windows(&[vec![0, 4_294_967_295]]), Ok(true));
        let err = check_windows(&[vec![0, 4_294_967_296]]).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::TimestampOutOfRange);
        assert!(err.message.contains("4294967296"));
    }

    #[test]
    fn exactly_one_day_does_not_exceed() {
        assert_eq!(check_windows(&[vec![0, 86_400]]), Ok(false));
        assert_eq!(check_windows(&[vec![0, 86_401]]), Ok(true));
    }

    #[test]
    fn long_window_flag_survives_later_valid_windows() {
        assert_eq!(check_windows(&[vec![0, 90_000], vec![90_001, 90_002]]), Ok(true));
    }

    #[test]
    fn vehicle_window_may_be_empty() {
        assert_eq!(check_vehicle_window(&[]), Ok(false));
        assert_eq!(check_vehicle_window(&[0, 100_000]), Ok(true));
        assert_eq!(
            check_vehicle_window(&[10]).unwrap_err().kind,
            ValidationErrorKind::InvalidWindowShape
        );
    }
}
