//! Serde helpers for list fields that clients may send as `null`.
//!
//! Engine and client payloads come from encoders that write an unset list as
//! `null`. These helpers read `null` as the empty value so the field behaves
//! as if it were omitted.
//!
//! ```rust
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Task {
//!     #[serde(default, deserialize_with = "routegate::domain::nullable::null_as_default")]
//!     skills: Vec<u64>,
//! }
//!
//! let task: Task = serde_json::from_str(r#"{"skills": null}"#).unwrap();
//! assert!(task.skills.is_empty());
//! ```

use serde::{Deserialize, Deserializer};

/// Reads `null` as `T::default()`.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Reads an optional matrix whose rows may individually be `null`.
///
/// A `null` matrix stays `None`; a `null` row becomes an empty row.
pub fn nullable_rows<'de, D, T>(deserializer: D) -> Result<Option<Vec<Vec<T>>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let rows: Option<Vec<Option<Vec<T>>>> = Option::deserialize(deserializer)?;
    Ok(rows.map(|rows| rows.into_iter().map(Option::unwrap_or_default).collect()))
}
