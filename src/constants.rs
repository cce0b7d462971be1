//! Constants shared by validation, identity and storage.

/// Separator between coordinates in a normalized location string.
pub const LOCATION_SEPARATOR: char = '|';

/// Largest timestamp accepted in a time window (32-bit ceiling).
pub const MAX_TIMESTAMP: u64 = 4_294_967_295;

/// Seconds in a day. Windows longer than this set the `exceeds_24h` flag.
pub const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Travel cost applied when a submission leaves it unset.
pub const DEFAULT_TRAVEL_COST: &str = "duration";

/// Key namespace for job records (`<namespace>_<job_id>`).
pub const DEFAULT_NAMESPACE: &str = "Optimization";

/// Suffix of the sorted set that indexes job ids by start time.
pub const INDEX_KEY_SUFFIX: &str = "index";

/// Retention applied to job records when none is configured.
pub const DEFAULT_RETENTION_DAYS: u64 = 7;

/// Configuration file read when `CONFIG_PATH` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "ROUTEGATE_";

/// Vehicle modes for which truck dimensions are ignored.
pub const CAR_MODES: [&str; 2] = ["car", "4w"];
