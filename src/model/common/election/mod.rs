mod status;

pub use status::ElectionStatus;

/// Label given to ballots cast without a district.
pub const UNKNOWN_DISTRICT: &str = "Unknown";
