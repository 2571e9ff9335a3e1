//! Core positions, hours, and shared primitives for the constellation tracker workspace.

mod constellation;

pub use constellation::{
    Constellation, EntityId, Hour, Position, Snapshot, TrajectoryEntry,
};

/// Feed-wide constants.
pub mod constants {
    /// Number of hourly snapshots in one tracking window.
    pub const HOURS_PER_WINDOW: u8 = 24;
    /// Hour treated as "now" by current-position queries.
    pub const REFERENCE_HOUR: u8 = 0;
    /// Degrees in a full turn of longitude.
    pub const FULL_TURN_DEG: f64 = 360.0;
}

/// Longitude and latitude helpers shared by the sampler and the geometry builder.
pub mod geo {
    use super::constants::FULL_TURN_DEG;

    /// Wrap a longitude in degrees into `[0, 360)`.
    #[inline]
    pub fn normalize_longitude(lng: f64) -> f64 {
        let wrapped = (lng + FULL_TURN_DEG).rem_euclid(FULL_TURN_DEG);
        // rem_euclid can round up to exactly 360 for tiny negative inputs
        if wrapped >= FULL_TURN_DEG { 0.0 } else { wrapped }
    }
}
