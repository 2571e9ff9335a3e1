use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{HOURS_PER_WINDOW, REFERENCE_HOUR};

/// Hour of day within the tracking window, always in `0..24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Hour(u8);

impl Hour {
    /// Hour 0, the "now" snapshot of the feed.
    pub const REFERENCE: Hour = Hour(REFERENCE_HOUR);

    /// Returns `None` when `value` falls outside the window.
    pub fn new(value: u8) -> Option<Self> {
        (value < HOURS_PER_WINDOW).then_some(Self(value))
    }

    /// Clamp an arbitrary integer into the window.
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(0, i64::from(HOURS_PER_WINDOW - 1)) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Zero-padded two digit label used by the feed (`00`..`23`).
    pub fn label(self) -> String {
        format!("{:02}", self.0)
    }

    /// Every hour of the window in ascending order.
    pub fn all() -> impl DoubleEndedIterator<Item = Hour> + ExactSizeIterator {
        (0..HOURS_PER_WINDOW).map(Hour)
    }
}

impl fmt::Display for Hour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// Stable identity of a tracked entity.
///
/// The feed carries no explicit key, so the identity is synthesized from the
/// entity's index inside each hourly snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub usize);

impl EntityId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Latitude/longitude in degrees plus altitude in raw feed units.
///
/// Serialized as the `[lat, lng, altitude]` triple used by the position feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
    pub altitude: f64,
}

impl Position {
    pub fn new(lat: f64, lng: f64, altitude: f64) -> Self {
        Self { lat, lng, altitude }
    }
}

impl From<[f64; 3]> for Position {
    fn from([lat, lng, altitude]: [f64; 3]) -> Self {
        Self { lat, lng, altitude }
    }
}

impl From<Position> for [f64; 3] {
    fn from(p: Position) -> Self {
        [p.lat, p.lng, p.altitude]
    }
}

/// Positions of every tracked entity at one hour, indexed by [`EntityId`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    positions: Vec<Position>,
}

impl Snapshot {
    pub fn new(positions: Vec<Position>) -> Self {
        Self { positions }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn get(&self, id: EntityId) -> Option<&Position> {
        self.positions.get(id.index())
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// Iterate positions paired with their synthesized identity.
    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Position)> {
        self.positions
            .iter()
            .enumerate()
            .map(|(index, position)| (EntityId(index), position))
    }
}

impl From<Vec<Position>> for Snapshot {
    fn from(positions: Vec<Position>) -> Self {
        Self::new(positions)
    }
}

/// One hour of an entity trajectory; `position` is `None` when that hour's
/// snapshot is too short to contain the entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryEntry {
    pub hour: Hour,
    pub position: Option<Position>,
}

/// Snapshots keyed by hour, always iterated in ascending hour order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constellation {
    snapshots: BTreeMap<Hour, Snapshot>,
    gaps: BTreeSet<Hour>,
}

impl Constellation {
    /// Build from `(hour, snapshot)` pairs in any order. A repeated hour keeps
    /// the last snapshot supplied for it.
    pub fn from_hours<I>(hours: I) -> Self
    where
        I: IntoIterator<Item = (Hour, Snapshot)>,
    {
        Self {
            snapshots: hours.into_iter().collect(),
            gaps: BTreeSet::new(),
        }
    }

    /// Record hours that were requested but could not be fetched.
    pub fn with_gaps<I>(mut self, gaps: I) -> Self
    where
        I: IntoIterator<Item = Hour>,
    {
        self.gaps = gaps
            .into_iter()
            .filter(|hour| !self.snapshots.contains_key(hour))
            .collect();
        self
    }

    /// Number of hours present.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn hours(&self) -> impl DoubleEndedIterator<Item = Hour> + '_ {
        self.snapshots.keys().copied()
    }

    pub fn gaps(&self) -> impl Iterator<Item = Hour> + '_ {
        self.gaps.iter().copied()
    }

    pub fn snapshot(&self, hour: Hour) -> Option<&Snapshot> {
        self.snapshots.get(&hour)
    }

    /// Snapshots in ascending hour order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (Hour, &Snapshot)> {
        self.snapshots.iter().map(|(hour, snapshot)| (*hour, snapshot))
    }

    /// Positions at `hour`, or an empty slice when that hour is missing.
    pub fn positions_at(&self, hour: Hour) -> &[Position] {
        self.snapshots
            .get(&hour)
            .map(Snapshot::positions)
            .unwrap_or(&[])
    }

    /// Positions at the reference ("now") hour.
    pub fn current_positions(&self) -> &[Position] {
        self.positions_at(Hour::REFERENCE)
    }

    /// One entry per hour present, ascending, with absent markers for hours
    /// whose snapshot does not reach `id`.
    pub fn trajectory(&self, id: EntityId) -> Vec<TrajectoryEntry> {
        self.iter()
            .map(|(hour, snapshot)| TrajectoryEntry {
                hour,
                position: snapshot.get(id).copied(),
            })
            .collect()
    }

    /// Entity count of the earliest hour present.
    pub fn entity_count(&self) -> usize {
        self.snapshots
            .values()
            .next()
            .map(Snapshot::len)
            .unwrap_or(0)
    }

    /// Hours whose snapshot length differs from the earliest hour's, with that
    /// length. Positional identity is only trustworthy when this is empty.
    pub fn length_mismatches(&self) -> Vec<(Hour, usize)> {
        let expected = self.entity_count();
        self.iter()
            .filter(|(_, snapshot)| snapshot.len() != expected)
            .map(|(hour, snapshot)| (hour, snapshot.len()))
            .collect()
    }
}
