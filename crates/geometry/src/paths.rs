use serde::Serialize;
use tracker_core::{Constellation, EntityId, Hour, Snapshot};

use crate::DisplayParams;
use crate::selection::SelectionState;

/// Hour ordering of a path's points.
///
/// The focused path runs newest-first while the all-hours paths run
/// oldest-first. Both orders are kept as observed until the product decides
/// on one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PathPoint {
    pub hour: Hour,
    pub lat: f64,
    pub lng: f64,
    pub alt: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectoryPath {
    pub id: EntityId,
    pub order: PathOrder,
    pub points: Vec<PathPoint>,
}

/// Paths to draw for the current selection.
///
/// A focused entity yields its single path, whether or not all-hours mode is
/// on; all-hours mode without focus yields one path per entity; otherwise
/// nothing.
pub fn trajectory_paths(
    constellation: &Constellation,
    selection: &SelectionState,
    params: &DisplayParams,
) -> Vec<TrajectoryPath> {
    match (selection.focused(), selection.all_hours_mode()) {
        (Some(id), _) => focused_path(constellation, id, params)
            .into_iter()
            .collect(),
        (None, true) => all_entity_paths(constellation, params),
        (None, false) => Vec::new(),
    }
}

/// Path of one entity across every hour, newest hour first.
pub fn focused_path(
    constellation: &Constellation,
    id: EntityId,
    params: &DisplayParams,
) -> Option<TrajectoryPath> {
    let points = collect_points(constellation.iter().rev(), id, params);
    (!points.is_empty()).then_some(TrajectoryPath {
        id,
        order: PathOrder::Descending,
        points,
    })
}

/// One path per entity of the earliest hour, oldest hour first. Entities
/// with no position in any hour are skipped.
pub fn all_entity_paths(
    constellation: &Constellation,
    params: &DisplayParams,
) -> Vec<TrajectoryPath> {
    (0..constellation.entity_count())
        .map(EntityId)
        .filter_map(|id| {
            let points = collect_points(constellation.iter(), id, params);
            (!points.is_empty()).then_some(TrajectoryPath {
                id,
                order: PathOrder::Ascending,
                points,
            })
        })
        .collect()
}

fn collect_points<'a, I>(snapshots: I, id: EntityId, params: &DisplayParams) -> Vec<PathPoint>
where
    I: Iterator<Item = (Hour, &'a Snapshot)>,
{
    snapshots
        .filter_map(|(hour, snapshot)| {
            snapshot.get(id).map(|p| PathPoint {
                hour,
                lat: p.lat,
                lng: p.lng,
                alt: p.altitude / params.altitude_scale(),
            })
        })
        .collect()
}
