use serde::Serialize;
use tracker_core::{Constellation, EntityId};

use crate::DisplayParams;
use crate::selection::SelectionState;

/// One entity drawn as a point, altitude already divided by the altitude scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Marker {
    pub id: EntityId,
    pub lat: f64,
    pub lng: f64,
    pub alt: f64,
}

/// Marker with its altitude converted back to raw feed units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarkerDetails {
    pub id: EntityId,
    pub lat: f64,
    pub lng: f64,
    pub altitude: f64,
}

/// Every entity of the marker hour, ignoring focus.
pub fn current_markers(
    constellation: &Constellation,
    selection: &SelectionState,
    params: &DisplayParams,
) -> Vec<Marker> {
    let hour = selection.marker_hour();
    let Some(snapshot) = constellation.snapshot(hour) else {
        return Vec::new();
    };
    snapshot
        .entities()
        .map(|(id, position)| Marker {
            id,
            lat: position.lat,
            lng: position.lng,
            alt: position.altitude / params.altitude_scale(),
        })
        .collect()
}

/// Markers actually shown: all current markers, or only the focused entity's.
pub fn visible_markers(
    constellation: &Constellation,
    selection: &SelectionState,
    params: &DisplayParams,
) -> Vec<Marker> {
    let markers = current_markers(constellation, selection, params);
    match selection.focused() {
        None => markers,
        Some(id) => markers.into_iter().filter(|m| m.id == id).collect(),
    }
}

pub fn marker_details(marker: &Marker, params: &DisplayParams) -> MarkerDetails {
    MarkerDetails {
        id: marker.id,
        lat: marker.lat,
        lng: marker.lng,
        altitude: marker.alt * params.altitude_scale(),
    }
}

/// Details of the focused entity's visible marker.
///
/// Pure projection: callers that want to remember it store the result
/// themselves after reading it.
pub fn focused_details(
    markers: &[Marker],
    selection: &SelectionState,
    params: &DisplayParams,
) -> Option<MarkerDetails> {
    let id = selection.focused()?;
    markers
        .iter()
        .find(|m| m.id == id)
        .map(|m| marker_details(m, params))
}
