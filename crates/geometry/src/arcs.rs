use serde::Serialize;
use tracker_core::{Constellation, EntityId, Hour};

use crate::DisplayParams;
use crate::markers::current_markers;
use crate::selection::SelectionState;

/// Extra damping applied to altitudes of the focused entity's per-hour indicators.
pub const FOCUSED_ALTITUDE_DAMPING: f64 = 1.2;

/// Zero-length segment whose height encodes altitude. `hour` is set for the
/// per-hour indicators of a focused entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AltitudeIndicator {
    pub id: EntityId,
    pub hour: Option<Hour>,
    pub start_lat: f64,
    pub start_lng: f64,
    pub end_lat: f64,
    pub end_lng: f64,
    pub end_alt: f64,
}

/// One indicator per current marker when nothing is focused; otherwise one
/// per hour of the constellation for the focused entity.
pub fn altitude_indicators(
    constellation: &Constellation,
    selection: &SelectionState,
    params: &DisplayParams,
) -> Vec<AltitudeIndicator> {
    match selection.focused() {
        None => current_markers(constellation, selection, params)
            .into_iter()
            .map(|m| AltitudeIndicator {
                id: m.id,
                hour: None,
                start_lat: m.lat,
                start_lng: m.lng,
                end_lat: m.lat,
                end_lng: m.lng,
                end_alt: m.alt,
            })
            .collect(),
        Some(id) => {
            let scale = params.altitude_scale() * FOCUSED_ALTITUDE_DAMPING;
            constellation
                .trajectory(id)
                .into_iter()
                .filter_map(|entry| {
                    let p = entry.position?;
                    Some(AltitudeIndicator {
                        id,
                        hour: Some(entry.hour),
                        start_lat: p.lat,
                        start_lng: p.lng,
                        end_lat: p.lat,
                        end_lng: p.lng,
                        end_alt: p.altitude / scale,
                    })
                })
                .collect()
        }
    }
}
