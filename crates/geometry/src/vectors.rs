use serde::Serialize;
use tracker_core::EntityId;
use tracker_wind::GridSampler;

use crate::DisplayParams;
use crate::markers::Marker;

/// Components at or below this magnitude (on both axes) are treated as calm
/// and produce no vector.
pub const CALM_THRESHOLD: f64 = 0.1;
/// Fraction of the user-facing vector scale applied to wind components.
pub const VECTOR_LENGTH_FACTOR: f64 = 0.5;

/// Wind arrow anchored at a marker, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindVector {
    pub id: EntityId,
    pub start_lat: f64,
    pub start_lng: f64,
    pub end_lat: f64,
    pub end_lng: f64,
    pub alt: f64,
    pub u: f64,
    pub v: f64,
}

/// One vector per marker with a sampleable, non-calm wind.
pub fn wind_vectors(
    markers: &[Marker],
    sampler: Option<&GridSampler>,
    params: &DisplayParams,
) -> Vec<WindVector> {
    let Some(sampler) = sampler.filter(|_| params.show_wind_vectors()) else {
        return Vec::new();
    };
    let scale = params.wind_vector_scale() * VECTOR_LENGTH_FACTOR;
    markers
        .iter()
        .filter_map(|marker| {
            let wind = sampler.sample(marker.lat, marker.lng)?;
            if wind.u.abs() <= CALM_THRESHOLD && wind.v.abs() <= CALM_THRESHOLD {
                return None;
            }
            Some(WindVector {
                id: marker.id,
                start_lat: marker.lat,
                start_lng: marker.lng,
                end_lat: marker.lat + wind.v * scale,
                end_lng: marker.lng + wind.u * scale,
                alt: marker.alt,
                u: wind.u,
                v: wind.v,
            })
        })
        .collect()
}
