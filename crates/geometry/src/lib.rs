//! Renderable geometry derived from the constellation, the wind field, and
//! the viewer's selection.
//!
//! Every builder here is a pure function of its inputs. Nothing is cached
//! between calls and [`SelectionState`] is never written to.

use serde::Serialize;
use thiserror::Error;
use tracker_core::Constellation;
use tracker_wind::GridSampler;

pub mod arcs;
pub mod markers;
pub mod paths;
pub mod selection;
pub mod vectors;

pub use arcs::{AltitudeIndicator, altitude_indicators};
pub use markers::{Marker, MarkerDetails, current_markers, focused_details, visible_markers};
pub use paths::{PathOrder, PathPoint, TrajectoryPath, trajectory_paths};
pub use selection::SelectionState;
pub use vectors::{WindVector, wind_vectors};

#[derive(Debug, Error, PartialEq)]
pub enum ScaleError {
    #[error("altitude scale must be positive (got {0})")]
    AltitudeScale(f64),
    #[error("wind vector scale must be non-negative (got {0})")]
    WindVectorScale(f64),
}

/// Scale parameters applied by the builders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayParams {
    altitude_scale: f64,
    wind_vector_scale: f64,
    show_wind_vectors: bool,
}

impl Default for DisplayParams {
    fn default() -> Self {
        Self {
            altitude_scale: 500.0,
            wind_vector_scale: 1.0,
            show_wind_vectors: true,
        }
    }
}

impl DisplayParams {
    /// `altitude_scale` must be > 0 and `wind_vector_scale` >= 0.
    pub fn new(altitude_scale: f64, wind_vector_scale: f64) -> Result<Self, ScaleError> {
        if !(altitude_scale > 0.0) {
            return Err(ScaleError::AltitudeScale(altitude_scale));
        }
        if !(wind_vector_scale >= 0.0) {
            return Err(ScaleError::WindVectorScale(wind_vector_scale));
        }
        Ok(Self {
            altitude_scale,
            wind_vector_scale,
            show_wind_vectors: true,
        })
    }

    pub fn with_wind_vectors(mut self, show: bool) -> Self {
        self.show_wind_vectors = show;
        self
    }

    pub fn altitude_scale(&self) -> f64 {
        self.altitude_scale
    }

    pub fn wind_vector_scale(&self) -> f64 {
        self.wind_vector_scale
    }

    pub fn show_wind_vectors(&self) -> bool {
        self.show_wind_vectors
    }
}

/// The four collections handed to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SceneGeometry {
    pub markers: Vec<Marker>,
    pub altitude_indicators: Vec<AltitudeIndicator>,
    pub paths: Vec<TrajectoryPath>,
    pub wind_vectors: Vec<WindVector>,
}

impl SceneGeometry {
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
            && self.altitude_indicators.is_empty()
            && self.paths.is_empty()
            && self.wind_vectors.is_empty()
    }
}

/// Derive every collection for the current inputs.
pub fn build_scene(
    constellation: &Constellation,
    sampler: Option<&GridSampler>,
    selection: &SelectionState,
    params: &DisplayParams,
) -> SceneGeometry {
    let markers = visible_markers(constellation, selection, params);
    let wind_vectors = wind_vectors(&markers, sampler, params);
    SceneGeometry {
        altitude_indicators: altitude_indicators(constellation, selection, params),
        paths: trajectory_paths(constellation, selection, params),
        wind_vectors,
        markers,
    }
}
