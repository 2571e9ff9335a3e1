//! Regular-grid wind field decoding and nearest-lower-cell point sampling.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};
use tracker_core::geo::normalize_longitude;

pub mod components;

use components::ComponentKind;

/// Header of one scalar grid as it appears in the wind document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GridHeader {
    #[serde(rename = "parameterNumberName")]
    pub label: String,
    pub nx: usize,
    pub ny: usize,
    /// Origin longitude in degrees.
    pub lo1: f64,
    /// Origin latitude in degrees; rows run southward from here.
    pub la1: f64,
    pub dx: f64,
    pub dy: f64,
}

/// Undecoded grid entry. Missing (`null`) data values are kept as `None`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawGrid {
    pub header: GridHeader,
    pub data: Vec<Option<f64>>,
}

/// A validated regular grid of one scalar quantity, row-major.
#[derive(Debug, Clone)]
pub struct ScalarGrid {
    header: GridHeader,
    values: Vec<f64>,
}

/// Wind components at one grid cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindSample {
    pub u: f64,
    pub v: f64,
}

impl WindSample {
    pub fn speed(&self) -> f64 {
        self.u.hypot(self.v)
    }
}

/// Grid size and resolution of a decoded field, for logging and display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSummary {
    pub nx: usize,
    pub ny: usize,
    pub dx: f64,
    pub dy: f64,
}

/// Errors surfaced while decoding a wind document.
#[derive(Debug, Error)]
pub enum GridDecodeError {
    #[error("failed to read wind document: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse wind document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("wind component `{label}` not found")]
    MissingComponent { label: &'static str },
    #[error("grid `{label}` has non-positive step (dx = {dx}, dy = {dy})")]
    InvalidStep { label: String, dx: f64, dy: f64 },
    #[error("grid `{label}` has empty dimensions ({nx} x {ny})")]
    EmptyDimensions { label: String, nx: usize, ny: usize },
    #[error("grid `{label}` expects {expected} values but holds {actual}")]
    LengthMismatch {
        label: String,
        expected: usize,
        actual: usize,
    },
    #[error("u and v grids disagree on geometry ({u} vs {v})")]
    GeometryMismatch { u: String, v: String },
}

impl ScalarGrid {
    /// Validate a raw grid. Fails fast on malformed headers so that sampling
    /// never has to.
    pub fn new(raw: RawGrid) -> Result<Self, GridDecodeError> {
        let RawGrid { header, data } = raw;
        if !(header.dx > 0.0 && header.dy > 0.0) {
            return Err(GridDecodeError::InvalidStep {
                label: header.label,
                dx: header.dx,
                dy: header.dy,
            });
        }
        if header.nx == 0 || header.ny == 0 {
            return Err(GridDecodeError::EmptyDimensions {
                label: header.label,
                nx: header.nx,
                ny: header.ny,
            });
        }
        let expected = header.nx.checked_mul(header.ny).unwrap_or(usize::MAX);
        if data.len() != expected {
            return Err(GridDecodeError::LengthMismatch {
                label: header.label,
                expected,
                actual: data.len(),
            });
        }
        let values = data.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
        Ok(Self { header, values })
    }

    pub fn header(&self) -> &GridHeader {
        &self.header
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Flat index of the cell containing `(lat, lng)`, or `None` outside coverage.
    ///
    /// Column counts eastward from `lo1` over the longitude wrapped into
    /// `[0, 360)`, row counts southward from `la1`. No interpolation.
    pub fn cell_index(&self, lat: f64, lng: f64) -> Option<usize> {
        let h = &self.header;
        let column = ((normalize_longitude(lng) - h.lo1) / h.dx).floor();
        let row = ((h.la1 - lat) / h.dy).floor();
        // negated comparisons also reject NaN
        if !(column >= 0.0 && column < h.nx as f64) || !(row >= 0.0 && row < h.ny as f64) {
            return None;
        }
        Some(row as usize * h.nx + column as usize)
    }

    pub fn value_at(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().filter(|v| v.is_finite())
    }

    fn same_geometry(&self, other: &ScalarGrid) -> bool {
        let (a, b) = (&self.header, &other.header);
        a.nx == b.nx
            && a.ny == b.ny
            && a.lo1 == b.lo1
            && a.la1 == b.la1
            && a.dx == b.dx
            && a.dy == b.dy
    }
}

/// Paired u/v grids forming a horizontal wind vector field.
#[derive(Debug, Clone)]
pub struct WindField {
    u: ScalarGrid,
    v: ScalarGrid,
}

impl WindField {
    /// Select the u and v components out of a labelled grid collection by
    /// exact label match. Other grids are ignored.
    pub fn decode(mut grids: Vec<RawGrid>) -> Result<Self, GridDecodeError> {
        let u = take_component(&mut grids, ComponentKind::U)?;
        let v = take_component(&mut grids, ComponentKind::V)?;
        if !u.same_geometry(&v) {
            return Err(GridDecodeError::GeometryMismatch {
                u: describe(&u.header),
                v: describe(&v.header),
            });
        }
        Ok(Self { u, v })
    }

    /// Decode a JSON wind document (an array of grid objects).
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, GridDecodeError> {
        let grids: Vec<RawGrid> = serde_json::from_reader(reader)?;
        Self::decode(grids)
    }

    /// Decode the JSON wind document at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GridDecodeError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn component(&self, kind: ComponentKind) -> &ScalarGrid {
        match kind {
            ComponentKind::U => &self.u,
            ComponentKind::V => &self.v,
        }
    }

    pub fn summary(&self) -> FieldSummary {
        let h = &self.u.header;
        FieldSummary {
            nx: h.nx,
            ny: h.ny,
            dx: h.dx,
            dy: h.dy,
        }
    }

    /// Nearest-lower-cell sample; `None` outside coverage or on a missing value.
    pub fn sample(&self, lat: f64, lng: f64) -> Option<WindSample> {
        let index = self.u.cell_index(lat, lng)?;
        Some(WindSample {
            u: self.u.value_at(index)?,
            v: self.v.value_at(index)?,
        })
    }
}

fn take_component(
    grids: &mut Vec<RawGrid>,
    kind: ComponentKind,
) -> Result<ScalarGrid, GridDecodeError> {
    let position = grids
        .iter()
        .position(|grid| kind.matches(&grid.header.label))
        .ok_or(GridDecodeError::MissingComponent {
            label: kind.parameter_name(),
        })?;
    ScalarGrid::new(grids.remove(position))
}

fn describe(h: &GridHeader) -> String {
    format!(
        "{}x{} from ({}, {}) step ({}, {})",
        h.nx, h.ny, h.la1, h.lo1, h.dx, h.dy
    )
}

/// Point sampler over a wind field that may have failed to decode.
///
/// A decode failure is reported once, at construction; afterwards every
/// query answers "unavailable" (`None`) instead of an error.
#[derive(Debug)]
pub struct GridSampler {
    field: Result<WindField, GridDecodeError>,
}

impl GridSampler {
    pub fn new(field: Result<WindField, GridDecodeError>) -> Self {
        match &field {
            Ok(field) => {
                let s = field.summary();
                info!(
                    grid = %format!("{} x {}", s.nx, s.ny),
                    resolution = %format!("{}° x {}°", s.dx, s.dy),
                    "wind field loaded"
                );
            }
            Err(err) => warn!(error = %err, "wind field unavailable"),
        }
        Self { field }
    }

    pub fn from_grids(grids: Vec<RawGrid>) -> Self {
        Self::new(WindField::decode(grids))
    }

    pub fn from_reader<R: Read>(reader: R) -> Self {
        Self::new(WindField::from_reader(reader))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        Self::new(WindField::load(path))
    }

    pub fn is_available(&self) -> bool {
        self.field.is_ok()
    }

    pub fn field(&self) -> Option<&WindField> {
        self.field.as_ref().ok()
    }

    /// The decode error that disabled sampling, if any.
    pub fn unavailable_reason(&self) -> Option<&GridDecodeError> {
        self.field.as_ref().err()
    }

    pub fn sample(&self, lat: f64, lng: f64) -> Option<WindSample> {
        self.field().and_then(|field| field.sample(lat, lng))
    }
}

impl From<WindField> for GridSampler {
    fn from(field: WindField) -> Self {
        Self::new(Ok(field))
    }
}
