/// The two horizontal wind components a [`crate::WindField`] pairs together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Eastward (zonal) wind.
    U,
    /// Northward (meridional) wind.
    V,
}

impl ComponentKind {
    /// Exact `parameterNumberName` label carried by the grid header.
    pub fn parameter_name(self) -> &'static str {
        match self {
            Self::U => "U-component_of_wind",
            Self::V => "V-component_of_wind",
        }
    }

    /// Returns a human-readable label for this component.
    pub fn label(self) -> &'static str {
        match self {
            Self::U => "u (eastward)",
            Self::V => "v (northward)",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::U => "Zonal wind component, positive toward the east.",
            Self::V => "Meridional wind component, positive toward the north.",
        }
    }

    /// True when a grid header label selects this component.
    pub fn matches(self, label: &str) -> bool {
        label == self.parameter_name()
    }
}

/// Components required for a sampleable wind field, in decode order.
pub const WIND_COMPONENTS: [ComponentKind; 2] = [ComponentKind::U, ComponentKind::V];
