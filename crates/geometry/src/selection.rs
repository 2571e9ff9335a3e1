use tracker_core::{EntityId, Hour};

/// What the viewer is currently looking at.
///
/// Owned and mutated by the presentation layer in response to user input;
/// the geometry builders only ever read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionState {
    focused: Option<EntityId>,
    display_hour: Hour,
    all_hours: bool,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            focused: None,
            display_hour: Hour::REFERENCE,
            all_hours: false,
        }
    }
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Focus a single entity until the selection is cleared.
    pub fn select_entity(&mut self, id: EntityId) {
        self.focused = Some(id);
    }

    pub fn clear_selection(&mut self) {
        self.focused = None;
    }

    /// Set the displayed hour, clamped into `0..=23`.
    ///
    /// The hour is stored even in all-hours mode, where marker derivation
    /// ignores it until the mode is switched off again.
    pub fn set_hour(&mut self, hour: i64) {
        self.display_hour = Hour::clamped(hour);
    }

    pub fn set_all_hours_mode(&mut self, enabled: bool) {
        self.all_hours = enabled;
    }

    pub fn focused(&self) -> Option<EntityId> {
        self.focused
    }

    pub fn display_hour(&self) -> Hour {
        self.display_hour
    }

    pub fn all_hours_mode(&self) -> bool {
        self.all_hours
    }

    /// Hour whose snapshot supplies the point markers: the reference hour in
    /// all-hours mode, the display hour otherwise.
    pub fn marker_hour(&self) -> Hour {
        if self.all_hours {
            Hour::REFERENCE
        } else {
            self.display_hour
        }
    }
}
