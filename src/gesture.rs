//! Turns one stream of pointer events into hover changes, selections, and travel requests.
//!
//! A press that stays within the drag radius until release is a click on whatever
//! marker was under the press. Anything that moves further is an orbit drag and
//! never selects. Hover tracking runs on every move, with or without a press.

use glam::Vec2;

use crate::scene::MarkerHandle;

/// Ephemeral state for one press-to-release interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureSession {
    pub down_marker: Option<MarkerHandle>,
    pub down_point: Vec2,
    pub dragged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    None,
    HoverChanged(Option<MarkerHandle>),
    /// The press crossed the drag radius; the camera is now under manual control.
    DragStarted,
    Select(MarkerHandle),
    Travel(MarkerHandle),
}

#[derive(Debug, Clone)]
pub struct GestureDisambiguator {
    drag_threshold_sq: f32,
    session: Option<GestureSession>,
    hovered: Option<MarkerHandle>,
    last_click: Option<MarkerHandle>,
}

impl GestureDisambiguator {
    pub fn new(drag_threshold_sq: f32) -> Self {
        Self { drag_threshold_sq, session: None, hovered: None, last_click: None }
    }

    pub fn session(&self) -> Option<&GestureSession> {
        self.session.as_ref()
    }

    pub fn hovered(&self) -> Option<MarkerHandle> {
        self.hovered
    }

    /// Opens a new session; any previous one is discarded.
    pub fn pointer_down(&mut self, point: Vec2, pick: impl FnOnce(Vec2) -> Option<MarkerHandle>) {
        self.session = Some(GestureSession { down_marker: pick(point), down_point: point, dragged: false });
    }

    /// Updates the drag flag and hover in one step. A drag start takes precedence
    /// over a hover change in the returned outcome; hover state is updated either way.
    pub fn pointer_move(
        &mut self,
        point: Vec2,
        pick: impl FnOnce(Vec2) -> Option<MarkerHandle>,
    ) -> (GestureOutcome, GestureOutcome) {
        let mut drag = GestureOutcome::None;
        if let Some(session) = self.session.as_mut() {
            if !session.dragged && point.distance_squared(session.down_point) > self.drag_threshold_sq {
                session.dragged = true;
                self.last_click = None;
                drag = GestureOutcome::DragStarted;
            }
        }
        let hit = pick(point);
        let hover = if hit != self.hovered {
            self.hovered = hit;
            GestureOutcome::HoverChanged(hit)
        } else {
            GestureOutcome::None
        };
        (drag, hover)
    }

    /// Closes the session. A clean press on a marker selects it.
    pub fn pointer_up(&mut self, point: Vec2) -> GestureOutcome {
        let Some(mut session) = self.session.take() else {
            return GestureOutcome::None;
        };
        if !session.dragged && point.distance_squared(session.down_point) > self.drag_threshold_sq {
            session.dragged = true;
        }
        match session.down_marker {
            Some(marker) if !session.dragged => {
                self.last_click = Some(marker);
                GestureOutcome::Select(marker)
            }
            _ => {
                self.last_click = None;
                GestureOutcome::None
            }
        }
    }

    /// Travel toward the marker of the open clean session, or else the last clean click.
    pub fn double_click(&mut self) -> GestureOutcome {
        let target = match self.session {
            Some(session) if session.dragged => None,
            Some(session) => session.down_marker.or(self.last_click),
            None => self.last_click,
        };
        self.last_click = None;
        target.map(GestureOutcome::Travel).unwrap_or(GestureOutcome::None)
    }

    /// The pointer left the surface: hover clears and any open press is abandoned.
    pub fn pointer_left(&mut self) -> GestureOutcome {
        self.session = None;
        if self.hovered.take().is_some() {
            GestureOutcome::HoverChanged(None)
        } else {
            GestureOutcome::None
        }
    }

    /// Forgets every marker reference, for when the marker set is rebuilt.
    pub fn reset(&mut self) {
        self.session = None;
        self.hovered = None;
        self.last_click = None;
    }
}
