use glam::Vec3;

use crate::camera3d::Camera3D;
use crate::config::CameraConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandoffKind {
    /// Near framing for inspecting a single marker.
    Zoom,
    /// Farther, higher framing for moving across the field.
    Travel,
}

/// Where the camera is heading, as opposed to where it currently is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraIntent {
    pub kind: StandoffKind,
    pub position: Vec3,
    pub look_at: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraMotion {
    /// The user (or nothing) drives the camera directly.
    Idle,
    Following(CameraIntent),
}

#[derive(Debug, Clone)]
pub struct CameraMotionController {
    state: CameraMotion,
    damping: f32,
    zoom_offset: Vec3,
    travel_offset: Vec3,
    look_offset: Vec3,
}

impl CameraMotionController {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            state: CameraMotion::Idle,
            damping: config.damping.clamp(0.0, 1.0),
            zoom_offset: config.zoom_offset,
            travel_offset: config.travel_offset,
            look_offset: config.look_offset,
        }
    }

    pub fn state(&self) -> CameraMotion {
        self.state
    }

    pub fn intent(&self) -> Option<CameraIntent> {
        match self.state {
            CameraMotion::Following(intent) => Some(intent),
            CameraMotion::Idle => None,
        }
    }

    pub fn is_following(&self) -> bool {
        matches!(self.state, CameraMotion::Following(_))
    }

    pub fn offset(&self, kind: StandoffKind) -> Vec3 {
        match kind {
            StandoffKind::Zoom => self.zoom_offset,
            StandoffKind::Travel => self.travel_offset,
        }
    }

    /// Latest request wins; any in-flight follow is replaced, not queued.
    pub fn set_target(&mut self, marker_position: Vec3, kind: StandoffKind) -> CameraIntent {
        let intent = CameraIntent {
            kind,
            position: marker_position + self.offset(kind),
            look_at: marker_position + self.look_offset,
        };
        self.state = CameraMotion::Following(intent);
        intent
    }

    /// Manual input always beats an animated follow.
    pub fn manual_control_started(&mut self) {
        self.state = CameraMotion::Idle;
    }

    /// Moves the camera one damping step toward the intent. Returns whether it moved.
    pub fn update(&self, camera: &mut Camera3D) -> bool {
        let CameraMotion::Following(intent) = self.state else {
            return false;
        };
        camera.position = camera.position.lerp(intent.position, self.damping);
        camera.target = camera.target.lerp(intent.look_at, self.damping);
        true
    }
}
