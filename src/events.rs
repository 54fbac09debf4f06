use std::fmt;

use crate::camera_motion::StandoffKind;
use crate::minimap::MinimapSurface;

/// Outputs of the interaction engine for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEvent {
    HoverChanged { name: Option<String> },
    Selected { id: String, name: String },
    SelectionCleared,
    CameraIntent { id: String, kind: StandoffKind },
    ManualControl,
    MinimapOverlayChanged { open: bool },
    MinimapJump { id: String, surface: MinimapSurface },
    StatusChanged { status: String },
    SceneRebuilt { markers: usize },
}

impl fmt::Display for FieldEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldEvent::HoverChanged { name: Some(name) } => write!(f, "HoverChanged name={name}"),
            FieldEvent::HoverChanged { name: None } => write!(f, "HoverChanged name=-"),
            FieldEvent::Selected { id, name } => write!(f, "Selected id={id} name={name}"),
            FieldEvent::SelectionCleared => write!(f, "SelectionCleared"),
            FieldEvent::CameraIntent { id, kind } => write!(f, "CameraIntent id={id} kind={kind:?}"),
            FieldEvent::ManualControl => write!(f, "ManualControl"),
            FieldEvent::MinimapOverlayChanged { open } => write!(f, "MinimapOverlayChanged open={open}"),
            FieldEvent::MinimapJump { id, surface } => write!(f, "MinimapJump id={id} surface={surface:?}"),
            FieldEvent::StatusChanged { status } => write!(f, "StatusChanged {status}"),
            FieldEvent::SceneRebuilt { markers } => write!(f, "SceneRebuilt markers={markers}"),
        }
    }
}

#[derive(Debug, Default)]
pub struct EventBus {
    events: Vec<FieldEvent>,
}

impl EventBus {
    pub fn push(&mut self, event: FieldEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<FieldEvent> {
        self.events.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
