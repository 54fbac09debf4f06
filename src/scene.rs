use anyhow::Result;
use glam::Vec3;
use std::collections::{HashMap, HashSet};
use winit::dpi::PhysicalSize;

use crate::camera3d::Camera3D;
use crate::layout::Placement;
use crate::minimap::{MinimapFrame, MinimapSurface};
use crate::record::Record;

/// Non-owning reference into a [`MarkerArena`]. Handles from a cleared arena never resolve again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerHandle {
    index: u32,
    generation: u32,
}

impl MarkerHandle {
    pub fn index(self) -> usize {
        self.index as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerPartKind {
    Body,
    Cap,
    NamePlate,
}

/// Axis-aligned box in marker-local space; y is scaled by the marker height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerPart {
    pub kind: MarkerPartKind,
    pub center: Vec3,
    pub half_extents: Vec3,
}

impl MarkerPart {
    pub const fn new(kind: MarkerPartKind, center: Vec3, half_extents: Vec3) -> Self {
        Self { kind, center, half_extents }
    }

    pub fn world_bounds(&self, position: Vec3, height_scale: f32) -> (Vec3, Vec3) {
        let scale = Vec3::new(1.0, height_scale, 1.0);
        let center = position + self.center * scale;
        let half = self.half_extents * scale;
        (center - half, center + half)
    }
}

pub const MARKER_PARTS: [MarkerPart; 3] = [
    MarkerPart::new(MarkerPartKind::Body, Vec3::ZERO, Vec3::new(0.7, 0.95, 0.25)),
    MarkerPart::new(MarkerPartKind::Cap, Vec3::new(0.0, 1.15, 0.0), Vec3::new(0.75, 0.15, 0.75)),
    MarkerPart::new(MarkerPartKind::NamePlate, Vec3::new(0.0, 1.05, 0.26), Vec3::new(0.55, 0.25, 0.005)),
];

/// Opaque renderer-side resource bound to one marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerVisual(pub u64);

pub struct Marker {
    pub record: Record,
    pub placement: Placement,
    pub visual: MarkerVisual,
}

impl Marker {
    pub fn position(&self) -> Vec3 {
        self.placement.position
    }
}

struct Slot {
    generation: u32,
    marker: Option<Marker>,
}

/// Sole owner of every live marker.
#[derive(Default)]
pub struct MarkerArena {
    slots: Vec<Slot>,
    live: usize,
}

impl MarkerArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, marker: Marker) -> MarkerHandle {
        let index = self.slots.iter().position(|slot| slot.marker.is_none()).unwrap_or_else(|| {
            self.slots.push(Slot { generation: 0, marker: None });
            self.slots.len() - 1
        });
        let slot = &mut self.slots[index];
        slot.marker = Some(marker);
        self.live += 1;
        MarkerHandle { index: index as u32, generation: slot.generation }
    }

    pub fn get(&self, handle: MarkerHandle) -> Option<&Marker> {
        self.slots
            .get(handle.index())
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.marker.as_ref())
    }

    pub fn contains(&self, handle: MarkerHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live markers in insertion order, which is record input order after a rebuild.
    pub fn iter(&self) -> impl Iterator<Item = (MarkerHandle, &Marker)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.marker
                .as_ref()
                .map(|marker| (MarkerHandle { index: index as u32, generation: slot.generation }, marker))
        })
    }

    /// Removes every marker, handing each back so its visual can be released.
    /// Outstanding handles are invalidated.
    pub fn drain(&mut self) -> Vec<Marker> {
        let mut drained = Vec::with_capacity(self.live);
        for slot in &mut self.slots {
            if let Some(marker) = slot.marker.take() {
                slot.generation = slot.generation.wrapping_add(1);
                drained.push(marker);
            }
        }
        self.live = 0;
        drained
    }
}

/// Per-frame snapshot handed to the renderer.
pub struct FrameView<'a> {
    pub camera: &'a Camera3D,
    pub viewport: PhysicalSize<u32>,
    pub hovered: Option<&'a Marker>,
    pub selected_id: Option<&'a str>,
}

/// The presentation side: builds and releases marker visuals and draws frames.
pub trait SceneRenderer {
    fn build_marker(&mut self, record: &Record, placement: &Placement) -> Result<MarkerVisual>;
    fn release_marker(&mut self, visual: MarkerVisual);
    fn set_highlight(&mut self, visual: MarkerVisual, highlighted: bool);
    fn resize(&mut self, size: PhysicalSize<u32>);
    fn render(&mut self, frame: &FrameView<'_>);
    /// Redraws one minimap canvas; called after `render` in the same frame.
    fn render_minimap(&mut self, surface: MinimapSurface, frame: &MinimapFrame);
}

/// Renderer that keeps only bookkeeping; used by the window host and tests.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    next_visual: u64,
    live: HashSet<MarkerVisual>,
    highlighted: HashSet<MarkerVisual>,
    labels: HashMap<MarkerVisual, String>,
    released: usize,
    frames: u64,
    size: PhysicalSize<u32>,
    fail_after: Option<usize>,
    last_camera: Option<(Vec3, Vec3)>,
    minimaps: Vec<(MinimapSurface, MinimapFrame)>,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `build_marker` fail once `count` visuals have been built.
    pub fn failing_after(count: usize) -> Self {
        Self { fail_after: Some(count), ..Self::default() }
    }

    pub fn live_visuals(&self) -> usize {
        self.live.len()
    }

    pub fn released(&self) -> usize {
        self.released
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn is_highlighted(&self, visual: MarkerVisual) -> bool {
        self.highlighted.contains(&visual)
    }

    pub fn highlighted_count(&self) -> usize {
        self.highlighted.len()
    }

    pub fn label(&self, visual: MarkerVisual) -> Option<&str> {
        self.labels.get(&visual).map(String::as_str)
    }

    /// Camera position and look-at of the last rendered frame.
    pub fn last_camera(&self) -> Option<(Vec3, Vec3)> {
        self.last_camera
    }

    /// Minimap canvases drawn during the last frame, in draw order.
    pub fn minimaps(&self) -> &[(MinimapSurface, MinimapFrame)] {
        &self.minimaps
    }
}

impl SceneRenderer for HeadlessRenderer {
    fn build_marker(&mut self, record: &Record, _placement: &Placement) -> Result<MarkerVisual> {
        if let Some(limit) = self.fail_after {
            if self.live.len() >= limit {
                anyhow::bail!("renderer refused marker for '{}'", record.id);
            }
        }
        self.next_visual += 1;
        let visual = MarkerVisual(self.next_visual);
        self.live.insert(visual);
        self.labels.insert(visual, record.display_name());
        Ok(visual)
    }

    fn release_marker(&mut self, visual: MarkerVisual) {
        if self.live.remove(&visual) {
            self.released += 1;
        }
        self.highlighted.remove(&visual);
        self.labels.remove(&visual);
    }

    fn set_highlight(&mut self, visual: MarkerVisual, highlighted: bool) {
        if highlighted {
            self.highlighted.insert(visual);
        } else {
            self.highlighted.remove(&visual);
        }
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.size = size;
    }

    fn render(&mut self, frame: &FrameView<'_>) {
        self.frames += 1;
        self.size = frame.viewport;
        self.last_camera = Some((frame.camera.position, frame.camera.target));
        self.minimaps.clear();
    }

    fn render_minimap(&mut self, surface: MinimapSurface, frame: &MinimapFrame) {
        self.minimaps.push((surface, frame.clone()));
    }
}
