//! The interaction engine: owns the record set, the markers built from it, and
//! everything pointer, minimap, and search input can do to the camera and selection.

use anyhow::{Context, Result};
use glam::{Vec2, Vec3};
use winit::dpi::PhysicalSize;

use crate::camera3d::{Camera3D, OrbitControls};
use crate::camera_motion::{CameraMotion, CameraMotionController, StandoffKind};
use crate::config::FieldConfig;
use crate::events::{EventBus, FieldEvent};
use crate::gesture::{GestureDisambiguator, GestureOutcome};
use crate::input::PointerEvent;
use crate::layout::{layout, Layout};
use crate::minimap::{nearest_on_ground, MinimapFrame, MinimapProjector, MinimapSurface};
use crate::picking;
use crate::record::{self, PendingLoad, Record, RecordSource, MAX_VISIBLE_RECORDS};
use crate::registry::MarkerRegistry;
use crate::scene::{FrameView, Marker, MarkerArena, MarkerHandle, SceneRenderer};
use crate::search;

pub const STATUS_LOADING: &str = "Loading memorials...";
pub const STATUS_LOAD_FAILED: &str = "Unable to load records.";

/// Pointer state shared by every handler; reset whenever the marker set changes.
struct InteractionState {
    gestures: GestureDisambiguator,
    last_pointer: Option<Vec2>,
    orbiting: bool,
}

impl InteractionState {
    fn new(config: &FieldConfig) -> Self {
        Self {
            gestures: GestureDisambiguator::new(config.interaction.drag_threshold_sq()),
            last_pointer: None,
            orbiting: false,
        }
    }
}

/// Everything that exists only while a non-empty record set is on screen.
struct MountedScene {
    layout: Layout,
    arena: MarkerArena,
    registry: MarkerRegistry,
    interaction: InteractionState,
    camera: Camera3D,
    orbit: OrbitControls,
    motion: CameraMotionController,
    projector: MinimapProjector,
}

impl MountedScene {
    fn pick(&self, point: Vec2, viewport: PhysicalSize<u32>) -> Option<MarkerHandle> {
        let (origin, dir) = self.camera.screen_ray(point, viewport)?;
        picking::pick_marker(&self.arena, origin, dir)
    }

    fn hovered_marker(&self) -> Option<&Marker> {
        self.interaction.gestures.hovered().and_then(|handle| self.arena.get(handle))
    }
}

pub struct MemorialField<R: SceneRenderer> {
    config: FieldConfig,
    renderer: R,
    records: Vec<Record>,
    status: String,
    selected: Option<Record>,
    scene: Option<MountedScene>,
    pending: Option<PendingLoad>,
    viewport: PhysicalSize<u32>,
    overlay_open: bool,
    events: EventBus,
}

impl<R: SceneRenderer> MemorialField<R> {
    pub fn new(config: FieldConfig, renderer: R) -> Self {
        Self {
            config,
            renderer,
            records: Vec::new(),
            status: STATUS_LOADING.to_string(),
            selected: None,
            scene: None,
            pending: None,
            viewport: PhysicalSize::new(0, 0),
            overlay_open: false,
            events: EventBus::default(),
        }
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn selected(&self) -> Option<&Record> {
        self.selected.as_ref()
    }

    pub fn is_mounted(&self) -> bool {
        self.scene.is_some()
    }

    pub fn marker_count(&self) -> usize {
        self.scene.as_ref().map_or(0, |scene| scene.arena.len())
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.scene.as_ref().map(|scene| &scene.layout)
    }

    pub fn registry(&self) -> Option<&MarkerRegistry> {
        self.scene.as_ref().map(|scene| &scene.registry)
    }

    pub fn marker_position(&self, id: &str) -> Option<Vec3> {
        self.scene.as_ref().and_then(|scene| scene.registry.position_of(id))
    }

    pub fn camera(&self) -> Option<&Camera3D> {
        self.scene.as_ref().map(|scene| &scene.camera)
    }

    pub fn camera_motion(&self) -> Option<CameraMotion> {
        self.scene.as_ref().map(|scene| scene.motion.state())
    }

    pub fn hovered_name(&self) -> Option<String> {
        self.scene.as_ref().and_then(|scene| scene.hovered_marker()).map(|marker| marker.record.display_name())
    }

    pub fn viewport(&self) -> PhysicalSize<u32> {
        self.viewport
    }

    pub fn overlay_open(&self) -> bool {
        self.overlay_open
    }

    pub fn drain_events(&mut self) -> Vec<FieldEvent> {
        self.events.drain()
    }

    /// Starts loading a record set in the background. A load already in flight is abandoned.
    pub fn begin_load<S>(&mut self, source: S)
    where
        S: RecordSource + Send + 'static,
    {
        if let Some(mut previous) = self.pending.take() {
            previous.cancel();
        }
        self.set_status(STATUS_LOADING.to_string());
        self.pending = Some(PendingLoad::spawn(source));
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Applies a finished load. Returns whether a new record set was installed.
    pub fn poll_load(&mut self) -> Result<bool> {
        let Some(pending) = self.pending.as_mut() else {
            return Ok(false);
        };
        let Some(result) = pending.poll() else {
            if pending.is_finished() {
                self.pending = None;
            }
            return Ok(false);
        };
        self.pending = None;
        match result {
            Ok(records) => {
                log::info!("loaded {} records", records.len());
                let count = records.len();
                if let Err(err) = self.set_records(records) {
                    log::error!("scene rebuild failed: {err:#}");
                    self.set_status(STATUS_LOAD_FAILED.to_string());
                    return Ok(false);
                }
                self.set_status(format!("{count} memorials in the garden"));
                Ok(true)
            }
            Err(err) => {
                log::warn!("record load failed: {:#}", anyhow::Error::new(err));
                self.set_status(STATUS_LOAD_FAILED.to_string());
                Ok(false)
            }
        }
    }

    /// Replaces the record set and rebuilds every marker from it.
    pub fn set_records(&mut self, records: Vec<Record>) -> Result<()> {
        self.records = records;
        self.rebuild_scene()
    }

    fn rebuild_scene(&mut self) -> Result<()> {
        self.unmount();
        let cap = self.config.layout.max_markers.min(MAX_VISIBLE_RECORDS);
        let visible = record::visible(&self.records, cap);
        if visible.len() < self.records.len() {
            log::info!("showing the first {} of {} records", visible.len(), self.records.len());
        }
        if visible.is_empty() {
            return Ok(());
        }
        let layout = layout(visible, &self.config.layout);
        let mut arena = MarkerArena::new();
        let mut registry = MarkerRegistry::new();
        for (record, placement) in visible.iter().zip(layout.placements.iter()) {
            let visual = match self.renderer.build_marker(record, placement) {
                Ok(visual) => visual,
                Err(err) => {
                    for marker in arena.drain() {
                        self.renderer.release_marker(marker.visual);
                    }
                    return Err(err).with_context(|| format!("Failed to build marker for '{}'", record.id));
                }
            };
            let handle = arena.insert(Marker { record: record.clone(), placement: *placement, visual });
            registry.register(record.id.clone(), handle, placement.position);
        }
        let mut camera = Camera3D::from_config(&self.config.camera);
        camera.set_viewport(self.viewport);
        let markers = arena.len();
        self.scene = Some(MountedScene {
            projector: MinimapProjector::for_layout(&layout),
            layout,
            arena,
            registry,
            interaction: InteractionState::new(&self.config),
            camera,
            orbit: OrbitControls::from_config(&self.config.camera),
            motion: CameraMotionController::new(&self.config.camera),
        });
        log::debug!("scene rebuilt with {markers} markers");
        self.events.push(FieldEvent::SceneRebuilt { markers });
        Ok(())
    }

    /// Releases every marker and drops all lookups into them.
    fn unmount(&mut self) {
        let Some(mut scene) = self.scene.take() else {
            return;
        };
        let had_hover = scene.interaction.gestures.hovered().is_some();
        scene.interaction.gestures.reset();
        scene.registry.clear();
        let drained = scene.arena.drain();
        let released = drained.len();
        for marker in drained {
            self.renderer.release_marker(marker.visual);
        }
        log::debug!("released {released} markers");
        if had_hover {
            self.events.push(FieldEvent::HoverChanged { name: None });
        }
    }

    /// Stops any load, releases the scene, and leaves the field inert until new records arrive.
    pub fn teardown(&mut self) {
        if let Some(mut pending) = self.pending.take() {
            pending.cancel();
        }
        self.unmount();
        self.records.clear();
        self.selected = None;
        self.overlay_open = false;
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.viewport = size;
        self.renderer.resize(size);
        if let Some(scene) = self.scene.as_mut() {
            scene.camera.set_viewport(size);
        }
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down { position } => self.pointer_down(position),
            PointerEvent::Move { position } => self.pointer_move(position),
            PointerEvent::Up { position } => self.pointer_up(position),
            PointerEvent::DoubleClick { .. } => self.double_click(),
            PointerEvent::Wheel { delta } => self.wheel(delta),
            PointerEvent::Left => self.pointer_left(),
        }
    }

    pub fn pointer_down(&mut self, point: Vec2) {
        let viewport = self.viewport;
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        let hit = scene.pick(point, viewport);
        scene.interaction.gestures.pointer_down(point, |_| hit);
        scene.interaction.last_pointer = Some(point);
        scene.interaction.orbiting = false;
    }

    pub fn pointer_move(&mut self, point: Vec2) {
        let viewport = self.viewport;
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        let hit = scene.pick(point, viewport);
        let previous_hover = scene.interaction.gestures.hovered();
        let previous_point = scene.interaction.last_pointer.replace(point);
        let (drag, hover) = scene.interaction.gestures.pointer_move(point, |_| hit);

        if drag == GestureOutcome::DragStarted {
            scene.motion.manual_control_started();
            scene.interaction.orbiting = true;
            self.events.push(FieldEvent::ManualControl);
        }
        if scene.interaction.orbiting && scene.interaction.gestures.session().is_some() {
            if let Some(previous_point) = previous_point {
                scene.orbit.rotate(&mut scene.camera, point - previous_point, viewport);
            }
        }

        if let GestureOutcome::HoverChanged(current) = hover {
            if let Some(marker) = previous_hover.and_then(|handle| scene.arena.get(handle)) {
                self.renderer.set_highlight(marker.visual, false);
            }
            let current = current.and_then(|handle| scene.arena.get(handle));
            if let Some(marker) = current {
                self.renderer.set_highlight(marker.visual, true);
            }
            let name = current.map(|marker| marker.record.display_name());
            self.events.push(FieldEvent::HoverChanged { name });
        }
    }

    pub fn pointer_up(&mut self, point: Vec2) {
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        scene.interaction.orbiting = false;
        if let GestureOutcome::Select(handle) = scene.interaction.gestures.pointer_up(point) {
            self.select_marker(handle, StandoffKind::Zoom);
        }
    }

    pub fn double_click(&mut self) {
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        if let GestureOutcome::Travel(handle) = scene.interaction.gestures.double_click() {
            self.aim_camera(handle, StandoffKind::Travel);
        }
    }

    pub fn pointer_left(&mut self) {
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        let previous_hover = scene.interaction.gestures.hovered();
        scene.interaction.orbiting = false;
        scene.interaction.last_pointer = None;
        if let GestureOutcome::HoverChanged(None) = scene.interaction.gestures.pointer_left() {
            if let Some(marker) = previous_hover.and_then(|handle| scene.arena.get(handle)) {
                self.renderer.set_highlight(marker.visual, false);
            }
            self.events.push(FieldEvent::HoverChanged { name: None });
        }
    }

    /// Scroll zoom. Counts as manual control.
    pub fn wheel(&mut self, delta: f32) {
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        if delta.abs() <= f32::EPSILON {
            return;
        }
        scene.motion.manual_control_started();
        scene.orbit.zoom_wheel(&mut scene.camera, delta);
        self.events.push(FieldEvent::ManualControl);
    }

    /// Selects the marker's record and frames it with the given standoff.
    fn select_marker(&mut self, handle: MarkerHandle, kind: StandoffKind) -> Option<String> {
        let record = self.scene.as_ref()?.arena.get(handle)?.record.clone();
        self.aim_camera(handle, kind)?;
        let id = record.id.clone();
        self.events.push(FieldEvent::Selected { id: record.id.clone(), name: record.name.clone() });
        self.selected = Some(record);
        Some(id)
    }

    fn aim_camera(&mut self, handle: MarkerHandle, kind: StandoffKind) -> Option<()> {
        let scene = self.scene.as_mut()?;
        let marker = scene.arena.get(handle)?;
        let id = marker.record.id.clone();
        scene.motion.set_target(marker.position(), kind);
        self.events.push(FieldEvent::CameraIntent { id, kind });
        Some(())
    }

    /// Selects and zooms to the marker for `id`; unknown or hidden ids do nothing.
    pub fn focus_on(&mut self, id: &str) -> bool {
        let Some(handle) = self.scene.as_ref().and_then(|scene| scene.registry.lookup(id)) else {
            log::debug!("focus on '{id}' ignored: no marker");
            return false;
        };
        self.select_marker(handle, StandoffKind::Zoom).is_some()
    }

    pub fn search(&self, query: &str) -> Vec<&Record> {
        search::filter_by_name(&self.records, query)
    }

    /// Acts on a chosen search suggestion: focus when markers exist, otherwise just select.
    pub fn search_select(&mut self, id: &str) -> bool {
        if self.scene.is_some() {
            return self.focus_on(id);
        }
        let Some(record) = self.records.iter().find(|record| record.id == id).cloned() else {
            return false;
        };
        self.events.push(FieldEvent::Selected { id: record.id.clone(), name: record.name.clone() });
        self.selected = Some(record);
        true
    }

    pub fn clear_selection(&mut self) {
        if self.selected.take().is_some() {
            self.events.push(FieldEvent::SelectionCleared);
        }
    }

    pub fn open_minimap_overlay(&mut self) {
        self.set_minimap_overlay(true);
    }

    pub fn close_minimap_overlay(&mut self) {
        self.set_minimap_overlay(false);
    }

    pub fn set_minimap_overlay(&mut self, open: bool) {
        if self.overlay_open != open {
            self.overlay_open = open;
            self.events.push(FieldEvent::MinimapOverlayChanged { open });
        }
    }

    /// Draw list for one minimap canvas; `None` while nothing is placed.
    pub fn minimap_frame(&self, surface: MinimapSurface) -> Option<MinimapFrame> {
        let scene = self.scene.as_ref()?;
        Some(MinimapFrame::build(
            &scene.projector,
            surface.size(&self.config.minimap),
            scene.arena.iter().map(|(_, marker)| marker.position()),
            self.config.minimap.highlight_count,
            scene.camera.position,
        ))
    }

    /// Jumps to the marker nearest the clicked canvas pixel, as a direct click on it would.
    pub fn minimap_click(&mut self, surface: MinimapSurface, point: Vec2) -> Option<String> {
        let scene = self.scene.as_ref()?;
        let canvas = surface.size(&self.config.minimap);
        let target = scene.projector.unproject(point, canvas)?;
        let index = nearest_on_ground(scene.arena.iter().map(|(_, marker)| marker.position()), target)?;
        let (handle, _) = scene.arena.iter().nth(index)?;
        let id = self.select_marker(handle, StandoffKind::Zoom)?;
        self.events.push(FieldEvent::MinimapJump { id: id.clone(), surface });
        if surface == MinimapSurface::Overlay {
            self.set_minimap_overlay(false);
        }
        Some(id)
    }

    /// One frame: apply a finished load, advance the camera, draw the field and its minimaps.
    pub fn frame(&mut self) -> Result<()> {
        self.poll_load()?;
        let Some(scene) = self.scene.as_mut() else {
            return Ok(());
        };
        scene.motion.update(&mut scene.camera);
        let view = FrameView {
            camera: &scene.camera,
            viewport: self.viewport,
            hovered: scene.hovered_marker(),
            selected_id: self.selected.as_ref().map(|record| record.id.as_str()),
        };
        self.renderer.render(&view);

        let mut surfaces = vec![MinimapSurface::Inline];
        if self.overlay_open {
            surfaces.push(MinimapSurface::Overlay);
        }
        for surface in surfaces {
            if let Some(minimap) = self.minimap_frame(surface) {
                self.renderer.render_minimap(surface, &minimap);
            }
        }
        Ok(())
    }

    fn set_status(&mut self, status: String) {
        if self.status != status {
            self.status = status.clone();
            self.events.push(FieldEvent::StatusChanged { status });
        }
    }
}

impl<R: SceneRenderer> Drop for MemorialField<R> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::HeadlessRenderer;

    fn field(records: usize) -> MemorialField<HeadlessRenderer> {
        let mut field = MemorialField::new(FieldConfig::default(), HeadlessRenderer::new());
        field.resize(PhysicalSize::new(1280, 720));
        let records = (0..records).map(|i| Record::new(format!("id{i}"), format!("Name {i}"), "")).collect();
        field.set_records(records).expect("scene builds");
        field
    }

    #[test]
    fn empty_record_set_mounts_nothing() {
        let mut field = field(0);
        assert!(!field.is_mounted());
        field.pointer_down(Vec2::new(10.0, 10.0));
        field.pointer_up(Vec2::new(10.0, 10.0));
        assert!(field.minimap_frame(MinimapSurface::Inline).is_none());
        assert!(field.minimap_click(MinimapSurface::Inline, Vec2::splat(100.0)).is_none());
        field.frame().expect("frame without scene");
        assert!(field.selected().is_none());
    }

    #[test]
    fn rebuild_releases_previous_markers() {
        let mut field = field(4);
        assert_eq!(field.renderer().live_visuals(), 4);
        field.set_records(vec![Record::new("x", "X", "")]).expect("rebuild");
        assert_eq!(field.renderer().live_visuals(), 1);
        assert_eq!(field.renderer().released(), 4);
    }

    #[test]
    fn failed_build_releases_partial_scene() {
        let mut field = MemorialField::new(FieldConfig::default(), HeadlessRenderer::failing_after(2));
        let records = (0..5).map(|i| Record::new(format!("id{i}"), "n", "")).collect();
        assert!(field.set_records(records).is_err());
        assert!(!field.is_mounted());
        assert_eq!(field.renderer().live_visuals(), 0);
        assert_eq!(field.renderer().released(), 2);
    }

    #[test]
    fn teardown_releases_everything() {
        let mut field = field(3);
        field.set_minimap_overlay(true);
        field.teardown();
        assert!(!field.is_mounted());
        assert!(!field.overlay_open());
        assert_eq!(field.renderer().live_visuals(), 0);
        assert!(!field.focus_on("id0"));
    }

    #[test]
    fn torn_down_field_ignores_search_selection() {
        let mut field = field(3);
        assert!(field.focus_on("id1"));
        field.teardown();
        field.drain_events();
        assert!(field.selected().is_none());
        assert!(field.search("Name").is_empty());
        assert!(!field.search_select("id1"));
        assert!(field.selected().is_none());
        assert!(field.minimap_click(MinimapSurface::Inline, Vec2::splat(100.0)).is_none());
        assert!(field.drain_events().is_empty());
    }

    #[test]
    fn configured_cap_never_exceeds_visible_limit() {
        let mut config = FieldConfig::default();
        config.layout.max_markers = 500;
        let mut field = MemorialField::new(config, HeadlessRenderer::new());
        let records = (0..200).map(|i| Record::new(format!("id{i}"), "n", "")).collect();
        field.set_records(records).expect("scene builds");
        assert_eq!(field.marker_count(), MAX_VISIBLE_RECORDS);
        assert_eq!(field.registry().map(MarkerRegistry::len), Some(MAX_VISIBLE_RECORDS));
        assert!(field.focus_on("id159"));
        assert!(!field.focus_on("id160"));
    }

    #[test]
    fn search_select_without_scene_selects_directly() {
        let mut field = MemorialField::new(FieldConfig::default(), HeadlessRenderer::new());
        field.records = vec![Record::new("a", "Alpha", "")];
        assert!(field.search_select("a"));
        assert_eq!(field.selected().map(|r| r.id.as_str()), Some("a"));
        assert!(!field.search_select("missing"));
    }

    #[test]
    fn open_overlay_is_drawn_alongside_inline_minimap() {
        let mut field = field(100);
        field.open_minimap_overlay();
        field.frame().expect("frame");
        let minimaps = field.renderer().minimaps();
        let surfaces: Vec<_> = minimaps.iter().map(|(surface, _)| *surface).collect();
        assert_eq!(surfaces, vec![MinimapSurface::Inline, MinimapSurface::Overlay]);
        let highlight = field.config().minimap.highlight_count;
        assert!(minimaps.iter().all(|(_, minimap)| minimap.dots.len() == highlight.min(100)));
        assert_eq!(minimaps[1].1.canvas, MinimapSurface::Overlay.size(&field.config().minimap));

        field.close_minimap_overlay();
        field.frame().expect("frame");
        assert_eq!(field.renderer().minimaps().len(), 1);
    }

    #[test]
    fn wheel_takes_manual_control() {
        let mut field = field(2);
        assert!(field.focus_on("id1"));
        assert!(matches!(field.camera_motion(), Some(CameraMotion::Following(_))));
        field.wheel(1.0);
        assert_eq!(field.camera_motion(), Some(CameraMotion::Idle));
    }

    #[test]
    fn frame_renders_and_advances_camera() {
        let mut field = field(1);
        let start = field.camera().map(|c| c.position).expect("camera");
        field.focus_on("id0");
        field.frame().expect("frame");
        assert_eq!(field.renderer().frames(), 1);
        let minimaps = field.renderer().minimaps();
        assert_eq!(minimaps.len(), 1);
        assert_eq!(minimaps[0].0, MinimapSurface::Inline);
        assert_eq!(minimaps[0].1.dots.len(), 1);
        assert!(minimaps[0].1.camera.is_some());
        let moved = field.camera().map(|c| c.position).expect("camera");
        assert_ne!(start, moved);
    }
}
