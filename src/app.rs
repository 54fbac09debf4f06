use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use glam::Vec2;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::audio::{AmbientAudio, DroneTone, RodioDrone};
use crate::config::{AppConfig, MinimapConfig};
use crate::field::MemorialField;
use crate::input::{KeyAction, KeyBindings, PointerEvent, PointerInput, SearchKeyOutcome, SearchPrompt};
use crate::minimap::MinimapSurface;
use crate::record::JsonFileSource;
use crate::scene::HeadlessRenderer;

const FRAME_INTERVAL: Duration = Duration::from_millis(16);

pub fn run(config: AppConfig) -> Result<()> {
    let event_loop = EventLoop::new().context("Failed to create winit event loop")?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app).context("Event loop execution failed")?;
    Ok(())
}

/// Which minimap square, if any, contains `point`, and the point in that canvas's pixels.
/// The open overlay covers the inline square.
pub fn minimap_region(
    window: PhysicalSize<u32>,
    overlay_open: bool,
    config: &MinimapConfig,
    point: Vec2,
) -> Option<(MinimapSurface, Vec2)> {
    let window = Vec2::new(window.width as f32, window.height as f32);
    let (surface, origin) = if overlay_open {
        let size = MinimapSurface::Overlay.size(config);
        (MinimapSurface::Overlay, (window - size) * 0.5)
    } else {
        let size = MinimapSurface::Inline.size(config);
        (MinimapSurface::Inline, window - size)
    };
    let local = point - origin;
    let size = surface.size(config);
    let inside = local.x >= 0.0 && local.y >= 0.0 && local.x <= size.x && local.y <= size.y;
    inside.then_some((surface, local))
}

pub struct App {
    config: AppConfig,
    window: Option<Arc<Window>>,
    field: MemorialField<HeadlessRenderer>,
    pointer: PointerInput,
    bindings: KeyBindings,
    search: SearchPrompt,
    audio: AmbientAudio<RodioDrone>,
    minimap_press: bool,
    load_started: bool,
    should_close: bool,
    title: String,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        let field = MemorialField::new(config.field(), HeadlessRenderer::new());
        let pointer = PointerInput::new(&config.interaction);
        let bindings = KeyBindings::from_config(&config.bindings);
        let audio = AmbientAudio::new(RodioDrone::new(), DroneTone::from_config(&config.audio));
        let title = config.window.title.clone();
        Self {
            config,
            window: None,
            field,
            pointer,
            bindings,
            search: SearchPrompt::default(),
            audio,
            minimap_press: false,
            load_started: false,
            should_close: false,
            title,
        }
    }

    fn ensure_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        if self.window.is_some() {
            return Ok(());
        }
        let size = PhysicalSize::new(self.config.window.width, self.config.window.height);
        let attrs = Window::default_attributes().with_title(self.title.clone()).with_inner_size(size);
        let window = Arc::new(event_loop.create_window(attrs).context("Failed to create window")?);
        self.field.resize(window.inner_size());
        self.window = Some(window);
        Ok(())
    }

    fn route_pointer(&mut self, event: PointerEvent) {
        let viewport = self.field.viewport();
        let minimap = &self.config.minimap;
        match event {
            PointerEvent::Down { position } => {
                if let Some((surface, local)) =
                    minimap_region(viewport, self.field.overlay_open(), minimap, position)
                {
                    self.minimap_press = true;
                    if let Some(id) = self.field.minimap_click(surface, local) {
                        log::debug!("minimap jump to {id}");
                    }
                    return;
                }
            }
            PointerEvent::Up { .. } | PointerEvent::DoubleClick { .. } if self.minimap_press => {
                if matches!(event, PointerEvent::Up { .. }) {
                    self.minimap_press = false;
                }
                return;
            }
            _ => {}
        }
        self.field.handle_pointer(event);
    }

    fn handle_key(&mut self, event: &KeyEvent) {
        if event.state != ElementState::Pressed {
            return;
        }
        if self.search.is_open() {
            match self.search.handle_key(&event.logical_key) {
                SearchKeyOutcome::Submit => {
                    let first = self.field.search(self.search.query()).first().map(|record| record.id.clone());
                    if let Some(id) = first {
                        self.field.search_select(&id);
                    }
                    self.search.close();
                }
                SearchKeyOutcome::Edited => {
                    let matches = self.field.search(self.search.query()).len();
                    log::debug!("search '{}': {matches} matches", self.search.query());
                }
                SearchKeyOutcome::Closed | SearchKeyOutcome::Ignored => {}
            }
            return;
        }
        match self.bindings.action_for(&event.logical_key) {
            Some(KeyAction::ToggleAmbient) => {
                self.audio.toggle();
            }
            Some(KeyAction::ToggleMinimap) => {
                let open = !self.field.overlay_open();
                self.field.set_minimap_overlay(open);
            }
            Some(KeyAction::BeginSearch) => self.search.open(),
            Some(KeyAction::ClearSelection) => {
                if self.field.overlay_open() {
                    self.field.close_minimap_overlay();
                } else {
                    self.field.clear_selection();
                }
            }
            None => {}
        }
    }

    fn compose_title(&self) -> String {
        let mut title = format!("{} - {}", self.config.window.title, self.field.status());
        if let Some(name) = self.field.hovered_name() {
            title.push_str(&format!(" | {name}"));
        }
        if let Some(record) = self.field.selected() {
            title.push_str(&format!(" | selected: {}", record.display_name()));
            if let Some(note) = record.note.as_deref().filter(|note| !note.is_empty()) {
                title.push_str(&format!(" ({note})"));
            }
        }
        if self.search.is_open() {
            let matches = self.field.search(self.search.query()).len();
            title.push_str(&format!(" | search: {}_ ({matches})", self.search.query()));
        }
        if self.audio.is_on() {
            title.push_str(" | ambient");
        }
        title
    }

    fn refresh_title(&mut self) {
        let title = self.compose_title();
        if title != self.title {
            if let Some(window) = &self.window {
                window.set_title(&title);
            }
            self.title = title;
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Err(err) = self.ensure_window(event_loop) {
            log::error!("window initialization error: {err:?}");
            self.should_close = true;
            return;
        }
        if !self.load_started {
            self.load_started = true;
            log::info!("loading records from {}", self.config.records.path.display());
            self.field.begin_load(JsonFileSource::new(self.config.records.path.clone()));
            if self.config.audio.enabled_on_start {
                self.audio.set_enabled(true);
            }
        }
    }

    fn window_event(&mut self, _el: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match &event {
            WindowEvent::CloseRequested => self.should_close = true,
            WindowEvent::Resized(size) => self.field.resize(*size),
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(event),
            _ => {
                for pointer_event in self.pointer.translate(&event, Instant::now()) {
                    self.route_pointer(pointer_event);
                }
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_close {
            event_loop.exit();
            return;
        }
        if let Err(err) = self.field.frame() {
            log::error!("frame failed: {err:?}");
            self.should_close = true;
        }
        for event in self.field.drain_events() {
            log::debug!("{event}");
        }
        self.refresh_title();
        event_loop.set_control_flow(ControlFlow::wait_duration(FRAME_INTERVAL));
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.audio.set_enabled(false);
        self.field.teardown();
        log::info!("shut down");
    }
}
