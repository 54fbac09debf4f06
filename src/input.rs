use glam::Vec2;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{Key, NamedKey};

use crate::config::InteractionConfig;

const PIXELS_PER_WHEEL_LINE: f32 = 40.0;

/// Pointer input as the interaction engine sees it, in window pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { position: Vec2 },
    Move { position: Vec2 },
    Up { position: Vec2 },
    DoubleClick { position: Vec2 },
    /// Positive values scroll toward the scene.
    Wheel { delta: f32 },
    Left,
}

/// Translates raw window events into pointer events and synthesises double-clicks.
#[derive(Debug, Clone)]
pub struct PointerInput {
    drag_threshold_sq: f32,
    double_click_window: Duration,
    cursor: Option<Vec2>,
    press: Option<Vec2>,
    last_click: Option<(Instant, Vec2)>,
}

impl PointerInput {
    pub fn new(config: &InteractionConfig) -> Self {
        Self {
            drag_threshold_sq: config.drag_threshold_sq(),
            double_click_window: Duration::from_millis(config.double_click_ms),
            cursor: None,
            press: None,
            last_click: None,
        }
    }

    pub fn cursor(&self) -> Option<Vec2> {
        self.cursor
    }

    pub fn is_pressed(&self) -> bool {
        self.press.is_some()
    }

    pub fn translate(&mut self, event: &WindowEvent, now: Instant) -> Vec<PointerEvent> {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_moved(Vec2::new(position.x as f32, position.y as f32))
            }
            WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => {
                self.left_button(*state == ElementState::Pressed, now)
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_WHEEL_LINE,
                };
                self.wheel(lines)
            }
            WindowEvent::CursorLeft { .. } => self.left(),
            _ => Vec::new(),
        }
    }

    pub fn cursor_moved(&mut self, position: Vec2) -> Vec<PointerEvent> {
        self.cursor = Some(position);
        vec![PointerEvent::Move { position }]
    }

    /// Press and release at the last known cursor position; ignored before the cursor is seen.
    pub fn left_button(&mut self, pressed: bool, now: Instant) -> Vec<PointerEvent> {
        let Some(position) = self.cursor else {
            return Vec::new();
        };
        if pressed {
            self.press = Some(position);
            return vec![PointerEvent::Down { position }];
        }
        let Some(down) = self.press.take() else {
            return Vec::new();
        };
        let mut events = vec![PointerEvent::Up { position }];
        if position.distance_squared(down) > self.drag_threshold_sq {
            self.last_click = None;
            return events;
        }
        match self.last_click.take() {
            Some((at, first))
                if now.saturating_duration_since(at) <= self.double_click_window
                    && position.distance_squared(first) <= self.drag_threshold_sq =>
            {
                events.push(PointerEvent::DoubleClick { position });
            }
            _ => self.last_click = Some((now, position)),
        }
        events
    }

    pub fn wheel(&mut self, delta: f32) -> Vec<PointerEvent> {
        if delta.abs() <= f32::EPSILON {
            return Vec::new();
        }
        vec![PointerEvent::Wheel { delta }]
    }

    pub fn left(&mut self) -> Vec<PointerEvent> {
        self.cursor = None;
        self.press = None;
        vec![PointerEvent::Left]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    ToggleAmbient,
    ToggleMinimap,
    BeginSearch,
    ClearSelection,
}

impl KeyAction {
    fn from_str(value: &str) -> Option<Self> {
        match value {
            "toggle_ambient" => Some(Self::ToggleAmbient),
            "toggle_minimap" => Some(Self::ToggleMinimap),
            "begin_search" => Some(Self::BeginSearch),
            "clear_selection" => Some(Self::ClearSelection),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum NamedKeyCode {
    Escape,
    Enter,
    Space,
    Tab,
}

impl NamedKeyCode {
    fn from_named_key(key: &NamedKey) -> Option<Self> {
        match key {
            NamedKey::Escape => Some(Self::Escape),
            NamedKey::Enter => Some(Self::Enter),
            NamedKey::Space => Some(Self::Space),
            NamedKey::Tab => Some(Self::Tab),
            _ => None,
        }
    }

    fn from_str(value: &str) -> Option<Self> {
        match value {
            "escape" | "esc" => Some(Self::Escape),
            "enter" | "return" => Some(Self::Enter),
            "space" => Some(Self::Space),
            "tab" => Some(Self::Tab),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyBinding {
    Character(String),
    Named(NamedKeyCode),
}

impl KeyBinding {
    fn character(ch: &str) -> Self {
        Self::Character(ch.to_lowercase())
    }

    fn from_event_key(key: &Key) -> Option<Self> {
        match key {
            Key::Character(ch) if !ch.is_empty() => Some(Self::Character(ch.to_lowercase())),
            Key::Named(named) => NamedKeyCode::from_named_key(named).map(Self::Named),
            _ => None,
        }
    }

    fn from_config_value(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase();
        if let Some(named) = NamedKeyCode::from_str(&normalized) {
            return Some(Self::Named(named));
        }
        (normalized.chars().count() == 1).then_some(Self::Character(normalized))
    }
}

/// Key to action lookup. Config entries replace the default keys of their action.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    key_to_action: HashMap<KeyBinding, KeyAction>,
}

impl KeyBindings {
    pub fn from_config(bindings: &HashMap<String, Vec<String>>) -> Self {
        let mut action_map = Self::default_action_map();
        for (action_name, keys) in bindings {
            let Some(action) = KeyAction::from_str(&action_name.trim().to_lowercase()) else {
                log::warn!("unknown key action '{action_name}', ignoring");
                continue;
            };
            let mut parsed = Vec::new();
            for key in keys {
                match KeyBinding::from_config_value(key) {
                    Some(binding) => parsed.push(binding),
                    None => log::warn!("unknown key '{key}' for action '{action_name}', ignoring"),
                }
            }
            if parsed.is_empty() {
                log::warn!("action '{action_name}' has no valid keys, keeping defaults");
                continue;
            }
            action_map.insert(action, parsed);
        }
        Self::from_action_map(action_map)
    }

    fn default_action_map() -> HashMap<KeyAction, Vec<KeyBinding>> {
        let mut map = HashMap::new();
        map.insert(KeyAction::ToggleAmbient, vec![KeyBinding::character("a")]);
        map.insert(KeyAction::ToggleMinimap, vec![KeyBinding::character("m")]);
        map.insert(KeyAction::BeginSearch, vec![KeyBinding::character("/")]);
        map.insert(KeyAction::ClearSelection, vec![KeyBinding::Named(NamedKeyCode::Escape)]);
        map
    }

    fn from_action_map(action_map: HashMap<KeyAction, Vec<KeyBinding>>) -> Self {
        let mut key_to_action = HashMap::new();
        for (action, keys) in action_map {
            for key in keys {
                key_to_action.insert(key, action);
            }
        }
        Self { key_to_action }
    }

    pub fn action_for(&self, key: &Key) -> Option<KeyAction> {
        KeyBinding::from_event_key(key).and_then(|binding| self.key_to_action.get(&binding).copied())
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::from_action_map(Self::default_action_map())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchKeyOutcome {
    Edited,
    Submit,
    Closed,
    Ignored,
}

/// The text prompt shown while searching. Owns keyboard input until closed.
#[derive(Debug, Clone, Default)]
pub struct SearchPrompt {
    open: bool,
    query: String,
}

impl SearchPrompt {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn open(&mut self) {
        self.open = true;
        self.query.clear();
    }

    pub fn close(&mut self) {
        self.open = false;
        self.query.clear();
    }

    pub fn handle_key(&mut self, key: &Key) -> SearchKeyOutcome {
        if !self.open {
            return SearchKeyOutcome::Ignored;
        }
        match key {
            Key::Named(NamedKey::Escape) => {
                self.close();
                SearchKeyOutcome::Closed
            }
            Key::Named(NamedKey::Enter) => SearchKeyOutcome::Submit,
            Key::Named(NamedKey::Backspace) => {
                self.query.pop();
                SearchKeyOutcome::Edited
            }
            Key::Named(NamedKey::Space) => {
                self.query.push(' ');
                SearchKeyOutcome::Edited
            }
            Key::Character(text) => {
                self.query.extend(text.chars().filter(|ch| !ch.is_control()));
                SearchKeyOutcome::Edited
            }
            _ => SearchKeyOutcome::Ignored,
        }
    }
}
