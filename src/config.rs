use anyhow::{Context, Result};
use glam::Vec3;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::record::MAX_VISIBLE_RECORDS;

#[derive(Debug, Clone, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "WindowConfig::default_title")]
    pub title: String,
    #[serde(default = "WindowConfig::default_width")]
    pub width: u32,
    #[serde(default = "WindowConfig::default_height")]
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordsConfig {
    #[serde(default = "RecordsConfig::default_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "LayoutConfig::default_spacing")]
    pub spacing: f32,
    #[serde(default = "LayoutConfig::default_jitter")]
    pub jitter: f32,
    #[serde(default = "LayoutConfig::default_max_markers")]
    pub max_markers: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionConfig {
    #[serde(default = "InteractionConfig::default_drag_threshold_px")]
    pub drag_threshold_px: f32,
    #[serde(default = "InteractionConfig::default_double_click_ms")]
    pub double_click_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "CameraConfig::default_fov_degrees")]
    pub fov_degrees: f32,
    #[serde(default = "CameraConfig::default_near")]
    pub near: f32,
    #[serde(default = "CameraConfig::default_far")]
    pub far: f32,
    #[serde(default = "CameraConfig::default_start_position")]
    pub start_position: Vec3,
    #[serde(default = "CameraConfig::default_start_look_at")]
    pub start_look_at: Vec3,
    #[serde(default = "CameraConfig::default_damping")]
    pub damping: f32,
    #[serde(default = "CameraConfig::default_zoom_offset")]
    pub zoom_offset: Vec3,
    #[serde(default = "CameraConfig::default_travel_offset")]
    pub travel_offset: Vec3,
    #[serde(default = "CameraConfig::default_look_offset")]
    pub look_offset: Vec3,
    #[serde(default = "CameraConfig::default_min_distance")]
    pub min_distance: f32,
    #[serde(default = "CameraConfig::default_max_distance")]
    pub max_distance: f32,
    #[serde(default = "CameraConfig::default_max_polar_angle")]
    pub max_polar_angle: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MinimapConfig {
    #[serde(default = "MinimapConfig::default_inline_size")]
    pub inline_size: u32,
    #[serde(default = "MinimapConfig::default_overlay_size")]
    pub overlay_size: u32,
    #[serde(default = "MinimapConfig::default_highlight_count")]
    pub highlight_count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    #[serde(default)]
    pub enabled_on_start: bool,
    #[serde(default = "AudioConfig::default_base_gain")]
    pub base_gain: f32,
    #[serde(default = "AudioConfig::default_frequencies_hz")]
    pub frequencies_hz: Vec<f32>,
    #[serde(default = "AudioConfig::default_lowpass_hz")]
    pub lowpass_hz: u32,
}

/// Geometry and timing knobs the interaction engine needs, without window or audio settings.
#[derive(Debug, Clone, Default)]
pub struct FieldConfig {
    pub layout: LayoutConfig,
    pub interaction: InteractionConfig,
    pub camera: CameraConfig,
    pub minimap: MinimapConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub records: RecordsConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub interaction: InteractionConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub minimap: MinimapConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub bindings: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct AppConfigOverrides {
    pub records: Option<PathBuf>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub ambient: Option<bool>,
}

impl WindowConfig {
    fn default_title() -> String {
        "Memorial Grounds".to_string()
    }

    const fn default_width() -> u32 {
        1280
    }

    const fn default_height() -> u32 {
        720
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { title: Self::default_title(), width: Self::default_width(), height: Self::default_height() }
    }
}

impl RecordsConfig {
    fn default_path() -> PathBuf {
        PathBuf::from("assets/records.json")
    }
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self { path: Self::default_path() }
    }
}

impl LayoutConfig {
    const fn default_spacing() -> f32 {
        3.4
    }

    const fn default_jitter() -> f32 {
        0.6
    }

    const fn default_max_markers() -> usize {
        MAX_VISIBLE_RECORDS
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            spacing: Self::default_spacing(),
            jitter: Self::default_jitter(),
            max_markers: Self::default_max_markers(),
        }
    }
}

impl InteractionConfig {
    const fn default_drag_threshold_px() -> f32 {
        12.0
    }

    const fn default_double_click_ms() -> u64 {
        500
    }

    pub fn drag_threshold_sq(&self) -> f32 {
        self.drag_threshold_px * self.drag_threshold_px
    }
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            drag_threshold_px: Self::default_drag_threshold_px(),
            double_click_ms: Self::default_double_click_ms(),
        }
    }
}

impl CameraConfig {
    const fn default_fov_degrees() -> f32 {
        48.0
    }

    const fn default_near() -> f32 {
        0.1
    }

    const fn default_far() -> f32 {
        200.0
    }

    const fn default_start_position() -> Vec3 {
        Vec3::new(0.0, 5.0, 14.0)
    }

    const fn default_start_look_at() -> Vec3 {
        Vec3::new(0.0, 1.2, 0.0)
    }

    const fn default_damping() -> f32 {
        0.05
    }

    const fn default_zoom_offset() -> Vec3 {
        Vec3::new(0.0, 1.6, 2.8)
    }

    const fn default_travel_offset() -> Vec3 {
        Vec3::new(0.0, 2.4, 5.2)
    }

    const fn default_look_offset() -> Vec3 {
        Vec3::new(0.0, 0.8, 0.0)
    }

    const fn default_min_distance() -> f32 {
        2.5
    }

    const fn default_max_distance() -> f32 {
        45.0
    }

    fn default_max_polar_angle() -> f32 {
        std::f32::consts::PI * 0.48
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: Self::default_fov_degrees(),
            near: Self::default_near(),
            far: Self::default_far(),
            start_position: Self::default_start_position(),
            start_look_at: Self::default_start_look_at(),
            damping: Self::default_damping(),
            zoom_offset: Self::default_zoom_offset(),
            travel_offset: Self::default_travel_offset(),
            look_offset: Self::default_look_offset(),
            min_distance: Self::default_min_distance(),
            max_distance: Self::default_max_distance(),
            max_polar_angle: Self::default_max_polar_angle(),
        }
    }
}

impl MinimapConfig {
    const fn default_inline_size() -> u32 {
        200
    }

    const fn default_overlay_size() -> u32 {
        240
    }

    const fn default_highlight_count() -> usize {
        81
    }
}

impl Default for MinimapConfig {
    fn default() -> Self {
        Self {
            inline_size: Self::default_inline_size(),
            overlay_size: Self::default_overlay_size(),
            highlight_count: Self::default_highlight_count(),
        }
    }
}

impl AudioConfig {
    const fn default_base_gain() -> f32 {
        0.04
    }

    fn default_frequencies_hz() -> Vec<f32> {
        vec![174.0, 220.0]
    }

    const fn default_lowpass_hz() -> u32 {
        400
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled_on_start: false,
            base_gain: Self::default_base_gain(),
            frequencies_hz: Self::default_frequencies_hz(),
            lowpass_hz: Self::default_lowpass_hz(),
        }
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                log::warn!("config load error: {err:?}; falling back to defaults");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &AppConfigOverrides) {
        if let Some(path) = &overrides.records {
            self.records.path = path.clone();
        }
        if let Some(width) = overrides.width {
            self.window.width = width;
        }
        if let Some(height) = overrides.height {
            self.window.height = height;
        }
        if let Some(ambient) = overrides.ambient {
            self.audio.enabled_on_start = ambient;
        }
    }

    pub fn field(&self) -> FieldConfig {
        FieldConfig {
            layout: self.layout.clone(),
            interaction: self.interaction.clone(),
            camera: self.camera.clone(),
            minimap: self.minimap.clone(),
        }
    }
}

impl AppConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.records.is_none() && self.width.is_none() && self.height.is_none() && self.ambient.is_none()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.records.is_some() {
            fields.push("records");
        }
        if self.width.is_some() {
            fields.push("width");
        }
        if self.height.is_some() {
            fields.push("height");
        }
        if self.ambient.is_some() {
            fields.push("ambient");
        }
        fields
    }
}
