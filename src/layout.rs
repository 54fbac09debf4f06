use crate::config::LayoutConfig;
use crate::record::Record;
use glam::Vec3;

/// Text lengths past this stop growing the marker.
pub const TEXT_LEN_CLAMP: usize = 240;
pub const MIN_HEIGHT_SCALE: f32 = 1.7;
pub const MAX_HEIGHT_SCALE: f32 = 2.4;
/// Body half-height in unscaled marker space; the marker rests on the ground plane.
pub const BODY_HALF_HEIGHT: f32 = 0.95;

/// Derived position and size of one visible record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub index: usize,
    pub row: usize,
    pub col: usize,
    pub position: Vec3,
    pub height_scale: f32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layout {
    pub placements: Vec<Placement>,
    pub side: usize,
    pub spacing: f32,
}

impl Layout {
    /// Edge length of the square the grid occupies, shared with the minimap.
    pub fn bounds(&self) -> f32 {
        self.side as f32 * self.spacing
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }
}

pub fn height_scale(text_len: usize) -> f32 {
    let clamped = text_len.min(TEXT_LEN_CLAMP) as f32;
    MIN_HEIGHT_SCALE + (clamped / TEXT_LEN_CLAMP as f32) * (MAX_HEIGHT_SCALE - MIN_HEIGHT_SCALE)
}

/// Side length of the square grid holding `count` markers.
pub fn grid_side(count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    let mut side = (count as f64).sqrt().ceil() as usize;
    while side * side < count {
        side += 1;
    }
    while side > 1 && (side - 1) * (side - 1) >= count {
        side -= 1;
    }
    side
}

/// Places one marker per record on a jittered square grid centred on the origin.
pub fn layout(records: &[Record], config: &LayoutConfig) -> Layout {
    let count = records.len();
    let side = grid_side(count);
    let spacing = config.spacing;
    if side == 0 {
        return Layout { placements: Vec::new(), side, spacing };
    }
    let start = -((side - 1) as f32) * spacing * 0.5;
    let placements = records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let row = index / side;
            let col = index % side;
            let x = start + col as f32 * spacing + (row % 2) as f32 * config.jitter;
            let z = start + row as f32 * spacing + (col % 2) as f32 * config.jitter;
            let height_scale = height_scale(record.text_len());
            Placement {
                index,
                row,
                col,
                position: Vec3::new(x, BODY_HALF_HEIGHT * height_scale, z),
                height_scale,
            }
        })
        .collect();
    Layout { placements, side, spacing }
}
