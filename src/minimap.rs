use glam::{Vec2, Vec3};

use crate::config::MinimapConfig;
use crate::layout::Layout;

/// The two canvases that show the overview. Both share one projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MinimapSurface {
    Inline,
    Overlay,
}

impl MinimapSurface {
    pub fn size(self, config: &MinimapConfig) -> Vec2 {
        let side = match self {
            MinimapSurface::Inline => config.inline_size,
            MinimapSurface::Overlay => config.overlay_size,
        };
        Vec2::splat(side as f32)
    }
}

/// Maps the ground plane (x, z) to canvas pixels and back, over the square the layout occupies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimapProjector {
    bounds: f32,
}

impl MinimapProjector {
    pub fn new(bounds: f32) -> Self {
        Self { bounds }
    }

    pub fn for_layout(layout: &Layout) -> Self {
        Self::new(layout.bounds())
    }

    pub fn bounds(&self) -> f32 {
        self.bounds
    }

    /// World (x, z) to [0, 1] on each axis; `None` for an empty layout.
    pub fn normalize(&self, world: Vec2) -> Option<Vec2> {
        if self.bounds <= f32::EPSILON {
            return None;
        }
        let half = self.bounds / 2.0;
        Some((world + Vec2::splat(half)) / self.bounds)
    }

    pub fn project(&self, world: Vec3, canvas: Vec2) -> Option<Vec2> {
        self.normalize(Vec2::new(world.x, world.z)).map(|n| n * canvas)
    }

    /// Canvas pixel back to world (x, z).
    pub fn unproject(&self, point: Vec2, canvas: Vec2) -> Option<Vec2> {
        if self.bounds <= f32::EPSILON || canvas.x <= 0.0 || canvas.y <= 0.0 {
            return None;
        }
        let half = self.bounds / 2.0;
        Some(point / canvas * self.bounds - Vec2::splat(half))
    }
}

/// Index of the position closest to `target` on the ground plane. Ties keep the earliest.
pub fn nearest_on_ground(positions: impl IntoIterator<Item = Vec3>, target: Vec2) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (index, position) in positions.into_iter().enumerate() {
        let dx = position.x - target.x;
        let dz = position.z - target.y;
        let distance = dx * dx + dz * dz;
        if best.map_or(true, |(_, best_distance)| distance < best_distance) {
            best = Some((index, distance));
        }
    }
    best.map(|(index, _)| index)
}

/// What one minimap redraw needs: marker dots and the camera dot, in canvas pixels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MinimapFrame {
    pub canvas: Vec2,
    pub dots: Vec<Vec2>,
    pub camera: Option<Vec2>,
}

impl MinimapFrame {
    /// Only the first `highlight_count` markers are drawn as dots.
    pub fn build(
        projector: &MinimapProjector,
        canvas: Vec2,
        positions: impl IntoIterator<Item = Vec3>,
        highlight_count: usize,
        camera_position: Vec3,
    ) -> Self {
        let dots = positions
            .into_iter()
            .take(highlight_count)
            .filter_map(|position| projector.project(position, canvas))
            .collect();
        Self { canvas, dots, camera: projector.project(camera_position, canvas) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_projects_to_canvas_center() {
        let projector = MinimapProjector::new(6.8);
        let point = projector.project(Vec3::new(0.0, 3.0, 0.0), Vec2::splat(200.0)).expect("projects");
        assert!((point - Vec2::splat(100.0)).length() < 1e-4);
    }

    #[test]
    fn corners_map_to_canvas_edges() {
        let projector = MinimapProjector::new(10.0);
        let canvas = Vec2::new(240.0, 120.0);
        let min = projector.project(Vec3::new(-5.0, 0.0, -5.0), canvas).expect("min");
        let max = projector.project(Vec3::new(5.0, 0.0, 5.0), canvas).expect("max");
        assert!(min.length() < 1e-4);
        assert!((max - canvas).length() < 1e-3);
    }

    #[test]
    fn unproject_inverts_project() {
        let projector = MinimapProjector::new(13.0 * 3.4);
        let canvas = Vec2::splat(240.0);
        let world = Vec3::new(-7.3, 0.0, 12.1);
        let pixel = projector.project(world, canvas).expect("projects");
        let back = projector.unproject(pixel, canvas).expect("unprojects");
        assert!((back - Vec2::new(world.x, world.z)).length() < 1e-3);
    }

    #[test]
    fn empty_bounds_project_nothing() {
        let projector = MinimapProjector::new(0.0);
        assert!(projector.project(Vec3::ZERO, Vec2::splat(200.0)).is_none());
        assert!(projector.unproject(Vec2::ZERO, Vec2::splat(200.0)).is_none());
    }

    #[test]
    fn nearest_prefers_first_on_tie() {
        let positions = [Vec3::new(1.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0)];
        assert_eq!(nearest_on_ground(positions, Vec2::ZERO), Some(0));
        assert_eq!(nearest_on_ground(positions, Vec2::new(2.9, 0.0)), Some(2));
        assert_eq!(nearest_on_ground(std::iter::empty(), Vec2::ZERO), None);
    }

    #[test]
    fn frame_limits_dots() {
        let projector = MinimapProjector::new(10.0);
        let positions = (0..5).map(|i| Vec3::new(i as f32, 0.0, 0.0));
        let frame = MinimapFrame::build(&projector, Vec2::splat(100.0), positions, 3, Vec3::ZERO);
        assert_eq!(frame.dots.len(), 3);
        assert_eq!(frame.camera, Some(Vec2::splat(50.0)));
    }
}
