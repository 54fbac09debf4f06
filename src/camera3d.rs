use glam::{Mat4, Vec2, Vec3, Vec4};
use winit::dpi::PhysicalSize;

use crate::config::CameraConfig;

const DEFAULT_UP: Vec3 = Vec3::Y;
const MIN_POLAR_ANGLE: f32 = 0.01;

/// Perspective camera looking from `position` toward `target`.
#[derive(Debug, Clone)]
pub struct Camera3D {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_radians: f32,
    pub near: f32,
    pub far: f32,
    aspect: f32,
}

impl Camera3D {
    pub fn new(position: Vec3, target: Vec3, fov_y_radians: f32, near: f32, far: f32) -> Self {
        Self { position, target, up: DEFAULT_UP, fov_y_radians, near, far, aspect: 1.0 }
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        Self::new(
            config.start_position,
            config.start_look_at,
            config.fov_degrees.to_radians(),
            config.near,
            config.far,
        )
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Tracks the hosting viewport; a zero-height viewport keeps the previous aspect.
    pub fn set_viewport(&mut self, viewport: PhysicalSize<u32>) {
        if viewport.width > 0 && viewport.height > 0 {
            self.aspect = viewport.width as f32 / viewport.height as f32;
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y_radians, self.aspect.max(0.0001), self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// World-space ray from the camera through a pixel of the viewport.
    pub fn screen_ray(&self, screen: Vec2, viewport: PhysicalSize<u32>) -> Option<(Vec3, Vec3)> {
        let ndc = screen_to_ndc(screen, viewport)?;
        let world = self.view_projection().inverse() * Vec4::new(ndc.x, ndc.y, 1.0, 1.0);
        if world.w.abs() < f32::EPSILON {
            return None;
        }
        let toward = (world.truncate() / world.w) - self.position;
        if toward.length_squared() <= f32::EPSILON {
            return None;
        }
        Some((self.position, toward.normalize()))
    }

    /// Pixel position of a world point, or `None` when it sits behind the camera.
    pub fn project_point(&self, point: Vec3, viewport: PhysicalSize<u32>) -> Option<Vec2> {
        if viewport.width == 0 || viewport.height == 0 {
            return None;
        }
        let clip = self.view_projection() * point.extend(1.0);
        if clip.w <= f32::EPSILON {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        let x = (ndc.x + 1.0) * 0.5 * viewport.width as f32;
        let y = (1.0 - ndc.y) * 0.5 * viewport.height as f32;
        Some(Vec2::new(x, y))
    }
}

/// Normalized device coordinates of a pixel, y up.
pub fn screen_to_ndc(screen: Vec2, viewport: PhysicalSize<u32>) -> Option<Vec2> {
    if viewport.width == 0 || viewport.height == 0 {
        return None;
    }
    Some(Vec2::new(
        (2.0 * screen.x / viewport.width as f32) - 1.0,
        1.0 - (2.0 * screen.y / viewport.height as f32),
    ))
}

/// Direct manual control: rotates the camera around its look-at point and dollies along the view axis.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub min_distance: f32,
    pub max_distance: f32,
    pub max_polar_angle: f32,
}

impl OrbitControls {
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            min_distance: config.min_distance,
            max_distance: config.max_distance.max(config.min_distance),
            max_polar_angle: config.max_polar_angle.clamp(MIN_POLAR_ANGLE, std::f32::consts::PI),
        }
    }

    /// Pixel drag delta to rotation; a full viewport height of travel is one full turn.
    pub fn rotate(&self, camera: &mut Camera3D, delta: Vec2, viewport: PhysicalSize<u32>) {
        if viewport.height == 0 {
            return;
        }
        let per_pixel = std::f32::consts::TAU / viewport.height as f32;
        let (radius, azimuth, polar) = spherical(camera.position - camera.target);
        let azimuth = azimuth - delta.x * per_pixel;
        let polar = (polar - delta.y * per_pixel).clamp(MIN_POLAR_ANGLE, self.max_polar_angle);
        camera.position = camera.target + from_spherical(radius, azimuth, polar);
    }

    /// Multiplies the look-at distance by `factor`, within the configured limits.
    pub fn dolly(&self, camera: &mut Camera3D, factor: f32) {
        let offset = camera.position - camera.target;
        let (radius, azimuth, polar) = spherical(offset);
        let radius = (radius * factor.max(0.0001)).clamp(self.min_distance, self.max_distance);
        camera.position = camera.target + from_spherical(radius, azimuth, polar);
    }

    /// Scroll wheel notches to a dolly factor; positive scrolls move closer.
    pub fn zoom_wheel(&self, camera: &mut Camera3D, wheel_delta: f32) {
        self.dolly(camera, (-wheel_delta * 0.1).exp());
    }
}

fn spherical(offset: Vec3) -> (f32, f32, f32) {
    let radius = offset.length();
    if radius <= f32::EPSILON {
        return (0.0, 0.0, MIN_POLAR_ANGLE);
    }
    let azimuth = offset.x.atan2(offset.z);
    let polar = (offset.y / radius).clamp(-1.0, 1.0).acos();
    (radius, azimuth, polar)
}

fn from_spherical(radius: f32, azimuth: f32, polar: f32) -> Vec3 {
    let sin_polar = polar.sin();
    Vec3::new(radius * sin_polar * azimuth.sin(), radius * polar.cos(), radius * sin_polar * azimuth.cos())
}
