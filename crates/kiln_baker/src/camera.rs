//! Pinhole camera for the ground truth preview.

use kiln_core::CameraPose;
use kiln_math::{Ray, Vec2, Vec3};

/// Camera for generating primary rays.
#[derive(Debug, Clone)]
pub struct Camera {
    pub image_width: u32,
    pub image_height: u32,

    look_from: Vec3,
    look_at: Vec3,
    vup: Vec3,
    /// Vertical field of view in degrees
    vfov: f32,

    // set by initialize()
    pixel00_loc: Vec3,
    pixel_delta_u: Vec3,
    pixel_delta_v: Vec3,
    w: Vec3,
}

impl Camera {
    pub fn new() -> Self {
        Self {
            image_width: 320,
            image_height: 180,
            look_from: Vec3::ZERO,
            look_at: Vec3::NEG_Z,
            vup: Vec3::Y,
            vfov: 60.0,
            pixel00_loc: Vec3::ZERO,
            pixel_delta_u: Vec3::ZERO,
            pixel_delta_v: Vec3::ZERO,
            w: Vec3::Z,
        }
    }

    /// Camera looking the way a scene's preview pose does.
    pub fn from_pose(pose: &CameraPose, width: u32, height: u32) -> Self {
        let mut camera = Self::new()
            .with_resolution(width, height)
            .with_position(pose.position, pose.target, Vec3::Y)
            .with_lens(pose.vfov_degrees);
        camera.initialize();
        camera
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.image_width = width.max(1);
        self.image_height = height.max(1);
        self
    }

    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self
    }

    pub fn with_lens(mut self, vfov: f32) -> Self {
        self.vfov = vfov;
        self
    }

    /// Must be called after changing any setting.
    pub fn initialize(&mut self) {
        let h = (self.vfov.to_radians() / 2.0).tan();
        let viewport_height = 2.0 * h;
        let viewport_width = viewport_height * (self.image_width as f32 / self.image_height as f32);

        self.w = (self.look_from - self.look_at).normalize_or_zero();
        if self.w == Vec3::ZERO {
            self.w = Vec3::Z;
        }
        let mut u = self.vup.cross(self.w).normalize_or_zero();
        if u == Vec3::ZERO {
            // looking straight along vup
            u = Vec3::X;
        }
        let v = self.w.cross(u);

        let viewport_u = viewport_width * u;
        let viewport_v = -viewport_height * v;
        self.pixel_delta_u = viewport_u / self.image_width as f32;
        self.pixel_delta_v = viewport_v / self.image_height as f32;

        let viewport_upper_left = self.look_from - self.w - viewport_u / 2.0 - viewport_v / 2.0;
        self.pixel00_loc = viewport_upper_left + 0.5 * (self.pixel_delta_u + self.pixel_delta_v);
    }

    /// Ray through pixel `(i, j)` offset by `offset` in `[0, 1)^2` within the pixel.
    pub fn get_ray(&self, i: u32, j: u32, offset: Vec2) -> Ray {
        let pixel_sample = self.pixel00_loc
            + (i as f32 + offset.x - 0.5) * self.pixel_delta_u
            + (j as f32 + offset.y - 0.5) * self.pixel_delta_v;
        Ray::new(self.look_from, (pixel_sample - self.look_from).normalize())
    }

    pub fn position(&self) -> Vec3 {
        self.look_from
    }

    /// Unit vector the camera looks along.
    pub fn forward(&self) -> Vec3 {
        -self.w
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_camera_initialize() {
        let mut camera = Camera::new()
            .with_resolution(800, 600)
            .with_position(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y)
            .with_lens(90.0);
        camera.initialize();
        assert!((camera.forward() - Vec3::NEG_Z).length() < 1e-3);
    }

    #[test]
    fn test_center_ray_follows_view_direction() {
        let pose = CameraPose {
            position: Vec3::new(0.0, 2.0, 10.0),
            target: Vec3::new(0.0, 2.0, 0.0),
            vfov_degrees: 60.0,
        };
        let camera = Camera::from_pose(&pose, 100, 100);
        // center of the image lies between pixels 49 and 50
        let ray = camera.get_ray(50, 50, Vec2::ZERO);
        assert_eq!(ray.origin, pose.position);
        assert_relative_eq!(ray.direction.z, -1.0, epsilon = 1e-3);

        let corner = camera.get_ray(0, 0, Vec2::ZERO);
        assert!(corner.direction.x < 0.0 && corner.direction.y > 0.0);
    }
}
