//! Warps from the unit square onto disks, hemispheres, spheres and cones,
//! plus an orthonormal frame for moving samples between tangent and world space.
//!
//! Local-space results use +Z as the pole.

use crate::{Vec2, Vec3};
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

/// Shirley-Chiu concentric mapping from `[0,1)^2` to the unit disk.
pub fn square_to_concentric_disk(u: Vec2) -> Vec2 {
    let offset = u * 2.0 - Vec2::ONE;
    if offset.x == 0.0 && offset.y == 0.0 {
        return Vec2::ZERO;
    }
    let (r, theta) = if offset.x.abs() > offset.y.abs() {
        (offset.x, FRAC_PI_4 * (offset.y / offset.x))
    } else {
        (offset.y, FRAC_PI_2 - FRAC_PI_4 * (offset.x / offset.y))
    };
    Vec2::new(theta.cos(), theta.sin()) * r
}

/// Cosine-weighted hemisphere direction. pdf = cos(theta) / pi.
pub fn sample_cosine_hemisphere(u: Vec2) -> Vec3 {
    let d = square_to_concentric_disk(u);
    let z = (1.0 - d.length_squared()).max(0.0).sqrt();
    Vec3::new(d.x, d.y, z)
}

/// Uniform hemisphere direction. pdf = 1 / (2 pi).
pub fn sample_uniform_hemisphere(u: Vec2) -> Vec3 {
    let z = u.x;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * PI * u.y;
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

/// Uniform sphere direction. pdf = 1 / (4 pi).
pub fn sample_uniform_sphere(u: Vec2) -> Vec3 {
    let z = 1.0 - 2.0 * u.x;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * PI * u.y;
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

/// Uniform direction inside a cone around +Z. pdf = 1 / (2 pi (1 - cos_max)).
pub fn sample_uniform_cone(u: Vec2, cos_theta_max: f32) -> Vec3 {
    let cos_theta = (1.0 - u.x) + u.x * cos_theta_max;
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = 2.0 * PI * u.y;
    Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

/// Solid angle of a cone with the given cosine half-angle.
#[inline]
pub fn cone_solid_angle(cos_theta_max: f32) -> f32 {
    2.0 * PI * (1.0 - cos_theta_max)
}

pub const UNIFORM_HEMISPHERE_PDF: f32 = 1.0 / (2.0 * PI);
pub const UNIFORM_SPHERE_PDF: f32 = 1.0 / (4.0 * PI);

/// Orthonormal basis around a normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub tangent: Vec3,
    pub bitangent: Vec3,
    pub normal: Vec3,
}

impl Frame {
    /// Builds a frame with the branchless construction of Duff et al.
    pub fn from_normal(normal: Vec3) -> Self {
        let n = normal.normalize_or_zero();
        let sign = 1.0f32.copysign(n.z);
        let a = -1.0 / (sign + n.z);
        let b = n.x * n.y * a;
        let tangent = Vec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x);
        let bitangent = Vec3::new(b, sign + n.y * n.y * a, -n.y);
        Self {
            tangent,
            bitangent,
            normal: n,
        }
    }

    /// Uses an explicit tangent, re-orthogonalized against the normal.
    pub fn from_normal_tangent(normal: Vec3, tangent: Vec3) -> Self {
        let n = normal.normalize_or_zero();
        let t = (tangent - n * n.dot(tangent)).normalize_or_zero();
        if t == Vec3::ZERO {
            return Self::from_normal(n);
        }
        Self {
            tangent: t,
            bitangent: n.cross(t),
            normal: n,
        }
    }

    pub fn to_world(&self, v: Vec3) -> Vec3 {
        self.tangent * v.x + self.bitangent * v.y + self.normal * v.z
    }

    pub fn to_local(&self, v: Vec3) -> Vec3 {
        Vec3::new(v.dot(self.tangent), v.dot(self.bitangent), v.dot(self.normal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid(n: u32) -> impl Iterator<Item = Vec2> {
        (0..n * n).map(move |i| {
            Vec2::new(
                ((i % n) as f32 + 0.5) / n as f32,
                ((i / n) as f32 + 0.5) / n as f32,
            )
        })
    }

    #[test]
    fn test_warps_are_unit_length() {
        for u in grid(8) {
            assert_relative_eq!(sample_cosine_hemisphere(u).length(), 1.0, epsilon = 1e-4);
            assert_relative_eq!(sample_uniform_hemisphere(u).length(), 1.0, epsilon = 1e-4);
            assert_relative_eq!(sample_uniform_sphere(u).length(), 1.0, epsilon = 1e-4);
            assert!(sample_cosine_hemisphere(u).z >= 0.0);
        }
    }

    #[test]
    fn test_cone_stays_inside() {
        let cos_max = 0.99;
        for u in grid(8) {
            assert!(sample_uniform_cone(u, cos_max).z >= cos_max - 1e-6);
        }
    }

    #[test]
    fn test_cosine_hemisphere_mean_cosine() {
        // E[cos] under the cosine pdf is 2/3
        let n = 64;
        let mean: f32 = grid(n).map(|u| sample_cosine_hemisphere(u).z).sum::<f32>() / (n * n) as f32;
        assert_relative_eq!(mean, 2.0 / 3.0, epsilon = 5e-3);
    }

    #[test]
    fn test_frame_roundtrip() {
        for n in [Vec3::Y, Vec3::NEG_Z, Vec3::new(0.3, -0.4, 0.866).normalize()] {
            let frame = Frame::from_normal(n);
            assert_relative_eq!(frame.tangent.dot(frame.normal), 0.0, epsilon = 1e-5);
            assert_relative_eq!(frame.bitangent.dot(frame.normal), 0.0, epsilon = 1e-5);
            let v = Vec3::new(0.2, 0.5, 0.84);
            let back = frame.to_local(frame.to_world(v));
            assert_relative_eq!(back.x, v.x, epsilon = 1e-5);
            assert_relative_eq!(back.z, v.z, epsilon = 1e-5);
            assert_relative_eq!(frame.to_world(Vec3::Z).dot(n), 1.0, epsilon = 1e-5);
        }
    }
}
