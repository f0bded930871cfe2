//! Math primitives shared by the kiln crates.
//!
//! Everything is `f32` and built on top of glam, which is re-exported so
//! downstream crates only need a single math dependency.

pub use glam::*;

mod aabb;
mod interval;
mod ray;
pub mod sampling;

pub use aabb::Aabb;
pub use interval::Interval;
pub use ray::Ray;

/// Linear RGB color in scene-referred units.
pub type Color = Vec3;

/// Largest f32 strictly below one. Sample values are clamped to `[0, ONE_MINUS_EPSILON]`.
pub const ONE_MINUS_EPSILON: f32 = 0.999_999_94;

/// Largest component of a color, used for throughput based termination.
#[inline]
pub fn max_component(c: Color) -> f32 {
    c.x.max(c.y).max(c.z)
}

/// Rec. 709 luminance of a linear color.
#[inline]
pub fn luminance(c: Color) -> f32 {
    c.dot(Vec3::new(0.2126, 0.7152, 0.0722))
}
