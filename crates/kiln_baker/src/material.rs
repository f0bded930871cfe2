//! Diffuse surface response used by every baker.

use kiln_math::sampling::{sample_cosine_hemisphere, Frame};
use kiln_math::{Color, Vec2, Vec3};
use std::f32::consts::FRAC_1_PI;

/// Result of sampling a bounce direction.
#[derive(Debug, Clone, Copy)]
pub struct ScatterResult {
    /// Throughput multiplier for the new segment (brdf * cos / pdf).
    pub attenuation: Color,
    pub direction: Vec3,
}

/// Lambertian (diffuse) surface with optional emission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lambertian {
    albedo: Color,
    emission: Color,
}

impl Lambertian {
    /// Create a new Lambertian material with the given albedo color.
    pub fn new(albedo: Color) -> Self {
        Self {
            albedo: albedo.clamp(Vec3::ZERO, Vec3::ONE),
            emission: Color::ZERO,
        }
    }

    pub fn with_emission(mut self, emission: Color) -> Self {
        self.emission = emission.max(Vec3::ZERO);
        self
    }

    pub fn from_material(material: &kiln_core::Material) -> Self {
        Self::new(material.albedo).with_emission(material.emissive)
    }

    pub fn albedo(&self) -> Color {
        self.albedo
    }

    /// Get emitted light from this material.
    pub fn emitted(&self) -> Color {
        self.emission
    }

    pub fn is_emissive(&self) -> bool {
        self.emission != Color::ZERO
    }

    /// BRDF value, constant over all direction pairs.
    pub fn eval(&self, albedo_scale: f32) -> Color {
        self.albedo * albedo_scale * FRAC_1_PI
    }

    /// Cosine-weighted bounce around `normal`. The cosine and pdf cancel,
    /// leaving the albedo as attenuation.
    pub fn scatter(&self, normal: Vec3, u: Vec2, albedo_scale: f32) -> ScatterResult {
        let local = sample_cosine_hemisphere(u);
        ScatterResult {
            attenuation: self.albedo * albedo_scale,
            direction: Frame::from_normal(normal).to_world(local),
        }
    }
}

impl Default for Lambertian {
    fn default() -> Self {
        Self::new(Color::splat(0.5))
    }
}
