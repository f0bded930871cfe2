//! Half-Life 2 "radiosity normal mapping" basis: three tangent space vectors.

use super::BasisProjector;
use kiln_math::sampling::{sample_uniform_hemisphere, UNIFORM_HEMISPHERE_PDF};
use kiln_math::{Color, Vec2, Vec3};
use std::f32::consts::{FRAC_1_SQRT_2, PI};

const INV_SQRT_3: f32 = 0.577_350_26;
const INV_SQRT_6: f32 = 0.408_248_3;
const SQRT_2_3: f32 = 0.816_496_6;

pub const HL2_BASIS: [Vec3; 3] = [
    Vec3::new(-INV_SQRT_6, FRAC_1_SQRT_2, INV_SQRT_3),
    Vec3::new(-INV_SQRT_6, -FRAC_1_SQRT_2, INV_SQRT_3),
    Vec3::new(SQRT_2_3, 0.0, INV_SQRT_3),
];

/// Clamped cosine integral of a basis vector over the upper hemisphere.
/// All three vectors share the same tilt.
fn lobe_norm() -> f32 {
    PI * (1.0 + INV_SQRT_3) * 0.5
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Hl2Projector;

impl BasisProjector for Hl2Projector {
    fn basis_count(&self) -> usize {
        3
    }

    fn sample_direction(&self, u: Vec2) -> (Vec3, f32) {
        (sample_uniform_hemisphere(u), UNIFORM_HEMISPHERE_PDF)
    }

    fn project(&self, dir: Vec3, radiance: Color, weight: f32, coeffs: &mut [Color]) {
        for (c, b) in coeffs.iter_mut().zip(HL2_BASIS) {
            *c += radiance * (b.dot(dir).max(0.0) * weight);
        }
    }

    /// Each coefficient becomes the clamped-cosine weighted mean radiance
    /// around its basis vector.
    fn resolve(&self, sums: &[Color], _gram: &[f32], count: u32, out: &mut [Color]) {
        let scale = if count > 0 { 1.0 / (count as f32 * lobe_norm()) } else { 0.0 };
        for (o, s) in out.iter_mut().zip(sums) {
            *o = *s * scale;
        }
    }

    fn evaluate(&self, coeffs: &[Color], dir: Vec3) -> Color {
        let mut sum = Color::ZERO;
        let mut total = 0.0;
        for (c, b) in coeffs.iter().zip(HL2_BASIS) {
            let w = dir.dot(b).max(0.0).powi(2);
            sum += *c * w;
            total += w;
        }
        if total > 0.0 {
            sum / total
        } else {
            Color::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::gather;
    use super::*;

    #[test]
    fn test_basis_is_orthonormal() {
        for (i, a) in HL2_BASIS.iter().enumerate() {
            assert!((a.length() - 1.0).abs() < 1e-5);
            for b in &HL2_BASIS[i + 1..] {
                assert!(a.dot(*b).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_directional_light_favours_nearest_vector() {
        let p = Hl2Projector;
        let light = HL2_BASIS[2];
        let coeffs = gather(&p, 32, |d| if d.dot(light) > 0.9 { Color::ONE } else { Color::ZERO });
        assert!(coeffs[2].x > coeffs[0].x);
        assert!(coeffs[2].x > coeffs[1].x);
    }
}
