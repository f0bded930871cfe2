//! Ambient cube: one irradiance value per world axis direction.

use super::BasisProjector;
use kiln_math::sampling::{sample_uniform_sphere, UNIFORM_SPHERE_PDF};
use kiln_math::{Color, Vec2, Vec3};
use std::f32::consts::FRAC_1_PI;

/// +X, -X, +Y, -Y, +Z, -Z.
pub const AMBIENT_AXES: [Vec3; 6] = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];

#[derive(Debug, Clone, Copy, Default)]
pub struct AmbientCubeProjector;

impl BasisProjector for AmbientCubeProjector {
    fn basis_count(&self) -> usize {
        6
    }

    fn sample_direction(&self, u: Vec2) -> (Vec3, f32) {
        (sample_uniform_sphere(u), UNIFORM_SPHERE_PDF)
    }

    fn project(&self, dir: Vec3, radiance: Color, weight: f32, coeffs: &mut [Color]) {
        for (c, axis) in coeffs.iter_mut().zip(AMBIENT_AXES) {
            let cos = dir.dot(axis);
            if cos > 0.0 {
                *c += radiance * (cos * weight * FRAC_1_PI);
            }
        }
    }

    fn evaluate(&self, coeffs: &[Color], dir: Vec3) -> Color {
        let sq = dir * dir;
        let x = if dir.x >= 0.0 { coeffs[0] } else { coeffs[1] };
        let y = if dir.y >= 0.0 { coeffs[2] } else { coeffs[3] };
        let z = if dir.z >= 0.0 { coeffs[4] } else { coeffs[5] };
        x * sq.x + y * sq.y + z * sq.z
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::gather;
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sky_only_lighting() {
        let p = AmbientCubeProjector;
        let coeffs = gather(&p, 32, |d| if d.y > 0.0 { Color::ONE } else { Color::ZERO });
        assert_relative_eq!(coeffs[2].x, 1.0, epsilon = 0.03);
        assert!(coeffs[3].x.abs() < 1e-6);
        // side faces see half the sky
        assert_relative_eq!(coeffs[0].x, 0.5, epsilon = 0.03);
        assert_relative_eq!(p.evaluate(&coeffs, Vec3::Y).x, coeffs[2].x);
    }
}
