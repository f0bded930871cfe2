//! Real spherical harmonics up to L2.

use super::BasisProjector;
use kiln_math::sampling::{sample_uniform_hemisphere, sample_uniform_sphere, UNIFORM_HEMISPHERE_PDF, UNIFORM_SPHERE_PDF};
use kiln_math::{Color, Vec2, Vec3};

/// Cosine lobe convolution weights per band, divided by pi.
pub(crate) const COSINE_LOBE: [f32; 3] = [1.0, 2.0 / 3.0, 0.25];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShOrder {
    L1,
    L2,
}

impl ShOrder {
    pub fn coefficient_count(self) -> usize {
        match self {
            ShOrder::L1 => 4,
            ShOrder::L2 => 9,
        }
    }
}

/// Which directions are gathered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShDomain {
    /// Tangent space upper hemisphere, for lightmaps.
    Hemisphere,
    /// World space full sphere, for probes.
    Sphere,
}

/// Evaluates the first `out.len()` (4 or 9) real SH basis functions.
pub fn sh_basis(dir: Vec3, out: &mut [f32]) {
    let Vec3 { x, y, z } = dir;
    let all = [
        0.282095,
        0.488603 * y,
        0.488603 * z,
        0.488603 * x,
        1.092548 * x * y,
        1.092548 * y * z,
        0.315392 * (3.0 * z * z - 1.0),
        1.092548 * x * z,
        0.546274 * (x * x - y * y),
    ];
    let n = out.len().min(all.len());
    out[..n].copy_from_slice(&all[..n]);
}

fn band(index: usize) -> usize {
    match index {
        0 => 0,
        1..=3 => 1,
        _ => 2,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ShProjector {
    order: ShOrder,
    domain: ShDomain,
}

impl ShProjector {
    pub fn new(order: ShOrder, domain: ShDomain) -> Self {
        Self { order, domain }
    }
}

impl BasisProjector for ShProjector {
    fn basis_count(&self) -> usize {
        self.order.coefficient_count()
    }

    fn sample_direction(&self, u: Vec2) -> (Vec3, f32) {
        match self.domain {
            ShDomain::Hemisphere => (sample_uniform_hemisphere(u), UNIFORM_HEMISPHERE_PDF),
            ShDomain::Sphere => (sample_uniform_sphere(u), UNIFORM_SPHERE_PDF),
        }
    }

    fn project(&self, dir: Vec3, radiance: Color, weight: f32, coeffs: &mut [Color]) {
        let mut y = [0.0; 9];
        let n = self.basis_count();
        sh_basis(dir, &mut y[..n]);
        for (c, b) in coeffs.iter_mut().zip(&y[..n]) {
            *c += radiance * (b * weight);
        }
    }

    fn evaluate(&self, coeffs: &[Color], dir: Vec3) -> Color {
        let mut y = [0.0; 9];
        let n = self.basis_count().min(coeffs.len());
        sh_basis(dir, &mut y[..n]);
        (0..n).fold(Color::ZERO, |acc, i| acc + coeffs[i] * (y[i] * COSINE_LOBE[band(i)]))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::gather;
    use super::*;
    use approx::assert_relative_eq;
    use kiln_math::sampling::sample_uniform_sphere;

    #[test]
    fn test_basis_orthonormal() {
        // Monte Carlo check of <Y_i, Y_j> over the sphere
        let n = 64u32;
        let mut gram = [[0.0f64; 9]; 9];
        for s in 0..n * n {
            let u = crate::sampling::cmj(s, n, n, 5);
            let mut y = [0.0; 9];
            sh_basis(sample_uniform_sphere(u), &mut y);
            for i in 0..9 {
                for j in 0..9 {
                    gram[i][j] += (y[i] * y[j]) as f64 / UNIFORM_SPHERE_PDF as f64;
                }
            }
        }
        for (i, row) in gram.iter().enumerate() {
            for (j, v) in row.iter().enumerate() {
                let v = v / (n * n) as f64;
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((v - expected).abs() < 0.02, "<{},{}> = {}", i, j, v);
            }
        }
    }

    #[test]
    fn test_sphere_projection_of_directional_light() {
        // radiance 1 over the upper hemisphere only: irradiance pi facing up, 0 facing down
        let p = ShProjector::new(ShOrder::L2, ShDomain::Sphere);
        let coeffs = gather(&p, 32, |d| if d.z > 0.0 { Color::ONE } else { Color::ZERO });
        let up = p.evaluate(&coeffs, Vec3::Z);
        let down = p.evaluate(&coeffs, Vec3::NEG_Z);
        assert_relative_eq!(up.x, 1.0, epsilon = 0.05);
        assert!(down.x.abs() < 0.1);
    }
}
