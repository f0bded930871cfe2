//! H-basis: SH-like functions orthonormal over the upper hemisphere.
//!
//! Samples are gathered as L2 SH, convolved with the cosine lobe, and the
//! resulting irradiance function is projected onto the first 4 or 6 H-basis
//! functions. The SH to H transform is integrated numerically once per
//! projector.

use super::sh::{sh_basis, COSINE_LOBE};
use super::BasisProjector;
use kiln_math::sampling::{sample_uniform_hemisphere, UNIFORM_HEMISPHERE_PDF};
use kiln_math::{Color, Vec2, Vec3};
use std::f32::consts::TAU;

const SH_COUNT: usize = 9;
const QUAD_Z: usize = 64;
const QUAD_PHI: usize = 128;

pub fn h_basis(dir: Vec3, out: &mut [f32]) {
    let Vec3 { x, y, z } = dir;
    let a = (1.0 / TAU).sqrt();
    let b = (3.0 / TAU).sqrt();
    let c = (15.0 / TAU).sqrt();
    let all = [a, b * y, b * (2.0 * z - 1.0), b * x, c * x * y, 0.5 * c * (x * x - y * y)];
    let n = out.len().min(all.len());
    out[..n].copy_from_slice(&all[..n]);
}

fn band_weight(sh_index: usize) -> f32 {
    match sh_index {
        0 => COSINE_LOBE[0],
        1..=3 => COSINE_LOBE[1],
        _ => COSINE_LOBE[2],
    }
}

#[derive(Debug, Clone)]
pub struct HBasisProjector {
    count: usize,
    /// `count x 9`, maps cosine-convolved SH to H coefficients.
    sh_to_h: Vec<f32>,
}

impl HBasisProjector {
    /// `count` is 4 or 6.
    pub fn new(count: usize) -> Self {
        let count = count.clamp(1, 6);
        let mut sh_to_h = vec![0.0f32; count * SH_COUNT];
        let d_omega = (1.0 / QUAD_Z as f32) * (TAU / QUAD_PHI as f32);
        let mut h = [0.0; 6];
        let mut y = [0.0; SH_COUNT];
        for iz in 0..QUAD_Z {
            let z = (iz as f32 + 0.5) / QUAD_Z as f32;
            let r = (1.0 - z * z).max(0.0).sqrt();
            for ip in 0..QUAD_PHI {
                let phi = (ip as f32 + 0.5) * TAU / QUAD_PHI as f32;
                let dir = Vec3::new(r * phi.cos(), r * phi.sin(), z);
                h_basis(dir, &mut h[..count]);
                sh_basis(dir, &mut y);
                for i in 0..count {
                    for j in 0..SH_COUNT {
                        sh_to_h[i * SH_COUNT + j] += h[i] * y[j] * d_omega;
                    }
                }
            }
        }
        for i in 0..count {
            for j in 0..SH_COUNT {
                sh_to_h[i * SH_COUNT + j] *= band_weight(j);
            }
        }
        Self { count, sh_to_h }
    }
}

impl BasisProjector for HBasisProjector {
    fn basis_count(&self) -> usize {
        self.count
    }

    fn sample_direction(&self, u: Vec2) -> (Vec3, f32) {
        (sample_uniform_hemisphere(u), UNIFORM_HEMISPHERE_PDF)
    }

    fn project(&self, dir: Vec3, radiance: Color, weight: f32, coeffs: &mut [Color]) {
        let mut y = [0.0; SH_COUNT];
        sh_basis(dir, &mut y);
        for (i, c) in coeffs.iter_mut().enumerate().take(self.count) {
            let row = &self.sh_to_h[i * SH_COUNT..(i + 1) * SH_COUNT];
            let k: f32 = row.iter().zip(&y).map(|(m, b)| m * b).sum();
            *c += radiance * (k * weight);
        }
    }

    fn evaluate(&self, coeffs: &[Color], dir: Vec3) -> Color {
        let mut h = [0.0; 6];
        h_basis(dir, &mut h[..self.count]);
        coeffs
            .iter()
            .zip(&h[..self.count])
            .fold(Color::ZERO, |acc, (c, b)| acc + *c * *b)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::gather;
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::PI;

    /// Irradiance over pi for a plane under a unit radiance upper hemisphere.
    fn tilted_sky(dir: Vec3) -> f32 {
        (1.0 + dir.z) * 0.5
    }

    #[test]
    fn test_h_basis_orthonormal() {
        let n = 128;
        let d_omega = TAU / (n * n * 2) as f32;
        let mut gram = [[0.0f32; 6]; 6];
        for iz in 0..n {
            let z = (iz as f32 + 0.5) / n as f32;
            let r = (1.0 - z * z).sqrt();
            for ip in 0..2 * n {
                let phi = (ip as f32 + 0.5) * PI / n as f32;
                let mut h = [0.0; 6];
                h_basis(Vec3::new(r * phi.cos(), r * phi.sin(), z), &mut h);
                for a in 0..6 {
                    for b in 0..6 {
                        gram[a][b] += h[a] * h[b] * d_omega;
                    }
                }
            }
        }
        for (a, row) in gram.iter().enumerate() {
            for (b, v) in row.iter().enumerate() {
                let expected = if a == b { 1.0 } else { 0.0 };
                assert!((v - expected).abs() < 1e-2, "<{},{}> = {}", a, b, v);
            }
        }
    }

    #[test]
    fn test_decodes_tilted_sky() {
        for count in [4, 6] {
            let p = HBasisProjector::new(count);
            let coeffs = gather(&p, 32, |_| Color::ONE);
            let tilted = Vec3::new(0.6, 0.0, 0.8);
            assert_relative_eq!(p.evaluate(&coeffs, Vec3::Z).x, tilted_sky(Vec3::Z), epsilon = 0.03);
            assert_relative_eq!(p.evaluate(&coeffs, tilted).x, tilted_sky(tilted), epsilon = 0.03);
        }
    }
}
