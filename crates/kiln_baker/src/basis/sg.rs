//! Spherical Gaussian lobes and the hemispherical SG lightmap basis.
//!
//! Lobe axes are spread over the tangent space hemisphere with a Fibonacci
//! spiral; all lobes share one sharpness chosen so that neighbouring lobes
//! cross at half amplitude.

use super::solve::{nnls, regularized, solve_spd};
use super::BasisProjector;
use kiln_core::settings::SolveMode;
use kiln_math::sampling::{sample_uniform_hemisphere, UNIFORM_HEMISPHERE_PDF};
use kiln_math::{Color, Vec2, Vec3};
use std::f32::consts::{LN_2, PI, TAU};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalGaussian {
    pub axis: Vec3,
    pub sharpness: f32,
    pub amplitude: Color,
}

impl SphericalGaussian {
    pub fn new(axis: Vec3, sharpness: f32, amplitude: Color) -> Self {
        Self { axis, sharpness, amplitude }
    }
}

pub fn sg_evaluate(sg: &SphericalGaussian, dir: Vec3) -> Color {
    sg.amplitude * (sg.sharpness * (dir.dot(sg.axis) - 1.0)).exp()
}

/// Integral of the lobe over the sphere.
pub fn sg_integral(sg: &SphericalGaussian) -> Color {
    let e = 1.0 - (-2.0 * sg.sharpness).exp();
    sg.amplitude * (TAU * e / sg.sharpness)
}

/// Integral over the sphere of the product of two lobes.
pub fn sg_inner_product(a: &SphericalGaussian, b: &SphericalGaussian) -> Color {
    let um = a.sharpness * a.axis + b.sharpness * b.axis;
    let dm = um.length();
    let expo = (dm - a.sharpness - b.sharpness).exp();
    let other = 1.0 - (-2.0 * dm).exp();
    a.amplitude * b.amplitude * (expo * TAU * other / dm)
}

/// Irradiance treating the lobe as a point light along its axis.
pub fn irradiance_punctual(sg: &SphericalGaussian, normal: Vec3) -> Color {
    sg_integral(sg) * sg.axis.dot(normal).max(0.0)
}

/// Irradiance from a lobe using Stephen Hill's fitted cosine convolution.
pub fn irradiance_fitted(sg: &SphericalGaussian, normal: Vec3) -> Color {
    const C0: f32 = 0.36;
    const C1: f32 = 1.0 / (4.0 * C0);

    let mu_dot_n = sg.axis.dot(normal);
    let lambda = sg.sharpness;
    let eml = (-lambda).exp();
    let em2l = eml * eml;
    let rl = 1.0 / lambda;

    let scale = 1.0 + 2.0 * em2l - rl;
    let bias = (eml - em2l) * rl - em2l;

    let x = (1.0 - scale).max(0.0).sqrt();
    let x0 = C0 * mu_dot_n;
    let x1 = C1 * x;
    let n = x0 + x1;
    let y = if x0.abs() <= x1 && x > 0.0 {
        n * n / x
    } else {
        mu_dot_n.clamp(0.0, 1.0)
    };

    sg_integral(sg) * (scale * y + bias).max(0.0)
}

/// Fibonacci spiral axes over the +Z hemisphere.
pub fn hemisphere_axes(count: usize) -> Vec<Vec3> {
    let golden_angle = PI * (3.0 - 5.0f32.sqrt());
    (0..count)
        .map(|i| {
            let z = 1.0 - (i as f32 + 0.5) / count as f32;
            let r = (1.0 - z * z).max(0.0).sqrt();
            let phi = i as f32 * golden_angle;
            Vec3::new(r * phi.cos(), r * phi.sin(), z)
        })
        .collect()
}

/// Sharpness at which a lobe falls to half amplitude at the angular radius
/// of one of `count` equal cells on the hemisphere.
pub fn lobe_sharpness(count: usize) -> f32 {
    let radius = (2.0 / count.max(1) as f32).sqrt();
    LN_2 / (1.0 - radius.cos())
}

#[derive(Debug, Clone)]
pub struct SgProjector {
    axes: Vec<Vec3>,
    sharpness: f32,
    solve: SolveMode,
    /// Scales running-average amplitudes so a uniform environment decodes to 1.
    average_norm: f32,
}

impl SgProjector {
    pub fn new(count: usize, solve: SolveMode) -> Self {
        let axes = hemisphere_axes(count);
        let sharpness = lobe_sharpness(count);
        let up: f32 = axes
            .iter()
            .map(|&axis| irradiance_fitted(&SphericalGaussian::new(axis, sharpness, Color::ONE), Vec3::Z).x)
            .sum();
        let average_norm = if up > 0.0 { PI / up } else { 0.0 };
        Self { axes, sharpness, solve, average_norm }
    }

    pub fn lobes<'a>(&'a self, amplitudes: &'a [Color]) -> impl Iterator<Item = SphericalGaussian> + 'a {
        self.axes
            .iter()
            .zip(amplitudes.iter().copied())
            .map(move |(&axis, amplitude)| SphericalGaussian::new(axis, self.sharpness, amplitude))
    }

    fn weights(&self, dir: Vec3, out: &mut [f32]) {
        for (w, axis) in out.iter_mut().zip(&self.axes) {
            *w = (self.sharpness * (dir.dot(*axis) - 1.0)).exp();
        }
    }

    fn resolve_least_squares(&self, sums: &[Color], gram: &[f32], out: &mut [Color]) {
        let n = self.axes.len();
        let a = regularized(gram, n);
        for channel in 0..3 {
            let b: Vec<f64> = sums.iter().map(|s| s[channel] as f64).collect();
            let x = match self.solve {
                SolveMode::NNLS => nnls(&a, &b, n),
                _ => solve_spd(&a, &b, n).unwrap_or_else(|| vec![0.0; n]),
            };
            for (o, v) in out.iter_mut().zip(x) {
                o[channel] = v as f32;
            }
        }
    }
}

impl BasisProjector for SgProjector {
    fn basis_count(&self) -> usize {
        self.axes.len()
    }

    fn sample_direction(&self, u: Vec2) -> (Vec3, f32) {
        (sample_uniform_hemisphere(u), UNIFORM_HEMISPHERE_PDF)
    }

    /// Uniform sampling makes every sample equally weighted, so `weight` is unused.
    fn project(&self, dir: Vec3, radiance: Color, _weight: f32, coeffs: &mut [Color]) {
        let mut w = [0.0; 12];
        let n = self.axes.len();
        self.weights(dir, &mut w[..n]);
        for (c, w) in coeffs.iter_mut().zip(&w[..n]) {
            *c += radiance * *w;
        }
    }

    fn gram_len(&self) -> usize {
        let n = self.axes.len();
        match self.solve {
            SolveMode::Projection => n,
            SolveMode::LeastSquares | SolveMode::NNLS => n * n,
        }
    }

    fn accumulate_gram(&self, dir: Vec3, gram: &mut [f32]) {
        let mut w = [0.0; 12];
        let n = self.axes.len();
        self.weights(dir, &mut w[..n]);
        match self.solve {
            SolveMode::Projection => {
                for (g, w) in gram.iter_mut().zip(&w[..n]) {
                    *g += w;
                }
            }
            SolveMode::LeastSquares | SolveMode::NNLS => {
                for i in 0..n {
                    for j in 0..n {
                        gram[i * n + j] += w[i] * w[j];
                    }
                }
            }
        }
    }

    fn resolve(&self, sums: &[Color], gram: &[f32], count: u32, out: &mut [Color]) {
        if count == 0 {
            out.iter_mut().for_each(|o| *o = Color::ZERO);
            return;
        }
        match self.solve {
            SolveMode::Projection => {
                for ((o, s), g) in out.iter_mut().zip(sums).zip(gram) {
                    *o = if *g > 0.0 { *s * (self.average_norm / g) } else { Color::ZERO };
                }
            }
            SolveMode::LeastSquares | SolveMode::NNLS => self.resolve_least_squares(sums, gram, out),
        }
    }

    fn evaluate(&self, coeffs: &[Color], dir: Vec3) -> Color {
        self.lobes(coeffs)
            .fold(Color::ZERO, |acc, sg| acc + irradiance_fitted(&sg, dir))
            / PI
    }
}
