//! Directional encodings of incident radiance.
//!
//! A [`BasisProjector`] owns the sampling distribution used to gather a basis,
//! the per-sample projection, the final resolve and the decode. Lightmap
//! projectors work in tangent space (+Z is the surface normal); probe
//! projectors work in world space over the full sphere.

pub mod ambient;
pub mod hbasis;
pub mod hl2;
pub mod sg;
pub mod sh;
pub mod solve;

use kiln_core::settings::{BakeMode, ProbeMode, SolveMode};
use kiln_math::sampling::sample_cosine_hemisphere;
use kiln_math::{Color, Vec2, Vec3};
use std::f32::consts::FRAC_1_PI;

pub use ambient::AmbientCubeProjector;
pub use hbasis::HBasisProjector;
pub use hl2::Hl2Projector;
pub use sg::{SgProjector, SphericalGaussian};
pub use sh::{ShDomain, ShOrder, ShProjector};

pub trait BasisProjector: Send + Sync {
    fn basis_count(&self) -> usize;

    /// Maps a unit square sample to a direction and its pdf.
    fn sample_direction(&self, u: Vec2) -> (Vec3, f32);

    /// Adds `radiance * basis(dir) * weight` to `coeffs`.
    ///
    /// `weight` is `1 / pdf` for Monte Carlo gathers and the texel solid angle
    /// for cubemap projection.
    fn project(&self, dir: Vec3, radiance: Color, weight: f32, coeffs: &mut [Color]);

    /// Floats of normal-equation state kept per texel, 0 if unused.
    fn gram_len(&self) -> usize {
        0
    }

    fn accumulate_gram(&self, _dir: Vec3, _gram: &mut [f32]) {}

    /// Turns accumulated sums into final coefficients.
    fn resolve(&self, sums: &[Color], _gram: &[f32], count: u32, out: &mut [Color]) {
        let scale = if count > 0 { 1.0 / count as f32 } else { 0.0 };
        for (o, s) in out.iter_mut().zip(sums) {
            *o = *s * scale;
        }
    }

    /// Diffuse response for a surface facing `dir`: irradiance divided by pi.
    fn evaluate(&self, coeffs: &[Color], dir: Vec3) -> Color;
}

/// Single cosine-weighted average: the texel stores irradiance / pi.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffuseProjector;

impl BasisProjector for DiffuseProjector {
    fn basis_count(&self) -> usize {
        1
    }

    fn sample_direction(&self, u: Vec2) -> (Vec3, f32) {
        let dir = sample_cosine_hemisphere(u);
        (dir, dir.z.max(1e-6) * FRAC_1_PI)
    }

    fn project(&self, dir: Vec3, radiance: Color, weight: f32, coeffs: &mut [Color]) {
        coeffs[0] += radiance * (dir.z.max(0.0) * FRAC_1_PI * weight);
    }

    fn evaluate(&self, coeffs: &[Color], _dir: Vec3) -> Color {
        coeffs[0]
    }
}

/// Projector for a lightmap bake mode.
pub fn projector(mode: BakeMode, solve: SolveMode) -> Box<dyn BasisProjector> {
    match mode {
        BakeMode::Diffuse => Box::new(DiffuseProjector),
        BakeMode::HL2 => Box::new(Hl2Projector),
        BakeMode::SHL1 => Box::new(ShProjector::new(ShOrder::L1, ShDomain::Hemisphere)),
        BakeMode::SHL2 => Box::new(ShProjector::new(ShOrder::L2, ShDomain::Hemisphere)),
        BakeMode::H4 => Box::new(HBasisProjector::new(4)),
        BakeMode::H6 => Box::new(HBasisProjector::new(6)),
        BakeMode::SG5 | BakeMode::SG6 | BakeMode::SG9 | BakeMode::SG12 => {
            Box::new(SgProjector::new(mode.sg_count(), solve))
        }
    }
}

/// Projector for a probe volume mode, `None` in cubemap mode.
pub fn probe_projector(mode: ProbeMode) -> Option<Box<dyn BasisProjector>> {
    match mode {
        ProbeMode::CubeMap => None,
        ProbeMode::AmbientCube => Some(Box::new(AmbientCubeProjector)),
        ProbeMode::L1SH => Some(Box::new(ShProjector::new(ShOrder::L1, ShDomain::Sphere))),
        ProbeMode::L2SH => Some(Box::new(ShProjector::new(ShOrder::L2, ShDomain::Sphere))),
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;
    use crate::sampling::cmj;

    /// Gathers a radiance function through the projector the way the lightmap baker does.
    pub fn gather(p: &dyn BasisProjector, sqrt_samples: u32, radiance: impl Fn(Vec3) -> Color) -> Vec<Color> {
        let n = p.basis_count();
        let mut sums = vec![Color::ZERO; n];
        let mut gram = vec![0.0; p.gram_len()];
        let count = sqrt_samples * sqrt_samples;
        for s in 0..count {
            let u = cmj(s, sqrt_samples, sqrt_samples, 77);
            let (dir, pdf) = p.sample_direction(u);
            p.project(dir, radiance(dir), 1.0 / pdf, &mut sums);
            p.accumulate_gram(dir, &mut gram);
        }
        let mut out = vec![Color::ZERO; n];
        p.resolve(&sums, &gram, count, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::test_util::gather;
    use super::*;

    #[test]
    fn test_basis_counts() {
        let expected = [1, 3, 4, 9, 4, 6, 5, 6, 9, 12];
        for (mode, n) in BakeMode::ALL.iter().zip(expected) {
            assert_eq!(projector(*mode, SolveMode::Projection).basis_count(), n, "{:?}", mode);
        }
        for &mode in ProbeMode::ALL {
            assert_eq!(probe_projector(mode).map(|p| p.basis_count()), mode.basis_count());
        }
    }

    #[test]
    fn test_every_mode_reproduces_uniform_lighting() {
        // a constant environment of radiance 1 has irradiance pi from every side
        for &mode in BakeMode::ALL {
            for &solve in SolveMode::ALL {
                let p = projector(mode, solve);
                let coeffs = gather(p.as_ref(), 24, |_| Color::ONE);
                let e = p.evaluate(&coeffs, Vec3::Z);
                // lobe fits only approximate a constant
                let tolerance = if mode.sg_count() > 0 { 0.25 } else { 0.1 };
                assert!(
                    (e.x - 1.0).abs() < tolerance,
                    "{:?}/{:?} decoded {:?}",
                    mode,
                    solve,
                    e
                );
            }
        }
    }

    #[test]
    fn test_diffuse_resolve_with_no_samples() {
        let p = DiffuseProjector;
        let mut out = [Color::ONE];
        p.resolve(&[Color::splat(5.0)], &[], 0, &mut out);
        assert_eq!(out[0], Color::ZERO);
    }
}
