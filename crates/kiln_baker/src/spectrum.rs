//! Sampled spectra for the analytic sun model.
//!
//! Wavelengths are in nanometres. Spectral radiance is in W / (m^2 sr nm).

use kiln_math::{Color, Vec3};

pub const NUM_SPECTRAL_SAMPLES: usize = 60;
pub const LAMBDA_START: f32 = 400.0;
pub const LAMBDA_END: f32 = 700.0;

/// Integral of the CIE 1931 Y matching function over the visible range.
pub const CIE_Y_INTEGRAL: f32 = 106.856_895;

/// Radiance sampled at `NUM_SPECTRAL_SAMPLES` evenly spaced wavelengths.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampledSpectrum(pub [f32; NUM_SPECTRAL_SAMPLES]);

impl Default for SampledSpectrum {
    fn default() -> Self {
        Self([0.0; NUM_SPECTRAL_SAMPLES])
    }
}

impl SampledSpectrum {
    /// Centre wavelength of sample `i`.
    pub fn wavelength(i: usize) -> f32 {
        LAMBDA_START + (LAMBDA_END - LAMBDA_START) * (i as f32 / NUM_SPECTRAL_SAMPLES as f32)
    }

    pub fn from_fn(f: impl Fn(f32) -> f32) -> Self {
        let mut s = Self::default();
        for (i, v) in s.0.iter_mut().enumerate() {
            *v = f(Self::wavelength(i));
        }
        s
    }

    /// CIE XYZ, normalized so a constant spectrum of 1 has Y close to 1.
    pub fn to_xyz(&self) -> Vec3 {
        let step = (LAMBDA_END - LAMBDA_START) / NUM_SPECTRAL_SAMPLES as f32;
        let xyz = self
            .0
            .iter()
            .enumerate()
            .fold(Vec3::ZERO, |acc, (i, &v)| acc + cie_xyz(Self::wavelength(i)) * v);
        xyz * (step / CIE_Y_INTEGRAL)
    }

    pub fn to_rgb(&self) -> Color {
        xyz_to_linear_srgb(self.to_xyz())
    }
}

fn lobe(x: f32, mu: f32, sigma_lo: f32, sigma_hi: f32) -> f32 {
    let sigma = if x < mu { sigma_lo } else { sigma_hi };
    let t = (x - mu) / sigma;
    (-0.5 * t * t).exp()
}

/// Multi-lobe Gaussian fit of the CIE 1931 2-degree observer
/// (Wyman, Sloan and Shirley 2013).
pub fn cie_xyz(lambda: f32) -> Vec3 {
    let x = 1.056 * lobe(lambda, 599.8, 37.9, 31.0) + 0.362 * lobe(lambda, 442.0, 16.0, 26.7)
        - 0.065 * lobe(lambda, 501.1, 20.4, 26.2);
    let y = 0.821 * lobe(lambda, 568.8, 46.9, 40.5) + 0.286 * lobe(lambda, 530.9, 16.3, 31.1);
    let z = 1.217 * lobe(lambda, 437.0, 11.8, 36.0) + 0.681 * lobe(lambda, 459.0, 26.0, 13.8);
    Vec3::new(x, y, z)
}

pub fn xyz_to_linear_srgb(xyz: Vec3) -> Color {
    Color::new(
        3.240479 * xyz.x - 1.537150 * xyz.y - 0.498535 * xyz.z,
        -0.969256 * xyz.x + 1.875991 * xyz.y + 0.041556 * xyz.z,
        0.055648 * xyz.x - 0.204043 * xyz.y + 1.057311 * xyz.z,
    )
}

/// Planck's law in W / (m^2 sr nm).
pub fn blackbody(lambda_nm: f32, temperature: f32) -> f32 {
    const C1: f64 = 1.191_042_97e-16; // 2 h c^2
    const C2: f64 = 1.438_777_36e-2; // h c / k
    let l = lambda_nm as f64 * 1e-9;
    let b = C1 / (l.powi(5) * ((C2 / (l * temperature as f64)).exp() - 1.0));
    (b * 1e-9) as f32
}

/// Effective temperature of the solar photosphere.
pub const SUN_TEMPERATURE: f32 = 5778.0;

/// Relative optical air mass for a zenith angle in radians (Kasten).
pub fn relative_air_mass(zenith: f32) -> f32 {
    let zenith = zenith.clamp(0.0, 93f32.to_radians());
    let deg = zenith.to_degrees();
    1.0 / (zenith.cos() + 0.15 * (93.885 - deg).powf(-1.253))
}

/// Rayleigh plus Ångström aerosol optical depth at sea level.
pub fn optical_depth(lambda_nm: f32, turbidity: f32) -> f32 {
    let l = lambda_nm * 1e-3;
    let rayleigh = 0.008735 * l.powf(-4.08);
    let beta = (0.04608 * turbidity - 0.04586).max(0.0);
    let aerosol = beta * l.powf(-1.3);
    rayleigh + aerosol
}

/// Limb darkening coefficient, falling from 0.85 in the blue to 0.6 in the red.
fn limb_darkening_coefficient(lambda_nm: f32) -> f32 {
    let t = ((lambda_nm - LAMBDA_START) / (LAMBDA_END - LAMBDA_START)).clamp(0.0, 1.0);
    0.85 + (0.6 - 0.85) * t
}

/// Solar spectral radiance seen through the atmosphere.
///
/// `zenith` is the zenith angle of the viewed point on the disc and
/// `disc_radius` its normalized distance from the disc centre.
pub fn solar_radiance(lambda_nm: f32, zenith: f32, disc_radius: f32, turbidity: f32) -> f32 {
    let mu = (1.0 - disc_radius * disc_radius).max(0.0).sqrt();
    let limb = 1.0 - limb_darkening_coefficient(lambda_nm) * (1.0 - mu);
    let transmittance = (-relative_air_mass(zenith) * optical_depth(lambda_nm, turbidity)).exp();
    blackbody(lambda_nm, SUN_TEMPERATURE) * limb * transmittance
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_constant_spectrum_has_unit_luminance() {
        let s = SampledSpectrum::from_fn(|_| 1.0);
        // the fit over 400..700 misses a little of each tail
        assert_relative_eq!(s.to_xyz().y, 1.0, epsilon = 0.05);
    }

    #[test]
    fn test_blackbody_peak_near_500nm() {
        let b450 = blackbody(450.0, SUN_TEMPERATURE);
        let b500 = blackbody(500.0, SUN_TEMPERATURE);
        let b650 = blackbody(650.0, SUN_TEMPERATURE);
        assert!(b500 > b450 && b500 > b650);
        // extraterrestrial solar radiance is a few 10^4 W/(m^2 sr nm)
        assert!(b500 > 1e4 && b500 < 5e4);
    }

    #[test]
    fn test_air_mass() {
        assert_relative_eq!(relative_air_mass(0.0), 1.0, epsilon = 1e-3);
        assert!(relative_air_mass(80f32.to_radians()) > 5.0);
        assert!(relative_air_mass(std::f32::consts::PI).is_finite());
    }

    #[test]
    fn test_low_sun_is_redder() {
        let ratio = |zenith: f32| {
            solar_radiance(650.0, zenith, 0.0, 2.0) / solar_radiance(450.0, zenith, 0.0, 2.0)
        };
        assert!(ratio(85f32.to_radians()) > ratio(0.0));
    }

    #[test]
    fn test_limb_darkening() {
        let centre = solar_radiance(550.0, 0.5, 0.0, 2.0);
        let edge = solar_radiance(550.0, 0.5, 0.95, 2.0);
        assert!(edge < centre);
    }
}
