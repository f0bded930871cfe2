//! Sun and area light radiometry.
//!
//! The sun radiance is an average of the spectral solar model over the sun disc,
//! which is expensive, so the result is memoized on its exact inputs.

use crate::spectrum::{solar_radiance, SampledSpectrum};
use kiln_core::settings::{names, LightUnits, Registry, SettingsResult, MIN_EV100};
use kiln_core::FP16_SCALE;
use kiln_math::sampling::square_to_concentric_disk;
use kiln_math::{Color, Vec2, Vec3};
use std::f32::consts::PI;

/// Angular radius of the real sun in degrees.
pub const BASE_SUN_SIZE: f32 = 0.27;

/// The disc is integrated on an N x N grid.
const NUM_DISC_SAMPLES: u32 = 8;

/// Luminous efficacy of 555 nm light, lm/W.
const LUMINOUS_EFFICACY: f32 = 683.0;

/// Radiance scale applied to the spectral model output.
const SUN_UNIT_SCALE: f32 = 100.0;

/// Illuminance from a uniform disc of radiance 1 with angular radius `theta`.
pub fn illuminance_integral(theta: f32) -> f32 {
    let cos_theta = theta.cos();
    PI * (1.0 - cos_theta * cos_theta)
}

/// User inputs of the sun model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SunParams {
    /// Direction towards the sun; need not be normalized.
    pub direction: Vec3,
    pub turbidity: f32,
    pub intensity_scale: f32,
    pub tint: Color,
    pub normalize: bool,
    /// Angular radius in degrees.
    pub size: f32,
}

impl Default for SunParams {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-0.75, 0.977, -0.4),
            turbidity: 2.0,
            intensity_scale: 1.0,
            tint: Color::ONE,
            normalize: false,
            size: BASE_SUN_SIZE,
        }
    }
}

impl SunParams {
    pub fn from_registry(registry: &Registry) -> SettingsResult<Self> {
        Ok(Self {
            direction: registry.direction(names::SUN_DIRECTION)?,
            turbidity: registry.float(names::TURBIDITY)?,
            intensity_scale: registry.float(names::SUN_INTENSITY_SCALE)?,
            tint: registry.color(names::SUN_TINT_COLOR)?,
            normalize: registry.flag(names::NORMALIZE_SUN_INTENSITY)?,
            size: registry.float(names::SUN_SIZE)?,
        })
    }

    /// Sun direction with its height saturated to the upper hemisphere.
    pub fn effective_direction(&self) -> Vec3 {
        let d = Vec3::new(self.direction.x, self.direction.y.clamp(0.0, 1.0), self.direction.z);
        d.try_normalize().unwrap_or(Vec3::Y)
    }

    pub fn effective_turbidity(&self) -> f32 {
        self.turbidity.clamp(1.0, 32.0)
    }

    fn key(&self) -> SunKey {
        let d = self.effective_direction();
        SunKey {
            direction: [d.x.to_bits(), d.y.to_bits(), d.z.to_bits()],
            turbidity: self.effective_turbidity().to_bits(),
            intensity_scale: self.intensity_scale.to_bits(),
            tint: [self.tint.x.to_bits(), self.tint.y.to_bits(), self.tint.z.to_bits()],
            normalize: self.normalize,
            size: self.size.to_bits(),
        }
    }
}

/// Bit patterns of every input the sun radiance depends on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SunKey {
    direction: [u32; 3],
    turbidity: u32,
    intensity_scale: u32,
    tint: [u32; 3],
    normalize: bool,
    size: u32,
}

/// Single-slot memo of the last sun radiance.
#[derive(Clone, Debug, Default)]
pub struct SunRadianceCache {
    entry: Option<(SunKey, Color)>,
}

impl SunRadianceCache {
    fn lookup(&self, key: &SunKey) -> Option<Color> {
        match &self.entry {
            Some((k, v)) if k == key => Some(*v),
            _ => None,
        }
    }

    fn store(&mut self, key: SunKey, radiance: Color) {
        self.entry = Some((key, radiance));
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }
}

/// Owner of the sun radiance cache.
#[derive(Clone, Debug, Default)]
pub struct LightModel {
    cache: SunRadianceCache,
}

impl LightModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Average sun disc radiance, scaled by `FP16_SCALE`.
    ///
    /// The second value is true when the result came from the cache.
    pub fn sun_radiance(&mut self, params: &SunParams) -> (Color, bool) {
        let key = params.key();
        if let Some(radiance) = self.cache.lookup(&key) {
            return (radiance, true);
        }

        let mut radiance = disc_average_radiance(params.effective_direction(), params.effective_turbidity())
            * params.tint
            * params.intensity_scale;

        if params.normalize {
            let base = illuminance_integral(BASE_SUN_SIZE.to_radians());
            let current = illuminance_integral(params.size.to_radians());
            if current > 0.0 {
                radiance *= base / current;
            }
        }

        log::debug!("sun radiance recomputed: {:?}", radiance);
        self.cache.store(key, radiance);
        (radiance, false)
    }

    /// Illuminance at normal incidence from the whole sun disc.
    pub fn sun_illuminance(&mut self, params: &SunParams) -> Color {
        let (radiance, _) = self.sun_radiance(params);
        radiance * illuminance_integral(params.size.to_radians())
    }

    pub fn cache(&self) -> &SunRadianceCache {
        &self.cache
    }
}

/// Integrates the spectral solar model over the base sun disc.
fn disc_average_radiance(direction: Vec3, turbidity: f32) -> Color {
    let zenith_sun = direction.y.clamp(-1.0, 1.0).acos();
    let disc_radius = BASE_SUN_SIZE.to_radians();

    let mut sum = Color::ZERO;
    for x in 0..NUM_DISC_SAMPLES {
        for y in 0..NUM_DISC_SAMPLES {
            let u = Vec2::new(
                (x as f32 + 0.5) / NUM_DISC_SAMPLES as f32,
                (y as f32 + 0.5) / NUM_DISC_SAMPLES as f32,
            );
            let disc = square_to_concentric_disk(u);
            let zenith = zenith_sun + disc.y * disc_radius;
            let r = disc.length();
            let spectrum = SampledSpectrum::from_fn(|lambda| solar_radiance(lambda, zenith, r, turbidity));
            sum += spectrum.to_rgb().max(Color::ZERO) * FP16_SCALE;
        }
    }
    let samples = (NUM_DISC_SAMPLES * NUM_DISC_SAMPLES) as f32;
    sum * (LUMINOUS_EFFICACY * SUN_UNIT_SCALE / samples)
}

/// Size and distance used to convert between area light units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AreaLightGeometry {
    /// Sphere radius.
    pub radius: f32,
    /// Distance at which illuminance is measured.
    pub distance: f32,
}

/// One area light intensity expressed in every unit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AreaLightRadiometry {
    pub luminance: f32,
    pub illuminance: f32,
    pub luminous_power: f32,
    pub ev100: f32,
}

fn luminous_power_factor(radius: f32) -> f32 {
    4.0 * radius * radius * PI * PI
}

/// Luminance (cd/m^2) of an area light given its intensity in `units`.
pub fn luminance_from_units(units: LightUnits, value: f32, geometry: AreaLightGeometry) -> f32 {
    match units {
        LightUnits::Luminance => value,
        LightUnits::Illuminance => {
            let angular_radius = geometry.radius.atan2(geometry.distance);
            value / illuminance_integral(angular_radius)
        }
        LightUnits::LuminousPower => value / luminous_power_factor(geometry.radius),
        LightUnits::EV100 if value <= MIN_EV100 => 0.0,
        LightUnits::EV100 => 2f32.powf(value - 3.0),
    }
}

fn ev100_from_luminance(luminance: f32) -> f32 {
    if luminance <= 0.0 {
        return MIN_EV100;
    }
    (luminance.log2() + 3.0).max(MIN_EV100)
}

/// Whether `a` and `b` differ by more than float round-off from a unit
/// conversion round trip.
fn differs(a: f32, b: f32) -> bool {
    (a - b).abs() > 1e-4 * a.abs().max(b.abs())
}

/// Converts an intensity given in `units` into all four units.
pub fn area_light_radiometry(units: LightUnits, value: f32, geometry: AreaLightGeometry) -> AreaLightRadiometry {
    let luminance = luminance_from_units(units, value, geometry);
    let angular_radius = geometry.radius.atan2(geometry.distance);
    AreaLightRadiometry {
        luminance,
        illuminance: luminance * illuminance_integral(angular_radius),
        luminous_power: luminance * luminous_power_factor(geometry.radius),
        ev100: ev100_from_luminance(luminance),
    }
}

fn unit_param(units: LightUnits) -> &'static str {
    match units {
        LightUnits::Luminance => names::AREA_LIGHT_LUMINANCE,
        LightUnits::Illuminance => names::AREA_LIGHT_ILLUMINANCE,
        LightUnits::LuminousPower => names::AREA_LIGHT_LUMINOUS_POWER,
        LightUnits::EV100 => names::AREA_LIGHT_EV100,
    }
}

/// Keeps the four area light intensity parameters consistent.
///
/// The unit that was active on the previous update is the source of truth;
/// the other three are rewritten from it.
#[derive(Clone, Debug, Default)]
pub struct AreaLightUnitsSync {
    prev_units: Option<LightUnits>,
}

impl AreaLightUnitsSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if any parameter was rewritten.
    pub fn update(&mut self, registry: &mut Registry) -> SettingsResult<bool> {
        let current: LightUnits = registry.choice(names::AREA_LIGHT_UNITS)?;
        let source = self.prev_units.unwrap_or(current);
        self.prev_units = Some(current);

        let geometry = AreaLightGeometry {
            radius: registry.float(names::AREA_LIGHT_SIZE)?,
            distance: registry.float(names::AREA_LIGHT_ILLUMINANCE_DISTANCE)?,
        };
        let value = registry.float(unit_param(source))?;
        let r = area_light_radiometry(source, value, geometry);

        let mut changed = false;
        for (units, v) in [
            (LightUnits::Luminance, r.luminance),
            (LightUnits::Illuminance, r.illuminance),
            (LightUnits::LuminousPower, r.luminous_power),
            (LightUnits::EV100, r.ev100),
        ] {
            // rewriting round-off would register as an edit and restart the bake
            if units != source && differs(registry.float(unit_param(units))?, v) {
                changed |= registry.set_float(unit_param(units), v)?;
            }
        }
        Ok(changed)
    }
}

/// Area light radiance from the registry, scaled by `FP16_SCALE`.
pub fn area_light_radiance(registry: &Registry) -> SettingsResult<Color> {
    let tint = registry.color(names::AREA_LIGHT_COLOR)?;
    let luminance = registry.float(names::AREA_LIGHT_LUMINANCE)?;
    Ok(tint * luminance * FP16_SCALE)
}
