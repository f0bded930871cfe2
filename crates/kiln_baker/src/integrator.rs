//! Path tracer shared by lightmap baking, probe capture, voxel shading
//! and the ground truth preview.
//!
//! Paths are traced iteratively, so an unbounded path length cannot overflow
//! the stack:
//! - emission is added at every hit
//! - sun and area light are sampled explicitly (next event estimation)
//! - the bounce direction is cosine-weighted
//! - Russian roulette ends long paths

use crate::geometry::{SceneGeometry, RAY_BIAS};
use crate::hittable::HitRecord;
use crate::light::{area_light_radiance, LightModel, SunParams};
use crate::sampling::gen_f32;
use kiln_core::settings::{names, Registry, SettingsResult, SkyMode};
use kiln_core::FP16_SCALE;
use kiln_math::sampling::{cone_solid_angle, sample_uniform_cone, Frame};
use kiln_math::{luminance, max_component, Color, Ray, Vec2, Vec3};
use rand::RngCore;
use std::f32::consts::{FRAC_1_PI, PI};

/// Distance reported for rays that escape the scene.
pub const FAR_DISTANCE: f32 = 1000.0;

/// Per-consumer path configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSettings {
    /// Maximum number of bounces, -1 for unbounded.
    pub max_path_length: i32,
    /// First depth at which Russian roulette runs, -1 to disable.
    pub roulette_depth: i32,
    pub roulette_probability: f32,
    /// Sample the sun and area light at every hit.
    pub enable_direct: bool,
    /// Continue paths past the first hit.
    pub enable_indirect: bool,
    /// Camera rays that escape towards the sun see the sun disc.
    pub primary_sees_sun: bool,
    /// Camera rays can hit the area light sphere.
    pub primary_sees_area_light: bool,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            max_path_length: -1,
            roulette_depth: 4,
            roulette_probability: 0.5,
            enable_direct: true,
            enable_indirect: true,
            primary_sees_sun: false,
            primary_sees_area_light: false,
        }
    }
}

impl PathSettings {
    fn from_registry(registry: &Registry, max: &str, rr_depth: &str, rr_prob: &str) -> SettingsResult<Self> {
        Ok(Self {
            max_path_length: registry.int(max)?,
            roulette_depth: registry.int(rr_depth)?,
            roulette_probability: registry.float(rr_prob)?,
            enable_direct: registry.flag(names::ENABLE_DIRECT_LIGHTING)?,
            enable_indirect: registry.flag(names::ENABLE_INDIRECT_LIGHTING)?,
            primary_sees_sun: false,
            primary_sees_area_light: false,
        })
    }

    /// Settings for lightmap texels. Direct sun on the texel is left to the
    /// real-time renderer; direct area light only when it is baked.
    pub fn lightmap(registry: &Registry) -> SettingsResult<Self> {
        let mut s = Self::from_registry(
            registry,
            names::MAX_BAKE_PATH_LENGTH,
            names::BAKE_RUSSIAN_ROULETTE_DEPTH,
            names::BAKE_RUSSIAN_ROULETTE_PROBABILITY,
        )?;
        s.primary_sees_area_light = registry.flag(names::BAKE_DIRECT_AREA_LIGHT)?;
        Ok(s)
    }

    pub fn probes(registry: &Registry) -> SettingsResult<Self> {
        let mut s = Self::lightmap(registry)?;
        s.primary_sees_sun = true;
        Ok(s)
    }

    pub fn ground_truth(registry: &Registry) -> SettingsResult<Self> {
        let mut s = Self::from_registry(
            registry,
            names::MAX_RENDER_PATH_LENGTH,
            names::RENDER_RUSSIAN_ROULETTE_DEPTH,
            names::RENDER_RUSSIAN_ROULETTE_PROBABILITY,
        )?;
        s.primary_sees_sun = true;
        s.primary_sees_area_light = true;
        Ok(s)
    }
}

/// The sun as a disc light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunLight {
    /// Unit vector towards the sun.
    pub direction: Vec3,
    pub radiance: Color,
    /// Cosine of the angular radius.
    pub cos_radius: f32,
}

/// A spherical area light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaLight {
    pub position: Vec3,
    pub radius: f32,
    pub radiance: Color,
    pub shadows: bool,
    pub shadow_bias: f32,
}

impl AreaLight {
    /// Ray parameter of the nearest intersection with the sphere, if any.
    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        let oc = ray.origin - self.position;
        let a = ray.direction.length_squared();
        let half_b = oc.dot(ray.direction);
        let c = oc.length_squared() - self.radius * self.radius;
        let disc = half_b * half_b - a * c;
        if disc < 0.0 || a == 0.0 {
            return None;
        }
        let sqrt_d = disc.sqrt();
        [(-half_b - sqrt_d) / a, (-half_b + sqrt_d) / a]
            .into_iter()
            .find(|&t| t > 0.0)
    }
}

/// Radiance of rays that leave the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SkyModel {
    None,
    /// Constant radiance in every direction.
    Simple { radiance: Color },
    /// CIE clear sky luminance distribution with a turbidity-driven tint.
    Procedural {
        sun_direction: Vec3,
        zenith_luminance: f32,
        tint: Color,
        ground: Color,
        /// Normalizes the distribution so the zenith has `zenith_luminance`.
        norm: f32,
    },
}

/// CIE clear sky indicatrix.
fn clear_sky_indicatrix(gamma: f32) -> f32 {
    let cos_gamma = gamma.cos();
    0.91 + 10.0 * (-3.0 * gamma).exp() + 0.45 * cos_gamma * cos_gamma
}

/// CIE clear sky gradation.
fn clear_sky_gradation(cos_theta: f32) -> f32 {
    1.0 - (-0.32 / cos_theta.max(1e-3)).exp()
}

impl SkyModel {
    pub fn procedural(sun_direction: Vec3, turbidity: f32, ground_albedo: Color) -> Self {
        let sun_direction = sun_direction.try_normalize().unwrap_or(Vec3::Y);
        let theta_s = sun_direction.y.clamp(-1.0, 1.0).acos();
        // Preetham zenith luminance in kcd/m^2
        let chi = (4.0 / 9.0 - turbidity / 120.0) * (PI - 2.0 * theta_s);
        let yz = (4.0453 * turbidity - 4.9710) * chi.tan() - 0.2155 * turbidity + 2.4192;
        let zenith_luminance = (yz * 1000.0).max(0.0) * FP16_SCALE;

        let blue = Color::new(0.45, 0.65, 1.0);
        let t = ((turbidity - 1.0) / 9.0).clamp(0.0, 1.0);
        let tint = blue.lerp(Color::ONE, t);
        let tint = tint / luminance(tint);

        let norm = clear_sky_indicatrix(theta_s) * clear_sky_gradation(1.0);
        Self::Procedural {
            sun_direction,
            zenith_luminance,
            tint,
            ground: ground_albedo * zenith_luminance * 0.5,
            norm,
        }
    }

    pub fn radiance(&self, direction: Vec3) -> Color {
        match *self {
            SkyModel::None => Color::ZERO,
            SkyModel::Simple { radiance } => radiance,
            SkyModel::Procedural {
                sun_direction,
                zenith_luminance,
                tint,
                ground,
                norm,
            } => {
                let d = direction.normalize_or_zero();
                if d.y < 0.0 {
                    return ground;
                }
                let gamma = d.dot(sun_direction).clamp(-1.0, 1.0).acos();
                let relative = clear_sky_indicatrix(gamma) * clear_sky_gradation(d.y) / norm;
                tint * (zenith_luminance * relative)
            }
        }
    }
}

/// Everything a path can receive light from.
#[derive(Debug, Clone, Copy)]
pub struct LightingEnvironment {
    pub sun: Option<SunLight>,
    pub area_light: Option<AreaLight>,
    pub sky: SkyModel,
    pub albedo_scale: f32,
}

impl Default for LightingEnvironment {
    fn default() -> Self {
        Self {
            sun: None,
            area_light: None,
            sky: SkyModel::None,
            albedo_scale: 1.0,
        }
    }
}

impl LightingEnvironment {
    /// Builds the lighting from the current parameter values.
    pub fn from_registry(registry: &Registry, light_model: &mut LightModel) -> SettingsResult<Self> {
        let sun_params = SunParams::from_registry(registry)?;
        let sun = if registry.flag(names::ENABLE_SUN)? {
            let (radiance, cached) = light_model.sun_radiance(&sun_params);
            if !cached {
                log::debug!("sun radiance {:?}", radiance);
            }
            Some(SunLight {
                direction: sun_params.effective_direction(),
                radiance,
                cos_radius: sun_params.size.to_radians().cos(),
            })
        } else {
            None
        };

        let area_light = if registry.flag(names::ENABLE_AREA_LIGHT)? {
            Some(AreaLight {
                position: Vec3::new(
                    registry.float(names::AREA_LIGHT_X)?,
                    registry.float(names::AREA_LIGHT_Y)?,
                    registry.float(names::AREA_LIGHT_Z)?,
                ),
                radius: registry.float(names::AREA_LIGHT_SIZE)?,
                radiance: area_light_radiance(registry)?,
                shadows: registry.flag(names::ENABLE_AREA_LIGHT_SHADOWS)?,
                shadow_bias: registry.float(names::AREA_LIGHT_SHADOW_BIAS)?,
            })
        } else {
            None
        };

        let sky = match registry.choice::<SkyMode>(names::SKY_MODE)? {
            SkyMode::None => SkyModel::None,
            SkyMode::Simple => SkyModel::Simple {
                radiance: registry.color(names::SKY_COLOR)? * FP16_SCALE,
            },
            SkyMode::Procedural => SkyModel::procedural(
                sun_params.effective_direction(),
                sun_params.effective_turbidity(),
                registry.color(names::GROUND_ALBEDO)?,
            ),
        };

        Ok(Self {
            sun,
            area_light,
            sky,
            albedo_scale: registry.float(names::DIFFUSE_ALBEDO_SCALE)?,
        })
    }
}

/// Why a path stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Active,
    MaxDepth,
    RouletteKilled,
    Miss,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathResult {
    pub radiance: Color,
    /// Number of bounces taken.
    pub bounces: u32,
    pub termination: Termination,
    /// Rays traced, shadow rays included.
    pub sample_cost: u32,
    /// Distance to the first hit, `FAR_DISTANCE` on a miss.
    pub hit_distance: f32,
    /// The radiance was NaN, infinite or negative and has been zeroed.
    pub degenerate: bool,
}

/// Traces paths through one scene under one lighting environment.
#[derive(Clone, Copy)]
pub struct PathTracer<'a> {
    geometry: &'a SceneGeometry,
    lighting: &'a LightingEnvironment,
}

impl<'a> PathTracer<'a> {
    pub fn new(geometry: &'a SceneGeometry, lighting: &'a LightingEnvironment) -> Self {
        Self { geometry, lighting }
    }

    pub fn geometry(&self) -> &'a SceneGeometry {
        self.geometry
    }

    pub fn lighting(&self) -> &'a LightingEnvironment {
        self.lighting
    }

    /// Incident radiance at `origin` from `direction`.
    pub fn trace_radiance(
        &self,
        origin: Vec3,
        direction: Vec3,
        settings: &PathSettings,
        rng: &mut dyn RngCore,
    ) -> PathResult {
        let mut ray = Ray::new(origin, direction.normalize_or_zero());
        let mut radiance = Color::ZERO;
        let mut beta = Color::ONE;
        let mut depth: u32 = 0;
        let mut cost = 0;
        let mut hit_distance = FAR_DISTANCE;
        let mut termination = Termination::Active;

        while termination == Termination::Active {
            cost += 1;
            let hit = self.geometry.intersect(&ray, f32::INFINITY);
            let primary = depth == 0;

            if primary && settings.primary_sees_area_light {
                if let Some(light) = &self.lighting.area_light {
                    if let Some(t) = light.intersect(&ray) {
                        if hit.map_or(true, |h| t < h.t) {
                            radiance += beta * light.radiance;
                            hit_distance = t;
                            termination = Termination::Miss;
                            continue;
                        }
                    }
                }
            }

            let Some(rec) = hit else {
                radiance += beta * self.escaped_radiance(ray.direction, primary && settings.primary_sees_sun);
                termination = Termination::Miss;
                continue;
            };

            if primary {
                hit_distance = rec.t;
            }

            let surface = self.geometry.surface(&rec);
            radiance += beta * surface.emitted();

            if settings.enable_direct {
                let e = self.direct_irradiance(&rec, rng, &mut cost);
                radiance += beta * surface.eval(self.lighting.albedo_scale) * e;
            }

            if !settings.enable_indirect
                || (settings.max_path_length >= 0 && depth as i64 >= settings.max_path_length as i64)
            {
                termination = Termination::MaxDepth;
                continue;
            }

            if settings.roulette_depth >= 0 && depth as i64 >= settings.roulette_depth as i64 {
                let q = settings.roulette_probability.min(max_component(beta));
                if q <= 0.0 || gen_f32(rng) >= q {
                    termination = Termination::RouletteKilled;
                    continue;
                }
                beta /= q;
            }

            let u = Vec2::new(gen_f32(rng), gen_f32(rng));
            let scatter = surface.scatter(rec.normal, u, self.lighting.albedo_scale);
            beta *= scatter.attenuation;
            ray = Ray::spawn(rec.p, rec.geometric_normal, scatter.direction, RAY_BIAS);
            depth += 1;

            if beta == Color::ZERO {
                termination = Termination::MaxDepth;
            }
        }

        let degenerate = !radiance.is_finite() || radiance.min_element() < 0.0;
        PathResult {
            radiance: if degenerate { Color::ZERO } else { radiance },
            bounces: depth,
            termination,
            sample_cost: cost,
            hit_distance,
            degenerate,
        }
    }

    /// Sky radiance for an escaping ray, plus the sun disc when visible.
    pub fn escaped_radiance(&self, direction: Vec3, include_sun: bool) -> Color {
        let d = direction.normalize_or_zero();
        let mut l = self.lighting.sky.radiance(d);
        if include_sun {
            if let Some(sun) = &self.lighting.sun {
                if d.dot(sun.direction) >= sun.cos_radius {
                    l += sun.radiance;
                }
            }
        }
        l
    }

    /// Irradiance at a hit from the sun and the area light, shadow tested.
    pub fn direct_irradiance(&self, rec: &HitRecord, rng: &mut dyn RngCore, cost: &mut u32) -> Color {
        let mut e = Color::ZERO;

        if let Some(sun) = &self.lighting.sun {
            let u = Vec2::new(gen_f32(rng), gen_f32(rng));
            let local = sample_uniform_cone(u, sun.cos_radius);
            let dir = Frame::from_normal(sun.direction).to_world(local);
            let cos = rec.normal.dot(dir);
            if cos > 0.0 && rec.geometric_normal.dot(dir) > 0.0 {
                *cost += 1;
                let shadow = Ray::spawn(rec.p, rec.geometric_normal, dir, RAY_BIAS);
                if !self.geometry.occluded(&shadow, f32::INFINITY) {
                    e += sun.radiance * cos * cone_solid_angle(sun.cos_radius);
                }
            }
        }

        if let Some(light) = &self.lighting.area_light {
            let to_light = light.position - rec.p;
            let dist = to_light.length();
            if dist > light.radius {
                let sin_max = light.radius / dist;
                let cos_max = (1.0 - sin_max * sin_max).max(0.0).sqrt();
                let u = Vec2::new(gen_f32(rng), gen_f32(rng));
                let dir = Frame::from_normal(to_light / dist).to_world(sample_uniform_cone(u, cos_max));
                let cos = rec.normal.dot(dir);
                if cos > 0.0 && rec.geometric_normal.dot(dir) > 0.0 {
                    let visible = if light.shadows {
                        *cost += 1;
                        let shadow = Ray::spawn(rec.p, rec.geometric_normal, dir, RAY_BIAS + light.shadow_bias);
                        !self.geometry.occluded(&shadow, (dist - light.radius).max(0.0))
                    } else {
                        true
                    };
                    if visible {
                        e += light.radiance * cos * cone_solid_angle(cos_max);
                    }
                }
            }
        }

        e
    }

    /// Outgoing radiance of a surface lit only by direct light and its emission.
    pub fn direct_radiance(&self, rec: &HitRecord, rng: &mut dyn RngCore) -> Color {
        let surface = self.geometry.surface(rec);
        let mut cost = 0;
        let e = self.direct_irradiance(rec, rng, &mut cost);
        surface.emitted() + surface.albedo() * self.lighting.albedo_scale * FRAC_1_PI * e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use kiln_core::{Material, Mesh, Scene};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn closed_box(albedo: f32) -> SceneGeometry {
        let mut scene = Scene::new("closed");
        let m = scene.add_material(Material::new("walls", Vec3::splat(albedo)));
        let mut mesh = Mesh::default();
        mesh.push_box(Vec3::splat(-1.0), Vec3::splat(1.0));
        scene.add_object("box", mesh, m);
        SceneGeometry::from_scene(&scene)
    }

    fn open_ground() -> SceneGeometry {
        SceneGeometry::from_scene(&Scene::box_scene())
    }

    #[test]
    fn test_roulette_expected_path_length() {
        let geometry = closed_box(0.9);
        let lighting = LightingEnvironment::default();
        let tracer = PathTracer::new(&geometry, &lighting);
        let settings = PathSettings {
            max_path_length: -1,
            roulette_depth: 4,
            roulette_probability: 0.5,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(42);

        let mut total = 0u64;
        let mut killed = 0u64;
        for i in 0..100_000 {
            // many of these aim exactly at box edges, corners and quad diagonals
            let dir = Vec3::new((i % 7) as f32 - 3.0, 1.0, (i % 5) as f32 - 2.0);
            let r = tracer.trace_radiance(Vec3::ZERO, dir, &settings, &mut rng);
            if r.termination != Termination::RouletteKilled {
                continue;
            }
            assert!(r.bounces >= 4);
            total += r.bounces as u64;
            killed += 1;
        }
        assert!(killed > 99_900);
        // 4 guaranteed bounces, then a geometric number with p = 0.5
        let mean = total as f64 / killed as f64;
        assert!((mean - 5.0).abs() < 0.05, "mean path length {}", mean);
    }

    #[test]
    fn test_closed_box_has_no_leaks_at_edges() {
        let geometry = closed_box(0.5);
        let mut directions = Vec::new();
        for x in -3..=3 {
            for z in -3..=3 {
                for y in [-1.0, 1.0] {
                    directions.push(Vec3::new(x as f32, y, z as f32));
                    directions.push(Vec3::new(x as f32 * 0.5, y, z as f32 * 0.5));
                }
            }
        }
        for origin in [Vec3::ZERO, Vec3::new(0.25, -0.5, 0.125)] {
            for dir in &directions {
                let ray = Ray::new(origin, *dir);
                let rec = geometry.intersect(&ray, f32::INFINITY);
                assert!(rec.is_some(), "ray {:?} from {:?} escaped", dir, origin);
                let p = rec.map_or(Vec3::ZERO, |r| r.p);
                assert!(p.abs().max_element() <= 1.0 + 1e-5);
            }
        }
    }

    #[test]
    fn test_max_path_length_caps_bounces() {
        let geometry = closed_box(0.9);
        let lighting = LightingEnvironment::default();
        let tracer = PathTracer::new(&geometry, &lighting);
        let mut rng = StdRng::seed_from_u64(1);
        for max in [0, 1, 3] {
            let settings = PathSettings {
                max_path_length: max,
                roulette_depth: -1,
                ..Default::default()
            };
            let r = tracer.trace_radiance(Vec3::ZERO, Vec3::X, &settings, &mut rng);
            assert_eq!(r.termination, Termination::MaxDepth);
            assert_eq!(r.bounces, max as u32);
        }
    }

    #[test]
    fn test_simple_sky_white_furnace() {
        // a ray escaping straight to a uniform sky returns the sky radiance
        let geometry = open_ground();
        let lighting = LightingEnvironment {
            sky: SkyModel::Simple { radiance: Color::ONE },
            ..Default::default()
        };
        let tracer = PathTracer::new(&geometry, &lighting);
        let mut rng = StdRng::seed_from_u64(3);
        let r = tracer.trace_radiance(Vec3::new(0.0, 10.0, 8.0), Vec3::Y, &PathSettings::default(), &mut rng);
        assert_eq!(r.termination, Termination::Miss);
        assert_eq!(r.radiance, Color::ONE);
        assert_eq!(r.bounces, 0);
        assert_eq!(r.hit_distance, FAR_DISTANCE);
    }

    #[test]
    fn test_sun_only_visible_to_primary_rays_when_enabled() {
        let geometry = open_ground();
        let lighting = LightingEnvironment {
            sun: Some(SunLight {
                direction: Vec3::Y,
                radiance: Color::splat(100.0),
                cos_radius: BASE_COS,
            }),
            ..Default::default()
        };
        let tracer = PathTracer::new(&geometry, &lighting);
        let mut rng = StdRng::seed_from_u64(3);
        let origin = Vec3::new(0.0, 10.0, 8.0);

        let hidden = tracer.trace_radiance(origin, Vec3::Y, &PathSettings::default(), &mut rng);
        assert_eq!(hidden.radiance, Color::ZERO);

        let settings = PathSettings {
            primary_sees_sun: true,
            ..Default::default()
        };
        let seen = tracer.trace_radiance(origin, Vec3::Y, &settings, &mut rng);
        assert_eq!(seen.radiance, Color::splat(100.0));
    }

    const BASE_COS: f32 = 0.999_989;

    #[test]
    fn test_direct_sun_on_ground() {
        let geometry = open_ground();
        let sun_radiance = 1000.0;
        let lighting = LightingEnvironment {
            sun: Some(SunLight {
                direction: Vec3::Y,
                radiance: Color::splat(sun_radiance),
                cos_radius: BASE_COS,
            }),
            ..Default::default()
        };
        let tracer = PathTracer::new(&geometry, &lighting);
        let mut rng = StdRng::seed_from_u64(9);
        let settings = PathSettings {
            max_path_length: 0,
            ..Default::default()
        };

        // looking down at an unoccluded ground point with albedo 0.7
        let r = tracer.trace_radiance(Vec3::new(0.0, 10.0, 8.0), Vec3::NEG_Y, &settings, &mut rng);
        let expected = 0.7 * FRAC_1_PI * sun_radiance * cone_solid_angle(BASE_COS);
        assert_relative_eq!(r.radiance.x, expected, max_relative = 1e-3);
        assert_relative_eq!(r.hit_distance, 10.0, epsilon = 1e-3);
    }

    #[test]
    fn test_area_light_seen_by_primary_rays() {
        let geometry = open_ground();
        let light = AreaLight {
            position: Vec3::new(0.0, 5.0, 8.0),
            radius: 0.5,
            radiance: Color::splat(50.0),
            shadows: true,
            shadow_bias: 0.0,
        };
        let lighting = LightingEnvironment {
            area_light: Some(light),
            ..Default::default()
        };
        let tracer = PathTracer::new(&geometry, &lighting);
        let mut rng = StdRng::seed_from_u64(0);
        let settings = PathSettings {
            primary_sees_area_light: true,
            ..Default::default()
        };
        let r = tracer.trace_radiance(Vec3::new(0.0, 10.0, 8.0), Vec3::NEG_Y, &settings, &mut rng);
        assert_eq!(r.radiance, Color::splat(50.0));
        assert_relative_eq!(r.hit_distance, 4.5, epsilon = 1e-4);
    }

    #[test]
    fn test_procedural_sky() {
        let sun = Vec3::new(0.0, 0.8, 0.6);
        let sky = SkyModel::procedural(sun, 2.0, Color::splat(0.3));
        let zenith = sky.radiance(Vec3::Y);
        let near_sun = sky.radiance(Vec3::new(0.0, 0.75, 0.66));
        let away = sky.radiance(Vec3::new(0.0, 0.5, -0.87));
        let ground = sky.radiance(Vec3::NEG_Y);
        assert!(zenith.min_element() > 0.0);
        assert!(luminance(near_sun) > luminance(away));
        // clear skies are blue
        assert!(zenith.z > zenith.x);
        assert!(ground.min_element() > 0.0);
        if let SkyModel::Procedural { zenith_luminance, .. } = sky {
            assert_relative_eq!(luminance(zenith), zenith_luminance, max_relative = 1e-3);
        }
    }

    #[test]
    fn test_from_registry_defaults() {
        let registry = Registry::with_defaults();
        let mut model = LightModel::new();
        let env = LightingEnvironment::from_registry(&registry, &mut model).unwrap();
        assert!(env.sun.is_some());
        assert!(env.area_light.is_none());
        assert!(matches!(env.sky, SkyModel::Procedural { .. }));
        assert_eq!(env.albedo_scale, 0.5);

        let lm = PathSettings::lightmap(&registry).unwrap();
        assert!(!lm.primary_sees_sun);
        assert!(PathSettings::probes(&registry).unwrap().primary_sees_sun);
        assert!(PathSettings::ground_truth(&registry).unwrap().primary_sees_area_light);
    }
}
