//! Progressive probe volume baking, one probe per frame.
//!
//! Each probe captures a radiance + distance cubemap with the path tracer and
//! integrates it either into prefiltered irradiance/distance cubemaps or into a
//! basis stored in 3D volume textures.

use crate::basis::{probe_projector, BasisProjector};
use crate::integrator::{PathSettings, PathTracer, FAR_DISTANCE};
use crate::sampling::hammersley;
use kiln_core::settings::{names, ProbeMode, Registry, SettingsResult};
use kiln_math::sampling::{sample_cosine_hemisphere, sample_uniform_hemisphere, Frame};
use kiln_math::{Aabb, Color, UVec3, Vec2, Vec3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

/// Layer limit of the texture arrays the probes are uploaded to.
pub const MAX_TEXTURE_ARRAY_LAYERS: u32 = 2048;

/// Cube faces in capture order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CubeFace {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PosX,
        CubeFace::NegX,
        CubeFace::PosY,
        CubeFace::NegY,
        CubeFace::PosZ,
        CubeFace::NegZ,
    ];

    /// Direction through face coordinates `(u, v)` in `[-1, 1]`, v pointing down.
    pub fn direction(self, u: f32, v: f32) -> Vec3 {
        let d = match self {
            CubeFace::PosX => Vec3::new(1.0, -v, -u),
            CubeFace::NegX => Vec3::new(-1.0, -v, u),
            CubeFace::PosY => Vec3::new(u, 1.0, v),
            CubeFace::NegY => Vec3::new(u, -1.0, -v),
            CubeFace::PosZ => Vec3::new(u, -v, 1.0),
            CubeFace::NegZ => Vec3::new(-u, -v, -1.0),
        };
        d.normalize()
    }

    /// Face and `(u, v)` hit by a direction.
    pub fn lookup(dir: Vec3) -> (CubeFace, f32, f32) {
        let a = dir.abs();
        if a.x >= a.y && a.x >= a.z {
            if dir.x > 0.0 {
                (CubeFace::PosX, -dir.z / a.x, -dir.y / a.x)
            } else {
                (CubeFace::NegX, dir.z / a.x, -dir.y / a.x)
            }
        } else if a.y >= a.z {
            if dir.y > 0.0 {
                (CubeFace::PosY, dir.x / a.y, dir.z / a.y)
            } else {
                (CubeFace::NegY, dir.x / a.y, -dir.z / a.y)
            }
        } else if dir.z > 0.0 {
            (CubeFace::PosZ, dir.x / a.z, -dir.y / a.z)
        } else {
            (CubeFace::NegZ, -dir.x / a.z, -dir.y / a.z)
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

fn area_element(x: f32, y: f32) -> f32 {
    (x * y).atan2((x * x + y * y + 1.0).sqrt())
}

/// Solid angle subtended by texel `(x, y)` of a `resolution^2` face.
pub fn texel_solid_angle(x: u32, y: u32, resolution: u32) -> f32 {
    let inv = 1.0 / resolution as f32;
    let x0 = 2.0 * x as f32 * inv - 1.0;
    let y0 = 2.0 * y as f32 * inv - 1.0;
    let x1 = x0 + 2.0 * inv;
    let y1 = y0 + 2.0 * inv;
    area_element(x0, y0) - area_element(x0, y1) - area_element(x1, y0) + area_element(x1, y1)
}

/// Face, x, y and center direction of texel `index` in a cubemap of `resolution`.
pub fn cube_texel(resolution: u32, index: usize) -> (CubeFace, u32, u32, Vec3) {
    let r = resolution.max(1) as usize;
    let face = CubeFace::ALL[(index / (r * r)).min(5)];
    let x = (index % r) as u32;
    let y = ((index / r) % r) as u32;
    let u = 2.0 * (x as f32 + 0.5) / r as f32 - 1.0;
    let v = 2.0 * (y as f32 + 0.5) / r as f32 - 1.0;
    (face, x, y, face.direction(u, v))
}

/// A cubemap with `resolution^2` texels per face, faces in [`CubeFace::ALL`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct CubeMap<T> {
    pub resolution: u32,
    pub texels: Vec<T>,
}

impl<T: Copy + Default> CubeMap<T> {
    pub fn new(resolution: u32) -> Self {
        let resolution = resolution.max(1);
        Self {
            resolution,
            texels: vec![T::default(); 6 * (resolution * resolution) as usize],
        }
    }

    pub fn index(&self, face: CubeFace, x: u32, y: u32) -> usize {
        let r = self.resolution;
        face.index() * (r * r) as usize + (y * r + x) as usize
    }

    /// Face, x, y and direction through the center of texel `index`.
    pub fn texel_direction(&self, index: usize) -> (CubeFace, u32, u32, Vec3) {
        cube_texel(self.resolution, index)
    }

    /// Nearest texel in direction `dir`.
    pub fn sample(&self, dir: Vec3) -> T {
        let (face, u, v) = CubeFace::lookup(dir);
        let r = self.resolution;
        let to_texel = |c: f32| (((c + 1.0) * 0.5 * r as f32) as u32).min(r - 1);
        self.texels[self.index(face, to_texel(u), to_texel(v))]
    }
}

/// Probe layout over the scene bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeGrid {
    pub resolution: UVec3,
    pub bounds: Aabb,
}

impl ProbeGrid {
    pub fn new(resolution: UVec3, bounds: Aabb) -> Self {
        Self {
            resolution: resolution.max(UVec3::ONE),
            bounds,
        }
    }

    /// Probe count, saturating at `u32::MAX` for grids that were never fitted.
    pub fn count(&self) -> u32 {
        probe_count(self.resolution).min(u32::MAX as u64) as u32
    }

    pub fn coord(&self, index: u32) -> UVec3 {
        let r = self.resolution;
        UVec3::new(index % r.x, (index / r.x) % r.y, index / (r.x * r.y))
    }

    pub fn index(&self, coord: UVec3) -> u32 {
        let r = self.resolution;
        coord.x + coord.y * r.x + coord.z * r.x * r.y
    }

    /// Probes sit at cell centers.
    pub fn position(&self, index: u32) -> Vec3 {
        let t = (self.coord(index).as_vec3() + 0.5) / self.resolution.as_vec3();
        self.bounds.lerp(t)
    }
}

fn probe_count(resolution: UVec3) -> u64 {
    (resolution.x as u64)
        .saturating_mul(resolution.y as u64)
        .saturating_mul(resolution.z as u64)
}

/// Texture array layers needed for a grid in the given mode.
pub fn layers_required(resolution: UVec3, mode: ProbeMode) -> u64 {
    let probes = probe_count(resolution);
    match mode {
        ProbeMode::CubeMap => probes.saturating_mul(6),
        _ => probes,
    }
}

/// Shrinks the largest dimension (X, then Y, then Z on ties) until the grid
/// fits in [`MAX_TEXTURE_ARRAY_LAYERS`].
pub fn fit_probe_resolution(resolution: UVec3, mode: ProbeMode) -> UVec3 {
    let mut r = resolution.max(UVec3::ONE);
    while layers_required(r, mode) > MAX_TEXTURE_ARRAY_LAYERS as u64 && r != UVec3::ONE {
        let max = r.max_element();
        if r.x == max {
            r.x -= 1;
        } else if r.y == max {
            r.y -= 1;
        } else {
            r.z -= 1;
        }
    }
    r
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeSettings {
    pub mode: ProbeMode,
    pub resolution: UVec3,
    pub capture_resolution: u32,
    pub irradiance_resolution: u32,
    pub distance_resolution: u32,
    pub distance_sharpness: f32,
    pub sqrt_integration_samples: u32,
    pub sqrt_distance_samples: u32,
    pub always_regenerate: bool,
    pub bounds_scale: f32,
    pub bounds_offset: Vec3,
    pub path: PathSettings,
}

impl ProbeSettings {
    pub fn from_registry(registry: &Registry) -> SettingsResult<Self> {
        let dim = |name| registry.int(name).map(|v| v.max(1) as u32);
        let mode = registry.choice(names::PROBE_MODE)?;
        let requested = UVec3::new(dim(names::PROBE_RES_X)?, dim(names::PROBE_RES_Y)?, dim(names::PROBE_RES_Z)?);
        Ok(Self {
            mode,
            // never allocate more probes than the texture arrays can hold
            resolution: fit_probe_resolution(requested, mode),
            capture_resolution: dim(names::PROBE_CUBEMAP_CAPTURE_RES)?,
            irradiance_resolution: dim(names::PROBE_IRRADIANCE_CUBEMAP_RES)?,
            distance_resolution: dim(names::PROBE_DISTANCE_CUBEMAP_RES)?,
            distance_sharpness: registry.float(names::DISTANCE_FILTER_SHARPNESS)?,
            sqrt_integration_samples: dim(names::PROBE_INTEGRATION_SAMPLES)?,
            sqrt_distance_samples: dim(names::PROBE_DISTANCE_INTEGRATION_SAMPLES)?,
            always_regenerate: registry.flag(names::ALWAYS_REGENERATE_PROBES)?,
            bounds_scale: registry.float(names::SCENE_BOUNDS_SCALE)?,
            bounds_offset: Vec3::new(
                registry.float(names::SCENE_BOUNDS_OFFSET_X)?,
                registry.float(names::SCENE_BOUNDS_OFFSET_Y)?,
                registry.float(names::SCENE_BOUNDS_OFFSET_Z)?,
            ),
            path: PathSettings::probes(registry)?,
        })
    }

    pub fn grid(&self, scene_bounds: Aabb) -> ProbeGrid {
        ProbeGrid::new(self.resolution, scene_bounds.scaled(self.bounds_scale, self.bounds_offset))
    }
}

/// Baked probe results.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeData {
    CubeMaps {
        /// Irradiance / pi per probe.
        irradiance: Vec<CubeMap<Color>>,
        /// Filtered (mean, mean squared) distance per probe.
        distance: Vec<CubeMap<Vec2>>,
    },
    Volume {
        mode: ProbeMode,
        resolution: UVec3,
        /// `textures[basis][probe]`, probes in grid index order.
        textures: Vec<Vec<Color>>,
    },
}

impl ProbeData {
    fn empty(settings: &ProbeSettings, grid: &ProbeGrid) -> Self {
        let count = grid.count() as usize;
        match settings.mode.basis_count() {
            None => ProbeData::CubeMaps {
                irradiance: vec![CubeMap::new(settings.irradiance_resolution); count],
                distance: vec![CubeMap::new(settings.distance_resolution); count],
            },
            Some(n) => ProbeData::Volume {
                mode: settings.mode,
                resolution: grid.resolution,
                textures: vec![vec![Color::ZERO; count]; n],
            },
        }
    }
}

/// Radiance and first-hit distance seen from a probe.
#[derive(Debug, Clone)]
pub struct ProbeCapture {
    pub radiance: CubeMap<Color>,
    pub distance: CubeMap<f32>,
}

fn capture_seed(probe: u32, texel: usize) -> u64 {
    ((probe as u64) << 32) ^ texel as u64 ^ 0x9e37_79b9_7f4a_7c15
}

pub fn capture_probe(tracer: &PathTracer, settings: &PathSettings, position: Vec3, resolution: u32, probe: u32) -> ProbeCapture {
    let mut radiance = CubeMap::<Color>::new(resolution);
    let mut distance = CubeMap::<f32>::new(resolution);
    radiance
        .texels
        .par_iter_mut()
        .zip(distance.texels.par_iter_mut())
        .enumerate()
        .for_each(|(i, (l, d))| {
            let (_, _, _, dir) = cube_texel(resolution, i);
            let mut rng = StdRng::seed_from_u64(capture_seed(probe, i));
            let result = tracer.trace_radiance(position, dir, settings, &mut rng);
            *l = result.radiance;
            *d = result.hit_distance.min(FAR_DISTANCE);
        });
    ProbeCapture { radiance, distance }
}

/// Cosine-weighted average of the captured radiance around every texel direction.
pub fn integrate_irradiance(capture: &ProbeCapture, resolution: u32, sqrt_samples: u32) -> CubeMap<Color> {
    let mut out = CubeMap::<Color>::new(resolution);
    let n = sqrt_samples.max(1) * sqrt_samples.max(1);
    out.texels.par_iter_mut().enumerate().for_each(|(i, texel)| {
        let (_, _, _, normal) = cube_texel(resolution, i);
        let frame = Frame::from_normal(normal);
        let sum = (0..n).fold(Color::ZERO, |acc, s| {
            let dir = frame.to_world(sample_cosine_hemisphere(hammersley(s, n)));
            acc + capture.radiance.sample(dir)
        });
        *texel = sum / n as f32;
    });
    out
}

/// Mean and mean squared distance weighted by `max(0, n.w)^sharpness`.
pub fn integrate_distance(capture: &ProbeCapture, resolution: u32, sqrt_samples: u32, sharpness: f32) -> CubeMap<Vec2> {
    let mut out = CubeMap::<Vec2>::new(resolution);
    let n = sqrt_samples.max(1) * sqrt_samples.max(1);
    out.texels.par_iter_mut().enumerate().for_each(|(i, texel)| {
        let (_, _, _, normal) = cube_texel(resolution, i);
        let frame = Frame::from_normal(normal);
        let mut sum = Vec2::ZERO;
        let mut weight = 0.0;
        for s in 0..n {
            let local = sample_uniform_hemisphere(hammersley(s, n));
            let w = local.z.max(0.0).powf(sharpness);
            let d = capture.distance.sample(frame.to_world(local));
            sum += Vec2::new(d, d * d) * w;
            weight += w;
        }
        *texel = if weight > 0.0 { sum / weight } else { Vec2::ZERO };
    });
    out
}

/// Projects the capture onto a basis using exact texel solid angles.
pub fn project_capture(capture: &ProbeCapture, projector: &dyn BasisProjector) -> Vec<Color> {
    let map = &capture.radiance;
    let mut sums = vec![Color::ZERO; projector.basis_count()];
    for (i, l) in map.texels.iter().enumerate() {
        let (_, x, y, dir) = map.texel_direction(i);
        projector.project(dir, *l, texel_solid_angle(x, y, map.resolution), &mut sums);
    }
    let mut out = vec![Color::ZERO; sums.len()];
    projector.resolve(&sums, &[], 1, &mut out);
    out
}

pub struct ProbeBaker {
    settings: ProbeSettings,
    grid: ProbeGrid,
    projector: Option<Box<dyn BasisProjector>>,
    data: ProbeData,
    next: u32,
    progress: f32,
}

impl ProbeBaker {
    pub fn new(settings: ProbeSettings, scene_bounds: Aabb) -> Self {
        let grid = settings.grid(scene_bounds);
        Self {
            projector: probe_projector(settings.mode),
            data: ProbeData::empty(&settings, &grid),
            settings,
            grid,
            next: 0,
            progress: 0.0,
        }
    }

    /// Discards every baked probe and starts over.
    pub fn reset(&mut self, settings: ProbeSettings, scene_bounds: Aabb) {
        *self = Self::new(settings, scene_bounds);
        log::info!(
            "probe bake restarted: {}x{}x{} ({})",
            self.grid.resolution.x,
            self.grid.resolution.y,
            self.grid.resolution.z,
            self.settings.mode.label()
        );
    }

    pub fn settings(&self) -> &ProbeSettings {
        &self.settings
    }

    pub fn grid(&self) -> &ProbeGrid {
        &self.grid
    }

    pub fn data(&self) -> &ProbeData {
        &self.data
    }

    /// Index of the probe the next call to [`ProbeBaker::advance`] bakes.
    pub fn next_probe(&self) -> u32 {
        self.next
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn is_complete(&self) -> bool {
        self.next >= self.grid.count()
    }

    /// Bakes one probe. Returns the fraction of probes completed, 1.0 on the
    /// call that finishes the grid.
    pub fn advance(&mut self, tracer: &PathTracer) -> f32 {
        let total = self.grid.count();
        if self.next >= total {
            return self.progress;
        }

        let index = self.next;
        let position = self.grid.position(index);
        let capture = capture_probe(tracer, &self.settings.path, position, self.settings.capture_resolution, index);

        match (&mut self.data, &self.projector) {
            (ProbeData::CubeMaps { irradiance, distance }, _) => {
                irradiance[index as usize] = integrate_irradiance(
                    &capture,
                    self.settings.irradiance_resolution,
                    self.settings.sqrt_integration_samples,
                );
                distance[index as usize] = integrate_distance(
                    &capture,
                    self.settings.distance_resolution,
                    self.settings.sqrt_distance_samples,
                    self.settings.distance_sharpness,
                );
            }
            (ProbeData::Volume { textures, .. }, Some(projector)) => {
                let coeffs = project_capture(&capture, projector.as_ref());
                for (texture, c) in textures.iter_mut().zip(coeffs) {
                    texture[index as usize] = c;
                }
            }
            (ProbeData::Volume { .. }, None) => {}
        }

        self.next += 1;
        self.progress = self.next as f32 / total as f32;
        let finished = self.progress;
        log::debug!("probe {} of {} baked at {:?}", self.next, total, position);

        if self.next == total {
            log::info!("probe bake complete ({} probes)", total);
            if self.settings.always_regenerate {
                self.next = 0;
                self.progress = 0.0;
            }
        }
        finished
    }
}
