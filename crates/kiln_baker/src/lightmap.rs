//! Progressive lightmap baking.
//!
//! Every lightmap texel covered by a UV triangle becomes a bake point. Work is
//! a flat list of `points x samples` items ordered sample-major, so all texels
//! receive sample `k` before any receives `k + 1`. Each call to
//! [`LightmapBaker::advance`] processes the next slice of items; texels are
//! independent so the slice runs in parallel over texels.

use crate::basis::{projector, BasisProjector};
use crate::geometry::RAY_BIAS;
use crate::integrator::{PathSettings, PathTracer};
use crate::sampling;
use kiln_core::settings::{names, BakeMode, Registry, SampleMode, SettingsResult, SolveMode};
use kiln_core::{ExportResult, FloatImage, Scene};
use kiln_math::sampling::Frame;
use kiln_math::{Color, Vec2, Vec3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

/// A texel center on a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BakePoint {
    pub position: Vec3,
    pub normal: Vec3,
    pub frame: Frame,
    /// Texel index, `y * resolution + x`.
    pub texel: u32,
}

/// Cell of the lightmap atlas given to object `index` of `count`.
fn atlas_cell(index: usize, count: usize) -> (Vec2, f32) {
    let cells = (count.max(1) as f32).sqrt().ceil() as usize;
    let size = 1.0 / cells as f32;
    let origin = Vec2::new((index % cells) as f32, (index / cells) as f32) * size;
    (origin, size)
}

/// Barycentric coordinates of `p` in the 2D triangle, `None` if outside.
fn barycentric(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> Option<Vec3> {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let den = v0.perp_dot(v1);
    if den.abs() < 1e-12 {
        return None;
    }
    let v = v2.perp_dot(v1) / den;
    let w = v0.perp_dot(v2) / den;
    let u = 1.0 - v - w;
    const EDGE: f32 = -1e-5;
    (u >= EDGE && v >= EDGE && w >= EDGE).then_some(Vec3::new(u, v, w))
}

/// Rasterizes the lightmap UVs of every object into a `resolution^2` atlas.
///
/// Each object gets its own square cell of the atlas. A texel covered by more
/// than one triangle keeps the first.
pub fn rasterize_bake_points(scene: &Scene, resolution: u32) -> Vec<BakePoint> {
    let res = resolution.max(1);
    let mut covered = vec![false; (res * res) as usize];
    let mut points = Vec::new();

    for (index, object) in scene.objects.iter().enumerate() {
        let (origin, size) = atlas_cell(index, scene.objects.len());
        for tri in object.mesh.triangles() {
            let px = tri.uvs.map(|uv| (origin + uv * size) * res as f32);
            let lo = px[0].min(px[1]).min(px[2]).floor().max(Vec2::ZERO);
            let hi = px[0].max(px[1]).max(px[2]).ceil().min(Vec2::splat(res as f32));
            for y in lo.y as u32..hi.y as u32 {
                for x in lo.x as u32..hi.x as u32 {
                    let texel = y * res + x;
                    if covered[texel as usize] {
                        continue;
                    }
                    let center = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                    let Some(b) = barycentric(center, px[0], px[1], px[2]) else {
                        continue;
                    };
                    let position = tri.positions[0] * b.x + tri.positions[1] * b.y + tri.positions[2] * b.z;
                    let normal = (tri.normals[0] * b.x + tri.normals[1] * b.y + tri.normals[2] * b.z).normalize_or_zero();
                    if normal == Vec3::ZERO {
                        continue;
                    }
                    covered[texel as usize] = true;
                    points.push(BakePoint {
                        position,
                        normal,
                        frame: Frame::from_normal(normal),
                        texel,
                    });
                }
            }
        }
    }
    points
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightmapSettings {
    pub resolution: u32,
    /// Square root of the per-texel sample count.
    pub sqrt_samples: u32,
    pub sample_mode: SampleMode,
    pub bake_mode: BakeMode,
    pub solve_mode: SolveMode,
    pub path: PathSettings,
    pub seed: u64,
}

impl LightmapSettings {
    pub fn from_registry(registry: &Registry) -> SettingsResult<Self> {
        Ok(Self {
            resolution: registry.int(names::LIGHT_MAP_RESOLUTION)?.max(1) as u32,
            sqrt_samples: registry.int(names::NUM_BAKE_SAMPLES)?.max(1) as u32,
            sample_mode: registry.choice(names::BAKE_SAMPLE_MODE)?,
            bake_mode: registry.choice(names::BAKE_MODE)?,
            solve_mode: registry.choice(names::SOLVE_MODE)?,
            path: PathSettings::lightmap(registry)?,
            seed: 0,
        })
    }

    pub fn samples_per_texel(&self) -> u64 {
        self.sqrt_samples as u64 * self.sqrt_samples as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BakeState {
    Idle,
    Baking,
}

/// Resolved lightmap: `basis_count` planes of `resolution^2` texels.
#[derive(Debug, Clone)]
pub struct Lightmap {
    pub resolution: u32,
    pub bake_mode: BakeMode,
    pub basis_count: usize,
    pub planes: Vec<Vec<Color>>,
}

impl Lightmap {
    pub fn texel(&self, plane: usize, x: u32, y: u32) -> Option<Color> {
        if x >= self.resolution || y >= self.resolution {
            return None;
        }
        self.planes.get(plane)?.get((y * self.resolution + x) as usize).copied()
    }

    /// One coefficient plane as an image.
    pub fn to_image(&self, plane: usize) -> ExportResult<FloatImage> {
        let empty = Vec::new();
        let texels = self.planes.get(plane).unwrap_or(&empty);
        FloatImage::from_rgb(self.resolution, self.resolution, texels)
    }

    /// Decoded diffuse response for an unperturbed surface normal.
    pub fn evaluate_image(&self, projector: &dyn BasisProjector) -> ExportResult<FloatImage> {
        let count = (self.resolution * self.resolution) as usize;
        let mut coeffs = vec![Color::ZERO; self.basis_count];
        let texels: Vec<Color> = (0..count)
            .map(|t| {
                for (c, plane) in coeffs.iter_mut().zip(&self.planes) {
                    *c = plane[t];
                }
                projector.evaluate(&coeffs, Vec3::Z)
            })
            .collect();
        FloatImage::from_rgb(self.resolution, self.resolution, &texels)
    }
}

/// Seed for one (point, sample) pair so results do not depend on how work is sliced.
fn sample_seed(seed: u64, point: u32, sample: u32) -> u64 {
    let mut h = seed ^ ((point as u64) << 32 | sample as u64);
    h = (h ^ (h >> 33)).wrapping_mul(0xff51_afd7_ed55_8ccd);
    h = (h ^ (h >> 33)).wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    h ^ (h >> 33)
}

pub struct LightmapBaker {
    settings: LightmapSettings,
    projector: Box<dyn BasisProjector>,
    points: Vec<BakePoint>,
    sums: Vec<Color>,
    gram: Vec<f32>,
    gram_stride: usize,
    counts: Vec<u32>,
    cursor: u64,
    degenerate: u64,
}

impl LightmapBaker {
    pub fn new(scene: &Scene, settings: LightmapSettings) -> Self {
        let points = rasterize_bake_points(scene, settings.resolution);
        log::info!(
            "lightmap: {} bake points at {}x{} ({})",
            points.len(),
            settings.resolution,
            settings.resolution,
            settings.bake_mode.label()
        );
        let mut baker = Self {
            projector: projector(settings.bake_mode, settings.solve_mode),
            settings,
            points,
            sums: Vec::new(),
            gram: Vec::new(),
            gram_stride: 1,
            counts: Vec::new(),
            cursor: 0,
            degenerate: 0,
        };
        baker.clear();
        baker
    }

    fn clear(&mut self) {
        let n = self.points.len();
        let basis = self.projector.basis_count();
        self.gram_stride = self.projector.gram_len().max(1);
        self.sums = vec![Color::ZERO; n * basis];
        self.gram = vec![0.0; n * self.gram_stride];
        self.counts = vec![0; n];
        self.cursor = 0;
        self.degenerate = 0;
    }

    /// Drops all accumulated samples. Bake points are rebuilt when the
    /// resolution changed.
    pub fn reset(&mut self, scene: &Scene, settings: LightmapSettings) {
        if settings.resolution != self.settings.resolution {
            self.points = rasterize_bake_points(scene, settings.resolution);
        }
        self.projector = projector(settings.bake_mode, settings.solve_mode);
        self.settings = settings;
        self.clear();
        log::info!("lightmap bake restarted ({} points)", self.points.len());
    }

    pub fn settings(&self) -> &LightmapSettings {
        &self.settings
    }

    pub fn projector(&self) -> &dyn BasisProjector {
        self.projector.as_ref()
    }

    pub fn points(&self) -> &[BakePoint] {
        &self.points
    }

    pub fn total_work(&self) -> u64 {
        self.points.len() as u64 * self.settings.samples_per_texel()
    }

    pub fn progress(&self) -> f32 {
        let total = self.total_work();
        if total == 0 {
            1.0
        } else {
            (self.cursor as f64 / total as f64) as f32
        }
    }

    pub fn state(&self) -> BakeState {
        if self.cursor >= self.total_work() {
            BakeState::Idle
        } else {
            BakeState::Baking
        }
    }

    /// Samples rejected as NaN, infinite or negative since the last reset.
    pub fn degenerate_samples(&self) -> u64 {
        self.degenerate
    }

    /// Processes up to `budget` work items and returns the new progress.
    pub fn advance(&mut self, tracer: &PathTracer, budget: u64) -> f32 {
        let total = self.total_work();
        let start = self.cursor;
        let end = start.saturating_add(budget).min(total);
        if start >= end {
            return self.progress();
        }

        let num_points = self.points.len() as u64;
        let basis = self.projector.basis_count();
        let projector = self.projector.as_ref();
        let settings = &self.settings;
        let points = &self.points;

        let degenerate: u64 = self
            .sums
            .par_chunks_mut(basis)
            .zip(self.gram.par_chunks_mut(self.gram_stride))
            .zip(self.counts.par_iter_mut())
            .enumerate()
            .map(|(p, ((sums, gram), count))| {
                let p64 = p as u64;
                // samples s with start <= s * P + p < end
                let s_min = if start > p64 { (start - p64).div_ceil(num_points) } else { 0 };
                if end <= p64 {
                    return 0;
                }
                let s_max = (end - 1 - p64) / num_points;
                let point = &points[p];
                let origin = point.position + point.normal * RAY_BIAS;
                let mut bad = 0;
                for s in s_min..=s_max {
                    let mut rng = StdRng::seed_from_u64(sample_seed(settings.seed, p as u32, s as u32));
                    let u = sampling::generate(s as u32, settings.sqrt_samples, p as u32, settings.sample_mode, &mut rng);
                    let (local, pdf) = projector.sample_direction(u);
                    if pdf <= 0.0 {
                        *count += 1;
                        continue;
                    }
                    let dir = point.frame.to_world(local);
                    let result = tracer.trace_radiance(origin, dir, &settings.path, &mut rng);
                    if result.degenerate {
                        bad += 1;
                    }
                    projector.project(local, result.radiance, 1.0 / pdf, sums);
                    projector.accumulate_gram(local, gram);
                    *count += 1;
                }
                bad
            })
            .sum();

        self.cursor = end;
        self.degenerate += degenerate;
        if degenerate > 0 {
            log::warn!("lightmap: {} degenerate samples zeroed this slice", degenerate);
        }
        log::debug!("lightmap: items {}..{} of {}", start, end, total);
        if end == total {
            log::info!("lightmap bake complete");
        }
        self.progress()
    }

    /// Current lightmap: per texel accumulator over its sample count.
    pub fn resolve(&self) -> Lightmap {
        let res = self.settings.resolution;
        let basis = self.projector.basis_count();
        let mut planes = vec![vec![Color::ZERO; (res * res) as usize]; basis];
        let mut out = vec![Color::ZERO; basis];
        for (p, point) in self.points.iter().enumerate() {
            let sums = &self.sums[p * basis..(p + 1) * basis];
            let gram = &self.gram[p * self.gram_stride..(p + 1) * self.gram_stride];
            self.projector.resolve(sums, gram, self.counts[p], &mut out);
            for (plane, value) in planes.iter_mut().zip(&out) {
                plane[point.texel as usize] = *value;
            }
        }
        Lightmap {
            resolution: res,
            bake_mode: self.settings.bake_mode,
            basis_count: basis,
            planes,
        }
    }
}
