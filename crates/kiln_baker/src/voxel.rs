//! Scene voxelization into a radiance + occupancy grid with a full mip chain.
//!
//! The scene is rasterized orthographically along each principal axis: one
//! ray per voxel column, every surface crossing deposits its directly lit
//! radiance into the voxel it falls in.

use crate::geometry::RAY_BIAS;
use crate::integrator::PathTracer;
use kiln_core::settings::{names, Registry, SettingsResult};
use kiln_math::{Aabb, Color, Ray, UVec3, Vec3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Voxel {
    pub radiance: Color,
    /// Coverage in `[0, 1]`.
    pub occupancy: f32,
}

pub fn mip_count(resolution: UVec3) -> u32 {
    32 - resolution.max_element().max(1).leading_zeros()
}

/// Size of mip `level`: `max(dim >> level, 1)` per axis.
pub fn mip_size(resolution: UVec3, level: u32) -> UVec3 {
    UVec3::new(
        (resolution.x >> level).max(1),
        (resolution.y >> level).max(1),
        (resolution.z >> level).max(1),
    )
}

fn linear_index(size: UVec3, c: UVec3) -> usize {
    c.x as usize + size.x as usize * (c.y as usize + size.y as usize * c.z as usize)
}

/// Voxels in a grid of `size`, `None` when the count does not fit in memory.
fn voxel_count(size: UVec3) -> Option<usize> {
    let count = (size.x as u64)
        .checked_mul(size.y as u64)?
        .checked_mul(size.z as u64)?;
    usize::try_from(count).ok()
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoxelGrid {
    pub resolution: UVec3,
    pub bounds: Aabb,
    /// `mips[0]` is full resolution.
    pub mips: Vec<Vec<Voxel>>,
}

impl VoxelGrid {
    pub fn voxel(&self, level: u32, coord: UVec3) -> Option<Voxel> {
        let size = mip_size(self.resolution, level);
        if coord.cmpge(size).any() {
            return None;
        }
        self.mips.get(level as usize)?.get(linear_index(size, coord)).copied()
    }

    /// Voxel containing a world position at mip 0.
    pub fn coord_of(&self, p: Vec3) -> UVec3 {
        let extent = self.bounds.extent().max(Vec3::splat(1e-6));
        let t = (p - self.bounds.min()) / extent;
        let max = (self.resolution - UVec3::ONE).as_vec3();
        (t * self.resolution.as_vec3()).floor().clamp(Vec3::ZERO, max).as_uvec3()
    }

    pub fn occupied_count(&self) -> usize {
        self.mips.first().map_or(0, |m| m.iter().filter(|v| v.occupancy > 0.0).count())
    }

    fn build_mips(&mut self) {
        for level in 1..mip_count(self.resolution) {
            let src_size = mip_size(self.resolution, level - 1);
            let dst_size = mip_size(self.resolution, level);
            let src = &self.mips[level as usize - 1];
            let mut dst = vec![Voxel::default(); linear_index(dst_size, dst_size - UVec3::ONE) + 1];
            for z in 0..dst_size.z {
                for y in 0..dst_size.y {
                    for x in 0..dst_size.x {
                        let mut radiance = Color::ZERO;
                        let mut occupancy = 0.0;
                        let mut children = 0;
                        for dz in 0..2 {
                            for dy in 0..2 {
                                for dx in 0..2 {
                                    let c = UVec3::new(x * 2 + dx, y * 2 + dy, z * 2 + dz);
                                    if c.cmpge(src_size).any() {
                                        continue;
                                    }
                                    let v = src[linear_index(src_size, c)];
                                    radiance += v.radiance * v.occupancy;
                                    occupancy += v.occupancy;
                                    children += 1;
                                }
                            }
                        }
                        let out = &mut dst[linear_index(dst_size, UVec3::new(x, y, z))];
                        if occupancy > 0.0 {
                            out.radiance = radiance / occupancy;
                            out.occupancy = occupancy / children as f32;
                        }
                    }
                }
            }
            self.mips.push(dst);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelSettings {
    pub resolution: UVec3,
    pub always_revoxelize: bool,
    pub bounds_scale: f32,
    pub bounds_offset: Vec3,
}

impl VoxelSettings {
    pub fn from_registry(registry: &Registry) -> SettingsResult<Self> {
        let dim = |name| registry.int(name).map(|v| v.max(1) as u32);
        Ok(Self {
            resolution: UVec3::new(dim(names::VOXEL_RES_X)?, dim(names::VOXEL_RES_Y)?, dim(names::VOXEL_RES_Z)?),
            always_revoxelize: registry.flag(names::ALWAYS_REVOXELIZE)?,
            bounds_scale: registry.float(names::SCENE_BOUNDS_SCALE)?,
            bounds_offset: Vec3::new(
                registry.float(names::SCENE_BOUNDS_OFFSET_X)?,
                registry.float(names::SCENE_BOUNDS_OFFSET_Y)?,
                registry.float(names::SCENE_BOUNDS_OFFSET_Z)?,
            ),
        })
    }

    /// Region the grid covers: the scene bounds scaled and offset, the same
    /// region the probe grid spans.
    pub fn bounds(&self, scene_bounds: Aabb) -> Aabb {
        scene_bounds.scaled(self.bounds_scale, self.bounds_offset)
    }
}

/// Runs the full rasterization over `bounds` and returns a grid with mips
/// built. Returns `None` when the grid is too large to allocate.
pub fn voxelize(tracer: &PathTracer, resolution: UVec3, bounds: Aabb) -> Option<VoxelGrid> {
    let resolution = resolution.max(UVec3::ONE);
    let count = voxel_count(resolution)?;

    let mut grid = VoxelGrid {
        resolution,
        bounds,
        mips: vec![vec![Voxel::default(); count]],
    };
    if tracer.geometry().bounds().is_empty() || bounds.is_empty() {
        grid.build_mips();
        return Some(grid);
    }

    let mut sums = vec![Color::ZERO; count];
    let mut deposits = vec![0u32; count];
    let extent = bounds.extent();

    for axis in 0..3 {
        let (ua, va) = ((axis + 1) % 3, (axis + 2) % 3);
        let (nu, nv) = (resolution[ua] as u64, resolution[va] as u64);
        let columns: Vec<Vec<(usize, Color)>> = (0..nu * nv)
            .into_par_iter()
            .map(|column| {
                let (cu, cv) = (column % nu, column / nu);
                // start just outside the bounds so faces lying on them are hit
                let mut origin = bounds.min();
                origin[axis] -= RAY_BIAS;
                origin[ua] += (cu as f32 + 0.5) / nu as f32 * extent[ua];
                origin[va] += (cv as f32 + 0.5) / nv as f32 * extent[va];
                let mut direction = Vec3::ZERO;
                direction[axis] = 1.0;

                let mut rng = StdRng::seed_from_u64(((axis as u64) << 32) ^ column);
                let mut out = Vec::new();
                let mut start = 0.0;
                let length = extent[axis] + 2.0 * RAY_BIAS;
                while start < length {
                    let ray = Ray::new(origin + direction * start, direction);
                    let Some(mut rec) = tracer.geometry().intersect(&ray, length - start) else {
                        break;
                    };
                    // shade the outside of the surface whichever side the column ray came from
                    if !rec.front_face {
                        rec.normal = -rec.normal;
                        rec.geometric_normal = -rec.geometric_normal;
                        rec.front_face = true;
                    }
                    let radiance = tracer.direct_radiance(&rec, &mut rng);
                    out.push((linear_index(resolution, grid.coord_of(rec.p)), radiance));
                    start += rec.t + RAY_BIAS;
                }
                out
            })
            .collect();
        for (index, radiance) in columns.into_iter().flatten() {
            sums[index] += radiance;
            deposits[index] += 1;
        }
    }

    // radiance adds up across the axis passes, only occupancy saturates
    for ((voxel, sum), n) in grid.mips[0].iter_mut().zip(&sums).zip(&deposits) {
        if *n > 0 {
            voxel.radiance = *sum;
            voxel.occupancy = (*n as f32).clamp(0.0, 1.0);
        }
    }
    grid.build_mips();
    Some(grid)
}

/// Owns the voxel grid and decides when to rebuild it.
#[derive(Debug, Default)]
pub struct Voxelizer {
    grid: Option<VoxelGrid>,
}

impl Voxelizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grid(&self) -> Option<&VoxelGrid> {
        self.grid.as_ref()
    }

    /// Rebuilds the grid when `invalidated`, when always revoxelizing, on the
    /// first run or when the resolution or bounds changed. Returns whether it
    /// rebuilt.
    pub fn revoxelize(&mut self, tracer: &PathTracer, settings: &VoxelSettings, invalidated: bool) -> bool {
        let bounds = settings.bounds(tracer.geometry().bounds());
        let stale = match &self.grid {
            None => true,
            Some(grid) => grid.resolution != settings.resolution.max(UVec3::ONE) || grid.bounds != bounds,
        };
        if !(invalidated || settings.always_revoxelize || stale) {
            return false;
        }
        let Some(grid) = voxelize(tracer, settings.resolution, bounds) else {
            log::error!(
                "voxel grid {}x{}x{} is too large, keeping the previous grid",
                settings.resolution.x,
                settings.resolution.y,
                settings.resolution.z
            );
            return false;
        };
        log::info!(
            "voxelized {}x{}x{}: {} occupied, {} mips",
            grid.resolution.x,
            grid.resolution.y,
            grid.resolution.z,
            grid.occupied_count(),
            grid.mips.len()
        );
        self.grid = Some(grid);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SceneGeometry;
    use crate::integrator::{LightingEnvironment, SunLight};
    use approx::assert_relative_eq;
    use kiln_core::{Material, Mesh, Scene};

    #[test]
    fn test_mip_sizes() {
        let r = UVec3::new(32, 16, 8);
        assert_eq!(mip_count(r), 6);
        let sizes: Vec<UVec3> = (0..mip_count(r)).map(|l| mip_size(r, l)).collect();
        assert_eq!(sizes[1], UVec3::new(16, 8, 4));
        assert_eq!(sizes[3], UVec3::new(4, 2, 1));
        assert_eq!(sizes[5], UVec3::ONE);
        assert_eq!(mip_count(UVec3::ONE), 1);
        assert_eq!(mip_count(UVec3::new(5, 3, 1)), 3);
    }

    fn slab_scene() -> Scene {
        let mut scene = Scene::new("slab");
        let m = scene.add_material(Material::new("slab", Vec3::ONE));
        let mut mesh = Mesh::default();
        mesh.push_box(Vec3::new(0.0, 0.0, 0.0), Vec3::new(4.0, 1.0, 4.0));
        scene.add_object("slab", mesh, m);
        scene
    }

    #[test]
    fn test_voxelize_box() {
        let scene = slab_scene();
        let geometry = SceneGeometry::from_scene(&scene);
        let lighting = LightingEnvironment {
            sun: Some(SunLight {
                direction: Vec3::Y,
                radiance: Color::splat(10.0),
                cos_radius: 0.9999,
            }),
            ..LightingEnvironment::default()
        };
        let tracer = PathTracer::new(&geometry, &lighting);
        let grid = voxelize(&tracer, UVec3::new(8, 4, 8), geometry.bounds()).unwrap();

        assert_eq!(grid.mips.len(), 4);
        assert_eq!(grid.mips[1].len(), 4 * 2 * 4);
        // the top face is lit, the bottom face is not
        let top = grid.voxel(0, UVec3::new(4, 3, 4)).unwrap();
        let bottom = grid.voxel(0, UVec3::new(4, 0, 4)).unwrap();
        assert_eq!(top.occupancy, 1.0);
        assert!(top.radiance.x > 0.0);
        assert_eq!(bottom.occupancy, 1.0);
        // the interior is hollow
        assert_eq!(grid.voxel(0, UVec3::new(4, 1, 4)).unwrap().occupancy, 0.0);
        for v in grid.mips.iter().flatten() {
            assert!((0.0..=1.0).contains(&v.occupancy));
        }
        let coarsest = grid.mips.last().unwrap()[0];
        assert!(coarsest.occupancy > 0.0 && coarsest.occupancy < 1.0);
        assert_relative_eq!(grid.voxel(3, UVec3::ZERO).unwrap().occupancy, coarsest.occupancy);
    }

    #[test]
    fn test_revoxelize_only_when_needed() {
        let scene = slab_scene();
        let geometry = SceneGeometry::from_scene(&scene);
        let lighting = LightingEnvironment::default();
        let tracer = PathTracer::new(&geometry, &lighting);
        let mut settings = test_settings(4);
        let mut voxelizer = Voxelizer::new();
        assert!(voxelizer.revoxelize(&tracer, &settings, false));
        assert!(!voxelizer.revoxelize(&tracer, &settings, false));
        assert!(voxelizer.revoxelize(&tracer, &settings, true));
        settings.resolution = UVec3::splat(8);
        assert!(voxelizer.revoxelize(&tracer, &settings, false));
        settings.always_revoxelize = true;
        assert!(voxelizer.revoxelize(&tracer, &settings, false));
        assert_eq!(voxelizer.grid().unwrap().resolution, UVec3::splat(8));
    }

    fn test_settings(res: u32) -> VoxelSettings {
        VoxelSettings {
            resolution: UVec3::splat(res),
            always_revoxelize: false,
            bounds_scale: 1.0,
            bounds_offset: Vec3::ZERO,
        }
    }

    #[test]
    fn test_bounds_change_revoxelizes() {
        let scene = slab_scene();
        let geometry = SceneGeometry::from_scene(&scene);
        let lighting = LightingEnvironment::default();
        let tracer = PathTracer::new(&geometry, &lighting);
        let mut settings = test_settings(4);
        let mut voxelizer = Voxelizer::new();
        assert!(voxelizer.revoxelize(&tracer, &settings, false));
        assert_eq!(voxelizer.grid().unwrap().bounds, settings.bounds(geometry.bounds()));

        settings.bounds_scale = 2.0;
        assert!(voxelizer.revoxelize(&tracer, &settings, false));
        let bounds = voxelizer.grid().unwrap().bounds;
        assert_eq!(bounds, geometry.bounds().scaled(2.0, Vec3::ZERO));
        assert_relative_eq!(bounds.extent().x, 2.0 * geometry.bounds().extent().x, epsilon = 1e-5);
        assert!(!voxelizer.revoxelize(&tracer, &settings, false));

        settings.bounds_offset = Vec3::new(0.0, 1.0, 0.0);
        assert!(voxelizer.revoxelize(&tracer, &settings, false));
    }

    #[test]
    fn test_radiance_sums_across_axis_passes() {
        // every face emits 1 and nothing is lit, so each deposit adds exactly 1
        let mut scene = Scene::new("glowing slab");
        let mut material = Material::new("glow", Vec3::ZERO);
        material.emissive = Vec3::ONE;
        let m = scene.add_material(material);
        let mut mesh = Mesh::default();
        mesh.push_box(Vec3::new(0.0, 0.0, 0.0), Vec3::new(4.0, 1.0, 4.0));
        scene.add_object("slab", mesh, m);
        let geometry = SceneGeometry::from_scene(&scene);
        let lighting = LightingEnvironment::default();
        let tracer = PathTracer::new(&geometry, &lighting);
        let grid = voxelize(&tracer, UVec3::new(8, 4, 8), geometry.bounds()).unwrap();

        // the +X side (X pass) and the top (Y pass) both land in this edge voxel
        let edge = grid.voxel(0, UVec3::new(7, 3, 4)).unwrap();
        assert_relative_eq!(edge.radiance.x, 2.0, epsilon = 1e-5);
        assert_eq!(edge.occupancy, 1.0);
        // a top face voxel away from the sides only sees the Y pass
        let top = grid.voxel(0, UVec3::new(2, 3, 3)).unwrap();
        assert_relative_eq!(top.radiance.x, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_oversized_grid_is_rejected() {
        let scene = slab_scene();
        let geometry = SceneGeometry::from_scene(&scene);
        let lighting = LightingEnvironment::default();
        let tracer = PathTracer::new(&geometry, &lighting);
        assert_eq!(voxel_count(UVec3::splat(2048)), Some(2048usize.pow(3)));
        assert!(voxel_count(UVec3::splat(u32::MAX)).is_none());
        assert!(voxelize(&tracer, UVec3::splat(u32::MAX), geometry.bounds()).is_none());
    }
}
