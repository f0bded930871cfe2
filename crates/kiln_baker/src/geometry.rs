//! Ray-castable scene shared by the lightmap baker, probe capture,
//! voxelizer and preview renderer.

use crate::bvh::BvhNode;
use crate::hittable::{HitRecord, Hittable};
use crate::material::Lambertian;
use crate::triangle::Triangle;
use kiln_core::Scene;
use kiln_math::{Aabb, Interval, Ray};

/// Offset applied to secondary ray origins along the surface normal.
pub const RAY_BIAS: f32 = 1e-3;

pub struct SceneGeometry {
    bvh: BvhNode<Triangle>,
    surfaces: Vec<Lambertian>,
    bounds: Aabb,
}

impl SceneGeometry {
    /// Flattens every object of the scene into one BVH.
    pub fn from_scene(scene: &Scene) -> Self {
        let mut surfaces: Vec<Lambertian> = scene.materials.iter().map(Lambertian::from_material).collect();
        // objects pointing past the material table shade with the default
        let fallback = surfaces.len() as u32;
        surfaces.push(Lambertian::default());

        let mut triangles = Vec::with_capacity(scene.triangle_count());
        for object in &scene.objects {
            let material = if object.material < scene.materials.len() {
                object.material as u32
            } else {
                fallback
            };
            triangles.extend(
                object
                    .mesh
                    .triangles()
                    .map(|t| Triangle::from_mesh(&t, material))
                    .filter(|t| !t.is_degenerate()),
            );
        }

        log::debug!("scene '{}': {} triangles in BVH", scene.name, triangles.len());
        let bvh = BvhNode::new(triangles);
        Self {
            bounds: scene.world_bounds(),
            bvh,
            surfaces,
        }
    }

    /// Closest hit in `(min_t, max_t)`.
    pub fn intersect(&self, ray: &Ray, max_t: f32) -> Option<HitRecord> {
        let mut rec = HitRecord::default();
        self.bvh
            .hit(ray, Interval::new(0.0, max_t), &mut rec)
            .then_some(rec)
    }

    /// Whether anything blocks the ray before `max_t`.
    pub fn occluded(&self, ray: &Ray, max_t: f32) -> bool {
        self.bvh.occluded(ray, Interval::new(0.0, max_t))
    }

    pub fn surface(&self, hit: &HitRecord) -> &Lambertian {
        let last = self.surfaces.len() - 1;
        &self.surfaces[(hit.material as usize).min(last)]
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn triangle_count(&self) -> usize {
        self.bvh.primitive_count()
    }
}
