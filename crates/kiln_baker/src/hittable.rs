//! Hittable trait and HitRecord for ray-primitive intersection.

use kiln_math::{Aabb, Interval, Ray, Vec3};

/// Record of a ray-primitive intersection.
#[derive(Clone, Copy, Debug, Default)]
pub struct HitRecord {
    /// Point of intersection
    pub p: Vec3,
    /// Shading normal, flipped to face the incoming ray
    pub normal: Vec3,
    /// Geometric normal, flipped to face the incoming ray
    pub geometric_normal: Vec3,
    /// Parameter t where the intersection occurs
    pub t: f32,
    /// Whether the ray hit the front face (outside) of the surface
    pub front_face: bool,
    /// Index into the scene's surface table
    pub material: u32,
}

impl HitRecord {
    /// Set the face normals based on ray direction and the outward normals.
    ///
    /// Both normals are stored pointing against the ray.
    pub fn set_face_normal(&mut self, ray: &Ray, outward_geometric: Vec3, outward_shading: Vec3) {
        self.front_face = ray.direction.dot(outward_geometric) < 0.0;
        let sign = if self.front_face { 1.0 } else { -1.0 };
        self.geometric_normal = outward_geometric * sign;
        self.normal = outward_shading * sign;
        // interpolated normals can end up behind the surface near silhouettes
        if self.normal.dot(self.geometric_normal) <= 0.0 {
            self.normal = self.geometric_normal;
        }
    }
}

/// Trait for objects that can be hit by rays.
pub trait Hittable: Send + Sync {
    /// Test if a ray hits this object within the given interval.
    ///
    /// Returns true if hit, and fills in the hit record.
    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool;

    /// Get the axis-aligned bounding box of this object.
    fn bounding_box(&self) -> Aabb;

    /// Any-hit query for shadow rays.
    fn occluded(&self, ray: &Ray, ray_t: Interval) -> bool {
        let mut rec = HitRecord::default();
        self.hit(ray, ray_t, &mut rec)
    }
}
