//! Triangle primitive for ray tracing.
//!
//! Uses the watertight ray-triangle test of Woop, Benthin and Wald: vertices
//! are sheared into ray space and classified by 2D edge functions, so a ray
//! through a shared edge or vertex always hits at least one of the triangles
//! meeting there.

use crate::hittable::{HitRecord, Hittable};
use kiln_core::MeshTriangle;
use kiln_math::{Aabb, Interval, Ray, Vec3};

/// A triangle with per-vertex shading normals and a surface index.
#[derive(Clone, Debug)]
pub struct Triangle {
    /// Kept exactly as given so neighbours sharing an edge see identical vertices.
    positions: [Vec3; 3],
    /// Unit face normal, counter-clockwise winding
    normal: Vec3,
    normals: [Vec3; 3],
    material: u32,
    bbox: Aabb,
}

impl Triangle {
    /// Create a flat shaded triangle from three vertices.
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3, material: u32) -> Self {
        let n = (v1 - v0).cross(v2 - v0).normalize_or_zero();
        Self::with_normals(v0, v1, v2, [n; 3], material)
    }

    /// Create a triangle with per-vertex normals (for smooth shading).
    pub fn with_normals(v0: Vec3, v1: Vec3, v2: Vec3, normals: [Vec3; 3], material: u32) -> Self {
        // Aabb::from_corners pads thin dimensions
        let bbox = Aabb::from_corners(v0.min(v1).min(v2), v0.max(v1).max(v2));
        Self {
            positions: [v0, v1, v2],
            normal: (v1 - v0).cross(v2 - v0).normalize_or_zero(),
            normals: normals.map(|n| n.normalize_or_zero()),
            material,
            bbox,
        }
    }

    pub fn from_mesh(tri: &MeshTriangle, material: u32) -> Self {
        let [a, b, c] = tri.positions;
        Self::with_normals(a, b, c, tri.normals, material)
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    /// Returns true for zero-area triangles, which can never be hit.
    pub fn is_degenerate(&self) -> bool {
        self.normal == Vec3::ZERO
    }

    pub fn centroid(&self) -> Vec3 {
        (self.positions[0] + self.positions[1] + self.positions[2]) / 3.0
    }
}

/// Edge function `a.x * b.y - a.y * b.x`, redone in f64 when it rounds to 0.
fn edge_function(a: Vec3, b: Vec3) -> f32 {
    let e = a.x * b.y - a.y * b.x;
    if e != 0.0 {
        return e;
    }
    (a.x as f64 * b.y as f64 - a.y as f64 * b.x as f64) as f32
}

impl Hittable for Triangle {
    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool {
        // permute so the dominant direction axis becomes z
        let d = ray.direction.abs();
        let kz = if d.x > d.y && d.x > d.z {
            0
        } else if d.y > d.z {
            1
        } else {
            2
        };
        let (kx, ky) = ((kz + 1) % 3, (kz + 2) % 3);
        let permute = |v: Vec3| Vec3::new(v[kx], v[ky], v[kz]);

        let dir = permute(ray.direction);
        if dir.z == 0.0 {
            return false;
        }
        let shear = Vec3::new(-dir.x / dir.z, -dir.y / dir.z, 1.0 / dir.z);
        let [p0, p1, p2] = self.positions.map(|p| {
            let p = permute(p - ray.origin);
            Vec3::new(p.x + shear.x * p.z, p.y + shear.y * p.z, p.z)
        });

        let e0 = edge_function(p1, p2);
        let e1 = edge_function(p2, p0);
        let e2 = edge_function(p0, p1);

        // zero counts as inside, so edges and vertices are shared hits
        if (e0 < 0.0 || e1 < 0.0 || e2 < 0.0) && (e0 > 0.0 || e1 > 0.0 || e2 > 0.0) {
            return false;
        }
        let det = e0 + e1 + e2;
        if det == 0.0 {
            return false;
        }

        let t = (e0 * p0.z + e1 * p1.z + e2 * p2.z) * shear.z / det;
        if !ray_t.surrounds(t) {
            return false;
        }

        let (b0, b1, b2) = (e0 / det, e1 / det, e2 / det);
        let [v0, v1, v2] = self.positions;
        let shading = (self.normals[0] * b0 + self.normals[1] * b1 + self.normals[2] * b2).normalize_or_zero();

        rec.t = t;
        // on the triangle's plane rather than wherever ray.at(t) rounds to
        rec.p = v0 * b0 + v1 * b1 + v2 * b2;
        rec.set_face_normal(ray, self.normal, if shading == Vec3::ZERO { self.normal } else { shading });
        rec.material = self.material;
        true
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}
