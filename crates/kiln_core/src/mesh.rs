//! Triangle mesh storage for bake scenes.
//!
//! Meshes carry a second UV set laid out for lightmaps. Procedural meshes are
//! assembled from quads, imported meshes get an automatic chart per triangle pair.

use kiln_math::{Aabb, Vec2, Vec3};

/// Fraction of a lightmap chart cell left empty on each side so bilinear
/// lookups never bleed into the neighbouring chart.
const CHART_MARGIN: f32 = 1.0 / 16.0;

/// A triangle mesh with per-vertex normals and lightmap UVs.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub positions: Vec<Vec3>,

    /// One normal per position. Empty until [`Mesh::ensure_normals`] runs.
    pub normals: Vec<Vec3>,

    /// Lightmap UVs in `[0, 1]^2`, one per position.
    pub lightmap_uvs: Option<Vec<Vec2>>,

    /// Every three indices form a counter-clockwise triangle.
    pub indices: Vec<u32>,

    pub bounds: Aabb,
}

/// Fully resolved corner data of one triangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshTriangle {
    pub positions: [Vec3; 3],
    pub normals: [Vec3; 3],
    pub uvs: [Vec2; 3],
}

impl MeshTriangle {
    /// Unnormalized geometric normal (length is twice the area).
    pub fn face_normal(&self) -> Vec3 {
        (self.positions[1] - self.positions[0]).cross(self.positions[2] - self.positions[0])
    }

    pub fn area(&self) -> f32 {
        self.face_normal().length() * 0.5
    }
}

impl Mesh {
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        let bounds = Aabb::from_points(positions.iter());
        Self {
            positions,
            normals: Vec::new(),
            lightmap_uvs: None,
            indices,
            bounds,
        }
    }

    /// Appends a planar quad `a b c d` (counter-clockwise seen from the front)
    /// with its own vertices, flat normal, and unit chart UVs.
    pub fn push_quad(&mut self, a: Vec3, b: Vec3, c: Vec3, d: Vec3) {
        let base = self.positions.len() as u32;
        let normal = (b - a).cross(d - a).normalize_or_zero();
        self.positions.extend_from_slice(&[a, b, c, d]);
        self.normals.extend_from_slice(&[normal; 4]);
        let uvs = self.lightmap_uvs.get_or_insert_with(Vec::new);
        uvs.extend_from_slice(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ]);
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        self.bounds = Aabb::surrounding(&self.bounds, &Aabb::from_points([a, b, c, d].iter()));
    }

    /// Appends a closed, outward facing box.
    pub fn push_box(&mut self, min: Vec3, max: Vec3) {
        let p = |x: f32, y: f32, z: f32| Vec3::new(x, y, z);
        let (x0, y0, z0) = (min.x, min.y, min.z);
        let (x1, y1, z1) = (max.x, max.y, max.z);
        self.push_quad(p(x0, y0, z1), p(x1, y0, z1), p(x1, y1, z1), p(x0, y1, z1)); // +Z
        self.push_quad(p(x1, y0, z0), p(x0, y0, z0), p(x0, y1, z0), p(x1, y1, z0)); // -Z
        self.push_quad(p(x1, y0, z1), p(x1, y0, z0), p(x1, y1, z0), p(x1, y1, z1)); // +X
        self.push_quad(p(x0, y0, z0), p(x0, y0, z1), p(x0, y1, z1), p(x0, y1, z0)); // -X
        self.push_quad(p(x0, y1, z1), p(x1, y1, z1), p(x1, y1, z0), p(x0, y1, z0)); // +Y
        self.push_quad(p(x0, y0, z0), p(x1, y0, z0), p(x1, y0, z1), p(x0, y0, z1)); // -Y
    }

    /// Smooth normals from area weighted face normals.
    pub fn compute_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if i0.max(i1).max(i2) >= normals.len() {
                continue;
            }
            let n = (self.positions[i1] - self.positions[i0])
                .cross(self.positions[i2] - self.positions[i0]);
            normals[i0] += n;
            normals[i1] += n;
            normals[i2] += n;
        }
        for n in &mut normals {
            *n = n.try_normalize().unwrap_or(Vec3::Y);
        }
        self.normals = normals;
    }

    /// Computes normals when missing or when their count doesn't match positions.
    pub fn ensure_normals(&mut self) {
        if self.normals.len() != self.positions.len() {
            if !self.normals.is_empty() {
                log::debug!(
                    "normal count {} != vertex count {}, recomputing",
                    self.normals.len(),
                    self.positions.len()
                );
            }
            self.compute_normals();
        }
    }

    /// Splits shared vertices so every triangle owns its three corners.
    pub fn unweld(&mut self) {
        let mut positions = Vec::with_capacity(self.indices.len());
        let mut normals = Vec::with_capacity(self.indices.len());
        let has_normals = self.normals.len() == self.positions.len();
        for &i in &self.indices {
            positions.push(self.positions[i as usize]);
            if has_normals {
                normals.push(self.normals[i as usize]);
            }
        }
        self.indices = (0..positions.len() as u32).collect();
        self.positions = positions;
        self.normals = normals;
        self.lightmap_uvs = None;
    }

    /// Lays out lightmap charts on a square grid, one cell per triangle pair.
    ///
    /// Meshes built from [`Mesh::push_quad`] keep their per-quad unit UVs and
    /// only get remapped into cells. Anything else is unwelded first and each
    /// pair of triangles is mapped onto the two halves of a cell.
    pub fn pack_lightmap_uvs(&mut self) {
        if self.lightmap_uvs.is_none() {
            self.unweld();
            let mut uvs = Vec::with_capacity(self.positions.len());
            for t in 0..self.triangle_count() {
                if t % 2 == 0 {
                    uvs.extend_from_slice(&[Vec2::ZERO, Vec2::X, Vec2::ONE]);
                } else {
                    uvs.extend_from_slice(&[Vec2::ZERO, Vec2::ONE, Vec2::Y]);
                }
            }
            self.lightmap_uvs = Some(uvs);
        }

        let charts = self.triangle_count().div_ceil(2).max(1);
        let cells = (charts as f32).sqrt().ceil() as u32;
        let cell = 1.0 / cells as f32;
        let inner = cell * (1.0 - 2.0 * CHART_MARGIN);
        let indices = &self.indices;
        if let Some(uvs) = self.lightmap_uvs.as_mut() {
            let mut remapped = vec![false; uvs.len()];
            for (t, tri) in indices.chunks_exact(3).enumerate() {
                let chart = (t / 2) as u32;
                let origin = Vec2::new((chart % cells) as f32, (chart / cells) as f32) * cell
                    + Vec2::splat(cell * CHART_MARGIN);
                for &i in tri {
                    let i = i as usize;
                    if !remapped[i] {
                        uvs[i] = origin + uvs[i] * inner;
                        remapped[i] = true;
                    }
                }
            }
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Corner data for triangle `index`, or `None` when out of range or
    /// referencing missing vertices.
    pub fn triangle(&self, index: usize) -> Option<MeshTriangle> {
        let tri = self.indices.get(index * 3..index * 3 + 3)?;
        let mut out = MeshTriangle {
            positions: [Vec3::ZERO; 3],
            normals: [Vec3::ZERO; 3],
            uvs: [Vec2::ZERO; 3],
        };
        for (corner, &i) in tri.iter().enumerate() {
            let i = i as usize;
            out.positions[corner] = *self.positions.get(i)?;
            out.normals[corner] = self.normals.get(i).copied().unwrap_or(Vec3::ZERO);
            out.uvs[corner] = self
                .lightmap_uvs
                .as_ref()
                .and_then(|uvs| uvs.get(i).copied())
                .unwrap_or(Vec2::ZERO);
        }
        if out.normals.iter().all(|n| *n == Vec3::ZERO) {
            let n = out.face_normal().normalize_or_zero();
            out.normals = [n; 3];
        }
        Some(out)
    }

    pub fn triangles(&self) -> impl Iterator<Item = MeshTriangle> + '_ {
        (0..self.triangle_count()).filter_map(move |i| {
            let tri = self.triangle(i);
            if tri.is_none() {
                log::warn!("skipping triangle {} with out of range indices", i);
            }
            tri
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_creation() {
        let mesh = Mesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2]);
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert!(mesh.normals.is_empty());
    }

    #[test]
    fn test_compute_normals_ccw() {
        let mut mesh = Mesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2]);
        mesh.ensure_normals();
        for n in &mesh.normals {
            assert!((n.z - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_push_box_faces_outward() {
        let mut mesh = Mesh::default();
        mesh.push_box(Vec3::splat(-1.0), Vec3::splat(1.0));
        assert_eq!(mesh.triangle_count(), 12);
        for tri in mesh.triangles() {
            let centroid = (tri.positions[0] + tri.positions[1] + tri.positions[2]) / 3.0;
            assert!(tri.face_normal().dot(centroid) > 0.0);
            assert!(tri.normals[0].dot(centroid) > 0.0);
        }
        assert_eq!(mesh.bounds.min(), Vec3::splat(-1.0));
    }

    #[test]
    fn test_pack_quads_into_disjoint_cells() {
        let mut mesh = Mesh::default();
        mesh.push_box(Vec3::ZERO, Vec3::ONE);
        mesh.pack_lightmap_uvs();
        let uvs = mesh.lightmap_uvs.as_ref().unwrap();
        assert!(uvs.iter().all(|uv| uv.x > 0.0 && uv.x < 1.0 && uv.y > 0.0 && uv.y < 1.0));
        // 6 quads on a 3x3 grid: first and second charts don't overlap
        let first = mesh.triangle(0).unwrap();
        let second = mesh.triangle(2).unwrap();
        let max_first = first.uvs.iter().fold(0.0f32, |m, uv| m.max(uv.x));
        let min_second = second.uvs.iter().fold(1.0f32, |m, uv| m.min(uv.x));
        assert!(max_first < min_second);
    }

    #[test]
    fn test_pack_unwelds_imported_mesh() {
        let mut mesh = Mesh::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::ONE],
            vec![0, 1, 2, 1, 3, 2],
        );
        mesh.pack_lightmap_uvs();
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.lightmap_uvs.as_ref().map(Vec::len), Some(6));
    }

    #[test]
    fn test_triangle_out_of_range() {
        let mesh = Mesh::new(vec![Vec3::ZERO, Vec3::X], vec![0, 1, 5]);
        assert!(mesh.triangle(0).is_none());
        assert_eq!(mesh.triangles().count(), 0);
    }
}
