//! Bake scenes: meshes with diffuse materials plus a default preview camera.
//!
//! Two procedural scenes are built in code. Arbitrary geometry can be loaded
//! from Wavefront OBJ files.

use std::path::Path;

use kiln_math::{Aabb, Vec2, Vec3};
use thiserror::Error;

use crate::mesh::Mesh;
use crate::settings::SceneKind;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("OBJ load error: {0}")]
    Obj(#[from] tobj::LoadError),

    #[error("scene '{0}' contains no triangles")]
    Empty(String),
}

pub type SceneResult<T> = Result<T, SceneError>;

/// A diffuse material.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    /// Diffuse reflectance in `[0, 1]`.
    pub albedo: Vec3,
    /// Emitted radiance.
    pub emissive: Vec3,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            albedo: Vec3::splat(0.5),
            emissive: Vec3::ZERO,
        }
    }
}

impl Material {
    pub fn new(name: impl Into<String>, albedo: Vec3) -> Self {
        Self {
            name: name.into(),
            albedo,
            ..Default::default()
        }
    }

    pub fn is_emissive(&self) -> bool {
        self.emissive.length_squared() > 0.0
    }
}

/// A mesh bound to one material.
#[derive(Clone, Debug)]
pub struct SceneObject {
    pub name: String,
    pub mesh: Mesh,
    pub material: usize,
}

/// Where the ground truth preview looks from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub target: Vec3,
    pub vfov_degrees: f32,
}

#[derive(Clone, Debug)]
pub struct Scene {
    pub name: String,
    pub objects: Vec<SceneObject>,
    pub materials: Vec<Material>,
    pub camera: CameraPose,
    /// Multiplier applied to every albedo when this scene is selected.
    pub default_albedo_scale: f32,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: Vec::new(),
            materials: Vec::new(),
            camera: CameraPose {
                position: Vec3::new(0.0, 2.0, 10.0),
                target: Vec3::ZERO,
                vfov_degrees: 60.0,
            },
            default_albedo_scale: 1.0,
        }
    }

    pub fn add_material(&mut self, material: Material) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    /// Adds an object. The mesh gets normals and packed lightmap UVs.
    pub fn add_object(&mut self, name: impl Into<String>, mut mesh: Mesh, material: usize) {
        mesh.ensure_normals();
        mesh.pack_lightmap_uvs();
        self.objects.push(SceneObject {
            name: name.into(),
            mesh,
            material,
        });
    }

    pub fn material(&self, index: usize) -> Option<&Material> {
        self.materials.get(index)
    }

    pub fn triangle_count(&self) -> usize {
        self.objects.iter().map(|o| o.mesh.triangle_count()).sum()
    }

    pub fn world_bounds(&self) -> Aabb {
        self.objects
            .iter()
            .fold(Aabb::EMPTY, |acc, o| Aabb::surrounding(&acc, &o.mesh.bounds))
    }

    /// One of the built-in procedural scenes.
    pub fn builtin(kind: SceneKind) -> Self {
        match kind {
            SceneKind::Box => Self::box_scene(),
            SceneKind::WhiteRoom => Self::white_room(),
        }
    }

    /// Two boxes and a back wall on a ground plane, open to the sky.
    pub fn box_scene() -> Self {
        let mut scene = Scene::new("Box");
        let ground = scene.add_material(Material::new("ground", Vec3::splat(0.7)));
        let boxes = scene.add_material(Material::new("boxes", Vec3::new(0.8, 0.8, 0.75)));
        let wall = scene.add_material(Material::new("wall", Vec3::new(0.75, 0.3, 0.2)));

        let mut mesh = Mesh::default();
        axis_quad(&mut mesh, 1, 0.0, Vec2::splat(-12.0), Vec2::splat(12.0), 1.0);
        scene.add_object("ground", mesh, ground);

        let mut mesh = Mesh::default();
        mesh.push_box(Vec3::new(-3.0, 0.0, -2.0), Vec3::new(-1.0, 4.0, 0.0));
        mesh.push_box(Vec3::new(1.0, 0.0, 0.0), Vec3::new(3.5, 1.5, 2.5));
        scene.add_object("boxes", mesh, boxes);

        let mut mesh = Mesh::default();
        mesh.push_box(Vec3::new(-6.0, 0.0, -6.0), Vec3::new(6.0, 5.0, -5.5));
        scene.add_object("back_wall", mesh, wall);

        scene.camera = CameraPose {
            position: Vec3::new(0.0, 4.0, 14.0),
            target: Vec3::new(0.0, 1.5, 0.0),
            vfov_degrees: 50.0,
        };
        scene.default_albedo_scale = 0.5;
        scene
    }

    /// A closed room lit through a single window in the -X wall.
    pub fn white_room() -> Self {
        let mut scene = Scene::new("White Room");
        let white = scene.add_material(Material::new("white", Vec3::splat(0.85)));

        let (lo, hi) = (Vec3::new(-5.0, 0.0, -5.0), Vec3::new(5.0, 5.0, 5.0));
        let mut room = Mesh::default();
        // floor and ceiling (Y), walls face inwards
        axis_quad(&mut room, 1, lo.y, Vec2::new(lo.z, lo.x), Vec2::new(hi.z, hi.x), 1.0);
        axis_quad(&mut room, 1, hi.y, Vec2::new(lo.z, lo.x), Vec2::new(hi.z, hi.x), -1.0);
        axis_quad(&mut room, 0, hi.x, Vec2::new(lo.y, lo.z), Vec2::new(hi.y, hi.z), -1.0);
        axis_quad(&mut room, 2, lo.z, Vec2::new(lo.x, lo.y), Vec2::new(hi.x, hi.y), 1.0);
        axis_quad(&mut room, 2, hi.z, Vec2::new(lo.x, lo.y), Vec2::new(hi.x, hi.y), -1.0);

        // -X wall around a window spanning y in [1.5, 3.5], z in [-2, 2]
        let (wy0, wy1, wz0, wz1) = (1.5, 3.5, -2.0, 2.0);
        axis_quad(&mut room, 0, lo.x, Vec2::new(lo.y, lo.z), Vec2::new(wy0, hi.z), 1.0);
        axis_quad(&mut room, 0, lo.x, Vec2::new(wy1, lo.z), Vec2::new(hi.y, hi.z), 1.0);
        axis_quad(&mut room, 0, lo.x, Vec2::new(wy0, lo.z), Vec2::new(wy1, wz0), 1.0);
        axis_quad(&mut room, 0, lo.x, Vec2::new(wy0, wz1), Vec2::new(wy1, hi.z), 1.0);
        scene.add_object("room", room, white);

        let mut furniture = Mesh::default();
        furniture.push_box(Vec3::new(0.5, 0.0, -1.5), Vec3::new(2.5, 1.0, 1.5));
        scene.add_object("table", furniture, white);

        scene.camera = CameraPose {
            position: Vec3::new(4.5, 2.5, 4.5),
            target: Vec3::new(-2.0, 1.5, -1.0),
            vfov_degrees: 70.0,
        };
        scene.default_albedo_scale = 0.5;
        scene
    }

    /// Loads every model of an OBJ file. Per-model diffuse colors come from
    /// the MTL file when present.
    pub fn from_obj(path: impl AsRef<Path>) -> SceneResult<Self> {
        let path = path.as_ref();
        let (models, materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                single_index: true,
                triangulate: true,
                ..Default::default()
            },
        )?;
        let obj_materials = materials.unwrap_or_else(|e| {
            log::warn!("ignoring MTL for {}: {}", path.display(), e);
            Vec::new()
        });

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "obj".to_string());
        let mut scene = Scene::new(name.clone());
        let base = scene.materials.len();
        for m in &obj_materials {
            let albedo = m.diffuse.map(Vec3::from).unwrap_or(Vec3::splat(0.5));
            scene.add_material(Material::new(m.name.clone(), albedo));
        }
        let fallback = scene.add_material(Material::default());

        for model in models {
            let mesh = &model.mesh;
            let positions: Vec<Vec3> = mesh
                .positions
                .chunks_exact(3)
                .map(|p| Vec3::new(p[0], p[1], p[2]))
                .collect();
            let mut out = Mesh::new(positions, mesh.indices.clone());
            if mesh.normals.len() == mesh.positions.len() {
                out.normals = mesh
                    .normals
                    .chunks_exact(3)
                    .map(|n| Vec3::new(n[0], n[1], n[2]))
                    .collect();
            }
            let material = mesh.material_id.map(|id| base + id).unwrap_or(fallback);
            log::debug!("obj model '{}': {} triangles", model.name, out.triangle_count());
            scene.add_object(model.name, out, material);
        }

        if scene.triangle_count() == 0 {
            return Err(SceneError::Empty(name));
        }

        let bounds = scene.world_bounds();
        let radius = bounds.extent().length() * 0.5;
        scene.camera = CameraPose {
            position: bounds.centroid() + Vec3::new(0.0, 0.2, 1.0).normalize() * radius * 1.8,
            target: bounds.centroid(),
            vfov_degrees: 60.0,
        };
        log::info!(
            "loaded {} ({} objects, {} triangles)",
            path.display(),
            scene.objects.len(),
            scene.triangle_count()
        );
        Ok(scene)
    }
}

/// Appends an axis-aligned rectangle on the plane `axis = offset`.
///
/// `lo`/`hi` span the two remaining axes in cyclic order (`axis + 1`,
/// `axis + 2`). `facing` picks the sign of the normal along `axis`.
fn axis_quad(mesh: &mut Mesh, axis: usize, offset: f32, lo: Vec2, hi: Vec2, facing: f32) {
    let (u, v) = ((axis + 1) % 3, (axis + 2) % 3);
    let corner = |a: f32, b: f32| {
        let mut p = Vec3::ZERO;
        p[axis] = offset;
        p[u] = a;
        p[v] = b;
        p
    };
    let (a, b, c, d) = (
        corner(lo.x, lo.y),
        corner(hi.x, lo.y),
        corner(hi.x, hi.y),
        corner(lo.x, hi.y),
    );
    // cyclic (u, v) order yields a +axis normal
    if facing >= 0.0 {
        mesh.push_quad(a, b, c, d);
    } else {
        mesh.push_quad(a, d, c, b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_quad_facing() {
        for axis in 0..3 {
            for facing in [1.0, -1.0] {
                let mut mesh = Mesh::default();
                axis_quad(&mut mesh, axis, 0.0, Vec2::ZERO, Vec2::ONE, facing);
                let n = mesh.triangle(0).unwrap().face_normal();
                assert!(n[axis] * facing > 0.0, "axis {} facing {}", axis, facing);
            }
        }
    }

    #[test]
    fn test_box_scene() {
        let scene = Scene::box_scene();
        assert_eq!(scene.objects.len(), 3);
        assert!(scene.triangle_count() > 12);
        assert_eq!(scene.default_albedo_scale, 0.5);
        assert!(scene.objects.iter().all(|o| o.mesh.lightmap_uvs.is_some()));
        let bounds = scene.world_bounds();
        assert!(bounds.y.min.abs() < 1e-3);
    }

    #[test]
    fn test_white_room_is_inward_facing() {
        let scene = Scene::white_room();
        let room = &scene.objects[0];
        let center = Vec3::new(0.0, 2.5, 0.0);
        for tri in room.mesh.triangles() {
            let to_center = center - tri.positions[0];
            assert!(tri.face_normal().dot(to_center) > 0.0);
        }
    }

    #[test]
    fn test_builtin_matches_kind() {
        assert_eq!(Scene::builtin(SceneKind::Box).name, "Box");
        assert_eq!(Scene::builtin(SceneKind::WhiteRoom).name, "White Room");
    }

    #[test]
    fn test_missing_obj_is_error() {
        assert!(Scene::from_obj("/nonexistent/kiln.obj").is_err());
    }
}
