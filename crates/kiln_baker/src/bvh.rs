//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! Binary tree built by median split on the longest centroid axis.

use crate::hittable::{HitRecord, Hittable};
use kiln_math::{Aabb, Interval, Ray};

/// Maximum primitives per leaf node before splitting.
const LEAF_MAX_SIZE: usize = 4;

/// BVH node - either a branch with two children or a leaf with primitives.
///
/// Generic over the primitive so leaves hold primitives by value.
pub enum BvhNode<T: Hittable> {
    /// Internal node with two children.
    Branch {
        left: Box<BvhNode<T>>,
        right: Box<BvhNode<T>>,
        bbox: Aabb,
    },
    /// Leaf node with a small number of primitives.
    Leaf { objects: Vec<T>, bbox: Aabb },
    /// Empty node (for empty scenes).
    Empty,
}

impl<T: Hittable> BvhNode<T> {
    /// Create a BVH from a list of primitives.
    pub fn new(objects: Vec<T>) -> Self {
        if objects.is_empty() {
            return BvhNode::Empty;
        }
        Self::build(objects)
    }

    fn build(mut objects: Vec<T>) -> Self {
        let n = objects.len();
        let bounds = objects
            .iter()
            .fold(Aabb::EMPTY, |acc, o| Aabb::surrounding(&acc, &o.bounding_box()));

        if n <= LEAF_MAX_SIZE {
            return BvhNode::Leaf { objects, bbox: bounds };
        }

        let centroids: Vec<_> = objects.iter().map(|o| o.bounding_box().centroid()).collect();
        let axis = Aabb::from_points(centroids.iter()).longest_axis();

        // select_nth is enough for a median split
        let mid = n / 2;
        objects.select_nth_unstable_by(mid, |a, b| {
            let a = a.bounding_box().centroid()[axis];
            let b = b.bounding_box().centroid()[axis];
            a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
        });

        let right_objects = objects.split_off(mid);
        let left = Self::build(objects);
        let right = Self::build(right_objects);

        BvhNode::Branch {
            left: Box::new(left),
            right: Box::new(right),
            bbox: bounds,
        }
    }

    /// Number of primitives below this node.
    pub fn primitive_count(&self) -> usize {
        match self {
            BvhNode::Empty => 0,
            BvhNode::Leaf { objects, .. } => objects.len(),
            BvhNode::Branch { left, right, .. } => left.primitive_count() + right.primitive_count(),
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            BvhNode::Empty | BvhNode::Leaf { .. } => 1,
            BvhNode::Branch { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

impl<T: Hittable> Hittable for BvhNode<T> {
    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool {
        match self {
            BvhNode::Empty => false,

            BvhNode::Leaf { objects, bbox } => {
                if !bbox.hit(ray, ray_t) {
                    return false;
                }

                let mut hit_anything = false;
                let mut closest = ray_t.max;
                for obj in objects {
                    if obj.hit(ray, Interval::new(ray_t.min, closest), rec) {
                        hit_anything = true;
                        closest = rec.t;
                    }
                }
                hit_anything
            }

            BvhNode::Branch { left, right, bbox } => {
                if !bbox.hit(ray, ray_t) {
                    return false;
                }

                let hit_left = left.hit(ray, ray_t, rec);

                // Only check right up to closest hit
                let right_max = if hit_left { rec.t } else { ray_t.max };
                let hit_right = right.hit(ray, Interval::new(ray_t.min, right_max), rec);

                hit_left || hit_right
            }
        }
    }

    fn bounding_box(&self) -> Aabb {
        match self {
            BvhNode::Empty => Aabb::EMPTY,
            BvhNode::Leaf { bbox, .. } => *bbox,
            BvhNode::Branch { bbox, .. } => *bbox,
        }
    }

    fn occluded(&self, ray: &Ray, ray_t: Interval) -> bool {
        match self {
            BvhNode::Empty => false,
            BvhNode::Leaf { objects, bbox } => {
                bbox.hit(ray, ray_t) && objects.iter().any(|o| o.occluded(ray, ray_t))
            }
            BvhNode::Branch { left, right, bbox } => {
                bbox.hit(ray, ray_t) && (left.occluded(ray, ray_t) || right.occluded(ray, ray_t))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triangle::Triangle;
    use kiln_math::Vec3;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn quad_at(x: f32, z: f32) -> [Triangle; 2] {
        let (a, b) = (Vec3::new(x - 0.5, -0.5, z), Vec3::new(x + 0.5, -0.5, z));
        let (c, d) = (Vec3::new(x + 0.5, 0.5, z), Vec3::new(x - 0.5, 0.5, z));
        [Triangle::new(a, b, c, 0), Triangle::new(a, c, d, 0)]
    }

    #[test]
    fn test_bvh_empty() {
        let bvh: BvhNode<Triangle> = BvhNode::new(vec![]);
        assert!(matches!(bvh, BvhNode::Empty));
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        assert!(!bvh.hit(&ray, Interval::new(0.001, f32::INFINITY), &mut HitRecord::default()));
    }

    #[test]
    fn test_bvh_single_quad() {
        let bvh = BvhNode::new(quad_at(0.0, -1.0).to_vec());
        assert!(matches!(bvh, BvhNode::Leaf { .. }));

        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        let mut rec = HitRecord::default();
        assert!(bvh.hit(&ray, Interval::new(0.001, f32::INFINITY), &mut rec));
        assert!((rec.t - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_bvh_multiple_quads() {
        let tris: Vec<Triangle> = (0..10).flat_map(|i| quad_at(i as f32 * 2.0, -5.0)).collect();
        let bvh = BvhNode::new(tris);
        assert_eq!(bvh.primitive_count(), 20);
        assert!(bvh.depth() > 1);

        let ray = Ray::new(Vec3::new(10.0, 0.0, 0.0), Vec3::new(0.0, 0.0, -1.0));
        let mut rec = HitRecord::default();
        assert!(bvh.hit(&ray, Interval::new(0.001, f32::INFINITY), &mut rec));
        assert!((rec.p.z + 5.0).abs() < 1e-4);

        // between quads
        let ray = Ray::new(Vec3::new(11.0, 0.0, 0.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(!bvh.occluded(&ray, Interval::new(0.001, f32::INFINITY)));
    }

    #[test]
    fn test_bvh_matches_linear_scan() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut tris = Vec::new();
        for _ in 0..200 {
            let c = Vec3::new(rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0));
            let a = c + Vec3::new(rng.gen(), rng.gen(), rng.gen());
            let b = c + Vec3::new(rng.gen(), rng.gen(), rng.gen());
            tris.push(Triangle::new(c, a, b, 0));
        }
        let bvh = BvhNode::new(tris.clone());
        let linear_hit = |ray: &Ray, range: Interval, rec: &mut HitRecord| {
            let mut closest = range.max;
            let mut hit_anything = false;
            for tri in &tris {
                if tri.hit(ray, Interval::new(range.min, closest), rec) {
                    hit_anything = true;
                    closest = rec.t;
                }
            }
            hit_anything
        };

        for _ in 0..500 {
            let origin = Vec3::new(rng.gen_range(-8.0..8.0), rng.gen_range(-8.0..8.0), rng.gen_range(-8.0..8.0));
            let dir = Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
            let ray = Ray::new(origin, dir);
            let range = Interval::new(0.001, f32::INFINITY);

            let (mut a, mut b) = (HitRecord::default(), HitRecord::default());
            let hit_list = linear_hit(&ray, range, &mut a);
            let hit_bvh = bvh.hit(&ray, range, &mut b);
            assert_eq!(hit_list, hit_bvh);
            if hit_list {
                assert!((a.t - b.t).abs() < 1e-4);
            }
            assert_eq!(bvh.occluded(&ray, range), hit_list);
        }
    }
}
