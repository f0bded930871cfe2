use crate::{Interval, Ray, Vec3};

/// Relative error bound of three rounded f32 operations.
const SLAB_ROUNDING: f32 = 3.0 * (f32::EPSILON * 0.5) / (1.0 - 3.0 * (f32::EPSILON * 0.5));

/// Axis-aligned bounding box stored as per-axis intervals.
///
/// Used both by the BVH and as the scene bounds that probe grids and
/// voxel volumes are laid out in.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Aabb {
    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
    };

    /// Box spanning two corner points in any order.
    pub fn from_corners(a: Vec3, b: Vec3) -> Self {
        let mut aabb = Self {
            x: Interval::new(a.x.min(b.x), a.x.max(b.x)),
            y: Interval::new(a.y.min(b.y), a.y.max(b.y)),
            z: Interval::new(a.z.min(b.z), a.z.max(b.z)),
        };
        aabb.pad_degenerate_axes();
        aabb
    }

    /// Tight box around a point set. Returns [`Aabb::EMPTY`] for no points.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        let mut any = false;
        for p in points {
            min = min.min(*p);
            max = max.max(*p);
            any = true;
        }
        if any {
            Self::from_corners(min, max)
        } else {
            Self::EMPTY
        }
    }

    pub fn surrounding(a: &Aabb, b: &Aabb) -> Self {
        Self {
            x: Interval::surrounding(&a.x, &b.x),
            y: Interval::surrounding(&a.y, &b.y),
            z: Interval::surrounding(&a.z, &b.z),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty() || self.y.is_empty() || self.z.is_empty()
    }

    pub fn min(&self) -> Vec3 {
        Vec3::new(self.x.min, self.y.min, self.z.min)
    }

    pub fn max(&self) -> Vec3 {
        Vec3::new(self.x.max, self.y.max, self.z.max)
    }

    pub fn extent(&self) -> Vec3 {
        self.max() - self.min()
    }

    pub fn centroid(&self) -> Vec3 {
        (self.min() + self.max()) * 0.5
    }

    /// Interval for axis 0 (X), 1 (Y) or 2 (Z).
    pub fn axis_interval(&self, axis: usize) -> Interval {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    /// Index of the axis with the largest extent.
    pub fn longest_axis(&self) -> usize {
        let e = self.extent();
        if e.x > e.y && e.x > e.z {
            0
        } else if e.y > e.z {
            1
        } else {
            2
        }
    }

    /// Scales the box about its center and then translates it.
    pub fn scaled(&self, scale: f32, offset: Vec3) -> Aabb {
        let center = self.centroid() + offset;
        let half = self.extent() * 0.5 * scale;
        Aabb::from_corners(center - half, center + half)
    }

    /// Maps normalized coordinates in `[0, 1]^3` to a point inside the box.
    pub fn lerp(&self, t: Vec3) -> Vec3 {
        self.min() + self.extent() * t
    }

    /// Slab test. Returns the clipped parameter range on a hit.
    pub fn clip(&self, ray: &Ray, mut ray_t: Interval) -> Option<Interval> {
        for axis in 0..3 {
            let slab = self.axis_interval(axis);
            let inv = 1.0 / ray.direction[axis];
            let mut t0 = (slab.min - ray.origin[axis]) * inv;
            let mut t1 = (slab.max - ray.origin[axis]) * inv;
            if inv < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }
            // widen the far hit by the rounding bound so grazing and corner
            // rays still reach the primitives they touch
            t1 *= 1.0 + 2.0 * SLAB_ROUNDING;
            ray_t.min = t0.max(ray_t.min);
            ray_t.max = t1.min(ray_t.max);
            if ray_t.max <= ray_t.min {
                return None;
            }
        }
        Some(ray_t)
    }

    pub fn hit(&self, ray: &Ray, ray_t: Interval) -> bool {
        self.clip(ray, ray_t).is_some()
    }

    // Flat geometry (a single floor quad) still needs a non-zero slab.
    fn pad_degenerate_axes(&mut self) {
        let delta = 0.0001;
        if self.x.size() < delta {
            self.x = self.x.expand(delta);
        }
        if self.y.size() < delta {
            self.y = self.y.expand(delta);
        }
        if self.z.size() < delta {
            self.z = self.z.expand(delta);
        }
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_from_points() {
        let pts = [Vec3::new(1.0, -2.0, 0.0), Vec3::new(-1.0, 3.0, 5.0)];
        let aabb = Aabb::from_points(pts.iter());
        assert_eq!(aabb.min(), Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max(), Vec3::new(1.0, 3.0, 5.0));
        assert!(Aabb::from_points(std::iter::empty()).is_empty());
    }

    #[test]
    fn test_aabb_flat_is_padded() {
        let aabb = Aabb::from_corners(Vec3::ZERO, Vec3::new(4.0, 0.0, 4.0));
        assert!(aabb.y.size() > 0.0);
    }

    #[test]
    fn test_aabb_hit_and_clip() {
        let aabb = Aabb::from_corners(Vec3::splat(-1.0), Vec3::splat(1.0));
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        let range = aabb.clip(&ray, Interval::new(0.0, 100.0)).unwrap();
        assert!((range.min - 4.0).abs() < 1e-5);
        assert!((range.max - 6.0).abs() < 1e-5);

        let away = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::NEG_Z);
        assert!(!aabb.hit(&away, Interval::new(0.0, 100.0)));
    }

    #[test]
    fn test_aabb_scaled_about_center() {
        let aabb = Aabb::from_corners(Vec3::ZERO, Vec3::splat(2.0));
        let big = aabb.scaled(2.0, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(big.min(), Vec3::new(-1.0, 0.0, -1.0));
        assert_eq!(big.max(), Vec3::new(3.0, 4.0, 3.0));
        assert_eq!(big.longest_axis(), 2);
    }

    #[test]
    fn test_aabb_lerp() {
        let aabb = Aabb::from_corners(Vec3::ZERO, Vec3::new(2.0, 4.0, 8.0));
        assert_eq!(aabb.lerp(Vec3::splat(0.5)), Vec3::new(1.0, 2.0, 4.0));
    }
}
