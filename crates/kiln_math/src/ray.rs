use crate::Vec3;

/// A ray with an origin and a (not necessarily normalized) direction.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Spawns a ray leaving a surface, nudging the origin along the normal
    /// to the side the direction points into.
    pub fn spawn(point: Vec3, normal: Vec3, direction: Vec3, bias: f32) -> Self {
        let side = if direction.dot(normal) >= 0.0 { 1.0 } else { -1.0 };
        Self::new(point + normal * (bias * side), direction)
    }

    /// Point at parameter `t`.
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert_eq!(ray.at(2.0), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(ray.at(-1.0), Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_spawn_offsets_towards_direction() {
        let up = Ray::spawn(Vec3::ZERO, Vec3::Y, Vec3::new(0.0, 1.0, 1.0), 0.01);
        assert!(up.origin.y > 0.0);
        let down = Ray::spawn(Vec3::ZERO, Vec3::Y, Vec3::NEG_Y, 0.01);
        assert!(down.origin.y < 0.0);
    }
}
