/// A closed range of ray parameters or coordinates along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    /// An interval containing nothing (`min > max`).
    pub const EMPTY: Interval = Interval {
        min: f32::INFINITY,
        max: f32::NEG_INFINITY,
    };

    /// An interval containing every finite value.
    pub const UNIVERSE: Interval = Interval {
        min: f32::NEG_INFINITY,
        max: f32::INFINITY,
    };

    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Ray parameter range starting just past the origin.
    pub fn from_epsilon(epsilon: f32, max: f32) -> Self {
        Self { min: epsilon, max }
    }

    pub fn size(&self) -> f32 {
        self.max - self.min
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    /// Inclusive membership test.
    pub fn contains(&self, x: f32) -> bool {
        self.min <= x && x <= self.max
    }

    /// Exclusive membership test, used for ray hit ranges.
    pub fn surrounds(&self, x: f32) -> bool {
        self.min < x && x < self.max
    }

    pub fn clamp(&self, x: f32) -> f32 {
        x.clamp(self.min, self.max)
    }

    /// Grows the interval by `delta / 2` on both ends.
    pub fn expand(&self, delta: f32) -> Interval {
        let half = delta * 0.5;
        Interval::new(self.min - half, self.max + half)
    }

    /// Maps `t` in `[0, 1]` onto the interval.
    pub fn lerp(&self, t: f32) -> f32 {
        self.min + (self.max - self.min) * t
    }

    /// Inverse of [`Interval::lerp`]. Returns 0 for a zero-width interval.
    pub fn inverse_lerp(&self, x: f32) -> f32 {
        let size = self.size();
        if size > 0.0 {
            (x - self.min) / size
        } else {
            0.0
        }
    }

    /// Smallest interval containing both inputs.
    pub fn surrounding(a: &Interval, b: &Interval) -> Interval {
        Interval::new(a.min.min(b.min), a.max.max(b.max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_membership() {
        let i = Interval::new(0.0, 10.0);
        assert!(i.contains(0.0));
        assert!(i.contains(10.0));
        assert!(!i.surrounds(0.0));
        assert!(i.surrounds(5.0));
        assert!(!i.contains(10.1));
    }

    #[test]
    fn test_interval_expand_and_clamp() {
        let i = Interval::new(0.0, 10.0).expand(4.0);
        assert_eq!(i.min, -2.0);
        assert_eq!(i.max, 12.0);
        assert_eq!(i.clamp(20.0), 12.0);
    }

    #[test]
    fn test_interval_lerp_roundtrip() {
        let i = Interval::new(-4.0, 4.0);
        assert_eq!(i.lerp(0.5), 0.0);
        assert_eq!(i.inverse_lerp(2.0), 0.75);
        assert_eq!(Interval::new(1.0, 1.0).inverse_lerp(1.0), 0.0);
    }

    #[test]
    fn test_interval_empty_and_universe() {
        assert!(Interval::EMPTY.is_empty());
        assert!(!Interval::EMPTY.contains(0.0));
        assert!(Interval::UNIVERSE.contains(1e20));
        let merged = Interval::surrounding(&Interval::EMPTY, &Interval::new(1.0, 2.0));
        assert_eq!(merged, Interval::new(1.0, 2.0));
    }
}
