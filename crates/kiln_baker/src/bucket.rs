//! Bucket (tile) layout for the ground truth preview.
//!
//! Buckets are independent, so one preview pass renders them in parallel with
//! rayon.

use kiln_math::Color;

/// A rectangular region of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    /// X coordinate of the top-left corner
    pub x: u32,
    /// Y coordinate of the top-left corner
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Position in render order
    pub index: usize,
}

impl Bucket {
    pub fn new(x: u32, y: u32, width: u32, height: u32, index: usize) -> Self {
        Self { x, y, width, height, index }
    }

    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    /// Image coordinates of every pixel, row-major.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (0..self.height).flat_map(move |ly| (0..self.width).map(move |lx| (self.x + lx, self.y + ly)))
    }
}

pub const DEFAULT_BUCKET_SIZE: u32 = 32;

/// Splits an image into buckets ordered from the center outwards.
pub fn generate_buckets(width: u32, height: u32, bucket_size: u32) -> Vec<Bucket> {
    let size = bucket_size.max(1);
    let mut buckets = Vec::new();
    let mut y = 0;
    while y < height {
        let mut x = 0;
        while x < width {
            buckets.push(Bucket::new(x, y, size.min(width - x), size.min(height - y), buckets.len()));
            x += size;
        }
        y += size;
    }

    sort_spiral(&mut buckets, width, height);
    for (i, bucket) in buckets.iter_mut().enumerate() {
        bucket.index = i;
    }
    buckets
}

/// Sorts buckets by distance of their center from the image center.
fn sort_spiral(buckets: &mut [Bucket], width: u32, height: u32) {
    let center_x = width as f32 / 2.0;
    let center_y = height as f32 / 2.0;
    let dist = |b: &Bucket| {
        let cx = b.x as f32 + b.width as f32 / 2.0;
        let cy = b.y as f32 + b.height as f32 / 2.0;
        (cx - center_x).powi(2) + (cy - center_y).powi(2)
    };
    buckets.sort_by(|a, b| dist(a).total_cmp(&dist(b)));
}

/// Renders every pixel of a bucket with `shade(x, y)`.
pub fn render_bucket(bucket: &Bucket, mut shade: impl FnMut(u32, u32) -> Color) -> BucketResult {
    let pixels = bucket.pixels().map(|(x, y)| shade(x, y)).collect();
    BucketResult::new(*bucket, pixels)
}

/// Rendered pixels of one bucket, row-major.
#[derive(Debug, Clone)]
pub struct BucketResult {
    pub bucket: Bucket,
    pub pixels: Vec<Color>,
}

impl BucketResult {
    pub fn new(bucket: Bucket, pixels: Vec<Color>) -> Self {
        Self { bucket, pixels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets_cover_image() {
        for (w, h) in [(128, 128), (100, 70), (1, 1)] {
            let buckets = generate_buckets(w, h, 32);
            let total: u32 = buckets.iter().map(|b| b.pixel_count()).sum();
            assert_eq!(total, w * h);
        }
        assert_eq!(generate_buckets(100, 70, 32).len(), 4 * 3);
    }

    #[test]
    fn test_center_bucket_first() {
        let buckets = generate_buckets(96, 96, 32);
        assert_eq!((buckets[0].x, buckets[0].y), (32, 32));
        assert!(buckets.iter().enumerate().all(|(i, b)| b.index == i));
    }

    #[test]
    fn test_render_bucket_row_major() {
        let bucket = Bucket::new(4, 8, 2, 2, 0);
        let result = render_bucket(&bucket, |x, y| Color::new(x as f32, y as f32, 0.0));
        let coords: Vec<(f32, f32)> = result.pixels.iter().map(|c| (c.x, c.y)).collect();
        assert_eq!(coords, vec![(4.0, 8.0), (5.0, 8.0), (4.0, 9.0), (5.0, 9.0)]);
    }
}
