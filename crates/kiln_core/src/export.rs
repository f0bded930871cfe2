//! Float image buffers and screenshot export.
//!
//! Radiance buffers are kept pre-scaled by [`FP16_SCALE`] so that physical
//! luminance values fit half-float render targets. Export undoes the scale and
//! clamps to the representable half-float range before encoding.

use std::path::Path;

use kiln_math::Vec3;
use thiserror::Error;

/// Exposure pre-scale applied to radiance stored in half-float targets.
pub const FP16_SCALE: f32 = 1.0 / 1024.0;

/// Largest value written to exported images.
pub const FP16_MAX: f32 = 65000.0;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("pixel buffer has {got} pixels, expected {expected}")]
    SizeMismatch { expected: usize, got: usize },
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Row-major RGBA float image, origin top-left.
#[derive(Clone, Debug, PartialEq)]
pub struct FloatImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<[f32; 4]>,
}

impl FloatImage {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0.0, 0.0, 0.0, 1.0]; (width * height) as usize],
        }
    }

    pub fn from_pixels(width: u32, height: u32, pixels: Vec<[f32; 4]>) -> ExportResult<Self> {
        let expected = (width * height) as usize;
        if pixels.len() != expected {
            return Err(ExportError::SizeMismatch {
                expected,
                got: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Builds an opaque image from RGB values.
    pub fn from_rgb(width: u32, height: u32, rgb: &[Vec3]) -> ExportResult<Self> {
        let pixels = rgb.iter().map(|c| [c.x, c.y, c.z, 1.0]).collect();
        Self::from_pixels(width, height, pixels)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, value: [f32; 4]) {
        if x < self.width && y < self.height {
            self.pixels[(y * self.width + x) as usize] = value;
        }
    }

    /// Undoes [`FP16_SCALE`] and clamps color channels to `[0, FP16_MAX]`.
    /// NaNs become zero. Alpha is left alone.
    pub fn descaled(&self) -> FloatImage {
        let fix = |v: f32| {
            let v = v / FP16_SCALE;
            if v.is_nan() {
                0.0
            } else {
                v.clamp(0.0, FP16_MAX)
            }
        };
        let pixels = self
            .pixels
            .iter()
            .map(|p| [fix(p[0]), fix(p[1]), fix(p[2]), p[3]])
            .collect();
        FloatImage {
            width: self.width,
            height: self.height,
            pixels,
        }
    }

    /// Writes the image as-is. The format follows the extension; EXR keeps full
    /// float precision, other formats are quantized to 8 bits.
    pub fn save(&self, path: impl AsRef<Path>) -> ExportResult<()> {
        let path = path.as_ref();
        let flat: Vec<f32> = bytemuck::cast_slice::<[f32; 4], f32>(&self.pixels).to_vec();
        let buffer = image::Rgba32FImage::from_raw(self.width, self.height, flat).ok_or(
            ExportError::SizeMismatch {
                expected: (self.width * self.height) as usize,
                got: self.pixels.len(),
            },
        )?;
        let dynamic = image::DynamicImage::ImageRgba32F(buffer);
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "exr" => dynamic.save(path)?,
            "hdr" => image::DynamicImage::ImageRgb32F(dynamic.to_rgb32f()).save(path)?,
            _ => image::DynamicImage::ImageRgba8(dynamic.to_rgba8()).save(path)?,
        }
        log::info!("wrote {}x{} image to {}", self.width, self.height, path.display());
        Ok(())
    }

    /// Screenshot export: descale, clamp, then save.
    pub fn export_screenshot(&self, path: impl AsRef<Path>) -> ExportResult<()> {
        self.descaled().save(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descale_and_clamp() {
        let img = FloatImage::from_pixels(
            2,
            1,
            vec![[FP16_SCALE, -1.0, f32::NAN, 0.5], [1000.0, 0.0, 0.0, 1.0]],
        )
        .unwrap();
        let out = img.descaled();
        assert_eq!(out.pixels[0], [1.0, 0.0, 0.0, 0.5]);
        assert_eq!(out.pixels[1][0], FP16_MAX);
    }

    #[test]
    fn test_size_mismatch() {
        assert!(matches!(
            FloatImage::from_pixels(2, 2, vec![[0.0; 4]; 3]),
            Err(ExportError::SizeMismatch { expected: 4, got: 3 })
        ));
    }

    #[test]
    fn test_pixel_access() {
        let mut img = FloatImage::new(3, 2);
        img.set_pixel(2, 1, [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(img.pixel(2, 1), Some([1.0, 2.0, 3.0, 1.0]));
        assert_eq!(img.pixel(3, 0), None);
    }

    #[test]
    fn test_save_png_and_exr() {
        let img = FloatImage::from_rgb(4, 4, &vec![Vec3::new(0.5, 0.25, 1.0); 16]).unwrap();
        let dir = std::env::temp_dir();
        for ext in ["png", "exr"] {
            let path = dir.join(format!("kiln_export_{}.{}", std::process::id(), ext));
            img.save(&path).unwrap();
            assert!(path.exists());
            let _ = std::fs::remove_file(&path);
        }
    }
}
