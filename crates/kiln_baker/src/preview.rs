//! Progressive path traced ground truth preview.
//!
//! Each call to [`PreviewRenderer::advance`] adds one sample to every pixel,
//! rendering buckets in parallel, until `NumRenderSamples^2` samples are in.

use crate::bucket::{generate_buckets, render_bucket, Bucket, BucketResult, DEFAULT_BUCKET_SIZE};
use crate::camera::Camera;
use crate::integrator::{PathSettings, PathTracer};
use crate::sampling;
use kiln_core::settings::{names, Registry, SampleMode, SettingsResult};
use kiln_core::{CameraPose, ExportResult, FloatImage};
use kiln_math::Color;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

pub const DEFAULT_PREVIEW_WIDTH: u32 = 320;
pub const DEFAULT_PREVIEW_HEIGHT: u32 = 180;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewSettings {
    pub width: u32,
    pub height: u32,
    pub sqrt_samples: u32,
    pub sample_mode: SampleMode,
    pub path: PathSettings,
}

impl PreviewSettings {
    pub fn from_registry(registry: &Registry, width: u32, height: u32) -> SettingsResult<Self> {
        Ok(Self {
            width: width.max(1),
            height: height.max(1),
            sqrt_samples: registry.int(names::NUM_RENDER_SAMPLES)?.max(1) as u32,
            sample_mode: registry.choice(names::RENDER_SAMPLE_MODE)?,
            path: PathSettings::ground_truth(registry)?,
        })
    }

    pub fn samples_per_pixel(&self) -> u32 {
        self.sqrt_samples * self.sqrt_samples
    }
}

/// HUD line for a progress fraction, percent with two decimals.
pub fn format_progress(label: &str, progress: f32) -> String {
    let percent = (progress.clamp(0.0, 1.0) as f64 * 10000.0).round() / 100.0;
    format!("{}: {:.2}%", label, percent)
}

pub struct PreviewRenderer {
    settings: PreviewSettings,
    camera: Camera,
    buckets: Vec<Bucket>,
    accum: Vec<Color>,
    passes: u32,
}

impl PreviewRenderer {
    pub fn new(settings: PreviewSettings, pose: &CameraPose) -> Self {
        Self {
            camera: Camera::from_pose(pose, settings.width, settings.height),
            buckets: generate_buckets(settings.width, settings.height, DEFAULT_BUCKET_SIZE),
            accum: vec![Color::ZERO; (settings.width * settings.height) as usize],
            passes: 0,
            settings,
        }
    }

    /// Drops every accumulated sample.
    pub fn reset(&mut self, settings: PreviewSettings, pose: &CameraPose) {
        *self = Self::new(settings, pose);
        log::debug!("preview restarted at {}x{}", settings.width, settings.height);
    }

    pub fn passes(&self) -> u32 {
        self.passes
    }

    pub fn progress(&self) -> f32 {
        self.passes as f32 / self.settings.samples_per_pixel() as f32
    }

    pub fn is_complete(&self) -> bool {
        self.passes >= self.settings.samples_per_pixel()
    }

    /// Renders one more sample per pixel. Returns the new progress.
    pub fn advance(&mut self, tracer: &PathTracer) -> f32 {
        if self.is_complete() {
            return 1.0;
        }
        let pass = self.passes;
        let width = self.settings.width;
        let settings = &self.settings;
        let camera = &self.camera;

        let results: Vec<BucketResult> = self
            .buckets
            .par_iter()
            .map(|bucket| {
                render_bucket(bucket, |x, y| {
                    let pixel = y * width + x;
                    let seed = ((pass as u64) << 32) | pixel as u64;
                    let mut rng = StdRng::seed_from_u64(seed);
                    let offset = sampling::generate(pass, settings.sqrt_samples, pixel, settings.sample_mode, &mut rng);
                    let ray = camera.get_ray(x, y, offset);
                    tracer.trace_radiance(ray.origin, ray.direction, &settings.path, &mut rng).radiance
                })
            })
            .collect();

        for result in results {
            for ((x, y), color) in result.bucket.pixels().zip(result.pixels) {
                self.accum[(y * width + x) as usize] += color;
            }
        }
        self.passes += 1;
        self.progress()
    }

    /// Mean of the samples rendered so far.
    pub fn image(&self) -> ExportResult<FloatImage> {
        let scale = if self.passes > 0 { 1.0 / self.passes as f32 } else { 0.0 };
        let pixels: Vec<Color> = self.accum.iter().map(|c| *c * scale).collect();
        FloatImage::from_rgb(self.settings.width, self.settings.height, &pixels)
    }
}
