//! Frame-to-frame parameter change tracking.
//!
//! The tracker snapshots the registry once per frame and diffs it against the
//! previous frame. Writes the session itself makes during a frame (sun
//! direction sync, unit sync, probe grid fitting) are folded in with
//! [`InvalidationTracker::amend`].

use kiln_core::settings::names::*;
use kiln_core::{ParameterSnapshot, Registry};
use std::collections::HashSet;

/// Lighting and scene inputs. A change here invalidates every baked result.
pub const BAKE_INVALIDATORS: &[&str] = &[
    ENABLE_SUN,
    SUN_TINT_COLOR,
    SUN_INTENSITY_SCALE,
    SUN_SIZE,
    NORMALIZE_SUN_INTENSITY,
    SUN_DIRECTION,
    SKY_MODE,
    SKY_COLOR,
    TURBIDITY,
    GROUND_ALBEDO,
    ENABLE_AREA_LIGHT,
    ENABLE_AREA_LIGHT_SHADOWS,
    AREA_LIGHT_COLOR,
    AREA_LIGHT_LUMINANCE,
    AREA_LIGHT_ILLUMINANCE,
    AREA_LIGHT_LUMINOUS_POWER,
    AREA_LIGHT_EV100,
    AREA_LIGHT_UNITS,
    AREA_LIGHT_ILLUMINANCE_DISTANCE,
    AREA_LIGHT_SIZE,
    AREA_LIGHT_X,
    AREA_LIGHT_Y,
    AREA_LIGHT_Z,
    AREA_LIGHT_SHADOW_BIAS,
    BAKE_DIRECT_AREA_LIGHT,
    CURRENT_SCENE,
    ENABLE_DIRECT_LIGHTING,
    ENABLE_INDIRECT_LIGHTING,
    DIFFUSE_ALBEDO_SCALE,
];

/// Lightmap-only inputs.
pub const LIGHTMAP_PARAMS: &[&str] = &[
    LIGHT_MAP_RESOLUTION,
    NUM_BAKE_SAMPLES,
    BAKE_SAMPLE_MODE,
    MAX_BAKE_PATH_LENGTH,
    BAKE_RUSSIAN_ROULETTE_DEPTH,
    BAKE_RUSSIAN_ROULETTE_PROBABILITY,
    BAKE_MODE,
    SOLVE_MODE,
];

/// Probe-only inputs. Probes trace with the bake path settings.
pub const PROBE_PARAMS: &[&str] = &[
    PROBE_MODE,
    PROBE_RES_X,
    PROBE_RES_Y,
    PROBE_RES_Z,
    PROBE_CUBEMAP_CAPTURE_RES,
    PROBE_IRRADIANCE_CUBEMAP_RES,
    PROBE_DISTANCE_CUBEMAP_RES,
    SCENE_BOUNDS_SCALE,
    SCENE_BOUNDS_OFFSET_X,
    SCENE_BOUNDS_OFFSET_Y,
    SCENE_BOUNDS_OFFSET_Z,
    DISTANCE_FILTER_SHARPNESS,
    PROBE_INTEGRATION_SAMPLES,
    PROBE_DISTANCE_INTEGRATION_SAMPLES,
    MAX_BAKE_PATH_LENGTH,
    BAKE_RUSSIAN_ROULETTE_DEPTH,
    BAKE_RUSSIAN_ROULETTE_PROBABILITY,
];

pub const VOXEL_PARAMS: &[&str] = &[
    VOXEL_RES_X,
    VOXEL_RES_Y,
    VOXEL_RES_Z,
    SCENE_BOUNDS_SCALE,
    SCENE_BOUNDS_OFFSET_X,
    SCENE_BOUNDS_OFFSET_Y,
    SCENE_BOUNDS_OFFSET_Z,
];

/// Ground truth preview inputs.
pub const PREVIEW_PARAMS: &[&str] = &[
    SHOW_GROUND_TRUTH,
    NUM_RENDER_SAMPLES,
    RENDER_SAMPLE_MODE,
    MAX_RENDER_PATH_LENGTH,
    RENDER_RUSSIAN_ROULETTE_DEPTH,
    RENDER_RUSSIAN_ROULETTE_PROBABILITY,
    JITTER_MODE,
    JITTER_SCALE,
];

#[derive(Debug, Default)]
pub struct InvalidationTracker {
    current: Option<ParameterSnapshot>,
    changed: HashSet<&'static str>,
    first_frame: bool,
    forced: bool,
    frame: u64,
}

impl InvalidationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots the registry and computes this frame's changed set. On the
    /// first frame every parameter counts as changed.
    pub fn begin_frame(&mut self, registry: &Registry) {
        let snapshot = registry.snapshot();
        self.changed.clear();
        self.forced = false;
        match &self.current {
            Some(previous) => {
                self.first_frame = false;
                self.changed.extend(snapshot.diff(previous));
            }
            None => {
                self.first_frame = true;
                self.changed.extend(snapshot.iter().map(|(name, _)| name));
            }
        }
        self.current = Some(snapshot);
        self.frame += 1;
    }

    /// Folds writes made since [`InvalidationTracker::begin_frame`] into this
    /// frame's changed set.
    pub fn amend(&mut self, registry: &Registry) {
        let snapshot = registry.snapshot();
        if let Some(current) = &self.current {
            self.changed.extend(snapshot.diff(current));
        }
        self.current = Some(snapshot);
    }

    pub fn changed(&self, name: &str) -> bool {
        self.changed.contains(name)
    }

    pub fn any_changed(&self, names: &[&str]) -> bool {
        names.iter().any(|n| self.changed(n))
    }

    pub fn changed_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.changed.iter().copied()
    }

    /// Whether lighting or scene inputs changed, or a restart was forced.
    pub fn baking_invalidated(&self) -> bool {
        self.first_frame || self.forced || self.any_changed(BAKE_INVALIDATORS)
    }

    /// Treats this frame as invalidated, e.g. after a scene reload.
    pub fn force_invalidate(&mut self) {
        self.forced = true;
    }

    pub fn is_first_frame(&self) -> bool {
        self.first_frame
    }

    /// Frames begun so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_frame_reports_everything() {
        let registry = Registry::with_defaults();
        let mut tracker = InvalidationTracker::new();
        tracker.begin_frame(&registry);
        assert!(tracker.is_first_frame());
        assert!(tracker.baking_invalidated());
        assert!(tracker.changed(NUM_BAKE_SAMPLES));
        assert_eq!(tracker.changed_names().count(), registry.len());
    }

    #[test]
    fn test_detects_changes_between_frames() {
        let mut registry = Registry::with_defaults();
        let mut tracker = InvalidationTracker::new();
        tracker.begin_frame(&registry);
        tracker.begin_frame(&registry);
        assert!(!tracker.is_first_frame());
        assert!(!tracker.baking_invalidated());
        assert_eq!(tracker.changed_names().count(), 0);

        registry.set_int(NUM_BAKE_SAMPLES, 3).unwrap();
        tracker.begin_frame(&registry);
        assert!(tracker.changed(NUM_BAKE_SAMPLES));
        assert!(tracker.any_changed(LIGHTMAP_PARAMS));
        assert!(!tracker.any_changed(PROBE_PARAMS));
        assert!(!tracker.baking_invalidated());

        registry.set_float(TURBIDITY, 5.0).unwrap();
        tracker.begin_frame(&registry);
        assert!(tracker.baking_invalidated());
        assert!(!tracker.changed(NUM_BAKE_SAMPLES));
    }

    #[test]
    fn test_amend_and_force() {
        let mut registry = Registry::with_defaults();
        let mut tracker = InvalidationTracker::new();
        tracker.begin_frame(&registry);
        tracker.begin_frame(&registry);
        registry.set_int(PROBE_RES_X, 2).unwrap();
        tracker.amend(&registry);
        assert!(tracker.changed(PROBE_RES_X));
        // the amended value is the baseline for the next frame
        tracker.begin_frame(&registry);
        assert!(!tracker.changed(PROBE_RES_X));

        tracker.force_invalidate();
        assert!(tracker.baking_invalidated());
        tracker.begin_frame(&registry);
        assert!(!tracker.baking_invalidated());
    }
}
