//! Per-frame orchestration of every baker.
//!
//! A [`BakeSession`] owns the scene, the lighting and all progressive bakers.
//! The host calls [`BakeSession::tick`] once per frame with the live parameter
//! registry; the session reconciles derived parameters, restarts whatever the
//! frame's changes invalidated and spends the frame budget on baking.

use crate::basis::BasisProjector;
use crate::geometry::SceneGeometry;
use crate::integrator::{LightingEnvironment, PathTracer};
use crate::invalidation::{InvalidationTracker, LIGHTMAP_PARAMS, PREVIEW_PARAMS, PROBE_PARAMS, VOXEL_PARAMS};
use crate::light::{AreaLightUnitsSync, LightModel};
use crate::lightmap::{BakeState, Lightmap, LightmapBaker, LightmapSettings};
use crate::preview::{PreviewRenderer, PreviewSettings, DEFAULT_PREVIEW_HEIGHT, DEFAULT_PREVIEW_WIDTH};
use crate::probes::{fit_probe_resolution, ProbeBaker, ProbeData, ProbeGrid, ProbeSettings};
use crate::sampling;
use crate::voxel::{VoxelGrid, VoxelSettings, Voxelizer};
use kiln_core::settings::names;
use kiln_core::settings::{JitterMode, ProbeMode, SceneKind};
use kiln_core::{ExportResult, FloatImage, Registry, Scene, SettingsResult};
use kiln_math::{UVec3, Vec2};

/// Something the host should know about beyond the per-frame status.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BakeEvent {
    /// The probe grid did not fit the texture array limit and was shrunk.
    /// The registry now holds `to`.
    ProbeGridResized { from: UVec3, to: UVec3 },
    /// Accumulated results were discarded.
    BakeRestarted { lightmap: bool, probes: bool },
    /// The voxel grid was rebuilt.
    Revoxelized { resolution: UVec3 },
}

/// Snapshot of the session after a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BakeStatus {
    pub frame: u64,
    pub lightmap_progress: f32,
    pub lightmap_state: BakeState,
    pub probe_progress: f32,
    /// `None` while the ground truth preview is hidden.
    pub preview_progress: Option<f32>,
    pub degenerate_samples: u64,
    pub revoxelized: bool,
    /// Sub-pixel offset in `[-scale, scale]^2` for the real-time renderer.
    pub taa_jitter: Vec2,
}

impl Default for BakeStatus {
    fn default() -> Self {
        Self {
            frame: 0,
            lightmap_progress: 0.0,
            lightmap_state: BakeState::Baking,
            probe_progress: 0.0,
            preview_progress: None,
            degenerate_samples: 0,
            revoxelized: false,
            taa_jitter: Vec2::ZERO,
        }
    }
}

/// Receives baked results. Every method defaults to ignoring its input.
pub trait BakeSink {
    fn lightmap(&mut self, _lightmap: &Lightmap, _projector: &dyn BasisProjector) {}
    fn probes(&mut self, _grid: &ProbeGrid, _data: &ProbeData) {}
    fn voxels(&mut self, _grid: &VoxelGrid) {}
    fn preview(&mut self, _image: &FloatImage) {}
    fn status(&mut self, _status: &BakeStatus) {}
}

pub struct BakeSession {
    scene: Scene,
    /// Set when the host supplied its own scene; `CurrentScene` is ignored.
    scene_overridden: bool,
    geometry: SceneGeometry,
    light_model: LightModel,
    units_sync: AreaLightUnitsSync,
    tracker: InvalidationTracker,
    lighting: LightingEnvironment,
    lightmap: LightmapBaker,
    probes: ProbeBaker,
    voxelizer: Voxelizer,
    preview: PreviewRenderer,
    preview_size: (u32, u32),
    show_preview: bool,
    events: Vec<BakeEvent>,
    status: BakeStatus,
}

impl BakeSession {
    /// Session baking `scene_override`, or the built-in scene the registry
    /// selects when `None`.
    pub fn new(registry: &Registry, scene_override: Option<Scene>) -> SettingsResult<Self> {
        Self::with_preview_size(registry, scene_override, DEFAULT_PREVIEW_WIDTH, DEFAULT_PREVIEW_HEIGHT)
    }

    pub fn with_preview_size(
        registry: &Registry,
        scene_override: Option<Scene>,
        width: u32,
        height: u32,
    ) -> SettingsResult<Self> {
        let scene_overridden = scene_override.is_some();
        let scene = match scene_override {
            Some(scene) => scene,
            None => Scene::builtin(registry.choice::<SceneKind>(names::CURRENT_SCENE)?),
        };
        let geometry = SceneGeometry::from_scene(&scene);
        log::info!("scene '{}': {} triangles", scene.name, geometry.triangle_count());

        let mut light_model = LightModel::new();
        let lighting = LightingEnvironment::from_registry(registry, &mut light_model)?;
        let lightmap = LightmapBaker::new(&scene, LightmapSettings::from_registry(registry)?);
        let probes = ProbeBaker::new(ProbeSettings::from_registry(registry)?, geometry.bounds());
        let preview = PreviewRenderer::new(PreviewSettings::from_registry(registry, width, height)?, &scene.camera);

        Ok(Self {
            scene,
            scene_overridden,
            geometry,
            light_model,
            units_sync: AreaLightUnitsSync::new(),
            tracker: InvalidationTracker::new(),
            lighting,
            lightmap,
            probes,
            voxelizer: Voxelizer::new(),
            preview,
            preview_size: (width, height),
            show_preview: false,
            events: Vec::new(),
            status: BakeStatus::default(),
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn lighting(&self) -> &LightingEnvironment {
        &self.lighting
    }

    pub fn lightmap(&self) -> &LightmapBaker {
        &self.lightmap
    }

    pub fn probes(&self) -> &ProbeBaker {
        &self.probes
    }

    pub fn voxels(&self) -> Option<&VoxelGrid> {
        self.voxelizer.grid()
    }

    pub fn preview(&self) -> &PreviewRenderer {
        &self.preview
    }

    pub fn status(&self) -> &BakeStatus {
        &self.status
    }

    /// Takes the events raised since the last call.
    pub fn drain_events(&mut self) -> Vec<BakeEvent> {
        std::mem::take(&mut self.events)
    }

    /// Runs one frame: syncs derived parameters, restarts invalidated bakes
    /// and advances every bake. `budget` caps the lightmap work items.
    pub fn tick(&mut self, registry: &mut Registry, budget: u64) -> SettingsResult<BakeStatus> {
        self.tracker.begin_frame(registry);
        let first_frame = self.tracker.is_first_frame();

        registry.sync_sun_direction(
            self.tracker.changed(names::SUN_DIRECTION),
            self.tracker.changed(names::SUN_AZIMUTH) || self.tracker.changed(names::SUN_ELEVATION),
        )?;
        self.units_sync.update(registry)?;
        registry.update_ui_state();

        let scene_changed = !first_frame && !self.scene_overridden && self.tracker.changed(names::CURRENT_SCENE);
        if scene_changed {
            self.load_builtin(registry)?;
        }

        self.fit_probe_grid(registry)?;
        self.tracker.amend(registry);

        self.lighting = LightingEnvironment::from_registry(registry, &mut self.light_model)?;
        let invalidated = self.tracker.baking_invalidated();

        let restart_lightmap = invalidated || self.tracker.any_changed(LIGHTMAP_PARAMS);
        if scene_changed {
            self.lightmap = LightmapBaker::new(&self.scene, LightmapSettings::from_registry(registry)?);
        } else if restart_lightmap {
            self.lightmap.reset(&self.scene, LightmapSettings::from_registry(registry)?);
        }

        let restart_probes = invalidated
            || self.tracker.any_changed(PROBE_PARAMS)
            || self.tracker.changed(names::ALWAYS_REGENERATE_PROBES);
        if restart_probes {
            self.probes.reset(ProbeSettings::from_registry(registry)?, self.geometry.bounds());
        }

        if !first_frame && (restart_lightmap || restart_probes) {
            self.events.push(BakeEvent::BakeRestarted {
                lightmap: restart_lightmap,
                probes: restart_probes,
            });
        }

        self.show_preview = registry.flag(names::SHOW_GROUND_TRUTH)?;
        if invalidated || self.tracker.any_changed(PREVIEW_PARAMS) {
            let (width, height) = self.preview_size;
            self.preview.reset(PreviewSettings::from_registry(registry, width, height)?, &self.scene.camera);
        }

        let voxel_settings = VoxelSettings::from_registry(registry)?;
        let tracer = PathTracer::new(&self.geometry, &self.lighting);

        let lightmap_progress = self.lightmap.advance(&tracer, budget);
        let probe_progress = self.probes.advance(&tracer);
        let revoxelized = self.voxelizer.revoxelize(
            &tracer,
            &voxel_settings,
            invalidated || self.tracker.any_changed(VOXEL_PARAMS),
        );
        if revoxelized {
            self.events.push(BakeEvent::Revoxelized {
                resolution: voxel_settings.resolution,
            });
        }
        let preview_progress = if self.show_preview {
            Some(self.preview.advance(&tracer))
        } else {
            None
        };

        let frame = self.tracker.frame();
        self.status = BakeStatus {
            frame,
            lightmap_progress,
            lightmap_state: self.lightmap.state(),
            probe_progress,
            preview_progress,
            degenerate_samples: self.lightmap.degenerate_samples(),
            revoxelized,
            taa_jitter: sampling::taa_jitter(
                registry.choice::<JitterMode>(names::JITTER_MODE)?,
                frame,
                registry.float(names::JITTER_SCALE)?,
            ),
        };
        Ok(self.status)
    }

    fn load_builtin(&mut self, registry: &mut Registry) -> SettingsResult<()> {
        let kind: SceneKind = registry.choice(names::CURRENT_SCENE)?;
        self.scene = Scene::builtin(kind);
        self.geometry = SceneGeometry::from_scene(&self.scene);
        registry.set_float(names::DIFFUSE_ALBEDO_SCALE, self.scene.default_albedo_scale)?;
        self.tracker.force_invalidate();
        log::info!("switched to scene '{}' ({} triangles)", self.scene.name, self.geometry.triangle_count());
        Ok(())
    }

    /// Shrinks the requested probe grid to the texture array limit and writes
    /// the fitted size back to the registry.
    fn fit_probe_grid(&mut self, registry: &mut Registry) -> SettingsResult<()> {
        let dim = |name| registry.int(name).map(|v| v.max(1) as u32);
        let requested = UVec3::new(
            dim(names::PROBE_RES_X)?,
            dim(names::PROBE_RES_Y)?,
            dim(names::PROBE_RES_Z)?,
        );
        let mode: ProbeMode = registry.choice(names::PROBE_MODE)?;
        let fitted = fit_probe_resolution(requested, mode);
        if fitted != requested {
            log::warn!(
                "probe grid {}x{}x{} exceeds the texture array limit, using {}x{}x{}",
                requested.x,
                requested.y,
                requested.z,
                fitted.x,
                fitted.y,
                fitted.z
            );
            registry.set_int(names::PROBE_RES_X, fitted.x as i32)?;
            registry.set_int(names::PROBE_RES_Y, fitted.y as i32)?;
            registry.set_int(names::PROBE_RES_Z, fitted.z as i32)?;
            self.events.push(BakeEvent::ProbeGridResized {
                from: requested,
                to: fitted,
            });
        }
        Ok(())
    }

    /// Hands the current results to `sink`.
    pub fn publish(&self, sink: &mut dyn BakeSink) -> ExportResult<()> {
        sink.status(&self.status);
        sink.lightmap(&self.lightmap.resolve(), self.lightmap.projector());
        sink.probes(self.probes.grid(), self.probes.data());
        if let Some(grid) = self.voxelizer.grid() {
            sink.voxels(grid);
        }
        if self.show_preview {
            sink.preview(&self.preview.image()?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::settings::SkyMode;

    /// Registry configured for a bake that finishes in a handful of ticks.
    fn small_registry() -> Registry {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut registry = Registry::with_defaults();
        registry.set_int(names::LIGHT_MAP_RESOLUTION, 64).unwrap();
        registry.set_int(names::NUM_BAKE_SAMPLES, 1).unwrap();
        registry.set_choice(names::PROBE_MODE, ProbeMode::L1SH).unwrap();
        registry.set_int(names::PROBE_RES_X, 2).unwrap();
        registry.set_int(names::PROBE_RES_Y, 2).unwrap();
        registry.set_int(names::PROBE_RES_Z, 2).unwrap();
        registry.set_int(names::PROBE_CUBEMAP_CAPTURE_RES, 4).unwrap();
        registry.set_int(names::VOXEL_RES_X, 4).unwrap();
        registry.set_int(names::VOXEL_RES_Y, 4).unwrap();
        registry.set_int(names::VOXEL_RES_Z, 4).unwrap();
        registry.set_int(names::MAX_BAKE_PATH_LENGTH, 2).unwrap();
        registry
    }

    #[derive(Default)]
    struct RecordingSink {
        lightmaps: usize,
        probe_count: u32,
        voxel_mips: usize,
        previews: usize,
        statuses: Vec<BakeStatus>,
    }

    impl BakeSink for RecordingSink {
        fn lightmap(&mut self, lightmap: &Lightmap, projector: &dyn BasisProjector) {
            assert_eq!(lightmap.basis_count, projector.basis_count());
            self.lightmaps += 1;
        }

        fn probes(&mut self, grid: &ProbeGrid, _data: &ProbeData) {
            self.probe_count = grid.count();
        }

        fn voxels(&mut self, grid: &VoxelGrid) {
            self.voxel_mips = grid.mips.len();
        }

        fn preview(&mut self, _image: &FloatImage) {
            self.previews += 1;
        }

        fn status(&mut self, status: &BakeStatus) {
            self.statuses.push(*status);
        }
    }

    #[test]
    fn test_first_tick_starts_everything() {
        let mut registry = small_registry();
        let mut session = BakeSession::new(&registry, None).unwrap();
        let status = session.tick(&mut registry, 1000).unwrap();

        assert_eq!(status.frame, 1);
        assert!(status.lightmap_progress > 0.0);
        assert_eq!(status.probe_progress, 1.0 / 8.0);
        assert!(status.revoxelized);
        assert_eq!(status.preview_progress, None);
        let events = session.drain_events();
        assert_eq!(
            events,
            vec![BakeEvent::Revoxelized {
                resolution: UVec3::splat(4)
            }]
        );
        assert!(session.drain_events().is_empty());
    }

    #[test]
    fn test_bake_runs_to_completion_without_restarts() {
        let mut registry = small_registry();
        let mut session = BakeSession::new(&registry, None).unwrap();
        let mut status = session.tick(&mut registry, u64::MAX).unwrap();
        for _ in 0..8 {
            status = session.tick(&mut registry, u64::MAX).unwrap();
        }
        assert_eq!(status.lightmap_progress, 1.0);
        assert_eq!(status.lightmap_state, BakeState::Idle);
        assert!(session.probes().is_complete());
        assert!(!status.revoxelized);
        assert!(!session
            .drain_events()
            .iter()
            .any(|e| matches!(e, BakeEvent::BakeRestarted { .. })));
    }

    #[test]
    fn test_lighting_change_restarts_bakes() {
        let mut registry = small_registry();
        let mut session = BakeSession::new(&registry, None).unwrap();
        session.tick(&mut registry, 500).unwrap();
        session.tick(&mut registry, 500).unwrap();
        session.drain_events();

        registry.set_choice(names::SKY_MODE, SkyMode::Simple).unwrap();
        let status = session.tick(&mut registry, 500).unwrap();
        assert_eq!(status.probe_progress, 1.0 / 8.0);
        assert!(status.revoxelized);
        let events = session.drain_events();
        assert!(events.contains(&BakeEvent::BakeRestarted {
            lightmap: true,
            probes: true
        }));

        // lightmap-only inputs leave the probes alone
        registry.set_int(names::NUM_BAKE_SAMPLES, 2).unwrap();
        let status = session.tick(&mut registry, 500).unwrap();
        assert_eq!(status.probe_progress, 2.0 / 8.0);
        assert!(!status.revoxelized);
        assert!(session.drain_events().contains(&BakeEvent::BakeRestarted {
            lightmap: true,
            probes: false
        }));
    }

    #[test]
    fn test_oversized_probe_grid_is_fitted() {
        let mut registry = small_registry();
        registry.set_choice(names::PROBE_MODE, ProbeMode::CubeMap).unwrap();
        registry.set_int(names::PROBE_RES_X, 20).unwrap();
        registry.set_int(names::PROBE_RES_Y, 8).unwrap();
        registry.set_int(names::PROBE_RES_Z, 8).unwrap();
        registry.set_int(names::PROBE_IRRADIANCE_CUBEMAP_RES, 2).unwrap();
        registry.set_int(names::PROBE_DISTANCE_CUBEMAP_RES, 2).unwrap();
        registry.set_int(names::PROBE_INTEGRATION_SAMPLES, 1).unwrap();
        registry.set_int(names::PROBE_DISTANCE_INTEGRATION_SAMPLES, 1).unwrap();
        let mut session = BakeSession::new(&registry, None).unwrap();
        session.tick(&mut registry, 1).unwrap();

        assert_eq!(registry.int(names::PROBE_RES_X).unwrap(), 6);
        assert_eq!(registry.int(names::PROBE_RES_Y).unwrap(), 7);
        assert_eq!(registry.int(names::PROBE_RES_Z).unwrap(), 7);
        assert_eq!(session.probes().grid().resolution, UVec3::new(6, 7, 7));
        assert!(session.drain_events().contains(&BakeEvent::ProbeGridResized {
            from: UVec3::new(20, 8, 8),
            to: UVec3::new(6, 7, 7),
        }));
    }

    #[test]
    fn test_maximum_probe_grid_fits_before_allocation() {
        let mut registry = small_registry();
        for name in [names::PROBE_RES_X, names::PROBE_RES_Y, names::PROBE_RES_Z] {
            registry.set_int(name, 2048).unwrap();
        }
        let mut session = BakeSession::new(&registry, None).unwrap();
        assert!(session.probes().grid().count() <= crate::probes::MAX_TEXTURE_ARRAY_LAYERS);

        session.tick(&mut registry, 1).unwrap();
        let fitted = session.probes().grid().resolution;
        assert_eq!(registry.int(names::PROBE_RES_X).unwrap(), fitted.x as i32);
        assert!(session.drain_events().contains(&BakeEvent::ProbeGridResized {
            from: UVec3::splat(2048),
            to: fitted,
        }));
    }

    #[test]
    fn test_bounds_change_revoxelizes() {
        let mut registry = small_registry();
        let mut session = BakeSession::new(&registry, None).unwrap();
        session.tick(&mut registry, 100).unwrap();
        let before = session.voxels().unwrap().bounds;
        session.drain_events();

        registry.set_float(names::SCENE_BOUNDS_SCALE, 2.0).unwrap();
        let status = session.tick(&mut registry, 100).unwrap();
        assert!(status.revoxelized);
        assert!(session.drain_events().contains(&BakeEvent::Revoxelized {
            resolution: UVec3::splat(4)
        }));
        let after = session.voxels().unwrap().bounds;
        assert_ne!(after, before);
        assert_eq!(after, session.probes().grid().bounds);
    }

    #[test]
    fn test_scene_switch_resets_albedo_scale() {
        let mut registry = small_registry();
        let mut session = BakeSession::new(&registry, None).unwrap();
        session.tick(&mut registry, 100).unwrap();

        registry.set_choice(names::CURRENT_SCENE, SceneKind::WhiteRoom).unwrap();
        let status = session.tick(&mut registry, 100).unwrap();
        let expected = Scene::builtin(SceneKind::WhiteRoom);
        assert_eq!(session.scene().name, expected.name);
        assert_eq!(
            registry.float(names::DIFFUSE_ALBEDO_SCALE).unwrap(),
            expected.default_albedo_scale
        );
        assert!(status.revoxelized);
    }

    #[test]
    fn test_overridden_scene_ignores_scene_choice() {
        let mut registry = small_registry();
        let mut session = BakeSession::new(&registry, Some(Scene::box_scene())).unwrap();
        session.tick(&mut registry, 100).unwrap();
        registry.set_choice(names::CURRENT_SCENE, SceneKind::WhiteRoom).unwrap();
        session.tick(&mut registry, 100).unwrap();
        assert_eq!(session.scene().name, Scene::box_scene().name);
    }

    #[test]
    fn test_preview_and_publish() {
        let mut registry = small_registry();
        registry.set_flag(names::SHOW_GROUND_TRUTH, true).unwrap();
        registry.set_int(names::NUM_RENDER_SAMPLES, 1).unwrap();
        registry.set_int(names::MAX_RENDER_PATH_LENGTH, 1).unwrap();
        let mut session = BakeSession::with_preview_size(&registry, None, 16, 8).unwrap();
        let status = session.tick(&mut registry, 100).unwrap();
        assert_eq!(status.preview_progress, Some(1.0));

        let mut sink = RecordingSink::default();
        session.publish(&mut sink).unwrap();
        assert_eq!(sink.lightmaps, 1);
        assert_eq!(sink.probe_count, 8);
        assert_eq!(sink.voxel_mips, 3);
        assert_eq!(sink.previews, 1);
        assert_eq!(sink.statuses, vec![status]);
    }
}
