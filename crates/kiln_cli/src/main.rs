use anyhow::{bail, Context, Result};
use clap::Parser;
use kiln_baker::{
    format_progress, BakeEvent, BakeSession, BakeSink, BakeState, BakeStatus, BasisProjector, Lightmap, ProbeData,
    ProbeGrid, VoxelGrid,
};
use kiln_core::settings::{self, names, ConfigFile, SceneKind};
use kiln_core::{FloatImage, Registry, Scene};
use std::path::{Path, PathBuf};

/// Which scene to bake.
#[derive(Debug, Clone, PartialEq)]
enum SceneArg {
    Builtin(SceneKind),
    Obj(PathBuf),
}

fn parse_scene(value: &str) -> Result<SceneArg, String> {
    match value {
        "" => Err("scene must be 'box', 'white-room' or an OBJ path".to_string()),
        "box" => Ok(SceneArg::Builtin(SceneKind::Box)),
        "white-room" => Ok(SceneArg::Builtin(SceneKind::WhiteRoom)),
        path => Ok(SceneArg::Obj(PathBuf::from(path))),
    }
}

/// Headless progressive lightmap, probe and voxel baker.
#[derive(Debug, Parser)]
#[command(name = "kiln", version, about, long_about = None)]
struct Args {
    /// Binary light settings file (.lts) to start from
    #[arg(long)]
    settings: Option<PathBuf>,
    /// JSON map of parameter overrides, applied after --settings
    #[arg(long)]
    config: Option<PathBuf>,
    /// Maximum number of frames to run
    #[arg(long, default_value_t = 1000)]
    frames: u64,
    /// Lightmap work items per frame
    #[arg(long, default_value_t = 250_000)]
    budget: u64,
    /// Scene to bake: box, white-room or an OBJ file
    #[arg(long, value_parser = parse_scene)]
    scene: Option<SceneArg>,
    /// Output directory
    #[arg(long, default_value = "kiln_out")]
    out: PathBuf,
}

/// Writes results into the output directory.
struct FileSink {
    out: PathBuf,
    written: Vec<PathBuf>,
    errors: Vec<String>,
}

impl FileSink {
    fn new(out: &Path) -> Self {
        Self {
            out: out.to_path_buf(),
            written: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn save(&mut self, name: &str, image: kiln_core::ExportResult<FloatImage>, descale: bool) {
        let path = self.out.join(name);
        let result = image.and_then(|img| {
            if descale {
                img.export_screenshot(&path)
            } else {
                img.save(&path)
            }
        });
        match result {
            Ok(()) => self.written.push(path),
            Err(e) => self.errors.push(format!("{}: {}", path.display(), e)),
        }
    }
}

impl BakeSink for FileSink {
    fn lightmap(&mut self, lightmap: &Lightmap, projector: &dyn BasisProjector) {
        self.save("lightmap.exr", lightmap.evaluate_image(projector), true);
        for plane in 0..lightmap.basis_count {
            self.save(&format!("lightmap_basis{}.exr", plane), lightmap.to_image(plane), false);
        }
    }

    fn probes(&mut self, grid: &ProbeGrid, data: &ProbeData) {
        let probes: Vec<serde_json::Value> = (0..grid.count())
            .map(|i| {
                let p = grid.position(i);
                let mut entry = serde_json::json!({ "index": i, "position": [p.x, p.y, p.z] });
                if let ProbeData::Volume { textures, .. } = data {
                    let coeffs: Vec<[f32; 3]> = textures.iter().map(|t| t[i as usize].to_array()).collect();
                    entry["coefficients"] = serde_json::json!(coeffs);
                }
                entry
            })
            .collect();
        let kind = match data {
            ProbeData::CubeMaps { .. } => "CubeMap".to_string(),
            ProbeData::Volume { mode, .. } => mode.label().to_string(),
        };
        let doc = serde_json::json!({
            "mode": kind,
            "resolution": grid.resolution.to_array(),
            "probes": probes,
        });
        let path = self.out.join("probes.json");
        let result = serde_json::to_string_pretty(&doc)
            .map_err(|e| e.to_string())
            .and_then(|text| std::fs::write(&path, text).map_err(|e| e.to_string()));
        match result {
            Ok(()) => self.written.push(path),
            Err(e) => self.errors.push(format!("{}: {}", path.display(), e)),
        }
    }

    fn voxels(&mut self, grid: &VoxelGrid) {
        log::info!(
            "voxel grid {:?}: {} occupied voxels, {} mips",
            grid.resolution.to_array(),
            grid.occupied_count(),
            grid.mips.len()
        );
    }

    fn preview(&mut self, image: &FloatImage) {
        self.save("preview.exr", Ok(image.clone()), true);
    }

    fn status(&mut self, status: &BakeStatus) {
        log::info!(
            "frame {}: {}, {}",
            status.frame,
            format_progress("Lightmap", status.lightmap_progress),
            format_progress("Probes", status.probe_progress)
        );
    }
}

fn log_events(session: &mut BakeSession) {
    for event in session.drain_events() {
        match event {
            BakeEvent::ProbeGridResized { from, to } => {
                log::warn!("probe grid resized from {:?} to {:?}", from.to_array(), to.to_array())
            }
            BakeEvent::BakeRestarted { lightmap, probes } => {
                log::info!("bake restarted (lightmap: {}, probes: {})", lightmap, probes)
            }
            BakeEvent::Revoxelized { resolution } => log::debug!("revoxelized at {:?}", resolution.to_array()),
        }
    }
}

fn run(args: Args) -> Result<()> {
    let mut registry = Registry::with_defaults();
    if let Some(path) = &args.settings {
        settings::load_settings(&mut registry, path)
            .with_context(|| format!("loading settings from {}", path.display()))?;
    }
    if let Some(path) = &args.config {
        let changed = ConfigFile::from_path(path)
            .and_then(|config| config.apply(&mut registry))
            .with_context(|| format!("applying config {}", path.display()))?;
        log::info!("config {} changed {} parameters", path.display(), changed.len());
    }

    let scene = match &args.scene {
        Some(SceneArg::Builtin(kind)) => {
            registry.set_choice(names::CURRENT_SCENE, *kind)?;
            None
        }
        Some(SceneArg::Obj(path)) => {
            Some(Scene::from_obj(path).with_context(|| format!("loading scene {}", path.display()))?)
        }
        None => None,
    };

    std::fs::create_dir_all(&args.out).with_context(|| format!("creating {}", args.out.display()))?;
    let mut session = BakeSession::new(&registry, scene)?;

    for _ in 0..args.frames {
        let status = session.tick(&mut registry, args.budget)?;
        log_events(&mut session);
        log::debug!(
            "frame {}: {} degenerate samples, jitter {:?}",
            status.frame,
            status.degenerate_samples,
            status.taa_jitter.to_array()
        );
        let preview_done = status.preview_progress.map_or(true, |p| p >= 1.0);
        if status.lightmap_state == BakeState::Idle && session.probes().is_complete() && preview_done {
            log::info!("bake converged after {} frames", status.frame);
            break;
        }
    }

    let mut sink = FileSink::new(&args.out);
    session.publish(&mut sink)?;
    let settings_path = args.out.join("light_settings.lts");
    settings::save_settings(&registry, names::LIGHT_SETTINGS, &settings_path)?;

    for path in &sink.written {
        log::info!("wrote {}", path.display());
    }
    if !sink.errors.is_empty() {
        bail!("failed to write outputs:\n{}", sink.errors.join("\n"));
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();
    log::info!("Starting Kiln bake into {}", args.out.display());

    run(args).inspect_err(|e| log::error!("{:#}", e))
}
