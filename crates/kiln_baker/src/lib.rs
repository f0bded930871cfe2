//! Kiln baker: progressive CPU global illumination baking.
//!
//! A path tracer shared by every consumer, feeding:
//!
//! - **Lightmaps**: per-texel irradiance projected onto a directional basis
//!   (SH, H-basis, HL2, spherical Gaussians)
//! - **Probe volumes**: cubemap or basis-projected probes on a regular grid
//! - **Voxels**: a directly lit radiance/occupancy grid with mips
//! - **Ground truth preview**: a progressive path traced image
//!
//! [`BakeSession`] ties them together and restarts whatever a parameter
//! change invalidates.
//!
//! # Example
//!
//! ```ignore
//! use kiln_baker::BakeSession;
//! use kiln_core::Registry;
//!
//! let mut registry = Registry::with_defaults();
//! let mut session = BakeSession::new(&registry, None)?;
//! loop {
//!     let status = session.tick(&mut registry, 100_000)?;
//!     if status.lightmap_progress >= 1.0 {
//!         break;
//!     }
//! }
//! ```

pub mod basis;
pub mod bucket;
pub mod bvh;
pub mod camera;
pub mod geometry;
pub mod hittable;
pub mod integrator;
pub mod invalidation;
pub mod light;
pub mod lightmap;
pub mod material;
pub mod preview;
pub mod probes;
pub mod sampling;
pub mod session;
pub mod spectrum;
pub mod triangle;
pub mod voxel;

pub use basis::{projector, probe_projector, BasisProjector};
pub use camera::Camera;
pub use geometry::SceneGeometry;
pub use hittable::{HitRecord, Hittable};
pub use integrator::{LightingEnvironment, PathResult, PathSettings, PathTracer, SkyModel, Termination};
pub use invalidation::InvalidationTracker;
pub use light::{AreaLightUnitsSync, LightModel, SunParams};
pub use lightmap::{BakeState, Lightmap, LightmapBaker, LightmapSettings};
pub use material::Lambertian;
pub use preview::{format_progress, PreviewRenderer, PreviewSettings};
pub use probes::{ProbeBaker, ProbeData, ProbeGrid, ProbeSettings};
pub use session::{BakeEvent, BakeSession, BakeSink, BakeStatus};
pub use voxel::{Voxel, VoxelGrid, VoxelSettings, Voxelizer};
