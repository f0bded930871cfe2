//! Kiln core: scene model, parameter registry, and file formats.
//!
//! - **Scenes**: `Mesh`, `Material`, `Scene` with built-in procedural scenes and OBJ import
//! - **Settings**: the typed parameter `Registry`, `.lts` light settings files, JSON config
//! - **Export**: float image buffers and EXR screenshot export
//!
//! # Example
//!
//! ```ignore
//! use kiln_core::settings::{names, Registry, BakeMode};
//!
//! let mut registry = Registry::with_defaults();
//! registry.set_choice(names::BAKE_MODE, BakeMode::SHL2)?;
//! kiln_core::settings::save_settings(&registry, names::LIGHT_SETTINGS, "lights.lts")?;
//! ```

pub mod export;
pub mod mesh;
pub mod scene;
pub mod settings;

pub use export::{ExportError, ExportResult, FloatImage, FP16_MAX, FP16_SCALE};
pub use mesh::{Mesh, MeshTriangle};
pub use scene::{CameraPose, Material, Scene, SceneError, SceneObject, SceneResult};
pub use settings::{ParamValue, ParameterSnapshot, Registry, SettingsError, SettingsResult};
