//! Parameter registry, typed settings, and persistence.

pub mod enums;
pub mod file;
pub mod json;
pub mod names;
pub mod param;
pub mod registry;

use thiserror::Error;

pub use enums::{
    BakeMode, JitterMode, LightUnits, ProbeMode, SampleMode, SceneKind, SettingEnum, SkyMode,
    SolveMode, SunDirectionType,
};
pub use file::{load_settings, read_settings, save_settings, write_settings, LoadReport};
pub use json::ConfigFile;
pub use param::{ParamKind, ParamSpec, ParamValue, Parameter};
pub use registry::{ParameterSnapshot, Registry, MAX_VOXEL_RESOLUTION, MIN_EV100};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("parameter '{name}' expects {expected}, got {got}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        got: &'static str,
    },

    #[error("corrupt settings file: {0}")]
    Corrupt(String),

    #[error("invalid config value for '{0}'")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SettingsResult<T> = Result<T, SettingsError>;
