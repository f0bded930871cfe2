//! The parameter registry: every tunable of the bake pipeline, with defaults.

use std::collections::HashMap;

use kiln_math::Vec3;

use super::enums::*;
use super::names::*;
use super::param::{ParamKind, ParamSpec, ParamValue, Parameter};
use super::{SettingsError, SettingsResult};

const FLOAT_MAX: f32 = f32::MAX;

/// Lower end of the area light EV100 range; stands in for zero luminance.
pub const MIN_EV100: f32 = -64.0;

/// Largest voxel grid dimension; 256^3 voxels is already a 16M voxel grid.
pub const MAX_VOXEL_RESOLUTION: i32 = 256;

/// Immutable copy of every parameter value at one point in time.
#[derive(Debug, Clone, Default)]
pub struct ParameterSnapshot {
    values: Vec<(&'static str, ParamValue)>,
}

impl ParameterSnapshot {
    pub fn get(&self, name: &str) -> Option<ParamValue> {
        self.values.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, ParamValue)> + '_ {
        self.values.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Names whose values differ bitwise, plus names present in only one snapshot.
    pub fn diff(&self, previous: &ParameterSnapshot) -> Vec<&'static str> {
        let mut changed: Vec<&'static str> = self
            .values
            .iter()
            .filter(|(name, value)| {
                previous
                    .get(name)
                    .map_or(true, |prev| !prev.bits_eq(value))
            })
            .map(|(name, _)| *name)
            .collect();
        for (name, _) in &previous.values {
            if self.get(name).is_none() {
                changed.push(name);
            }
        }
        changed
    }
}

/// Flat set of named, typed parameters.
#[derive(Debug, Clone)]
pub struct Registry {
    params: Vec<Parameter>,
    lookup: HashMap<&'static str, usize>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl Registry {
    pub fn from_specs(specs: Vec<ParamSpec>) -> Self {
        let mut lookup = HashMap::with_capacity(specs.len());
        let mut params = Vec::with_capacity(specs.len());
        for spec in specs {
            if lookup.contains_key(spec.name) {
                log::warn!("duplicate parameter '{}' ignored", spec.name);
                continue;
            }
            lookup.insert(spec.name, params.len());
            params.push(Parameter::new(spec));
        }
        let mut registry = Self { params, lookup };
        registry.update_ui_state();
        registry
    }

    /// Registry holding every pipeline parameter at its default.
    pub fn with_defaults() -> Self {
        Self::from_specs(default_specs())
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    pub fn param(&self, name: &str) -> Option<&Parameter> {
        self.lookup.get(name).map(|&i| &self.params[i])
    }

    fn param_mut(&mut self, name: &str) -> SettingsResult<&mut Parameter> {
        match self.lookup.get(name) {
            Some(&i) => Ok(&mut self.params[i]),
            None => Err(SettingsError::UnknownParameter(name.to_string())),
        }
    }

    pub fn get(&self, name: &str) -> SettingsResult<ParamValue> {
        self.param(name)
            .map(Parameter::value)
            .ok_or_else(|| SettingsError::UnknownParameter(name.to_string()))
    }

    /// Sets a value, clamped to the parameter's bounds. Returns whether it changed.
    pub fn set(&mut self, name: &str, value: ParamValue) -> SettingsResult<bool> {
        let param = self.param_mut(name)?;
        let expected = param.spec().type_name();
        param.set(value).ok_or(SettingsError::TypeMismatch {
            name: name.to_string(),
            expected,
            got: value.type_name(),
        })
    }

    pub fn reset_defaults(&mut self) {
        for p in &mut self.params {
            p.reset();
        }
        self.update_ui_state();
    }

    fn mismatch(&self, name: &str, value: ParamValue, expected: &'static str) -> SettingsError {
        SettingsError::TypeMismatch {
            name: name.to_string(),
            expected,
            got: value.type_name(),
        }
    }

    pub fn flag(&self, name: &str) -> SettingsResult<bool> {
        match self.get(name)? {
            ParamValue::Bool(b) => Ok(b),
            v => Err(self.mismatch(name, v, "bool")),
        }
    }

    pub fn int(&self, name: &str) -> SettingsResult<i32> {
        match self.get(name)? {
            ParamValue::Int(i) => Ok(i),
            v => Err(self.mismatch(name, v, "int")),
        }
    }

    pub fn float(&self, name: &str) -> SettingsResult<f32> {
        match self.get(name)? {
            ParamValue::Float(f) => Ok(f),
            v => Err(self.mismatch(name, v, "float")),
        }
    }

    pub fn color(&self, name: &str) -> SettingsResult<Vec3> {
        match self.get(name)? {
            ParamValue::Color(c) => Ok(c),
            v => Err(self.mismatch(name, v, "color")),
        }
    }

    pub fn direction(&self, name: &str) -> SettingsResult<Vec3> {
        match self.get(name)? {
            ParamValue::Direction(d) => Ok(d),
            v => Err(self.mismatch(name, v, "direction")),
        }
    }

    pub fn choice<T: SettingEnum>(&self, name: &str) -> SettingsResult<T> {
        match self.get(name)? {
            ParamValue::Enum(i) => T::from_index(i).ok_or_else(|| self.mismatch(name, ParamValue::Enum(i), "enum")),
            v => Err(self.mismatch(name, v, "enum")),
        }
    }

    pub fn set_flag(&mut self, name: &str, value: bool) -> SettingsResult<bool> {
        self.set(name, ParamValue::Bool(value))
    }

    pub fn set_int(&mut self, name: &str, value: i32) -> SettingsResult<bool> {
        self.set(name, ParamValue::Int(value))
    }

    pub fn set_float(&mut self, name: &str, value: f32) -> SettingsResult<bool> {
        self.set(name, ParamValue::Float(value))
    }

    pub fn set_choice<T: SettingEnum>(&mut self, name: &str, value: T) -> SettingsResult<bool> {
        self.set(name, ParamValue::Enum(value.index()))
    }

    pub fn snapshot(&self) -> ParameterSnapshot {
        ParameterSnapshot {
            values: self.params.iter().map(|p| (p.name(), p.value())).collect(),
        }
    }

    fn set_gates(&mut self, name: &str, editable: Option<bool>, visible: Option<bool>) {
        if let Ok(p) = self.param_mut(name) {
            if let Some(e) = editable {
                p.editable = e;
            }
            if let Some(v) = visible {
                p.visible = v;
            }
        }
    }

    /// Refreshes `editable`/`visible` flags from the current values.
    pub fn update_ui_state(&mut self) {
        let sky = self.choice::<SkyMode>(SKY_MODE).ok();
        let sg = self
            .choice::<BakeMode>(BAKE_MODE)
            .map(|m| m.sg_count() > 0)
            .unwrap_or(false);
        let dir_type = self.choice::<SunDirectionType>(SUN_DIR_TYPE).ok();
        let units = self.choice::<LightUnits>(AREA_LIGHT_UNITS).ok();

        self.set_gates(SKY_COLOR, Some(sky == Some(SkyMode::Simple)), None);
        self.set_gates(TURBIDITY, Some(sky == Some(SkyMode::Procedural)), None);
        self.set_gates(GROUND_ALBEDO, Some(sky == Some(SkyMode::Procedural)), None);
        self.set_gates(SOLVE_MODE, Some(sg), None);

        let unit_vector = dir_type == Some(SunDirectionType::UnitVector);
        self.set_gates(SUN_DIRECTION, None, Some(unit_vector));
        self.set_gates(SUN_AZIMUTH, None, Some(!unit_vector));
        self.set_gates(SUN_ELEVATION, None, Some(!unit_vector));

        self.set_gates(AREA_LIGHT_LUMINANCE, None, Some(units == Some(LightUnits::Luminance)));
        self.set_gates(AREA_LIGHT_ILLUMINANCE, None, Some(units == Some(LightUnits::Illuminance)));
        self.set_gates(AREA_LIGHT_ILLUMINANCE_DISTANCE, None, Some(units == Some(LightUnits::Illuminance)));
        self.set_gates(AREA_LIGHT_LUMINOUS_POWER, None, Some(units == Some(LightUnits::LuminousPower)));
        self.set_gates(AREA_LIGHT_EV100, None, Some(units == Some(LightUnits::EV100)));
    }

    /// Keeps the sun unit vector and azimuth/elevation pair consistent.
    ///
    /// Whichever representation is active is the source of truth. Returns
    /// whether the derived side was rewritten.
    pub fn sync_sun_direction(&mut self, direction_changed: bool, coords_changed: bool) -> SettingsResult<bool> {
        match self.choice::<SunDirectionType>(SUN_DIR_TYPE)? {
            SunDirectionType::UnitVector if direction_changed => {
                let (azimuth, elevation) = horizontal_from_direction(self.direction(SUN_DIRECTION)?);
                let a = self.set_float(SUN_AZIMUTH, azimuth)?;
                let e = self.set_float(SUN_ELEVATION, elevation)?;
                Ok(a || e)
            }
            SunDirectionType::HorizontalCoordSystem if coords_changed => {
                let dir = direction_from_horizontal(self.float(SUN_AZIMUTH)?, self.float(SUN_ELEVATION)?);
                self.set(SUN_DIRECTION, ParamValue::Direction(dir))
            }
            _ => Ok(false),
        }
    }

    /// Kind of a parameter, used when converting loosely typed input.
    pub fn kind(&self, name: &str) -> SettingsResult<&ParamKind> {
        self.param(name)
            .map(|p| &p.spec().kind)
            .ok_or_else(|| SettingsError::UnknownParameter(name.to_string()))
    }
}

/// Azimuth (degrees around +Y from +X towards +Z) and elevation (degrees above the horizon).
pub fn horizontal_from_direction(dir: Vec3) -> (f32, f32) {
    let d = dir.normalize_or_zero();
    let elevation = d.y.clamp(-1.0, 1.0).asin().to_degrees();
    let mut azimuth = d.z.atan2(d.x).to_degrees();
    if azimuth < 0.0 {
        azimuth += 360.0;
    }
    (azimuth, elevation)
}

pub fn direction_from_horizontal(azimuth_deg: f32, elevation_deg: f32) -> Vec3 {
    let (a, e) = (azimuth_deg.to_radians(), elevation_deg.to_radians());
    Vec3::new(e.cos() * a.cos(), e.sin(), e.cos() * a.sin())
}

fn default_specs() -> Vec<ParamSpec> {
    use ParamSpec as P;
    vec![
        // Sun light
        P::bool(ENABLE_SUN, "Sun Light", "Enable Sun", true),
        P::color(SUN_TINT_COLOR, "Sun Light", "Sun Tint Color", Vec3::ONE, 0.0, FLOAT_MAX),
        P::float(SUN_INTENSITY_SCALE, "Sun Light", "Sun Intensity Scale", 1.0, 0.0, FLOAT_MAX, 0.01),
        P::float(SUN_SIZE, "Sun Light", "Sun Size", 0.27, 0.01, 90.0, 0.001),
        P::bool(NORMALIZE_SUN_INTENSITY, "Sun Light", "Normalize Sun Intensity", false),
        P::choice(SUN_DIR_TYPE, "Sun Light", "Sun Dir Type", SunDirectionType::UnitVector),
        P::direction(SUN_DIRECTION, "Sun Light", "Sun Direction", Vec3::new(-0.75, 0.977, -0.4)),
        P::float(SUN_AZIMUTH, "Sun Light", "Sun Azimuth", 0.0, 0.0, 360.0, 0.1),
        P::float(SUN_ELEVATION, "Sun Light", "Sun Elevation", 0.0, 0.0, 90.0, 0.1),
        // Sky
        P::choice(SKY_MODE, "Sky", "Sky Mode", SkyMode::Procedural),
        P::color(SKY_COLOR, "Sky", "Sky Color", Vec3::new(1400.0, 3500.0, 7000.0), 0.0, 1_000_000.0),
        P::float(TURBIDITY, "Sky", "Turbidity", 2.0, 1.0, 10.0, 0.01),
        P::color(GROUND_ALBEDO, "Sky", "Ground Albedo", Vec3::splat(0.5), 0.0, 1.0),
        // Area light
        P::bool(ENABLE_AREA_LIGHT, "Area Light", "Enable Area Light", false),
        P::bool(ENABLE_AREA_LIGHT_SHADOWS, "Area Light", "Enable Area Light Shadows", true),
        P::color(AREA_LIGHT_COLOR, "Area Light", "Color", Vec3::ONE, 0.0, 1.0),
        P::float(AREA_LIGHT_LUMINANCE, "Area Light", "Color Intensity (nits)", 1_000_000.0, 0.0, FLOAT_MAX, 0.1),
        P::float(AREA_LIGHT_ILLUMINANCE, "Area Light", "Color Intensity (lux)", 1.0, 0.0, FLOAT_MAX, 0.01),
        P::float(AREA_LIGHT_LUMINOUS_POWER, "Area Light", "Color Intensity (lm)", 1.0, 0.0, FLOAT_MAX, 0.01),
        P::float(AREA_LIGHT_EV100, "Area Light", "Color Intensity (EV100)", 0.0, MIN_EV100, 64.0, 0.01),
        P::choice(AREA_LIGHT_UNITS, "Area Light", "Units", LightUnits::Luminance),
        P::float(AREA_LIGHT_ILLUMINANCE_DISTANCE, "Area Light", "Illuminance Distance", 10.0, 0.01, FLOAT_MAX, 0.01),
        P::float(AREA_LIGHT_SIZE, "Area Light", "Size", 0.5, 0.01, 10.0, 0.01),
        P::float(AREA_LIGHT_X, "Area Light", "Position X", 0.0, -100.0, 100.0, 0.01),
        P::float(AREA_LIGHT_Y, "Area Light", "Position Y", 5.0, -100.0, 100.0, 0.01),
        P::float(AREA_LIGHT_Z, "Area Light", "Position Z", 0.0, -100.0, 100.0, 0.01),
        P::float(AREA_LIGHT_SHADOW_BIAS, "Area Light", "Shadow Bias", 0.001, 0.0, 1.0, 0.001),
        P::bool(BAKE_DIRECT_AREA_LIGHT, "Area Light", "Bake Direct Area Light", false),
        // Anti aliasing
        P::choice(JITTER_MODE, "Anti Aliasing", "Jitter Mode", JitterMode::Hammersley4x),
        P::float(JITTER_SCALE, "Anti Aliasing", "Jitter Scale", 1.0, 0.0, FLOAT_MAX, 0.01),
        // Baking
        P::int(LIGHT_MAP_RESOLUTION, "Baking", "Light Map Resolution", 256, 64, 4096),
        P::int(NUM_BAKE_SAMPLES, "Baking", "Sqrt Num Samples", 25, 1, 100),
        P::choice(BAKE_SAMPLE_MODE, "Baking", "Sample Mode", SampleMode::Cmj),
        P::int(MAX_BAKE_PATH_LENGTH, "Baking", "Max Bake Path Length", -1, -1, i32::MAX),
        P::int(BAKE_RUSSIAN_ROULETTE_DEPTH, "Baking", "Russian Roulette Depth", 4, -1, i32::MAX),
        P::float(BAKE_RUSSIAN_ROULETTE_PROBABILITY, "Baking", "Russian Roulette Probability", 0.5, 0.0, 1.0, 0.01),
        P::choice(BAKE_MODE, "Baking", "Bake Mode", BakeMode::H4),
        P::choice(SOLVE_MODE, "Baking", "Solve Mode", SolveMode::NNLS),
        // Probes
        P::choice(PROBE_MODE, "Probes", "Probe Mode", ProbeMode::CubeMap),
        P::int(PROBE_RES_X, "Probes", "Probe Res X", 4, 1, 2048),
        P::int(PROBE_RES_Y, "Probes", "Probe Res Y", 4, 1, 2048),
        P::int(PROBE_RES_Z, "Probes", "Probe Res Z", 4, 1, 2048),
        P::int(PROBE_CUBEMAP_CAPTURE_RES, "Probes", "Probe Cubemap Capture Res", 32, 1, 4096),
        P::int(PROBE_IRRADIANCE_CUBEMAP_RES, "Probes", "Probe Irradiance Cubemap Res", 8, 1, 4096),
        P::int(PROBE_DISTANCE_CUBEMAP_RES, "Probes", "Probe Distance Cubemap Res", 16, 1, 4096),
        P::float(SCENE_BOUNDS_SCALE, "Probes", "Scene Bounds Scale", 1.25, 0.01, FLOAT_MAX, 0.01),
        P::float(SCENE_BOUNDS_OFFSET_X, "Probes", "Scene Bounds Offset X", 0.0, -FLOAT_MAX, FLOAT_MAX, 0.01),
        P::float(SCENE_BOUNDS_OFFSET_Y, "Probes", "Scene Bounds Offset Y", 0.0, -FLOAT_MAX, FLOAT_MAX, 0.01),
        P::float(SCENE_BOUNDS_OFFSET_Z, "Probes", "Scene Bounds Offset Z", 0.0, -FLOAT_MAX, FLOAT_MAX, 0.01),
        P::float(DISTANCE_FILTER_SHARPNESS, "Probes", "Distance Filter Sharpness", 10.0, 1.0, 20.0, 0.01),
        P::int(PROBE_INTEGRATION_SAMPLES, "Probes", "Probe Integration Samples", 32, 1, 64),
        P::int(PROBE_DISTANCE_INTEGRATION_SAMPLES, "Probes", "Probe Distance Integration Samples", 32, 1, 64),
        P::bool(ALWAYS_REGENERATE_PROBES, "Probes", "Always Regenerate Probes", false),
        // Voxels
        P::int(VOXEL_RES_X, "VCT", "Voxel Resolution (X)", 32, 1, MAX_VOXEL_RESOLUTION),
        P::int(VOXEL_RES_Y, "VCT", "Voxel Resolution (Y)", 32, 1, MAX_VOXEL_RESOLUTION),
        P::int(VOXEL_RES_Z, "VCT", "Voxel Resolution (Z)", 32, 1, MAX_VOXEL_RESOLUTION),
        P::bool(ALWAYS_REVOXELIZE, "VCT", "Always Revoxelize", false),
        // Scene
        P::choice(CURRENT_SCENE, "Scene", "Current Scene", SceneKind::Box),
        P::bool(ENABLE_DIRECT_LIGHTING, "Scene", "Enable Direct Lighting", true),
        P::bool(ENABLE_INDIRECT_LIGHTING, "Scene", "Enable Indirect Lighting", true),
        P::float(DIFFUSE_ALBEDO_SCALE, "Scene", "Diffuse Albedo Scale", 0.5, 0.0, FLOAT_MAX, 0.01),
        // Ground truth
        P::bool(SHOW_GROUND_TRUTH, "Ground Truth", "Show Ground Truth", false),
        P::int(NUM_RENDER_SAMPLES, "Ground Truth", "Sqrt Num Samples", 4, 1, 100),
        P::choice(RENDER_SAMPLE_MODE, "Ground Truth", "Sample Mode", SampleMode::Cmj),
        P::int(MAX_RENDER_PATH_LENGTH, "Ground Truth", "Max Path Length", -1, -1, i32::MAX),
        P::int(RENDER_RUSSIAN_ROULETTE_DEPTH, "Ground Truth", "Russian Roulette Depth", 4, -1, i32::MAX),
        P::float(RENDER_RUSSIAN_ROULETTE_PROBABILITY, "Ground Truth", "Russian Roulette Probability", 0.5, 0.0, 1.0, 0.01),
    ]
}
