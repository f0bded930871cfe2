//! Parameter names. Also the record names used in settings files.

pub const ENABLE_SUN: &str = "EnableSun";
pub const SUN_TINT_COLOR: &str = "SunTintColor";
pub const SUN_INTENSITY_SCALE: &str = "SunIntensityScale";
pub const SUN_SIZE: &str = "SunSize";
pub const NORMALIZE_SUN_INTENSITY: &str = "NormalizeSunIntensity";
pub const SUN_DIR_TYPE: &str = "SunDirType";
pub const SUN_DIRECTION: &str = "SunDirection";
pub const SUN_AZIMUTH: &str = "SunAzimuth";
pub const SUN_ELEVATION: &str = "SunElevation";

pub const SKY_MODE: &str = "SkyMode";
pub const SKY_COLOR: &str = "SkyColor";
pub const TURBIDITY: &str = "Turbidity";
pub const GROUND_ALBEDO: &str = "GroundAlbedo";

pub const ENABLE_AREA_LIGHT: &str = "EnableAreaLight";
pub const ENABLE_AREA_LIGHT_SHADOWS: &str = "EnableAreaLightShadows";
pub const AREA_LIGHT_COLOR: &str = "AreaLightColor";
pub const AREA_LIGHT_LUMINANCE: &str = "AreaLightLuminance";
pub const AREA_LIGHT_ILLUMINANCE: &str = "AreaLightIlluminance";
pub const AREA_LIGHT_LUMINOUS_POWER: &str = "AreaLightLuminousPower";
pub const AREA_LIGHT_EV100: &str = "AreaLightEV100";
pub const AREA_LIGHT_UNITS: &str = "AreaLightUnits";
pub const AREA_LIGHT_ILLUMINANCE_DISTANCE: &str = "AreaLightIlluminanceDistance";
pub const AREA_LIGHT_SIZE: &str = "AreaLightSize";
pub const AREA_LIGHT_X: &str = "AreaLightX";
pub const AREA_LIGHT_Y: &str = "AreaLightY";
pub const AREA_LIGHT_Z: &str = "AreaLightZ";
pub const AREA_LIGHT_SHADOW_BIAS: &str = "AreaLightShadowBias";
pub const BAKE_DIRECT_AREA_LIGHT: &str = "BakeDirectAreaLight";

pub const JITTER_MODE: &str = "JitterMode";
pub const JITTER_SCALE: &str = "JitterScale";

pub const LIGHT_MAP_RESOLUTION: &str = "LightMapResolution";
pub const NUM_BAKE_SAMPLES: &str = "NumBakeSamples";
pub const BAKE_SAMPLE_MODE: &str = "BakeSampleMode";
pub const MAX_BAKE_PATH_LENGTH: &str = "MaxBakePathLength";
pub const BAKE_RUSSIAN_ROULETTE_DEPTH: &str = "BakeRussianRouletteDepth";
pub const BAKE_RUSSIAN_ROULETTE_PROBABILITY: &str = "BakeRussianRouletteProbability";
pub const BAKE_MODE: &str = "BakeMode";
pub const SOLVE_MODE: &str = "SolveMode";

pub const PROBE_MODE: &str = "ProbeMode";
pub const PROBE_RES_X: &str = "ProbeResX";
pub const PROBE_RES_Y: &str = "ProbeResY";
pub const PROBE_RES_Z: &str = "ProbeResZ";
pub const PROBE_CUBEMAP_CAPTURE_RES: &str = "ProbeCubemapCaptureRes";
pub const PROBE_IRRADIANCE_CUBEMAP_RES: &str = "ProbeIrradianceCubemapRes";
pub const PROBE_DISTANCE_CUBEMAP_RES: &str = "ProbeDistanceCubemapRes";
pub const SCENE_BOUNDS_SCALE: &str = "SceneBoundsScale";
pub const SCENE_BOUNDS_OFFSET_X: &str = "SceneBoundsOffsetX";
pub const SCENE_BOUNDS_OFFSET_Y: &str = "SceneBoundsOffsetY";
pub const SCENE_BOUNDS_OFFSET_Z: &str = "SceneBoundsOffsetZ";
pub const DISTANCE_FILTER_SHARPNESS: &str = "DistanceFilterSharpness";
pub const PROBE_INTEGRATION_SAMPLES: &str = "ProbeIntegrationSamples";
pub const PROBE_DISTANCE_INTEGRATION_SAMPLES: &str = "ProbeDistanceIntegrationSamples";
pub const ALWAYS_REGENERATE_PROBES: &str = "AlwaysRegenerateProbes";

pub const VOXEL_RES_X: &str = "VoxelResX";
pub const VOXEL_RES_Y: &str = "VoxelResY";
pub const VOXEL_RES_Z: &str = "VoxelResZ";
pub const ALWAYS_REVOXELIZE: &str = "AlwaysRevoxelize";

pub const CURRENT_SCENE: &str = "CurrentScene";
pub const ENABLE_DIRECT_LIGHTING: &str = "EnableDirectLighting";
pub const ENABLE_INDIRECT_LIGHTING: &str = "EnableIndirectLighting";
pub const DIFFUSE_ALBEDO_SCALE: &str = "DiffuseAlbedoScale";

pub const SHOW_GROUND_TRUTH: &str = "ShowGroundTruth";
pub const NUM_RENDER_SAMPLES: &str = "NumRenderSamples";
pub const RENDER_SAMPLE_MODE: &str = "RenderSampleMode";
pub const MAX_RENDER_PATH_LENGTH: &str = "MaxRenderPathLength";
pub const RENDER_RUSSIAN_ROULETTE_DEPTH: &str = "RenderRussianRouletteDepth";
pub const RENDER_RUSSIAN_ROULETTE_PROBABILITY: &str = "RenderRussianRouletteProbability";

/// Settings written by "save light settings".
pub const LIGHT_SETTINGS: &[&str] = &[
    ENABLE_SUN,
    SUN_TINT_COLOR,
    SUN_INTENSITY_SCALE,
    SUN_SIZE,
    NORMALIZE_SUN_INTENSITY,
    SUN_DIR_TYPE,
    SUN_DIRECTION,
    SUN_AZIMUTH,
    SUN_ELEVATION,
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
    AREA_LIGHT_ILLUMINANCE_DISTANCE,
    AREA_LIGHT_SIZE,
    AREA_LIGHT_X,
    AREA_LIGHT_Y,
    AREA_LIGHT_Z,
    AREA_LIGHT_SHADOW_BIAS,
    BAKE_DIRECT_AREA_LIGHT,
    AREA_LIGHT_UNITS,
];
