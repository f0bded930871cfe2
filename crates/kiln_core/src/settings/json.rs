//! JSON configuration: a map of parameter name to value applied through the registry.
//!
//! Numbers map onto int/float parameters, booleans onto flags, strings onto
//! enum labels, and `[r, g, b]` arrays onto colors and directions.

use std::path::Path;

use kiln_math::Vec3;
use serde::Deserialize;

use super::param::{ParamKind, ParamValue};
use super::registry::Registry;
use super::{SettingsError, SettingsResult};

/// Top level of a `--config` file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

impl ConfigFile {
    pub fn from_path(path: impl AsRef<Path>) -> SettingsResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Applies every entry, returning the names that changed.
    pub fn apply(&self, registry: &mut Registry) -> SettingsResult<Vec<String>> {
        let mut changed = Vec::new();
        for (name, json) in &self.parameters {
            let value = json_to_value(registry.kind(name)?, name, json)?;
            if registry.set(name, value)? {
                changed.push(name.clone());
            }
        }
        registry.update_ui_state();
        Ok(changed)
    }
}

fn json_to_value(kind: &ParamKind, name: &str, json: &serde_json::Value) -> SettingsResult<ParamValue> {
    let invalid = || SettingsError::InvalidConfig(name.to_string());
    let vec3 = || -> SettingsResult<Vec3> {
        let arr = json.as_array().filter(|a| a.len() == 3).ok_or_else(invalid)?;
        let mut out = [0.0f32; 3];
        for (o, v) in out.iter_mut().zip(arr) {
            *o = v.as_f64().ok_or_else(invalid)? as f32;
        }
        Ok(Vec3::from(out))
    };
    let value = match kind {
        ParamKind::Bool => ParamValue::Bool(json.as_bool().ok_or_else(invalid)?),
        ParamKind::Int { .. } => ParamValue::Int(json.as_i64().ok_or_else(invalid)?.clamp(i32::MIN as i64, i32::MAX as i64) as i32),
        ParamKind::Float { .. } => ParamValue::Float(json.as_f64().ok_or_else(invalid)? as f32),
        ParamKind::Color { .. } => ParamValue::Color(vec3()?),
        ParamKind::Direction => ParamValue::Direction(vec3()?),
        ParamKind::Enum { labels } => match json {
            serde_json::Value::String(s) => {
                let index = labels
                    .iter()
                    .position(|l| l.eq_ignore_ascii_case(s))
                    .ok_or_else(invalid)?;
                ParamValue::Enum(index as u32)
            }
            other => ParamValue::Enum(other.as_u64().ok_or_else(invalid)? as u32),
        },
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::enums::BakeMode;
    use crate::settings::names::*;

    #[test]
    fn test_apply_config() {
        let config: ConfigFile = serde_json::from_str(
            r#"{ "parameters": {
                "BakeMode": "L2 SH",
                "NumBakeSamples": 4,
                "SunSize": 1,
                "SunTintColor": [1.0, 0.5, 0.25],
                "EnableAreaLight": true
            } }"#,
        )
        .unwrap();
        let mut reg = Registry::with_defaults();
        let changed = config.apply(&mut reg).unwrap();
        assert_eq!(changed.len(), 5);
        assert_eq!(reg.choice::<BakeMode>(BAKE_MODE).unwrap(), BakeMode::SHL2);
        assert_eq!(reg.int(NUM_BAKE_SAMPLES).unwrap(), 4);
        assert_eq!(reg.float(SUN_SIZE).unwrap(), 1.0);
    }

    #[test]
    fn test_bad_config_values() {
        let mut reg = Registry::with_defaults();
        let bad_label: ConfigFile =
            serde_json::from_str(r#"{ "parameters": { "BakeMode": "SG7" } }"#).unwrap();
        assert!(matches!(bad_label.apply(&mut reg), Err(SettingsError::InvalidConfig(_))));
        let unknown: ConfigFile =
            serde_json::from_str(r#"{ "parameters": { "Bogus": 1 } }"#).unwrap();
        assert!(matches!(unknown.apply(&mut reg), Err(SettingsError::UnknownParameter(_))));
    }
}
