//! Typed, bounded parameter values.

use kiln_math::Vec3;

use super::enums::SettingEnum;

/// Current value of a parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Color(Vec3),
    Direction(Vec3),
    Enum(u32),
}

impl ParamValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "bool",
            ParamValue::Int(_) => "int",
            ParamValue::Float(_) => "float",
            ParamValue::Color(_) => "color",
            ParamValue::Direction(_) => "direction",
            ParamValue::Enum(_) => "enum",
        }
    }

    /// Bit-exact comparison. Unlike `==`, a NaN equals itself and `-0.0 != 0.0`.
    pub fn bits_eq(&self, other: &ParamValue) -> bool {
        let v3 = |a: &Vec3, b: &Vec3| {
            a.x.to_bits() == b.x.to_bits()
                && a.y.to_bits() == b.y.to_bits()
                && a.z.to_bits() == b.z.to_bits()
        };
        match (self, other) {
            (ParamValue::Bool(a), ParamValue::Bool(b)) => a == b,
            (ParamValue::Int(a), ParamValue::Int(b)) => a == b,
            (ParamValue::Float(a), ParamValue::Float(b)) => a.to_bits() == b.to_bits(),
            (ParamValue::Color(a), ParamValue::Color(b)) => v3(a, b),
            (ParamValue::Direction(a), ParamValue::Direction(b)) => v3(a, b),
            (ParamValue::Enum(a), ParamValue::Enum(b)) => a == b,
            _ => false,
        }
    }
}

/// Type and bounds of a parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    Bool,
    Int { min: i32, max: i32 },
    Float { min: f32, max: f32, step: f32 },
    /// Per-component bounds.
    Color { min: f32, max: f32 },
    /// Always stored normalized.
    Direction,
    Enum { labels: &'static [&'static str] },
}

/// Static description of a parameter.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub group: &'static str,
    pub label: &'static str,
    pub kind: ParamKind,
    pub default: ParamValue,
}

impl ParamSpec {
    pub fn bool(name: &'static str, group: &'static str, label: &'static str, default: bool) -> Self {
        Self {
            name,
            group,
            label,
            kind: ParamKind::Bool,
            default: ParamValue::Bool(default),
        }
    }

    pub fn int(
        name: &'static str,
        group: &'static str,
        label: &'static str,
        default: i32,
        min: i32,
        max: i32,
    ) -> Self {
        Self {
            name,
            group,
            label,
            kind: ParamKind::Int { min, max },
            default: ParamValue::Int(default),
        }
    }

    pub fn float(
        name: &'static str,
        group: &'static str,
        label: &'static str,
        default: f32,
        min: f32,
        max: f32,
        step: f32,
    ) -> Self {
        Self {
            name,
            group,
            label,
            kind: ParamKind::Float { min, max, step },
            default: ParamValue::Float(default),
        }
    }

    pub fn color(
        name: &'static str,
        group: &'static str,
        label: &'static str,
        default: Vec3,
        min: f32,
        max: f32,
    ) -> Self {
        Self {
            name,
            group,
            label,
            kind: ParamKind::Color { min, max },
            default: ParamValue::Color(default),
        }
    }

    pub fn direction(name: &'static str, group: &'static str, label: &'static str, default: Vec3) -> Self {
        Self {
            name,
            group,
            label,
            kind: ParamKind::Direction,
            default: ParamValue::Direction(default.normalize_or_zero()),
        }
    }

    pub fn choice<T: SettingEnum>(
        name: &'static str,
        group: &'static str,
        label: &'static str,
        default: T,
    ) -> Self {
        Self {
            name,
            group,
            label,
            kind: ParamKind::Enum { labels: T::labels() },
            default: ParamValue::Enum(default.index()),
        }
    }

    /// Clamps a value into range. Returns `None` if its type doesn't match.
    ///
    /// Ints are accepted for float parameters and vice versa so loosely typed
    /// sources (JSON) can set either.
    pub fn sanitize(&self, value: ParamValue) -> Option<ParamValue> {
        let sane = match (&self.kind, value) {
            (ParamKind::Bool, ParamValue::Bool(b)) => ParamValue::Bool(b),
            (ParamKind::Int { min, max }, ParamValue::Int(v)) => ParamValue::Int(v.clamp(*min, *max)),
            (ParamKind::Int { min, max }, ParamValue::Float(v)) if v.is_finite() => {
                ParamValue::Int((v.round() as i32).clamp(*min, *max))
            }
            (ParamKind::Float { min, max, .. }, ParamValue::Float(v)) if !v.is_nan() => {
                ParamValue::Float(v.clamp(*min, *max))
            }
            (ParamKind::Float { min, max, .. }, ParamValue::Int(v)) => {
                ParamValue::Float((v as f32).clamp(*min, *max))
            }
            (ParamKind::Color { min, max }, ParamValue::Color(c)) if !c.is_nan() => {
                ParamValue::Color(c.clamp(Vec3::splat(*min), Vec3::splat(*max)))
            }
            (ParamKind::Direction, ParamValue::Direction(d)) => {
                ParamValue::Direction(d.try_normalize()?)
            }
            (ParamKind::Enum { labels }, ParamValue::Enum(i)) => {
                ParamValue::Enum(i.min(labels.len().saturating_sub(1) as u32))
            }
            _ => return None,
        };
        Some(sane)
    }

    pub fn type_name(&self) -> &'static str {
        self.default.type_name()
    }

    /// Size of the value blob in a settings file.
    pub fn serialized_size(&self) -> usize {
        match self.kind {
            ParamKind::Bool | ParamKind::Int { .. } | ParamKind::Float { .. } | ParamKind::Enum { .. } => 4,
            ParamKind::Color { .. } | ParamKind::Direction => 12,
        }
    }

    /// Appends the little endian blob for `value`.
    pub fn encode(&self, value: &ParamValue, out: &mut Vec<u8>) {
        match *value {
            ParamValue::Bool(b) => out.extend_from_slice(&(b as u32).to_le_bytes()),
            ParamValue::Int(v) => out.extend_from_slice(&v.to_le_bytes()),
            ParamValue::Float(v) => out.extend_from_slice(&v.to_le_bytes()),
            ParamValue::Enum(v) => out.extend_from_slice(&v.to_le_bytes()),
            ParamValue::Color(v) | ParamValue::Direction(v) => {
                for c in v.to_array() {
                    out.extend_from_slice(&c.to_le_bytes());
                }
            }
        }
    }

    /// Parses a blob of exactly [`ParamSpec::serialized_size`] bytes.
    pub fn decode(&self, bytes: &[u8]) -> Option<ParamValue> {
        if bytes.len() != self.serialized_size() {
            return None;
        }
        let word = |i: usize| [bytes[i * 4], bytes[i * 4 + 1], bytes[i * 4 + 2], bytes[i * 4 + 3]];
        let vec3 = || {
            Vec3::new(
                f32::from_le_bytes(word(0)),
                f32::from_le_bytes(word(1)),
                f32::from_le_bytes(word(2)),
            )
        };
        let raw = match self.kind {
            ParamKind::Bool => ParamValue::Bool(u32::from_le_bytes(word(0)) != 0),
            ParamKind::Int { .. } => ParamValue::Int(i32::from_le_bytes(word(0))),
            ParamKind::Float { .. } => ParamValue::Float(f32::from_le_bytes(word(0))),
            ParamKind::Enum { .. } => ParamValue::Enum(u32::from_le_bytes(word(0))),
            ParamKind::Color { .. } => ParamValue::Color(vec3()),
            ParamKind::Direction => ParamValue::Direction(vec3()),
        };
        self.sanitize(raw)
    }
}

/// A live parameter: spec, current value, and UI gating flags.
#[derive(Debug, Clone)]
pub struct Parameter {
    spec: ParamSpec,
    value: ParamValue,
    pub editable: bool,
    pub visible: bool,
}

impl Parameter {
    pub fn new(spec: ParamSpec) -> Self {
        let value = spec.default;
        Self {
            spec,
            value,
            editable: true,
            visible: true,
        }
    }

    pub fn spec(&self) -> &ParamSpec {
        &self.spec
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    pub fn value(&self) -> ParamValue {
        self.value
    }

    /// Stores a sanitized value. Returns `None` on a type mismatch, otherwise
    /// whether the stored value changed.
    pub fn set(&mut self, value: ParamValue) -> Option<bool> {
        let sane = self.spec.sanitize(value)?;
        let changed = !sane.bits_eq(&self.value);
        self.value = sane;
        Some(changed)
    }

    pub fn reset(&mut self) {
        self.value = self.spec.default;
    }
}
