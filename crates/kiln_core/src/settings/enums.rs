//! Enumerated settings. Each enum carries its own display labels.

/// Common interface of enum settings so the registry can store them as an index.
pub trait SettingEnum: Copy + Sized + 'static {
    fn labels() -> &'static [&'static str];
    fn index(self) -> u32;
    fn from_index(index: u32) -> Option<Self>;
}

macro_rules! setting_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl SettingEnum for $name {
            fn labels() -> &'static [&'static str] {
                &[$($label),+]
            }

            fn index(self) -> u32 {
                self as u32
            }

            fn from_index(index: u32) -> Option<Self> {
                Self::ALL.get(index as usize).copied()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

setting_enum! {
    /// How the sun direction is entered.
    pub enum SunDirectionType {
        UnitVector => "Unit Vector",
        HorizontalCoordSystem => "Horizontal Coordinate System (Azimuth/Elevation)",
    }
}

setting_enum! {
    pub enum SkyMode {
        None => "None",
        Procedural => "Procedural",
        Simple => "Simple",
    }
}

setting_enum! {
    /// Photometric unit the area light intensity is entered in.
    pub enum LightUnits {
        Luminance => "Luminance",
        Illuminance => "Illuminance",
        LuminousPower => "Luminous Power",
        EV100 => "EV100",
    }
}

setting_enum! {
    pub enum SampleMode {
        Random => "Random",
        Stratified => "Stratified",
        Hammersley => "Hammersley",
        UniformGrid => "Uniform Grid",
        Cmj => "CMJ",
    }
}

setting_enum! {
    /// Directional encoding stored in lightmap texels.
    pub enum BakeMode {
        Diffuse => "Diffuse",
        HL2 => "Half-Life 2",
        SHL1 => "L1 SH",
        SHL2 => "L2 SH",
        H4 => "L1 H-basis",
        H6 => "L2 H-basis",
        SG5 => "SG5",
        SG6 => "SG6",
        SG9 => "SG9",
        SG12 => "SG12",
    }
}

impl BakeMode {
    /// Number of spherical Gaussian lobes, 0 for non-SG modes.
    pub fn sg_count(self) -> usize {
        match self {
            BakeMode::SG5 => 5,
            BakeMode::SG6 => 6,
            BakeMode::SG9 => 9,
            BakeMode::SG12 => 12,
            _ => 0,
        }
    }
}

setting_enum! {
    /// How SG lobe amplitudes are fitted.
    pub enum SolveMode {
        Projection => "Ad-Hoc Projection",
        LeastSquares => "Least Squares",
        NNLS => "Non-Negative Least Squares",
    }
}

setting_enum! {
    pub enum ProbeMode {
        CubeMap => "CubeMap",
        AmbientCube => "Ambient Cube",
        L1SH => "L1 SH",
        L2SH => "L2 SH",
    }
}

impl ProbeMode {
    /// Coefficients per probe in volume modes, `None` in cubemap mode.
    pub fn basis_count(self) -> Option<usize> {
        match self {
            ProbeMode::CubeMap => None,
            ProbeMode::AmbientCube => Some(6),
            ProbeMode::L1SH => Some(4),
            ProbeMode::L2SH => Some(9),
        }
    }
}

setting_enum! {
    /// Built-in scenes.
    pub enum SceneKind {
        Box => "Box",
        WhiteRoom => "White Room",
    }
}

setting_enum! {
    /// Sub-pixel jitter sequence used for temporal accumulation.
    pub enum JitterMode {
        None => "None",
        Uniform2x => "Uniform 2x",
        Hammersley4x => "Hammersley 4x",
        Hammersley8x => "Hammersley 8x",
        Hammersley16x => "Hammersley 16x",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_roundtrip<T: SettingEnum + PartialEq + std::fmt::Debug>(all: &[T]) {
        assert_eq!(all.len(), T::labels().len());
        for (i, v) in all.iter().enumerate() {
            assert_eq!(v.index(), i as u32);
            assert_eq!(T::from_index(i as u32), Some(*v));
        }
        assert_eq!(T::from_index(all.len() as u32), None);
    }

    #[test]
    fn test_enum_index_roundtrip() {
        check_roundtrip(BakeMode::ALL);
        check_roundtrip(SolveMode::ALL);
        check_roundtrip(ProbeMode::ALL);
        check_roundtrip(SampleMode::ALL);
        check_roundtrip(LightUnits::ALL);
        check_roundtrip(JitterMode::ALL);
    }

    #[test]
    fn test_labels() {
        assert_eq!(BakeMode::H4.label(), "L1 H-basis");
        assert_eq!(SampleMode::Cmj.to_string(), "CMJ");
        assert_eq!(BakeMode::SG9.sg_count(), 9);
        assert_eq!(BakeMode::SHL2.sg_count(), 0);
        assert_eq!(ProbeMode::L2SH.basis_count(), Some(9));
        assert_eq!(ProbeMode::CubeMap.basis_count(), None);
    }
}
