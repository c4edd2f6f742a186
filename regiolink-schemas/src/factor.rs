use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The regionalized impact-assessment methods regiolink can bind
/// characterization factors from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImpactMethod {
    ImpactWorldPlus21,
    Ef31,
    Recipe2016,
}

impl ImpactMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImpactMethod::ImpactWorldPlus21 => "IW v2.1",
            ImpactMethod::Ef31 => "EF v3.1",
            ImpactMethod::Recipe2016 => "ReCiPe 2016 v1.03 (H)",
        }
    }

    /// Stem of the characterization-factor table file for this method.
    pub fn table_stem(&self) -> &'static str {
        match self {
            ImpactMethod::ImpactWorldPlus21 => "iw21",
            ImpactMethod::Ef31 => "ef31",
            ImpactMethod::Recipe2016 => "recipe2016",
        }
    }
}

impl fmt::Display for ImpactMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImpactMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IW v2.1" => Ok(ImpactMethod::ImpactWorldPlus21),
            "EF v3.1" => Ok(ImpactMethod::Ef31),
            "ReCiPe 2016 v1.03 (H)" => Ok(ImpactMethod::Recipe2016),
            other => Err(format!(
                "unknown impact method '{other}', available methods are \
                 'IW v2.1', 'EF v3.1' and 'ReCiPe 2016 v1.03 (H)'"
            )),
        }
    }
}

/// One row of a regionalized characterization-factor table.
/// Country "GLO" rows double as the global-average fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterizationFactor {
    pub flow: String,
    pub compartment: String,
    pub country: String,
    pub factor: f64,
}

/// An elementary flow eligible for spatialization, together with the
/// compartments in which spatialized variants exist. Mineral-resource
/// compartments, for instance, are never spatialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatializableFlow {
    pub flow: String,
    pub compartments: Vec<String>,
}
