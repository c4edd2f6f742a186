use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro-regions used by ecoinvent-style databases. Anything in this list is
/// treated as a continental-scale aggregate rather than a country code.
const MACRO_REGIONS: &[&str] = &[
    "RER",
    "RAS",
    "RNA",
    "RLA",
    "RME",
    "RAF",
    "OCE",
    "Europe without Switzerland",
    "Europe, without Russia and Turkey",
    "RoW excluding China",
];

/// A geography attached to a process node or a trade record.
///
/// The variants form an explicit specificity hierarchy so that template
/// selection ranks candidates with a total order instead of ad-hoc string
/// comparisons: country > sub-region > macro-region > RoW/GLO.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Geography {
    /// ISO-style country code, possibly with a sub-national suffix (CA-QC).
    Country(String),
    /// A grouping smaller than a continent (e.g. "UN-SEUROPE").
    SubRegion(String),
    /// Continental-scale aggregate (RER, RAS, ...).
    MacroRegion(String),
    RestOfWorld,
    Global,
}

impl Geography {
    pub fn country(code: &str) -> Self {
        Geography::Country(code.to_string())
    }

    /// Higher value = more specific geography.
    pub fn specificity(&self) -> u8 {
        match self {
            Geography::Country(_) => 4,
            Geography::SubRegion(_) => 3,
            Geography::MacroRegion(_) => 2,
            Geography::RestOfWorld => 1,
            Geography::Global => 0,
        }
    }

    /// The ISO country code this geography resolves to, if any.
    /// Sub-national codes (CA-QC) resolve to their parent country.
    pub fn country_code(&self) -> Option<&str> {
        match self {
            Geography::Country(code) => Some(code.split('-').next().unwrap_or(code)),
            _ => None,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Geography::Country(code) | Geography::SubRegion(code) | Geography::MacroRegion(code) => {
                code
            }
            Geography::RestOfWorld => "RoW",
            Geography::Global => "GLO",
        }
    }
}

impl From<String> for Geography {
    fn from(code: String) -> Self {
        if code == "RoW" {
            Geography::RestOfWorld
        } else if code == "GLO" {
            Geography::Global
        } else if MACRO_REGIONS.contains(&code.as_str()) {
            Geography::MacroRegion(code)
        } else if code.starts_with("UN-") {
            Geography::SubRegion(code)
        } else {
            Geography::Country(code)
        }
    }
}

impl From<Geography> for String {
    fn from(geo: Geography) -> Self {
        geo.code().to_string()
    }
}

impl fmt::Display for Geography {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_special_codes() {
        assert_eq!(Geography::from("RoW".to_string()), Geography::RestOfWorld);
        assert_eq!(Geography::from("GLO".to_string()), Geography::Global);
        assert_eq!(
            Geography::from("RER".to_string()),
            Geography::MacroRegion("RER".to_string())
        );
        assert_eq!(
            Geography::from("SE".to_string()),
            Geography::Country("SE".to_string())
        );
    }

    #[test]
    fn sub_national_codes_resolve_to_parent_country() {
        let geo = Geography::from("CA-QC".to_string());
        assert_eq!(geo.country_code(), Some("CA"));
    }

    #[test]
    fn specificity_orders_country_over_aggregates() {
        let country = Geography::country("SE");
        let region = Geography::MacroRegion("RER".to_string());
        assert!(country.specificity() > region.specificity());
        assert!(region.specificity() > Geography::RestOfWorld.specificity());
        assert!(Geography::RestOfWorld.specificity() > Geography::Global.specificity());
    }
}
