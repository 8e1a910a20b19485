use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The five measurement dimensions a take-off can report.
///
/// Serialized with the short codes the classification backend stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitKind {
    #[serde(rename = "UT")]
    Count,
    #[serde(rename = "ML")]
    Length,
    #[serde(rename = "M2")]
    Area,
    #[serde(rename = "M3")]
    Volume,
    #[serde(rename = "KG")]
    Mass,
}

impl UnitKind {
    pub const ALL: [UnitKind; 5] = [
        UnitKind::Count,
        UnitKind::Length,
        UnitKind::Area,
        UnitKind::Volume,
        UnitKind::Mass,
    ];

    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            UnitKind::Count => "UT",
            UnitKind::Length => "ML",
            UnitKind::Area => "M2",
            UnitKind::Volume => "M3",
            UnitKind::Mass => "KG",
        }
    }

    /// Unit symbol for display next to a quantity.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            UnitKind::Count => "u",
            UnitKind::Length => "m",
            UnitKind::Area => "m²",
            UnitKind::Volume => "m³",
            UnitKind::Mass => "kg",
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownUnit(pub String);

impl fmt::Display for UnknownUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown unit '{}' (expected UT, ML, M2, M3 or KG)", self.0)
    }
}

impl std::error::Error for UnknownUnit {}

impl FromStr for UnitKind {
    type Err = UnknownUnit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UT" | "U" | "COUNT" => Ok(UnitKind::Count),
            "ML" | "M" | "LENGTH" => Ok(UnitKind::Length),
            "M2" | "AREA" => Ok(UnitKind::Area),
            "M3" | "VOLUME" => Ok(UnitKind::Volume),
            "KG" | "MASS" => Ok(UnitKind::Mass),
            _ => Err(UnknownUnit(s.to_string())),
        }
    }
}
