//! G-code unit selection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Units of the emitted program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GcodeUnits {
    /// Millimetres (G21).
    Mm,
    /// Inches (G20).
    Inch,
}

impl GcodeUnits {
    /// The modal directive line for this unit system.
    pub fn directive(&self) -> &'static str {
        match self {
            Self::Mm => "G21 ; Set units to millimeters",
            Self::Inch => "G20 ; Set units to inches",
        }
    }

    /// Default fractional digits for coordinates in this unit system.
    pub fn default_decimal(&self) -> usize {
        match self {
            Self::Mm => 2,
            Self::Inch => 3,
        }
    }

    /// G-code units per internal unit (10⁻⁶ mm).
    pub fn per_internal_unit(&self) -> f64 {
        match self {
            Self::Mm => 1.0e-6,
            Self::Inch => 1.0e-6 / 25.4,
        }
    }
}

impl Default for GcodeUnits {
    fn default() -> Self {
        Self::Mm
    }
}

impl fmt::Display for GcodeUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mm => write!(f, "mm"),
            Self::Inch => write!(f, "inch"),
        }
    }
}

impl FromStr for GcodeUnits {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mm" | "millimeter" | "millimeters" => Ok(Self::Mm),
            "inch" | "in" | "inches" => Ok(Self::Inch),
            _ => Err(format!("Unknown unit system: {}", s)),
        }
    }
}
