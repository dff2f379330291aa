//! Operation descriptors.
//!
//! An [`Operation`] is built once by the host and consumed once by the
//! compiler. Geometry arrives already discretised to the integer grid; the
//! unit conversion that produced it is the host's responsibility.

use millcut_geometry::{FillRule, Paths};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    /// Clear the interior of the geometry.
    Pocket,
    /// Cut a band inward from the geometry outline.
    OutlineInside,
    /// Cut a band outward from the geometry outline.
    OutlineOutside,
    /// Follow the contour literally, ignoring the cutter diameter.
    Engrave,
    /// Plunge at each contour centroid.
    Perforate,
    /// Plunge at each contour centroid.
    Drill,
    /// Reserved; compilation refuses it.
    VCarve,
}

impl OpKind {
    /// Returns the display name of the kind.
    pub fn name(&self) -> &'static str {
        match self {
            OpKind::Pocket => "pocket",
            OpKind::OutlineInside => "outline-inside",
            OpKind::OutlineOutside => "outline-outside",
            OpKind::Engrave => "engrave",
            OpKind::Perforate => "perforate",
            OpKind::Drill => "drill",
            OpKind::VCarve => "v-carve",
        }
    }

    /// True when the emitter must take per-point plunge depths instead of
    /// pass layering.
    pub fn precalculated_z(&self) -> bool {
        matches!(self, OpKind::Perforate | OpKind::Drill)
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One user operation over one geometry soup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// Display name, echoed into the G-code header.
    pub name: String,
    pub kind: OpKind,
    /// Closed geometry in internal units.
    pub geometry: Paths,
    /// Fill interpretation of `geometry`.
    pub fill_rule: FillRule,
    /// End-mill diameter in internal units.
    pub cutter_diameter: i64,
    /// Fraction of the cutter diameter re-covered between adjacent passes,
    /// in [0, 1).
    pub overlap: f64,
    /// Reverses the natural contour direction.
    pub climb: bool,
    /// Total cut width for the outline kinds; clamped up to the cutter
    /// diameter.
    pub width: i64,
    /// Depth of cut below the material top, in G-code units.
    pub cut_depth: f64,
    /// Enter each pass along a ramp instead of a stationary plunge.
    pub ramp: bool,
}

impl Operation {
    /// Creates an operation with conventional-direction defaults: a
    /// 3.175 mm cutter, 40% overlap, plunge entries.
    pub fn new(name: impl Into<String>, kind: OpKind, geometry: Paths) -> Self {
        Self {
            name: name.into(),
            kind,
            geometry,
            fill_rule: FillRule::EvenOdd,
            cutter_diameter: 3_175_000,
            overlap: 0.4,
            climb: false,
            width: 0,
            cut_depth: 1.0,
            ramp: false,
        }
    }

    /// Step between adjacent passes in internal units, at least one grid
    /// unit.
    pub fn step_over(&self) -> i64 {
        ((self.cutter_diameter as f64 * (1.0 - self.overlap)).round() as i64).max(1)
    }

    pub fn direction_name(&self) -> &'static str {
        if self.climb {
            "climb"
        } else {
            "conventional"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use millcut_geometry::Point;

    #[test]
    fn test_kind_names() {
        assert_eq!(OpKind::Pocket.name(), "pocket");
        assert_eq!(OpKind::VCarve.to_string(), "v-carve");
        assert!(OpKind::Drill.precalculated_z());
        assert!(OpKind::Perforate.precalculated_z());
        assert!(!OpKind::Engrave.precalculated_z());
    }

    #[test]
    fn test_step_over() {
        let mut op = Operation::new("p", OpKind::Pocket, Vec::new());
        op.cutter_diameter = 3_000_000;
        op.overlap = 0.4;
        assert_eq!(op.step_over(), 1_800_000);
        op.overlap = 0.9999999;
        assert_eq!(op.step_over(), 1);
    }

    #[test]
    fn test_serde_round_trip() {
        let op = Operation::new(
            "face",
            OpKind::Pocket,
            vec![vec![
                Point::new(0, 0),
                Point::new(1_000_000, 0),
                Point::new(1_000_000, 1_000_000),
            ]],
        );
        let json = serde_json::to_string(&op).unwrap();
        let back: Operation = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "face");
        assert_eq!(back.kind, OpKind::Pocket);
        assert_eq!(back.geometry, op.geometry);
        assert_eq!(back.cutter_diameter, 3_175_000);
    }
}
