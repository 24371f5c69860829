//! Tunable thresholds.

use serde::{Deserialize, Serialize};

/// Magnitudes below which geometry is considered degenerate and skipped.
///
/// These only decide what gets *dropped*; every decision about the geometry
/// that survives is exact.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// Minkowski decomposition quads with `|area|` at or below this are dropped,
    /// as are output loops of the Boolean service. The default only drops
    /// exactly flat pieces.
    pub negligible_area: f64,
    /// Mesh faces with `area * |normal . direction|` at or below this are
    /// considered edge-on and never seed a silhouette patch.
    pub negligible_facing: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Tolerances {
            negligible_area: 0.0,
            negligible_facing: 1e-12,
        }
    }
}

impl Tolerances {
    pub fn is_negligible_area(&self, area: f64) -> bool {
        area.abs() <= self.negligible_area
    }

    pub fn is_negligible_facing(&self, weighted_facing: f64) -> bool {
        weighted_facing.abs() <= self.negligible_facing
    }
}
