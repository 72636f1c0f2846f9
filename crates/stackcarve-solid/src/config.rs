//! Build configuration: tessellation resolutions and numerical margins.

use serde::{Deserialize, Serialize};

/// Tunable resolutions and margins for one build.
///
/// Defaults match the fidelity the interactive preview uses; export
/// paths may raise the segment counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Segments used to approximate a full circle.
    pub circle_segments: usize,
    /// Segments per 90° corner arc of a rounded rectangle.
    pub corner_segments: usize,
    /// Segments per semicircular capsule end cap.
    pub cap_segments: usize,
    /// Extra height added above and below a through-cut tool so the
    /// subtraction never leaves a coincident face.
    pub through_margin: f64,
    /// Lateral growth applied to restore plugs so their walls land
    /// inside the surrounding material instead of coinciding with the
    /// freshly cut opening.
    pub restore_epsilon: f64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            circle_segments: 64,
            corner_segments: 12,
            cap_segments: 16,
            through_margin: 1.0,
            restore_epsilon: 1e-4,
        }
    }
}
