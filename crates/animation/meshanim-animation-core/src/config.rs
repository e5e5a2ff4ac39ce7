//! Core configuration for meshanim-animation-core.

use meshanim_undo_core::UndoConfig;
use serde::{Deserialize, Serialize};

/// Engine limits and defaults. Keep additions backwards compatible with
/// serialized configs by giving every field a default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Exclusive lower bound for an animation's frames per second.
    pub min_fps: f64,
    /// Inclusive upper bound for an animation's frames per second.
    pub max_fps: f64,
    /// Frames per second given to newly added animations.
    pub default_fps: f64,
    /// Timetable entries closer than this are treated as the same instant
    /// when joining or merging, and resampled values closer than this are
    /// treated as unchanged.
    pub time_epsilon: f64,
    /// History limits.
    pub undo: UndoConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_fps: 0.01,
            max_fps: 1000.0,
            default_fps: 30.0,
            time_epsilon: 1e-6,
            undo: UndoConfig::default(),
        }
    }
}

impl Config {
    #[inline]
    pub fn fps_in_range(&self, fps: f64) -> bool {
        fps.is_finite() && fps > self.min_fps && fps <= self.max_fps
    }
}
