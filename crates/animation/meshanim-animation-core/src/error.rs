//! Error types for animation mutations.
//!
//! Accessors report missing data with `Option`; mutators return [`AnimError`]
//! and leave the model untouched when they do.

use thiserror::Error;

use crate::animation::AnimationMode;
use crate::keyframe::Interp;
use crate::position::Position;

#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum AnimError {
    #[error("animation {anim} does not exist")]
    AnimationNotFound { anim: usize },

    #[error("frame {frame} is out of range for animation {anim} ({count} frames)")]
    InvalidFrame {
        anim: usize,
        frame: usize,
        count: usize,
    },

    #[error("no current animation")]
    NoCurrentAnimation,

    #[error("vertex {vertex} does not exist")]
    InvalidVertex { vertex: usize },

    #[error("{pos} does not exist")]
    InvalidPosition { pos: Position },

    #[error("{pos} cannot be animated by a {mode:?} animation")]
    UnsupportedPosition { pos: Position, mode: AnimationMode },

    #[error("animation modes differ: {a:?} vs {b:?}")]
    ModeMismatch { a: AnimationMode, b: AnimationMode },

    #[error("{0:?} is not a valid mode for this operation")]
    InvalidMode(AnimationMode),

    #[error("fps {fps} is outside the configured range")]
    InvalidFps { fps: f64 },

    #[error("{interp:?} cannot be stored here")]
    InvalidInterp { interp: Interp },

    #[error("invalid time value {time}")]
    InvalidTime { time: f64 },

    #[error("frame count change at {at} by {diff} does not fit animation {anim} ({count} frames)")]
    FrameCapacity {
        anim: usize,
        at: usize,
        diff: isize,
        count: usize,
    },

    #[error("cannot split animation {anim} at time {time}")]
    InvalidSplit { anim: usize, time: f64 },

    #[error("cannot move animation {from} to {to} across mode partitions")]
    InvalidMove { from: usize, to: usize },

    #[error("an animation cannot be combined with itself ({anim})")]
    SameAnimation { anim: usize },

    #[error("invalid model data: {reason}")]
    InvalidData { reason: String },

    #[error("parse error: {0}")]
    Parse(String),
}

impl AnimError {
    pub fn invalid_data(reason: impl Into<String>) -> Self {
        Self::InvalidData {
            reason: reason.into(),
        }
    }

    /// Contract errors are caller bugs (bad indices); everything else is a
    /// policy rejection a UI may want to explain to the user.
    #[inline]
    pub fn is_contract_error(&self) -> bool {
        matches!(
            self,
            Self::AnimationNotFound { .. }
                | Self::NoCurrentAnimation
                | Self::InvalidFrame { .. }
                | Self::InvalidVertex { .. }
                | Self::InvalidPosition { .. }
        )
    }

    /// Error category for logging.
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::AnimationNotFound { .. }
            | Self::NoCurrentAnimation
            | Self::InvalidFrame { .. }
            | Self::InvalidVertex { .. }
            | Self::InvalidPosition { .. } => "contract",
            Self::UnsupportedPosition { .. }
            | Self::ModeMismatch { .. }
            | Self::InvalidMode(_)
            | Self::InvalidInterp { .. }
            | Self::InvalidMove { .. }
            | Self::SameAnimation { .. } => "mode",
            Self::InvalidFps { .. }
            | Self::InvalidTime { .. }
            | Self::FrameCapacity { .. }
            | Self::InvalidSplit { .. } => "policy",
            Self::InvalidData { .. } | Self::Parse(_) => "data",
        }
    }
}

impl From<serde_json::Error> for AnimError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::PositionKind;

    #[test]
    fn categories() {
        assert_eq!(AnimError::AnimationNotFound { anim: 3 }.category(), "contract");
        assert_eq!(AnimError::InvalidFps { fps: 0.0 }.category(), "policy");
        let e = AnimError::UnsupportedPosition {
            pos: Position::new(PositionKind::Joint, 0),
            mode: AnimationMode::Frame,
        };
        assert_eq!(e.category(), "mode");
        assert!(!e.is_contract_error());
    }

    #[test]
    fn json_errors_convert() {
        let err: AnimError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, AnimError::Parse(_)));
    }
}
