//! Typed references to animatable targets.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Declaration order is the map ordering used by the keyframe store.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PositionKind {
    Joint,
    Point,
    Vertex,
    Projection,
}

/// `{kind, index}` reference to a joint, point, vertex or UV projection.
/// Ordered by `(kind, index)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub kind: PositionKind,
    pub index: u32,
}

impl Position {
    #[inline]
    pub const fn new(kind: PositionKind, index: u32) -> Self {
        Self { kind, index }
    }

    #[inline]
    pub const fn joint(index: u32) -> Self {
        Self::new(PositionKind::Joint, index)
    }

    #[inline]
    pub const fn point(index: u32) -> Self {
        Self::new(PositionKind::Point, index)
    }

    #[inline]
    pub const fn vertex(index: u32) -> Self {
        Self::new(PositionKind::Vertex, index)
    }

    #[inline]
    pub const fn projection(index: u32) -> Self {
        Self::new(PositionKind::Projection, index)
    }

    #[inline]
    pub fn idx(self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {}", self.kind, self.index)
    }
}
