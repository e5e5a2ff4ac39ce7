//! External document records.
//!
//! A file-format layer builds a [`ModelData`] directly (or parses one with
//! [`parse_model_json`]) and installs it with [`crate::Model::from_data`];
//! no high-level operation is replayed and no history is created.

use serde::{Deserialize, Serialize};

use crate::animation::{Animation, Family};
use crate::error::AnimError;
use crate::frame_store::FrameAnimVertex;
use crate::interp::Vec3;
use crate::position::{Position, PositionKind};
use crate::Result;

fn unit_scale() -> Vec3 {
    [1.0, 1.0, 1.0]
}

/// Skeleton joint. Transform is local to the parent joint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    pub name: String,
    #[serde(default)]
    pub parent: Option<usize>,
    #[serde(default)]
    pub rot: Vec3,
    #[serde(default)]
    pub trans: Vec3,
    #[serde(default = "unit_scale")]
    pub scale: Vec3,
}

impl Joint {
    pub fn new(name: impl Into<String>, parent: Option<usize>, trans: Vec3) -> Self {
        Self {
            name: name.into(),
            parent,
            rot: [0.0; 3],
            trans,
            scale: unit_scale(),
        }
    }
}

/// Helper point. Transform is in model space; `joint` binds it to a joint
/// for skinning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub name: String,
    #[serde(default)]
    pub joint: Option<usize>,
    #[serde(default)]
    pub rot: Vec3,
    #[serde(default)]
    pub trans: Vec3,
    #[serde(default = "unit_scale")]
    pub scale: Vec3,
}

impl Point {
    pub fn new(name: impl Into<String>, joint: Option<usize>, trans: Vec3) -> Self {
        Self {
            name: name.into(),
            joint,
            rot: [0.0; 3],
            trans,
            scale: unit_scale(),
        }
    }
}

/// Texture projection placement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub name: String,
    #[serde(default)]
    pub rot: Vec3,
    #[serde(default)]
    pub trans: Vec3,
    #[serde(default = "unit_scale")]
    pub scale: Vec3,
}

impl Projection {
    pub fn new(name: impl Into<String>, trans: Vec3) -> Self {
        Self {
            name: name.into(),
            rot: [0.0; 3],
            trans,
            scale: unit_scale(),
        }
    }
}

/// Joint weight for skinning.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Influence {
    pub joint: usize,
    pub weight: f64,
}

/// Base mesh vertex.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub coord: Vec3,
    #[serde(default)]
    pub influences: Vec<Influence>,
}

impl Vertex {
    pub fn new(coord: Vec3) -> Self {
        Self {
            coord,
            influences: Vec::new(),
        }
    }

    pub fn bound(coord: Vec3, joint: usize) -> Self {
        Self {
            coord,
            influences: vec![Influence { joint, weight: 1.0 }],
        }
    }
}

/// Whole document as exchanged with the file-format layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelData {
    #[serde(default)]
    pub joints: Vec<Joint>,
    #[serde(default)]
    pub points: Vec<Point>,
    #[serde(default)]
    pub projections: Vec<Projection>,
    #[serde(default)]
    pub vertices: Vec<Vertex>,
    /// Partition ordered: Skeletal, then Frame, then Complex.
    #[serde(default)]
    pub animations: Vec<Animation>,
    /// Frame store, one array per vertex. May be empty when no animation has
    /// allocated samples.
    #[serde(default)]
    pub frames: Vec<Vec<FrameAnimVertex>>,
}

impl ModelData {
    pub fn position_exists(&self, pos: Position) -> bool {
        let n = match pos.kind {
            PositionKind::Joint => self.joints.len(),
            PositionKind::Point => self.points.len(),
            PositionKind::Vertex => self.vertices.len(),
            PositionKind::Projection => self.projections.len(),
        };
        pos.idx() < n
    }

    /// Structural checks performed before install.
    pub fn validate_basic(&self) -> Result<()> {
        let slots = self.frames.first().map_or(0, Vec::len);
        if !self.frames.is_empty() && self.frames.len() != self.vertices.len() {
            return Err(AnimError::invalid_data(format!(
                "frame store has {} vertex arrays for {} vertices",
                self.frames.len(),
                self.vertices.len()
            )));
        }
        if self.frames.iter().any(|v| v.len() != slots) {
            return Err(AnimError::invalid_data("frame store arrays differ in length"));
        }
        if self
            .frames
            .iter()
            .flatten()
            .any(|s| !s.interp.is_sample_mode())
        {
            return Err(AnimError::invalid_data("frame sample with a request-only interpolation"));
        }

        for (i, joint) in self.joints.iter().enumerate() {
            if matches!(joint.parent, Some(p) if p >= i) {
                return Err(AnimError::invalid_data(format!(
                    "joint {i} must come after its parent"
                )));
            }
        }
        for vertex in &self.vertices {
            if vertex.influences.iter().any(|w| w.joint >= self.joints.len()) {
                return Err(AnimError::invalid_data("vertex influence names a missing joint"));
            }
        }
        if self
            .points
            .iter()
            .any(|p| matches!(p.joint, Some(j) if j >= self.joints.len()))
        {
            return Err(AnimError::invalid_data("point bound to a missing joint"));
        }

        if self.animations.windows(2).any(|w| w[0].mode() > w[1].mode()) {
            return Err(AnimError::invalid_data("animations are not ordered by mode"));
        }

        let mut ranges = Vec::new();
        for (index, anim) in self.animations.iter().enumerate() {
            let bad =
                |reason: &str| AnimError::invalid_data(format!("animation {index}: {reason}"));
            if !(anim.fps.is_finite() && anim.fps > 0.0) {
                return Err(bad("fps must be positive"));
            }
            if !anim.duration.is_finite() || anim.duration < 0.0 {
                return Err(bad("duration must be finite and non-negative"));
            }
            if anim.timetable.iter().any(|t| !t.is_finite())
                || anim.timetable.windows(2).any(|w| w[0] > w[1])
            {
                return Err(bad("timetable must be finite and non-decreasing"));
            }
            if !anim.selected_frames.is_empty()
                && anim.selected_frames.len() != anim.frame_count()
            {
                return Err(bad("selection mask length differs from frame count"));
            }
            if let Some(frame0) = anim.frame0 {
                if !anim.mode().has_frame() {
                    return Err(bad("frame store range on an animation without frame data"));
                }
                let end = frame0 + anim.frame_count();
                if anim.frame_count() == 0 || end > slots {
                    return Err(bad("frame store range out of bounds"));
                }
                ranges.push((frame0, end));
            }
            for (pos, list) in &anim.keyframes {
                if !self.position_exists(*pos) {
                    return Err(bad(&format!("keyframes for missing {pos}")));
                }
                if pos.kind == PositionKind::Vertex || !anim.mode().supports(Family::of(*pos)) {
                    return Err(bad(&format!("{pos} cannot be keyframed")));
                }
                for key in list.iter() {
                    if key.frame_index() >= anim.frame_count() {
                        return Err(bad(&format!("keyframe at frame {} out of range", key.frame)));
                    }
                    if !key.interp.is_keyframe_mode() {
                        return Err(bad(&format!("keyframe with {:?} interpolation", key.interp)));
                    }
                }
            }
        }

        ranges.sort_unstable();
        if ranges.windows(2).any(|w| w[0].1 > w[1].0) {
            return Err(AnimError::invalid_data("frame store ranges overlap"));
        }
        Ok(())
    }
}

/// Parse and validate a JSON document.
pub fn parse_model_json(s: &str) -> Result<ModelData> {
    let data: ModelData = serde_json::from_str(s)?;
    data.validate_basic()?;
    Ok(data)
}
