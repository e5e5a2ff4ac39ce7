//! Derived pose data and its cache.
//!
//! Interpolation queries never mutate the model. The one exception is the
//! explicit validate step ([`crate::Model::validate_anim`]), which recomputes
//! this cache when the current animation, frame or time changed or when an
//! edit marked it dirty.

use glam::DMat4;
use serde::Serialize;

use crate::data::Influence;
use crate::interp::Vec3;
use crate::math::{from_trs, inverse_affine, transform_point};
use crate::model::Model;
use crate::position::Position;
use crate::sampling::{interpolate_keys, Trs};

/// Evaluated pose of the whole model at one instant.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Pose {
    pub anim: Option<usize>,
    pub time: f64,
    /// Animated joint transforms relative to the parent.
    pub joint_local: Vec<DMat4>,
    /// Animated joint transforms in model space.
    pub joint_abs: Vec<DMat4>,
    /// Bind-to-animated transform per joint, used for skinning.
    pub skin: Vec<DMat4>,
    pub points: Vec<DMat4>,
    pub projections: Vec<DMat4>,
    pub vertices: Vec<Vec3>,
}

type PoseKey = Option<(usize, usize, f64)>;

#[derive(Debug)]
pub(crate) struct PoseCache {
    dirty: bool,
    key: Option<PoseKey>,
    pose: Pose,
}

impl Default for PoseCache {
    fn default() -> Self {
        Self {
            dirty: true,
            key: None,
            pose: Pose::default(),
        }
    }
}

impl PoseCache {
    #[inline]
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn needs_update(&self, key: PoseKey) -> bool {
        self.dirty || self.key != Some(key)
    }

    pub fn store(&mut self, key: PoseKey, pose: Pose) {
        self.key = Some(key);
        self.pose = pose;
        self.dirty = false;
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }
}

fn skin_point(coord: Vec3, influences: &[Influence], skin: &[DMat4]) -> Vec3 {
    let total: f64 = influences
        .iter()
        .filter(|w| w.joint < skin.len())
        .map(|w| w.weight)
        .sum();
    if total <= 0.0 {
        return coord;
    }
    let mut out = [0.0; 3];
    for w in influences.iter().filter(|w| w.joint < skin.len()) {
        let p = transform_point(&skin[w.joint], coord);
        for c in 0..3 {
            out[c] += p[c] * w.weight / total;
        }
    }
    out
}

/// Evaluate `anim` (or the bind pose for `None`) at `time`, using `frame`
/// as the lookup hint.
pub(crate) fn evaluate(model: &Model, anim: Option<usize>, frame: usize, time: f64) -> Pose {
    let a = anim.and_then(|i| model.animation(i));
    let skeletal = a.filter(|a| a.mode().has_skeletal());
    let framed = a.filter(|a| a.mode().has_frame());

    let joints = model.joints();
    let mut joint_local = Vec::with_capacity(joints.len());
    let mut joint_abs: Vec<DMat4> = Vec::with_capacity(joints.len());
    let mut bind_abs: Vec<DMat4> = Vec::with_capacity(joints.len());
    let mut skin = Vec::with_capacity(joints.len());
    for (j, joint) in joints.iter().enumerate() {
        let bind_local = from_trs(joint.trans, joint.rot, joint.scale);
        let keys = skeletal.and_then(|a| Some((a, a.keyframes.get(&Position::joint(j as u32))?)));
        let local = match keys {
            Some((a, list)) => {
                let trs = interpolate_keys(a, list, frame, time, &Trs::IDENTITY)
                    .or_base(&Trs::IDENTITY);
                bind_local * trs.matrix()
            }
            None => bind_local,
        };
        let parent = joint.parent.filter(|&p| p < j);
        let (abs, bind) = match parent {
            Some(p) => (joint_abs[p] * local, bind_abs[p] * bind_local),
            None => (local, bind_local),
        };
        skin.push(abs * inverse_affine(&bind));
        joint_local.push(local);
        joint_abs.push(abs);
        bind_abs.push(bind);
    }

    let keyed = |pos: Position, base: Trs| -> Trs {
        match framed.and_then(|a| Some((a, a.keyframes.get(&pos)?))) {
            Some((a, list)) => interpolate_keys(a, list, frame, time, &base).or_base(&base),
            None => base,
        }
    };

    let points = model
        .points()
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let base = Trs::new(p.trans, p.rot, p.scale);
            let m = keyed(Position::point(i as u32), base).matrix();
            match p.joint.and_then(|j| skin.get(j)) {
                Some(s) if skeletal.is_some() => *s * m,
                _ => m,
            }
        })
        .collect();

    let projections = model
        .projections()
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let base = Trs::new(p.trans, p.rot, p.scale);
            keyed(Position::projection(i as u32), base).matrix()
        })
        .collect();

    let vertices = model
        .vertices()
        .iter()
        .enumerate()
        .map(|(v, vertex)| {
            let coord = match (framed, anim) {
                (Some(_), Some(i)) => model
                    .interpolate_vertex(i, frame, time, v)
                    .unwrap_or(vertex.coord),
                _ => vertex.coord,
            };
            if skeletal.is_some() {
                skin_point(coord, &vertex.influences, &skin)
            } else {
                coord
            }
        })
        .collect();

    Pose {
        anim: a.and(anim),
        time,
        joint_local,
        joint_abs,
        skin,
        points,
        projections,
        vertices,
    }
}

impl Model {
    /// Pose of `anim` at `time` without touching the cache.
    pub fn pose_at(&self, anim: usize, time: f64) -> Option<Pose> {
        let a = self.animation(anim)?;
        let frame = a.frame_at_time(time).unwrap_or(0);
        Some(evaluate(self, Some(anim), frame, time))
    }

    /// Bind pose.
    pub fn rest_pose(&self) -> Pose {
        evaluate(self, None, 0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_are_normalized() {
        let skin = [
            from_trs([2.0, 0.0, 0.0], [0.0; 3], [1.0; 3]),
            DMat4::IDENTITY,
        ];
        let influences = [
            Influence { joint: 0, weight: 1.0 },
            Influence { joint: 1, weight: 3.0 },
        ];
        let p = skin_point([1.0, 1.0, 1.0], &influences, &skin);
        assert!((p[0] - 1.5).abs() < 1e-12);
        assert_eq!(skin_point([1.0, 0.0, 0.0], &[], &skin), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn cache_tracks_dirty_and_key() {
        let mut cache = PoseCache::default();
        assert!(cache.needs_update(None));
        cache.store(None, Pose::default());
        assert!(!cache.needs_update(None));
        assert!(cache.needs_update(Some((0, 0, 0.0))));
        cache.invalidate();
        assert!(cache.needs_update(None));
    }
}
