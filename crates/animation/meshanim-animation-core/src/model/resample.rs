//! Skeletal-to-frame resampling.

use glam::DMat4;

use crate::animation::{Animation, AnimationMode};
use crate::error::AnimError;
use crate::frame_store::FrameAnimVertex;
use crate::interp::Vec3;
use crate::keyframe::{Channel, Interp, Keyframe};
use crate::math::{self, from_trs};
use crate::pose::Pose;
use crate::position::Position;
use crate::Result;

use super::{reject, BlockSamples, FrameBlock, Model};

fn differs(a: Vec3, b: Vec3, eps: f64) -> bool {
    (0..3).any(|c| (a[c] - b[c]).abs() > eps)
}

/// Frames worth keeping from a dense run of samples: around every change the
/// value before and the value at the change. Without `wrap` frame 0 is
/// compared against `base`; with `wrap` it is compared against the last
/// frame, since playback blends the last entry back into the first. Constant
/// stretches produce no entries.
pub(crate) fn sparse_changes(
    values: &[Vec3],
    base: Vec3,
    eps: f64,
    wrap: bool,
) -> Vec<(usize, Vec3)> {
    let n = values.len();
    let mut keep = vec![false; n];
    for i in 0..n {
        let prev = match i.checked_sub(1) {
            Some(p) => Some(p),
            None if wrap => Some(n - 1),
            None => None,
        };
        let changed = match prev {
            Some(p) => differs(values[i], values[p], eps),
            None => differs(values[i], base, eps),
        };
        if changed {
            keep[i] = true;
            if let Some(p) = prev {
                keep[p] = true;
            }
        }
    }
    // A looping run held away from `base` still needs one entry.
    if wrap && n > 0 && !keep.contains(&true) && differs(values[0], base, eps) {
        keep[0] = true;
    }
    keep.iter()
        .enumerate()
        .filter(|&(_, &k)| k)
        .map(|(i, _)| (i, values[i]))
        .collect()
}

fn decompose(m: &DMat4, channel: Channel) -> Vec3 {
    let (trans, rot, scale) = math::decompose(m);
    match channel {
        Channel::Translate => trans,
        Channel::Rotate => rot,
        Channel::Scale => scale,
    }
}

impl Model {
    /// Bake a skeletal (or complex) animation into a new frame animation of
    /// `frame_count` frames spread evenly over the source duration. Skinned
    /// vertex positions become frame samples and skinned points become
    /// keyframes, both emitted only where the value changes. Frame storage is
    /// only allocated when some vertex moves. Returns the new animation's
    /// index.
    pub fn convert_anim_to_frame(
        &mut self,
        anim: usize,
        name: &str,
        frame_count: usize,
    ) -> Result<usize> {
        let src = self.anim_checked(anim)?;
        if !src.mode().has_skeletal() {
            return reject(AnimError::InvalidMode(src.mode()));
        }
        let duration = src.wrap_duration();
        if duration <= 0.0 {
            return reject(AnimError::InvalidTime { time: duration });
        }
        if frame_count == 0 {
            return reject(AnimError::FrameCapacity {
                anim,
                at: 0,
                diff: 0,
                count: src.frame_count(),
            });
        }
        let n = frame_count as f64;
        let fps = src.fps * n / duration;
        if !self.config().fps_in_range(fps) {
            return reject(AnimError::InvalidFps { fps });
        }
        let mut shell = Animation::new(AnimationMode::Frame, name, fps);
        let wrap = src.wrap;
        shell.wrap = wrap;
        shell.duration = n;

        let eps = self.config().time_epsilon;
        let poses: Vec<Pose> = (0..frame_count)
            .filter_map(|i| self.pose_at(anim, i as f64 * duration / n))
            .collect();

        let data: Vec<Vec<FrameAnimVertex>> = self
            .vertices
            .iter()
            .enumerate()
            .map(|(v, vertex)| {
                let values: Vec<Vec3> = poses.iter().map(|p| p.vertices[v]).collect();
                let mut run = vec![FrameAnimVertex::EMPTY; frame_count];
                for (f, value) in sparse_changes(&values, vertex.coord, eps, wrap) {
                    run[f] = FrameAnimVertex::new(value, Interp::Lerp);
                }
                run
            })
            .collect();

        let mut keyframes = Vec::new();
        for (i, point) in self.points.iter().enumerate() {
            let base = from_trs(point.trans, point.rot, point.scale);
            for channel in Channel::ALL {
                let values: Vec<Vec3> = poses
                    .iter()
                    .map(|p| decompose(&p.points[i], channel))
                    .collect();
                let rest = decompose(&base, channel);
                for (f, value) in sparse_changes(&values, rest, eps, wrap) {
                    keyframes.push((
                        Position::point(i as u32),
                        Keyframe::new(f as u32, channel, value, Interp::Lerp),
                    ));
                }
            }
        }

        let block = FrameBlock {
            times: (0..frame_count).map(|i| i as f64).collect(),
            selected: vec![false; frame_count],
            keyframes,
            samples: data
                .iter()
                .flatten()
                .any(FrameAnimVertex::is_present)
                .then(|| BlockSamples { origin: None, data }),
        };
        let index = self.insert_animation(shell);
        self.splice_frames(index, 0, 0, block);
        log::debug!(
            "resampled animation {anim} into frame animation {index} ({frame_count} frames)"
        );
        Ok(index)
    }
}
