//! Keyframe store edits and interpolation queries.

use crate::animation::Family;
use crate::error::AnimError;
use crate::interp::Vec3;
use crate::keyframe::{Channel, Interp, Keyframe, KeyframeList};
use crate::position::{Position, PositionKind};
use crate::sampling::{
    interpolate_keys, interpolate_samples, next_concrete_mode, Interpolated, KeyTrack, Trs,
};
use crate::undo::{KeyValue, UndoOp};
use crate::Result;

use super::{reject, Model};

impl Model {
    /// Write one keyframe.
    ///
    /// - `Interp::None` deletes the keyframe.
    /// - `Interp::Keep` keeps the existing mode, or borrows the mode of the
    ///   next keyframe on the channel (wrapping when enabled), else `Lerp`.
    /// - `Interp::CopyIfAbsent` writes a `Copy` only where no keyframe exists.
    ///
    /// `Copy` keyframes take their value from the nearest earlier concrete
    /// keyframe; `value` is ignored for them.
    pub fn set_keyframe(
        &mut self,
        anim: usize,
        frame: usize,
        pos: Position,
        channel: Channel,
        value: Vec3,
        interp: Interp,
    ) -> Result<()> {
        let a = self.frame_checked(anim, frame)?;
        if !self.position_exists(pos) {
            return reject(AnimError::InvalidPosition { pos });
        }
        if pos.kind == PositionKind::Vertex || !a.mode().supports(Family::of(pos)) {
            return reject(AnimError::UnsupportedPosition {
                pos,
                mode: a.mode(),
            });
        }
        let frame32 = frame as u32;
        let list = a.keyframes.get(&pos);
        let old: Option<KeyValue> = list
            .and_then(|l| l.get(frame32, channel))
            .map(|k| (k.value, k.interp));
        let interp = match interp {
            Interp::Keep => match old {
                Some((_, existing)) => existing,
                None => match list {
                    Some(l) => next_concrete_mode(&KeyTrack(l.channel(channel)), frame, a.wrap),
                    None => Interp::Lerp,
                },
            },
            Interp::CopyIfAbsent if old.is_some() => return Ok(()),
            Interp::CopyIfAbsent => Interp::Copy,
            other => other,
        };
        let new = match interp {
            Interp::None => None,
            i if i.is_keyframe_mode() => Some((value, i)),
            other => return reject(AnimError::InvalidInterp { interp: other }),
        };
        if new == old {
            return Ok(());
        }
        self.raw_put_keyframe(anim, pos, channel, frame32, new);
        self.record(UndoOp::SetKeyframe {
            anim,
            pos,
            channel,
            frame: frame32,
            old,
            new,
        });
        Ok(())
    }

    pub fn delete_keyframe(
        &mut self,
        anim: usize,
        frame: usize,
        pos: Position,
        channel: Channel,
    ) -> Result<()> {
        self.set_keyframe(anim, frame, pos, channel, [0.0; 3], Interp::None)
    }

    pub fn keyframe(
        &self,
        anim: usize,
        frame: usize,
        pos: Position,
        channel: Channel,
    ) -> Option<&Keyframe> {
        self.animation(anim)?.keyframe(frame, pos, channel)
    }

    pub fn keyframe_count(&self, anim: usize) -> Option<usize> {
        self.animation(anim).map(|a| a.keyframe_count())
    }

    pub fn keyframes_for(&self, anim: usize, pos: Position) -> Option<&KeyframeList> {
        self.animation(anim)?.keyframes.get(&pos)
    }

    /// True when `anim` holds keyframes (or, for the frame family, vertex
    /// samples) that a conversion away from `family` would delete.
    pub fn has_keyframe_data(&self, anim: usize, family: Family) -> bool {
        let Some(a) = self.animation(anim) else {
            return false;
        };
        a.has_family_keyframes(family) || (family == Family::Frame && self.has_frame_data(anim))
    }

    pub(crate) fn raw_put_keyframe(
        &mut self,
        anim: usize,
        pos: Position,
        channel: Channel,
        frame: u32,
        value: Option<KeyValue>,
    ) {
        let Some(a) = self.anim_mut(anim) else {
            log::error!("keyframe write: animation {anim} missing");
            return;
        };
        match value {
            Some((value, interp)) => {
                a.keyframes
                    .entry(pos)
                    .or_default()
                    .insert(Keyframe::new(frame, channel, value, interp));
            }
            None => {
                if let Some(list) = a.keyframes.get_mut(&pos) {
                    list.remove(frame, channel);
                    if list.is_empty() {
                        a.keyframes.remove(&pos);
                    }
                }
            }
        }
        self.reset_copy_chain(anim, pos, channel);
    }

    /// Re-derive the `Copy` keyframes of one channel.
    pub(crate) fn reset_copy_chain(&mut self, anim: usize, pos: Position, channel: Channel) {
        let base = self.base_trs(pos).unwrap_or_default().channel(channel);
        if let Some(a) = self.anim_mut(anim) {
            let wrap = a.wrap;
            if let Some(list) = a.keyframes.get_mut(&pos) {
                list.reset_copy_chain(channel, wrap, base);
            }
        }
    }

    /// Re-derive every `Copy` keyframe of an animation.
    pub(crate) fn reset_copy_chains(&mut self, anim: usize) {
        let positions: Vec<Position> = match self.anims.get(anim) {
            Some(a) => a.keyframes.keys().copied().collect(),
            None => return,
        };
        for pos in positions {
            for channel in Channel::ALL {
                self.reset_copy_chain(anim, pos, channel);
            }
        }
    }

    // ----- interpolation -----

    /// Interpolate `pos` at `time`. `frame` is a lookup hint (normally the
    /// frame containing `time`). Channels without keyframes are `None`.
    /// Vertices report their frame-sampled coordinate as `translate`.
    pub fn interpolate(
        &self,
        anim: usize,
        frame: usize,
        time: f64,
        pos: Position,
    ) -> Option<Interpolated> {
        let a = self.animation(anim)?;
        let base = self.base_trs(pos)?;
        if pos.kind == PositionKind::Vertex {
            return Some(Interpolated {
                translate: self.interpolate_vertex(anim, frame, time, pos.idx()),
                ..Default::default()
            });
        }
        Some(match a.keyframes.get(&pos) {
            Some(list) => interpolate_keys(a, list, frame, time, &base),
            None => Interpolated::default(),
        })
    }

    /// Like [`Model::interpolate`] with missing channels filled from the
    /// Position's un-animated value.
    pub fn interpolate_or_base(
        &self,
        anim: usize,
        frame: usize,
        time: f64,
        pos: Position,
    ) -> Option<Trs> {
        let base = self.base_trs(pos)?;
        Some(self.interpolate(anim, frame, time, pos)?.or_base(&base))
    }

    /// Frame-sampled coordinate of `vertex`, `None` without samples.
    pub fn interpolate_vertex(
        &self,
        anim: usize,
        frame: usize,
        time: f64,
        vertex: usize,
    ) -> Option<Vec3> {
        let a = self.animation(anim)?;
        let samples = self.anim_samples(anim, vertex)?;
        interpolate_samples(a, samples, frame, time, self.base_coord(vertex))
    }
}
