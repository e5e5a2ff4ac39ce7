//! Whole-animation operations: add, copy, move, delete, convert, split,
//! join and merge.
//!
//! Each operation validates everything before its first mutation, then
//! composes recorded primitives, so one `operation_complete` afterwards turns
//! it into a single history step.

use crate::animation::{Animation, AnimationMode, Family};
use crate::error::AnimError;
use crate::frame_store::FrameAnimVertex;
use crate::keyframe::{Interp, Keyframe};
use crate::position::Position;
use crate::undo::UndoOp;
use crate::Result;

use super::{reject, FrameBlock, Model};

/// `Copy` data pasted over existing frames must not replace what is there.
fn paste_mode(interp: Interp) -> Interp {
    if interp == Interp::Copy {
        Interp::CopyIfAbsent
    } else {
        interp
    }
}

impl Model {
    /// Append an empty animation to the end of its mode's partition.
    pub fn add_animation(&mut self, mode: AnimationMode, name: &str) -> usize {
        let shell = Animation::new(mode, name, self.config().default_fps);
        let index = self.insert_animation(shell);
        log::debug!("added {mode:?} animation '{name}' at {index}");
        index
    }

    pub(crate) fn insert_animation(&mut self, shell: Animation) -> usize {
        let index = self.partition_range(shell.mode()).end;
        self.raw_insert_animation(index, shell.clone());
        self.record(UndoOp::InsertAnimation {
            index,
            anim: Box::new(shell),
        });
        index
    }

    /// Shell with the same mode and playback settings as `anim`.
    fn shell_like(a: &Animation, name: &str) -> Animation {
        let mut shell = Animation::new(a.mode(), name, a.fps);
        shell.wrap = a.wrap;
        shell.duration = a.duration;
        shell
    }

    fn put_duration(&mut self, anim: usize, duration: f64) {
        let Some(a) = self.anim_mut(anim) else {
            return;
        };
        let old = a.duration;
        if old == duration {
            return;
        }
        a.duration = duration;
        self.record(UndoOp::SetDuration {
            anim,
            old,
            new: duration,
        });
    }

    /// Duplicate `anim` (timetable, keyframes, selection and samples) at the
    /// end of its partition.
    pub fn copy_animation(&mut self, anim: usize, name: &str) -> Result<usize> {
        let a = self.anim_checked(anim)?;
        let shell = Self::shell_like(a, name);
        let count = a.frame_count();
        let block = self.extract_block(anim, 0, count, |t| t);
        let index = self.insert_animation(shell);
        if count > 0 {
            self.splice_frames(index, 0, 0, block);
        }
        log::debug!("copied animation {anim} to {index}");
        Ok(index)
    }

    /// Reorder inside one mode partition.
    pub fn move_animation(&mut self, from: usize, to: usize) -> Result<()> {
        let mode = self.anim_checked(from)?.mode();
        if !self.partition_range(mode).contains(&to) {
            return reject(AnimError::InvalidMove { from, to });
        }
        if from == to {
            return Ok(());
        }
        self.raw_move_animation(from, to);
        self.record(UndoOp::MoveAnimation { from, to });
        Ok(())
    }

    /// Remove an animation with all its frames and storage.
    pub fn delete_animation(&mut self, anim: usize) -> Result<()> {
        let count = self.anim_checked(anim)?.frame_count();
        if self.current.is_some_and(|c| c.index == anim) {
            self.set_no_animation();
        }
        if count > 0 {
            self.splice_frames(anim, 0, count, FrameBlock::default());
        }
        self.release_frames(anim);
        if let Some(shell) = self.raw_remove_animation(anim) {
            log::debug!("deleted animation {anim} ('{}')", shell.name);
            self.record(UndoOp::RemoveAnimation {
                index: anim,
                anim: Box::new(shell),
            });
        }
        Ok(())
    }

    /// Change an animation's mode. Data of a channel family the new mode does
    /// not support is deleted first; this cannot be refused once started, so
    /// callers check [`Model::has_keyframe_data`] and confirm with the user.
    /// The animation moves to the nearest edge of its new partition; the new
    /// global index is returned.
    pub fn convert_to_type(&mut self, anim: usize, mode: AnimationMode) -> Result<usize> {
        let old = self.anim_checked(anim)?.mode();
        if old == mode {
            return Ok(anim);
        }
        for family in [Family::Skeletal, Family::Frame] {
            if !old.supports(family) || mode.supports(family) {
                continue;
            }
            self.delete_family(anim, family)?;
            if family == Family::Frame {
                self.release_frames(anim);
            }
        }
        let Some(to) = self.anims.relocate(anim, |a| a.mode = mode) else {
            return reject(AnimError::AnimationNotFound { anim });
        };
        self.rebase_current_move(anim, to, mode);
        self.touch();
        self.record(UndoOp::Reposition {
            from: anim,
            to,
            old_mode: old,
            new_mode: mode,
        });
        log::debug!("converted animation {anim} {old:?} -> {mode:?}, now at {to}");
        Ok(to)
    }

    fn delete_family(&mut self, anim: usize, family: Family) -> Result<()> {
        let keys: Vec<(Position, Keyframe)> = match self.animation(anim) {
            Some(a) => a
                .keyframes
                .iter()
                .filter(|(pos, _)| Family::of(**pos) == family)
                .flat_map(|(pos, list)| list.iter().map(move |k| (*pos, k.clone())))
                .collect(),
            None => return reject(AnimError::AnimationNotFound { anim }),
        };
        for (pos, key) in keys {
            self.delete_keyframe(anim, key.frame_index(), pos, key.channel)?;
        }
        Ok(())
    }

    /// Split at `time`: frames at or after it move into a new animation of
    /// the same mode with times rebased to start at `time`. Returns the new
    /// animation's index.
    pub fn split_animation(&mut self, anim: usize, time: f64, name: &str) -> Result<usize> {
        let a = self.anim_checked(anim)?;
        let count = a.frame_count();
        let cut = a.timetable.partition_point(|&t| t < time);
        if !time.is_finite() || time <= 0.0 || cut == 0 || cut >= count {
            return reject(AnimError::InvalidSplit { anim, time });
        }
        let mut shell = Self::shell_like(a, name);
        shell.duration = (a.wrap_duration() - time).max(0.0);
        let block = self.extract_block(anim, cut, count - cut, |t| t - time);

        let index = self.insert_animation(shell);
        self.splice_frames(index, 0, 0, block);
        self.splice_frames(anim, cut, count - cut, FrameBlock::default());
        self.put_duration(anim, time);
        log::debug!("split animation {anim} at {time} (frame {cut}) into {index}");
        Ok(index)
    }

    /// Append `b` to `a`, retimed by `a.fps / b.fps` and offset by `a`'s
    /// duration, then delete `b`. When `a` ends exactly at its duration and
    /// `b` starts at zero the two boundary frames become one. Returns `a`'s
    /// final index.
    pub fn join_animations(&mut self, a: usize, b: usize) -> Result<usize> {
        let (first, second) = self.combinable(a, b)?;
        let r = first.fps / second.fps;
        let offset = first.wrap_duration();
        let eps = self.config().time_epsilon;
        let a_count = first.frame_count();
        let b_count = second.frame_count();
        let spliced = match (first.timetable.last(), second.timetable.first()) {
            (Some(&last), Some(&start)) => (last - offset).abs() <= eps && start.abs() <= eps,
            _ => false,
        };
        let duration = offset + second.wrap_duration() * r;
        let b_has_samples = second.frame0.is_some();
        let skip = usize::from(spliced);

        let block = self.extract_block(b, skip, b_count - skip, |t| offset + t * r);
        let seam_keys = if spliced {
            self.keys_at(b, 0)
        } else {
            Vec::new()
        };
        let seam_samples = if spliced {
            self.samples_at(b, 0)
        } else {
            Vec::new()
        };

        if b_has_samples {
            self.ensure_frames(a);
        }
        self.splice_frames(a, a_count, 0, block);
        if spliced {
            let seam = a_count - 1;
            for (pos, key) in seam_keys {
                self.set_keyframe(a, seam, pos, key.channel, key.value, paste_mode(key.interp))?;
            }
            for (vertex, sample) in seam_samples {
                self.set_frame_vertex(a, seam, vertex, sample.coord, paste_mode(sample.interp))?;
            }
        }
        self.put_duration(a, duration);
        self.delete_animation(b)?;
        let result = if b < a { a - 1 } else { a };
        log::debug!("joined animation {b} onto {a} (spliced={spliced}), now at {result}");
        Ok(result)
    }

    /// Time-interleaved union of `a` and `b` (retimed by `a.fps / b.fps`).
    /// Frames whose times coincide are shared, with `a`'s data preferred.
    /// `b` is deleted; returns `a`'s final index.
    pub fn merge_animations(&mut self, a: usize, b: usize) -> Result<usize> {
        let (first, second) = self.combinable(a, b)?;
        let r = first.fps / second.fps;
        let eps = self.config().time_epsilon;
        let ta = &first.timetable;
        let tb: Vec<f64> = second.timetable.iter().map(|t| t * r).collect();
        let duration = first.wrap_duration().max(second.wrap_duration() * r);
        let b_has_samples = second.frame0.is_some();

        let (_source_map, target_map, shared) = interleave(ta, &tb, eps);

        if b_has_samples {
            self.ensure_frames(a);
        }
        let mut j = 0;
        while j < tb.len() {
            if shared[j] {
                j += 1;
                continue;
            }
            let start = j;
            while j + 1 < tb.len() && !shared[j + 1] && target_map[j + 1] == target_map[j] + 1 {
                j += 1;
            }
            let block = self.extract_block(b, start, j + 1 - start, |t| t * r);
            self.splice_frames(a, target_map[start], 0, block);
            j += 1;
        }

        for (frame, &is_shared) in shared.iter().enumerate() {
            if !is_shared {
                continue;
            }
            let target = target_map[frame];
            for (pos, key) in self.keys_at(b, frame) {
                if self.keyframe(a, target, pos, key.channel).is_none() {
                    self.set_keyframe(a, target, pos, key.channel, key.value, key.interp)?;
                }
            }
            for (vertex, sample) in self.samples_at(b, frame) {
                if !self
                    .frame_vertex(a, target, vertex)
                    .is_some_and(FrameAnimVertex::is_present)
                {
                    self.set_frame_vertex(a, target, vertex, sample.coord, sample.interp)?;
                }
            }
        }

        self.put_duration(a, duration);
        self.delete_animation(b)?;
        let result = if b < a { a - 1 } else { a };
        log::debug!("merged animation {b} into {a}, now at {result}");
        Ok(result)
    }

    fn combinable(&self, a: usize, b: usize) -> Result<(&Animation, &Animation)> {
        if a == b {
            return reject(AnimError::SameAnimation { anim: a });
        }
        let first = self.anim_checked(a)?;
        let second = self.anim_checked(b)?;
        if first.mode() != second.mode() {
            return reject(AnimError::ModeMismatch {
                a: first.mode(),
                b: second.mode(),
            });
        }
        Ok((first, second))
    }

    fn keys_at(&self, anim: usize, frame: usize) -> Vec<(Position, Keyframe)> {
        let Some(a) = self.animation(anim) else {
            return Vec::new();
        };
        a.keyframes
            .iter()
            .flat_map(|(pos, list)| {
                list.iter()
                    .filter(move |k| k.frame_index() == frame)
                    .map(move |k| (*pos, k.clone()))
            })
            .collect()
    }

    fn samples_at(&self, anim: usize, frame: usize) -> Vec<(usize, FrameAnimVertex)> {
        (0..self.vertices.len())
            .filter_map(|v| {
                self.frame_vertex(anim, frame, v)
                    .filter(|s| s.is_present())
                    .map(|s| (v, *s))
            })
            .collect()
    }

    // ----- raw primitives -----

    pub(crate) fn raw_insert_animation(&mut self, index: usize, anim: Animation) {
        if self.anims.insert(index, anim).is_err() {
            log::error!("animation insert at {index} would break partition order");
            return;
        }
        self.rebase_current_insert(index);
        self.touch();
    }

    pub(crate) fn raw_remove_animation(&mut self, index: usize) -> Option<Animation> {
        let removed = self.anims.remove(index)?;
        self.rebase_current_remove(index);
        self.touch();
        Some(removed)
    }

    pub(crate) fn raw_move_animation(&mut self, from: usize, to: usize) {
        let Some(mode) = self.anims.get(from).map(Animation::mode) else {
            return;
        };
        if self.anims.move_within(from, to) {
            self.rebase_current_move(from, to, mode);
            self.touch();
        }
    }

    /// Move the animation at `from` to `to` while changing its mode.
    pub(crate) fn raw_reposition(&mut self, from: usize, to: usize, mode: AnimationMode) {
        let Some(mut anim) = self.anims.remove(from) else {
            return;
        };
        anim.mode = mode;
        if let Err(anim) = self.anims.insert(to, anim) {
            log::error!("animation reposition {from} -> {to} would break partition order");
            self.anims.push(anim);
        }
        self.rebase_current_move(from, to, mode);
        self.touch();
    }
}

/// Merge two sorted timetables. Returns, for each side, the merged index of
/// every frame, plus which of `b`'s frames coincide with one of `a`'s.
pub(crate) fn interleave(a: &[f64], b: &[f64], eps: f64) -> (Vec<usize>, Vec<usize>, Vec<bool>) {
    let mut source_map = Vec::with_capacity(a.len());
    let mut target_map = Vec::with_capacity(b.len());
    let mut shared = Vec::with_capacity(b.len());
    let (mut i, mut j, mut n) = (0, 0, 0);
    while i < a.len() || j < b.len() {
        match (a.get(i), b.get(j)) {
            (Some(&x), Some(&y)) if (x - y).abs() <= eps => {
                source_map.push(n);
                target_map.push(n);
                shared.push(true);
                i += 1;
                j += 1;
            }
            (Some(&x), Some(&y)) if x < y => {
                source_map.push(n);
                i += 1;
            }
            (Some(_), None) => {
                source_map.push(n);
                i += 1;
            }
            _ => {
                target_map.push(n);
                shared.push(false);
                j += 1;
            }
        }
        n += 1;
    }
    (source_map, target_map, shared)
}
