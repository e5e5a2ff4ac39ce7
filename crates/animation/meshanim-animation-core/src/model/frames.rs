//! Timetable, frame count, selection mask and frame-store samples.

use crate::animation::Animation;
use crate::error::AnimError;
use crate::frame_store::FrameAnimVertex;
use crate::interp::Vec3;
use crate::keyframe::{Interp, Keyframe};
use crate::position::Position;
use crate::sampling::{next_concrete_mode, SampleTrack};
use crate::undo::{samples_size, SpliceRecord, UndoOp};
use crate::Result;

use super::{reject, Model};

/// Samples carried by a [`FrameBlock`].
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct BlockSamples {
    /// Absolute slot the run was removed from. Re-inserting into an
    /// animation without storage allocates there; `None` allocates at the
    /// end of the arena.
    pub origin: Option<usize>,
    /// One run per vertex.
    pub data: Vec<Vec<FrameAnimVertex>>,
}

/// A run of frames cut from or pasted into an animation. Keyframe frames
/// are relative to the start of the run.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct FrameBlock {
    pub times: Vec<f64>,
    pub selected: Vec<bool>,
    pub keyframes: Vec<(Position, Keyframe)>,
    pub samples: Option<BlockSamples>,
}

impl FrameBlock {
    pub fn empty(times: Vec<f64>) -> Self {
        let selected = vec![false; times.len()];
        Self {
            times,
            selected,
            ..Default::default()
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn size(&self) -> usize {
        self.times.len() * 8
            + self.selected.len()
            + self.keyframes.len() * std::mem::size_of::<(Position, Keyframe)>()
            + self.samples.as_ref().map_or(0, |s| samples_size(&s.data))
    }
}

/// Times for `n` frames inserted at `at`: appended frames continue one
/// frame apart, inner frames are spread evenly between their neighbours.
fn default_times(a: &Animation, at: usize, n: usize) -> Vec<f64> {
    let t = &a.timetable;
    if at >= t.len() {
        let next = t.last().map_or(0.0, |l| l + 1.0);
        return (0..n).map(|i| next + i as f64).collect();
    }
    let hi = t[at];
    let lo = if at > 0 { t[at - 1] } else { hi.min(0.0) };
    (1..=n)
        .map(|i| lo + (hi - lo) * i as f64 / (n + 1) as f64)
        .collect()
}

impl Model {
    // ----- property setters -----

    pub fn set_anim_name(&mut self, anim: usize, name: &str) -> Result<()> {
        let old = self.anim_checked(anim)?.name.clone();
        if old == name {
            return Ok(());
        }
        let new = name.to_string();
        if let Some(a) = self.anim_mut(anim) {
            a.name.clone_from(&new);
        }
        self.record(UndoOp::SetName { anim, old, new });
        Ok(())
    }

    pub fn set_anim_fps(&mut self, anim: usize, fps: f64) -> Result<()> {
        let old = self.anim_checked(anim)?.fps;
        if !self.config().fps_in_range(fps) {
            return reject(AnimError::InvalidFps { fps });
        }
        if old == fps {
            return Ok(());
        }
        if let Some(a) = self.anim_mut(anim) {
            a.fps = fps;
        }
        self.record(UndoOp::SetFps { anim, old, new: fps });
        Ok(())
    }

    pub fn set_anim_wrap(&mut self, anim: usize, wrap: bool) -> Result<()> {
        let old = self.anim_checked(anim)?.wrap;
        if old == wrap {
            return Ok(());
        }
        self.raw_set_wrap(anim, wrap);
        self.record(UndoOp::SetWrap { anim, old, new: wrap });
        Ok(())
    }

    /// Declared duration in timetable units. Must cover the last frame.
    pub fn set_anim_time_frame(&mut self, anim: usize, duration: f64) -> Result<()> {
        let a = self.anim_checked(anim)?;
        let old = a.duration;
        let last = a.timetable.last().copied().unwrap_or(0.0);
        if !duration.is_finite() || duration < last || duration < 0.0 {
            return reject(AnimError::InvalidTime { time: duration });
        }
        if old == duration {
            return Ok(());
        }
        if let Some(a) = self.anim_mut(anim) {
            a.duration = duration;
        }
        self.record(UndoOp::SetDuration {
            anim,
            old,
            new: duration,
        });
        Ok(())
    }

    /// Move one frame in time without reordering the timetable.
    pub fn set_anim_frame_time(&mut self, anim: usize, frame: usize, time: f64) -> Result<()> {
        let a = self.frame_checked(anim, frame)?;
        let old = a.timetable[frame];
        let lo = frame.checked_sub(1).map_or(f64::NEG_INFINITY, |p| a.timetable[p]);
        let hi = a.timetable.get(frame + 1).copied().unwrap_or(f64::INFINITY);
        if !time.is_finite() || time < lo || time > hi {
            return reject(AnimError::InvalidTime { time });
        }
        if old == time {
            return Ok(());
        }
        if let Some(a) = self.anim_mut(anim) {
            a.timetable[frame] = time;
        }
        self.record(UndoOp::SetFrameTime {
            anim,
            frame,
            old,
            new: time,
        });
        Ok(())
    }

    pub fn anim_name(&self, anim: usize) -> Option<&str> {
        self.animation(anim).map(|a| a.name.as_str())
    }

    pub fn anim_fps(&self, anim: usize) -> Option<f64> {
        self.animation(anim).map(|a| a.fps)
    }

    pub fn anim_wrap(&self, anim: usize) -> Option<bool> {
        self.animation(anim).map(|a| a.wrap)
    }

    pub fn anim_time_frame(&self, anim: usize) -> Option<f64> {
        self.animation(anim).map(|a| a.duration)
    }

    pub fn anim_frame_count(&self, anim: usize) -> Option<usize> {
        self.animation(anim).map(Animation::frame_count)
    }

    pub fn anim_frame_time(&self, anim: usize, frame: usize) -> Option<f64> {
        self.animation(anim)?.frame_time(frame)
    }

    pub(crate) fn raw_set_wrap(&mut self, anim: usize, wrap: bool) {
        if let Some(a) = self.anim_mut(anim) {
            a.wrap = wrap;
        }
        self.reset_copy_chains(anim);
    }

    // ----- frame count -----

    /// Resize an animation to `count` frames.
    ///
    /// Growing inserts frames at `at` (default: the end), shrinking removes
    /// frames starting at `at` (default: the new end). Keyframes and samples
    /// in removed frames are dropped; later ones shift. Requests that do not
    /// fit the animation fail without changing anything.
    pub fn set_frame_count(&mut self, anim: usize, count: usize, at: Option<usize>) -> Result<()> {
        let a = self.anim_checked(anim)?;
        let cur = a.frame_count();
        let capacity = |at: usize| AnimError::FrameCapacity {
            anim,
            at,
            diff: count as isize - cur as isize,
            count: cur,
        };
        if count == cur {
            return Ok(());
        }
        if count > cur {
            let at = at.unwrap_or(cur);
            if at > cur {
                return reject(capacity(at));
            }
            let block = FrameBlock::empty(default_times(a, at, count - cur));
            self.splice_frames(anim, at, 0, block);
        } else {
            let remove = cur - count;
            let at = at.unwrap_or(count);
            if at + remove > cur {
                return reject(capacity(at));
            }
            self.splice_frames(anim, at, remove, FrameBlock::default());
        }
        log::debug!("animation {anim}: frame count {cur} -> {count}");
        Ok(())
    }

    /// Legacy resize: change the count at the end and reset the whole
    /// timetable to `0..count`.
    pub fn set_frame_count_compat(&mut self, anim: usize, count: usize) -> Result<()> {
        self.set_frame_count(anim, count, None)?;
        let new: Vec<f64> = (0..count).map(|i| i as f64).collect();
        let old = self.anim_checked(anim)?.timetable.clone();
        if old != new {
            if let Some(a) = self.anim_mut(anim) {
                a.timetable.clone_from(&new);
            }
            self.record(UndoOp::SetTimetable { anim, old, new });
        }
        Ok(())
    }

    /// Recorded splice. Callers validate `at` and `remove`.
    pub(crate) fn splice_frames(
        &mut self,
        anim: usize,
        at: usize,
        remove: usize,
        block: FrameBlock,
    ) {
        let removed = self.raw_splice_frames(anim, at, remove, block.clone());
        self.record(UndoOp::Splice(Box::new(SpliceRecord {
            anim,
            at,
            removed,
            inserted: block,
        })));
    }

    /// Copy frames `[at, at + count)` of `anim` into a block, mapping times
    /// through `map_time`. Samples are copied when storage is allocated.
    pub(crate) fn extract_block(
        &self,
        anim: usize,
        at: usize,
        count: usize,
        map_time: impl Fn(f64) -> f64,
    ) -> FrameBlock {
        let Some(a) = self.anims.get(anim) else {
            return FrameBlock::default();
        };
        let end = (at + count).min(a.frame_count());
        let at = at.min(end);
        let keyframes = a
            .keyframes
            .iter()
            .flat_map(|(pos, list)| list.iter().map(move |k| (*pos, k)))
            .filter(|(_, k)| (at..end).contains(&k.frame_index()))
            .map(|(pos, k)| {
                let mut k = k.clone();
                k.frame -= at as u32;
                (pos, k)
            })
            .collect();
        let samples = a.frame0.map(|f0| BlockSamples {
            origin: None,
            data: self.frames.copy_range(f0 + at, end - at),
        });
        FrameBlock {
            times: a.timetable[at..end].iter().map(|&t| map_time(t)).collect(),
            selected: a.selected_frames.get(at..end).map(<[_]>::to_vec).unwrap_or_default(),
            keyframes,
            samples,
        }
    }

    /// Replace frames `[at, at + remove)` with `block` and return what was
    /// removed, in a form that restores the previous state when spliced back.
    pub(crate) fn raw_splice_frames(
        &mut self,
        anim: usize,
        at: usize,
        remove: usize,
        block: FrameBlock,
    ) -> FrameBlock {
        let FrameBlock {
            times,
            mut selected,
            keyframes,
            samples,
        } = block;
        let inserted = times.len();
        selected.resize(inserted, false);

        let Some(a) = self.anim_mut(anim) else {
            log::error!("splice: animation {anim} missing");
            return FrameBlock::default();
        };
        let count = a.frame_count();
        let at = at.min(count);
        let remove = remove.min(count - at);
        let has_frame = a.mode().has_frame();
        let frame0 = a.frame0;

        let removed_times: Vec<f64> = a.timetable.splice(at..at + remove, times).collect();
        a.selected_frames.resize(count, false);
        let removed_selected: Vec<bool> =
            a.selected_frames.splice(at..at + remove, selected).collect();

        let mut removed_keys = Vec::new();
        for (pos, list) in a.keyframes.iter_mut() {
            removed_keys.extend(
                list.close_gap(at as u32, remove as u32)
                    .into_iter()
                    .map(|k| (*pos, k)),
            );
            list.open_gap(at as u32, inserted as u32);
        }
        for (pos, mut key) in keyframes {
            key.frame += at as u32;
            a.keyframes.entry(pos).or_default().insert(key);
        }
        a.keyframes.retain(|_, list| !list.is_empty());
        let new_count = a.frame_count();

        let removed_samples = match (has_frame, frame0) {
            (false, _) => None,
            (true, Some(f0)) => {
                let data = samples.map(|s| s.data).unwrap_or_default();
                let removed = self.splice_store(anim, f0 + at, remove, inserted, data);
                if new_count == 0 {
                    if let Some(a) = self.anim_mut(anim) {
                        a.frame0 = None;
                    }
                }
                Some(BlockSamples {
                    origin: Some(f0 + at),
                    data: removed,
                })
            }
            (true, None) => {
                if let Some(s) = samples.filter(|_| new_count > 0) {
                    // Storage starts with this block; pad the frames that
                    // existed without storage with empty samples.
                    let before = at;
                    let after = new_count - at - inserted;
                    let data = s
                        .data
                        .into_iter()
                        .map(|run| {
                            let mut full = vec![FrameAnimVertex::EMPTY; before];
                            if run.len() == inserted {
                                full.extend(run);
                            } else {
                                full.resize(before + inserted, FrameAnimVertex::EMPTY);
                            }
                            full.resize(new_count, FrameAnimVertex::EMPTY);
                            full
                        })
                        .collect();
                    if after > 0 || before > 0 {
                        log::warn!("animation {anim}: storage allocated around existing frames");
                    }
                    let slot = s.origin.unwrap_or(self.frames.slots()).min(self.frames.slots());
                    self.raw_attach_frames_exact(anim, slot, new_count, data);
                }
                None
            }
        };

        self.reset_copy_chains(anim);
        self.clamp_current_frame(anim);
        FrameBlock {
            times: removed_times,
            selected: removed_selected,
            keyframes: removed_keys,
            samples: removed_samples,
        }
    }

    // ----- frame store allocation -----

    /// Allocate storage for `anim` at `slot` covering its frame count.
    pub(crate) fn raw_attach_frames(
        &mut self,
        anim: usize,
        slot: usize,
        runs: Vec<Vec<FrameAnimVertex>>,
    ) {
        let count = self.anims.get(anim).map_or(0, Animation::frame_count);
        self.raw_attach_frames_exact(anim, slot, count, runs);
    }

    fn raw_attach_frames_exact(
        &mut self,
        anim: usize,
        slot: usize,
        count: usize,
        runs: Vec<Vec<FrameAnimVertex>>,
    ) {
        self.splice_store(anim, slot, 0, count, runs);
        if let Some(a) = self.anim_mut(anim) {
            a.frame0 = Some(slot);
        }
    }

    /// Release `anim`'s storage, returning its start slot and samples.
    pub(crate) fn raw_detach_frames(
        &mut self,
        anim: usize,
    ) -> Option<(usize, Vec<Vec<FrameAnimVertex>>)> {
        let a = self.anim_mut(anim)?;
        let slot = a.frame0.take()?;
        let count = a.frame_count();
        let samples = self.splice_store(anim, slot, count, 0, Vec::new());
        Some((slot, samples))
    }

    /// Allocate storage for a frame-capable animation on its first write.
    pub(crate) fn ensure_frames(&mut self, anim: usize) {
        let Some(a) = self.anims.get(anim) else {
            return;
        };
        if !a.mode().has_frame() || a.frame0.is_some() || a.frame_count() == 0 {
            return;
        }
        let slot = self.frames.slots();
        self.raw_attach_frames(anim, slot, Vec::new());
        self.record(UndoOp::AllocateFrames { anim, slot });
        log::debug!("animation {anim}: frame storage allocated at slot {slot}");
    }

    /// Drop `anim`'s storage as one recorded step.
    pub(crate) fn release_frames(&mut self, anim: usize) {
        if let Some((slot, samples)) = self.raw_detach_frames(anim) {
            self.record(UndoOp::ReleaseFrames {
                anim,
                slot,
                samples,
            });
            log::debug!("animation {anim}: frame storage released from slot {slot}");
        }
    }

    // ----- selection -----

    pub fn select_anim_frame(&mut self, anim: usize, frame: usize, selected: bool) -> Result<()> {
        let old = self
            .frame_checked(anim, frame)?
            .selected_frames
            .get(frame)
            .copied()
            .unwrap_or(false);
        if old == selected {
            return Ok(());
        }
        self.raw_select_frame(anim, frame, selected);
        self.record(UndoOp::SelectFrame {
            anim,
            frame,
            old,
            new: selected,
        });
        Ok(())
    }

    pub fn is_anim_frame_selected(&self, anim: usize, frame: usize) -> bool {
        self.animation(anim)
            .and_then(|a| a.selected_frames.get(frame).copied())
            .unwrap_or(false)
    }

    pub fn clear_anim_frame_selection(&mut self, anim: usize) -> Result<()> {
        let a = self.anim_checked(anim)?;
        if !a.selected_frames.iter().any(|&s| s) {
            return Ok(());
        }
        let old = a.selected_frames.clone();
        let new = vec![false; old.len()];
        if let Some(a) = self.anim_mut(anim) {
            a.selected_frames.clone_from(&new);
        }
        self.record(UndoOp::SetSelection { anim, old, new });
        Ok(())
    }

    pub(crate) fn raw_select_frame(&mut self, anim: usize, frame: usize, selected: bool) {
        if let Some(a) = self.anim_mut(anim) {
            let count = a.frame_count();
            a.selected_frames.resize(count, false);
            if let Some(s) = a.selected_frames.get_mut(frame) {
                *s = selected;
            }
        }
    }

    // ----- frame samples -----

    /// Write one vertex sample. `Interp::None` deletes it, `Keep` keeps the
    /// existing mode (or borrows the next sample's), `CopyIfAbsent` only
    /// writes where no sample exists.
    pub fn set_frame_vertex(
        &mut self,
        anim: usize,
        frame: usize,
        vertex: usize,
        coord: Vec3,
        interp: Interp,
    ) -> Result<()> {
        let a = self.frame_checked(anim, frame)?;
        if !a.mode().has_frame() {
            return reject(AnimError::UnsupportedPosition {
                pos: Position::vertex(vertex as u32),
                mode: a.mode(),
            });
        }
        if vertex >= self.vertices.len() {
            return reject(AnimError::InvalidVertex { vertex });
        }
        let wrap = a.wrap;
        let old = self.frame_vertex(anim, frame, vertex).copied().unwrap_or_default();
        let interp = match interp {
            Interp::Keep if old.is_present() => old.interp,
            Interp::Keep => {
                let samples = self.anim_samples(anim, vertex).unwrap_or(&[]);
                next_concrete_mode(&SampleTrack(samples), frame, wrap)
            }
            Interp::CopyIfAbsent if old.is_present() => return Ok(()),
            Interp::CopyIfAbsent => Interp::Copy,
            other => other,
        };
        if !interp.is_sample_mode() {
            return reject(AnimError::InvalidInterp { interp });
        }
        let new = if interp == Interp::None {
            FrameAnimVertex::EMPTY
        } else {
            FrameAnimVertex::new(coord, interp)
        };
        if new == old {
            return Ok(());
        }
        self.ensure_frames(anim);
        self.raw_put_sample(anim, frame, vertex, new);
        self.record(UndoOp::SetFrameVertex {
            anim,
            frame,
            vertex,
            old,
            new,
        });
        Ok(())
    }

    /// Stored sample, if storage is allocated.
    pub fn frame_vertex(
        &self,
        anim: usize,
        frame: usize,
        vertex: usize,
    ) -> Option<&FrameAnimVertex> {
        let a = self.animation(anim)?;
        if frame >= a.frame_count() {
            return None;
        }
        self.frames.get(vertex, a.frame0? + frame)
    }

    /// `anim`'s slice of one vertex's sample array.
    pub(crate) fn anim_samples(&self, anim: usize, vertex: usize) -> Option<&[FrameAnimVertex]> {
        let a = self.animation(anim)?;
        let f0 = a.frame0?;
        self.frames.samples(vertex)?.get(f0..f0 + a.frame_count())
    }

    /// True when any vertex has a sample in `anim`.
    pub fn has_frame_data(&self, anim: usize) -> bool {
        (0..self.vertices.len()).any(|v| {
            self.anim_samples(anim, v)
                .is_some_and(|s| s.iter().any(FrameAnimVertex::is_present))
        })
    }

    pub(crate) fn raw_put_sample(
        &mut self,
        anim: usize,
        frame: usize,
        vertex: usize,
        sample: FrameAnimVertex,
    ) {
        let Some(f0) = self.animation(anim).and_then(|a| a.frame0) else {
            log::error!("animation {anim}: sample write without storage");
            return;
        };
        self.frames.set(vertex, f0 + frame, sample);
        self.touch();
    }
}
