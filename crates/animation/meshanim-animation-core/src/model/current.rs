//! Current-animation state.
//!
//! `None -> Active(mode, index, frame, time)`. Entry goes through
//! [`Model::set_current_animation`]; invalid requests clamp to `None`. The
//! stored index is global and follows its animation through inserts,
//! removals, moves and conversions.

use serde::{Deserialize, Serialize};

use crate::animation::AnimationMode;
use crate::error::AnimError;
use crate::undo::UndoOp;
use crate::Result;

use super::{reject, Model};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurrentAnim {
    pub mode: AnimationMode,
    /// Global index into the animation list.
    pub index: usize,
    pub frame: usize,
    pub time: f64,
}

/// New position of the item at `cur` after moving `from` to `to`.
pub(crate) fn moved_index(cur: usize, from: usize, to: usize) -> usize {
    if cur == from {
        to
    } else if from < cur && cur <= to {
        cur - 1
    } else if to <= cur && cur < from {
        cur + 1
    } else {
        cur
    }
}

impl Model {
    pub fn current_animation(&self) -> Option<CurrentAnim> {
        self.current
    }

    /// Make the `index`-th animation of `mode` current, at frame 0. Returns
    /// its global index; an invalid combination clears the current animation.
    pub fn set_current_animation(&mut self, mode: AnimationMode, index: usize) -> Option<usize> {
        let next = self.animation_index(mode, index).map(|global| CurrentAnim {
            mode,
            index: global,
            frame: 0,
            time: self
                .animation(global)
                .and_then(|a| a.frame_time(0))
                .unwrap_or(0.0),
        });
        if next.is_none() {
            log::debug!("no {mode:?} animation {index}; clearing current animation");
        }
        self.change_current(next);
        next.map(|c| c.index)
    }

    pub fn set_no_animation(&mut self) {
        self.change_current(None);
    }

    pub fn set_current_animation_frame(&mut self, frame: usize) -> Result<()> {
        let Some(cur) = self.current else {
            return reject(AnimError::NoCurrentAnimation);
        };
        let time = self.frame_checked(cur.index, frame)?.timetable[frame];
        self.change_current(Some(CurrentAnim { frame, time, ..cur }));
        Ok(())
    }

    /// Set the current time; the current frame becomes the last frame at or
    /// before it.
    pub fn set_current_animation_time(&mut self, time: f64) -> Result<()> {
        let Some(cur) = self.current else {
            return reject(AnimError::NoCurrentAnimation);
        };
        if !time.is_finite() {
            return reject(AnimError::InvalidTime { time });
        }
        let frame = self
            .anim_checked(cur.index)?
            .frame_at_time(time)
            .unwrap_or(0);
        self.change_current(Some(CurrentAnim { frame, time, ..cur }));
        Ok(())
    }

    fn change_current(&mut self, next: Option<CurrentAnim>) {
        let old = self.current;
        if old == next {
            return;
        }
        self.raw_set_current(next);
        self.record(UndoOp::ChangeCurrent { old, new: next });
    }

    pub(crate) fn raw_set_current(&mut self, next: Option<CurrentAnim>) {
        self.current = next;
        self.touch();
    }

    /// Keep the current frame inside `anim` after its frame count changed.
    pub(crate) fn clamp_current_frame(&mut self, anim: usize) {
        let count = self.anims.get(anim).map_or(0, |a| a.frame_count());
        if let Some(cur) = self.current.as_mut().filter(|c| c.index == anim) {
            cur.frame = cur.frame.min(count.saturating_sub(1));
        }
    }

    pub(crate) fn rebase_current_insert(&mut self, index: usize) {
        if let Some(cur) = self.current.as_mut() {
            if cur.index >= index {
                cur.index += 1;
            }
        }
    }

    pub(crate) fn rebase_current_remove(&mut self, index: usize) {
        self.current = match self.current {
            Some(cur) if cur.index == index => None,
            Some(cur) if cur.index > index => Some(CurrentAnim {
                index: cur.index - 1,
                ..cur
            }),
            other => other,
        };
    }

    pub(crate) fn rebase_current_move(&mut self, from: usize, to: usize, mode: AnimationMode) {
        if let Some(cur) = self.current.as_mut() {
            if cur.index == from {
                cur.mode = mode;
            }
            cur.index = moved_index(cur.index, from, to);
        }
    }
}
