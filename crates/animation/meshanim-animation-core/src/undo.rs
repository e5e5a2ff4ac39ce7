//! Commands recorded by [`crate::Model`] mutators.
//!
//! Each command stores the before and after state of one semantic edit and
//! replays through the model's raw primitives. Consecutive edits of the same
//! target merge so interactive drags become one history entry.

use meshanim_undo_core::{Apply, Command};

use crate::animation::{Animation, AnimationMode};
use crate::frame_store::FrameAnimVertex;
use crate::interp::Vec3;
use crate::keyframe::{Channel, Interp};
use crate::model::{CurrentAnim, Model};
use crate::position::Position;

pub(crate) use crate::model::FrameBlock;

/// Stored value and mode of one keyframe.
pub(crate) type KeyValue = (Vec3, Interp);

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SpliceRecord {
    pub anim: usize,
    pub at: usize,
    pub removed: FrameBlock,
    pub inserted: FrameBlock,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum UndoOp {
    InsertAnimation {
        index: usize,
        anim: Box<Animation>,
    },
    RemoveAnimation {
        index: usize,
        anim: Box<Animation>,
    },
    MoveAnimation {
        from: usize,
        to: usize,
    },
    Reposition {
        from: usize,
        to: usize,
        old_mode: AnimationMode,
        new_mode: AnimationMode,
    },
    SetName {
        anim: usize,
        old: String,
        new: String,
    },
    SetFps {
        anim: usize,
        old: f64,
        new: f64,
    },
    SetWrap {
        anim: usize,
        old: bool,
        new: bool,
    },
    SetDuration {
        anim: usize,
        old: f64,
        new: f64,
    },
    SetFrameTime {
        anim: usize,
        frame: usize,
        old: f64,
        new: f64,
    },
    SetTimetable {
        anim: usize,
        old: Vec<f64>,
        new: Vec<f64>,
    },
    Splice(Box<SpliceRecord>),
    SetKeyframe {
        anim: usize,
        pos: Position,
        channel: Channel,
        frame: u32,
        old: Option<KeyValue>,
        new: Option<KeyValue>,
    },
    SetFrameVertex {
        anim: usize,
        frame: usize,
        vertex: usize,
        old: FrameAnimVertex,
        new: FrameAnimVertex,
    },
    AllocateFrames {
        anim: usize,
        slot: usize,
    },
    ReleaseFrames {
        anim: usize,
        slot: usize,
        samples: Vec<Vec<FrameAnimVertex>>,
    },
    SelectFrame {
        anim: usize,
        frame: usize,
        old: bool,
        new: bool,
    },
    SetSelection {
        anim: usize,
        old: Vec<bool>,
        new: Vec<bool>,
    },
    ChangeCurrent {
        old: Option<CurrentAnim>,
        new: Option<CurrentAnim>,
    },
}

/// One recorded edit of a [`Model`].
#[derive(Clone, Debug, PartialEq)]
pub struct AnimUndo {
    op: UndoOp,
    non_edit: bool,
}

impl AnimUndo {
    pub(crate) fn new(op: UndoOp) -> Self {
        let non_edit = matches!(
            op,
            UndoOp::SelectFrame { .. } | UndoOp::SetSelection { .. } | UndoOp::ChangeCurrent { .. }
        );
        Self { op, non_edit }
    }

    /// Short command name, for history views and logs.
    pub fn name(&self) -> &'static str {
        match &self.op {
            UndoOp::InsertAnimation { .. } => "insert animation",
            UndoOp::RemoveAnimation { .. } => "remove animation",
            UndoOp::MoveAnimation { .. } => "move animation",
            UndoOp::Reposition { .. } => "convert animation",
            UndoOp::SetName { .. } => "set name",
            UndoOp::SetFps { .. } => "set fps",
            UndoOp::SetWrap { .. } => "set wrap",
            UndoOp::SetDuration { .. } => "set duration",
            UndoOp::SetFrameTime { .. } => "set frame time",
            UndoOp::SetTimetable { .. } => "set timetable",
            UndoOp::Splice(_) => "set frame count",
            UndoOp::SetKeyframe { .. } => "set keyframe",
            UndoOp::SetFrameVertex { .. } => "set frame vertex",
            UndoOp::AllocateFrames { .. } => "allocate frames",
            UndoOp::ReleaseFrames { .. } => "release frames",
            UndoOp::SelectFrame { .. } => "select frame",
            UndoOp::SetSelection { .. } => "set selection",
            UndoOp::ChangeCurrent { .. } => "change current animation",
        }
    }

    /// Animation the command edits, when it edits one.
    pub fn anim(&self) -> Option<usize> {
        match &self.op {
            UndoOp::InsertAnimation { index, .. } | UndoOp::RemoveAnimation { index, .. } => {
                Some(*index)
            }
            UndoOp::MoveAnimation { from, .. } | UndoOp::Reposition { from, .. } => Some(*from),
            UndoOp::Splice(rec) => Some(rec.anim),
            UndoOp::SetName { anim, .. }
            | UndoOp::SetFps { anim, .. }
            | UndoOp::SetWrap { anim, .. }
            | UndoOp::SetDuration { anim, .. }
            | UndoOp::SetFrameTime { anim, .. }
            | UndoOp::SetTimetable { anim, .. }
            | UndoOp::SetKeyframe { anim, .. }
            | UndoOp::SetFrameVertex { anim, .. }
            | UndoOp::AllocateFrames { anim, .. }
            | UndoOp::ReleaseFrames { anim, .. }
            | UndoOp::SelectFrame { anim, .. }
            | UndoOp::SetSelection { anim, .. } => Some(*anim),
            UndoOp::ChangeCurrent { .. } => None,
        }
    }
}

impl Command for AnimUndo {
    fn try_merge(&mut self, other: &Self) -> bool {
        use UndoOp::*;
        match (&mut self.op, &other.op) {
            (
                SetKeyframe {
                    anim,
                    pos,
                    channel,
                    frame,
                    new,
                    ..
                },
                SetKeyframe {
                    anim: a,
                    pos: p,
                    channel: c,
                    frame: f,
                    new: n,
                    ..
                },
            ) if anim == a && pos == p && channel == c && frame == f =>
            {
                *new = *n;
                true
            }
            (
                SetFrameVertex {
                    anim,
                    frame,
                    vertex,
                    new,
                    ..
                },
                SetFrameVertex {
                    anim: a,
                    frame: f,
                    vertex: v,
                    new: n,
                    ..
                },
            ) if anim == a && frame == f && vertex == v =>
            {
                *new = *n;
                true
            }
            (SetName { anim, new, .. }, SetName { anim: a, new: n, .. }) if anim == a => {
                new.clone_from(n);
                true
            }
            (SetFps { anim, new, .. }, SetFps { anim: a, new: n, .. })
            | (SetDuration { anim, new, .. }, SetDuration { anim: a, new: n, .. })
                if anim == a =>
            {
                *new = *n;
                true
            }
            (SetWrap { anim, new, .. }, SetWrap { anim: a, new: n, .. }) if anim == a => {
                *new = *n;
                true
            }
            (SetFrameTime { anim, frame, new, .. }, SetFrameTime { anim: a, frame: f, new: n, .. })
                if anim == a && frame == f =>
            {
                *new = *n;
                true
            }
            (SelectFrame { anim, frame, new, .. }, SelectFrame { anim: a, frame: f, new: n, .. })
                if anim == a && frame == f =>
            {
                *new = *n;
                true
            }
            (ChangeCurrent { new, .. }, ChangeCurrent { new: n, .. }) => {
                *new = *n;
                true
            }
            _ => false,
        }
    }

    fn non_edit(&self) -> bool {
        self.non_edit
    }

    fn size(&self) -> usize {
        let heap = match &self.op {
            UndoOp::InsertAnimation { anim, .. } | UndoOp::RemoveAnimation { anim, .. } => {
                anim_size(anim)
            }
            UndoOp::SetName { old, new, .. } => old.capacity() + new.capacity(),
            UndoOp::SetTimetable { old, new, .. } => (old.len() + new.len()) * 8,
            UndoOp::Splice(rec) => {
                std::mem::size_of::<SpliceRecord>() + rec.removed.size() + rec.inserted.size()
            }
            UndoOp::ReleaseFrames { samples, .. } => samples_size(samples),
            UndoOp::SetSelection { old, new, .. } => old.len() + new.len(),
            _ => 0,
        };
        std::mem::size_of::<Self>() + heap
    }
}

fn anim_size(anim: &Animation) -> usize {
    std::mem::size_of::<Animation>()
        + anim.name.capacity()
        + anim.timetable.len() * 8
        + anim.selected_frames.len()
        + anim.keyframe_count() * std::mem::size_of::<crate::keyframe::Keyframe>()
}

pub(crate) fn samples_size(samples: &[Vec<FrameAnimVertex>]) -> usize {
    samples.iter().map(Vec::len).sum::<usize>() * std::mem::size_of::<FrameAnimVertex>()
}

fn with_anim(model: &mut Model, anim: usize, f: impl FnOnce(&mut Animation)) {
    match model.anim_mut(anim) {
        Some(a) => f(a),
        None => log::error!("history replay: animation {anim} missing"),
    }
}

fn set_frame_time(model: &mut Model, anim: usize, frame: usize, time: f64) {
    with_anim(model, anim, |a| {
        if let Some(t) = a.timetable.get_mut(frame) {
            *t = time;
        }
    });
}

impl Apply<Model> for AnimUndo {
    fn apply(&self, model: &mut Model) {
        match &self.op {
            UndoOp::InsertAnimation { index, anim } => {
                model.raw_insert_animation(*index, (**anim).clone())
            }
            UndoOp::RemoveAnimation { index, .. } => {
                model.raw_remove_animation(*index);
            }
            UndoOp::MoveAnimation { from, to } => model.raw_move_animation(*from, *to),
            UndoOp::Reposition {
                from, to, new_mode, ..
            } => model.raw_reposition(*from, *to, *new_mode),
            UndoOp::SetName { anim, new, .. } => {
                with_anim(model, *anim, |a| a.name.clone_from(new))
            }
            UndoOp::SetFps { anim, new, .. } => with_anim(model, *anim, |a| a.fps = *new),
            UndoOp::SetWrap { anim, new, .. } => model.raw_set_wrap(*anim, *new),
            UndoOp::SetDuration { anim, new, .. } => with_anim(model, *anim, |a| a.duration = *new),
            UndoOp::SetFrameTime {
                anim, frame, new, ..
            } => set_frame_time(model, *anim, *frame, *new),
            UndoOp::SetTimetable { anim, new, .. } => {
                with_anim(model, *anim, |a| a.timetable.clone_from(new))
            }
            UndoOp::Splice(rec) => {
                model.raw_splice_frames(rec.anim, rec.at, rec.removed.len(), rec.inserted.clone());
            }
            UndoOp::SetKeyframe {
                anim,
                pos,
                channel,
                frame,
                new,
                ..
            } => model.raw_put_keyframe(*anim, *pos, *channel, *frame, *new),
            UndoOp::SetFrameVertex {
                anim,
                frame,
                vertex,
                new,
                ..
            } => model.raw_put_sample(*anim, *frame, *vertex, *new),
            UndoOp::AllocateFrames { anim, slot } => {
                model.raw_attach_frames(*anim, *slot, Vec::new())
            }
            UndoOp::ReleaseFrames { anim, .. } => {
                model.raw_detach_frames(*anim);
            }
            UndoOp::SelectFrame {
                anim, frame, new, ..
            } => model.raw_select_frame(*anim, *frame, *new),
            UndoOp::SetSelection { anim, new, .. } => {
                with_anim(model, *anim, |a| a.selected_frames.clone_from(new))
            }
            UndoOp::ChangeCurrent { new, .. } => model.raw_set_current(*new),
        }
    }

    fn invert(&self, model: &mut Model) {
        match &self.op {
            UndoOp::InsertAnimation { index, .. } => {
                model.raw_remove_animation(*index);
            }
            UndoOp::RemoveAnimation { index, anim } => {
                model.raw_insert_animation(*index, (**anim).clone())
            }
            UndoOp::MoveAnimation { from, to } => model.raw_move_animation(*to, *from),
            UndoOp::Reposition {
                from, to, old_mode, ..
            } => model.raw_reposition(*to, *from, *old_mode),
            UndoOp::SetName { anim, old, .. } => {
                with_anim(model, *anim, |a| a.name.clone_from(old))
            }
            UndoOp::SetFps { anim, old, .. } => with_anim(model, *anim, |a| a.fps = *old),
            UndoOp::SetWrap { anim, old, .. } => model.raw_set_wrap(*anim, *old),
            UndoOp::SetDuration { anim, old, .. } => with_anim(model, *anim, |a| a.duration = *old),
            UndoOp::SetFrameTime {
                anim, frame, old, ..
            } => set_frame_time(model, *anim, *frame, *old),
            UndoOp::SetTimetable { anim, old, .. } => {
                with_anim(model, *anim, |a| a.timetable.clone_from(old))
            }
            UndoOp::Splice(rec) => {
                model.raw_splice_frames(rec.anim, rec.at, rec.inserted.len(), rec.removed.clone());
            }
            UndoOp::SetKeyframe {
                anim,
                pos,
                channel,
                frame,
                old,
                ..
            } => model.raw_put_keyframe(*anim, *pos, *channel, *frame, *old),
            UndoOp::SetFrameVertex {
                anim,
                frame,
                vertex,
                old,
                ..
            } => model.raw_put_sample(*anim, *frame, *vertex, *old),
            UndoOp::AllocateFrames { anim, .. } => {
                model.raw_detach_frames(*anim);
            }
            UndoOp::ReleaseFrames {
                anim,
                slot,
                samples,
            } => model.raw_attach_frames(*anim, *slot, samples.clone()),
            UndoOp::SelectFrame {
                anim, frame, old, ..
            } => model.raw_select_frame(*anim, *frame, *old),
            UndoOp::SetSelection { anim, old, .. } => {
                with_anim(model, *anim, |a| a.selected_frames.clone_from(old))
            }
            UndoOp::ChangeCurrent { old, .. } => model.raw_set_current(*old),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_op(frame: u32, x: f64) -> AnimUndo {
        AnimUndo::new(UndoOp::SetKeyframe {
            anim: 0,
            pos: Position::joint(0),
            channel: Channel::Translate,
            frame,
            old: None,
            new: Some(([x, 0.0, 0.0], Interp::Lerp)),
        })
    }

    #[test]
    fn same_key_merges_keeping_first_old() {
        let mut a = key_op(3, 1.0);
        assert!(a.try_merge(&key_op(3, 2.0)));
        match &a.op {
            UndoOp::SetKeyframe { old, new, .. } => {
                assert_eq!(*old, None);
                assert_eq!(new.map(|v| v.0[0]), Some(2.0));
            }
            other => panic!("unexpected op {other:?}"),
        }
        assert!(!a.try_merge(&key_op(4, 2.0)));
    }

    #[test]
    fn view_commands_are_non_edit() {
        let sel = AnimUndo::new(UndoOp::SelectFrame {
            anim: 0,
            frame: 0,
            old: false,
            new: true,
        });
        assert!(sel.non_edit());
        assert!(!key_op(0, 0.0).non_edit());
        assert_eq!(sel.anim(), Some(0));
    }
}
