//! Linear undo/redo history.
//!
//! - Commands recorded with [`UndoManager::add`] accumulate in a pending list.
//! - [`UndoManager::operation_complete`] turns the pending list into one undo step.
//! - Recording a command after an undo discards the redo branch.
//! - Replaying (undo/redo/cancel) suspends recording so commands that call back
//!   into the document do not record themselves again.
//!
//! # Usage
//!
//! ```ignore
//! model.set_keyframe(anim, 0, pos, Channel::Translate, [1.0, 0.0, 0.0], Interp::Lerp)?;
//! model.operation_complete("Set keyframe");
//! meshanim_undo_core::undo(&mut model);
//! ```

use std::collections::VecDeque;

use crate::command::{Apply, Command, UndoList};
use crate::config::UndoConfig;

/// A document that owns an [`UndoManager`] and can replay its commands.
pub trait UndoTarget: Sized {
    type Command: Apply<Self>;

    fn undo_manager(&mut self) -> &mut UndoManager<Self::Command>;
}

#[derive(Debug)]
pub struct UndoManager<C> {
    pending: Vec<C>,
    undo_stack: VecDeque<UndoList<C>>,
    redo_stack: Vec<UndoList<C>>,
    cfg: UndoConfig,
    recording: bool,
    /// Number of edit lists currently on the undo stack.
    edit_depth: usize,
    /// `edit_depth` at the last save; `None` once that state became unreachable.
    saved_depth: Option<usize>,
}

impl<C: Command> Default for UndoManager<C> {
    fn default() -> Self {
        Self::new(UndoConfig::default())
    }
}

impl<C: Command> UndoManager<C> {
    pub fn new(cfg: UndoConfig) -> Self {
        Self {
            pending: Vec::new(),
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            cfg,
            recording: true,
            edit_depth: 0,
            saved_depth: Some(0),
        }
    }

    /// Record a command into the pending list, merging it into the previous
    /// pending command when possible. Dropped while recording is suspended.
    pub fn add(&mut self, cmd: C) {
        if !self.recording {
            return;
        }
        self.discard_redo();

        if let Some(last) = self.pending.last_mut() {
            if last.try_merge(&cmd) {
                return;
            }
        }
        self.pending.push(cmd);
    }

    /// Close the pending list as one history step. Returns false when nothing
    /// was pending.
    pub fn operation_complete(&mut self, label: &str) -> bool {
        if self.pending.is_empty() {
            return false;
        }
        let list = UndoList::new(label, std::mem::take(&mut self.pending));
        if !list.non_edit {
            self.edit_depth += 1;
        }
        log::debug!(
            "history: committed '{}' ({} commands, non_edit={})",
            list.label,
            list.commands.len(),
            list.non_edit
        );
        self.undo_stack.push_back(list);
        self.trim();
        true
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Suspend or resume recording. Used while installing documents that
    /// should not produce history.
    pub fn set_recording(&mut self, recording: bool) {
        self.recording = recording;
    }

    /// Undo is possible when a committed list or uncommitted commands exist.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty() || !self.pending.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_label(&self) -> Option<&str> {
        self.undo_stack.back().map(|l| l.label.as_str())
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.redo_stack.last().map(|l| l.label.as_str())
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Number of uncommitted commands.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn pending(&self) -> &[C] {
        &self.pending
    }

    /// The list the next undo would revert.
    pub fn peek_undo(&self) -> Option<&UndoList<C>> {
        self.undo_stack.back()
    }

    pub fn peek_redo(&self) -> Option<&UndoList<C>> {
        self.redo_stack.last()
    }

    /// Mark the current state as the saved one.
    pub fn set_saved(&mut self) {
        self.saved_depth = Some(self.edit_depth);
    }

    /// True when no edit happened since [`UndoManager::set_saved`], taking
    /// undo/redo travel into account.
    pub fn is_saved(&self) -> bool {
        self.pending.iter().all(Command::non_edit) && self.saved_depth == Some(self.edit_depth)
    }

    /// Drop all history, including uncommitted commands.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.saved_depth = if self.saved_depth == Some(self.edit_depth) {
            Some(0)
        } else {
            None
        };
        self.edit_depth = 0;
        log::debug!("history: cleared");
    }

    pub fn config(&self) -> &UndoConfig {
        &self.cfg
    }

    pub fn set_config(&mut self, cfg: UndoConfig) {
        self.cfg = cfg;
        self.trim();
    }

    fn total_size(&self) -> usize {
        self.undo_stack.iter().map(|l| l.size).sum()
    }

    fn trim(&mut self) {
        loop {
            let too_many = self.cfg.max_levels > 0 && self.undo_stack.len() > self.cfg.max_levels;
            let too_big = self.cfg.max_size_bytes > 0
                && self.undo_stack.len() > 1
                && self.total_size() > self.cfg.max_size_bytes;
            if !too_many && !too_big {
                break;
            }
            let Some(oldest) = self.undo_stack.pop_front() else {
                break;
            };
            if !oldest.non_edit {
                self.edit_depth -= 1;
                self.saved_depth = match self.saved_depth {
                    Some(0) | None => None,
                    Some(d) => Some(d - 1),
                };
            }
            log::debug!("history: trimmed '{}'", oldest.label);
        }
    }

    fn discard_redo(&mut self) {
        if self.redo_stack.is_empty() {
            return;
        }
        if matches!(self.saved_depth, Some(d) if d > self.edit_depth) {
            self.saved_depth = None;
        }
        self.redo_stack.clear();
    }

    fn commit_pending_for_undo(&mut self) {
        if !self.pending.is_empty() {
            log::debug!("history: committing uncommitted commands before undo");
            self.operation_complete("");
        }
    }
}

fn replay<T: UndoTarget>(target: &mut T, f: impl FnOnce(&mut T)) {
    let was = std::mem::replace(&mut target.undo_manager().recording, false);
    f(target);
    target.undo_manager().recording = was;
}

/// Revert the most recent history step. Uncommitted commands are committed
/// first so the step they form can be redone. Returns the step's label.
pub fn undo<T: UndoTarget>(target: &mut T) -> Option<String> {
    let list = {
        let mgr = target.undo_manager();
        mgr.commit_pending_for_undo();
        mgr.undo_stack.pop_back()?
    };

    replay(target, |t| {
        for cmd in list.commands.iter().rev() {
            cmd.invert(t);
        }
    });

    let mgr = target.undo_manager();
    if !list.non_edit {
        mgr.edit_depth -= 1;
    }
    log::debug!(
        "history: undo '{}' (undo remaining {})",
        list.label,
        mgr.undo_stack.len()
    );
    let label = list.label.clone();
    mgr.redo_stack.push(list);
    Some(label)
}

/// Re-apply the most recently undone step. Returns the step's label.
pub fn redo<T: UndoTarget>(target: &mut T) -> Option<String> {
    let list = target.undo_manager().redo_stack.pop()?;

    replay(target, |t| {
        for cmd in &list.commands {
            cmd.apply(t);
        }
    });

    let mgr = target.undo_manager();
    if !list.non_edit {
        mgr.edit_depth += 1;
    }
    log::debug!(
        "history: redo '{}' (redo remaining {})",
        list.label,
        mgr.redo_stack.len()
    );
    let label = list.label.clone();
    mgr.undo_stack.push_back(list);
    Some(label)
}

/// Revert and discard the uncommitted commands (UI-level cancel).
/// Returns false when nothing was pending.
pub fn undo_current<T: UndoTarget>(target: &mut T) -> bool {
    let pending = std::mem::take(&mut target.undo_manager().pending);
    if pending.is_empty() {
        return false;
    }

    replay(target, |t| {
        for cmd in pending.iter().rev() {
            cmd.invert(t);
        }
    });
    log::debug!("history: cancelled {} uncommitted commands", pending.len());
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Set { old: i32, new: i32 },
        Select { old: bool, new: bool },
    }

    impl Command for Op {
        fn try_merge(&mut self, other: &Self) -> bool {
            match (self, other) {
                (Op::Set { new, .. }, Op::Set { new: next, .. }) => {
                    *new = *next;
                    true
                }
                _ => false,
            }
        }

        fn non_edit(&self) -> bool {
            matches!(self, Op::Select { .. })
        }
    }

    #[derive(Default)]
    struct Doc {
        value: i32,
        selected: bool,
        history: UndoManager<Op>,
    }

    impl Doc {
        fn set(&mut self, v: i32) {
            let old = self.value;
            self.value = v;
            self.history.add(Op::Set { old, new: v });
        }

        fn select(&mut self, s: bool) {
            let old = self.selected;
            self.selected = s;
            self.history.add(Op::Select { old, new: s });
        }
    }

    impl Apply<Doc> for Op {
        fn apply(&self, doc: &mut Doc) {
            match *self {
                Op::Set { new, .. } => doc.set(new),
                Op::Select { new, .. } => doc.select(new),
            }
        }

        fn invert(&self, doc: &mut Doc) {
            match *self {
                Op::Set { old, .. } => doc.set(old),
                Op::Select { old, .. } => doc.select(old),
            }
        }
    }

    impl UndoTarget for Doc {
        type Command = Op;

        fn undo_manager(&mut self) -> &mut UndoManager<Op> {
            &mut self.history
        }
    }

    #[test]
    fn new_history_is_empty() {
        let h: UndoManager<Op> = UndoManager::default();
        assert!(!h.can_undo());
        assert!(!h.can_redo());
        assert_eq!(h.undo_count(), 0);
        assert!(h.undo_label().is_none());
        assert!(h.is_saved());
    }

    #[test]
    fn merged_commands_form_one_step() {
        let mut doc = Doc::default();
        for v in 1..=50 {
            doc.set(v);
        }
        assert_eq!(doc.history.pending_len(), 1);
        assert!(doc.history.operation_complete("Drag"));
        assert_eq!(doc.history.undo_count(), 1);

        assert_eq!(undo(&mut doc).as_deref(), Some("Drag"));
        assert_eq!(doc.value, 0);
        assert_eq!(redo(&mut doc).as_deref(), Some("Drag"));
        assert_eq!(doc.value, 50);
    }

    #[test]
    fn replay_does_not_record() {
        let mut doc = Doc::default();
        doc.set(3);
        doc.history.operation_complete("Set");
        undo(&mut doc);
        assert_eq!(doc.history.pending_len(), 0);
        assert!(doc.history.is_recording());
    }

    #[test]
    fn commit_without_pending_is_noop() {
        let mut h: UndoManager<Op> = UndoManager::default();
        assert!(!h.operation_complete("Nothing"));
        assert_eq!(h.undo_count(), 0);
    }

    #[test]
    fn undo_commits_pending_first() {
        let mut doc = Doc::default();
        doc.set(7);
        assert!(doc.history.can_undo());
        assert!(undo(&mut doc).is_some());
        assert_eq!(doc.value, 0);
        assert!(doc.history.can_redo());
        redo(&mut doc);
        assert_eq!(doc.value, 7);
    }

    #[test]
    fn undo_current_discards_pending() {
        let mut doc = Doc::default();
        doc.set(1);
        doc.history.operation_complete("One");
        doc.set(2);
        doc.set(3);

        assert!(undo_current(&mut doc));
        assert_eq!(doc.value, 1);
        assert_eq!(doc.history.pending_len(), 0);
        assert_eq!(doc.history.undo_count(), 1);
        assert!(!doc.history.can_redo());
        assert!(!undo_current(&mut doc));
    }

    #[test]
    fn new_command_clears_redo() {
        let mut doc = Doc::default();
        doc.set(1);
        doc.history.operation_complete("A");
        undo(&mut doc);
        assert!(doc.history.can_redo());

        doc.set(5);
        assert!(!doc.history.can_redo());
    }

    #[test]
    fn max_levels_enforced() {
        let mut doc = Doc::default();
        doc.history.set_config(UndoConfig {
            max_levels: 3,
            max_size_bytes: 0,
        });
        for (i, label) in ["A", "B", "C", "D"].iter().enumerate() {
            doc.select(i % 2 == 0);
            doc.set(i as i32);
            doc.history.operation_complete(label);
        }
        assert_eq!(doc.history.undo_count(), 3);
        assert_eq!(doc.history.undo_label(), Some("D"));
    }

    #[test]
    fn size_budget_keeps_latest_list() {
        let mut doc = Doc::default();
        let one = std::mem::size_of::<Op>();
        doc.history.set_config(UndoConfig {
            max_levels: 0,
            max_size_bytes: one,
        });
        doc.set(1);
        doc.history.operation_complete("A");
        doc.set(2);
        doc.history.operation_complete("B");
        assert_eq!(doc.history.undo_count(), 1);
        assert_eq!(doc.history.undo_label(), Some("B"));
    }

    #[test]
    fn non_edit_lists_keep_saved_state() {
        let mut doc = Doc::default();
        doc.set(1);
        doc.history.operation_complete("Edit");
        doc.history.set_saved();

        doc.select(true);
        doc.history.operation_complete("Select");
        assert!(doc.history.is_saved());

        doc.set(2);
        assert!(!doc.history.is_saved());
        doc.history.operation_complete("Edit 2");
        assert!(!doc.history.is_saved());

        undo(&mut doc);
        assert!(doc.history.is_saved());
        undo(&mut doc);
        assert!(doc.history.is_saved());
        undo(&mut doc);
        assert!(!doc.history.is_saved());
    }

    #[test]
    fn saved_state_lost_when_redo_branch_discarded() {
        let mut doc = Doc::default();
        doc.set(1);
        doc.history.operation_complete("A");
        doc.history.set_saved();
        undo(&mut doc);
        doc.set(9);
        doc.history.operation_complete("B");
        assert!(!doc.history.is_saved());
        undo(&mut doc);
        assert!(!doc.history.is_saved());
    }

    #[test]
    fn clear_resets_everything() {
        let mut doc = Doc::default();
        doc.set(1);
        doc.history.operation_complete("A");
        doc.set(2);
        doc.history.clear();
        assert!(!doc.history.can_undo());
        assert!(!doc.history.can_redo());
        assert_eq!(doc.history.pending_len(), 0);
    }
}
