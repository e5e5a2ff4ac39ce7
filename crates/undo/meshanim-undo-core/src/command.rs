//! Command traits and the undo list container.

/// History bookkeeping shared by every command type.
pub trait Command {
    /// Try to absorb `other`, which was recorded immediately after `self`.
    ///
    /// On success `self` must invert to the state before both commands and
    /// apply to the state after both.
    fn try_merge(&mut self, _other: &Self) -> bool {
        false
    }

    /// Commands that only touch view state (selection, current animation).
    /// Lists made only of these do not mark the document as edited.
    fn non_edit(&self) -> bool {
        false
    }

    /// Approximate heap + inline footprint, used for the size budget.
    fn size(&self) -> usize {
        std::mem::size_of_val(self)
    }
}

/// Replay of a command against the document that recorded it.
pub trait Apply<T: ?Sized>: Command {
    /// Re-run the edit (redo).
    fn apply(&self, target: &mut T);
    /// Revert the edit (undo).
    fn invert(&self, target: &mut T);
}

/// One history step: the commands recorded between two commit boundaries.
#[derive(Clone, Debug)]
pub struct UndoList<C> {
    pub(crate) label: String,
    pub(crate) commands: Vec<C>,
    pub(crate) non_edit: bool,
    pub(crate) size: usize,
}

impl<C: Command> UndoList<C> {
    pub(crate) fn new(label: &str, commands: Vec<C>) -> Self {
        let non_edit = commands.iter().all(Command::non_edit);
        let size = commands.iter().map(Command::size).sum();
        Self {
            label: label.to_string(),
            commands,
            non_edit,
            size,
        }
    }
}

impl<C> UndoList<C> {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Commands in recording order.
    pub fn commands(&self) -> &[C] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn is_non_edit(&self) -> bool {
        self.non_edit
    }

    pub fn size(&self) -> usize {
        self.size
    }
}
