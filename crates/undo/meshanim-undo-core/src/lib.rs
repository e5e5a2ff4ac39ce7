//! Meshanim Undo Core
//!
//! Reversible command objects grouped into undo lists, a linear undo/redo
//! history and the replay entry points used by any document type that owns
//! an [`UndoManager`].
//!
//! A document records commands with [`UndoManager::add`] while it mutates
//! itself. Consecutive commands are offered to [`Command::try_merge`] so an
//! interactive drag collapses into one command. [`UndoManager::operation_complete`]
//! closes the pending list and pushes it as one history step.

pub mod command;
pub mod config;
pub mod manager;

pub use command::{Apply, Command, UndoList};
pub use config::UndoConfig;
pub use manager::{redo, undo, undo_current, UndoManager, UndoTarget};
