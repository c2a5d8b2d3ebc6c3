//! Interactive undo over the data stack.
//!
//! The undo history is the snapshot ring. Level 0 is the live stack, level
//! `n` the stack as it was before the `n`-th most recent command. Undo and
//! redo are both expressed as restoring a neighbouring level.

use tracing::debug;

use crate::machine::Runtime;

/// Undo bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndoState {
    /// Level currently shown; 0 means the live stack.
    pub current_level: usize,
    /// Number of levels kept.
    pub levels: usize,
}

impl UndoState {
    pub fn new(levels: usize) -> Self {
        Self {
            current_level: 0,
            levels,
        }
    }
}

impl Runtime {
    /// Record the stack before a user-visible command runs.
    ///
    /// The ring is trimmed to the configured depth first. When the user has
    /// just undone to level 1 the live stack already equals snapshot 1, so no
    /// new snapshot is taken.
    pub fn prepare_undo(&mut self) {
        let levels = self.undo.levels;
        self.snapshots.remove(levels + 1);
        self.snapshots.remove(levels);
        if self.undo.current_level != 1 {
            self.snapshots.take(&self.data);
        }
        self.undo.current_level = 0;
    }

    /// Show undo level `level` (clamped to the history). Returns the level
    /// now shown. Levels below 1 leave the stack as it is.
    pub fn restore_undo_level(&mut self, level: usize) -> usize {
        if level < 1 {
            return self.undo.current_level;
        }
        let mut level = level.min(self.snapshots.count());
        if level == 0 {
            return self.undo.current_level;
        }
        if self.undo.current_level == 0 {
            // Keep the live stack so redo can come back to it.
            self.snapshots.take(&self.data);
            level = (level + 1).min(self.snapshots.count());
        }
        if self.snapshots.restore(level, &mut self.data).is_ok() {
            self.undo.current_level = level;
        }
        debug!(level = self.undo.current_level, "undo level restored");
        self.undo.current_level
    }

    /// Step one level back in history.
    pub fn undo(&mut self) -> usize {
        let next = self.undo.current_level + 1;
        self.restore_undo_level(next)
    }

    /// Step one level forward.
    pub fn redo(&mut self) -> usize {
        let next = self.undo.current_level.saturating_sub(1);
        self.restore_undo_level(next)
    }

    pub fn undo_level(&self) -> usize {
        self.undo.current_level
    }
}
