//! Snapshots of the data stack.
//!
//! A snapshot copies the stack's references, not the objects: objects are
//! immutable once published, so sharing them is enough to restore a stack
//! exactly. Snapshots live on a bounded ring; level 1 is the most recent and
//! the oldest one is dropped when the ring is full. The same ring backs the
//! interactive undo history and the bookkeeping of transparent runs.

use std::collections::VecDeque;

use crate::error::RplError;
use crate::stack::DataStack;
use crate::store::ObjPtr;

/// Default ring capacity.
pub const DEFAULT_SNAPSHOT_CAPACITY: usize = 16;

/// Ring of data-stack snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotStack {
    levels: VecDeque<Vec<ObjPtr>>,
    capacity: usize,
}

impl SnapshotStack {
    pub fn new(capacity: usize) -> Self {
        Self {
            levels: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn push_level(&mut self, items: Vec<ObjPtr>) {
        if self.levels.len() == self.capacity {
            self.levels.pop_back();
        }
        self.levels.push_front(items);
    }

    fn index(&self, level: usize) -> Result<usize, RplError> {
        if level == 0 || level > self.levels.len() {
            return Err(RplError::NoSnapshot(level));
        }
        Ok(level - 1)
    }

    /// Record the whole stack as the new level 1.
    pub fn take(&mut self, stack: &DataStack) {
        self.push_level(stack.as_slice().to_vec());
    }

    /// Record the whole stack, then leave only its top `n` levels live.
    pub fn take_keeping(&mut self, stack: &mut DataStack, n: usize) {
        self.take(stack);
        stack.keep_top(n);
    }

    /// Record the whole stack, then clear it.
    pub fn take_and_clear(&mut self, stack: &mut DataStack) {
        self.take(stack);
        stack.clear();
    }

    /// Replace the live stack with snapshot `level`, keeping the snapshot.
    /// Restoring the same level twice gives the same stack.
    pub fn restore(&self, level: usize, stack: &mut DataStack) -> Result<(), RplError> {
        let i = self.index(level)?;
        stack.replace(self.levels[i].clone());
        Ok(())
    }

    /// Restore snapshot `level` and drop it from the ring. Newer levels are
    /// kept and shift down by one.
    pub fn revert_to(&mut self, level: usize, stack: &mut DataStack) -> Result<(), RplError> {
        let i = self.index(level)?;
        if let Some(items) = self.levels.remove(i) {
            stack.replace(items);
        }
        Ok(())
    }

    /// Drop one level. Removing a level that does not exist is a no-op.
    pub fn remove(&mut self, level: usize) {
        if let Ok(i) = self.index(level) {
            self.levels.remove(i);
        }
    }

    /// Number of levels held.
    pub fn count(&self) -> usize {
        self.levels.len()
    }

    /// Depth of the stack recorded at `level`.
    pub fn depth_of(&self, level: usize) -> Result<usize, RplError> {
        self.index(level).map(|i| self.levels[i].len())
    }

    /// Entry `index` (1 = top) of snapshot `level`.
    pub fn peek(&self, level: usize, index: usize) -> Result<ObjPtr, RplError> {
        let snap = &self.levels[self.index(level)?];
        if index == 0 || index > snap.len() {
            return Err(RplError::StackUnderflow);
        }
        Ok(snap[snap.len() - index])
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Every reference held by every level, with its level number.
    pub fn references(&self) -> impl Iterator<Item = (usize, ObjPtr)> + '_ {
        self.levels
            .iter()
            .enumerate()
            .flat_map(|(i, snap)| snap.iter().map(move |&p| (i + 1, p)))
    }
}
