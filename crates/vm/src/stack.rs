//! The stack set: data stack, return stack and local-variable (LAM) stack.
//!
//! Data stack levels are 1-indexed from the top, the way RPL programs name
//! them: level 1 is the most recently pushed object.

use crate::error::RplError;
use crate::store::ObjPtr;

/// Default depth limits.
pub const DEFAULT_DATA_DEPTH: usize = 4096;
pub const DEFAULT_RETURN_DEPTH: usize = 1024;
pub const DEFAULT_LAM_DEPTH: usize = 1024;

// ---- Data stack ----

/// Operand stack of object references.
#[derive(Debug, Clone)]
pub struct DataStack {
    items: Vec<ObjPtr>,
    max_depth: usize,
}

impl DataStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            items: Vec::new(),
            max_depth,
        }
    }

    pub fn depth(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, ptr: ObjPtr) -> Result<(), RplError> {
        if self.items.len() >= self.max_depth {
            return Err(RplError::StackOverflow);
        }
        self.items.push(ptr);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<ObjPtr, RplError> {
        self.items.pop().ok_or(RplError::StackUnderflow)
    }

    /// Drop the top `n` levels.
    pub fn pop_n(&mut self, n: usize) -> Result<(), RplError> {
        if n > self.items.len() {
            return Err(RplError::StackUnderflow);
        }
        self.items.truncate(self.items.len() - n);
        Ok(())
    }

    fn index_of(&self, level: usize) -> Result<usize, RplError> {
        if level == 0 || level > self.items.len() {
            return Err(RplError::StackUnderflow);
        }
        Ok(self.items.len() - level)
    }

    pub fn peek(&self, level: usize) -> Result<ObjPtr, RplError> {
        self.index_of(level).map(|i| self.items[i])
    }

    pub fn overwrite(&mut self, level: usize, ptr: ObjPtr) -> Result<(), RplError> {
        let i = self.index_of(level)?;
        self.items[i] = ptr;
        Ok(())
    }

    /// Remove `count` levels starting at `level` and going deeper.
    pub fn remove_at(&mut self, level: usize, count: usize) -> Result<(), RplError> {
        if level == 0 {
            return Err(RplError::StackUnderflow);
        }
        if count == 0 {
            return Ok(());
        }
        let last = level.checked_add(count - 1).ok_or(RplError::StackUnderflow)?;
        let deepest = self.index_of(last)?;
        self.items.drain(deepest..deepest + count);
        Ok(())
    }

    /// Insert `ptrs` so that they occupy levels `level..level + ptrs.len()`,
    /// with the last element of `ptrs` at `level`. Level 1 pushes; level
    /// `depth + 1` inserts below everything.
    pub fn insert_range(&mut self, level: usize, ptrs: &[ObjPtr]) -> Result<(), RplError> {
        if level == 0 || level > self.items.len() + 1 {
            return Err(RplError::StackUnderflow);
        }
        if self.items.len() + ptrs.len() > self.max_depth {
            return Err(RplError::StackOverflow);
        }
        let at = self.items.len() + 1 - level;
        self.items.splice(at..at, ptrs.iter().copied());
        Ok(())
    }

    /// Keep only the top `n` levels (fewer if the stack is shallower).
    pub fn keep_top(&mut self, n: usize) {
        let excess = self.items.len().saturating_sub(n);
        self.items.drain(..excess);
    }

    pub fn truncate(&mut self, depth: usize) {
        self.items.truncate(depth);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Entries from the bottom of the stack to the top.
    pub fn as_slice(&self) -> &[ObjPtr] {
        &self.items
    }

    pub(crate) fn replace(&mut self, items: Vec<ObjPtr>) {
        self.items = items;
    }
}

// ---- Return stack ----

/// Why a return-stack frame exists; decides what leaving it undoes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Plain call: return to `ip`.
    Call,
    /// Call that opened a local-variable frame, abandoned on return.
    LocalScope,
    /// Protected body of an error trap, removed on normal return.
    ErrorTrap,
    /// Caller state parked by a transparent run. Never returned through.
    Saved,
}

/// A return-stack frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Where execution continues when the frame is popped.
    pub ip: ObjPtr,
    pub kind: FrameKind,
}

impl Frame {
    pub fn call(ip: ObjPtr) -> Self {
        Frame {
            ip,
            kind: FrameKind::Call,
        }
    }
}

/// Return stack of frames.
#[derive(Debug, Clone)]
pub struct ReturnStack {
    frames: Vec<Frame>,
    max_depth: usize,
}

impl ReturnStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            frames: Vec::new(),
            max_depth,
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn push(&mut self, frame: Frame) -> Result<(), RplError> {
        if self.frames.len() >= self.max_depth {
            return Err(RplError::ReturnStackOverflow);
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Frame, RplError> {
        self.frames.pop().ok_or(RplError::EmptyReturnStack)
    }

    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn truncate(&mut self, depth: usize) {
        self.frames.truncate(depth);
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn as_slice(&self) -> &[Frame] {
        &self.frames
    }
}

// ---- LAM stack ----

/// One local binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LamEntry {
    /// Identifier object naming the local.
    pub name: ObjPtr,
    pub value: ObjPtr,
}

/// Depths of the LAM stack, used as rollback marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LamMark {
    pub entries: usize,
    pub frames: usize,
}

/// Local-variable bindings grouped in frames.
#[derive(Debug, Clone)]
pub struct LamStack {
    entries: Vec<LamEntry>,
    /// Index of the first entry of each frame.
    bases: Vec<usize>,
    max_entries: usize,
}

impl LamStack {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            bases: Vec::new(),
            max_entries,
        }
    }

    pub fn mark(&self) -> LamMark {
        LamMark {
            entries: self.entries.len(),
            frames: self.bases.len(),
        }
    }

    /// Roll back to an earlier mark.
    pub fn truncate(&mut self, mark: LamMark) {
        self.entries.truncate(mark.entries);
        self.bases.truncate(mark.frames);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.bases.clear();
    }

    /// Open a new, empty frame.
    pub fn open_frame(&mut self) {
        self.bases.push(self.entries.len());
    }

    /// Abandon the innermost frame and its bindings.
    pub fn close_frame(&mut self) {
        if let Some(base) = self.bases.pop() {
            self.entries.truncate(base);
        }
    }

    pub fn frame_count(&self) -> usize {
        self.bases.len()
    }

    /// Bind a value in the innermost frame.
    pub fn push(&mut self, entry: LamEntry) -> Result<(), RplError> {
        if self.bases.is_empty() {
            self.open_frame();
        }
        if self.entries.len() >= self.max_entries {
            return Err(RplError::StackOverflow);
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&LamEntry> {
        self.entries.get(index)
    }

    pub fn set_value(&mut self, index: usize, value: ObjPtr) -> Result<(), RplError> {
        let entry = self.entries.get_mut(index).ok_or(RplError::StackUnderflow)?;
        entry.value = value;
        Ok(())
    }

    /// Indices of entries visible for a lookup, innermost binding first.
    /// With `scan_parents` false only the innermost frame is searched.
    pub fn search_order(&self, scan_parents: bool) -> impl Iterator<Item = usize> {
        let floor = match (scan_parents, self.bases.last()) {
            (false, Some(&base)) => base,
            _ => 0,
        };
        (floor..self.entries.len()).rev()
    }

    pub fn entries(&self) -> &[LamEntry] {
        &self.entries
    }

    pub fn bases(&self) -> &[usize] {
        &self.bases
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ObjectStore;

    fn ptrs(n: usize) -> Vec<ObjPtr> {
        let mut store = ObjectStore::new(n, n);
        (0..n)
            .map(|_| ObjPtr::block(store.try_allocate(1).unwrap().unwrap()))
            .collect()
    }

    fn stack_of(items: &[ObjPtr]) -> DataStack {
        let mut s = DataStack::new(DEFAULT_DATA_DEPTH);
        for &p in items {
            s.push(p).unwrap();
        }
        s
    }

    #[test]
    fn levels_are_one_indexed_from_top() {
        let p = ptrs(3);
        let s = stack_of(&p);
        assert_eq!(s.peek(1).unwrap(), p[2]);
        assert_eq!(s.peek(3).unwrap(), p[0]);
        assert_eq!(s.peek(0), Err(RplError::StackUnderflow));
        assert_eq!(s.peek(4), Err(RplError::StackUnderflow));
    }

    #[test]
    fn pop_on_empty_underflows() {
        let mut s = DataStack::new(4);
        assert_eq!(s.pop(), Err(RplError::StackUnderflow));
        assert_eq!(s.pop_n(1), Err(RplError::StackUnderflow));
        assert_eq!(s.pop_n(0), Ok(()));
    }

    #[test]
    fn push_beyond_limit_overflows() {
        let p = ptrs(3);
        let mut s = DataStack::new(2);
        s.push(p[0]).unwrap();
        s.push(p[1]).unwrap();
        assert_eq!(s.push(p[2]), Err(RplError::StackOverflow));
    }

    #[test]
    fn remove_at_goes_deeper() {
        let p = ptrs(4);
        let mut s = stack_of(&p);
        s.remove_at(2, 2).unwrap();
        assert_eq!(s.as_slice(), &[p[0], p[3]]);
        assert_eq!(s.remove_at(2, 2), Err(RplError::StackUnderflow));
        assert_eq!(s.remove_at(0, 2), Err(RplError::StackUnderflow));
        assert_eq!(s.remove_at(1, usize::MAX), Err(RplError::StackUnderflow));
        assert_eq!(s.remove_at(0, 0), Err(RplError::StackUnderflow));
        assert_eq!(s.as_slice(), &[p[0], p[3]]);
    }

    #[test]
    fn insert_range_places_last_at_level() {
        let p = ptrs(5);
        let mut s = stack_of(&p[..3]);
        s.insert_range(2, &[p[3], p[4]]).unwrap();
        assert_eq!(s.as_slice(), &[p[0], p[1], p[3], p[4], p[2]]);
        assert_eq!(s.peek(2).unwrap(), p[4]);
    }

    #[test]
    fn insert_range_bounds() {
        let p = ptrs(2);
        let mut s = stack_of(&p[..1]);
        assert_eq!(s.insert_range(3, &[p[1]]), Err(RplError::StackUnderflow));
        s.insert_range(2, &[p[1]]).unwrap();
        assert_eq!(s.as_slice(), &[p[1], p[0]]);
    }

    #[test]
    fn keep_top_discards_deeper_levels() {
        let p = ptrs(4);
        let mut s = stack_of(&p);
        s.keep_top(2);
        assert_eq!(s.as_slice(), &[p[2], p[3]]);
        s.keep_top(5);
        assert_eq!(s.depth(), 2);
    }

    #[test]
    fn return_stack_pop_empty() {
        let mut rs = ReturnStack::new(2);
        assert_eq!(rs.pop(), Err(RplError::EmptyReturnStack));
        let p = ptrs(1)[0];
        rs.push(Frame::call(p)).unwrap();
        rs.push(Frame::call(p)).unwrap();
        assert_eq!(rs.push(Frame::call(p)), Err(RplError::ReturnStackOverflow));
    }

    #[test]
    fn lam_frames_scope_lookups() {
        let p = ptrs(4);
        let mut lams = LamStack::new(16);
        lams.open_frame();
        lams.push(LamEntry { name: p[0], value: p[1] }).unwrap();
        lams.open_frame();
        lams.push(LamEntry { name: p[2], value: p[3] }).unwrap();

        let inner: Vec<_> = lams.search_order(false).collect();
        assert_eq!(inner, vec![1]);
        let all: Vec<_> = lams.search_order(true).collect();
        assert_eq!(all, vec![1, 0]);

        lams.close_frame();
        assert_eq!(lams.frame_count(), 1);
        assert_eq!(lams.entries().len(), 1);
    }

    #[test]
    fn lam_truncate_to_mark() {
        let p = ptrs(2);
        let mut lams = LamStack::new(16);
        let mark = lams.mark();
        lams.open_frame();
        lams.push(LamEntry { name: p[0], value: p[1] }).unwrap();
        lams.truncate(mark);
        assert_eq!(lams.mark(), LamMark::default());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::store::ObjectStore;
    use proptest::prelude::*;

    proptest! {
        /// Removing a range and re-inserting it restores the stack.
        #[test]
        fn remove_then_insert_restores(depth in 1usize..20, level_seed in any::<usize>(), count_seed in any::<usize>()) {
            let mut store = ObjectStore::new(depth, depth);
            let items: Vec<_> = (0..depth)
                .map(|_| ObjPtr::block(store.try_allocate(1).unwrap().unwrap()))
                .collect();
            let mut s = DataStack::new(64);
            for &p in &items {
                s.push(p).unwrap();
            }
            let level = 1 + level_seed % depth;
            let count = 1 + count_seed % (depth - level + 1);

            let top = depth - level;
            let removed: Vec<_> = items[top + 1 - count..=top].to_vec();
            s.remove_at(level, count).unwrap();
            prop_assert_eq!(s.depth(), depth - count);
            s.insert_range(level, &removed).unwrap();
            prop_assert_eq!(s.as_slice(), &items[..]);
        }
    }
}
