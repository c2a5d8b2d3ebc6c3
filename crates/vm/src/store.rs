//! Object store: a relocatable arena of cells.
//!
//! Objects live in blocks carved out of one contiguous `Vec<Word>`. Blocks
//! are reached through a slot table: a [`Handle`] stores the slot index and
//! the slot's generation, so compaction can slide blocks around by updating
//! the table alone, and a handle to a reclaimed block is detected instead of
//! aliasing whatever moved into its cells.
//!
//! The store never decides what is alive. [`ObjectStore::compact`] takes the
//! set of reachable slots computed by the runtime from its roots.

use rpl_common::object::object_len;
use rpl_common::{LibId, Word, MAX_PAYLOAD};

use crate::error::RplError;

/// Reference to an allocated block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    /// Slot index in the block table.
    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Reference to an object: a block plus the cell offset where the object
/// starts. Offsets other than 0 point at elements embedded in a composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjPtr {
    pub handle: Handle,
    pub offset: u32,
}

impl ObjPtr {
    /// Pointer to the first object of a block.
    pub fn block(handle: Handle) -> Self {
        ObjPtr { handle, offset: 0 }
    }

    /// Pointer `cells` further into the same block.
    pub fn advance(self, cells: usize) -> Self {
        ObjPtr {
            handle: self.handle,
            offset: self.offset + cells as u32,
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    start: usize,
    len: usize,
    generation: u32,
    live: bool,
    pinned: bool,
}

/// Usage figures reported by `MEM` and the integrity checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub used: usize,
    pub capacity: usize,
    pub max_capacity: usize,
    pub live_blocks: usize,
    pub compactions: u64,
}

/// The relocatable arena.
pub struct ObjectStore {
    cells: Vec<Word>,
    top: usize,
    max_cells: usize,
    slots: Vec<Slot>,
    free_slots: Vec<u32>,
    compactions: u64,
}

impl ObjectStore {
    /// Create a store with `initial` committed cells that may grow up to `max_cells`.
    pub fn new(initial: usize, max_cells: usize) -> Self {
        let max_cells = max_cells.max(initial);
        Self {
            cells: vec![Word::default(); initial],
            top: 0,
            max_cells,
            slots: Vec::new(),
            free_slots: Vec::new(),
            compactions: 0,
        }
    }

    /// Allocate `len` cells if they fit in the committed arena. Returns
    /// `Ok(None)` when the arena is full; the caller decides whether to
    /// compact or grow.
    ///
    /// The block is initialised as a placeholder object of the reserved
    /// library so `size_of` reports exactly `len` before the caller fills it.
    pub fn try_allocate(&mut self, len: usize) -> Result<Option<Handle>, RplError> {
        if len == 0 || len > MAX_PAYLOAD as usize + 1 {
            return Err(RplError::InvalidSize(len));
        }
        if self.top + len > self.cells.len() {
            return Ok(None);
        }
        let start = self.top;
        self.top += len;
        self.cells[start] = Word::prolog(LibId::RESERVED, (len - 1) as u32);
        for cell in &mut self.cells[start + 1..start + len] {
            *cell = Word::default();
        }
        let slot = Slot {
            start,
            len,
            generation: 0,
            live: true,
            pinned: false,
        };
        let index = match self.free_slots.pop() {
            Some(index) => {
                let generation = self.slots[index as usize].generation;
                self.slots[index as usize] = Slot { generation, ..slot };
                index
            }
            None => {
                self.slots.push(slot);
                (self.slots.len() - 1) as u32
            }
        };
        Ok(Some(Handle {
            index,
            generation: self.slots[index as usize].generation,
        }))
    }

    /// Grow the committed arena so that `extra` more cells fit, doubling
    /// where possible. Fails once the configured maximum is reached.
    pub fn grow(&mut self, extra: usize) -> Result<(), RplError> {
        let needed = self.top + extra;
        if needed > self.max_cells {
            return Err(RplError::MemoryExhausted { requested: extra });
        }
        let target = (self.cells.len() * 2).max(needed).min(self.max_cells);
        self.cells.resize(target, Word::default());
        Ok(())
    }

    /// Free cells left in the committed arena.
    pub fn available(&self) -> usize {
        self.cells.len() - self.top
    }

    /// Slide every reachable block down to the bottom of the arena and
    /// reclaim the rest. `reachable[i]` marks slot `i`; pinned blocks always
    /// survive. Returns the number of cells reclaimed.
    pub fn compact(&mut self, reachable: &[bool]) -> usize {
        let mut order: Vec<usize> = (0..self.slots.len())
            .filter(|&i| self.slots[i].live)
            .collect();
        order.sort_by_key(|&i| self.slots[i].start);

        let before = self.top;
        let mut dest = 0;
        for i in order {
            let keep = self.slots[i].pinned || reachable.get(i).copied().unwrap_or(false);
            let slot = &mut self.slots[i];
            if !keep {
                slot.live = false;
                slot.generation = slot.generation.wrapping_add(1);
                self.free_slots.push(i as u32);
                continue;
            }
            if slot.start != dest {
                self.cells.copy_within(slot.start..slot.start + slot.len, dest);
                slot.start = dest;
            }
            dest += slot.len;
        }
        for cell in &mut self.cells[dest..self.top] {
            *cell = Word::default();
        }
        self.top = dest;
        self.compactions += 1;
        before - dest
    }

    fn slot(&self, handle: Handle) -> Result<&Slot, RplError> {
        match self.slots.get(handle.index()) {
            Some(slot) if slot.live && slot.generation == handle.generation => Ok(slot),
            _ => Err(RplError::StaleReference),
        }
    }

    /// Whether a handle still refers to a live block.
    pub fn is_live(&self, handle: Handle) -> bool {
        self.slot(handle).is_ok()
    }

    /// All cells of a block.
    pub fn block(&self, handle: Handle) -> Result<&[Word], RplError> {
        let slot = self.slot(handle)?;
        Ok(&self.cells[slot.start..slot.start + slot.len])
    }

    /// Mutable cells of a block, used to fill freshly allocated objects.
    pub fn block_mut(&mut self, handle: Handle) -> Result<&mut [Word], RplError> {
        let (start, len) = {
            let slot = self.slot(handle)?;
            (slot.start, slot.len)
        };
        Ok(&mut self.cells[start..start + len])
    }

    /// The object `ptr` refers to, checked to fit inside its block.
    pub fn object(&self, ptr: ObjPtr) -> Result<&[Word], RplError> {
        let block = self.block(ptr.handle)?;
        let rest = block
            .get(ptr.offset as usize..)
            .filter(|rest| !rest.is_empty())
            .ok_or(RplError::StaleReference)?;
        let len = object_len(rest)?;
        Ok(&rest[..len])
    }

    /// First cell of the object at `ptr`.
    pub fn word_at(&self, ptr: ObjPtr) -> Result<Word, RplError> {
        let block = self.block(ptr.handle)?;
        block
            .get(ptr.offset as usize)
            .copied()
            .ok_or(RplError::StaleReference)
    }

    /// Size in cells of the object at `ptr`.
    pub fn size_of(&self, ptr: ObjPtr) -> Result<usize, RplError> {
        self.object(ptr).map(<[Word]>::len)
    }

    /// Apply a type predicate to the object's prolog.
    pub fn is_kind(&self, ptr: ObjPtr, predicate: impl Fn(Word) -> bool) -> bool {
        self.word_at(ptr).map(predicate).unwrap_or(false)
    }

    /// Keep a block alive across every compaction.
    pub fn pin(&mut self, handle: Handle) -> Result<(), RplError> {
        self.slot(handle)?;
        self.slots[handle.index()].pinned = true;
        Ok(())
    }

    /// Let a pinned block be reclaimed again once unreachable.
    pub fn unpin(&mut self, handle: Handle) {
        if self.slot(handle).is_ok() {
            self.slots[handle.index()].pinned = false;
        }
    }

    pub fn is_pinned(&self, handle: Handle) -> bool {
        self.slot(handle).map(|s| s.pinned).unwrap_or(false)
    }

    /// Number of entries in the slot table (live or free).
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Handles of every live block, in arena order.
    pub fn live_blocks(&self) -> Vec<Handle> {
        let mut live: Vec<(usize, Handle)> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.live)
            .map(|(i, s)| {
                (
                    s.start,
                    Handle {
                        index: i as u32,
                        generation: s.generation,
                    },
                )
            })
            .collect();
        live.sort_by_key(|(start, _)| *start);
        live.into_iter().map(|(_, h)| h).collect()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            used: self.top,
            capacity: self.cells.len(),
            max_capacity: self.max_cells,
            live_blocks: self.slots.iter().filter(|s| s.live).count(),
            compactions: self.compactions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpl_common::object::pack_i64;

    fn store_words(store: &mut ObjectStore, words: &[Word]) -> Handle {
        let h = store.try_allocate(words.len()).unwrap().unwrap();
        store.block_mut(h).unwrap().copy_from_slice(words);
        h
    }

    #[test]
    fn allocate_reports_exact_size() {
        let mut store = ObjectStore::new(64, 64);
        for k in [1, 2, 7, 30] {
            let h = store.try_allocate(k).unwrap().unwrap();
            assert_eq!(store.size_of(ObjPtr::block(h)).unwrap(), k);
        }
    }

    #[test]
    fn zero_size_is_invalid() {
        let mut store = ObjectStore::new(8, 8);
        assert_eq!(store.try_allocate(0), Err(RplError::InvalidSize(0)));
    }

    #[test]
    fn full_arena_returns_none() {
        let mut store = ObjectStore::new(4, 4);
        assert!(store.try_allocate(3).unwrap().is_some());
        assert!(store.try_allocate(2).unwrap().is_none());
    }

    #[test]
    fn grow_respects_maximum() {
        let mut store = ObjectStore::new(4, 10);
        store.try_allocate(4).unwrap().unwrap();
        store.grow(4).unwrap();
        assert!(store.try_allocate(4).unwrap().is_some());
        assert_eq!(
            store.grow(4),
            Err(RplError::MemoryExhausted { requested: 4 })
        );
    }

    #[test]
    fn compaction_preserves_reachable_payload() {
        let mut store = ObjectStore::new(32, 32);
        let a = store_words(&mut store, &pack_i64(LibId::INTEGER, 1));
        let b = store_words(&mut store, &pack_i64(LibId::INTEGER, 2));
        let c = store_words(&mut store, &pack_i64(LibId::INTEGER, 3));

        let mut reachable = vec![false; store.slot_count()];
        reachable[a.index()] = true;
        reachable[c.index()] = true;
        let freed = store.compact(&reachable);

        assert_eq!(freed, 3);
        assert_eq!(store.block(a).unwrap(), &pack_i64(LibId::INTEGER, 1));
        assert_eq!(store.block(c).unwrap(), &pack_i64(LibId::INTEGER, 3));
        assert_eq!(store.block(b), Err(RplError::StaleReference));
        assert_eq!(store.stats().used, 6);
    }

    #[test]
    fn reclaimed_slot_reuse_does_not_revive_old_handle() {
        let mut store = ObjectStore::new(16, 16);
        let old = store.try_allocate(2).unwrap().unwrap();
        store.compact(&[]);
        let new = store.try_allocate(2).unwrap().unwrap();
        assert_eq!(old.index(), new.index());
        assert!(!store.is_live(old));
        assert!(store.is_live(new));
    }

    #[test]
    fn pinned_blocks_survive_without_marks() {
        let mut store = ObjectStore::new(16, 16);
        let h = store.try_allocate(3).unwrap().unwrap();
        store.pin(h).unwrap();
        store.compact(&[]);
        assert!(store.is_live(h));
        assert!(store.is_pinned(h));
    }

    #[test]
    fn inner_pointer_resolves_embedded_object() {
        let mut store = ObjectStore::new(16, 16);
        let mut words = vec![Word::prolog(LibId::LIST, 4)];
        words.push(Word::command(LibId::STACK, 0));
        words.extend_from_slice(&pack_i64(LibId::INTEGER, 5));
        let h = store_words(&mut store, &words);
        let inner = ObjPtr::block(h).advance(2);
        assert_eq!(store.object(inner).unwrap(), &pack_i64(LibId::INTEGER, 5));
        assert!(store.is_kind(inner, |w| w.library() == LibId::INTEGER));
    }

    #[test]
    fn pointer_past_block_end_is_rejected() {
        let mut store = ObjectStore::new(16, 16);
        let h = store.try_allocate(2).unwrap().unwrap();
        assert_eq!(
            store.object(ObjPtr::block(h).advance(2)),
            Err(RplError::StaleReference)
        );
    }

    #[test]
    fn live_blocks_in_arena_order_after_compaction() {
        let mut store = ObjectStore::new(16, 16);
        let a = store.try_allocate(2).unwrap().unwrap();
        let b = store.try_allocate(2).unwrap().unwrap();
        let mut reachable = vec![false; store.slot_count()];
        reachable[b.index()] = true;
        store.compact(&reachable);
        let c = store.try_allocate(2).unwrap().unwrap();
        assert_eq!(store.live_blocks(), vec![b, c]);
        assert_eq!(c.index(), a.index());
    }
}
