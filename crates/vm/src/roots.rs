//! Named root slots.
//!
//! A handler that allocates more than once keeps its intermediate objects
//! in a root slot so the compaction triggered by the next allocation does not
//! reclaim them. Stacks, snapshots and the execution context are roots too;
//! the runtime enumerates all of them when it compacts.

use crate::store::ObjPtr;

/// The fixed set of root slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootSlot {
    Scratch1,
    Scratch2,
    Scratch3,
    Scratch4,
    /// Object installed as the current entry point.
    Entry,
    /// Last object produced by the host (e.g. the compiled line).
    Result,
}

/// All root slots, in table order.
pub const ALL_ROOT_SLOTS: [RootSlot; 6] = [
    RootSlot::Scratch1,
    RootSlot::Scratch2,
    RootSlot::Scratch3,
    RootSlot::Scratch4,
    RootSlot::Entry,
    RootSlot::Result,
];

/// Root slot table.
#[derive(Debug, Default, Clone)]
pub struct RootSet {
    slots: [Option<ObjPtr>; ALL_ROOT_SLOTS.len()],
}

impl RootSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, slot: RootSlot, ptr: ObjPtr) {
        self.slots[slot as usize] = Some(ptr);
    }

    pub fn get(&self, slot: RootSlot) -> Option<ObjPtr> {
        self.slots[slot as usize]
    }

    /// Clear a slot, returning what it held.
    pub fn take(&mut self, slot: RootSlot) -> Option<ObjPtr> {
        self.slots[slot as usize].take()
    }

    pub fn clear(&mut self) {
        self.slots = Default::default();
    }

    /// Occupied slots.
    pub fn iter(&self) -> impl Iterator<Item = (RootSlot, ObjPtr)> + '_ {
        ALL_ROOT_SLOTS
            .iter()
            .zip(self.slots.iter())
            .filter_map(|(&slot, ptr)| ptr.map(|p| (slot, p)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ObjectStore;

    #[test]
    fn set_get_take() {
        let mut store = ObjectStore::new(8, 8);
        let h = store.try_allocate(1).unwrap().unwrap();
        let ptr = ObjPtr::block(h);

        let mut roots = RootSet::new();
        assert_eq!(roots.get(RootSlot::Scratch2), None);
        roots.set(RootSlot::Scratch2, ptr);
        assert_eq!(roots.get(RootSlot::Scratch2), Some(ptr));
        assert_eq!(roots.iter().count(), 1);
        assert_eq!(roots.take(RootSlot::Scratch2), Some(ptr));
        assert_eq!(roots.iter().count(), 0);
    }
}
