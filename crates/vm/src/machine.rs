//! Runtime state: store, stacks, registry and execution context.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rpl_common::{LibId, Word};
use tracing::debug;

use crate::context::{ExecutionContext, HaltFlags, HaltRecord, SystemFlags};
use crate::error::{ArithmeticFault, RplError};
use crate::library::Library;
use crate::registry::Registry;
use crate::rom::{rom_hash, RomEntry, RomId};
use crate::roots::{RootSet, RootSlot};
use crate::snapshot::{SnapshotStack, DEFAULT_SNAPSHOT_CAPACITY};
use crate::stack::{
    DataStack, LamStack, ReturnStack, DEFAULT_DATA_DEPTH, DEFAULT_LAM_DEPTH, DEFAULT_RETURN_DEPTH,
};
use crate::store::{ObjPtr, ObjectStore};
use crate::undo::UndoState;

/// Default arena sizes, in cells.
pub const DEFAULT_INITIAL_CELLS: usize = 4096;
pub const DEFAULT_MAX_CELLS: usize = 1 << 20;

/// Default number of undo levels kept for the interactive environment.
pub const DEFAULT_UNDO_LEVELS: usize = 8;

/// Runtime limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub initial_cells: usize,
    pub max_cells: usize,
    pub data_depth: usize,
    pub return_depth: usize,
    pub lam_depth: usize,
    pub undo_levels: usize,
    pub snapshot_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            initial_cells: DEFAULT_INITIAL_CELLS,
            max_cells: DEFAULT_MAX_CELLS,
            data_depth: DEFAULT_DATA_DEPTH,
            return_depth: DEFAULT_RETURN_DEPTH,
            lam_depth: DEFAULT_LAM_DEPTH,
            undo_levels: DEFAULT_UNDO_LEVELS,
            snapshot_capacity: DEFAULT_SNAPSHOT_CAPACITY,
        }
    }
}

/// Lets another thread ask the engine to stop at the next instruction.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle(Arc<AtomicBool>);

impl InterruptHandle {
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub(crate) fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// Lifecycle of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    /// A program is halted at this instruction and can be resumed.
    Halted(ObjPtr),
    /// EXITRPL was executed.
    CleanExit,
}

/// Where a reference held by the runtime lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefOrigin {
    DataStack(usize),
    ReturnStack(usize),
    LamName(usize),
    LamValue(usize),
    Snapshot(usize),
    Root(RootSlot),
    Rom(RomId),
    EndOfCode,
    Ip,
    Current,
    Blame,
    ExceptionAt,
    TrapHandler(usize),
    TrapResume(usize),
    Halt(usize),
    HaltTrap(usize),
}

/// The RPL runtime.
pub struct Runtime {
    pub(crate) store: ObjectStore,
    pub(crate) roots: RootSet,
    pub(crate) data: DataStack,
    pub(crate) rstack: ReturnStack,
    pub(crate) lams: LamStack,
    pub(crate) snapshots: SnapshotStack,
    pub(crate) registry: Registry,
    pub(crate) ctx: ExecutionContext,
    pub(crate) halts: Vec<HaltRecord>,
    pub(crate) halt_flags: HaltFlags,
    pub(crate) flags: SystemFlags,
    pub(crate) rom: Vec<RomEntry>,
    pub(crate) end_of_code: ObjPtr,
    pub(crate) undo: UndoState,
    pub(crate) interrupt: InterruptHandle,
    pub(crate) state: EngineState,
    config: RuntimeConfig,
}

impl Runtime {
    /// Create a runtime with the engine's own libraries installed.
    pub fn new(config: RuntimeConfig) -> Result<Self, RplError> {
        let mut store = ObjectStore::new(config.initial_cells, config.max_cells);
        let end = store
            .try_allocate(1)?
            .ok_or(RplError::MemoryExhausted { requested: 1 })?;
        store.block_mut(end)?[0] = crate::libs::system::END_OF_CODE;
        store.pin(end)?;

        let mut rt = Self {
            store,
            roots: RootSet::new(),
            data: DataStack::new(config.data_depth),
            rstack: ReturnStack::new(config.return_depth),
            lams: LamStack::new(config.lam_depth),
            snapshots: SnapshotStack::new(config.snapshot_capacity.max(config.undo_levels + 4)),
            registry: Registry::new(),
            ctx: ExecutionContext::default(),
            halts: Vec::new(),
            halt_flags: HaltFlags::empty(),
            flags: SystemFlags::empty(),
            rom: Vec::new(),
            end_of_code: ObjPtr::block(end),
            undo: UndoState::new(config.undo_levels),
            interrupt: InterruptHandle::default(),
            state: EngineState::Idle,
            config,
        };
        crate::libs::install_builtins(&mut rt)?;
        Ok(rt)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    // ---- Accessors ----

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    pub fn data(&self) -> &DataStack {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut DataStack {
        &mut self.data
    }

    pub fn return_stack(&self) -> &ReturnStack {
        &self.rstack
    }

    pub fn return_stack_mut(&mut self) -> &mut ReturnStack {
        &mut self.rstack
    }

    pub fn lams(&self) -> &LamStack {
        &self.lams
    }

    pub fn lams_mut(&mut self) -> &mut LamStack {
        &mut self.lams
    }

    pub fn snapshots(&self) -> &SnapshotStack {
        &self.snapshots
    }

    pub fn snapshots_mut(&mut self) -> &mut SnapshotStack {
        &mut self.snapshots
    }

    pub fn roots(&self) -> &RootSet {
        &self.roots
    }

    pub fn roots_mut(&mut self) -> &mut RootSet {
        &mut self.roots
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut ExecutionContext {
        &mut self.ctx
    }

    pub fn halts(&self) -> &[HaltRecord] {
        &self.halts
    }

    pub fn halt_flags(&self) -> HaltFlags {
        self.halt_flags
    }

    /// Read and clear the host-facing outcome flags, keeping `HALTED`.
    pub fn take_halt_flags(&mut self) -> HaltFlags {
        let flags = self.halt_flags;
        self.halt_flags &= HaltFlags::HALTED;
        flags
    }

    pub fn system_flags(&self) -> SystemFlags {
        self.flags
    }

    pub fn set_system_flags(&mut self, flags: SystemFlags) {
        self.flags = flags;
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// The pinned cell holding ENDOFCODE.
    pub fn end_of_code(&self) -> ObjPtr {
        self.end_of_code
    }

    // ---- Objects ----

    /// Allocate `len` cells, compacting and then growing the arena if needed.
    /// Every handle not reachable from a root may be reclaimed by this call.
    pub fn allocate(&mut self, len: usize) -> Result<ObjPtr, RplError> {
        if let Some(h) = self.store.try_allocate(len)? {
            return Ok(ObjPtr::block(h));
        }
        self.compact();
        if let Some(h) = self.store.try_allocate(len)? {
            return Ok(ObjPtr::block(h));
        }
        self.store.grow(len)?;
        self.store
            .try_allocate(len)?
            .map(ObjPtr::block)
            .ok_or(RplError::MemoryExhausted { requested: len })
    }

    /// Allocate a block and copy `words` into it.
    pub fn store_object(&mut self, words: &[Word]) -> Result<ObjPtr, RplError> {
        let ptr = self.allocate(words.len())?;
        self.store.block_mut(ptr.handle)?.copy_from_slice(words);
        Ok(ptr)
    }

    /// Store `words` and push the new object.
    pub fn push_object(&mut self, words: &[Word]) -> Result<(), RplError> {
        let ptr = self.store_object(words)?;
        self.data.push(ptr)
    }

    /// Push the object currently being executed (data objects met in the
    /// instruction stream push themselves).
    pub fn push_current(&mut self) -> Result<(), RplError> {
        let ptr = self.ctx.current.ok_or(RplError::StackUnderflow)?;
        self.data.push(ptr)
    }

    pub fn object(&self, ptr: ObjPtr) -> Result<&[Word], RplError> {
        self.store.object(ptr)
    }

    pub fn word_at(&self, ptr: ObjPtr) -> Result<Word, RplError> {
        self.store.word_at(ptr)
    }

    pub fn size_of(&self, ptr: ObjPtr) -> Result<usize, RplError> {
        self.store.size_of(ptr)
    }

    /// Object at data stack `level`.
    pub fn peek_object(&self, level: usize) -> Result<&[Word], RplError> {
        self.store.object(self.data.peek(level)?)
    }

    /// Library id of the object at data stack `level`.
    pub fn library_at(&self, level: usize) -> Result<LibId, RplError> {
        Ok(self.store.word_at(self.data.peek(level)?)?.library())
    }

    /// Library owning the object at `ptr`.
    pub fn library_of(&self, ptr: ObjPtr) -> Result<Arc<dyn Library>, RplError> {
        let word = self.store.word_at(ptr)?;
        Ok(self.registry.resolve(word.library())?.clone())
    }

    /// Reclaim every block not reachable from a root. Returns the cells freed.
    pub fn compact(&mut self) -> usize {
        let mut marks = vec![false; self.store.slot_count()];
        for (_, ptr) in self.references() {
            if let Some(m) = marks.get_mut(ptr.handle.index()) {
                *m = true;
            }
        }
        let freed = self.store.compact(&marks);
        debug!(freed, used = self.store.stats().used, "compacted object store");
        freed
    }

    /// Every object reference the runtime holds, with where it lives.
    pub fn references(&self) -> Vec<(RefOrigin, ObjPtr)> {
        let mut refs = Vec::new();
        let depth = self.data.depth();
        for (i, &p) in self.data.as_slice().iter().enumerate() {
            refs.push((RefOrigin::DataStack(depth - i), p));
        }
        for (i, f) in self.rstack.as_slice().iter().enumerate() {
            refs.push((RefOrigin::ReturnStack(i), f.ip));
        }
        for (i, e) in self.lams.entries().iter().enumerate() {
            refs.push((RefOrigin::LamName(i), e.name));
            refs.push((RefOrigin::LamValue(i), e.value));
        }
        for (level, p) in self.snapshots.references() {
            refs.push((RefOrigin::Snapshot(level), p));
        }
        for (slot, p) in self.roots.iter() {
            refs.push((RefOrigin::Root(slot), p));
        }
        for entry in &self.rom {
            refs.push((RefOrigin::Rom(entry.id), entry.ptr));
        }
        refs.push((RefOrigin::EndOfCode, self.end_of_code));
        let registers = [
            (RefOrigin::Ip, self.ctx.ip),
            (RefOrigin::Current, self.ctx.current),
            (RefOrigin::Blame, self.ctx.blame),
            (RefOrigin::ExceptionAt, self.ctx.exception.at),
        ];
        refs.extend(registers.into_iter().filter_map(|(o, p)| p.map(|p| (o, p))));
        for (i, t) in self.ctx.traps.iter().enumerate() {
            refs.push((RefOrigin::TrapHandler(i), t.handler));
            refs.push((RefOrigin::TrapResume(i), t.resume));
        }
        for (i, h) in self.halts.iter().enumerate() {
            refs.push((RefOrigin::Halt(i), h.ip));
            for t in &h.traps {
                refs.push((RefOrigin::HaltTrap(i), t.handler));
                refs.push((RefOrigin::HaltTrap(i), t.resume));
            }
        }
        refs
    }

    // ---- Libraries ----

    /// Register a library, load its ROM table into pinned blocks and run its
    /// install hook.
    pub fn install_library(&mut self, lib: Arc<dyn Library>) -> Result<(), RplError> {
        self.registry.register(lib.clone())?;
        let primary = lib.ids().first().copied().unwrap_or(LibId::RESERVED);
        for (index, words) in lib.rom_objects().iter().enumerate() {
            let ptr = self.store_object(words)?;
            self.store.pin(ptr.handle)?;
            self.rom.push(RomEntry {
                id: RomId {
                    lib: primary,
                    index: index as u32,
                    hash: rom_hash(words),
                },
                ptr,
            });
        }
        lib.install(self)
    }

    /// Run the remove hook and unregister. ROM blocks are unpinned and go
    /// away once nothing references them.
    pub fn remove_library(&mut self, id: LibId) -> Option<Arc<dyn Library>> {
        let lib = self.registry.get(id)?.clone();
        lib.remove(self);
        let ids = lib.ids();
        let (gone, kept): (Vec<RomEntry>, Vec<RomEntry>) =
            self.rom.iter().partition(|e| ids.contains(&e.id.lib));
        self.rom = kept;
        for entry in gone {
            self.store.unpin(entry.ptr.handle);
        }
        self.registry.unregister(id)
    }

    /// ROM object `index` of library `lib`.
    pub fn rom_object(&self, lib: LibId, index: u32) -> Result<ObjPtr, RplError> {
        self.rom
            .iter()
            .find(|e| e.id.lib == lib && e.id.index == index)
            .map(|e| e.ptr)
            .ok_or(RplError::UnknownLibrary(lib))
    }

    /// ROM id of a pointer into a ROM block.
    pub fn rom_id(&self, ptr: ObjPtr) -> Option<RomId> {
        self.rom.iter().find(|e| e.ptr == ptr).map(|e| e.id)
    }

    /// Resolve a ROM id, refusing ids whose content hash no longer matches.
    pub fn rom_pointer(&self, id: RomId) -> Result<ObjPtr, RplError> {
        let entry = self
            .rom
            .iter()
            .find(|e| e.id.lib == id.lib && e.id.index == id.index)
            .ok_or(RplError::UnknownLibrary(id.lib))?;
        if entry.id.hash != id.hash {
            return Err(RplError::CorruptObject(format!(
                "ROM object {}:{} does not match its id",
                id.lib, id.index
            )));
        }
        Ok(entry.ptr)
    }

    pub fn rom_entries(&self) -> &[RomEntry] {
        &self.rom
    }

    /// Text of an error, using the owning library's messages where it has them.
    pub fn error_message(&self, error: &RplError) -> String {
        if let RplError::Library { lib, code } = error {
            if let Some(text) = self.registry.get(*lib).and_then(|l| l.message(*code)) {
                return text.to_string();
            }
        }
        error.to_string()
    }

    // ---- Arithmetic status ----

    /// Report an arithmetic fault. Returns `Ok` when the system flags mask
    /// it, after setting the matching sticky flag; the caller then pushes the
    /// IEEE-style result (±∞ or 0).
    pub fn check_arithmetic(
        &mut self,
        fault: ArithmeticFault,
        negative: bool,
    ) -> Result<(), RplError> {
        let (mask, sticky) = match fault {
            ArithmeticFault::InfiniteResult => {
                (SystemFlags::INFINITE_NOT_ERROR, SystemFlags::INFINITE)
            }
            ArithmeticFault::Overflow => (SystemFlags::OVERFLOW_NOT_ERROR, SystemFlags::OVERFLOW),
            ArithmeticFault::Underflow if negative => {
                (SystemFlags::UNDERFLOW_NOT_ERROR, SystemFlags::NEG_UNDERFLOW)
            }
            ArithmeticFault::Underflow => {
                (SystemFlags::UNDERFLOW_NOT_ERROR, SystemFlags::POS_UNDERFLOW)
            }
            ArithmeticFault::UndefinedResult => return Err(RplError::Arithmetic(fault)),
        };
        if self.flags.contains(mask) {
            self.flags |= sticky;
            Ok(())
        } else {
            Err(RplError::Arithmetic(fault))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpl_common::object::pack_i64;

    fn small() -> Runtime {
        Runtime::new(RuntimeConfig {
            initial_cells: 16,
            max_cells: 32,
            ..RuntimeConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn allocate_compacts_before_growing() {
        let mut rt = small();
        let keep = rt.store_object(&pack_i64(LibId::INTEGER, 7)).unwrap();
        rt.data_mut().push(keep).unwrap();
        let cap = rt.store().stats().capacity;
        for _ in 0..20 {
            rt.allocate(3).unwrap();
        }
        assert!(rt.store().stats().compactions > 0);
        assert!(rt.store().stats().capacity <= 32);
        assert!(cap <= rt.store().stats().capacity);
        assert_eq!(rt.object(keep).unwrap(), &pack_i64(LibId::INTEGER, 7));
    }

    #[test]
    fn allocation_beyond_maximum_is_exhaustion() {
        let mut rt = small();
        assert_eq!(
            rt.allocate(64),
            Err(RplError::MemoryExhausted { requested: 64 })
        );
    }

    #[test]
    fn unrooted_handle_goes_stale_after_compaction() {
        let mut rt = small();
        let lost = rt.store_object(&pack_i64(LibId::INTEGER, 1)).unwrap();
        rt.compact();
        assert_eq!(rt.object(lost), Err(RplError::StaleReference));
    }

    #[test]
    fn root_slot_keeps_object_alive() {
        let mut rt = small();
        let kept = rt.store_object(&pack_i64(LibId::INTEGER, 1)).unwrap();
        rt.roots_mut().set(RootSlot::Scratch1, kept);
        rt.compact();
        assert_eq!(rt.object(kept).unwrap(), &pack_i64(LibId::INTEGER, 1));
    }

    #[test]
    fn end_of_code_is_pinned() {
        let mut rt = small();
        rt.compact();
        let eoc = rt.end_of_code();
        assert_eq!(
            rt.word_at(eoc).unwrap(),
            crate::libs::system::END_OF_CODE
        );
    }

    #[test]
    fn masked_infinity_sets_sticky_flag() {
        let mut rt = small();
        assert_eq!(
            rt.check_arithmetic(ArithmeticFault::InfiniteResult, false),
            Err(RplError::Arithmetic(ArithmeticFault::InfiniteResult))
        );
        rt.set_system_flags(SystemFlags::INFINITE_NOT_ERROR);
        rt.check_arithmetic(ArithmeticFault::InfiniteResult, false)
            .unwrap();
        assert!(rt.system_flags().contains(SystemFlags::INFINITE));
    }

    #[test]
    fn undefined_result_is_never_masked() {
        let mut rt = small();
        rt.set_system_flags(SystemFlags::all());
        assert!(rt
            .check_arithmetic(ArithmeticFault::UndefinedResult, false)
            .is_err());
    }

    #[test]
    fn library_error_messages() {
        let rt = small();
        let e = RplError::Library {
            lib: LibId(999),
            code: 3,
        };
        assert_eq!(rt.error_message(&e), "library 999 error 3");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::roots::ALL_ROOT_SLOTS;
    use crate::stack::LamEntry;
    use proptest::prelude::*;

    /// Where a freshly stored object is kept alive.
    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Keep {
        Stack,
        Root,
        Snapshot,
        Local,
        Nowhere,
    }

    fn keep() -> impl Strategy<Value = Keep> {
        prop_oneof![
            Just(Keep::Stack),
            Just(Keep::Root),
            Just(Keep::Snapshot),
            Just(Keep::Local),
            Just(Keep::Nowhere),
        ]
    }

    /// A `len`-cell object whose data cells are distinct per `seed`.
    fn payload(len: usize, seed: u32) -> Vec<Word> {
        let mut words = vec![Word::prolog(LibId::RESERVED, len as u32 - 1)];
        words.extend((1..len as u32).map(|i| Word(seed.wrapping_mul(1000).wrapping_add(i))));
        words
    }

    proptest! {
        /// Compaction keeps exactly the reachable objects, at their exact
        /// sizes and with their cells unchanged.
        #[test]
        fn compaction_keeps_rooted_objects_intact(
            objects in prop::collection::vec((1usize..20, keep()), 1..40),
        ) {
            let mut rt = Runtime::new(RuntimeConfig {
                initial_cells: 64,
                max_cells: 4096,
                ..RuntimeConfig::default()
            })
            .unwrap();
            rt.compact();
            let baseline = rt.store().stats().live_blocks;

            let mut free_slots = ALL_ROOT_SLOTS.to_vec();
            let mut stacked = Vec::new();
            let mut kept = Vec::new();
            let mut lost = Vec::new();
            for (seed, &(len, keep)) in objects.iter().enumerate() {
                let words = payload(len, seed as u32);
                let ptr = rt.store_object(&words).unwrap();
                let keep = match keep {
                    Keep::Root if free_slots.is_empty() => Keep::Stack,
                    other => other,
                };
                match keep {
                    Keep::Stack => {
                        rt.data_mut().push(ptr).unwrap();
                        stacked.push(ptr);
                    }
                    Keep::Root => {
                        let slot = free_slots.pop().unwrap();
                        rt.roots_mut().set(slot, ptr);
                    }
                    // Held on the stack until the snapshot is taken below.
                    Keep::Snapshot => rt.data_mut().push(ptr).unwrap(),
                    Keep::Local => {
                        let name = rt.end_of_code();
                        rt.lams_mut().push(LamEntry { name, value: ptr }).unwrap();
                    }
                    Keep::Nowhere => {
                        lost.push(ptr);
                        continue;
                    }
                }
                kept.push((ptr, words));
            }
            rt.snapshots.take(&rt.data);
            rt.data_mut().clear();
            for &ptr in &stacked {
                rt.data_mut().push(ptr).unwrap();
            }

            rt.compact();
            prop_assert_eq!(rt.store().stats().live_blocks, baseline + kept.len());
            for (ptr, words) in &kept {
                prop_assert_eq!(rt.size_of(*ptr).unwrap(), words.len());
                prop_assert_eq!(rt.object(*ptr).unwrap(), &words[..]);
            }
            for ptr in lost {
                prop_assert_eq!(rt.object(ptr), Err(RplError::StaleReference));
            }
        }
    }
}
