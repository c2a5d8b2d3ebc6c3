//! Integrity errors reported by the checker.
//!
//! The checker collects ALL errors, not just the first. Every variant says
//! where the problem is: a reference origin, a block slot, a stack level or
//! a ROM id.

use rpl_common::LibId;
use rpl_vm::{RefOrigin, RplError};
use thiserror::Error;

/// Inconsistencies found in a runtime's memory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    // --- References ---
    /// A reference held by the runtime does not resolve to an object.
    #[error("dangling reference from {origin:?}: {reason}")]
    DanglingReference { origin: RefOrigin, reason: RplError },

    // --- Objects ---
    /// A live block does not hold a whole number of objects.
    #[error("block {block}: {reason}")]
    MalformedBlock { block: usize, reason: String },

    /// An object names a library that is not registered.
    #[error("block {block} offset {offset}: no library {lib}")]
    UnknownLibrary {
        block: usize,
        offset: usize,
        lib: LibId,
    },

    /// The owning library rejected an object.
    #[error("block {block} offset {offset}: {reason}")]
    InvalidObject {
        block: usize,
        offset: usize,
        reason: String,
    },

    /// A standalone object's prolog disagrees with its length.
    #[error("object declares {declared} cells but has {actual}")]
    SizeMismatch { declared: usize, actual: usize },

    /// A standalone object failed its library's check.
    #[error("object rejected: {reason}")]
    Rejected { reason: String },

    // --- Stacks ---
    /// A stack is deeper than its configured limit.
    #[error("{stack} stack depth {depth} exceeds limit {limit}")]
    DepthExceeded {
        stack: &'static str,
        depth: usize,
        limit: usize,
    },

    /// A LAM frame base is out of order or past the last entry.
    #[error("LAM frame {frame} starts at {base}, beyond the stack or before its parent")]
    BadLamFrame { frame: usize, base: usize },

    /// Entry marks that do not fit the current stacks.
    #[error("{owner}: marks (return {base_rs}..{entry_rs}) do not fit return depth {depth}")]
    BadEntryMarks {
        owner: String,
        base_rs: usize,
        entry_rs: usize,
        depth: usize,
    },

    /// An error trap recorded deeper than the return stack now is.
    #[error("trap {index} expects return depth {rs_depth}, stack has {depth}")]
    BadTrapDepth {
        index: usize,
        rs_depth: usize,
        depth: usize,
    },

    // --- ROM ---
    /// A ROM object's cells no longer match its library's table.
    #[error("ROM object {lib}:{index} differs from its library table")]
    RomMismatch { lib: LibId, index: u32 },

    /// A ROM id's hash does not match the stored cells.
    #[error("ROM object {lib}:{index} does not match its id hash")]
    RomHashMismatch { lib: LibId, index: u32 },

    /// A library table entry was never loaded, or the loaded entry has no
    /// table entry.
    #[error("ROM object {lib}:{index} missing")]
    RomMissing { lib: LibId, index: u32 },

    /// A ROM block can be moved or reclaimed.
    #[error("ROM object {lib}:{index} is not pinned")]
    RomNotPinned { lib: LibId, index: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpl_vm::RootSlot;

    #[test]
    fn error_display_dangling_reference() {
        let e = IntegrityError::DanglingReference {
            origin: RefOrigin::DataStack(2),
            reason: RplError::StaleReference,
        };
        assert_eq!(
            e.to_string(),
            "dangling reference from DataStack(2): stale object reference"
        );
    }

    #[test]
    fn error_display_root_origin() {
        let e = IntegrityError::DanglingReference {
            origin: RefOrigin::Root(RootSlot::Entry),
            reason: RplError::StaleReference,
        };
        assert!(e.to_string().contains("Root(Entry)"));
    }

    #[test]
    fn error_display_unknown_library() {
        let e = IntegrityError::UnknownLibrary {
            block: 3,
            offset: 0,
            lib: LibId(77),
        };
        assert_eq!(e.to_string(), "block 3 offset 0: no library 77");
    }

    #[test]
    fn error_display_depth_exceeded() {
        let e = IntegrityError::DepthExceeded {
            stack: "data",
            depth: 10,
            limit: 8,
        };
        assert_eq!(e.to_string(), "data stack depth 10 exceeds limit 8");
    }

    #[test]
    fn error_display_rom_mismatch() {
        let e = IntegrityError::RomMismatch {
            lib: LibId::INTEGER,
            index: 1,
        };
        assert_eq!(
            e.to_string(),
            "ROM object 10:1 differs from its library table"
        );
    }

    #[test]
    fn error_clone_and_eq() {
        let e1 = IntegrityError::SizeMismatch {
            declared: 3,
            actual: 2,
        };
        assert_eq!(e1.clone(), e1);
    }
}
