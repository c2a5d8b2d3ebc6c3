//! ROM objects: constants owned by libraries.
//!
//! At install time each library's static object table is copied into pinned
//! blocks. A [`RomId`] names a ROM object independently of where it was
//! loaded; it carries a content hash so an id saved against one build of a
//! library is refused by a build whose table differs.

use rpl_common::{LibId, Word};

use crate::store::ObjPtr;

/// Stable name of a ROM object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RomId {
    pub lib: LibId,
    pub index: u32,
    /// Truncated blake3 hash of the object's cells.
    pub hash: u32,
}

/// A loaded ROM object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RomEntry {
    pub id: RomId,
    pub ptr: ObjPtr,
}

/// Content hash of an object, as stored in a [`RomId`].
pub fn rom_hash(words: &[Word]) -> u32 {
    let mut hasher = blake3::Hasher::new();
    for w in words {
        hasher.update(&w.0.to_le_bytes());
    }
    let digest = hasher.finalize();
    let bytes = digest.as_bytes();
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
