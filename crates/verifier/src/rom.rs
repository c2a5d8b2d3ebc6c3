//! ROM pass.
//!
//! Each loaded ROM object must sit in a pinned block, hash to its id, and
//! match the entry its library's table holds today. Every table entry of a
//! registered library must have been loaded.

use rpl_common::Word;
use rpl_vm::rom::rom_hash;
use rpl_vm::Runtime;

use crate::error::IntegrityError;

/// blake3 digest of an object's cells, little-endian per cell.
pub fn digest(words: &[Word]) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    for w in words {
        hasher.update(&w.0.to_le_bytes());
    }
    hasher.finalize()
}

/// Run the ROM pass.
pub fn check_rom(rt: &Runtime) -> Vec<IntegrityError> {
    let store = rt.store();
    let mut errors = Vec::new();

    for entry in rt.rom_entries() {
        let (lib, index) = (entry.id.lib, entry.id.index);
        if !store.is_pinned(entry.ptr.handle) {
            errors.push(IntegrityError::RomNotPinned { lib, index });
        }
        // Unresolvable pointers are the reference pass's to report.
        let Ok(cells) = store.object(entry.ptr) else {
            continue;
        };
        if rom_hash(cells) != entry.id.hash {
            errors.push(IntegrityError::RomHashMismatch { lib, index });
        }
        let table = rt
            .registry()
            .get(lib)
            .and_then(|l| l.rom_objects().get(index as usize).copied());
        match table {
            Some(words) if digest(words) == digest(cells) => {}
            Some(_) => errors.push(IntegrityError::RomMismatch { lib, index }),
            None => errors.push(IntegrityError::RomMissing { lib, index }),
        }
    }

    for library in rt.registry().libraries() {
        let Some(&lib) = library.ids().first() else {
            continue;
        };
        for index in 0..library.rom_objects().len() as u32 {
            let loaded = rt
                .rom_entries()
                .iter()
                .any(|e| e.id.lib == lib && e.id.index == index);
            if !loaded {
                errors.push(IntegrityError::RomMissing { lib, index });
            }
        }
    }
    errors
}
