//! Object pass.
//!
//! Each live block must be a run of complete objects laid back to back,
//! each owned by a registered library that accepts it. Composite checks
//! recurse through the registry, so elements are covered too.

use rpl_common::object::objects;
use rpl_common::Word;
use rpl_vm::{ObjectCheck, Registry, Runtime};

use crate::error::IntegrityError;

/// Check one block's cells. `block` is the slot index used in reports.
pub fn check_block(registry: &Registry, block: usize, cells: &[Word]) -> Vec<IntegrityError> {
    let mut errors = Vec::new();
    let mut offset = 0;
    for object in objects(cells) {
        let object = match object {
            Ok(o) => o,
            Err(e) => {
                errors.push(IntegrityError::MalformedBlock {
                    block,
                    reason: format!("at offset {offset}: {e}"),
                });
                break;
            }
        };
        let lib = object[0].library();
        if registry.get(lib).is_none() {
            errors.push(IntegrityError::UnknownLibrary { block, offset, lib });
        } else if let ObjectCheck::Invalid(reason) = registry.check(object) {
            errors.push(IntegrityError::InvalidObject {
                block,
                offset,
                reason,
            });
        }
        offset += object.len();
    }
    errors
}

/// Run the object pass over every live block.
pub fn check_blocks(rt: &Runtime) -> Vec<IntegrityError> {
    let store = rt.store();
    let mut errors = Vec::new();
    for handle in store.live_blocks() {
        match store.block(handle) {
            Ok(cells) => errors.extend(check_block(rt.registry(), handle.index(), cells)),
            Err(e) => errors.push(IntegrityError::MalformedBlock {
                block: handle.index(),
                reason: e.to_string(),
            }),
        }
    }
    errors
}

/// Check one object that is not in the arena.
pub fn check_standalone(registry: &Registry, words: &[Word]) -> Result<(), IntegrityError> {
    // An object is at least its prolog.
    let declared = words.first().map_or(1, |head| head.object_len());
    if declared != words.len() {
        return Err(IntegrityError::SizeMismatch {
            declared,
            actual: words.len(),
        });
    }
    match registry.check(words) {
        ObjectCheck::Valid => Ok(()),
        ObjectCheck::Invalid(reason) => Err(IntegrityError::Rejected { reason }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpl_common::object::pack_i64;
    use rpl_common::LibId;
    use rpl_vm::libs::program::SEMI;
    use rpl_vm::RuntimeConfig;

    fn runtime() -> Runtime {
        Runtime::new(RuntimeConfig::default()).unwrap()
    }

    #[test]
    fn program_block_passes() {
        let rt = runtime();
        let cells = [Word::prolog(LibId::PROGRAM, 1), SEMI];
        assert!(check_block(rt.registry(), 0, &cells).is_empty());
    }

    #[test]
    fn back_to_back_objects_pass() {
        let rt = runtime();
        let cells = [Word::prolog(LibId::PROGRAM, 1), SEMI, SEMI];
        assert!(check_block(rt.registry(), 0, &cells).is_empty());
    }

    #[test]
    fn truncated_object_is_malformed() {
        let rt = runtime();
        let cells = [SEMI, Word::prolog(LibId::PROGRAM, 4), SEMI];
        let errors = check_block(rt.registry(), 7, &cells);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            IntegrityError::MalformedBlock { block: 7, reason } if reason.starts_with("at offset 1")
        ));
    }

    #[test]
    fn unregistered_library_is_reported_with_offset() {
        let rt = runtime();
        // No integer library without the standard libraries.
        let mut cells = vec![SEMI];
        cells.extend(pack_i64(LibId::INTEGER, 3));
        let errors = check_block(rt.registry(), 2, &cells);
        assert_eq!(
            errors,
            vec![IntegrityError::UnknownLibrary {
                block: 2,
                offset: 1,
                lib: LibId::INTEGER,
            }]
        );
    }

    #[test]
    fn program_without_terminator_is_invalid() {
        let rt = runtime();
        let cells = [Word::prolog(LibId::PROGRAM, 1), Word::prolog(LibId::PROGRAM, 0)];
        let errors = check_block(rt.registry(), 0, &cells);
        assert!(matches!(errors[0], IntegrityError::InvalidObject { offset: 0, .. }));
    }

    #[test]
    fn standalone_size_must_match() {
        let rt = runtime();
        let words = [Word::prolog(LibId::PROGRAM, 1), SEMI, SEMI];
        assert_eq!(
            check_standalone(rt.registry(), &words),
            Err(IntegrityError::SizeMismatch {
                declared: 2,
                actual: 3,
            })
        );
        assert_eq!(
            check_standalone(rt.registry(), &[]),
            Err(IntegrityError::SizeMismatch {
                declared: 1,
                actual: 0,
            })
        );
    }

    #[test]
    fn standalone_program_passes() {
        let rt = runtime();
        let words = [Word::prolog(LibId::PROGRAM, 1), SEMI];
        assert_eq!(check_standalone(rt.registry(), &words), Ok(()));
    }
}
