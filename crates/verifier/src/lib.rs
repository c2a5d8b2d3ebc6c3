//! RPL integrity checker: consistency of a runtime's memory.
//!
//! The checker inspects a [`Runtime`] between runs and reports every
//! inconsistency it finds, not just the first. It never modifies the
//! runtime.
//!
//! # Usage
//!
//! ```
//! use rpl_verifier::check_memory;
//! use rpl_vm::{Runtime, RuntimeConfig};
//!
//! let mut rt = Runtime::new(RuntimeConfig::default())?;
//! rpl_stdlib::install_all(&mut rt)?;
//! assert!(check_memory(&rt).is_ok());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Passes
//!
//! 1. **References**: every pointer held by the runtime resolves
//! 2. **Objects**: every live block holds well-formed objects of registered libraries
//! 3. **Stacks**: depths within limits, LAM frames and entry marks in order
//! 4. **ROM**: loaded ROM objects are pinned and match their library tables

pub mod error;
pub mod objects;
pub mod references;
pub mod rom;
pub mod stacks;

pub use error::IntegrityError;

use rpl_common::Word;
use rpl_vm::{Registry, Runtime};

/// Check a runtime's memory.
///
/// Returns `Ok(())` if every pass is clean, or `Err(Vec<IntegrityError>)`
/// with all errors found.
///
/// Object contents are only inspected when every reference resolves;
/// a dangling pointer usually means the walk would report the same
/// damage again.
pub fn check_memory(rt: &Runtime) -> Result<(), Vec<IntegrityError>> {
    let mut all_errors = Vec::new();

    // Pass 1: References
    let reference_errors = references::check_references(rt);
    let references_clean = reference_errors.is_empty();
    all_errors.extend(reference_errors);

    // Pass 2: Objects (needs resolvable references)
    if references_clean {
        all_errors.extend(objects::check_blocks(rt));
    }

    // Pass 3: Stacks (independent)
    all_errors.extend(stacks::check_stacks(rt));

    // Pass 4: ROM (independent)
    all_errors.extend(rom::check_rom(rt));

    if all_errors.is_empty() {
        Ok(())
    } else {
        Err(all_errors)
    }
}

/// Check a standalone object, such as compiler output, before it is stored.
pub fn check_object(registry: &Registry, words: &[Word]) -> Result<(), IntegrityError> {
    objects::check_standalone(registry, words)
}
