//! RPL common types and cell encoding.
//!
//! This crate provides the foundational data structures shared by the
//! engine, the compiler and the command libraries:
//!
//! - [`Word`]: the 32-bit cell, either a prolog or a command
//! - [`LibId`]: library identifiers and the well-known library numbers
//! - [`Operator`]: the overloadable operator namespace
//! - [`ObjectType`]: type numbers reported by `TYPE`
//! - [`object`]: object layout helpers (inline elements, scalars, text)
//! - [`WordError`]: encoding errors
//!
//! # Dependencies
//!
//! This crate uses `thiserror` and has no other dependencies.

pub mod error;
pub mod object;
pub mod opcode;
pub mod type_tag;
pub mod word;

// Re-export commonly used types at the crate root.
pub use error::WordError;
pub use opcode::Operator;
pub use type_tag::ObjectType;
pub use word::{LibId, Word, MAX_LIBRARY, MAX_PAYLOAD};

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_lib() -> impl Strategy<Value = LibId> {
        (1u16..=MAX_LIBRARY).prop_map(LibId)
    }

    proptest! {
        /// Prolog fields survive packing into a single cell.
        #[test]
        fn prolog_fields_preserved(lib in arb_lib(), size in 0u32..=MAX_PAYLOAD) {
            let w = Word::prolog(lib, size);
            prop_assert!(w.is_prolog());
            prop_assert_eq!(w.library(), lib);
            prop_assert_eq!(w.payload_size(), size as usize);
        }

        /// Command fields survive packing into a single cell.
        #[test]
        fn command_fields_preserved(lib in arb_lib(), index in 0u32..=MAX_PAYLOAD) {
            let w = Word::command(lib, index);
            prop_assert!(w.is_command());
            prop_assert_eq!(w.library(), lib);
            prop_assert_eq!(w.command_index(), index);
            prop_assert_eq!(w.object_len(), 1);
        }

        /// Any raw cell either heads an object that fits or reports truncation.
        #[test]
        fn object_len_never_overruns(raw in any::<u32>(), tail in 0usize..16) {
            let mut words = vec![Word(raw)];
            words.extend(std::iter::repeat(Word(0)).take(tail));
            match object::object_len(&words) {
                Ok(len) => prop_assert!(len <= words.len()),
                Err(WordError::Truncated { expected, found }) => {
                    prop_assert!(expected > found);
                }
                Err(e) => prop_assert!(false, "unexpected error {e}"),
            }
        }

        /// Text packing preserves arbitrary strings.
        #[test]
        fn text_preserved(text in ".{0,40}") {
            let obj = object::pack_text(LibId::STRING, &text).unwrap();
            prop_assert_eq!(object::object_len(&obj).unwrap(), obj.len());
            prop_assert_eq!(object::unpack_text(&obj).unwrap(), text);
        }
    }
}
