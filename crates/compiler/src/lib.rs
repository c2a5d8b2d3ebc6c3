//! RPL compiler: text to objects and back, driven entirely by the libraries.
//!
//! The compiler knows no syntax of its own. Each token is offered to the
//! registered libraries in registration order until one claims it; token
//! boundaries come from the libraries' probes. The result of compiling a
//! text is always one program object holding everything the text names.
//!
//! # Usage
//!
//! ```
//! use rpl_compiler::{compile, decompile};
//! use rpl_vm::{DecompileMode, ExecutionOutcome, Runtime, RuntimeConfig};
//!
//! let mut rt = Runtime::new(RuntimeConfig::default())?;
//! rpl_stdlib::install_all(&mut rt)?;
//! let program = compile(&mut rt, "3 4 +")?;
//! assert_eq!(decompile(&rt, program, DecompileMode::Edit)?, "« 3 4 + »");
//! rt.install(program)?;
//! assert_eq!(rt.run()?, ExecutionOutcome::Completed);
//! let top = rt.data().peek(1)?;
//! assert_eq!(decompile(&rt, top, DecompileMode::Display)?, "7");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;

mod lexer;
mod parser;

pub use error::CompileError;

use rpl_common::Word;
use rpl_vm::{DecompileMode, Decompiler, ObjPtr, Registry, RplError, Runtime};
use tracing::debug;

/// Compile `text` into the cells of a program object without touching any
/// runtime memory.
///
/// Returns the first error encountered.
pub fn compile_words(registry: &Registry, text: &str) -> Result<Vec<Word>, CompileError> {
    parser::parse(registry, text)
}

/// Compile `text` and store the resulting program in the runtime's arena.
///
/// Nothing is allocated when compilation fails.
pub fn compile(rt: &mut Runtime, text: &str) -> Result<ObjPtr, CompileError> {
    let words = compile_words(rt.registry(), text)?;
    let ptr = rt.store_object(&words)?;
    debug!(cells = words.len(), "text compiled");
    Ok(ptr)
}

/// Text form of a standalone object.
pub fn decompile_words(
    registry: &Registry,
    object: &[Word],
    mode: DecompileMode,
) -> Result<String, RplError> {
    let mut out = Decompiler::new(registry, mode);
    out.object(object)?;
    Ok(out.finish())
}

/// Text form of an object in the runtime's arena.
pub fn decompile(rt: &Runtime, ptr: ObjPtr, mode: DecompileMode) -> Result<String, RplError> {
    decompile_words(rt.registry(), rt.object(ptr)?, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpl_common::LibId;
    use rpl_vm::libs::program::SEMI;
    use rpl_vm::RuntimeConfig;

    fn runtime() -> Runtime {
        let mut rt = Runtime::new(RuntimeConfig::default()).unwrap();
        rpl_stdlib::install_all(&mut rt).unwrap();
        rt
    }

    #[test]
    fn empty_text_is_empty_program() {
        let rt = runtime();
        let words = compile_words(rt.registry(), "").unwrap();
        assert_eq!(words, vec![Word::prolog(LibId::PROGRAM, 1), SEMI]);
    }

    #[test]
    fn nested_program_sizes_are_patched() {
        let rt = runtime();
        let words = compile_words(rt.registry(), "« DUP »").unwrap();
        // outer prolog, inner prolog, DUP, SEMI, SEMI
        assert_eq!(words.len(), 5);
        assert_eq!(words[0].payload_size(), 4);
        assert_eq!(words[1].payload_size(), 2);
    }

    #[test]
    fn unknown_token_reports_position() {
        let rt = runtime();
        let err = compile_words(rt.registry(), "1\n  2 #junk").unwrap_err();
        assert_eq!(
            err,
            CompileError::UnknownToken {
                line: 2,
                col: 5,
                token: "#junk".to_string(),
            }
        );
    }

    #[test]
    fn unterminated_construct_points_at_opener() {
        let rt = runtime();
        let err = compile_words(rt.registry(), "1 { 2 « 3").unwrap_err();
        assert!(matches!(
            err,
            CompileError::Unterminated { line: 1, col: 7, .. }
        ));
    }

    #[test]
    fn mismatched_close_is_a_syntax_error() {
        let rt = runtime();
        let err = compile_words(rt.registry(), "« 1 }").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { col: 5, .. }));
        let err = compile_words(rt.registry(), "»").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { col: 1, .. }));
    }

    #[test]
    fn vector_rejects_non_numbers_without_allocating() {
        let mut rt = runtime();
        let before = rt.store().stats();
        let err = compile(&mut rt, "[ 1 \"two\" ]").unwrap_err();
        assert!(matches!(err, CompileError::Rejected { col: 5, .. }));
        assert_eq!(rt.store().stats(), before);
    }

    #[test]
    fn nested_composite_is_validated_as_one_element() {
        let rt = runtime();
        let err = compile_words(rt.registry(), "[ 1 { 2 } ]").unwrap_err();
        assert!(matches!(err, CompileError::Rejected { col: 5, .. }));
        assert!(compile_words(rt.registry(), "{ 1 [ 2 3 ] }").is_ok());
    }

    #[test]
    fn edit_form_round_trips() {
        let mut rt = runtime();
        let text = "« 1 2.5 \"s\" { 'x' y } [ 1 2 ] → a « a DUP * » »";
        let first = compile(&mut rt, text).unwrap();
        let printed = decompile(&rt, first, DecompileMode::Edit).unwrap();
        let again = compile(&mut rt, &printed).unwrap();
        assert_eq!(rt.object(first).unwrap(), rt.object(again).unwrap());
    }
}
