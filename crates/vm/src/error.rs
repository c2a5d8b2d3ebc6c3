//! Runtime errors for the RPL engine.
//!
//! [`RplError`] is what command handlers return. The engine decides what a
//! handler error means for the run (trap, abort or freeze) and reports the
//! unrecovered ones as [`RunError`].

use rpl_common::{LibId, Word, WordError};
use thiserror::Error;

use crate::store::ObjPtr;

/// Arithmetic faults a number library can raise. Everything but
/// `UndefinedResult` can be masked by system flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticFault {
    /// Division by zero or another pole.
    InfiniteResult,
    /// Result magnitude too large.
    Overflow,
    /// Nonzero result rounded to zero.
    Underflow,
    /// Result not defined (e.g. 0/0).
    UndefinedResult,
}

impl ArithmeticFault {
    pub fn describe(&self) -> &'static str {
        match self {
            ArithmeticFault::InfiniteResult => "infinite result",
            ArithmeticFault::Overflow => "overflow",
            ArithmeticFault::Underflow => "underflow",
            ArithmeticFault::UndefinedResult => "undefined result",
        }
    }
}

/// Errors raised by command handlers and engine primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RplError {
    /// A stack level was requested that does not exist.
    #[error("too few arguments")]
    StackUnderflow,

    /// The data stack reached its configured limit.
    #[error("stack overflow")]
    StackOverflow,

    /// A return was executed with nothing to return to.
    #[error("return stack empty")]
    EmptyReturnStack,

    /// The return stack reached its configured limit.
    #[error("return stack overflow")]
    ReturnStackOverflow,

    /// Operand types are not accepted by the operation.
    #[error("bad argument type")]
    BadArgumentType,

    /// Wrong number of arguments for the operation.
    #[error("bad argument count")]
    BadArgumentCount,

    /// An argument has the right type but an unusable value.
    #[error("bad argument value")]
    BadArgumentValue,

    #[error("{}", .0.describe())]
    Arithmetic(ArithmeticFault),

    /// No library is registered under this id.
    #[error("unknown library {0}")]
    UnknownLibrary(LibId),

    /// The library does not implement this command.
    #[error("invalid opcode {0:?}")]
    UnknownOpcode(Word),

    /// A library id is already taken.
    #[error("library {0} already registered")]
    LibraryConflict(LibId),

    /// The arena cannot satisfy an allocation even after compaction.
    #[error("out of memory: {requested} cells requested")]
    MemoryExhausted { requested: usize },

    /// Allocation size is zero or beyond the object size limit.
    #[error("invalid allocation size {0}")]
    InvalidSize(usize),

    /// A handle refers to a block that was reclaimed.
    #[error("stale object reference")]
    StaleReference,

    /// An object's declared size disagrees with its storage.
    #[error("corrupt object: {0}")]
    CorruptObject(String),

    /// A name has no binding in scope.
    #[error("undefined local name: {0}")]
    UndefinedName(String),

    /// The host requested an interruption.
    #[error("interrupted")]
    Interrupted,

    /// An undo level beyond the available history.
    #[error("no undo level {0}")]
    InvalidUndoLevel(usize),

    /// Snapshot level beyond the ring.
    #[error("no snapshot at level {0}")]
    NoSnapshot(usize),

    /// Error raised by a program through `DOERR` with a number.
    #[error("user error {0}")]
    User(i64),

    /// Error raised by a program through `DOERR` with a message.
    #[error("{0}")]
    UserMessage(String),

    /// Library-defined error, resolved to text through the library's messages.
    #[error("library {lib} error {code}")]
    Library { lib: LibId, code: u32 },
}

impl From<WordError> for RplError {
    fn from(e: WordError) -> Self {
        RplError::CorruptObject(e.to_string())
    }
}

impl RplError {
    /// Numeric code exposed to programs through `ERRN`.
    pub fn code(&self) -> i64 {
        match self {
            RplError::StackUnderflow => 0x201,
            RplError::StackOverflow => 0x202,
            RplError::EmptyReturnStack => 0x203,
            RplError::ReturnStackOverflow => 0x204,
            RplError::BadArgumentType => 0x302,
            RplError::BadArgumentCount => 0x303,
            RplError::BadArgumentValue => 0x304,
            RplError::Arithmetic(ArithmeticFault::InfiniteResult) => 0x305,
            RplError::Arithmetic(ArithmeticFault::Overflow) => 0x306,
            RplError::Arithmetic(ArithmeticFault::Underflow) => 0x307,
            RplError::Arithmetic(ArithmeticFault::UndefinedResult) => 0x308,
            RplError::UnknownLibrary(_) => 0x101,
            RplError::UnknownOpcode(_) => 0x102,
            RplError::LibraryConflict(_) => 0x103,
            RplError::MemoryExhausted { .. } => 0x001,
            RplError::InvalidSize(_) => 0x002,
            RplError::StaleReference => 0x003,
            RplError::CorruptObject(_) => 0x004,
            RplError::UndefinedName(_) => 0x401,
            RplError::Interrupted => 0x501,
            RplError::InvalidUndoLevel(_) => 0x502,
            RplError::NoSnapshot(_) => 0x503,
            RplError::User(n) => *n,
            RplError::UserMessage(_) => 0x70000,
            RplError::Library { lib, code } => ((lib.0 as i64) << 16) | *code as i64,
        }
    }
}

/// A run that ended without reaching its end-of-code marker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    /// Unrecovered error; the return and local stacks were rolled back to
    /// their depths at entry.
    #[error("{error}")]
    Aborted {
        error: RplError,
        /// Instruction that raised the error, if it could be located.
        at: Option<ObjPtr>,
        /// Object held responsible (the argument of EVAL, for instance).
        blame: Option<ObjPtr>,
    },

    /// `run()` was called with nothing installed.
    #[error("nothing to run")]
    NothingToRun,

    /// `resume()` or `kill()` was called with no halted program.
    #[error("no halted program")]
    NotHalted,

    /// The return stack dropped below its depth at entry.
    #[error("return stack unwound below its entry depth")]
    ReturnStackCorrupted,
}

impl From<RplError> for RunError {
    fn from(error: RplError) -> Self {
        RunError::Aborted {
            error,
            at: None,
            blame: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formats() {
        assert_eq!(RplError::StackUnderflow.to_string(), "too few arguments");
        assert_eq!(
            RplError::Arithmetic(ArithmeticFault::InfiniteResult).to_string(),
            "infinite result"
        );
        assert_eq!(
            RplError::UnknownOpcode(Word::command(LibId(4000), 3)).to_string(),
            "invalid opcode Cmd(4000, 3)"
        );
        assert_eq!(
            RplError::MemoryExhausted { requested: 12 }.to_string(),
            "out of memory: 12 cells requested"
        );
        assert_eq!(RplError::UserMessage("boom".into()).to_string(), "boom");
    }

    #[test]
    fn run_error_shows_cause() {
        let e = RunError::Aborted {
            error: RplError::BadArgumentType,
            at: None,
            blame: None,
        };
        assert_eq!(e.to_string(), "bad argument type");
        assert_eq!(RunError::NotHalted.to_string(), "no halted program");
    }

    #[test]
    fn codes_are_distinct_for_builtin_errors() {
        let errors = [
            RplError::StackUnderflow,
            RplError::StackOverflow,
            RplError::BadArgumentType,
            RplError::BadArgumentCount,
            RplError::Arithmetic(ArithmeticFault::InfiniteResult),
            RplError::Arithmetic(ArithmeticFault::UndefinedResult),
            RplError::UnknownOpcode(Word(0)),
            RplError::Interrupted,
        ];
        for (i, a) in errors.iter().enumerate() {
            for b in &errors[i + 1..] {
                assert_ne!(a.code(), b.code(), "{a} and {b} share a code");
            }
        }
    }

    #[test]
    fn user_error_code_passes_through() {
        assert_eq!(RplError::User(77).code(), 77);
    }

    #[test]
    fn word_errors_become_corruption() {
        let e: RplError = WordError::InvalidUtf8.into();
        assert_eq!(e, RplError::CorruptObject("packed text is not valid UTF-8".into()));
    }
}
