//! Error types for the RPL compiler.

use rpl_common::WordError;
use rpl_vm::RplError;
use thiserror::Error;

/// Errors produced while compiling text into objects.
///
/// Positions are 1-based; `col` counts characters, not bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// No library recognised the token.
    #[error("{line}:{col}: unknown token '{token}'")]
    UnknownToken {
        line: usize,
        col: usize,
        token: String,
    },

    /// A library claimed the token but found it malformed.
    #[error("{line}:{col}: {message}")]
    Syntax {
        line: usize,
        col: usize,
        message: String,
    },

    /// The enclosing composite does not accept this element.
    #[error("{line}:{col}: '{token}' is not allowed in this object")]
    Rejected {
        line: usize,
        col: usize,
        token: String,
    },

    /// A composite was still open at the end of the text.
    #[error("{line}:{col}: '{token}' is never closed")]
    Unterminated {
        line: usize,
        col: usize,
        token: String,
    },

    /// A composite grew past what its prolog can describe.
    #[error("{line}:{col}: {source}")]
    Encoding {
        line: usize,
        col: usize,
        source: WordError,
    },

    /// The compiled object could not be stored.
    #[error("cannot store compiled object: {0}")]
    Store(#[from] RplError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_unknown_token() {
        let e = CompileError::UnknownToken {
            line: 2,
            col: 5,
            token: "FOO".to_string(),
        };
        assert_eq!(e.to_string(), "2:5: unknown token 'FOO'");
    }

    #[test]
    fn error_display_rejected() {
        let e = CompileError::Rejected {
            line: 1,
            col: 3,
            token: "\"x\"".to_string(),
        };
        assert_eq!(e.to_string(), "1:3: '\"x\"' is not allowed in this object");
    }

    #[test]
    fn error_display_unterminated() {
        let e = CompileError::Unterminated {
            line: 1,
            col: 1,
            token: "«".to_string(),
        };
        assert_eq!(e.to_string(), "1:1: '«' is never closed");
    }

    #[test]
    fn error_display_store() {
        let e = CompileError::Store(RplError::MemoryExhausted { requested: 4 });
        assert!(e.to_string().starts_with("cannot store compiled object: "));
    }
}
