//! Encoding errors for RPL cells and objects.

use thiserror::Error;

/// Errors that occur while building or decoding cells and objects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WordError {
    /// Library id does not fit in 12 bits.
    #[error("library id {0} out of range (max 4095)")]
    LibraryOutOfRange(u32),

    /// Prolog payload size does not fit in 19 bits.
    #[error("payload of {0} cells exceeds the prolog limit")]
    PayloadTooLarge(usize),

    /// Command index does not fit in 19 bits.
    #[error("command index {0} out of range")]
    CommandOutOfRange(u32),

    /// Operator index not defined.
    #[error("unknown operator: {0}")]
    UnknownOperator(u32),

    /// Object type number not defined.
    #[error("unknown object type: {0}")]
    UnknownObjectType(u8),

    /// Object needs more cells than are available.
    #[error("truncated object: needs {expected} cells, found {found}")]
    Truncated { expected: usize, found: usize },

    /// Object payload has the wrong shape for its library.
    #[error("malformed payload: {0}")]
    MalformedPayload(&'static str),

    /// Packed text is not valid UTF-8.
    #[error("packed text is not valid UTF-8")]
    InvalidUtf8,
}
