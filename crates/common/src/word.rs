//! Cell encoding: the 32-bit word every object is built from.
//!
//! ```text
//! bits 31..20  library id (0..=4095)
//! bit  19      PROLOG flag
//! bits 18..0   payload size (prolog) or command index (command)
//! ```
//!
//! A prolog word heads a data object of `1 + size` cells. Any other word is
//! a command: a single-cell object whose encoding is its own opcode.

use std::fmt;

use crate::error::WordError;

/// Number of bits available for the payload size / command index.
pub const PAYLOAD_BITS: u32 = 19;

/// Largest payload size a prolog can declare, and largest command index.
pub const MAX_PAYLOAD: u32 = (1 << PAYLOAD_BITS) - 1;

/// Largest library id.
pub const MAX_LIBRARY: u16 = 0x0FFF;

const PROLOG_BIT: u32 = 1 << PAYLOAD_BITS;
const LIBRARY_SHIFT: u32 = 20;

/// Identifies a command library.
///
/// Library 0 is reserved: it is never registered, so a zeroed cell or an
/// uninitialised block always dispatches to "unknown opcode".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LibId(pub u16);

impl LibId {
    /// The reserved library used for freshly allocated placeholder blocks.
    pub const RESERVED: LibId = LibId(0);
    /// Engine control commands (ENDOFCODE, HALT, EXITRPL, ...).
    pub const SYSTEM: LibId = LibId(1);
    /// Secondaries: `« ... »` program objects.
    pub const PROGRAM: LibId = LibId(2);
    /// Overloadable operators.
    pub const OVERLOADABLE: LibId = LibId(4);
    /// Conditionals and error trapping.
    pub const FLOW: LibId = LibId(8);
    /// Stack manipulation commands.
    pub const STACK: LibId = LibId(9);
    /// 64-bit integers.
    pub const INTEGER: LibId = LibId(10);
    /// Reals.
    pub const REAL: LibId = LibId(12);
    /// Bare identifiers (evaluate to a local's value).
    pub const IDENT: LibId = LibId(20);
    /// Quoted identifiers (evaluate to themselves).
    pub const QUOTED_IDENT: LibId = LibId(21);
    /// Local-variable commands.
    pub const LOCALS: LibId = LibId(22);
    /// Strings.
    pub const STRING: LibId = LibId(24);
    /// Lists.
    pub const LIST: LibId = LibId(30);
    /// Numeric vectors.
    pub const VECTOR: LibId = LibId(31);
    /// System commands (flags, memory, TYPE).
    pub const SYSCMD: LibId = LibId(40);

    /// Checked constructor.
    pub fn new(id: u32) -> Result<Self, WordError> {
        if id > MAX_LIBRARY as u32 {
            return Err(WordError::LibraryOutOfRange(id));
        }
        Ok(LibId(id as u16))
    }
}

impl fmt::Display for LibId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One cell of object memory.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Word(pub u32);

impl Word {
    /// Build a prolog word. Panics in const context if `size` is out of range,
    /// so it is only used for static tables; runtime code uses [`Word::try_prolog`].
    pub const fn prolog(lib: LibId, size: u32) -> Word {
        assert!(size <= MAX_PAYLOAD);
        assert!(lib.0 <= MAX_LIBRARY);
        Word(((lib.0 as u32) << LIBRARY_SHIFT) | PROLOG_BIT | size)
    }

    /// Build a command word.
    pub const fn command(lib: LibId, index: u32) -> Word {
        assert!(index <= MAX_PAYLOAD);
        assert!(lib.0 <= MAX_LIBRARY);
        Word(((lib.0 as u32) << LIBRARY_SHIFT) | index)
    }

    /// Checked prolog constructor for payload sizes computed at runtime.
    pub fn try_prolog(lib: LibId, size: usize) -> Result<Word, WordError> {
        if size > MAX_PAYLOAD as usize {
            return Err(WordError::PayloadTooLarge(size));
        }
        if lib.0 > MAX_LIBRARY {
            return Err(WordError::LibraryOutOfRange(lib.0 as u32));
        }
        Ok(Word::prolog(lib, size as u32))
    }

    /// Checked command constructor.
    pub fn try_command(lib: LibId, index: u32) -> Result<Word, WordError> {
        if index > MAX_PAYLOAD {
            return Err(WordError::CommandOutOfRange(index));
        }
        if lib.0 > MAX_LIBRARY {
            return Err(WordError::LibraryOutOfRange(lib.0 as u32));
        }
        Ok(Word::command(lib, index))
    }

    /// Library this word dispatches to.
    pub const fn library(self) -> LibId {
        LibId((self.0 >> LIBRARY_SHIFT) as u16)
    }

    pub const fn is_prolog(self) -> bool {
        self.0 & PROLOG_BIT != 0
    }

    pub const fn is_command(self) -> bool {
        !self.is_prolog()
    }

    /// Payload size of a prolog, 0 for commands.
    pub const fn payload_size(self) -> usize {
        if self.is_prolog() {
            (self.0 & MAX_PAYLOAD) as usize
        } else {
            0
        }
    }

    /// Command index of a command word (the low bits of a prolog otherwise).
    pub const fn command_index(self) -> u32 {
        self.0 & MAX_PAYLOAD
    }

    /// Total length in cells of the object this word heads.
    pub const fn object_len(self) -> usize {
        1 + self.payload_size()
    }

    /// Same word with the payload size replaced; used to patch construct prologs.
    pub fn with_size(self, size: usize) -> Result<Word, WordError> {
        Word::try_prolog(self.library(), size)
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_prolog() {
            write!(f, "Prolog({}, {})", self.library().0, self.payload_size())
        } else {
            write!(f, "Cmd({}, {})", self.library().0, self.command_index())
        }
    }
}

impl From<u32> for Word {
    fn from(raw: u32) -> Self {
        Word(raw)
    }
}
