//! Execution context: instruction pointer, exception state and entry marks.

use bitflags::bitflags;

use crate::error::RplError;
use crate::stack::LamMark;
use crate::store::ObjPtr;

bitflags! {
    /// Signals raised by handlers. `ERROR` accompanies a pending [`RplError`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Exceptions: u32 {
        const ERROR = 1 << 0;
        const HALT = 1 << 1;
        /// Raised by ENDOFCODE; the end of a run.
        const BREAKPOINT = 1 << 2;
        const EXIT_RPL = 1 << 3;
        const POWER_OFF = 1 << 4;
        const WARM_RESET = 1 << 5;
        const HW_RESET = 1 << 6;
        const AUTO_RESUME = 1 << 7;
    }
}

impl Exceptions {
    /// Flags that describe what the host should do after a halt.
    pub const OUTCOME: Exceptions = Exceptions::POWER_OFF
        .union(Exceptions::WARM_RESET)
        .union(Exceptions::HW_RESET)
        .union(Exceptions::AUTO_RESUME);
}

bitflags! {
    /// Engine status left for the host after a run.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct HaltFlags: u32 {
        /// A program is halted and can be resumed.
        const HALTED = 1 << 0;
        const POWER_OFF = 1 << 1;
        const WARM_RESET = 1 << 2;
        const HW_RESET = 1 << 3;
        /// Resume the halted program as soon as the host is ready.
        const AUTO_RESUME = 1 << 4;
    }
}

impl HaltFlags {
    /// Translate the outcome part of an exception set.
    pub fn from_exceptions(ex: Exceptions) -> HaltFlags {
        let mut flags = HaltFlags::empty();
        flags.set(HaltFlags::POWER_OFF, ex.contains(Exceptions::POWER_OFF));
        flags.set(HaltFlags::WARM_RESET, ex.contains(Exceptions::WARM_RESET));
        flags.set(HaltFlags::HW_RESET, ex.contains(Exceptions::HW_RESET));
        flags.set(HaltFlags::AUTO_RESUME, ex.contains(Exceptions::AUTO_RESUME));
        flags
    }
}

bitflags! {
    /// User-settable system flags read by number libraries.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SystemFlags: u32 {
        /// Infinite results produce ±∞ instead of an error.
        const INFINITE_NOT_ERROR = 1 << 0;
        /// Overflow produces ±∞ instead of an error.
        const OVERFLOW_NOT_ERROR = 1 << 1;
        /// Underflow produces 0 instead of an error.
        const UNDERFLOW_NOT_ERROR = 1 << 2;
        /// Sticky: an infinite result was produced.
        const INFINITE = 1 << 8;
        /// Sticky: an overflow was masked.
        const OVERFLOW = 1 << 9;
        /// Sticky: a negative underflow was masked.
        const NEG_UNDERFLOW = 1 << 10;
        /// Sticky: a positive underflow was masked.
        const POS_UNDERFLOW = 1 << 11;
    }
}

/// Return and LAM depths recorded when a program is installed.
///
/// `base` is the depth before anything was pushed for the run; `entry` is
/// the return depth once the entry program's own frame is in place. Errors
/// with the return stack between the two abort cleanly, deeper ones freeze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryMarks {
    pub base_rs: usize,
    pub entry_rs: usize,
    pub lam: LamMark,
}

/// An installed `IFERR` trap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorTrap {
    /// Program evaluated when the protected body fails.
    pub handler: ObjPtr,
    /// Where execution continues after the handler.
    pub resume: ObjPtr,
    /// Return depth before the protected body's frame.
    pub rs_depth: usize,
    pub lam: LamMark,
}

/// A halted program that can be resumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HaltRecord {
    pub ip: ObjPtr,
    pub entry: EntryMarks,
    /// Error that froze the program, if it was not an explicit HALT.
    pub cause: Option<RplError>,
    /// Traps that were active when the program stopped.
    pub traps: Vec<ErrorTrap>,
}

/// Pending exception.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExceptionState {
    pub flags: Exceptions,
    pub error: Option<RplError>,
    /// Instruction that raised the exception.
    pub at: Option<ObjPtr>,
}

impl ExceptionState {
    pub fn is_clear(&self) -> bool {
        self.flags.is_empty()
    }
}

/// Registers of the running engine.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    /// Next instruction.
    pub ip: Option<ObjPtr>,
    /// Instruction being executed.
    pub current: Option<ObjPtr>,
    pub exception: ExceptionState,
    /// Object reported instead of the failing instruction.
    pub blame: Option<ObjPtr>,
    pub traps: Vec<ErrorTrap>,
    pub entry: EntryMarks,
    /// Last trapped error, read by ERRN and ERRM.
    pub last_error: Option<RplError>,
}
