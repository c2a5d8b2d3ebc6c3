//! Engine control commands.

use rpl_common::{LibId, Word};

use crate::context::Exceptions;
use crate::error::RplError;
use crate::library::Library;
use crate::machine::Runtime;

const CMD_ENDOFCODE: u32 = 0;
const CMD_EXITRPL: u32 = 1;
const CMD_HALT: u32 = 2;
const CMD_OFF: u32 = 3;
const CMD_WARMSTART: u32 = 4;
const CMD_COLDSTART: u32 = 5;

/// Marker at the end of every run. Executing it raises the breakpoint the
/// engine treats as "run complete".
pub const END_OF_CODE: Word = Word::command(LibId::SYSTEM, CMD_ENDOFCODE);

/// HALT, as a word for hosts and tests that assemble programs by hand.
pub const HALT: Word = Word::command(LibId::SYSTEM, CMD_HALT);

/// EXITRPL.
pub const EXIT_RPL: Word = Word::command(LibId::SYSTEM, CMD_EXITRPL);

static COMMANDS: [&str; 6] = ["", "EXITRPL", "HALT", "OFF", "WARMSTART", "COLDSTART"];

/// Library 1.
pub struct SystemLibrary;

impl Library for SystemLibrary {
    fn name(&self) -> &'static str {
        "system"
    }

    fn ids(&self) -> &'static [LibId] {
        &[LibId::SYSTEM]
    }

    fn commands(&self) -> &'static [&'static str] {
        &COMMANDS
    }

    fn exec(&self, rt: &mut Runtime, word: Word) -> Result<(), RplError> {
        if word.is_prolog() {
            return Err(RplError::UnknownOpcode(word));
        }
        let signal = match word.command_index() {
            CMD_ENDOFCODE => Exceptions::BREAKPOINT,
            CMD_EXITRPL => Exceptions::EXIT_RPL,
            CMD_HALT => Exceptions::HALT,
            CMD_OFF => Exceptions::HALT | Exceptions::POWER_OFF | Exceptions::AUTO_RESUME,
            CMD_WARMSTART => Exceptions::HALT | Exceptions::WARM_RESET,
            CMD_COLDSTART => Exceptions::HALT | Exceptions::HW_RESET,
            _ => return Err(RplError::UnknownOpcode(word)),
        };
        rt.raise(signal);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execute::ExecutionOutcome;
    use crate::machine::RuntimeConfig;

    #[test]
    fn end_of_code_is_not_typeable() {
        assert_eq!(COMMANDS[CMD_ENDOFCODE as usize], "");
    }

    #[test]
    fn off_requests_power_off_and_auto_resume() {
        let mut rt = Runtime::new(RuntimeConfig::default()).unwrap();
        rt.install_opcode(Word::command(LibId::SYSTEM, CMD_OFF)).unwrap();
        let outcome = rt.run().unwrap();
        assert!(matches!(outcome, ExecutionOutcome::Halted { cause: None, .. }));
        let flags = rt.take_halt_flags();
        assert!(flags.contains(crate::context::HaltFlags::POWER_OFF));
        assert!(flags.contains(crate::context::HaltFlags::AUTO_RESUME));
        assert!(!rt
            .take_halt_flags()
            .contains(crate::context::HaltFlags::POWER_OFF));
    }
}
