//! System commands (library 40): type inspection, flags and memory.

use rpl_common::{LibId, Word};
use rpl_vm::{Library, RplError, Runtime, SystemFlags};
use tracing::debug;

use crate::args::{push_bool, push_integer, read_integer};

static COMMANDS: [&str; 7] = ["TYPE", "SF", "CF", "FS?", "FC?", "MEM", "GARBAGE"];

const TYPE: u32 = 0;
const SF: u32 = 1;
const CF: u32 = 2;
const FS: u32 = 3;
const FC: u32 = 4;
const MEM: u32 = 5;
const GARBAGE: u32 = 6;

/// Library 40.
pub struct SysCmdLibrary;

/// System flag selected by a flag number. Flag `n` is bit `n - 1`; the sign
/// is ignored so the calculator's negative system flag numbers work too.
pub fn flag_for(number: i64) -> Result<SystemFlags, RplError> {
    match number.unsigned_abs() {
        n @ 1..=32 => Ok(SystemFlags::from_bits_retain(1 << (n - 1))),
        _ => Err(RplError::BadArgumentValue),
    }
}

fn read_flag(rt: &Runtime) -> Result<SystemFlags, RplError> {
    flag_for(read_integer(rt, 1)?)
}

fn object_type(rt: &mut Runtime) -> Result<(), RplError> {
    let info = rt
        .registry()
        .info(rt.peek_object(1)?)
        .ok_or(RplError::BadArgumentType)?;
    rt.data_mut().pop()?;
    push_integer(rt, info.object_type as i64)
}

impl Library for SysCmdLibrary {
    fn name(&self) -> &'static str {
        "system commands"
    }

    fn ids(&self) -> &'static [LibId] {
        &[LibId::SYSCMD]
    }

    fn commands(&self) -> &'static [&'static str] {
        &COMMANDS
    }

    fn exec(&self, rt: &mut Runtime, word: Word) -> Result<(), RplError> {
        if word.is_prolog() {
            return Err(RplError::UnknownOpcode(word));
        }
        match word.command_index() {
            TYPE => object_type(rt),
            SF | CF => {
                let flag = read_flag(rt)?;
                rt.data_mut().pop()?;
                let mut flags = rt.system_flags();
                flags.set(flag, word.command_index() == SF);
                rt.set_system_flags(flags);
                Ok(())
            }
            FS | FC => {
                let flag = read_flag(rt)?;
                rt.data_mut().pop()?;
                let set = rt.system_flags().contains(flag);
                push_bool(rt, set == (word.command_index() == FS))
            }
            MEM => {
                let stats = rt.store().stats();
                push_integer(rt, stats.max_capacity.saturating_sub(stats.used) as i64)
            }
            GARBAGE => {
                let freed = rt.compact();
                debug!(freed, "garbage collected on request");
                push_integer(rt, freed as i64)
            }
            _ => Err(RplError::UnknownOpcode(word)),
        }
    }
}
