//! Stack manipulation (library 9).

use rpl_common::{LibId, Word};
use rpl_vm::{Library, RplError, Runtime};

use crate::args::{push_integer, read_count};

static COMMANDS: [&str; 15] = [
    "DUP", "DUP2", "DUPN", "DROP", "DROP2", "DROPN", "SWAP", "OVER", "ROT", "PICK", "ROLL",
    "ROLLD", "UNPICK", "DEPTH", "CLEAR",
];

const DUP: u32 = 0;
const DUP2: u32 = 1;
const DUPN: u32 = 2;
const DROP: u32 = 3;
const DROP2: u32 = 4;
const DROPN: u32 = 5;
const SWAP: u32 = 6;
const OVER: u32 = 7;
const ROT: u32 = 8;
const PICK: u32 = 9;
const ROLL: u32 = 10;
const ROLLD: u32 = 11;
const UNPICK: u32 = 12;
const DEPTH: u32 = 13;
const CLEAR: u32 = 14;

/// Library 9.
pub struct StackLibrary;

/// Require `n` levels.
fn need(rt: &Runtime, n: usize) -> Result<(), RplError> {
    if rt.data().depth() < n {
        Err(RplError::StackUnderflow)
    } else {
        Ok(())
    }
}

/// Copy levels `n..=1` to the top, preserving their order.
fn dup_n(rt: &mut Runtime, n: usize) -> Result<(), RplError> {
    need(rt, n)?;
    for _ in 0..n {
        let ptr = rt.data().peek(n)?;
        rt.data_mut().push(ptr)?;
    }
    Ok(())
}

/// Move level `n` to level 1.
fn roll(rt: &mut Runtime, n: usize) -> Result<(), RplError> {
    need(rt, n)?;
    if n < 2 {
        return Ok(());
    }
    let ptr = rt.data().peek(n)?;
    rt.data_mut().remove_at(n, 1)?;
    rt.data_mut().push(ptr)
}

/// Move level 1 to level `n`.
fn roll_down(rt: &mut Runtime, n: usize) -> Result<(), RplError> {
    need(rt, n)?;
    if n < 2 {
        return Ok(());
    }
    let ptr = rt.data_mut().pop()?;
    rt.data_mut().insert_range(n, &[ptr])
}

/// Pop a count argument that must be at least `min`, then check that `n`
/// more levels exist below it.
fn pop_count(rt: &mut Runtime, min: usize, extra: usize) -> Result<usize, RplError> {
    let n = read_count(rt, 1)?;
    if n < min {
        return Err(RplError::BadArgumentValue);
    }
    need(rt, n + extra + 1)?;
    rt.data_mut().pop()?;
    Ok(n)
}

impl Library for StackLibrary {
    fn name(&self) -> &'static str {
        "stack"
    }

    fn ids(&self) -> &'static [LibId] {
        &[LibId::STACK]
    }

    fn commands(&self) -> &'static [&'static str] {
        &COMMANDS
    }

    fn exec(&self, rt: &mut Runtime, word: Word) -> Result<(), RplError> {
        if word.is_prolog() {
            return Err(RplError::UnknownOpcode(word));
        }
        match word.command_index() {
            DUP => dup_n(rt, 1),
            DUP2 => dup_n(rt, 2),
            DUPN => {
                let n = pop_count(rt, 0, 0)?;
                dup_n(rt, n)
            }
            DROP => rt.data_mut().pop().map(|_| ()),
            DROP2 => rt.data_mut().pop_n(2),
            DROPN => {
                let n = pop_count(rt, 0, 0)?;
                rt.data_mut().pop_n(n)
            }
            SWAP => roll(rt, 2),
            OVER => {
                need(rt, 2)?;
                let ptr = rt.data().peek(2)?;
                rt.data_mut().push(ptr)
            }
            ROT => roll(rt, 3),
            PICK => {
                let n = pop_count(rt, 1, 0)?;
                let ptr = rt.data().peek(n)?;
                rt.data_mut().push(ptr)
            }
            ROLL => {
                let n = pop_count(rt, 1, 0)?;
                roll(rt, n)
            }
            ROLLD => {
                let n = pop_count(rt, 1, 0)?;
                roll_down(rt, n)
            }
            UNPICK => {
                let n = pop_count(rt, 1, 1)?;
                let ptr = rt.data_mut().pop()?;
                rt.data_mut().overwrite(n, ptr)
            }
            DEPTH => {
                let depth = rt.data().depth() as i64;
                push_integer(rt, depth)
            }
            CLEAR => {
                rt.data_mut().clear();
                Ok(())
            }
            _ => Err(RplError::UnknownOpcode(word)),
        }
    }
}
