//! Conditionals and error traps (library 8).
//!
//! `IFERR` takes two programs, `« body » « handler » IFERR`: the body runs
//! under a trap and, if it fails, the stacks are unwound to where they were
//! when it started and the handler runs instead. The trapped error is then
//! available through `ERRN` and `ERRM` until `ERR0` clears it.

use rpl_common::object::{pack_text, unpack_i64, unpack_text};
use rpl_common::{LibId, Word};
use rpl_vm::context::ErrorTrap;
use rpl_vm::stack::FrameKind;
use rpl_vm::{Library, RplError, Runtime};

use crate::args::{push_integer, read_truth};

static COMMANDS: [&str; 7] = ["IFT", "IFTE", "IFERR", "ERRN", "ERRM", "ERR0", "DOERR"];

const IFT: u32 = 0;
const IFTE: u32 = 1;
const IFERR: u32 = 2;
const ERRN: u32 = 3;
const ERRM: u32 = 4;
const ERR0: u32 = 5;
const DOERR: u32 = 6;

/// Library 8.
pub struct FlowLibrary;

fn is_program(rt: &Runtime, level: usize) -> Result<bool, RplError> {
    let head = rt.word_at(rt.data().peek(level)?)?;
    Ok(head.is_prolog() && head.library() == LibId::PROGRAM)
}

fn if_then(rt: &mut Runtime) -> Result<(), RplError> {
    let cond = read_truth(rt, 2)?;
    let then = rt.data().peek(1)?;
    rt.data_mut().pop_n(2)?;
    if cond {
        rt.evaluate(then)?;
    }
    Ok(())
}

fn if_then_else(rt: &mut Runtime) -> Result<(), RplError> {
    let cond = read_truth(rt, 3)?;
    let then = rt.data().peek(2)?;
    let otherwise = rt.data().peek(1)?;
    rt.data_mut().pop_n(3)?;
    rt.evaluate(if cond { then } else { otherwise })
}

fn if_error(rt: &mut Runtime) -> Result<(), RplError> {
    if !(is_program(rt, 2)? && is_program(rt, 1)?) {
        return Err(RplError::BadArgumentType);
    }
    let body = rt.data().peek(2)?;
    let handler = rt.data().peek(1)?;
    let resume = rt.context().ip.ok_or(RplError::EmptyReturnStack)?;
    let trap = ErrorTrap {
        handler,
        resume,
        rs_depth: rt.return_stack().depth(),
        lam: rt.lams().mark(),
    };
    rt.data_mut().pop_n(2)?;
    rt.call_program(body, FrameKind::ErrorTrap)?;
    rt.context_mut().traps.push(trap);
    Ok(())
}

fn error_message(rt: &mut Runtime) -> Result<(), RplError> {
    let text = match &rt.context().last_error {
        Some(error) => rt.error_message(error),
        None => String::new(),
    };
    let words = pack_text(LibId::STRING, &text)?;
    rt.push_object(&words)
}

/// `DOERR`: raise an integer code or a message.
fn raise(rt: &mut Runtime) -> Result<(), RplError> {
    let object = rt.peek_object(1)?;
    let error = match object.first().map(|w| (w.is_prolog(), w.library())) {
        Some((true, LibId::INTEGER)) => RplError::User(unpack_i64(object)?),
        Some((true, LibId::STRING)) => RplError::UserMessage(unpack_text(object)?),
        _ => return Err(RplError::BadArgumentType),
    };
    rt.data_mut().pop()?;
    Err(error)
}

impl Library for FlowLibrary {
    fn name(&self) -> &'static str {
        "flow"
    }

    fn ids(&self) -> &'static [LibId] {
        &[LibId::FLOW]
    }

    fn commands(&self) -> &'static [&'static str] {
        &COMMANDS
    }

    fn exec(&self, rt: &mut Runtime, word: Word) -> Result<(), RplError> {
        if word.is_prolog() {
            return Err(RplError::UnknownOpcode(word));
        }
        match word.command_index() {
            IFT => if_then(rt),
            IFTE => if_then_else(rt),
            IFERR => if_error(rt),
            ERRN => {
                let code = rt.context().last_error.as_ref().map_or(0, RplError::code);
                push_integer(rt, code)
            }
            ERRM => error_message(rt),
            ERR0 => {
                rt.context_mut().last_error = None;
                Ok(())
            }
            DOERR => raise(rt),
            _ => Err(RplError::UnknownOpcode(word)),
        }
    }
}
