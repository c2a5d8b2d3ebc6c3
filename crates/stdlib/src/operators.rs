//! Overloadable operators (library 4).
//!
//! An operator command owns no semantics of its own. It picks the library
//! of its operands (the higher id of the two for binary operators) and
//! asks it through [`Library::operator`]. Equality operators that the
//! operand library does not implement, or whose operand library is not
//! installed, fall back to comparing the objects cell by cell.

use std::sync::Arc;

use rpl_common::opcode::ALL_OPERATORS;
use rpl_common::{LibId, Operator, Word};
use rpl_vm::{CompileContext, CompileOutcome, Library, RplError, Runtime};
use tracing::trace;

use crate::args::push_bool;

/// Command names indexed by operator number.
static COMMANDS: [&str; 49] = {
    let mut names = [""; 49];
    let mut i = 0;
    while i < ALL_OPERATORS.len() {
        let op = ALL_OPERATORS[i];
        names[op as usize] = op.mnemonic();
        i += 1;
    }
    names
};

/// Library 4.
pub struct OperatorLibrary;

/// Library that implements `op` for the operands on the stack.
fn operand_library(rt: &Runtime, op: Operator) -> Result<Arc<dyn Library>, RplError> {
    let lib = match op.nargs() {
        2 => rt.library_at(1)?.max(rt.library_at(2)?),
        _ => rt.library_at(1)?,
    };
    Ok(rt.registry().resolve(lib)?.clone())
}

/// Cell-for-cell comparison used when no library claims an equality test.
fn identical(rt: &Runtime) -> Result<bool, RplError> {
    Ok(rt.peek_object(1)? == rt.peek_object(2)?)
}

impl OperatorLibrary {
    fn apply(&self, rt: &mut Runtime, op: Operator) -> Result<(), RplError> {
        if rt.data().depth() < op.nargs() {
            return Err(RplError::StackUnderflow);
        }
        if op == Operator::Eval {
            let ptr = rt.data_mut().pop()?;
            return rt.evaluate(ptr);
        }
        let outcome = match operand_library(rt, op) {
            Ok(lib) => {
                trace!(op = op.mnemonic(), library = lib.name(), "operator dispatch");
                lib.operator(rt, op)
            }
            // Objects of a removed library still compare cell by cell.
            Err(RplError::UnknownLibrary(_)) if op.is_total() => Err(RplError::BadArgumentType),
            Err(e) => return Err(e),
        };
        match outcome {
            Err(RplError::BadArgumentType) if op.is_total() => {
                let same = identical(rt)?;
                rt.data_mut().pop_n(2)?;
                push_bool(rt, if op == Operator::NotEq { !same } else { same })
            }
            other => other,
        }
    }
}

impl Library for OperatorLibrary {
    fn name(&self) -> &'static str {
        "operators"
    }

    fn ids(&self) -> &'static [LibId] {
        &[LibId::OVERLOADABLE]
    }

    fn commands(&self) -> &'static [&'static str] {
        &COMMANDS
    }

    fn exec(&self, rt: &mut Runtime, word: Word) -> Result<(), RplError> {
        if word.is_prolog() {
            return Err(RplError::UnknownOpcode(word));
        }
        let op = Operator::try_from(word.command_index())
            .map_err(|_| RplError::UnknownOpcode(word))?;
        self.apply(rt, op)
    }

    fn compile(&self, cx: &mut CompileContext<'_>) -> CompileOutcome {
        match Operator::from_mnemonic(cx.token()) {
            Some(op) => {
                cx.emit(op.word());
                CompileOutcome::Emitted
            }
            None => CompileOutcome::NotMine,
        }
    }
}
