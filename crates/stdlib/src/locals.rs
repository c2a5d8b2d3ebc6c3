//! Local variables (library 22).
//!
//! `→ a b « ... »` binds the top two levels to `a` and `b` for the duration
//! of the program that follows; the binding frame goes away when the
//! program returns. `LSTO` and `LRCL` store and recall by quoted name.

use rpl_common::{LibId, Word};
use rpl_vm::stack::{FrameKind, LamEntry};
use rpl_vm::{CompileContext, CompileOutcome, Library, RplError, Runtime};

use crate::args::compile_with_aliases;
use crate::names::{is_name, lookup, name_of, recall};

static COMMANDS: [&str; 3] = ["→", "LSTO", "LRCL"];

const BIND: u32 = 0;
const LSTO: u32 = 1;
const LRCL: u32 = 2;

/// Library 22.
pub struct LocalsLibrary;

/// `→`: consume the names and program that follow in the instruction
/// stream, bind and enter.
fn bind(rt: &mut Runtime) -> Result<(), RplError> {
    let mut ip = rt.context().ip.ok_or(RplError::EmptyReturnStack)?;
    let mut names = Vec::new();
    while is_name(rt.word_at(ip)?) {
        names.push(ip);
        ip = ip.advance(rt.size_of(ip)?);
    }
    let body = ip;
    let head = rt.word_at(body)?;
    if names.is_empty() || !(head.is_prolog() && head.library() == LibId::PROGRAM) {
        return Err(RplError::BadArgumentType);
    }
    let n = names.len();
    if rt.data().depth() < n {
        return Err(RplError::StackUnderflow);
    }

    let after = body.advance(rt.size_of(body)?);
    rt.context_mut().ip = Some(after);
    rt.call_program(body, FrameKind::LocalScope)?;
    rt.lams_mut().open_frame();
    for (i, &name) in names.iter().enumerate() {
        let value = rt.data().peek(n - i)?;
        rt.lams_mut().push(LamEntry { name, value })?;
    }
    rt.data_mut().pop_n(n)
}

fn store(rt: &mut Runtime) -> Result<(), RplError> {
    let name_ptr = rt.data().peek(1)?;
    let value = rt.data().peek(2)?;
    let name = name_of(rt.object(name_ptr)?)?;
    match lookup(rt, &name, false)? {
        Some(index) => rt.lams_mut().set_value(index, value)?,
        None => rt.lams_mut().push(LamEntry {
            name: name_ptr,
            value,
        })?,
    }
    rt.data_mut().pop_n(2)
}

fn recall_named(rt: &mut Runtime) -> Result<(), RplError> {
    let value = recall(rt, rt.data().peek(1)?)?;
    rt.data_mut().overwrite(1, value)
}

impl Library for LocalsLibrary {
    fn name(&self) -> &'static str {
        "locals"
    }

    fn ids(&self) -> &'static [LibId] {
        &[LibId::LOCALS]
    }

    fn commands(&self) -> &'static [&'static str] {
        &COMMANDS
    }

    fn exec(&self, rt: &mut Runtime, word: Word) -> Result<(), RplError> {
        if word.is_prolog() {
            return Err(RplError::UnknownOpcode(word));
        }
        match word.command_index() {
            BIND => bind(rt),
            LSTO => store(rt),
            LRCL => recall_named(rt),
            _ => Err(RplError::UnknownOpcode(word)),
        }
    }

    fn compile(&self, cx: &mut CompileContext<'_>) -> CompileOutcome {
        compile_with_aliases(LibId::LOCALS, &COMMANDS, &[("->", BIND)], cx)
    }
}
