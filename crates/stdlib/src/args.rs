//! Argument access shared by the libraries.
//!
//! Handlers read their arguments in place and only pop once everything
//! checked out, so a failing command leaves the stack as it found it.

use rpl_common::object::{pack_f64, pack_i64, unpack_f64, unpack_i64, unpack_text};
use rpl_common::{LibId, Word};
use rpl_vm::library::compile_command;
use rpl_vm::{CompileContext, CompileOutcome, ObjPtr, RplError, Runtime};

use crate::integers::{ROM_MINUS_ONE, ROM_ONE, ROM_ZERO};
use crate::reals::{ROM_HALF, ROM_REAL_ONE};

/// A numeric argument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Real(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(v) => v as f64,
            Number::Real(v) => v,
        }
    }

    pub fn is_zero(self) -> bool {
        match self {
            Number::Int(v) => v == 0,
            Number::Real(v) => v == 0.0,
        }
    }
}

/// Truth values are the integers 1 and 0.
impl From<bool> for Number {
    fn from(value: bool) -> Self {
        Number::Int(i64::from(value))
    }
}

/// Decode a standalone number object.
pub fn number_of(object: &[Word]) -> Result<Number, RplError> {
    let head = *object.first().ok_or(RplError::BadArgumentType)?;
    if !head.is_prolog() {
        return Err(RplError::BadArgumentType);
    }
    match head.library() {
        LibId::INTEGER => Ok(Number::Int(unpack_i64(object)?)),
        LibId::REAL => Ok(Number::Real(unpack_f64(object)?)),
        _ => Err(RplError::BadArgumentType),
    }
}

/// Whether an object is an integer or a real.
pub fn is_number(object: &[Word]) -> bool {
    number_of(object).is_ok()
}

/// Number at stack `level`.
pub fn read_number(rt: &Runtime, level: usize) -> Result<Number, RplError> {
    number_of(rt.peek_object(level)?)
}

/// Integer at stack `level`. Reals with no fractional part are accepted.
pub fn read_integer(rt: &Runtime, level: usize) -> Result<i64, RplError> {
    match read_number(rt, level)? {
        Number::Int(v) => Ok(v),
        Number::Real(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => Ok(v as i64),
        Number::Real(_) => Err(RplError::BadArgumentValue),
    }
}

/// Non-negative count at stack `level`.
pub fn read_count(rt: &Runtime, level: usize) -> Result<usize, RplError> {
    usize::try_from(read_integer(rt, level)?).map_err(|_| RplError::BadArgumentValue)
}

/// Text of a string or name object at stack `level`.
pub fn read_text(rt: &Runtime, level: usize, lib: LibId) -> Result<String, RplError> {
    let object = rt.peek_object(level)?;
    match object.first() {
        Some(head) if head.is_prolog() && head.library() == lib => Ok(unpack_text(object)?),
        _ => Err(RplError::BadArgumentType),
    }
}

/// Truth value of the object at `level`: nonzero numbers are true.
pub fn read_truth(rt: &Runtime, level: usize) -> Result<bool, RplError> {
    Ok(!read_number(rt, level)?.is_zero())
}

/// Push an integer. 0, 1 and -1 come from ROM and allocate nothing.
pub fn push_integer(rt: &mut Runtime, value: i64) -> Result<(), RplError> {
    let rom = match value {
        0 => Some(ROM_ZERO),
        1 => Some(ROM_ONE),
        -1 => Some(ROM_MINUS_ONE),
        _ => None,
    };
    match rom {
        Some(index) => push_rom(rt, LibId::INTEGER, index),
        None => rt.push_object(&pack_i64(LibId::INTEGER, value)),
    }
}

/// Push a real. 1.0 and 0.5 come from ROM.
pub fn push_real(rt: &mut Runtime, value: f64) -> Result<(), RplError> {
    if value.to_bits() == 1.0f64.to_bits() {
        return push_rom(rt, LibId::REAL, ROM_REAL_ONE);
    }
    if value.to_bits() == 0.5f64.to_bits() {
        return push_rom(rt, LibId::REAL, ROM_HALF);
    }
    rt.push_object(&pack_f64(LibId::REAL, value))
}

/// Push a number of either kind.
pub fn push_number(rt: &mut Runtime, value: Number) -> Result<(), RplError> {
    match value {
        Number::Int(v) => push_integer(rt, v),
        Number::Real(v) => push_real(rt, v),
    }
}

/// Push a truth value as the integer 1 or 0.
pub fn push_bool(rt: &mut Runtime, value: bool) -> Result<(), RplError> {
    push_integer(rt, i64::from(value))
}

fn push_rom(rt: &mut Runtime, lib: LibId, index: u32) -> Result<(), RplError> {
    let ptr = rt.rom_object(lib, index)?;
    rt.data_mut().push(ptr)
}

/// Replace the top `nargs` levels with a computed number.
pub fn replace_with(rt: &mut Runtime, nargs: usize, result: Number) -> Result<(), RplError> {
    rt.data_mut().pop_n(nargs)?;
    push_number(rt, result)
}

/// Replace the top `nargs` levels with the objects in `results`, pushed in
/// order.
pub fn replace_top(rt: &mut Runtime, nargs: usize, results: &[ObjPtr]) -> Result<(), RplError> {
    rt.data_mut().pop_n(nargs)?;
    for &ptr in results {
        rt.data_mut().push(ptr)?;
    }
    Ok(())
}

/// Pointers to the elements of the composite at `ptr`. They point into the
/// composite's own block, so nothing is copied.
pub fn element_pointers(rt: &Runtime, ptr: ObjPtr) -> Result<Vec<ObjPtr>, RplError> {
    let object = rt.object(ptr)?;
    let mut offset = 1;
    let mut elements = Vec::new();
    for element in rpl_common::object::objects(rpl_common::object::payload(object)) {
        elements.push(ptr.advance(offset));
        offset += element?.len();
    }
    Ok(elements)
}

/// Wrap `elements` (concatenated objects) in a composite of `lib`.
pub fn composite(lib: LibId, elements: &[Word]) -> Result<Vec<Word>, RplError> {
    let mut words = Vec::with_capacity(elements.len() + 1);
    words.push(Word::try_prolog(lib, elements.len())?);
    words.extend_from_slice(elements);
    Ok(words)
}

/// Compile a command by name or by one of its ASCII spellings.
pub fn compile_with_aliases(
    lib: LibId,
    commands: &[&str],
    aliases: &[(&str, u32)],
    cx: &mut CompileContext<'_>,
) -> CompileOutcome {
    let token = cx.token();
    match aliases.iter().find(|(alias, _)| *alias == token) {
        Some(&(_, index)) => {
            cx.emit(Word::command(lib, index));
            CompileOutcome::Emitted
        }
        None => compile_command(lib, commands, cx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpl_vm::RuntimeConfig;

    fn runtime() -> Runtime {
        let mut rt = Runtime::new(RuntimeConfig::default()).unwrap();
        crate::install_all(&mut rt).unwrap();
        rt
    }

    #[test]
    fn small_integers_come_from_rom() {
        let mut rt = runtime();
        let used = rt.store().stats().used;
        push_integer(&mut rt, 1).unwrap();
        push_bool(&mut rt, false).unwrap();
        push_real(&mut rt, 0.5).unwrap();
        assert_eq!(rt.store().stats().used, used);
        assert!(rt.rom_id(rt.data().peek(1).unwrap()).is_some());
        assert_eq!(read_integer(&rt, 2), Ok(0));
    }

    #[test]
    fn integral_reals_count() {
        let mut rt = runtime();
        push_real(&mut rt, 3.0).unwrap();
        assert_eq!(read_count(&rt, 1), Ok(3));
        push_real(&mut rt, 2.5).unwrap();
        assert_eq!(read_count(&rt, 1), Err(RplError::BadArgumentValue));
        push_integer(&mut rt, -2).unwrap();
        assert_eq!(read_count(&rt, 1), Err(RplError::BadArgumentValue));
    }

    #[test]
    fn element_pointers_walk_inline_objects() {
        let mut rt = runtime();
        let mut elements = pack_i64(LibId::INTEGER, 5).to_vec();
        elements.extend_from_slice(&pack_f64(LibId::REAL, 2.5));
        let list = rt.store_object(&composite(LibId::LIST, &elements).unwrap()).unwrap();
        let ptrs = element_pointers(&rt, list).unwrap();
        assert_eq!(ptrs.len(), 2);
        assert_eq!(number_of(rt.object(ptrs[0]).unwrap()), Ok(Number::Int(5)));
        assert_eq!(number_of(rt.object(ptrs[1]).unwrap()), Ok(Number::Real(2.5)));
    }
}
