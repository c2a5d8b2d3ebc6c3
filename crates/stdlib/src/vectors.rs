//! Numeric vectors (library 31): `[ 1 2.5 3 ]`.
//!
//! Only numbers may appear inside the brackets; the compiler asks
//! [`Library::validate`] after every element. Arithmetic is element-wise
//! and runs each element operation as a transparent command, so the
//! number libraries decide what `+` means for each pair.

use rpl_common::object::payload;
use rpl_common::{LibId, ObjectType, Operator, Word};
use rpl_vm::library::push_self;
use rpl_vm::{
    CompileContext, CompileOutcome, Decompiler, Library, ObjPtr, ObjectCheck, ObjectInfo,
    Registry, RplError, Runtime, TokenInfo, TokenKind, Validation,
};

use crate::args::{compile_with_aliases, composite, element_pointers, is_number, read_count};
use crate::lists::{check_elements, compile_delimited, gather, probe_delimiters};

static COMMANDS: [&str; 1] = ["→V"];

const TO_VECTOR: u32 = 0;

/// Library error: operand lengths differ.
pub const INVALID_DIMENSION: u32 = 1;

/// Library 31.
pub struct VectorLibrary;

fn is_vector(rt: &Runtime, level: usize) -> Result<bool, RplError> {
    let head = rt.word_at(rt.data().peek(level)?)?;
    Ok(head.is_prolog() && head.library() == LibId::VECTOR)
}

fn to_vector(rt: &mut Runtime) -> Result<(), RplError> {
    let n = read_count(rt, 1)?;
    if rt.data().depth() < n + 1 {
        return Err(RplError::StackUnderflow);
    }
    for level in 2..=n + 1 {
        if !is_number(rt.peek_object(level)?) {
            return Err(RplError::BadArgumentType);
        }
    }
    let words = composite(LibId::VECTOR, &gather(rt, n, 1)?)?;
    rt.data_mut().pop_n(n + 1)?;
    rt.push_object(&words)
}

/// Apply `op` to each operand tuple as a transparent command and append
/// the results to `cells`.
fn apply_each(
    rt: &mut Runtime,
    op: Operator,
    operands: &[Vec<ObjPtr>],
    cells: &mut Vec<Word>,
) -> Result<(), RplError> {
    for args in operands {
        for &ptr in args {
            rt.data_mut().push(ptr)?;
        }
        if rt.run_transparent(op.word(), args.len(), 1)? != 1 {
            return Err(RplError::BadArgumentValue);
        }
        let value = rt.data_mut().pop()?;
        cells.extend_from_slice(rt.object(value)?);
    }
    Ok(())
}

/// Element-wise results of `op`. On failure the stack is left as it was.
fn elementwise(
    rt: &mut Runtime,
    op: Operator,
    operands: &[Vec<ObjPtr>],
) -> Result<Vec<Word>, RplError> {
    let depth = rt.data().depth();
    let mut cells = Vec::new();
    if let Err(e) = apply_each(rt, op, operands, &mut cells) {
        rt.data_mut().truncate(depth);
        return Err(e);
    }
    Ok(cells)
}

fn dimension_error() -> RplError {
    RplError::Library {
        lib: LibId::VECTOR,
        code: INVALID_DIMENSION,
    }
}

/// Operand tuples for a binary operator, or `None` when the operand shapes
/// do not fit `op`.
fn pairs(rt: &Runtime, op: Operator) -> Result<Option<Vec<Vec<ObjPtr>>>, RplError> {
    let (left, right) = (rt.data().peek(2)?, rt.data().peek(1)?);
    let tuples = match (is_vector(rt, 2)?, is_vector(rt, 1)?, op) {
        (true, true, Operator::Add | Operator::Sub) => {
            let (a, b) = (element_pointers(rt, left)?, element_pointers(rt, right)?);
            if a.len() != b.len() {
                return Err(dimension_error());
            }
            a.into_iter().zip(b).map(|(x, y)| vec![x, y]).collect()
        }
        (true, false, Operator::Mul | Operator::Div) if is_number(rt.object(right)?) => {
            element_pointers(rt, left)?
                .into_iter()
                .map(|x| vec![x, right])
                .collect()
        }
        (false, true, Operator::Mul) if is_number(rt.object(left)?) => {
            element_pointers(rt, right)?
                .into_iter()
                .map(|y| vec![left, y])
                .collect()
        }
        _ => return Ok(None),
    };
    Ok(Some(tuples))
}

impl Library for VectorLibrary {
    fn name(&self) -> &'static str {
        "vectors"
    }

    fn ids(&self) -> &'static [LibId] {
        &[LibId::VECTOR]
    }

    fn commands(&self) -> &'static [&'static str] {
        &COMMANDS
    }

    fn exec(&self, rt: &mut Runtime, word: Word) -> Result<(), RplError> {
        if word.is_prolog() {
            return push_self(rt, word);
        }
        match word.command_index() {
            TO_VECTOR => to_vector(rt),
            _ => Err(RplError::UnknownOpcode(word)),
        }
    }

    fn operator(&self, rt: &mut Runtime, op: Operator) -> Result<(), RplError> {
        let (nargs, operands) = match op {
            Operator::Neg => {
                if !is_vector(rt, 1)? {
                    return Err(RplError::BadArgumentType);
                }
                let v = rt.data().peek(1)?;
                let tuples = element_pointers(rt, v)?.into_iter().map(|x| vec![x]).collect();
                (1, tuples)
            }
            Operator::Add | Operator::Sub | Operator::Mul | Operator::Div => {
                match pairs(rt, op)? {
                    Some(tuples) => (2, tuples),
                    None => return Err(RplError::BadArgumentType),
                }
            }
            _ => return Err(RplError::BadArgumentType),
        };
        let cells = elementwise(rt, op, &operands)?;
        let words = composite(LibId::VECTOR, &cells)?;
        rt.data_mut().pop_n(nargs)?;
        rt.push_object(&words)
    }

    fn probe_token(&self, text: &str) -> Option<TokenInfo> {
        probe_delimiters(text, "[", "]")
    }

    fn compile(&self, cx: &mut CompileContext<'_>) -> CompileOutcome {
        compile_delimited(LibId::VECTOR, "[", "]", cx).unwrap_or_else(|| {
            compile_with_aliases(LibId::VECTOR, &COMMANDS, &[("->V", TO_VECTOR)], cx)
        })
    }

    fn validate(&self, _construct: Word, last: &[Word]) -> Validation {
        if is_number(last) {
            Validation::Accept
        } else {
            Validation::Reject
        }
    }

    fn decompile(&self, object: &[Word], out: &mut Decompiler<'_>) -> Result<(), RplError> {
        match object.first() {
            Some(w) if w.is_prolog() => {
                out.token("[");
                out.elements(payload(object))?;
                out.token("]");
            }
            _ => rpl_vm::library::decompile_command(&COMMANDS, object, out),
        }
        Ok(())
    }

    fn get_info(&self, object: &[Word]) -> Option<ObjectInfo> {
        let head = object.first()?;
        Some(if head.is_prolog() {
            ObjectInfo {
                object_type: ObjectType::Vector,
                kind: TokenKind::Open,
            }
        } else {
            ObjectInfo {
                object_type: ObjectType::Command,
                kind: TokenKind::Command,
            }
        })
    }

    fn check_object(&self, object: &[Word], registry: &Registry) -> ObjectCheck {
        match object.first() {
            Some(w) if w.is_prolog() => {
                let numeric = rpl_common::object::objects(payload(object))
                    .all(|e| e.map(is_number).unwrap_or(false));
                if !numeric {
                    return ObjectCheck::Invalid("vector element is not a number".into());
                }
                check_elements(object, registry)
            }
            Some(w) if (w.command_index() as usize) < COMMANDS.len() => ObjectCheck::Valid,
            Some(w) => ObjectCheck::Invalid(format!("unknown command {}", w.command_index())),
            None => ObjectCheck::Invalid("empty object".into()),
        }
    }

    fn message(&self, code: u32) -> Option<&'static str> {
        match code {
            INVALID_DIMENSION => Some("invalid dimension"),
            _ => None,
        }
    }
}
