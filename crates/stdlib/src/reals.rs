//! Binary64 reals (library 12).
//!
//! Every result goes through [`checked`]: NaN is always an error,
//! infinities and underflows are errors unless the matching system flag
//! masks them, in which case the sticky status flag is set and the IEEE
//! result is pushed.

use rpl_common::object::{pack_f64, payload, unpack_f64};
use rpl_common::{LibId, ObjectType, Operator, Word};
use rpl_vm::library::push_self;
use rpl_vm::{
    ArithmeticFault, CompileContext, CompileOutcome, Decompiler, Library, ObjectCheck, ObjectInfo,
    Registry, RplError, Runtime, TokenInfo, TokenKind,
};

use crate::args::{read_number, replace_with, Number};

pub const ROM_REAL_ONE: u32 = 0;
pub const ROM_HALF: u32 = 1;

const REAL_HEAD: Word = Word::prolog(LibId::REAL, 2);
static REAL_ONE: [Word; 3] = [REAL_HEAD, Word(0), Word(0x3FF0_0000)];
static HALF: [Word; 3] = [REAL_HEAD, Word(0), Word(0x3FE0_0000)];
static ROM: [&[Word]; 2] = [&REAL_ONE, &HALF];

const INFINITY: &str = "∞";

/// Library 12.
pub struct RealLibrary;

/// Check a computed real. `underflowed` reports a nonzero exact result
/// that rounded to zero. Masked faults set their sticky flag and let the
/// IEEE value through.
pub fn checked(rt: &mut Runtime, value: f64, underflowed: bool) -> Result<f64, RplError> {
    if value.is_nan() {
        return Err(RplError::Arithmetic(ArithmeticFault::UndefinedResult));
    }
    if value.is_infinite() {
        rt.check_arithmetic(ArithmeticFault::Overflow, value < 0.0)?;
    } else if underflowed {
        rt.check_arithmetic(ArithmeticFault::Underflow, value.is_sign_negative())?;
    }
    Ok(value)
}

/// Like [`checked`], but infinite operands give infinite results without
/// a fault.
fn result(
    rt: &mut Runtime,
    value: f64,
    a: f64,
    b: f64,
    underflowed: bool,
) -> Result<f64, RplError> {
    if !value.is_nan() && !(a.is_finite() && b.is_finite()) {
        return Ok(value);
    }
    checked(rt, value, underflowed)
}

fn divide(rt: &mut Runtime, a: f64, b: f64) -> Result<f64, RplError> {
    if b == 0.0 {
        if a == 0.0 || a.is_nan() {
            return Err(RplError::Arithmetic(ArithmeticFault::UndefinedResult));
        }
        let negative = a.is_sign_negative() != b.is_sign_negative();
        rt.check_arithmetic(ArithmeticFault::InfiniteResult, negative)?;
        return Ok(if negative { f64::NEG_INFINITY } else { f64::INFINITY });
    }
    let q = a / b;
    result(rt, q, a, b, q == 0.0 && a != 0.0 && b.is_finite())
}

fn binary(rt: &mut Runtime, op: Operator) -> Result<(), RplError> {
    let left = read_number(rt, 2)?;
    let right = read_number(rt, 1)?;
    let (a, b) = (left.as_f64(), right.as_f64());
    let value = match op {
        Operator::Add => Number::Real(result(rt, a + b, a, b, false)?),
        Operator::Sub => Number::Real(result(rt, a - b, a, b, false)?),
        Operator::Mul => {
            let p = a * b;
            Number::Real(result(rt, p, a, b, p == 0.0 && a != 0.0 && b != 0.0)?)
        }
        Operator::Div => Number::Real(divide(rt, a, b)?),
        Operator::Eq => Number::from(a == b),
        Operator::NotEq => Number::from(a != b),
        Operator::Same => {
            Number::from(matches!((left, right), (Number::Real(x), Number::Real(y)) if x == y))
        }
        Operator::Lt => Number::from(a < b),
        Operator::Gt => Number::from(a > b),
        Operator::Lte => Number::from(a <= b),
        Operator::Gte => Number::from(a >= b),
        Operator::Cmp => {
            let ord = a.partial_cmp(&b).ok_or(RplError::BadArgumentValue)?;
            Number::Int(ord as i64)
        }
        _ => return Err(RplError::BadArgumentType),
    };
    replace_with(rt, 2, value)
}

fn unary(rt: &mut Runtime, op: Operator) -> Result<(), RplError> {
    let a = match read_number(rt, 1)? {
        Number::Real(v) => v,
        Number::Int(_) => return Err(RplError::BadArgumentType),
    };
    let value = match op {
        Operator::Neg => -a,
        Operator::Abs => a.abs(),
        Operator::Inv => divide(rt, 1.0, a)?,
        Operator::Not => return replace_with(rt, 1, Number::from(a == 0.0)),
        Operator::IsTrue => return replace_with(rt, 1, Number::from(a != 0.0)),
        _ => return Err(RplError::BadArgumentType),
    };
    replace_with(rt, 1, Number::Real(value))
}

impl Library for RealLibrary {
    fn name(&self) -> &'static str {
        "reals"
    }

    fn ids(&self) -> &'static [LibId] {
        &[LibId::REAL]
    }

    fn exec(&self, rt: &mut Runtime, word: Word) -> Result<(), RplError> {
        push_self(rt, word)
    }

    fn operator(&self, rt: &mut Runtime, op: Operator) -> Result<(), RplError> {
        if op.nargs() == 2 {
            binary(rt, op)
        } else {
            unary(rt, op)
        }
    }

    fn probe_token(&self, text: &str) -> Option<TokenInfo> {
        ["-∞", "+∞", INFINITY]
            .iter()
            .find(|t| text.starts_with(**t))
            .map(|t| TokenInfo {
                len: t.len(),
                kind: TokenKind::Number,
            })
    }

    fn compile(&self, cx: &mut CompileContext<'_>) -> CompileOutcome {
        match parse(cx.token()) {
            Some(v) => {
                cx.emit_all(&pack_f64(LibId::REAL, v));
                CompileOutcome::Emitted
            }
            None => CompileOutcome::NotMine,
        }
    }

    fn decompile(&self, object: &[Word], out: &mut Decompiler<'_>) -> Result<(), RplError> {
        out.token(&format_real(unpack_f64(object)?));
        Ok(())
    }

    fn get_info(&self, object: &[Word]) -> Option<ObjectInfo> {
        object.first().filter(|w| w.is_prolog()).map(|_| ObjectInfo {
            object_type: ObjectType::Real,
            kind: TokenKind::Number,
        })
    }

    fn check_object(&self, object: &[Word], _registry: &Registry) -> ObjectCheck {
        match object.first() {
            Some(w) if w.is_prolog() && payload(object).len() == 2 => {
                match unpack_f64(object) {
                    Ok(v) if v.is_nan() => ObjectCheck::Invalid("real is NaN".into()),
                    _ => ObjectCheck::Valid,
                }
            }
            Some(w) if w.is_prolog() => ObjectCheck::Invalid("real needs two cells".into()),
            _ => ObjectCheck::Invalid("reals have no commands".into()),
        }
    }

    fn rom_objects(&self) -> &'static [&'static [Word]] {
        &ROM
    }
}
