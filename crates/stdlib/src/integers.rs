//! 64-bit integers (library 10).
//!
//! Integer arithmetic is exact. Results that do not fit promote to reals,
//! as do divisions that are not exact.

use rpl_common::object::{pack_i64, payload, unpack_i64};
use rpl_common::{LibId, ObjectType, Operator, Word};
use rpl_vm::library::push_self;
use rpl_vm::{
    ArithmeticFault, CompileContext, CompileOutcome, Decompiler, Library, ObjectCheck, ObjectInfo,
    Registry, RplError, Runtime, TokenKind,
};

use crate::args::{read_number, replace_with, Number};
use crate::reals;

pub const ROM_ZERO: u32 = 0;
pub const ROM_ONE: u32 = 1;
pub const ROM_MINUS_ONE: u32 = 2;

const INT_HEAD: Word = Word::prolog(LibId::INTEGER, 2);
static ZERO: [Word; 3] = [INT_HEAD, Word(0), Word(0)];
static ONE: [Word; 3] = [INT_HEAD, Word(1), Word(0)];
static MINUS_ONE: [Word; 3] = [INT_HEAD, Word(u32::MAX), Word(u32::MAX)];
static ROM: [&[Word]; 3] = [&ZERO, &ONE, &MINUS_ONE];

/// Library 10.
pub struct IntegerLibrary;

fn read_int(rt: &Runtime, level: usize) -> Result<i64, RplError> {
    match read_number(rt, level)? {
        Number::Int(v) => Ok(v),
        Number::Real(_) => Err(RplError::BadArgumentType),
    }
}

/// Exact division: integer when it divides evenly, real otherwise.
fn divide(rt: &mut Runtime, a: i64, b: i64) -> Result<Number, RplError> {
    if b == 0 {
        if a == 0 {
            return Err(RplError::Arithmetic(ArithmeticFault::UndefinedResult));
        }
        rt.check_arithmetic(ArithmeticFault::InfiniteResult, a < 0)?;
        return Ok(Number::Real(if a < 0 { f64::NEG_INFINITY } else { f64::INFINITY }));
    }
    match (a.checked_rem(b), a.checked_div(b)) {
        (Some(0), Some(q)) => Ok(Number::Int(q)),
        _ => reals::checked(rt, a as f64 / b as f64, false).map(Number::Real),
    }
}

/// Result of a checked operation, promoted to a real on overflow.
fn exact_or_real(rt: &mut Runtime, exact: Option<i64>, approx: f64) -> Result<Number, RplError> {
    match exact {
        Some(v) => Ok(Number::Int(v)),
        None => reals::checked(rt, approx, false).map(Number::Real),
    }
}

fn binary(rt: &mut Runtime, op: Operator) -> Result<(), RplError> {
    let a = read_int(rt, 2)?;
    let b = read_int(rt, 1)?;
    let (fa, fb) = (a as f64, b as f64);
    let result = match op {
        Operator::Add => exact_or_real(rt, a.checked_add(b), fa + fb)?,
        Operator::Sub => exact_or_real(rt, a.checked_sub(b), fa - fb)?,
        Operator::Mul => exact_or_real(rt, a.checked_mul(b), fa * fb)?,
        Operator::Div => divide(rt, a, b)?,
        Operator::Eq | Operator::Same => Number::from(a == b),
        Operator::NotEq => Number::from(a != b),
        Operator::Lt => Number::from(a < b),
        Operator::Gt => Number::from(a > b),
        Operator::Lte => Number::from(a <= b),
        Operator::Gte => Number::from(a >= b),
        Operator::Cmp => Number::Int(a.cmp(&b) as i64),
        _ => return Err(RplError::BadArgumentType),
    };
    replace_with(rt, 2, result)
}

fn unary(rt: &mut Runtime, op: Operator) -> Result<(), RplError> {
    let a = read_int(rt, 1)?;
    let result = match op {
        Operator::Neg => exact_or_real(rt, a.checked_neg(), -(a as f64))?,
        Operator::Abs => exact_or_real(rt, a.checked_abs(), (a as f64).abs())?,
        Operator::Inv => divide(rt, 1, a)?,
        Operator::Not => Number::from(a == 0),
        Operator::IsTrue => Number::from(a != 0),
        _ => return Err(RplError::BadArgumentType),
    };
    replace_with(rt, 1, result)
}

impl Library for IntegerLibrary {
    fn name(&self) -> &'static str {
        "integers"
    }

    fn ids(&self) -> &'static [LibId] {
        &[LibId::INTEGER]
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

    fn compile(&self, cx: &mut CompileContext<'_>) -> CompileOutcome {
        let token = cx.token();
        if !token.bytes().any(|b| b.is_ascii_digit()) {
            return CompileOutcome::NotMine;
        }
        match token.parse::<i64>() {
            Ok(v) => {
                cx.emit_all(&pack_i64(LibId::INTEGER, v));
                CompileOutcome::Emitted
            }
            Err(_) => CompileOutcome::NotMine,
        }
    }

    fn decompile(&self, object: &[Word], out: &mut Decompiler<'_>) -> Result<(), RplError> {
        out.token(&unpack_i64(object)?.to_string());
        Ok(())
    }

    fn get_info(&self, object: &[Word]) -> Option<ObjectInfo> {
        object.first().filter(|w| w.is_prolog()).map(|_| ObjectInfo {
            object_type: ObjectType::Integer,
            kind: TokenKind::Number,
        })
    }

    fn check_object(&self, object: &[Word], _registry: &Registry) -> ObjectCheck {
        match object.first() {
            Some(w) if w.is_prolog() && payload(object).len() == 2 => ObjectCheck::Valid,
            Some(w) if w.is_prolog() => ObjectCheck::Invalid("integer needs two cells".into()),
            _ => ObjectCheck::Invalid("integers have no commands".into()),
        }
    }

    fn rom_objects(&self) -> &'static [&'static [Word]] {
        &ROM
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rom_constants_decode() {
        assert_eq!(unpack_i64(&ZERO), Ok(0));
        assert_eq!(unpack_i64(&ONE), Ok(1));
        assert_eq!(unpack_i64(&MINUS_ONE), Ok(-1));
    }

    #[test]
    fn compile_accepts_signed_decimals_only() {
        let lib = IntegerLibrary;
        let mut out = Vec::new();
        let mut cx = CompileContext::new("-42", None, &mut out);
        assert_eq!(lib.compile(&mut cx), CompileOutcome::Emitted);
        assert_eq!(unpack_i64(&out), Ok(-42));

        for token in ["1.5", "1e3", "+", "x1", "99999999999999999999"] {
            let mut out = Vec::new();
            let mut cx = CompileContext::new(token, None, &mut out);
            assert_eq!(lib.compile(&mut cx), CompileOutcome::NotMine, "{token}");
            assert!(out.is_empty());
        }
    }
}
