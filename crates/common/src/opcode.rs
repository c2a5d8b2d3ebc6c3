//! Overloadable operators.
//!
//! Operators live in their own opcode namespace owned by the overloadable
//! operator library ([`LibId::OVERLOADABLE`]). The command index of an
//! operator word is the operator's discriminant; the operator library
//! forwards it to the library that owns the operand types.

use crate::error::WordError;
use crate::word::{LibId, Word};

/// An operator whose meaning depends on the types of its operands.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    // Arithmetic
    /// Level 2 plus level 1.
    Add = 0,
    /// Level 2 minus level 1.
    Sub = 1,
    /// Level 2 times level 1.
    Mul = 2,
    /// Level 2 divided by level 1.
    Div = 3,
    /// Negate level 1.
    Neg = 4,
    /// Absolute value of level 1.
    Abs = 5,
    /// Reciprocal of level 1.
    Inv = 6,

    // Comparison
    /// Equality. Never fails on mismatched types.
    Eq = 16,
    /// Inequality. Never fails on mismatched types.
    NotEq = 17,
    Lt = 18,
    Gt = 19,
    Lte = 20,
    Gte = 21,
    /// Identity comparison. Never fails on mismatched types.
    Same = 22,
    /// Three-way comparison, pushes -1, 0 or 1.
    Cmp = 23,

    // Logic
    /// Logical negation of level 1.
    Not = 32,
    /// Truth test of level 1 (pushes 1 or 0).
    IsTrue = 33,

    // Evaluation
    /// Evaluate level 1.
    Eval = 48,
}

/// All operators, in definition order.
pub const ALL_OPERATORS: [Operator; 18] = [
    Operator::Add,
    Operator::Sub,
    Operator::Mul,
    Operator::Div,
    Operator::Neg,
    Operator::Abs,
    Operator::Inv,
    Operator::Eq,
    Operator::NotEq,
    Operator::Lt,
    Operator::Gt,
    Operator::Lte,
    Operator::Gte,
    Operator::Same,
    Operator::Cmp,
    Operator::Not,
    Operator::IsTrue,
    Operator::Eval,
];

impl TryFrom<u32> for Operator {
    type Error = WordError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Operator::Add),
            1 => Ok(Operator::Sub),
            2 => Ok(Operator::Mul),
            3 => Ok(Operator::Div),
            4 => Ok(Operator::Neg),
            5 => Ok(Operator::Abs),
            6 => Ok(Operator::Inv),
            16 => Ok(Operator::Eq),
            17 => Ok(Operator::NotEq),
            18 => Ok(Operator::Lt),
            19 => Ok(Operator::Gt),
            20 => Ok(Operator::Lte),
            21 => Ok(Operator::Gte),
            22 => Ok(Operator::Same),
            23 => Ok(Operator::Cmp),
            32 => Ok(Operator::Not),
            33 => Ok(Operator::IsTrue),
            48 => Ok(Operator::Eval),
            _ => Err(WordError::UnknownOperator(value)),
        }
    }
}

impl Operator {
    /// Display mnemonic.
    pub const fn mnemonic(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Neg => "NEG",
            Operator::Abs => "ABS",
            Operator::Inv => "INV",
            Operator::Eq => "==",
            Operator::NotEq => "≠",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Lte => "≤",
            Operator::Gte => "≥",
            Operator::Same => "SAME",
            Operator::Cmp => "CMP",
            Operator::Not => "NOT",
            Operator::IsTrue => "ISTRUE",
            Operator::Eval => "EVAL",
        }
    }

    /// Look up an operator by its mnemonic or an ASCII alias.
    pub fn from_mnemonic(text: &str) -> Option<Operator> {
        let alias = match text {
            "!=" | "<>" => Some(Operator::NotEq),
            "<=" => Some(Operator::Lte),
            ">=" => Some(Operator::Gte),
            _ => None,
        };
        alias.or_else(|| ALL_OPERATORS.iter().copied().find(|op| op.mnemonic() == text))
    }

    /// Number of stack arguments consumed.
    pub fn nargs(&self) -> usize {
        match self {
            Operator::Neg
            | Operator::Abs
            | Operator::Inv
            | Operator::Not
            | Operator::IsTrue
            | Operator::Eval => 1,
            _ => 2,
        }
    }

    /// Equality-like operators fall back to a total comparison instead of
    /// failing on mismatched operand types.
    pub fn is_total(&self) -> bool {
        matches!(self, Operator::Eq | Operator::NotEq | Operator::Same)
    }

    /// The command word that invokes this operator.
    pub fn word(&self) -> Word {
        Word::command(LibId::OVERLOADABLE, *self as u32)
    }
}
