//! Object type numbers reported by `TYPE` and `GetInfo`.
//!
//! Numbering follows the classic calculator convention so programs that
//! branch on `TYPE` keep working.

use crate::error::WordError;

/// User-visible type of an object.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Real = 0,
    String = 2,
    /// Numeric vector (array).
    Vector = 3,
    List = 5,
    /// Identifier (bare or quoted).
    Name = 6,
    /// Secondary / program.
    Program = 8,
    /// Built-in command.
    Command = 18,
    Integer = 28,
}

/// All object types, in definition order.
pub const ALL_OBJECT_TYPES: [ObjectType; 8] = [
    ObjectType::Real,
    ObjectType::String,
    ObjectType::Vector,
    ObjectType::List,
    ObjectType::Name,
    ObjectType::Program,
    ObjectType::Command,
    ObjectType::Integer,
];

impl TryFrom<u8> for ObjectType {
    type Error = WordError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ObjectType::Real),
            2 => Ok(ObjectType::String),
            3 => Ok(ObjectType::Vector),
            5 => Ok(ObjectType::List),
            6 => Ok(ObjectType::Name),
            8 => Ok(ObjectType::Program),
            18 => Ok(ObjectType::Command),
            28 => Ok(ObjectType::Integer),
            _ => Err(WordError::UnknownObjectType(value)),
        }
    }
}

impl ObjectType {
    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            ObjectType::Real => "real",
            ObjectType::String => "string",
            ObjectType::Vector => "vector",
            ObjectType::List => "list",
            ObjectType::Name => "name",
            ObjectType::Program => "program",
            ObjectType::Command => "command",
            ObjectType::Integer => "integer",
        }
    }

    /// True for numbers (reals and integers).
    pub fn is_number(&self) -> bool {
        matches!(self, ObjectType::Real | ObjectType::Integer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_all_types() {
        for &t in &ALL_OBJECT_TYPES {
            assert_eq!(ObjectType::try_from(t as u8), Ok(t));
        }
    }

    #[test]
    fn undefined_numbers_rejected() {
        assert_eq!(ObjectType::try_from(1), Err(WordError::UnknownObjectType(1)));
        assert_eq!(ObjectType::try_from(255), Err(WordError::UnknownObjectType(255)));
    }

    #[test]
    fn numbers() {
        assert!(ObjectType::Integer.is_number());
        assert!(ObjectType::Real.is_number());
        assert!(!ObjectType::List.is_number());
    }
}
