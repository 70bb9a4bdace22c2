//! The closed type set of the source language and its conversion rules.
//!
//! The language has eight fixed-width integer types, `bool`, and `void`.
//! There are no implicit conversions between signed and unsigned values and
//! no silent narrowing, with one deliberate exception: the 64-bit default
//! types (`i64`/`u64`) may initialize narrower variables, because bare
//! integer literals are always inferred as the 64-bit default.
//!
//! ## Conversion law
//!
//! For a value of source type `S` flowing into target type `T` (assignment,
//! initializer, return, argument passing):
//!
//! 1. `S == T` is compatible.
//! 2. If either side is non-numeric and they differ, incompatible.
//! 3. Mixed signedness is incompatible.
//! 4. Otherwise compatible iff `bits(S) <= bits(T)`, or `S` is the 64-bit
//!    default of its signedness.

use casm_base::SourceLocation;

use crate::ast::{BinaryOp, UnaryOp};

/// A source-language type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    Bool,
    Void,
}

impl Type {
    /// Bit width for the integer types, `None` for `bool` and `void`.
    pub fn bits(self) -> Option<u32> {
        match self {
            Type::I8 | Type::U8 => Some(8),
            Type::I16 | Type::U16 => Some(16),
            Type::I32 | Type::U32 => Some(32),
            Type::I64 | Type::U64 => Some(64),
            Type::Bool | Type::Void => None,
        }
    }

    /// Returns `true` for the eight integer types.
    pub fn is_numeric(self) -> bool {
        self.bits().is_some()
    }

    /// Returns `true` for `i8`/`i16`/`i32`/`i64`.
    pub fn is_signed(self) -> bool {
        matches!(self, Type::I8 | Type::I16 | Type::I32 | Type::I64)
    }

    /// The source-language spelling of the type.
    pub fn name(self) -> &'static str {
        match self {
            Type::I8 => "i8",
            Type::I16 => "i16",
            Type::I32 => "i32",
            Type::I64 => "i64",
            Type::U8 => "u8",
            Type::U16 => "u16",
            Type::U32 => "u32",
            Type::U64 => "u64",
            Type::Bool => "bool",
            Type::Void => "void",
        }
    }

    /// Checks whether a value of this type may flow into `target`.
    ///
    /// This is the conversion law used for assignments, initializers,
    /// returns, and argument passing. It permits exact matches, widening,
    /// and narrowing from the 64-bit literal-default types; everything else
    /// is rejected.
    pub fn convertible_to(self, target: Type) -> bool {
        if self == target {
            return true;
        }

        let (source_bits, target_bits) = match (self.bits(), target.bits()) {
            (Some(s), Some(t)) => (s, t),
            // Non-numeric types only match exactly.
            _ => return false,
        };

        if self.is_signed() != target.is_signed() {
            return false;
        }

        // Widening is always allowed; narrowing only from the 64-bit
        // defaults, which is what bare integer literals infer to.
        source_bits <= target_bits || source_bits == 64
    }

    /// The wider of two numeric types.
    ///
    /// Both operands must be numeric; callers enforce mutual compatibility
    /// first, so signedness already agrees.
    pub fn wider(self, other: Type) -> Type {
        match (self.bits(), other.bits()) {
            (Some(a), Some(b)) if a >= b => self,
            (Some(_), Some(_)) => other,
            _ => self,
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A type together with the location where it was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeNode {
    pub ty: Type,
    pub location: SourceLocation,
}

impl TypeNode {
    pub fn new(ty: Type, location: SourceLocation) -> Self {
        Self { ty, location }
    }
}

/// Result type of a binary operation over already-checked operands.
///
/// Arithmetic yields the wider operand type; relational and logical
/// operators yield `bool`; assignment yields the left-hand side's type.
pub fn binary_result_type(left: Type, op: BinaryOp, right: Type) -> Type {
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            left.wider(right)
        }
        BinaryOp::Eq
        | BinaryOp::Ne
        | BinaryOp::Lt
        | BinaryOp::Gt
        | BinaryOp::Le
        | BinaryOp::Ge
        | BinaryOp::And
        | BinaryOp::Or => Type::Bool,
        BinaryOp::Assign => left,
    }
}

/// Result type of a unary operation: negation preserves the operand type,
/// logical not yields `bool`.
pub fn unary_result_type(op: UnaryOp, operand: Type) -> Type {
    match op {
        UnaryOp::Neg => operand,
        UnaryOp::Not => Type::Bool,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_is_convertible() {
        assert!(Type::I32.convertible_to(Type::I32));
        assert!(Type::Bool.convertible_to(Type::Bool));
        assert!(Type::Void.convertible_to(Type::Void));
    }

    #[test]
    fn widening_is_convertible() {
        assert!(Type::I8.convertible_to(Type::I16));
        assert!(Type::I16.convertible_to(Type::I64));
        assert!(Type::U8.convertible_to(Type::U32));
    }

    #[test]
    fn narrowing_is_rejected_except_from_defaults() {
        assert!(!Type::I32.convertible_to(Type::I16));
        assert!(!Type::U32.convertible_to(Type::U8));
        // Literal defaults may narrow.
        assert!(Type::I64.convertible_to(Type::I8));
        assert!(Type::U64.convertible_to(Type::U16));
    }

    #[test]
    fn mixed_signedness_is_rejected() {
        assert!(!Type::I32.convertible_to(Type::U32));
        assert!(!Type::U64.convertible_to(Type::I64));
        assert!(!Type::I8.convertible_to(Type::U64));
    }

    #[test]
    fn non_numeric_mismatches_are_rejected() {
        assert!(!Type::Bool.convertible_to(Type::I32));
        assert!(!Type::I32.convertible_to(Type::Bool));
        assert!(!Type::Void.convertible_to(Type::Bool));
    }

    #[test]
    fn arithmetic_result_is_wider_operand() {
        assert_eq!(binary_result_type(Type::I16, BinaryOp::Add, Type::I64), Type::I64);
        assert_eq!(binary_result_type(Type::U32, BinaryOp::Mul, Type::U8), Type::U32);
        assert_eq!(binary_result_type(Type::I8, BinaryOp::Mod, Type::I8), Type::I8);
    }

    #[test]
    fn comparisons_and_logic_yield_bool() {
        assert_eq!(binary_result_type(Type::I32, BinaryOp::Lt, Type::I32), Type::Bool);
        assert_eq!(binary_result_type(Type::U64, BinaryOp::Ne, Type::U64), Type::Bool);
        assert_eq!(binary_result_type(Type::Bool, BinaryOp::And, Type::Bool), Type::Bool);
    }

    #[test]
    fn assignment_yields_lhs_type() {
        assert_eq!(binary_result_type(Type::I16, BinaryOp::Assign, Type::I64), Type::I16);
    }

    #[test]
    fn unary_results() {
        assert_eq!(unary_result_type(UnaryOp::Neg, Type::I32), Type::I32);
        assert_eq!(unary_result_type(UnaryOp::Not, Type::Bool), Type::Bool);
    }

    #[test]
    fn width_queries() {
        assert_eq!(Type::I8.bits(), Some(8));
        assert_eq!(Type::U64.bits(), Some(64));
        assert_eq!(Type::Bool.bits(), None);
        assert!(Type::U16.is_numeric());
        assert!(!Type::Void.is_numeric());
        assert!(Type::I64.is_signed());
        assert!(!Type::U8.is_signed());
    }
}
