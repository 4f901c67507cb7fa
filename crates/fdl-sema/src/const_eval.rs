//! Constant folding
//!
//! Folds operators and the arithmetic builtins over [`ConstValue`]. Each
//! operator has an explicit evaluation rule; anything else is a type error.
//! Bit vectors fold as unsigned integers of their own width, so arithmetic
//! on them wraps.

use fdl_frontend::ast::{BinaryOp, UnaryOp};
use fdl_frontend::ConstValue;
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("operator '{op}' is not defined for {lhs} and {rhs}")]
    TypeMismatch {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },

    #[error("'{op}' is not defined for {operand}")]
    BadOperand {
        op: &'static str,
        operand: &'static str,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow in '{0}'")]
    Overflow(&'static str),

    #[error("bit string of width {0} is too wide to fold")]
    TooWide(usize),

    #[error("bit strings of width {lhs} and {rhs} differ")]
    WidthMismatch { lhs: usize, rhs: usize },

    #[error("{name} expects {expected} arguments but got {got}")]
    InvalidArgCount {
        name: &'static str,
        expected: usize,
        got: usize,
    },
}

type EvalResult = Result<ConstValue, EvalError>;

/// Fold `lhs op rhs`
pub fn eval_binary(op: BinaryOp, lhs: &ConstValue, rhs: &ConstValue) -> EvalResult {
    use ConstValue::*;

    let mismatch = || EvalError::TypeMismatch {
        op: op.symbol(),
        lhs: lhs.type_name(),
        rhs: rhs.type_name(),
    };

    match op {
        BinaryOp::Eq | BinaryOp::Ne => {
            let equal = match numeric_ordering(lhs, rhs) {
                Some(ordering) => ordering.is_eq(),
                None => lhs == rhs,
            };
            Ok(Bool(equal == (op == BinaryOp::Eq)))
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = numeric_ordering(lhs, rhs).ok_or_else(|| {
                match (lhs, rhs) {
                    (Bit(bits), _) | (_, Bit(bits)) if bits.len() > 64 => EvalError::TooWide(bits.len()),
                    _ => mismatch(),
                }
            })?;
            Ok(Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }

        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Pow => {
            match (lhs, rhs) {
                (Int(a), Int(b)) => int_arith(op, *a, *b).map(Int),
                (Float(a), Float(b)) => Ok(Float(float_arith(op, *a, *b))),
                (Int(a), Float(b)) => Ok(Float(float_arith(op, *a as f64, *b))),
                (Float(a), Int(b)) => Ok(Float(float_arith(op, *a, *b as f64))),
                (Bit(a), Bit(b)) => vector_arith(op, unsigned(a)?, unsigned(b)?, a.len().max(b.len())),
                (Bit(a), Int(b)) => vector_arith(op, unsigned(a)?, *b as u64, a.len()),
                (Int(a), Bit(b)) => vector_arith(op, *a as u64, unsigned(b)?, b.len()),
                _ => Err(mismatch()),
            }
        }

        BinaryOp::Mod | BinaryOp::Rem => match (lhs, rhs) {
            (Int(_), Int(0)) => Err(EvalError::DivisionByZero),
            (Int(a), Int(b)) if op == BinaryOp::Mod => Ok(Int(a.rem_euclid(*b))),
            (Int(a), Int(b)) => Ok(Int(a % b)),
            (Bit(a), Bit(b)) => vector_arith(op, unsigned(a)?, unsigned(b)?, a.len().max(b.len())),
            (Bit(a), Int(b)) => vector_arith(op, unsigned(a)?, *b as u64, a.len()),
            (Int(a), Bit(b)) => vector_arith(op, *a as u64, unsigned(b)?, b.len()),
            _ => Err(mismatch()),
        },

        BinaryOp::Concat => match (lhs, rhs) {
            (Bit(a), Bit(b)) => Ok(Bit(a.iter().chain(b).copied().collect())),
            (Str(a), Str(b)) => Ok(Str(format!("{a}{b}"))),
            _ => Err(mismatch()),
        },

        BinaryOp::And
        | BinaryOp::Or
        | BinaryOp::Xor
        | BinaryOp::Nand
        | BinaryOp::Nor
        | BinaryOp::Xnor => match (lhs, rhs) {
            (Bool(a), Bool(b)) => Ok(Bool(logic(op, *a, *b))),
            (Bit(a), Bit(b)) if a.len() == b.len() => Ok(Bit(a
                .iter()
                .zip(b)
                .map(|(x, y)| logic(op, *x, *y))
                .collect())),
            (Bit(a), Bit(b)) => Err(EvalError::WidthMismatch {
                lhs: a.len(),
                rhs: b.len(),
            }),
            _ => Err(mismatch()),
        },
    }
}

/// Fold `op operand`
pub fn eval_unary(op: UnaryOp, operand: &ConstValue) -> EvalResult {
    let bad = || EvalError::BadOperand {
        op: match op {
            UnaryOp::Plus => "+",
            UnaryOp::Neg => "-",
            UnaryOp::Not => "not",
        },
        operand: operand.type_name(),
    };

    match (op, operand) {
        (UnaryOp::Plus, ConstValue::Int(_) | ConstValue::Float(_)) => Ok(operand.clone()),
        (UnaryOp::Neg, ConstValue::Int(v)) => v
            .checked_neg()
            .map(ConstValue::Int)
            .ok_or(EvalError::Overflow("-")),
        (UnaryOp::Neg, ConstValue::Float(v)) => Ok(ConstValue::Float(-v)),
        (UnaryOp::Not, ConstValue::Bool(b)) => Ok(ConstValue::Bool(!b)),
        (UnaryOp::Not, ConstValue::Bit(bits)) => {
            Ok(ConstValue::Bit(bits.iter().map(|b| !b).collect()))
        }
        _ => Err(bad()),
    }
}

/// Fold a call to one of the constant builtins.
///
/// Returns `None` when `name` has no folding rule.
pub fn eval_builtin(name: &str, args: &[ConstValue]) -> Option<EvalResult> {
    let result = match name {
        "clog2" => int_args::<1>("clog2", args).map(|[n]| {
            let n = n.max(1) as u64;
            ConstValue::Int(if n <= 1 { 0 } else { (n - 1).ilog2() as i64 + 1 })
        }),
        "max" => int_args::<2>("max", args).map(|[a, b]| ConstValue::Int(a.max(b))),
        "min" => int_args::<2>("min", args).map(|[a, b]| ConstValue::Int(a.min(b))),
        "abs" => int_args::<1>("abs", args).and_then(|[a]| {
            a.checked_abs()
                .map(ConstValue::Int)
                .ok_or(EvalError::Overflow("abs"))
        }),
        _ => return None,
    };
    Some(result)
}

fn int_args<const N: usize>(name: &'static str, args: &[ConstValue]) -> Result<[i64; N], EvalError> {
    if args.len() != N {
        return Err(EvalError::InvalidArgCount {
            name,
            expected: N,
            got: args.len(),
        });
    }
    let mut values = [0; N];
    for (slot, arg) in values.iter_mut().zip(args) {
        *slot = arg.as_int().ok_or(EvalError::BadOperand {
            op: name,
            operand: arg.type_name(),
        })?;
    }
    Ok(values)
}

fn int_arith(op: BinaryOp, a: i64, b: i64) -> Result<i64, EvalError> {
    let checked = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div if b == 0 => return Err(EvalError::DivisionByZero),
        BinaryOp::Div => a.checked_div(b),
        _ => u32::try_from(b).ok().and_then(|e| a.checked_pow(e)),
    };
    checked.ok_or(EvalError::Overflow(op.symbol()))
}

/// Unsigned arithmetic wrapped to `width` bits
fn vector_arith(op: BinaryOp, a: u64, b: u64, width: usize) -> EvalResult {
    let value = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div | BinaryOp::Mod | BinaryOp::Rem if b == 0 => {
            return Err(EvalError::DivisionByZero)
        }
        BinaryOp::Div => a / b,
        BinaryOp::Mod | BinaryOp::Rem => a % b,
        _ => a.wrapping_pow(u32::try_from(b).unwrap_or(u32::MAX)),
    };
    Ok(ConstValue::Bit((0..width).rev().map(|i| value >> i & 1 == 1).collect()))
}

/// Value of a bit string read as an unsigned integer
fn unsigned(bits: &[bool]) -> Result<u64, EvalError> {
    if bits.len() > 64 {
        return Err(EvalError::TooWide(bits.len()));
    }
    Ok(bits.iter().fold(0, |acc, bit| acc << 1 | u64::from(*bit)))
}

/// Order of two numeric operands, bit strings compared by unsigned value
fn numeric_ordering(lhs: &ConstValue, rhs: &ConstValue) -> Option<Ordering> {
    use ConstValue::*;

    let wide = |value: &ConstValue| match value {
        Int(v) => Some(i128::from(*v)),
        Bit(bits) => unsigned(bits).ok().map(i128::from),
        _ => None,
    };
    match (lhs, rhs) {
        (Int(a), Int(b)) => Some(a.cmp(b)),
        (Float(a), Float(b)) => a.partial_cmp(b),
        (Int(a), Float(b)) => (*a as f64).partial_cmp(b),
        (Float(a), Int(b)) => a.partial_cmp(&(*b as f64)),
        (Bit(a), Bit(b)) if a.len() == b.len() => Some(a.cmp(b)),
        (Bit(_), Bit(_) | Int(_)) | (Int(_), Bit(_)) => Some(wide(lhs)?.cmp(&wide(rhs)?)),
        _ => None,
    }
}

fn float_arith(op: BinaryOp, a: f64, b: f64) -> f64 {
    match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        _ => a.powf(b),
    }
}

fn logic(op: BinaryOp, a: bool, b: bool) -> bool {
    match op {
        BinaryOp::And => a && b,
        BinaryOp::Or => a || b,
        BinaryOp::Xor => a ^ b,
        BinaryOp::Nand => !(a && b),
        BinaryOp::Nor => !(a || b),
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConstValue::*;

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(eval_binary(BinaryOp::Sub, &Int(7), &Int(1)), Ok(Int(6)));
        assert_eq!(eval_binary(BinaryOp::Pow, &Int(2), &Int(10)), Ok(Int(1024)));
        assert_eq!(eval_binary(BinaryOp::Mod, &Int(-7), &Int(3)), Ok(Int(2)));
        assert_eq!(eval_binary(BinaryOp::Rem, &Int(-7), &Int(3)), Ok(Int(-1)));
        assert_eq!(
            eval_binary(BinaryOp::Div, &Int(1), &Int(0)),
            Err(EvalError::DivisionByZero)
        );
        assert_eq!(
            eval_binary(BinaryOp::Add, &Int(i64::MAX), &Int(1)),
            Err(EvalError::Overflow("+"))
        );
    }

    #[test]
    fn test_comparisons_and_logic() {
        assert_eq!(eval_binary(BinaryOp::Lt, &Int(1), &Int(2)), Ok(Bool(true)));
        assert_eq!(eval_binary(BinaryOp::Ge, &Float(1.5), &Int(2)), Ok(Bool(false)));
        assert_eq!(
            eval_binary(BinaryOp::Xor, &Bit(vec![true, false]), &Bit(vec![true, true])),
            Ok(Bit(vec![false, true]))
        );
        assert_eq!(eval_binary(BinaryOp::Nand, &Bool(true), &Bool(true)), Ok(Bool(false)));
        assert!(matches!(
            eval_binary(BinaryOp::And, &Bit(vec![true]), &Bit(vec![true, true])),
            Err(EvalError::WidthMismatch { lhs: 1, rhs: 2 })
        ));
    }

    #[test]
    fn test_concatenation() {
        assert_eq!(
            eval_binary(BinaryOp::Concat, &Bit(vec![true]), &Bit(vec![false, false])),
            Ok(Bit(vec![true, false, false]))
        );
        assert!(matches!(
            eval_binary(BinaryOp::Concat, &Int(1), &Bit(vec![true])),
            Err(EvalError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_unary() {
        assert_eq!(eval_unary(UnaryOp::Neg, &Int(3)), Ok(Int(-3)));
        assert_eq!(eval_unary(UnaryOp::Not, &Bit(vec![true, false])), Ok(Bit(vec![false, true])));
        assert!(eval_unary(UnaryOp::Not, &Int(1)).is_err());
    }

    #[test]
    fn test_builtins() {
        assert_eq!(eval_builtin("clog2", &[Int(1)]), Some(Ok(Int(0))));
        assert_eq!(eval_builtin("clog2", &[Int(8)]), Some(Ok(Int(3))));
        assert_eq!(eval_builtin("clog2", &[Int(9)]), Some(Ok(Int(4))));
        assert_eq!(eval_builtin("max", &[Int(3), Int(5)]), Some(Ok(Int(5))));
        assert_eq!(eval_builtin("min", &[Int(3), Int(5)]), Some(Ok(Int(3))));
        assert_eq!(eval_builtin("abs", &[Int(-4)]), Some(Ok(Int(4))));
        assert!(matches!(
            eval_builtin("max", &[Int(3)]),
            Some(Err(EvalError::InvalidArgCount { expected: 2, got: 1, .. }))
        ));
        assert_eq!(eval_builtin("rising_edge", &[]), None);
    }

    fn bits(text: &str) -> ConstValue {
        Bit(text.chars().map(|c| c == '1').collect())
    }

    #[test]
    fn test_bit_vectors_fold_as_unsigned() {
        assert_eq!(eval_binary(BinaryOp::Add, &bits("0011"), &Int(1)), Ok(bits("0100")));
        assert_eq!(eval_binary(BinaryOp::Add, &bits("0011"), &bits("0001")), Ok(bits("0100")));
        assert_eq!(eval_binary(BinaryOp::Add, &bits("1111"), &Int(1)), Ok(bits("0000")));
        assert_eq!(eval_binary(BinaryOp::Sub, &Int(0), &bits("0001")), Ok(bits("1111")));
        assert_eq!(eval_binary(BinaryOp::Mul, &bits("0011"), &bits("01")), Ok(bits("0011")));
        assert_eq!(
            eval_binary(BinaryOp::Div, &bits("0011"), &Int(0)),
            Err(EvalError::DivisionByZero)
        );
    }

    #[test]
    fn test_bit_vectors_compare_by_value() {
        assert_eq!(eval_binary(BinaryOp::Lt, &bits("0011"), &Int(5)), Ok(Bool(true)));
        assert_eq!(eval_binary(BinaryOp::Gt, &bits("0011"), &Int(-1)), Ok(Bool(true)));
        assert_eq!(eval_binary(BinaryOp::Eq, &bits("0001"), &Int(1)), Ok(Bool(true)));
        assert_eq!(eval_binary(BinaryOp::Ne, &Int(2), &bits("10")), Ok(Bool(false)));
        assert_eq!(eval_binary(BinaryOp::Le, &bits("01"), &bits("0001")), Ok(Bool(true)));
        assert_eq!(eval_binary(BinaryOp::Eq, &Int(1), &Float(1.0)), Ok(Bool(true)));

        let wide = Bit(vec![true; 65]);
        assert_eq!(
            eval_binary(BinaryOp::Lt, &wide, &Int(1)),
            Err(EvalError::TooWide(65))
        );
        assert_eq!(eval_binary(BinaryOp::Add, &wide, &Int(1)), Err(EvalError::TooWide(65)));
    }
}
