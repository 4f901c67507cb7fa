//! Literal values and the helpers that decode their source text

use serde::{Deserialize, Serialize};
use std::fmt;

/// A typed constant value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstValue {
    Int(i64),
    /// Bits in source order, most significant first
    Bit(Vec<bool>),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl ConstValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConstValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConstValue::Bool(b) => Some(*b),
            ConstValue::Bit(bits) if bits.len() == 1 => Some(bits[0]),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConstValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Number of scalar elements the value spreads over
    pub fn width(&self) -> usize {
        match self {
            ConstValue::Bit(bits) => bits.len(),
            _ => 1,
        }
    }

    /// Type name a value of this kind carries
    pub fn type_name(&self) -> &'static str {
        match self {
            ConstValue::Int(_) => "sint",
            ConstValue::Bit(_) => "bit",
            ConstValue::Float(_) => "float",
            ConstValue::Str(_) => "str",
            ConstValue::Bool(_) => "bool",
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Int(v) => write!(f, "{v}"),
            ConstValue::Bit(bits) => {
                f.write_str("'")?;
                for bit in bits {
                    f.write_str(if *bit { "1" } else { "0" })?;
                }
                f.write_str("'")
            }
            ConstValue::Float(v) => write!(f, "{v}"),
            ConstValue::Str(s) => write!(f, "\"{s}\""),
            ConstValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// A constant node: type name, type parameters and value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Literal {
    pub type_name: String,
    /// Type parameters, e.g. the bit width of an integer
    pub params: Vec<i64>,
    pub value: ConstValue,
}

impl Literal {
    /// Signed integer constant sized to hold `value`
    pub fn int(value: i64) -> Self {
        Self {
            type_name: "sint".to_string(),
            params: vec![determine_bits(value) as i64],
            value: ConstValue::Int(value),
        }
    }

    pub fn bit(value: bool) -> Self {
        Self {
            type_name: "bit".to_string(),
            params: Vec::new(),
            value: ConstValue::Bit(vec![value]),
        }
    }

    pub fn float(value: f64) -> Self {
        Self {
            type_name: "float".to_string(),
            params: Vec::new(),
            value: ConstValue::Float(value),
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self {
            type_name: "str".to_string(),
            params: Vec::new(),
            value: ConstValue::Str(value.into()),
        }
    }

    pub fn boolean(value: bool) -> Self {
        Self {
            type_name: "bool".to_string(),
            params: Vec::new(),
            value: ConstValue::Bool(value),
        }
    }

    /// Build the literal for a folded value
    pub fn from_value(value: ConstValue) -> Self {
        match value {
            ConstValue::Int(v) => Self::int(v),
            ConstValue::Float(v) => Self::float(v),
            ConstValue::Str(s) => Self::string(s),
            ConstValue::Bool(b) => Self::boolean(b),
            ConstValue::Bit(bits) => Self {
                type_name: "bit".to_string(),
                params: Vec::new(),
                value: ConstValue::Bit(bits),
            },
        }
    }
}

/// Minimum signed bit width for an integer literal.
///
/// `ceil(log2(|v|)) + 2`, with 2 bits for zero.
pub fn determine_bits(value: i64) -> u32 {
    let magnitude = value.unsigned_abs();
    if magnitude == 0 {
        return 2;
    }
    let ceil_log2 = u64::BITS - (magnitude - 1).leading_zeros();
    ceil_log2 + 2
}

/// Parse a decimal integer, allowing `_` separators
pub fn parse_decimal(input: &str) -> Option<i64> {
    let cleaned: String = input.chars().filter(|c| *c != '_').collect();
    cleaned.parse().ok()
}

pub fn parse_float(input: &str) -> Option<f64> {
    let cleaned: String = input.chars().filter(|c| *c != '_').collect();
    cleaned.parse().ok()
}

/// Strip the quotes from a string literal
pub fn parse_string(input: &str) -> String {
    input
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(input)
        .replace("\\\"", "\"")
}

/// Expand `b'0101'` or `'0101'` into bits
pub fn parse_binary_bits(input: &str) -> Option<Vec<bool>> {
    let body = input.strip_prefix('b').unwrap_or(input);
    let body = body.strip_prefix('\'')?.strip_suffix('\'')?;
    body.chars()
        .map(|c| match c {
            '0' => Some(false),
            '1' => Some(true),
            _ => None,
        })
        .collect()
}

/// Expand `x'A5'` into bits, four per hex digit
pub fn parse_hex_bits(input: &str) -> Option<Vec<bool>> {
    let body = input.strip_prefix('x')?;
    let body = body.strip_prefix('\'')?.strip_suffix('\'')?;
    let mut bits = Vec::with_capacity(body.len() * 4);
    for c in body.chars() {
        let nibble = c.to_digit(16)?;
        for shift in (0..4).rev() {
            bits.push((nibble >> shift) & 1 == 1);
        }
    }
    Some(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determine_bits() {
        assert_eq!(determine_bits(0), 2);
        assert_eq!(determine_bits(1), 2);
        assert_eq!(determine_bits(2), 3);
        assert_eq!(determine_bits(7), 5);
        assert_eq!(determine_bits(8), 5);
        assert_eq!(determine_bits(9), 6);
        assert_eq!(determine_bits(-7), determine_bits(7));
        assert_eq!(determine_bits(i64::MIN), 65);
    }

    #[test]
    fn test_hex_matches_binary() {
        assert_eq!(parse_hex_bits("x'A'"), parse_binary_bits("b'1010'"));
        assert_eq!(
            parse_hex_bits("x'0f'"),
            Some(vec![false, false, false, false, true, true, true, true])
        );
    }

    #[test]
    fn test_bare_binary() {
        assert_eq!(parse_binary_bits("'1'"), Some(vec![true]));
        assert_eq!(parse_binary_bits("'102'"), None);
    }

    #[test]
    fn test_decimal_with_separators() {
        assert_eq!(parse_decimal("1_000"), Some(1000));
        assert_eq!(parse_string("\"hi\""), "hi");
    }
}
