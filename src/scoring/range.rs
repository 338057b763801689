use std::fmt;

use crate::error::SpecError;

/// A parsed range token from the scoring spec.
///
/// Token formats, tried in this order: `>=X`, `>X`, `<=X`, `<X`, `A-B`
/// (inclusive on both ends) and a bare number for exact equality.
/// A `%` anywhere in the token is cosmetic and stripped before parsing;
/// no unit conversion happens here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeOp {
    LessThan(f64),
    LessEqual(f64),
    GreaterThan(f64),
    GreaterEqual(f64),
    Equal(f64),
    Between(f64, f64), // Inclusive range: A-B
}

impl RangeOp {
    pub fn parse(token: &str) -> Result<Self, SpecError> {
        let cleaned = token.replace('%', "");
        let s = cleaned.trim();
        let number = |text: &str| parse_number(token, text);

        if let Some(val) = s.strip_prefix(">=") {
            Ok(RangeOp::GreaterEqual(number(val)?))
        } else if let Some(val) = s.strip_prefix('>') {
            Ok(RangeOp::GreaterThan(number(val)?))
        } else if let Some(val) = s.strip_prefix("<=") {
            Ok(RangeOp::LessEqual(number(val)?))
        } else if let Some(val) = s.strip_prefix('<') {
            Ok(RangeOp::LessThan(number(val)?))
        } else if s.contains('-') && !s.starts_with('-') {
            // Range format: "65-72"
            match s.split_once('-') {
                Some((low, high)) if !high.contains('-') => {
                    Ok(RangeOp::Between(number(low)?, number(high)?))
                }
                _ => Err(SpecError::InvalidRange {
                    token: token.to_string(),
                    reason: "expected exactly one '-' between two numbers".to_string(),
                }),
            }
        } else {
            Ok(RangeOp::Equal(number(s)?))
        }
    }

    pub fn matches(&self, value: f64) -> bool {
        match self {
            RangeOp::LessThan(n) => value < *n,
            RangeOp::LessEqual(n) => value <= *n,
            RangeOp::GreaterThan(n) => value > *n,
            RangeOp::GreaterEqual(n) => value >= *n,
            RangeOp::Equal(n) => value == *n,
            RangeOp::Between(low, high) => value >= *low && value <= *high,
        }
    }

    /// `A-B` with `A > B` can never match anything.
    pub fn is_empty(&self) -> bool {
        matches!(self, RangeOp::Between(low, high) if low > high)
    }
}

impl fmt::Display for RangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeOp::LessThan(n) => write!(f, "<{}", n),
            RangeOp::LessEqual(n) => write!(f, "<={}", n),
            RangeOp::GreaterThan(n) => write!(f, ">{}", n),
            RangeOp::GreaterEqual(n) => write!(f, ">={}", n),
            RangeOp::Equal(n) => write!(f, "{}", n),
            RangeOp::Between(low, high) => write!(f, "{}-{}", low, high),
        }
    }
}

fn parse_number(token: &str, text: &str) -> Result<f64, SpecError> {
    let text = text.trim();
    let value: f64 = text.parse().map_err(|_| SpecError::InvalidRange {
        token: token.to_string(),
        reason: format!("'{}' is not a number", text),
    })?;
    if !value.is_finite() {
        return Err(SpecError::InvalidRange {
            token: token.to_string(),
            reason: format!("'{}' is not a finite number", text),
        });
    }
    Ok(value)
}

/// Test a value against a raw range token.
///
/// Malformed tokens are an authoring error in the scoring spec and surface as
/// [`SpecError::InvalidRange`].
pub fn matches(value: f64, token: &str) -> Result<bool, SpecError> {
    Ok(RangeOp::parse(token)?.matches(value))
}
