//! The numeric tower (spec §3, §4.A): fixed-width int64, arbitrary-precision
//! bigint, and double, with automatic promotion across arithmetic and
//! comparison.

use std::cmp::Ordering;
use std::fmt;

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

use crate::exception::{RunError, RunResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Number {
    Int(i64),
    BigInt(BigInt),
    Float(f64),
}

impl Number {
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Int(v) => *v == 0,
            Self::BigInt(v) => v.is_zero(),
            Self::Float(v) => *v == 0.0,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Int(v) => *v as f64,
            Self::BigInt(v) => v.to_f64().unwrap_or(f64::NAN),
            Self::Float(v) => *v,
        }
    }

    /// Normalizes a `BigInt` back down to `Int` when it fits, the way the
    /// teacher's numeric tower collapses `LongInt` results that shrink back
    /// into range (e.g. after division).
    pub fn normalize(self) -> Self {
        match self {
            Self::BigInt(v) => match v.to_i64() {
                Some(i) => Self::Int(i),
                None => Self::BigInt(v),
            },
            other => other,
        }
    }

    fn to_bigint(&self) -> BigInt {
        match self {
            Self::Int(v) => BigInt::from(*v),
            Self::BigInt(v) => v.clone(),
            Self::Float(_) => unreachable!("caller must promote to float first"),
        }
    }

    /// Applies the promotion rule from spec §3: float beats bigint beats int.
    fn promote(a: &Self, b: &Self) -> Promoted {
        if matches!(a, Self::Float(_)) || matches!(b, Self::Float(_)) {
            Promoted::Float(a.as_f64(), b.as_f64())
        } else if matches!(a, Self::BigInt(_)) || matches!(b, Self::BigInt(_)) {
            Promoted::BigInt(a.to_bigint(), b.to_bigint())
        } else {
            match (a, b) {
                (Self::Int(x), Self::Int(y)) => Promoted::Int(*x, *y),
                _ => unreachable!(),
            }
        }
    }

    pub fn add(&self, other: &Self) -> Self {
        match Self::promote(self, other) {
            Promoted::Float(x, y) => Self::Float(x + y),
            Promoted::BigInt(x, y) => Self::BigInt(x + y).normalize(),
            Promoted::Int(x, y) => match x.checked_add(y) {
                Some(v) => Self::Int(v),
                None => Self::BigInt(BigInt::from(x) + BigInt::from(y)),
            },
        }
    }

    pub fn sub(&self, other: &Self) -> Self {
        match Self::promote(self, other) {
            Promoted::Float(x, y) => Self::Float(x - y),
            Promoted::BigInt(x, y) => Self::BigInt(x - y).normalize(),
            Promoted::Int(x, y) => match x.checked_sub(y) {
                Some(v) => Self::Int(v),
                None => Self::BigInt(BigInt::from(x) - BigInt::from(y)),
            },
        }
    }

    pub fn mul(&self, other: &Self) -> Self {
        match Self::promote(self, other) {
            Promoted::Float(x, y) => Self::Float(x * y),
            Promoted::BigInt(x, y) => Self::BigInt(x * y).normalize(),
            Promoted::Int(x, y) => match x.checked_mul(y) {
                Some(v) => Self::Int(v),
                None => Self::BigInt(BigInt::from(x) * BigInt::from(y)),
            },
        }
    }

    /// Division yields the integer kind only when exact, otherwise promotes
    /// to double (spec §3). Errors on division by zero.
    pub fn div(&self, other: &Self) -> RunResult<Self> {
        if other.is_zero() {
            return Err(RunError::runtime("division by zero"));
        }
        Ok(match Self::promote(self, other) {
            Promoted::Float(x, y) => Self::Float(x / y),
            Promoted::BigInt(x, y) => {
                if (&x % &y).is_zero() {
                    Self::BigInt(x / y).normalize()
                } else {
                    Self::Float(x.to_f64().unwrap_or(f64::NAN) / y.to_f64().unwrap_or(f64::NAN))
                }
            }
            Promoted::Int(x, y) => {
                if x % y == 0 {
                    Self::Int(x / y)
                } else {
                    Self::Float(x as f64 / y as f64)
                }
            }
        })
    }

    pub fn modulo(&self, other: &Self) -> RunResult<Self> {
        if other.is_zero() {
            return Err(RunError::runtime("modulo by zero"));
        }
        Ok(match Self::promote(self, other) {
            Promoted::Float(x, y) => Self::Float(x % y),
            Promoted::BigInt(x, y) => Self::BigInt(x % y).normalize(),
            Promoted::Int(x, y) => match x.checked_rem(y) {
                Some(v) => Self::Int(v),
                None => Self::BigInt(BigInt::from(x) % BigInt::from(y)),
            },
        })
    }

    pub fn neg(&self) -> Self {
        match self {
            Self::Int(v) => v.checked_neg().map_or_else(|| Self::BigInt(-BigInt::from(*v)), Self::Int),
            Self::BigInt(v) => Self::BigInt(-v.clone()).normalize(),
            Self::Float(v) => Self::Float(-v),
        }
    }

    pub fn compare(&self, other: &Self) -> Ordering {
        match Self::promote(self, other) {
            Promoted::Float(x, y) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            Promoted::BigInt(x, y) => x.cmp(&y),
            Promoted::Int(x, y) => x.cmp(&y),
        }
    }

    pub fn numeric_eq(&self, other: &Self) -> bool {
        match Self::promote(self, other) {
            Promoted::Float(x, y) => x == y,
            Promoted::BigInt(x, y) => x == y,
            Promoted::Int(x, y) => x == y,
        }
    }

    pub fn truthy(&self) -> bool {
        !self.is_zero()
    }
}

enum Promoted {
    Int(i64, i64),
    BigInt(BigInt, BigInt),
    Float(f64, f64),
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::BigInt(v) => write!(f, "{v}"),
            Self::Float(v) => f.write_str(&format_float(*v)),
        }
    }
}

/// Round-tripping float formatting (spec §4.A), using the teacher's
/// `ryu`-backed float printer so `to_number(to_string(n)) == n` holds.
pub fn format_float(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_owned();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf".to_owned() } else { "-inf".to_owned() };
    }
    if v == v.trunc() && v.abs() < 1e17 {
        let mut buf = ryu::Buffer::new();
        let printed = buf.format_finite(v);
        // ryu always includes a decimal point (e.g. "3.0"); keep that for
        // round-trip fidelity rather than CPython's bare "3".
        return printed.to_owned();
    }
    let mut buf = ryu::Buffer::new();
    buf.format_finite(v).to_owned()
}

/// Parses a numeric literal the way `to_number` built-ins and cross-type
/// number/string equality (spec §3) require.
pub fn parse_number(s: &str) -> Option<Number> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(Number::Int(i));
    }
    if let Ok(b) = trimmed.parse::<BigInt>() {
        return Some(Number::BigInt(b).normalize());
    }
    trimmed.parse::<f64>().ok().map(Number::Float)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_promotes_to_bigint() {
        let max = Number::Int(i64::MAX);
        match max.add(&Number::Int(1)) {
            Number::BigInt(_) => {}
            other => panic!("expected bigint, got {other:?}"),
        }
    }

    #[test]
    fn exact_division_stays_int() {
        assert_eq!(Number::Int(6).div(&Number::Int(3)).unwrap(), Number::Int(2));
    }

    #[test]
    fn inexact_division_promotes_to_float() {
        assert_eq!(Number::Int(1).div(&Number::Int(2)).unwrap(), Number::Float(0.5));
    }

    #[test]
    fn division_by_zero_errors() {
        assert!(Number::Int(1).div(&Number::Int(0)).is_err());
    }

    #[test]
    fn float_round_trips() {
        let formatted = format_float(1.5);
        assert_eq!(parse_number(&formatted), Some(Number::Float(1.5)));
    }
}
