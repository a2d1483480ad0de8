//! Numeric built-ins layered on the numeric tower (spec §3, §4.A, §4.H).

use num_bigint::BigInt;
use num_traits::Signed;

use super::def;
use crate::env::Environment;
use crate::number::Number;
use crate::value::Value;

fn abs_number(n: &Number) -> Number {
    match n {
        Number::Int(v) => v.checked_abs().map_or_else(|| Number::BigInt(BigInt::from(*v).abs()), Number::Int),
        Number::BigInt(v) => Number::BigInt(v.abs()).normalize(),
        Number::Float(v) => Number::Float(v.abs()),
    }
}

pub fn register(globals: &Environment) {
    def(globals, "abs", 1, Some(1), |_interp, args| Ok(Value::Number(abs_number(args[0].as_number()?))));
    def(globals, "floor", 1, Some(1), |_interp, args| {
        Ok(Value::Number(Number::Float(args[0].as_number()?.as_f64().floor())))
    });
    def(globals, "ceil", 1, Some(1), |_interp, args| {
        Ok(Value::Number(Number::Float(args[0].as_number()?.as_f64().ceil())))
    });
    def(globals, "round", 1, Some(1), |_interp, args| {
        Ok(Value::Number(Number::Float(args[0].as_number()?.as_f64().round())))
    });
    def(globals, "sqrt", 1, Some(1), |_interp, args| {
        Ok(Value::Number(Number::Float(args[0].as_number()?.as_f64().sqrt())))
    });
    def(globals, "pow", 2, Some(2), |_interp, args| {
        let base = args[0].as_number()?.as_f64();
        let exp = args[1].as_number()?.as_f64();
        Ok(Value::Number(Number::Float(base.powf(exp))))
    });
    def(globals, "min", 2, Some(2), |_interp, args| {
        let a = args[0].as_number()?;
        let b = args[1].as_number()?;
        Ok(if a.compare(b).is_le() { args[0].clone() } else { args[1].clone() })
    });
    def(globals, "max", 2, Some(2), |_interp, args| {
        let a = args[0].as_number()?;
        let b = args[1].as_number()?;
        Ok(if a.compare(b).is_ge() { args[0].clone() } else { args[1].clone() })
    });
}
