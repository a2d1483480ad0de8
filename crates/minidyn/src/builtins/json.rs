//! JSON encode/decode (spec §4.H), via `serde_json`. Arbitrary-precision
//! integers round-trip through `f64` since MiniDyn's JSON surface doesn't
//! carry the `arbitrary_precision` feature — consistent with most embedded
//! scripting JSON bridges.

use indexmap::IndexMap;
use serde_json::Value as Json;

use super::def;
use crate::env::Environment;
use crate::exception::{RunError, RunResult};
use crate::number::Number;
use crate::value::Value;

pub fn register(globals: &Environment) {
    def(globals, "json_encode", 1, Some(1), |_interp, args| {
        let json = value_to_json(&args[0])?;
        serde_json::to_string(&json).map(Value::from).map_err(|e| RunError::runtime(format!("json encode error: {e}")))
    });
    def(globals, "json_decode", 1, Some(1), |_interp, args| {
        let text = args[0].as_str()?;
        let json: Json = serde_json::from_str(text).map_err(|e| RunError::runtime(format!("json decode error: {e}")))?;
        Ok(json_to_value(&json))
    });
}

fn value_to_json(value: &Value) -> RunResult<Json> {
    Ok(match value {
        Value::Nil => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Number(n) => match n {
            Number::Int(i) => Json::Number((*i).into()),
            Number::BigInt(b) => serde_json::Number::from_f64(num_traits::ToPrimitive::to_f64(b).unwrap_or(0.0))
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Number::Float(f) => serde_json::Number::from_f64(*f).map(Json::Number).unwrap_or(Json::Null),
        },
        Value::Str(s) => Json::String(s.to_string()),
        Value::Array(a) => Json::Array(a.borrow().iter().map(value_to_json).collect::<RunResult<Vec<_>>>()?),
        Value::Object(o) => {
            let mut map = serde_json::Map::new();
            for (k, v) in o.borrow().iter() {
                map.insert(k.clone(), value_to_json(v)?);
            }
            Json::Object(map)
        }
        Value::Function(_) => return Err(RunError::runtime("cannot json-encode a function")),
    })
}

fn json_to_value(json: &Json) -> Value {
    match json {
        Json::Null => Value::Nil,
        Json::Bool(b) => Value::from(*b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else {
                Value::from(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Json::String(s) => Value::from(s.clone()),
        Json::Array(items) => Value::array(items.iter().map(json_to_value).collect()),
        Json::Object(map) => {
            let mut out: IndexMap<String, Value> = IndexMap::new();
            for (k, v) in map {
                out.insert(k.clone(), json_to_value(v));
            }
            Value::object(out)
        }
    }
}
