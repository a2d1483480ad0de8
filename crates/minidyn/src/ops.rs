//! Shared indexing/property/call-argument machinery (spec §4.E), used by
//! both the tree-walking evaluator and the bytecode VM so the two execution
//! engines agree on semantics exactly.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::exception::{RunError, RunResult};
use crate::function::Callable;
use crate::number::Number;
use crate::value::Value;

fn normalize_index(len: usize, i: i64) -> Option<usize> {
    let idx = if i < 0 { i + len as i64 } else { i };
    if idx < 0 || idx as usize >= len {
        None
    } else {
        Some(idx as usize)
    }
}

fn index_as_i64(index: &Value) -> RunResult<i64> {
    match index.as_number()? {
        Number::Int(i) => Ok(*i),
        Number::Float(f) => Ok(*f as i64),
        Number::BigInt(b) => Ok(num_traits::ToPrimitive::to_i64(b).unwrap_or(i64::MAX)),
    }
}

/// `a[i]` / `s[i]` / `o[k]` (spec §4.E "Indexing").
pub fn get_index(base: &Value, index: &Value) -> RunResult<Value> {
    match base {
        Value::Array(arr) => {
            let i = index_as_i64(index)?;
            let items = arr.borrow();
            match normalize_index(items.len(), i) {
                Some(idx) => Ok(items[idx].clone()),
                None => Err(RunError::runtime("index out of range")),
            }
        }
        Value::Str(s) => {
            let i = index_as_i64(index)?;
            let chars: Vec<char> = s.chars().collect();
            match normalize_index(chars.len(), i) {
                Some(idx) => Ok(Value::from(chars[idx].to_string())),
                None => Err(RunError::runtime("index out of range")),
            }
        }
        Value::Object(obj) => {
            let key = index.as_key();
            Ok(obj.borrow().get(&key).cloned().unwrap_or(Value::Nil))
        }
        Value::Nil => Ok(Value::Nil),
        other => Err(RunError::runtime(format!("cannot index into {}", other.type_name()))),
    }
}

/// `arr[i] = v` / `obj[k] = v`. Writes beyond current length are always
/// errors — never auto-extend (spec §9 Open Question, resolved as binding).
/// String-index assignment is always an error (spec §4.E).
pub fn set_index(base: &Value, index: &Value, value: Value) -> RunResult<()> {
    match base {
        Value::Array(arr) => {
            let i = index_as_i64(index)?;
            let mut items = arr.borrow_mut();
            match normalize_index(items.len(), i) {
                Some(idx) => {
                    items[idx] = value;
                    Ok(())
                }
                None => Err(RunError::runtime("index out of range")),
            }
        }
        Value::Object(obj) => {
            let key = index.as_key();
            obj.borrow_mut().insert(key, value);
            Ok(())
        }
        Value::Str(_) => Err(RunError::runtime("cannot assign into a string index")),
        other => Err(RunError::runtime(format!("cannot index into {}", other.type_name()))),
    }
}

/// `o.x` / `o?.x` (spec §4.E "Property access"). Only objects (and nil, for
/// the optional form, short-circuited by the caller) support property
/// access; missing keys return nil.
pub fn get_property(base: &Value, name: &str) -> RunResult<Value> {
    match base {
        Value::Object(obj) => Ok(obj.borrow().get(name).cloned().unwrap_or(Value::Nil)),
        other => Err(RunError::runtime(format!("Expected object, got {}", other.type_name()))),
    }
}

pub fn set_property(base: &Value, name: &str, value: Value) -> RunResult<()> {
    match base {
        Value::Object(obj) => {
            obj.borrow_mut().insert(name.to_owned(), value);
            Ok(())
        }
        other => Err(RunError::runtime(format!("Expected object, got {}", other.type_name()))),
    }
}

/// Produces the callee used for a method call: if the callee is a normal
/// (non-arrow) user/bytecode function, clone it with the receiver bound as
/// `this` (spec §4.E "Method calls"). Builtins and arrows pass through
/// unchanged — arrows keep their lexically captured `this`.
pub fn bind_method_receiver(callee: Value, receiver: Value) -> Value {
    match callee {
        Value::Function(f) if !f.is_arrow() => Value::Function(f.bind_receiver(receiver)),
        other => other,
    }
}

pub fn expect_callable(value: &Value) -> RunResult<Callable> {
    match value {
        Value::Function(f) => Ok(Rc::clone(f)),
        other => Err(RunError::runtime(format!("{} is not callable", other.type_name()))),
    }
}

/// `for-of` iteration source (spec §4.E): arrays by index order, strings one
/// code-unit at a time, object values in insertion order, nil is empty.
pub fn iterate_values(value: &Value) -> RunResult<Vec<Value>> {
    match value {
        Value::Array(a) => Ok(a.borrow().clone()),
        Value::Str(s) => Ok(s.chars().map(|c| Value::from(c.to_string())).collect()),
        Value::Object(o) => Ok(o.borrow().values().cloned().collect()),
        Value::Nil => Ok(Vec::new()),
        other => Err(RunError::runtime(format!("{} is not iterable", other.type_name()))),
    }
}

/// `for-in` iteration source (spec §4.E): object/array/string keys, nil is
/// empty.
pub fn iterate_keys(value: &Value) -> RunResult<Vec<Value>> {
    match value {
        Value::Object(o) => Ok(o.borrow().keys().map(|k| Value::from(k.clone())).collect()),
        Value::Array(a) => Ok((0..a.borrow().len()).map(|i| Value::from(i.to_string())).collect()),
        Value::Str(s) => Ok((0..s.chars().count()).map(|i| Value::from(i.to_string())).collect()),
        Value::Nil => Ok(Vec::new()),
        other => Err(RunError::runtime(format!("{} has no keys", other.type_name()))),
    }
}

/// Builds a fresh, empty insertion-ordered object map — the common starting
/// point for `rest`-collection in destructuring (spec §4.E).
pub fn new_object_map() -> IndexMap<String, Value> {
    IndexMap::new()
}
