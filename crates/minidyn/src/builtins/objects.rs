//! Object built-ins (spec §4.H). Insertion order is preserved throughout,
//! matching the `IndexMap` backing [`crate::value::ObjectRef`].

use super::def;
use crate::env::Environment;
use crate::value::Value;

pub fn register(globals: &Environment) {
    def(globals, "keys", 1, Some(1), |_interp, args| {
        let obj = args[0].as_object()?;
        Ok(Value::array(obj.borrow().keys().map(|k| Value::from(k.clone())).collect()))
    });
    def(globals, "values", 1, Some(1), |_interp, args| {
        let obj = args[0].as_object()?;
        Ok(Value::array(obj.borrow().values().cloned().collect()))
    });
    def(globals, "entries", 1, Some(1), |_interp, args| {
        let obj = args[0].as_object()?;
        let entries = obj
            .borrow()
            .iter()
            .map(|(k, v)| Value::array(vec![Value::from(k.clone()), v.clone()]))
            .collect();
        Ok(Value::array(entries))
    });
    def(globals, "has_key", 2, Some(2), |_interp, args| {
        let obj = args[0].as_object()?;
        Ok(Value::from(obj.borrow().contains_key(args[1].as_str()?)))
    });
    def(globals, "delete", 2, Some(2), |_interp, args| {
        let obj = args[0].as_object()?;
        let removed = obj.borrow_mut().shift_remove(args[1].as_str()?);
        Ok(Value::from(removed.is_some()))
    });
    def(globals, "merge", 2, Some(2), |_interp, args| {
        let base = args[0].as_object()?.borrow().clone();
        let extra = args[1].as_object()?.borrow();
        let mut merged = base;
        for (k, v) in extra.iter() {
            merged.insert(k.clone(), v.clone());
        }
        Ok(Value::object(merged))
    });
    def(globals, "clone_deep", 1, Some(1), |_interp, args| Ok(deep_clone(&args[0])));
    def(globals, "deep_equal", 2, Some(2), |_interp, args| Ok(Value::from(deep_equal(&args[0], &args[1]))));
}

fn deep_clone(value: &Value) -> Value {
    match value {
        Value::Array(a) => Value::array(a.borrow().iter().map(deep_clone).collect()),
        Value::Object(o) => Value::object(o.borrow().iter().map(|(k, v)| (k.clone(), deep_clone(v))).collect()),
        other => other.clone(),
    }
}

fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(x), Value::Array(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| deep_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len() && x.iter().all(|(k, v)| y.get(k).is_some_and(|ov| deep_equal(v, ov)))
        }
        _ => a.equals(b),
    }
}
