//! Array built-ins (spec §4.H). `map`/`filter`/`reduce` dispatch back into
//! [`Interpreter::call`], so user functions, arrows, and other builtins are
//! all valid callback arguments.

use std::cmp::Ordering;

use super::def;
use crate::env::Environment;
use crate::ops::expect_callable;
use crate::value::Value;

pub fn register(globals: &Environment) {
    def(globals, "length", 1, Some(1), |_interp, args| {
        Ok(Value::from(args[0].as_array()?.borrow().len() as i64))
    });
    def(globals, "push", 2, Some(2), |_interp, args| {
        args[0].as_array()?.borrow_mut().push(args[1].clone());
        Ok(args[0].clone())
    });
    def(globals, "pop", 1, Some(1), |_interp, args| {
        Ok(args[0].as_array()?.borrow_mut().pop().unwrap_or(Value::Nil))
    });
    def(globals, "slice", 3, Some(3), |_interp, args| {
        let arr = args[0].as_array()?.borrow();
        let len = arr.len() as i64;
        let start = args[1].as_number()?.as_f64() as i64;
        let end = args[2].as_number()?.as_f64() as i64;
        let clamp = |i: i64| i.clamp(0, len) as usize;
        let (start, end) = (clamp(if start < 0 { start + len } else { start }), clamp(if end < 0 { end + len } else { end }));
        if start >= end {
            return Ok(Value::array(Vec::new()));
        }
        Ok(Value::array(arr[start..end].to_vec()))
    });
    def(globals, "map", 2, Some(2), |interp, args| {
        let callable = expect_callable(&args[1])?;
        let items = args[0].as_array()?.borrow().clone();
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            out.push(interp.call(callable.clone(), vec![item], Vec::new())?);
        }
        Ok(Value::array(out))
    });
    def(globals, "filter", 2, Some(2), |interp, args| {
        let callable = expect_callable(&args[1])?;
        let items = args[0].as_array()?.borrow().clone();
        let mut out = Vec::new();
        for item in items {
            if interp.call(callable.clone(), vec![item.clone()], Vec::new())?.truthy() {
                out.push(item);
            }
        }
        Ok(Value::array(out))
    });
    def(globals, "reduce", 3, Some(3), |interp, args| {
        let callable = expect_callable(&args[1])?;
        let items = args[0].as_array()?.borrow().clone();
        let mut acc = args[2].clone();
        for item in items {
            acc = interp.call(callable.clone(), vec![acc, item], Vec::new())?;
        }
        Ok(acc)
    });
    // No comparator-function variant: a `Vec::sort_by` closure must return a
    // plain `Ordering`, which can't propagate a callback's `RunResult`.
    def(globals, "sort", 1, Some(1), |_interp, args| {
        let arr = args[0].as_array()?;
        let mut items = arr.borrow().clone();
        let mut sort_err = None;
        items.sort_by(|a, b| match a.compare(b) {
            Ok(ord) => ord,
            Err(e) => {
                sort_err.get_or_insert(e);
                Ordering::Equal
            }
        });
        if let Some(e) = sort_err {
            return Err(e);
        }
        Ok(Value::array(items))
    });
    def(globals, "reverse", 1, Some(1), |_interp, args| {
        let mut items = args[0].as_array()?.borrow().clone();
        items.reverse();
        Ok(Value::array(items))
    });
    def(globals, "join", 2, Some(2), |_interp, args| {
        let arr = args[0].as_array()?;
        let sep = args[1].as_str()?;
        let parts: Vec<String> = arr.borrow().iter().map(Value::stringify).collect();
        Ok(Value::from(parts.join(sep)))
    });
    def(globals, "index_of", 2, Some(2), |_interp, args| {
        let arr = args[0].as_array()?.borrow();
        match arr.iter().position(|v| v.equals(&args[1])) {
            Some(idx) => Ok(Value::from(idx as i64)),
            None => Ok(Value::from(-1i64)),
        }
    });
    def(globals, "includes", 2, Some(2), |_interp, args| {
        let arr = args[0].as_array()?.borrow();
        Ok(Value::from(arr.iter().any(|v| v.equals(&args[1]))))
    });
}
