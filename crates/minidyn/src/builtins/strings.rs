//! String built-ins (spec §4.H). Indexing is by Unicode scalar value, not
//! byte offset, matching `ops::get_index`'s treatment of strings.

use super::def;
use crate::env::Environment;
use crate::exception::RunError;
use crate::number::parse_number;
use crate::value::Value;

pub fn register(globals: &Environment) {
    def(globals, "length", 1, Some(1), |_interp, args| {
        Ok(Value::from(args[0].as_str()?.chars().count() as i64))
    });
    def(globals, "upper", 1, Some(1), |_interp, args| Ok(Value::from(args[0].as_str()?.to_uppercase())));
    def(globals, "lower", 1, Some(1), |_interp, args| Ok(Value::from(args[0].as_str()?.to_lowercase())));
    def(globals, "trim", 1, Some(1), |_interp, args| Ok(Value::from(args[0].as_str()?.trim().to_owned())));
    def(globals, "split", 2, Some(2), |_interp, args| {
        let s = args[0].as_str()?;
        let sep = args[1].as_str()?;
        let parts: Vec<Value> = if sep.is_empty() {
            s.chars().map(|c| Value::from(c.to_string())).collect()
        } else {
            s.split(sep).map(|p| Value::from(p.to_owned())).collect()
        };
        Ok(Value::array(parts))
    });
    def(globals, "join", 2, Some(2), |_interp, args| {
        let arr = args[0].as_array()?;
        let sep = args[1].as_str()?;
        let parts: Vec<String> = arr.borrow().iter().map(Value::stringify).collect();
        Ok(Value::from(parts.join(sep)))
    });
    def(globals, "replace", 3, Some(3), |_interp, args| {
        let s = args[0].as_str()?;
        let from = args[1].as_str()?;
        let to = args[2].as_str()?;
        Ok(Value::from(s.replace(from, to)))
    });
    def(globals, "slice", 3, Some(3), |_interp, args| {
        let s = args[0].as_str()?;
        let start = args[1].as_number()?.as_f64() as i64;
        let end = args[2].as_number()?.as_f64() as i64;
        let chars: Vec<char> = s.chars().collect();
        let len = chars.len() as i64;
        let clamp = |i: i64| i.clamp(0, len) as usize;
        let (start, end) = (clamp(if start < 0 { start + len } else { start }), clamp(if end < 0 { end + len } else { end }));
        if start >= end {
            return Ok(Value::from(String::new()));
        }
        Ok(Value::from(chars[start..end].iter().collect::<String>()))
    });
    def(globals, "index_of", 2, Some(2), |_interp, args| {
        let s = args[0].as_str()?;
        let needle = args[1].as_str()?;
        match s.find(needle) {
            Some(byte_idx) => Ok(Value::from(s[..byte_idx].chars().count() as i64)),
            None => Ok(Value::from(-1i64)),
        }
    });
    def(globals, "starts_with", 2, Some(2), |_interp, args| {
        Ok(Value::from(args[0].as_str()?.starts_with(args[1].as_str()?)))
    });
    def(globals, "ends_with", 2, Some(2), |_interp, args| {
        Ok(Value::from(args[0].as_str()?.ends_with(args[1].as_str()?)))
    });
    def(globals, "repeat", 2, Some(2), |_interp, args| {
        let s = args[0].as_str()?;
        let n = args[1].as_number()?.as_f64();
        if n < 0.0 {
            return Err(RunError::runtime("repeat count must be non-negative"));
        }
        Ok(Value::from(s.repeat(n as usize)))
    });
    def(globals, "char_at", 2, Some(2), |_interp, args| {
        let s = args[0].as_str()?;
        let i = args[1].as_number()?.as_f64() as i64;
        let chars: Vec<char> = s.chars().collect();
        let idx = if i < 0 { i + chars.len() as i64 } else { i };
        match usize::try_from(idx).ok().and_then(|idx| chars.get(idx)) {
            Some(c) => Ok(Value::from(c.to_string())),
            None => Err(RunError::runtime("index out of range")),
        }
    });
    def(globals, "to_number", 1, Some(1), |_interp, args| match args[0].as_number() {
        Ok(n) => Ok(Value::Number(n.clone())),
        Err(_) => match parse_number(args[0].as_str()?) {
            Some(n) => Ok(Value::Number(n)),
            None => Err(RunError::runtime(format!("cannot convert '{}' to a number", args[0].stringify()))),
        },
    });
    def(globals, "to_string", 1, Some(1), |_interp, args| Ok(Value::from(args[0].stringify())));
}
