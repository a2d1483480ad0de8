//! The tagged value union (spec §3) and its operations (spec §4.A).

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::exception::{RunError, RunResult};
use crate::function::Callable;
use crate::number::{Number, format_float, parse_number};

pub type ArrayRef = Rc<RefCell<Vec<Value>>>;
pub type ObjectRef = Rc<RefCell<IndexMap<String, Value>>>;

/// A MiniDyn runtime value: one of the seven variants from spec §3.
///
/// Arrays and objects are heap-allocated and mutable through shared
/// `Rc<RefCell<_>>` handles — the idiomatic Rust stand-in for the teacher's
/// arena-and-`HeapId` indirection (`heap.rs`). MiniDyn doesn't need
/// snapshotting or manual refcount auditing, so plain `Rc` clones suffice;
/// identity for equality/cycle-detection purposes is the pointer address.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(Number),
    Str(Rc<str>),
    Array(ArrayRef),
    Object(ObjectRef),
    Function(Callable),
}

impl Value {
    pub fn array(items: Vec<Value>) -> Self {
        Self::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(map: IndexMap<String, Value>) -> Self {
        Self::Object(Rc::new(RefCell::new(map)))
    }

    pub fn empty_object() -> Self {
        Self::object(IndexMap::new())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::Str(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Function(_) => "function",
        }
    }

    /// Truthiness per spec §3: false exactly for nil, false, numeric zero,
    /// empty string.
    pub fn truthy(&self) -> bool {
        match self {
            Self::Nil => false,
            Self::Bool(b) => *b,
            Self::Number(n) => n.truthy(),
            Self::Str(s) => !s.is_empty(),
            Self::Array(_) | Self::Object(_) | Self::Function(_) => true,
        }
    }

    pub fn as_number(&self) -> RunResult<&Number> {
        match self {
            Self::Number(n) => Ok(n),
            other => Err(RunError::runtime(format!("Expected number, got {}", other.type_name()))),
        }
    }

    pub fn as_array(&self) -> RunResult<&ArrayRef> {
        match self {
            Self::Array(a) => Ok(a),
            other => Err(RunError::runtime(format!("Expected array, got {}", other.type_name()))),
        }
    }

    pub fn as_object(&self) -> RunResult<&ObjectRef> {
        match self {
            Self::Object(o) => Ok(o),
            other => Err(RunError::runtime(format!("Expected object, got {}", other.type_name()))),
        }
    }

    pub fn as_str(&self) -> RunResult<&str> {
        match self {
            Self::Str(s) => Ok(s),
            other => Err(RunError::runtime(format!("Expected string, got {}", other.type_name()))),
        }
    }

    /// Identity, used for array/object/function equality and method-binding
    /// stability (spec §3 "Function identity is stable across bind-receiver
    /// operations").
    pub fn identity(&self) -> Option<usize> {
        match self {
            Self::Array(a) => Some(Rc::as_ptr(a) as usize),
            Self::Object(o) => Some(Rc::as_ptr(o) as usize),
            Self::Function(c) => Some(c.id() as usize),
            _ => None,
        }
    }

    /// Canonical stringification (spec §4.A), used for `+` concatenation,
    /// object-key coercion, and `println`. Cycle-safe: repeated arrays/
    /// objects print as `[<cycle>]` / `{<cycle>}`.
    pub fn stringify(&self) -> String {
        let mut out = String::new();
        let mut seen = HashSet::new();
        self.stringify_into(&mut out, &mut seen);
        out
    }

    fn stringify_into(&self, out: &mut String, seen: &mut HashSet<usize>) {
        match self {
            Self::Nil => out.push_str("nil"),
            Self::Bool(true) => out.push_str("true"),
            Self::Bool(false) => out.push_str("false"),
            Self::Number(n) => {
                let _ = write!(out, "{n}");
            }
            Self::Str(s) => out.push_str(s),
            Self::Function(c) => {
                let _ = write!(out, "<function {}>", c.display_name());
            }
            Self::Array(a) => {
                let id = Rc::as_ptr(a) as usize;
                if !seen.insert(id) {
                    out.push_str("[<cycle>]");
                    return;
                }
                out.push('[');
                for (i, item) in a.borrow().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.repr_into(out, seen);
                }
                out.push(']');
                seen.remove(&id);
            }
            Self::Object(o) => {
                let id = Rc::as_ptr(o) as usize;
                if !seen.insert(id) {
                    out.push_str("{<cycle>}");
                    return;
                }
                out.push('{');
                for (i, (k, v)) in o.borrow().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    let _ = write!(out, "{k}: ");
                    v.repr_into(out, seen);
                }
                out.push('}');
                seen.remove(&id);
            }
        }
    }

    /// Like `stringify`, but quotes strings — used for array/object element
    /// display so `println([1, "a"])` reads as `[1, "a"]` rather than `[1, a]`.
    fn repr_into(&self, out: &mut String, seen: &mut HashSet<usize>) {
        if let Self::Str(s) = self {
            out.push('"');
            out.push_str(s);
            out.push('"');
        } else {
            self.stringify_into(out, seen);
        }
    }

    /// `+` per spec §4.A: numeric add, string concat (if either side is a
    /// string), array concat, else error.
    pub fn add(&self, other: &Self) -> RunResult<Self> {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => Ok(Self::Number(a.add(b))),
            (Self::Str(_), _) | (_, Self::Str(_)) => {
                Ok(Self::Str(Rc::from(format!("{}{}", self.stringify(), other.stringify()))))
            }
            (Self::Array(a), Self::Array(b)) => {
                let mut combined = a.borrow().clone();
                combined.extend(b.borrow().iter().cloned());
                Ok(Self::array(combined))
            }
            _ => Err(RunError::runtime(format!(
                "invalid operands for '+': {} and {}",
                self.type_name(),
                other.type_name()
            ))),
        }
    }

    /// Ordered comparison (spec §4.A): numbers and strings only.
    pub fn compare(&self, other: &Self) -> RunResult<Ordering> {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => Ok(a.compare(b)),
            (Self::Str(a), Self::Str(b)) => Ok(a.as_bytes().cmp(b.as_bytes())),
            _ => Err(RunError::runtime(format!(
                "cannot compare {} and {}",
                self.type_name(),
                other.type_name()
            ))),
        }
    }

    /// Equality per spec §3: same-type compares by value/identity;
    /// cross-type number/string attempts numeric parse.
    pub fn equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a.numeric_eq(b),
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => Rc::ptr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => a.id() == b.id(),
            (Self::Number(n), Self::Str(s)) | (Self::Str(s), Self::Number(n)) => {
                parse_number(s).is_some_and(|parsed| parsed.numeric_eq(n))
            }
            _ => false,
        }
    }

    /// Coerces a key for `o[k]` / object-pattern matching: the canonical
    /// stringify of the index value (spec §4.E).
    pub fn as_key(&self) -> String {
        self.stringify()
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Number(Number::Int(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Number(Number::Float(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(Rc::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(Rc::from(v))
    }
}

pub fn format_float_value(v: f64) -> String {
    format_float(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_partition() {
        assert!(!Value::Nil.truthy());
        assert!(!Value::Bool(false).truthy());
        assert!(!Value::from(0i64).truthy());
        assert!(!Value::from(String::new()).truthy());
        assert!(Value::from(true).truthy());
        assert!(Value::array(vec![]).truthy());
        assert!(Value::empty_object().truthy());
    }

    #[test]
    fn array_concat_add() {
        let a = Value::array(vec![Value::from(1i64)]);
        let b = Value::array(vec![Value::from(2i64), Value::from(3i64)]);
        let sum = a.add(&b).unwrap();
        assert_eq!(sum.stringify(), "[1, 2, 3]");
    }

    #[test]
    fn string_concat_uses_canonical_printer() {
        let a = Value::from("x=");
        let b = Value::from(1i64);
        assert_eq!(a.add(&b).unwrap().stringify(), "x=1");
    }

    #[test]
    fn cross_type_numeric_equality() {
        assert!(Value::from(5i64).equals(&Value::from("5")));
        assert!(!Value::from(5i64).equals(&Value::from("5x")));
    }

    #[test]
    fn cycle_safe_stringify() {
        let arr = Value::array(vec![Value::Nil]);
        if let Value::Array(a) = &arr {
            a.borrow_mut()[0] = arr.clone();
        }
        assert_eq!(arr.stringify(), "[[<cycle>]]");
    }
}
