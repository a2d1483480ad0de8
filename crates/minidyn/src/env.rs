//! Lexical environments with three binding disciplines (spec §3, §4.B).

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::exception::{RunError, RunResult};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Var,
    Let,
    Const,
}

#[derive(Debug, Clone)]
struct Binding {
    kind: BindingKind,
    value: Value,
    /// TDZ flag: true between `let`/`const` declaration and first assignment.
    uninitialized: bool,
}

#[derive(Debug)]
struct Frame {
    bindings: HashMap<String, Binding>,
    parent: Option<Environment>,
    /// Marks this frame as the target for `var` declarations (function body
    /// or module top-level), per spec §3.
    function_root: bool,
}

/// A shared, mutable environment frame. Cloning an `Environment` shares the
/// same frame (cheap `Rc` clone) — this is how closures capture their
/// defining scope, mirroring the teacher's shared-namespace closures.
#[derive(Debug, Clone)]
pub struct Environment(Rc<RefCell<Frame>>);

impl Environment {
    pub fn new_global() -> Self {
        Self(Rc::new(RefCell::new(Frame {
            bindings: HashMap::new(),
            parent: None,
            function_root: true,
        })))
    }

    pub fn child(parent: &Self, function_root: bool) -> Self {
        Self(Rc::new(RefCell::new(Frame {
            bindings: HashMap::new(),
            parent: Some(parent.clone()),
            function_root,
        })))
    }

    pub fn has_locally(&self, name: &str) -> bool {
        self.0.borrow().bindings.contains_key(name)
    }

    fn local_kind(&self, name: &str) -> Option<BindingKind> {
        self.0.borrow().bindings.get(name).map(|b| b.kind)
    }

    /// `var` declarations target the nearest function-root ancestor (spec
    /// §3/§4.B), and may be redeclared.
    pub fn define_var(&self, name: &str, value: Value) -> RunResult<()> {
        let root = self.function_root_frame();
        if matches!(root.local_kind(name), Some(BindingKind::Let | BindingKind::Const)) {
            return Err(RunError::runtime(format!(
                "cannot declare 'var {name}': already declared as let/const in this scope"
            )));
        }
        root.0.borrow_mut().bindings.insert(
            name.to_owned(),
            Binding {
                kind: BindingKind::Var,
                value,
                uninitialized: false,
            },
        );
        Ok(())
    }

    fn function_root_frame(&self) -> Self {
        let mut current = self.clone();
        loop {
            let is_root = current.0.borrow().function_root;
            if is_root {
                return current;
            }
            let parent = current.0.borrow().parent.clone();
            match parent {
                Some(p) => current = p,
                None => return current,
            }
        }
    }

    /// `let`/`const` live in the declaring frame; each name must be unique
    /// per frame (spec §3 invariant).
    pub fn define_let(&self, name: &str, value: Option<Value>, constant: bool) -> RunResult<()> {
        if self.has_locally(name) {
            return Err(RunError::runtime(format!("'{name}' is already declared in this scope")));
        }
        let (value, uninitialized) = match value {
            Some(v) => (v, false),
            None => (Value::Nil, true),
        };
        self.0.borrow_mut().bindings.insert(
            name.to_owned(),
            Binding {
                kind: if constant { BindingKind::Const } else { BindingKind::Let },
                value,
                uninitialized,
            },
        );
        Ok(())
    }

    pub fn define_const(&self, name: &str, value: Value) -> RunResult<()> {
        self.define_let(name, Some(value), true)
    }

    /// Reads a binding, walking the parent chain. TDZ reads raise
    /// "cannot access before initialization" regardless of an outer binding
    /// of the same name — the inner (TDZ) binding shadows (spec §4.B).
    pub fn get(&self, name: &str) -> RunResult<Value> {
        let frame = self.0.borrow();
        if let Some(binding) = frame.bindings.get(name) {
            if binding.uninitialized {
                return Err(RunError::runtime(format!(
                    "cannot access '{name}' before initialization"
                )));
            }
            return Ok(binding.value.clone());
        }
        match &frame.parent {
            Some(parent) => {
                let parent = parent.clone();
                drop(frame);
                parent.get(name)
            }
            None => Err(RunError::runtime(format!("undefined name '{name}'"))),
        }
    }

    /// Assigns to an existing binding, walking the chain until found.
    /// Fails on `const` reassignment or an undefined name.
    pub fn assign(&self, name: &str, value: Value) -> RunResult<()> {
        let has_local = {
            let frame = self.0.borrow();
            frame.bindings.contains_key(name)
        };
        if has_local {
            let mut frame = self.0.borrow_mut();
            let binding = frame.bindings.get_mut(name).expect("checked above");
            if binding.kind == BindingKind::Const && !binding.uninitialized {
                return Err(RunError::runtime(format!("cannot assign to const '{name}'")));
            }
            binding.value = value;
            binding.uninitialized = false;
            return Ok(());
        }
        let parent = self.0.borrow().parent.clone();
        match parent {
            Some(parent) => parent.assign(name, value),
            None => Err(RunError::runtime(format!("undefined name '{name}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tdz_blocks_read_before_init() {
        let env = Environment::new_global();
        env.define_let("x", None, false).unwrap();
        assert!(env.get("x").is_err());
        env.assign("x", Value::from(1i64)).unwrap();
        assert_eq!(env.get("x").unwrap().stringify(), "1");
    }

    #[test]
    fn const_rejects_reassignment() {
        let env = Environment::new_global();
        env.define_const("x", Value::from(1i64)).unwrap();
        assert!(env.assign("x", Value::from(2i64)).is_err());
    }

    #[test]
    fn var_targets_function_root() {
        let root = Environment::new_global();
        let block = Environment::child(&root, false);
        block.define_var("x", Value::from(1i64)).unwrap();
        assert!(!block.has_locally("x"));
        assert!(root.has_locally("x"));
    }

    #[test]
    fn duplicate_let_in_same_frame_errors() {
        let env = Environment::new_global();
        env.define_let("x", Some(Value::from(1i64)), false).unwrap();
        assert!(env.define_let("x", Some(Value::from(2i64)), false).is_err());
    }
}
