//! Callables: user (AST-backed), bytecode (VM-backed), and built-in
//! (host-backed) functions, unified behind a single invocation entry point
//! (spec §3 "Callable").

use std::cell::Cell;
use std::rc::Rc;

use crate::ast::{Block, Params};
use crate::bytecode::Chunk;
use crate::env::Environment;
use crate::exception::RunResult;
use crate::interpreter::Interpreter;
use crate::value::Value;

thread_local! {
    static NEXT_ID: Cell<u64> = const { Cell::new(1) };
}

fn next_id() -> u64 {
    NEXT_ID.with(|cell| {
        let id = cell.get();
        cell.set(id + 1);
        id
    })
}

#[derive(Debug)]
pub struct UserFunction {
    pub name: String,
    pub params: Params,
    pub body: Block,
    pub closure: Environment,
    /// Arrow functions ignore method-call receiver binding and instead
    /// resolve `this` lexically through `closure` (spec §4.E).
    pub is_arrow: bool,
}

#[derive(Debug)]
pub struct BytecodeFunction {
    pub name: String,
    pub chunk: Chunk,
    pub closure: Environment,
    pub is_arrow: bool,
}

pub type BuiltinFn = dyn Fn(&mut Interpreter, Vec<Value>) -> RunResult<Value>;

pub struct BuiltinFunction {
    pub name: String,
    pub arity_min: usize,
    pub arity_max: Option<usize>,
    pub func: Box<BuiltinFn>,
}

impl std::fmt::Debug for BuiltinFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinFunction").field("name", &self.name).finish()
    }
}

#[derive(Debug, Clone)]
pub enum CallableKind {
    User(Rc<UserFunction>),
    Bytecode(Rc<BytecodeFunction>),
    Builtin(Rc<BuiltinFunction>),
}

/// Per spec §3: "Callable: any of: user function, bytecode function,
/// built-in. All expose a min/max arity and a single invocation entry."
/// `this_binding` implements method-receiver binding (§4.E): calling
/// `recv.m(...)` produces a clone carrying `this_binding = Some(recv)` while
/// `id` — not the `Rc` address — remains the function's stable identity, so
/// self-tail-call detection still matches the bound clone against the
/// original (spec §3 "Function identity is stable across bind-receiver
/// operations").
#[derive(Debug, Clone)]
pub struct CallableData {
    id: u64,
    pub kind: CallableKind,
    pub this_binding: Option<Value>,
}

pub type Callable = Rc<CallableData>;

impl CallableData {
    pub fn new_user(user: UserFunction) -> Callable {
        Rc::new(Self {
            id: next_id(),
            kind: CallableKind::User(Rc::new(user)),
            this_binding: None,
        })
    }

    pub fn new_bytecode(bc: BytecodeFunction) -> Callable {
        Rc::new(Self {
            id: next_id(),
            kind: CallableKind::Bytecode(Rc::new(bc)),
            this_binding: None,
        })
    }

    pub fn new_builtin(name: impl Into<String>, arity_min: usize, arity_max: Option<usize>, func: Box<BuiltinFn>) -> Callable {
        Rc::new(Self {
            id: next_id(),
            kind: CallableKind::Builtin(Rc::new(BuiltinFunction {
                name: name.into(),
                arity_min,
                arity_max,
                func,
            })),
            this_binding: None,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn display_name(&self) -> &str {
        match &self.kind {
            CallableKind::User(u) => &u.name,
            CallableKind::Bytecode(b) => &b.name,
            CallableKind::Builtin(b) => &b.name,
        }
    }

    pub fn arity_min(&self) -> usize {
        match &self.kind {
            CallableKind::User(u) => u.params.arity_min(),
            CallableKind::Bytecode(b) => b.chunk.params.arity_min(),
            CallableKind::Builtin(b) => b.arity_min,
        }
    }

    pub fn arity_max(&self) -> Option<usize> {
        match &self.kind {
            CallableKind::User(u) => u.params.arity_max(),
            CallableKind::Bytecode(b) => b.chunk.params.arity_max(),
            CallableKind::Builtin(b) => b.arity_max,
        }
    }

    pub fn accepts_named_args(&self) -> bool {
        matches!(self.kind, CallableKind::User(_))
    }

    /// Arrow functions never receive a bound `this` — they close over the
    /// lexical `this` in scope at the point they were constructed.
    pub fn is_arrow(&self) -> bool {
        match &self.kind {
            CallableKind::User(u) => u.is_arrow,
            CallableKind::Bytecode(b) => b.is_arrow,
            CallableKind::Builtin(_) => false,
        }
    }

    /// Produces a receiver-bound clone sharing this function's identity
    /// (spec §4.E "Method calls"). Arrow functions never go through this —
    /// they ignore the receiver and keep their lexically captured `this`.
    pub fn bind_receiver(self: &Callable, receiver: Value) -> Callable {
        Rc::new(CallableData {
            id: self.id,
            kind: self.kind.clone(),
            this_binding: Some(receiver),
        })
    }
}
