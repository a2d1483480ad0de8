//! Built-in function registry (spec §4.H): the standard library bolted onto
//! a fresh global [`Environment`], grouped one file per category the way
//! the teacher's `builtins/` directory groups one file per host function.
//! None of these ever receive named arguments — [`crate::function::CallableData::accepts_named_args`]
//! is `false` for every `Builtin` kind, matching spec §3.

mod arrays;
mod crypto;
mod datetime;
mod env_vars;
mod fs;
mod http;
mod io;
mod json;
mod math;
mod objects;
mod path;
mod regex_mod;
mod strings;
mod uuid_mod;

use crate::env::Environment;
use crate::exception::RunResult;
use crate::function::{BuiltinFn, CallableData};
use crate::interpreter::Interpreter;
use crate::value::Value;

pub fn register(globals: &Environment) {
    io::register(globals);
    math::register(globals);
    strings::register(globals);
    arrays::register(globals);
    objects::register(globals);
    json::register(globals);
    regex_mod::register(globals);
    datetime::register(globals);
    crypto::register(globals);
    uuid_mod::register(globals);
    fs::register(globals);
    path::register(globals);
    env_vars::register(globals);
    http::register(globals);
}

/// Installs one built-in into the global scope. A name collision is a
/// registration-time bug, never something a script can trigger.
pub(crate) fn def(
    globals: &Environment,
    name: &str,
    arity_min: usize,
    arity_max: Option<usize>,
    func: impl Fn(&mut Interpreter, Vec<Value>) -> RunResult<Value> + 'static,
) {
    let callable = CallableData::new_builtin(name, arity_min, arity_max, Box::new(func) as Box<BuiltinFn>);
    globals
        .define_let(name, Some(Value::Function(callable)), false)
        .unwrap_or_else(|e| panic!("duplicate builtin '{name}': {e}"));
}
