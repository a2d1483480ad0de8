//! Stack-based virtual machine executing compiled `Chunk`s (spec §4.F).

use crate::bytecode::opcode::Opcode;
use crate::env::Environment;
use crate::exception::RunResult;
use crate::function::BytecodeFunction;
use crate::interpreter::Interpreter;
use crate::ops;
use crate::value::Value;

pub struct VM;

impl VM {
    /// Runs a compiled function body to completion and returns its value.
    /// Argument binding, arity checking, and defaults are the caller's
    /// responsibility (shared with the tree-walker via `Interpreter::call`).
    pub fn run(
        interp: &mut Interpreter,
        func: &BytecodeFunction,
        this_binding: Option<Value>,
        args: Vec<Value>,
    ) -> RunResult<Value> {
        let chunk = &func.chunk;
        let call_env = Environment::child(&func.closure, true);
        if let Some(this) = this_binding {
            call_env.define_const("this", this)?;
        }
        let mut locals = vec![Value::Nil; chunk.locals.len().max(chunk.params.normal.len())];
        for (i, arg) in args.into_iter().enumerate().take(chunk.params.normal.len()) {
            locals[i] = arg;
        }

        let mut stack: Vec<Value> = Vec::new();
        let mut ip = 0usize;
        loop {
            let op = &chunk.code[ip];
            ip += 1;
            match op {
                Opcode::Noop => {}
                Opcode::LoadConst(idx) => stack.push(chunk.constants[*idx as usize].clone()),
                Opcode::LoadSlot(idx) => stack.push(locals[*idx as usize].clone()),
                Opcode::StoreSlot(idx) => {
                    locals[*idx as usize] = stack.last().expect("stack underflow").clone();
                }
                Opcode::LoadName(name) => stack.push(call_env.get(name)?),
                Opcode::StoreName(name) => {
                    call_env.assign(name, stack.last().expect("stack underflow").clone())?;
                }
                Opcode::Pop => {
                    stack.pop();
                }
                Opcode::Dup => {
                    let top = stack.last().expect("stack underflow").clone();
                    stack.push(top);
                }
                Opcode::DupTop2 => {
                    let len = stack.len();
                    let a = stack[len - 2].clone();
                    let b = stack[len - 1].clone();
                    stack.push(a);
                    stack.push(b);
                }
                Opcode::Neg => {
                    let v = stack.pop().expect("stack underflow");
                    let n = v.as_number()?;
                    stack.push(Value::Number(n.neg()));
                }
                Opcode::Not => {
                    let v = stack.pop().expect("stack underflow");
                    stack.push(Value::Bool(!v.truthy()));
                }
                Opcode::Add => {
                    let b = stack.pop().expect("stack underflow");
                    let a = stack.pop().expect("stack underflow");
                    stack.push(a.add(&b)?);
                }
                Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod => {
                    let b = stack.pop().expect("stack underflow");
                    let a = stack.pop().expect("stack underflow");
                    let an = a.as_number()?;
                    let bn = b.as_number()?;
                    let result = match op {
                        Opcode::Sub => an.sub(bn),
                        Opcode::Mul => an.mul(bn),
                        Opcode::Div => an.div(bn)?,
                        Opcode::Mod => an.modulo(bn)?,
                        _ => unreachable!(),
                    };
                    stack.push(Value::Number(result));
                }
                Opcode::Eq => {
                    let b = stack.pop().expect("stack underflow");
                    let a = stack.pop().expect("stack underflow");
                    stack.push(Value::Bool(a.equals(&b)));
                }
                Opcode::Ne => {
                    let b = stack.pop().expect("stack underflow");
                    let a = stack.pop().expect("stack underflow");
                    stack.push(Value::Bool(!a.equals(&b)));
                }
                Opcode::Lt | Opcode::Le | Opcode::Gt | Opcode::Ge => {
                    let b = stack.pop().expect("stack underflow");
                    let a = stack.pop().expect("stack underflow");
                    let ord = a.compare(&b)?;
                    let result = match op {
                        Opcode::Lt => ord.is_lt(),
                        Opcode::Le => ord.is_le(),
                        Opcode::Gt => ord.is_gt(),
                        Opcode::Ge => ord.is_ge(),
                        _ => unreachable!(),
                    };
                    stack.push(Value::Bool(result));
                }
                Opcode::Jump(target) => ip = *target as usize,
                Opcode::JumpIfFalse(target) => {
                    let v = stack.pop().expect("stack underflow");
                    if !v.truthy() {
                        ip = *target as usize;
                    }
                }
                Opcode::JumpIfTruthy(target) => {
                    let v = stack.pop().expect("stack underflow");
                    if v.truthy() {
                        ip = *target as usize;
                    }
                }
                Opcode::JumpIfNotNil(target) => {
                    let v = stack.pop().expect("stack underflow");
                    if !matches!(v, Value::Nil) {
                        ip = *target as usize;
                    }
                }
                Opcode::GetProp(name, optional) => {
                    let base = stack.pop().expect("stack underflow");
                    if *optional && matches!(base, Value::Nil) {
                        stack.push(Value::Nil);
                    } else {
                        stack.push(ops::get_property(&base, name)?);
                    }
                }
                Opcode::SetProp(name) => {
                    let value = stack.pop().expect("stack underflow");
                    let base = stack.pop().expect("stack underflow");
                    ops::set_property(&base, name, value.clone())?;
                    stack.push(value);
                }
                Opcode::GetIndex(optional) => {
                    let index = stack.pop().expect("stack underflow");
                    let base = stack.pop().expect("stack underflow");
                    if *optional && matches!(base, Value::Nil) {
                        stack.push(Value::Nil);
                    } else {
                        stack.push(ops::get_index(&base, &index)?);
                    }
                }
                Opcode::SetIndex => {
                    let value = stack.pop().expect("stack underflow");
                    let index = stack.pop().expect("stack underflow");
                    let base = stack.pop().expect("stack underflow");
                    ops::set_index(&base, &index, value.clone())?;
                    stack.push(value);
                }
                Opcode::Call(argc) => {
                    let argc = *argc as usize;
                    let args = stack.split_off(stack.len() - argc);
                    let callee = stack.pop().expect("stack underflow");
                    let callable = ops::expect_callable(&callee)?;
                    stack.push(interp.call(callable, args, Vec::new())?);
                }
                Opcode::MethodCall(name, argc, optional) => {
                    let argc = *argc as usize;
                    let args = stack.split_off(stack.len() - argc);
                    let receiver = stack.pop().expect("stack underflow");
                    if *optional && matches!(receiver, Value::Nil) {
                        stack.push(Value::Nil);
                        continue;
                    }
                    let method = ops::get_property(&receiver, name)?;
                    let bound = ops::bind_method_receiver(method, receiver);
                    let callable = ops::expect_callable(&bound)?;
                    stack.push(interp.call(callable, args, Vec::new())?);
                }
                Opcode::Return => {
                    return Ok(stack.pop().unwrap_or(Value::Nil));
                }
            }
        }
    }

    /// Attempts to compile a user function's body. Returns `None` (falls
    /// back to the tree-walker) when the body uses any construct outside
    /// the supported subset (spec §4.F).
    pub fn try_compile(
        name: &str,
        params: &crate::ast::Params,
        body: super::compiler::CompileBody<'_>,
        closure: &Environment,
        is_arrow: bool,
    ) -> Option<BytecodeFunction> {
        super::compiler::Compiler::compile_function(name, params, body, closure, is_arrow).ok()
    }
}
