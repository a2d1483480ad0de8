//! Tree-walking evaluator (spec §4.E): the reference execution engine for
//! every construct in the language. Functions are offered to the bytecode
//! compiler first (§4.F); anything outside its supported subset runs here
//! instead, and the two engines share environments, values, and the
//! indexing/property helpers in [`crate::ops`] so they can't disagree.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::ast::{
    Arg, ArrowBody, AssignOp, BinOp, Block, DeclKind, Expr, ForEachKind, LogicalOp, ObjectKey,
    Params, Pattern, Program, Stmt,
};
use crate::bytecode::vm::VM;
use crate::bytecode::CompileBody;
use crate::env::Environment;
use crate::exception::{RunError, RunResult, StackFrame};
use crate::function::{Callable, CallableData, CallableKind, UserFunction};
use crate::module::{ModuleEntry, ModuleLoader};
use crate::ops;
use crate::token::CodeLoc;
use crate::value::Value;

const MAX_CALL_DEPTH: usize = 8_000;

/// Non-local control flow (§4.E "Control flow signals"), kept distinct from
/// `RunError` so `break`/`continue`/`return` never look like failures.
enum Signal {
    Normal(Value),
    Break,
    Continue,
    Return(ReturnValue),
}

enum ReturnValue {
    Value(Value),
    /// A `return <call>` whose callee is the currently-executing function
    /// (§4.E "Tail-call optimization"); `call_user`'s loop reuses the
    /// activation instead of recursing.
    TailCall(Vec<Value>),
}

enum CalleeResolution {
    Nil,
    Callable(Callable, String),
}

pub struct Interpreter {
    pub globals: Environment,
    pub(crate) current_file: String,
    self_stack: Vec<u64>,
    call_depth: usize,
    pub(crate) modules: RefCell<HashMap<String, ModuleEntry>>,
    pub(crate) loader: Box<dyn ModuleLoader>,
}

impl Interpreter {
    pub fn new(loader: Box<dyn ModuleLoader>) -> Self {
        let globals = Environment::new_global();
        crate::builtins::register(&globals);
        Self {
            globals,
            current_file: String::new(),
            self_stack: Vec::new(),
            call_depth: 0,
            modules: RefCell::new(HashMap::new()),
            loader,
        }
    }

    /// Runs a top-level program (script or REPL chunk). Returns the value of
    /// a trailing bare-expression statement so the CLI's REPL can echo it.
    pub fn run_program(&mut self, program: &Program, file: &str) -> RunResult<Value> {
        self.current_file = file.to_owned();
        let env = self.globals.clone();
        self.run_in_env(program, &env)
    }

    /// Runs a statement sequence in a caller-supplied environment — used for
    /// top-level scripts (function-root = globals) and for module bodies,
    /// which get their own fresh function-root frame (spec §4.G).
    pub(crate) fn run_in_env(&mut self, program: &Program, env: &Environment) -> RunResult<Value> {
        let mut last = Value::Nil;
        for stmt in program {
            match stmt {
                Stmt::Expr(expr) => last = self.eval_expr(expr, env)?,
                other => match self.exec_stmt(other, env)? {
                    Signal::Return(ReturnValue::Value(v)) => return Ok(v),
                    Signal::Return(ReturnValue::TailCall(args)) => {
                        let id = self.self_stack.last().copied();
                        return Err(RunError::runtime(format!(
                            "tail-call signal escaped to top level (self id {id:?}, {} args)",
                            args.len()
                        )));
                    }
                    _ => last = Value::Nil,
                },
            }
        }
        Ok(last)
    }

    /// Invokes any callable with already-evaluated arguments. Used by
    /// built-ins (e.g. `map`/`filter`), the bytecode VM, and module bodies.
    pub fn call(&mut self, callable: Callable, positional: Vec<Value>, named: Vec<(String, Value)>) -> RunResult<Value> {
        let argc = positional.len() + named.len();
        if argc < callable.arity_min() || callable.arity_max().is_some_and(|max| argc > max) {
            return Err(RunError::runtime(format!(
                "'{}' expects {} argument(s), got {argc}",
                callable.display_name(),
                arity_description(callable.arity_min(), callable.arity_max())
            )));
        }
        if !named.is_empty() && !callable.accepts_named_args() {
            return Err(RunError::runtime(format!(
                "'{}' does not accept named arguments",
                callable.display_name()
            )));
        }
        match &callable.kind {
            CallableKind::Builtin(b) => (b.func)(self, positional),
            CallableKind::Bytecode(bc) => {
                self.enter_call()?;
                let bc = Rc::clone(bc);
                let result = VM::run(self, &bc, callable.this_binding.clone(), positional);
                self.call_depth -= 1;
                result
            }
            CallableKind::User(user) => {
                self.enter_call()?;
                let user = Rc::clone(user);
                let result = self.call_user(&callable, &user, positional, named);
                self.call_depth -= 1;
                result
            }
        }
    }

    fn enter_call(&mut self) -> RunResult<()> {
        self.call_depth += 1;
        if self.call_depth > MAX_CALL_DEPTH {
            self.call_depth -= 1;
            return Err(RunError::runtime("maximum call depth exceeded"));
        }
        Ok(())
    }

    fn call_user(
        &mut self,
        callable: &Callable,
        user: &Rc<UserFunction>,
        positional: Vec<Value>,
        named: Vec<(String, Value)>,
    ) -> RunResult<Value> {
        self.self_stack.push(callable.id());
        let mut positional = positional;
        let mut named = named;
        let outcome = loop {
            let call_env = Environment::child(&user.closure, true);
            if !user.is_arrow {
                if let Some(this) = &callable.this_binding {
                    if let Err(e) = call_env.define_const("this", this.clone()) {
                        break Err(e);
                    }
                }
            }
            if let Err(e) = self.bind_params(&user.params, positional, named, &call_env) {
                break Err(e);
            }
            match self.exec_block(&user.body, &call_env) {
                Ok(Signal::Return(ReturnValue::Value(v))) => break Ok(v),
                Ok(Signal::Return(ReturnValue::TailCall(args))) => {
                    positional = args;
                    named = Vec::new();
                    continue;
                }
                Ok(_) => break Ok(Value::Nil),
                Err(e) => break Err(e),
            }
        };
        self.self_stack.pop();
        outcome
    }

    fn bind_params(
        &mut self,
        params: &Params,
        positional: Vec<Value>,
        named: Vec<(String, Value)>,
        env: &Environment,
    ) -> RunResult<()> {
        let mut slots: Vec<Option<Value>> = vec![None; params.normal.len()];
        let mut seen_names = HashSet::new();
        for (name, value) in named {
            if !seen_names.insert(name.clone()) {
                return Err(RunError::runtime(format!("duplicate named argument '{name}'")));
            }
            let idx = params
                .normal
                .iter()
                .position(|p| p.name == name)
                .ok_or_else(|| RunError::runtime(format!("unknown named argument '{name}'")))?;
            slots[idx] = Some(value);
        }
        let mut pos_iter = positional.into_iter();
        for slot in &mut slots {
            if slot.is_none() {
                *slot = pos_iter.next();
            }
        }
        let leftover: Vec<Value> = pos_iter.collect();
        if !leftover.is_empty() && params.rest.is_none() {
            return Err(RunError::runtime("too many positional arguments"));
        }
        for (i, param) in params.normal.iter().enumerate() {
            let value = match slots[i].take() {
                Some(v) => v,
                None => match &param.default {
                    Some(expr) => self.eval_expr(expr, env)?,
                    None => return Err(RunError::runtime(format!("missing required argument '{}'", param.name))),
                },
            };
            env.define_let(&param.name, Some(value), false)?;
        }
        if let Some(rest_name) = &params.rest {
            env.define_let(rest_name, Some(Value::array(leftover)), false)?;
        }
        Ok(())
    }

    fn make_function(&self, name: String, params: Params, body: &Block, closure: &Environment, is_arrow: bool) -> Callable {
        match VM::try_compile(&name, &params, CompileBody::Block(body), closure, is_arrow) {
            Some(bc) => CallableData::new_bytecode(bc),
            None => CallableData::new_user(UserFunction {
                name,
                params,
                body: body.clone(),
                closure: closure.clone(),
                is_arrow,
            }),
        }
    }

    /// Arrow expression bodies are wrapped as a single `return <expr>`
    /// statement when the tree-walker takes over, so the same TCO-capable
    /// evaluator handles both block- and expression-bodied arrows.
    fn make_arrow(&self, params: Params, body: &ArrowBody, closure: &Environment) -> Callable {
        match body {
            ArrowBody::Expr(expr) => {
                match VM::try_compile("<arrow>", &params, CompileBody::Expr(expr), closure, true) {
                    Some(bc) => CallableData::new_bytecode(bc),
                    None => {
                        let wrapped = vec![Stmt::Return {
                            value: Some((**expr).clone()),
                            loc: CodeLoc::default(),
                        }];
                        CallableData::new_user(UserFunction {
                            name: "<arrow>".to_owned(),
                            params,
                            body: wrapped,
                            closure: closure.clone(),
                            is_arrow: true,
                        })
                    }
                }
            }
            ArrowBody::Block(block) => self.make_function("<arrow>".to_owned(), params, block, closure, true),
        }
    }

    fn exec_block(&mut self, stmts: &[Stmt], env: &Environment) -> RunResult<Signal> {
        for stmt in stmts {
            match self.exec_stmt(stmt, env)? {
                Signal::Normal(_) => {}
                other => return Ok(other),
            }
        }
        Ok(Signal::Normal(Value::Nil))
    }

    fn exec_stmt(&mut self, stmt: &Stmt, env: &Environment) -> RunResult<Signal> {
        match stmt {
            Stmt::FnDecl { name, params, body } => {
                let callable = self.make_function(name.clone(), params.clone(), body, env, false);
                env.define_var(name, Value::Function(callable))?;
                Ok(Signal::Normal(Value::Nil))
            }
            Stmt::VarDecl { kind, declarators, .. } => {
                for decl in declarators {
                    match &decl.pattern {
                        Pattern::Ident(name) => match kind {
                            DeclKind::Var => {
                                let v = match &decl.init {
                                    Some(e) => self.eval_expr(e, env)?,
                                    None => Value::Nil,
                                };
                                env.define_var(name, v)?;
                            }
                            DeclKind::Let => {
                                let v = match &decl.init {
                                    Some(e) => Some(self.eval_expr(e, env)?),
                                    None => None,
                                };
                                env.define_let(name, v, false)?;
                            }
                            DeclKind::Const => {
                                let e = decl
                                    .init
                                    .as_ref()
                                    .ok_or_else(|| RunError::runtime("const declaration requires an initializer"))?;
                                let v = self.eval_expr(e, env)?;
                                env.define_const(name, v)?;
                            }
                        },
                        pattern => {
                            let e = decl
                                .init
                                .as_ref()
                                .ok_or_else(|| RunError::runtime("destructuring declaration requires an initializer"))?;
                            let v = self.eval_expr(e, env)?;
                            self.bind_pattern(pattern, v, env, Some(*kind))?;
                        }
                    }
                }
                Ok(Signal::Normal(Value::Nil))
            }
            Stmt::Block(body) => {
                let block_env = Environment::child(env, false);
                self.exec_block(body, &block_env)
            }
            Stmt::If { cond, then_branch, else_branch } => {
                if self.eval_expr(cond, env)?.truthy() {
                    self.exec_stmt(then_branch, env)
                } else if let Some(else_branch) = else_branch {
                    self.exec_stmt(else_branch, env)
                } else {
                    Ok(Signal::Normal(Value::Nil))
                }
            }
            Stmt::While { cond, body } => {
                while self.eval_expr(cond, env)?.truthy() {
                    match self.exec_stmt(body, env)? {
                        Signal::Break => break,
                        Signal::Continue | Signal::Normal(_) => {}
                        ret @ Signal::Return(_) => return Ok(ret),
                    }
                }
                Ok(Signal::Normal(Value::Nil))
            }
            Stmt::ForClassic { init, cond, update, body } => {
                let loop_env = Environment::child(env, false);
                if let Some(init) = init {
                    self.exec_stmt(init, &loop_env)?;
                }
                loop {
                    if let Some(cond) = cond {
                        if !self.eval_expr(cond, &loop_env)?.truthy() {
                            break;
                        }
                    }
                    match self.exec_stmt(body, &loop_env)? {
                        Signal::Break => break,
                        Signal::Continue | Signal::Normal(_) => {}
                        ret @ Signal::Return(_) => return Ok(ret),
                    }
                    if let Some(update) = update {
                        self.eval_expr(update, &loop_env)?;
                    }
                }
                Ok(Signal::Normal(Value::Nil))
            }
            Stmt::ForEach { decl_kind, pattern, kind, iterable, body } => {
                let iterable_val = self.eval_expr(iterable, env)?;
                let items = match kind {
                    ForEachKind::Of => ops::iterate_values(&iterable_val)?,
                    ForEachKind::In => ops::iterate_keys(&iterable_val)?,
                };
                for item in items {
                    let (iter_env, bind_kind) = match decl_kind {
                        Some(DeclKind::Var) => (env.clone(), Some(DeclKind::Var)),
                        Some(other) => (Environment::child(env, false), Some(*other)),
                        None => (env.clone(), None),
                    };
                    self.bind_pattern(pattern, item, &iter_env, bind_kind)?;
                    match self.exec_stmt(body, &iter_env)? {
                        Signal::Break => break,
                        Signal::Continue | Signal::Normal(_) => {}
                        ret @ Signal::Return(_) => return Ok(ret),
                    }
                }
                Ok(Signal::Normal(Value::Nil))
            }
            Stmt::Break => Ok(Signal::Break),
            Stmt::Continue => Ok(Signal::Continue),
            Stmt::Return { value, loc } => match value {
                None => Ok(Signal::Return(ReturnValue::Value(Value::Nil))),
                Some(Expr::Call { callee, args, optional, loc: call_loc }) => {
                    match self.resolve_callee(callee, *optional, env, *call_loc)? {
                        CalleeResolution::Nil => Ok(Signal::Return(ReturnValue::Value(Value::Nil))),
                        CalleeResolution::Callable(callable, name) => {
                            let (positional, named) = self.eval_args(args, env)?;
                            let is_self_tail =
                                named.is_empty() && matches!(self.self_stack.last(), Some(&id) if id == callable.id());
                            if is_self_tail {
                                Ok(Signal::Return(ReturnValue::TailCall(positional)))
                            } else {
                                let v = self.invoke_callable(callable, positional, named, &name, *call_loc)?;
                                Ok(Signal::Return(ReturnValue::Value(v)))
                            }
                        }
                    }
                }
                Some(expr) => {
                    let v = self.eval_expr(expr, env)?;
                    let _ = loc;
                    Ok(Signal::Return(ReturnValue::Value(v)))
                }
            },
            Stmt::Throw { value, loc } => {
                let v = self.eval_expr(value, env)?;
                Err(RunError::user_throw(v).with_loc(*loc, &self.current_file))
            }
            Stmt::Try { block, catch, finally } => self.exec_try(block, catch, finally, env),
            Stmt::DestructuringAssignStmt { pattern, value } => {
                let v = self.eval_expr(value, env)?;
                self.bind_pattern(pattern, v, env, None)?;
                Ok(Signal::Normal(Value::Nil))
            }
            Stmt::Expr(expr) => Ok(Signal::Normal(self.eval_expr(expr, env)?)),
        }
    }

    fn exec_try(
        &mut self,
        block: &Block,
        catch: &Option<(Option<String>, Block)>,
        finally: &Option<Block>,
        env: &Environment,
    ) -> RunResult<Signal> {
        let try_env = Environment::child(env, false);
        let outcome = self.exec_block(block, &try_env);
        let outcome = match (outcome, catch) {
            (Err(e), Some((catch_name, catch_body))) => {
                let catch_env = Environment::child(env, false);
                let bound = match catch_name {
                    Some(name) => {
                        let value = e.thrown.clone().unwrap_or_else(|| e.to_error_object());
                        catch_env.define_let(name, Some(value), false)
                    }
                    None => Ok(()),
                };
                match bound {
                    Ok(()) => self.exec_block(catch_body, &catch_env),
                    Err(bind_err) => Err(bind_err),
                }
            }
            (other, _) => other,
        };
        if let Some(finally_body) = finally {
            let finally_env = Environment::child(env, false);
            match self.exec_block(finally_body, &finally_env)? {
                Signal::Normal(_) => outcome,
                other => Ok(other),
            }
        } else {
            outcome
        }
    }

    fn eval_args(&mut self, args: &[Arg], env: &Environment) -> RunResult<(Vec<Value>, Vec<(String, Value)>)> {
        let mut positional = Vec::new();
        let mut named = Vec::new();
        for arg in args {
            let v = self.eval_expr(&arg.value, env)?;
            match &arg.name {
                Some(name) => named.push((name.clone(), v)),
                None => positional.push(v),
            }
        }
        Ok((positional, named))
    }

    fn resolve_callee(&mut self, callee: &Expr, optional: bool, env: &Environment, loc: CodeLoc) -> RunResult<CalleeResolution> {
        match callee {
            Expr::Member { object, prop, optional: m_opt, .. } => {
                let receiver = self.eval_expr(object, env)?;
                if *m_opt && matches!(receiver, Value::Nil) {
                    return Ok(CalleeResolution::Nil);
                }
                let method = ops::get_property(&receiver, prop).map_err(|e| e.with_loc(loc, &self.current_file))?;
                if optional && matches!(method, Value::Nil) {
                    return Ok(CalleeResolution::Nil);
                }
                let bound = ops::bind_method_receiver(method, receiver);
                let callable = ops::expect_callable(&bound).map_err(|e| e.with_loc(loc, &self.current_file))?;
                Ok(CalleeResolution::Callable(callable, prop.clone()))
            }
            Expr::Index { object, index, optional: i_opt, .. } => {
                let receiver = self.eval_expr(object, env)?;
                if *i_opt && matches!(receiver, Value::Nil) {
                    return Ok(CalleeResolution::Nil);
                }
                let index_val = self.eval_expr(index, env)?;
                let method = ops::get_index(&receiver, &index_val).map_err(|e| e.with_loc(loc, &self.current_file))?;
                if optional && matches!(method, Value::Nil) {
                    return Ok(CalleeResolution::Nil);
                }
                let bound = ops::bind_method_receiver(method, receiver);
                let callable = ops::expect_callable(&bound).map_err(|e| e.with_loc(loc, &self.current_file))?;
                Ok(CalleeResolution::Callable(callable, "<call>".to_owned()))
            }
            _ => {
                let callee_val = self.eval_expr(callee, env)?;
                if optional && matches!(callee_val, Value::Nil) {
                    return Ok(CalleeResolution::Nil);
                }
                let callable = ops::expect_callable(&callee_val).map_err(|e| e.with_loc(loc, &self.current_file))?;
                let name = callable.display_name().to_owned();
                Ok(CalleeResolution::Callable(callable, name))
            }
        }
    }

    fn eval_call(&mut self, callee: &Expr, args: &[Arg], optional: bool, loc: CodeLoc, env: &Environment) -> RunResult<Value> {
        match self.resolve_callee(callee, optional, env, loc)? {
            CalleeResolution::Nil => Ok(Value::Nil),
            CalleeResolution::Callable(callable, name) => {
                let (positional, named) = self.eval_args(args, env)?;
                self.invoke_callable(callable, positional, named, &name, loc)
            }
        }
    }

    fn invoke_callable(
        &mut self,
        callable: Callable,
        positional: Vec<Value>,
        named: Vec<(String, Value)>,
        name: &str,
        loc: CodeLoc,
    ) -> RunResult<Value> {
        let file = self.current_file.clone();
        self.call(callable, positional, named).map_err(|e| {
            let e = e.with_loc(loc, &file);
            e.push_frame(StackFrame {
                function_name: name.to_owned(),
                at: loc,
                file,
            })
        })
    }

    fn eval_binary(&mut self, op: BinOp, left: &Expr, right: &Expr, loc: CodeLoc, env: &Environment) -> RunResult<Value> {
        let l = self.eval_expr(left, env)?;
        let r = self.eval_expr(right, env)?;
        let result = match op {
            BinOp::Add => l.add(&r),
            BinOp::Sub => Ok(Value::Number(l.as_number()?.sub(r.as_number()?))),
            BinOp::Mul => Ok(Value::Number(l.as_number()?.mul(r.as_number()?))),
            BinOp::Div => Ok(Value::Number(l.as_number()?.div(r.as_number()?)?)),
            BinOp::Mod => Ok(Value::Number(l.as_number()?.modulo(r.as_number()?)?)),
            BinOp::Eq => Ok(Value::Bool(l.equals(&r))),
            BinOp::NotEq => Ok(Value::Bool(!l.equals(&r))),
            BinOp::Lt => Ok(Value::Bool(l.compare(&r)?.is_lt())),
            BinOp::LtEq => Ok(Value::Bool(l.compare(&r)?.is_le())),
            BinOp::Gt => Ok(Value::Bool(l.compare(&r)?.is_gt())),
            BinOp::GtEq => Ok(Value::Bool(l.compare(&r)?.is_ge())),
        };
        result.map_err(|e| e.with_loc(loc, &self.current_file))
    }

    fn eval_logical(&mut self, op: LogicalOp, left: &Expr, right: &Expr, env: &Environment) -> RunResult<Value> {
        let l = self.eval_expr(left, env)?;
        match op {
            LogicalOp::And => {
                if l.truthy() {
                    self.eval_expr(right, env)
                } else {
                    Ok(l)
                }
            }
            LogicalOp::Or => {
                if l.truthy() {
                    Ok(l)
                } else {
                    self.eval_expr(right, env)
                }
            }
            LogicalOp::Nullish => {
                if matches!(l, Value::Nil) {
                    self.eval_expr(right, env)
                } else {
                    Ok(l)
                }
            }
        }
    }

    fn apply_compound(&self, op: AssignOp, current: &Value, rhs: &Value) -> RunResult<Value> {
        match op {
            AssignOp::Add => current.add(rhs),
            AssignOp::Sub => Ok(Value::Number(current.as_number()?.sub(rhs.as_number()?))),
            AssignOp::Mul => Ok(Value::Number(current.as_number()?.mul(rhs.as_number()?))),
            AssignOp::Div => Ok(Value::Number(current.as_number()?.div(rhs.as_number()?)?)),
            AssignOp::Mod => Ok(Value::Number(current.as_number()?.modulo(rhs.as_number()?)?)),
            AssignOp::Assign | AssignOp::Nullish => unreachable!("handled by caller"),
        }
    }

    fn eval_assign(&mut self, op: AssignOp, target: &Expr, value_expr: &Expr, loc: CodeLoc, env: &Environment) -> RunResult<Value> {
        match target {
            Expr::Ident(name) => {
                if op == AssignOp::Nullish {
                    let current = env.get(name).map_err(|e| e.with_loc(loc, &self.current_file))?;
                    if !matches!(current, Value::Nil) {
                        return Ok(current);
                    }
                    let rhs = self.eval_expr(value_expr, env)?;
                    env.assign(name, rhs.clone()).map_err(|e| e.with_loc(loc, &self.current_file))?;
                    return Ok(rhs);
                }
                let new_val = if op == AssignOp::Assign {
                    self.eval_expr(value_expr, env)?
                } else {
                    let current = env.get(name).map_err(|e| e.with_loc(loc, &self.current_file))?;
                    let rhs = self.eval_expr(value_expr, env)?;
                    self.apply_compound(op, &current, &rhs).map_err(|e| e.with_loc(loc, &self.current_file))?
                };
                env.assign(name, new_val.clone()).map_err(|e| e.with_loc(loc, &self.current_file))?;
                Ok(new_val)
            }
            Expr::Member { object, prop, optional, .. } => {
                let base = self.eval_expr(object, env)?;
                if *optional && matches!(base, Value::Nil) {
                    return Ok(Value::Nil);
                }
                if op == AssignOp::Nullish {
                    let current = ops::get_property(&base, prop).map_err(|e| e.with_loc(loc, &self.current_file))?;
                    if !matches!(current, Value::Nil) {
                        return Ok(current);
                    }
                    let rhs = self.eval_expr(value_expr, env)?;
                    ops::set_property(&base, prop, rhs.clone()).map_err(|e| e.with_loc(loc, &self.current_file))?;
                    return Ok(rhs);
                }
                let new_val = if op == AssignOp::Assign {
                    self.eval_expr(value_expr, env)?
                } else {
                    let current = ops::get_property(&base, prop).map_err(|e| e.with_loc(loc, &self.current_file))?;
                    let rhs = self.eval_expr(value_expr, env)?;
                    self.apply_compound(op, &current, &rhs).map_err(|e| e.with_loc(loc, &self.current_file))?
                };
                ops::set_property(&base, prop, new_val.clone()).map_err(|e| e.with_loc(loc, &self.current_file))?;
                Ok(new_val)
            }
            Expr::Index { object, index, optional, .. } => {
                let base = self.eval_expr(object, env)?;
                if *optional && matches!(base, Value::Nil) {
                    return Ok(Value::Nil);
                }
                let index_val = self.eval_expr(index, env)?;
                if op == AssignOp::Nullish {
                    let current = ops::get_index(&base, &index_val).map_err(|e| e.with_loc(loc, &self.current_file))?;
                    if !matches!(current, Value::Nil) {
                        return Ok(current);
                    }
                    let rhs = self.eval_expr(value_expr, env)?;
                    ops::set_index(&base, &index_val, rhs.clone()).map_err(|e| e.with_loc(loc, &self.current_file))?;
                    return Ok(rhs);
                }
                let new_val = if op == AssignOp::Assign {
                    self.eval_expr(value_expr, env)?
                } else {
                    let current = ops::get_index(&base, &index_val).map_err(|e| e.with_loc(loc, &self.current_file))?;
                    let rhs = self.eval_expr(value_expr, env)?;
                    self.apply_compound(op, &current, &rhs).map_err(|e| e.with_loc(loc, &self.current_file))?
                };
                ops::set_index(&base, &index_val, new_val.clone()).map_err(|e| e.with_loc(loc, &self.current_file))?;
                Ok(new_val)
            }
            _ => Err(RunError::runtime("invalid assignment target").with_loc(loc, &self.current_file)),
        }
    }

    fn bind_name(&mut self, name: &str, value: Value, env: &Environment, decl_kind: Option<DeclKind>) -> RunResult<()> {
        match decl_kind {
            Some(DeclKind::Var) => env.define_var(name, value),
            Some(DeclKind::Let) => env.define_let(name, Some(value), false),
            Some(DeclKind::Const) => env.define_let(name, Some(value), true),
            None => env.assign(name, value),
        }
    }

    fn assign_to_lvalue(&mut self, expr: &Expr, value: Value, env: &Environment) -> RunResult<()> {
        match expr {
            Expr::Ident(name) => env.assign(name, value),
            Expr::Member { object, prop, .. } => {
                let base = self.eval_expr(object, env)?;
                ops::set_property(&base, prop, value)
            }
            Expr::Index { object, index, .. } => {
                let base = self.eval_expr(object, env)?;
                let idx = self.eval_expr(index, env)?;
                ops::set_index(&base, &idx, value)
            }
            _ => Err(RunError::runtime("invalid lvalue in destructuring pattern")),
        }
    }

    /// Binds a destructuring pattern (§4.E "Destructuring semantics"). With
    /// `decl_kind` set, names are freshly declared; `None` means the pattern
    /// is an assignment target and every leaf must already exist.
    fn bind_pattern(&mut self, pattern: &Pattern, value: Value, env: &Environment, decl_kind: Option<DeclKind>) -> RunResult<()> {
        match pattern {
            Pattern::Ident(name) => self.bind_name(name, value, env, decl_kind),
            Pattern::Lvalue(expr) => self.assign_to_lvalue(expr, value, env),
            Pattern::Array { elements, rest } => {
                let items: Vec<Value> = match &value {
                    Value::Array(a) => a.borrow().clone(),
                    _ => Vec::new(),
                };
                for (idx, el) in elements.iter().enumerate() {
                    let slot = items.get(idx).cloned().unwrap_or(Value::Nil);
                    let bound = if matches!(slot, Value::Nil) {
                        match &el.default {
                            Some(expr) => self.eval_expr(expr, env)?,
                            None => Value::Nil,
                        }
                    } else {
                        slot
                    };
                    self.bind_pattern(&el.target, bound, env, decl_kind)?;
                }
                if let Some(rest_pat) = rest {
                    let rest_items = items.get(elements.len()..).map(<[Value]>::to_vec).unwrap_or_default();
                    self.bind_pattern(rest_pat, Value::array(rest_items), env, decl_kind)?;
                }
                Ok(())
            }
            Pattern::Object { props, rest } => {
                let source = match &value {
                    Value::Object(o) => Some(o.borrow().clone()),
                    _ => None,
                };
                let mut matched = HashSet::new();
                for prop in props {
                    matched.insert(prop.key.clone());
                    let found = source.as_ref().and_then(|m| m.get(&prop.key).cloned());
                    let bound = match found {
                        Some(v) => v,
                        None => match &prop.default {
                            Some(expr) => self.eval_expr(expr, env)?,
                            None => Value::Nil,
                        },
                    };
                    self.bind_pattern(&prop.target, bound, env, decl_kind)?;
                }
                if let Some(rest_name) = rest {
                    let mut rest_map = ops::new_object_map();
                    if let Some(source) = &source {
                        for (k, v) in source {
                            if !matched.contains(k) {
                                rest_map.insert(k.clone(), v.clone());
                            }
                        }
                    }
                    self.bind_name(rest_name, Value::object(rest_map), env, decl_kind)?;
                }
                Ok(())
            }
        }
    }

    pub(crate) fn eval_expr(&mut self, expr: &Expr, env: &Environment) -> RunResult<Value> {
        match expr {
            Expr::Nil => Ok(Value::Nil),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Number(n) => Ok(Value::Number(n.clone())),
            Expr::Str(s) => Ok(Value::from(s.clone())),
            Expr::This => env.get("this"),
            Expr::Ident(name) => env.get(name),
            Expr::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_expr(item, env)?);
                }
                Ok(Value::array(values))
            }
            Expr::Object(props) => {
                let mut map = ops::new_object_map();
                for (key, value_expr) in props {
                    let key_str = match key {
                        ObjectKey::Ident(name) => name.clone(),
                        ObjectKey::Computed(expr) => self.eval_expr(expr, env)?.as_key(),
                    };
                    let value = self.eval_expr(value_expr, env)?;
                    map.insert(key_str, value);
                }
                Ok(Value::object(map))
            }
            Expr::Unary { op, expr, loc } => {
                let v = self.eval_expr(expr, env)?;
                match op {
                    crate::ast::UnaryOp::Neg => {
                        Ok(Value::Number(v.as_number().map_err(|e| e.with_loc(*loc, &self.current_file))?.neg()))
                    }
                    crate::ast::UnaryOp::Not => Ok(Value::Bool(!v.truthy())),
                }
            }
            Expr::Binary { op, left, right, loc } => self.eval_binary(*op, left, right, *loc, env),
            Expr::Logical { op, left, right } => self.eval_logical(*op, left, right, env),
            Expr::Ternary { cond, then_branch, else_branch } => {
                if self.eval_expr(cond, env)?.truthy() {
                    self.eval_expr(then_branch, env)
                } else {
                    self.eval_expr(else_branch, env)
                }
            }
            Expr::Assign { op, target, value, loc } => self.eval_assign(*op, target, value, *loc, env),
            Expr::DestructuringAssign { pattern, value } => {
                let v = self.eval_expr(value, env)?;
                self.bind_pattern(pattern, v.clone(), env, None)?;
                Ok(v)
            }
            Expr::Call { callee, args, optional, loc } => self.eval_call(callee, args, *optional, *loc, env),
            Expr::Member { object, prop, optional, loc } => {
                let base = self.eval_expr(object, env)?;
                if *optional && matches!(base, Value::Nil) {
                    return Ok(Value::Nil);
                }
                ops::get_property(&base, prop).map_err(|e| e.with_loc(*loc, &self.current_file))
            }
            Expr::Index { object, index, optional, loc } => {
                let base = self.eval_expr(object, env)?;
                if *optional && matches!(base, Value::Nil) {
                    return Ok(Value::Nil);
                }
                let idx = self.eval_expr(index, env)?;
                ops::get_index(&base, &idx).map_err(|e| e.with_loc(*loc, &self.current_file))
            }
            Expr::Arrow { params, body } => Ok(Value::Function(self.make_arrow(params.clone(), body, env))),
            Expr::FnExpr { name, params, body } => {
                let display_name = name.clone().unwrap_or_else(|| "<anonymous>".to_owned());
                Ok(Value::Function(self.make_function(display_name, params.clone(), body, env, false)))
            }
        }
    }
}

fn arity_description(min: usize, max: Option<usize>) -> String {
    match max {
        Some(max) if max == min => min.to_string(),
        Some(max) => format!("between {min} and {max}"),
        None => format!("at least {min}"),
    }
}
