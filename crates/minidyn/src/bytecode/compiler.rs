//! AST → bytecode compiler (spec §4.F).
//!
//! Compiles only the supported subset named in spec §4.F; anything else
//! returns `CompileError` so the caller falls back to the tree-walker. The
//! compiler never needs to handle tail calls: it refuses any `return`
//! expression containing a call, so the tree-walker's TCO path always
//! handles tail calls (spec §4.F, §9).

use crate::ast::{AssignOp, BinOp, Block, Expr, LogicalOp, Params, Stmt, UnaryOp};
use crate::bytecode::chunk::Chunk;
use crate::bytecode::opcode::Opcode;
use crate::env::Environment;
use crate::function::BytecodeFunction;
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct CompileError(pub String);

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn bail<T>(msg: impl Into<String>) -> Result<T, CompileError> {
    Err(CompileError(msg.into()))
}

pub enum CompileBody<'a> {
    Expr(&'a Expr),
    Block(&'a Block),
}

struct LoopCtx {
    /// Indices of not-yet-patched `break` jumps, patched to just past the
    /// loop once its end is known.
    break_jumps: Vec<usize>,
    /// Indices of not-yet-patched `continue` jumps, patched to the loop's
    /// per-iteration tail (the update clause for a classic `for`, the
    /// condition re-check for `while`) once that location is known.
    continue_jumps: Vec<usize>,
}

pub struct Compiler {
    chunk: Chunk,
    /// Names bound as locals (params + declared variables); anything else
    /// is treated as a free variable resolved by name against the closure.
    known_locals: Vec<String>,
    loop_stack: Vec<LoopCtx>,
}

impl Compiler {
    pub fn compile_function(
        name: &str,
        params: &Params,
        body: CompileBody<'_>,
        closure: &Environment,
        is_arrow: bool,
    ) -> Result<BytecodeFunction, CompileError> {
        if !params.normal.iter().all(|p| p.default.is_none()) || params.rest.is_some() {
            return bail("bytecode VM refuses defaults/rest parameters");
        }
        let mut compiler = Self {
            chunk: Chunk::new(params.clone()),
            known_locals: params.normal.iter().map(|p| p.name.clone()).collect(),
            loop_stack: Vec::new(),
        };
        for p in &params.normal {
            compiler.chunk.slot_for(&p.name);
        }
        match body {
            CompileBody::Expr(expr) => {
                compiler.compile_expr(expr)?;
                compiler.chunk.emit(Opcode::Return);
            }
            CompileBody::Block(stmts) => {
                compiler.compile_block(stmts)?;
                compiler.chunk.emit(Opcode::LoadConst(compiler.chunk_nil()));
                compiler.chunk.emit(Opcode::Return);
            }
        }
        compiler.chunk.peephole();
        Ok(BytecodeFunction {
            name: name.to_owned(),
            chunk: compiler.chunk,
            closure: closure.clone(),
            is_arrow,
        })
    }

    fn chunk_nil(&mut self) -> u32 {
        self.chunk.add_constant(Value::Nil)
    }

    fn compile_block(&mut self, stmts: &[Stmt]) -> Result<(), CompileError> {
        for stmt in stmts {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }

    fn compile_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::VarDecl { declarators, .. } => {
                for decl in declarators {
                    let name = match &decl.pattern {
                        crate::ast::Pattern::Ident(n) => n.clone(),
                        _ => return bail("bytecode VM only supports simple identifier declarations"),
                    };
                    match &decl.init {
                        Some(expr) => self.compile_expr(expr)?,
                        None => {
                            let c = self.chunk_nil();
                            self.chunk.emit(Opcode::LoadConst(c));
                        }
                    }
                    self.known_locals.push(name.clone());
                    let slot = self.chunk.slot_for(&name);
                    self.chunk.emit(Opcode::StoreSlot(slot));
                    self.chunk.emit(Opcode::Pop);
                }
                Ok(())
            }
            Stmt::Block(body) => self.compile_block(body),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.compile_expr(cond)?;
                let jump_else = self.chunk.emit(Opcode::JumpIfFalse(0));
                self.compile_stmt(then_branch)?;
                if let Some(else_branch) = else_branch {
                    let jump_end = self.chunk.emit(Opcode::Jump(0));
                    self.patch(jump_else);
                    self.compile_stmt(else_branch)?;
                    self.patch(jump_end);
                } else {
                    self.patch(jump_else);
                }
                Ok(())
            }
            Stmt::While { cond, body } => {
                let start = self.chunk.code.len() as u32;
                self.compile_expr(cond)?;
                let jump_end = self.chunk.emit(Opcode::JumpIfFalse(0));
                self.loop_stack.push(LoopCtx {
                    break_jumps: Vec::new(),
                    continue_jumps: Vec::new(),
                });
                self.compile_stmt(body)?;
                let ctx = self.loop_stack.pop().expect("loop context pushed above");
                for idx in ctx.continue_jumps {
                    self.patch_to(idx, start);
                }
                self.chunk.emit(Opcode::Jump(start));
                self.patch(jump_end);
                for idx in ctx.break_jumps {
                    self.patch(idx);
                }
                Ok(())
            }
            Stmt::ForClassic {
                init,
                cond,
                update,
                body,
            } => {
                if let Some(init) = init {
                    self.compile_stmt(init)?;
                }
                let start = self.chunk.code.len() as u32;
                let jump_end = if let Some(cond) = cond {
                    self.compile_expr(cond)?;
                    Some(self.chunk.emit(Opcode::JumpIfFalse(0)))
                } else {
                    None
                };
                self.loop_stack.push(LoopCtx {
                    break_jumps: Vec::new(),
                    continue_jumps: Vec::new(),
                });
                self.compile_stmt(body)?;
                let ctx = self.loop_stack.pop().expect("loop context pushed above");
                let update_start = self.chunk.code.len() as u32;
                for idx in ctx.continue_jumps {
                    self.patch_to(idx, update_start);
                }
                if let Some(update) = update {
                    self.compile_expr(update)?;
                    self.chunk.emit(Opcode::Pop);
                }
                self.chunk.emit(Opcode::Jump(start));
                if let Some(jump_end) = jump_end {
                    self.patch(jump_end);
                }
                for idx in ctx.break_jumps {
                    self.patch(idx);
                }
                Ok(())
            }
            Stmt::Break => match self.loop_stack.last_mut() {
                Some(ctx) => {
                    let idx = self.chunk.emit(Opcode::Jump(0));
                    ctx.break_jumps.push(idx);
                    Ok(())
                }
                None => bail("`break` outside a loop"),
            },
            Stmt::Continue => match self.loop_stack.last_mut() {
                Some(ctx) => {
                    let idx = self.chunk.emit(Opcode::Jump(0));
                    ctx.continue_jumps.push(idx);
                    Ok(())
                }
                None => bail("`continue` outside a loop"),
            },
            Stmt::Return { value, .. } => {
                if let Some(expr) = value {
                    if contains_call(expr) {
                        return bail("bytecode VM refuses return expressions containing a call");
                    }
                    self.compile_expr(expr)?;
                } else {
                    let c = self.chunk_nil();
                    self.chunk.emit(Opcode::LoadConst(c));
                }
                self.chunk.emit(Opcode::Return);
                Ok(())
            }
            Stmt::Expr(expr) => {
                self.compile_expr(expr)?;
                self.chunk.emit(Opcode::Pop);
                Ok(())
            }
            _ => bail("statement form not supported by the bytecode compiler"),
        }
    }

    fn patch(&mut self, index: usize) {
        let target = self.chunk.code.len() as u32;
        self.patch_to(index, target);
    }

    fn patch_to(&mut self, index: usize, target: u32) {
        match &mut self.chunk.code[index] {
            Opcode::Jump(t) | Opcode::JumpIfFalse(t) | Opcode::JumpIfTruthy(t) | Opcode::JumpIfNotNil(t) => {
                *t = target;
            }
            _ => unreachable!("patch target must be a jump"),
        }
    }

    fn compile_expr(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match expr {
            Expr::Nil => {
                let c = self.chunk.add_constant(Value::Nil);
                self.chunk.emit(Opcode::LoadConst(c));
            }
            Expr::Bool(b) => {
                let c = self.chunk.add_constant(Value::Bool(*b));
                self.chunk.emit(Opcode::LoadConst(c));
            }
            Expr::Number(n) => {
                let c = self.chunk.add_constant(Value::Number(n.clone()));
                self.chunk.emit(Opcode::LoadConst(c));
            }
            Expr::Str(s) => {
                let c = self.chunk.add_constant(Value::from(s.clone()));
                self.chunk.emit(Opcode::LoadConst(c));
            }
            Expr::This => {
                self.chunk.emit(Opcode::LoadName("this".to_owned()));
            }
            Expr::Ident(name) => {
                if self.known_locals.contains(name) {
                    let slot = self.chunk.slot_for(name);
                    self.chunk.emit(Opcode::LoadSlot(slot));
                } else {
                    self.chunk.emit(Opcode::LoadName(name.clone()));
                }
            }
            Expr::Unary { op, expr, .. } => {
                self.compile_expr(expr)?;
                self.chunk.emit(match op {
                    UnaryOp::Neg => Opcode::Neg,
                    UnaryOp::Not => Opcode::Not,
                });
            }
            Expr::Binary { op, left, right, .. } => {
                self.compile_expr(left)?;
                self.compile_expr(right)?;
                self.chunk.emit(binop_opcode(*op));
            }
            Expr::Logical { op, left, right } => self.compile_logical(*op, left, right)?,
            Expr::Assign { op, target, value, .. } => self.compile_assign(*op, target, value)?,
            Expr::Member { object, prop, optional, .. } => {
                self.compile_expr(object)?;
                self.chunk.emit(Opcode::GetProp(prop.clone(), *optional));
            }
            Expr::Index { object, index, optional, .. } => {
                self.compile_expr(object)?;
                self.compile_expr(index)?;
                self.chunk.emit(Opcode::GetIndex(*optional));
            }
            Expr::Call { callee, args, optional, .. } => {
                if args.iter().any(|a| a.name.is_some()) {
                    return bail("bytecode VM rejects named arguments");
                }
                match callee.as_ref() {
                    Expr::Member { object, prop, optional: m_opt, .. } => {
                        self.compile_expr(object)?;
                        for a in args {
                            self.compile_expr(&a.value)?;
                        }
                        self.chunk
                            .emit(Opcode::MethodCall(prop.clone(), args.len() as u32, *m_opt || *optional));
                    }
                    _ => {
                        self.compile_expr(callee)?;
                        for a in args {
                            self.compile_expr(&a.value)?;
                        }
                        self.chunk.emit(Opcode::Call(args.len() as u32));
                    }
                }
            }
            _ => return bail("expression form not supported by the bytecode compiler"),
        }
        Ok(())
    }

    fn compile_logical(&mut self, op: LogicalOp, left: &Expr, right: &Expr) -> Result<(), CompileError> {
        self.compile_expr(left)?;
        match op {
            LogicalOp::And => {
                self.chunk.emit(Opcode::Dup);
                let jump = self.chunk.emit(Opcode::JumpIfFalse(0));
                self.chunk.emit(Opcode::Pop);
                self.compile_expr(right)?;
                self.patch(jump);
            }
            LogicalOp::Or => {
                self.chunk.emit(Opcode::Dup);
                let jump = self.chunk.emit(Opcode::JumpIfTruthy(0));
                self.chunk.emit(Opcode::Pop);
                self.compile_expr(right)?;
                self.patch(jump);
            }
            LogicalOp::Nullish => {
                self.chunk.emit(Opcode::Dup);
                let jump = self.chunk.emit(Opcode::JumpIfNotNil(0));
                self.chunk.emit(Opcode::Pop);
                self.compile_expr(right)?;
                self.patch(jump);
            }
        }
        Ok(())
    }

    fn compile_assign(&mut self, op: AssignOp, target: &Expr, value: &Expr) -> Result<(), CompileError> {
        if op == AssignOp::Nullish {
            // `??=` only evaluates and stores its RHS when the current value
            // is nil; that's a conditional store, not a plain binary op, and
            // the compiler has no opcode for it. Fall back to the
            // tree-walker instead of emitting an eager, unconditional store.
            return bail("bytecode VM refuses `??=` compound assignment");
        }
        match target {
            Expr::Ident(name) => {
                self.compile_compound_load_if_needed(op, &Expr::Ident(name.clone()))?;
                if op != AssignOp::Assign {
                    self.compile_expr(value)?;
                    self.emit_binary_for_compound(op);
                } else {
                    self.compile_expr(value)?;
                }
                self.chunk.emit(Opcode::Dup);
                if self.known_locals.contains(name) {
                    let slot = self.chunk.slot_for(name);
                    self.chunk.emit(Opcode::StoreSlot(slot));
                } else {
                    self.chunk.emit(Opcode::StoreName(name.clone()));
                }
                self.chunk.emit(Opcode::Pop);
                Ok(())
            }
            Expr::Member { object, prop, .. } => {
                self.compile_expr(object)?;
                if op != AssignOp::Assign {
                    self.chunk.emit(Opcode::Dup);
                    self.chunk.emit(Opcode::GetProp(prop.clone(), false));
                    self.compile_expr(value)?;
                    self.emit_binary_for_compound(op);
                } else {
                    self.compile_expr(value)?;
                }
                self.chunk.emit(Opcode::SetProp(prop.clone()));
                Ok(())
            }
            Expr::Index { object, index, .. } => {
                self.compile_expr(object)?;
                self.compile_expr(index)?;
                if op != AssignOp::Assign {
                    self.chunk.emit(Opcode::DupTop2);
                    self.chunk.emit(Opcode::GetIndex(false));
                    self.compile_expr(value)?;
                    self.emit_binary_for_compound(op);
                } else {
                    self.compile_expr(value)?;
                }
                self.chunk.emit(Opcode::SetIndex);
                Ok(())
            }
            _ => bail("assignment target not supported by the bytecode compiler"),
        }
    }

    fn compile_compound_load_if_needed(&mut self, op: AssignOp, target: &Expr) -> Result<(), CompileError> {
        if op == AssignOp::Assign {
            return Ok(());
        }
        self.compile_expr(target)
    }

    fn emit_binary_for_compound(&mut self, op: AssignOp) {
        self.chunk.emit(match op {
            AssignOp::Add => Opcode::Add,
            AssignOp::Sub => Opcode::Sub,
            AssignOp::Mul => Opcode::Mul,
            AssignOp::Div => Opcode::Div,
            AssignOp::Mod => Opcode::Mod,
            AssignOp::Nullish => unreachable!("compile_assign bails on `??=` before reaching this point"),
            AssignOp::Assign => unreachable!(),
        });
    }
}

fn binop_opcode(op: BinOp) -> Opcode {
    match op {
        BinOp::Add => Opcode::Add,
        BinOp::Sub => Opcode::Sub,
        BinOp::Mul => Opcode::Mul,
        BinOp::Div => Opcode::Div,
        BinOp::Mod => Opcode::Mod,
        BinOp::Eq => Opcode::Eq,
        BinOp::NotEq => Opcode::Ne,
        BinOp::Lt => Opcode::Lt,
        BinOp::LtEq => Opcode::Le,
        BinOp::Gt => Opcode::Gt,
        BinOp::GtEq => Opcode::Ge,
    }
}

/// Used by the `return`-with-call refusal (spec §4.F, §9): the bytecode
/// compiler never needs to implement tail calls because it simply won't
/// compile a function whose `return` could ever be one.
fn contains_call(expr: &Expr) -> bool {
    match expr {
        Expr::Call { .. } => true,
        Expr::Unary { expr, .. } => contains_call(expr),
        Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
            contains_call(left) || contains_call(right)
        }
        Expr::Ternary {
            cond,
            then_branch,
            else_branch,
        } => contains_call(cond) || contains_call(then_branch) || contains_call(else_branch),
        Expr::Assign { target, value, .. } => contains_call(target) || contains_call(value),
        Expr::Member { object, .. } => contains_call(object),
        Expr::Index { object, index, .. } => contains_call(object) || contains_call(index),
        Expr::Array(items) => items.iter().any(contains_call),
        Expr::Object(props) => props.iter().any(|(_, v)| contains_call(v)),
        _ => false,
    }
}
