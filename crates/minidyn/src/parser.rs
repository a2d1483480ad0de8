//! Recursive-descent parser with a precedence climb (spec §4.D, grammar in
//! §6). Produces the AST consumed by both the tree-walking evaluator and the
//! bytecode compiler.
//!
//! The grammar's `Expr = CommaExpr` line is a label for the general
//! expression nonterminal, not an actual comma-sequencing operator — no
//! statement form in the grammar has a comma-sequenced expression position,
//! so `parse_expr` is simply the top of the ternary/assignment chain.
//! Ternary and assignment are mutually recursive in the usual way:
//! assignment targets come from the conditional level, and both branches of
//! a ternary accept a full assignment expression. Call arguments and
//! pattern defaults are restricted to `Ternary` precedence (no assignment),
//! which is also where arrow functions are recognized — `map(x => x + 1)`
//! needs an arrow reachable at argument position, one level below full
//! assignment.

use crate::ast::{
    ArrayPatternElement, Arg, ArrowBody, AssignOp, BinOp, Block, DeclKind, Expr, ForEachKind, LogicalOp, ObjectKey,
    ObjectPatternProp, Param, Params, Pattern, Program, Stmt, UnaryOp, VarDeclarator,
};
use crate::exception::{RunError, RunResult};
use crate::lexer::{Lexer, decode_escapes};
use crate::number::Number;
use crate::token::{CodeLoc, NumberLiteral, Token, TokenKind};

pub fn parse(source: &str, file: &str) -> RunResult<Program> {
    let tokens = Lexer::new(source, file).tokenize()?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        file: file.to_owned(),
    };
    let mut program = Vec::new();
    while !parser.is(&TokenKind::Eof) {
        program.push(parser.parse_stmt()?);
    }
    Ok(program)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    file: String,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn peek_loc(&self) -> CodeLoc {
        self.peek().loc
    }

    fn kind_at(&self, offset: usize) -> &TokenKind {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn is(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek_kind()) == std::mem::discriminant(kind)
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, kind: TokenKind) -> RunResult<Token> {
        if self.is(&kind) {
            Ok(self.advance())
        } else {
            Err(self.error(format!("expected {kind:?}, found {:?}", self.peek_kind())))
        }
    }

    fn error(&self, message: impl Into<String>) -> RunError {
        RunError::parse(message.into(), self.peek_loc(), self.file.clone())
    }

    fn expect_identifier_name(&mut self) -> RunResult<String> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(self.error(format!("expected identifier, found {other:?}"))),
        }
    }

    fn match_assign_op(&mut self) -> Option<AssignOp> {
        let op = match self.peek_kind() {
            TokenKind::Assign => AssignOp::Assign,
            TokenKind::PlusAssign => AssignOp::Add,
            TokenKind::MinusAssign => AssignOp::Sub,
            TokenKind::StarAssign => AssignOp::Mul,
            TokenKind::SlashAssign => AssignOp::Div,
            TokenKind::PercentAssign => AssignOp::Mod,
            TokenKind::NullishAssign => AssignOp::Nullish,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    // ---- statements ----------------------------------------------------

    fn parse_stmt(&mut self) -> RunResult<Stmt> {
        match self.peek_kind() {
            TokenKind::Fn => self.parse_fn_decl(),
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                let stmt = self.parse_var_decl_body()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(stmt)
            }
            TokenKind::LBrace | TokenKind::LBracket => self.parse_brace_or_bracket_stmt(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Break => {
                self.advance();
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Break)
            }
            TokenKind::Continue => {
                self.advance();
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Continue)
            }
            TokenKind::Return => {
                let loc = self.peek_loc();
                self.advance();
                let value = if self.is(&TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Return { value, loc })
            }
            TokenKind::Throw => {
                let loc = self.peek_loc();
                self.advance();
                let value = self.parse_expr()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Throw { value, loc })
            }
            TokenKind::Try => self.parse_try(),
            _ => {
                let expr = self.parse_expr()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn parse_fn_decl(&mut self) -> RunResult<Stmt> {
        self.expect(TokenKind::Fn)?;
        let name = self.expect_identifier_name()?;
        self.expect(TokenKind::LParen)?;
        let params = self.parse_params_until_rparen()?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_block()?;
        Ok(Stmt::FnDecl { name, params, body })
    }

    /// Parses the `("var"|"let"|"const") Pattern ["=" Expr] {"," ...}` body
    /// without consuming the trailing `;` — shared between statement-level
    /// declarations and a classic `for`-head init clause.
    fn parse_var_decl_body(&mut self) -> RunResult<Stmt> {
        let loc = self.peek_loc();
        let kind = match self.peek_kind() {
            TokenKind::Var => DeclKind::Var,
            TokenKind::Let => DeclKind::Let,
            TokenKind::Const => DeclKind::Const,
            _ => return Err(self.error("expected 'var', 'let', or 'const'")),
        };
        self.advance();
        let mut declarators = Vec::new();
        loop {
            let pattern = self.parse_pattern_target()?;
            let init = if self.is(&TokenKind::Assign) {
                self.advance();
                Some(self.parse_assignment()?)
            } else {
                None
            };
            if init.is_none() {
                if kind == DeclKind::Const {
                    return Err(self.error("const declaration requires an initializer"));
                }
                if !matches!(pattern, Pattern::Ident(_)) {
                    return Err(self.error("destructuring declaration requires an initializer"));
                }
            }
            declarators.push(VarDeclarator { pattern, init });
            if self.is(&TokenKind::Comma) {
                self.advance();
                continue;
            }
            break;
        }
        Ok(Stmt::VarDecl { kind, declarators, loc })
    }

    /// Disambiguates a statement starting with `{` or `[`: a matching close
    /// bracket immediately followed by `=` means a destructuring-assignment
    /// statement; otherwise a block (for `{`) or an expression statement
    /// (for `[`, e.g. an array-literal expression) (spec §4.D).
    fn parse_brace_or_bracket_stmt(&mut self) -> RunResult<Stmt> {
        if self.looks_like_destructuring_assign() {
            let pattern = self.parse_pattern_target()?;
            self.expect(TokenKind::Assign)?;
            let value = self.parse_expr()?;
            self.expect(TokenKind::Semicolon)?;
            return Ok(Stmt::DestructuringAssignStmt { pattern, value });
        }
        if self.is(&TokenKind::LBrace) {
            Ok(Stmt::Block(self.parse_block()?))
        } else {
            let expr = self.parse_expr()?;
            self.expect(TokenKind::Semicolon)?;
            Ok(Stmt::Expr(expr))
        }
    }

    fn looks_like_destructuring_assign(&self) -> bool {
        let mut depth = 0i32;
        let mut i = self.pos;
        loop {
            match self.tokens.get(i).map(|t| &t.kind) {
                Some(TokenKind::LBrace | TokenKind::LBracket | TokenKind::LParen) => depth += 1,
                Some(TokenKind::RBrace | TokenKind::RBracket | TokenKind::RParen) => {
                    depth -= 1;
                    if depth == 0 {
                        return matches!(self.tokens.get(i + 1).map(|t| &t.kind), Some(TokenKind::Assign));
                    }
                }
                Some(TokenKind::Eof) | None => return false,
                _ => {}
            }
            i += 1;
        }
    }

    fn parse_block(&mut self) -> RunResult<Block> {
        self.expect(TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.is(&TokenKind::RBrace) {
            stmts.push(self.parse_stmt()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(stmts)
    }

    fn parse_if(&mut self) -> RunResult<Stmt> {
        self.expect(TokenKind::If)?;
        self.expect(TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        let then_branch = Box::new(self.parse_stmt()?);
        let else_branch = if self.is(&TokenKind::Else) {
            self.advance();
            Some(Box::new(self.parse_stmt()?))
        } else {
            None
        };
        Ok(Stmt::If {
            cond,
            then_branch,
            else_branch,
        })
    }

    fn parse_while(&mut self) -> RunResult<Stmt> {
        self.expect(TokenKind::While)?;
        self.expect(TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt::While { cond, body })
    }

    /// Classic vs each-style `for` are distinguished by whether a `;`
    /// appears at the head's parenthesis depth zero before the matching `)`
    /// (spec §4.D).
    fn for_head_is_classic(&self) -> bool {
        let mut depth = 0i32;
        let mut i = self.pos;
        loop {
            match self.tokens.get(i).map(|t| &t.kind) {
                Some(TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace) => depth += 1,
                Some(TokenKind::RParen) => {
                    if depth == 0 {
                        return false;
                    }
                    depth -= 1;
                }
                Some(TokenKind::RBracket | TokenKind::RBrace) => depth -= 1,
                Some(TokenKind::Semicolon) if depth == 0 => return true,
                Some(TokenKind::Eof) | None => return false,
                _ => {}
            }
            i += 1;
        }
    }

    fn parse_for(&mut self) -> RunResult<Stmt> {
        self.expect(TokenKind::For)?;
        self.expect(TokenKind::LParen)?;
        if self.for_head_is_classic() {
            let init = if self.is(&TokenKind::Semicolon) {
                None
            } else if matches!(self.peek_kind(), TokenKind::Var | TokenKind::Let | TokenKind::Const) {
                Some(Box::new(self.parse_var_decl_body()?))
            } else {
                let e = self.parse_expr()?;
                Some(Box::new(Stmt::Expr(e)))
            };
            self.expect(TokenKind::Semicolon)?;
            let cond = if self.is(&TokenKind::Semicolon) {
                None
            } else {
                Some(self.parse_expr()?)
            };
            self.expect(TokenKind::Semicolon)?;
            let update = if self.is(&TokenKind::RParen) {
                None
            } else {
                Some(self.parse_expr()?)
            };
            self.expect(TokenKind::RParen)?;
            let body = Box::new(self.parse_stmt()?);
            Ok(Stmt::ForClassic { init, cond, update, body })
        } else {
            let decl_kind = match self.peek_kind() {
                TokenKind::Var => Some(DeclKind::Var),
                TokenKind::Let => Some(DeclKind::Let),
                TokenKind::Const => Some(DeclKind::Const),
                _ => None,
            };
            if decl_kind.is_some() {
                self.advance();
            }
            let pattern = self.parse_pattern_target()?;
            let kind = if self.is(&TokenKind::In) {
                self.advance();
                ForEachKind::In
            } else if self.is(&TokenKind::Of) {
                self.advance();
                ForEachKind::Of
            } else {
                return Err(self.error("expected 'in' or 'of' in for-each head"));
            };
            let iterable = self.parse_expr()?;
            self.expect(TokenKind::RParen)?;
            let body = Box::new(self.parse_stmt()?);
            Ok(Stmt::ForEach {
                decl_kind,
                pattern,
                kind,
                iterable,
                body,
            })
        }
    }

    fn parse_try(&mut self) -> RunResult<Stmt> {
        self.expect(TokenKind::Try)?;
        let block = self.parse_block()?;
        let catch = if self.is(&TokenKind::Catch) {
            self.advance();
            let name = if self.is(&TokenKind::LParen) {
                self.advance();
                let n = if self.is(&TokenKind::RParen) {
                    None
                } else {
                    Some(self.expect_identifier_name()?)
                };
                self.expect(TokenKind::RParen)?;
                n
            } else {
                None
            };
            let body = self.parse_block()?;
            Some((name, body))
        } else {
            None
        };
        let finally = if self.is(&TokenKind::Finally) {
            self.advance();
            Some(self.parse_block()?)
        } else {
            None
        };
        Ok(Stmt::Try { block, catch, finally })
    }

    // ---- patterns --------------------------------------------------------

    fn parse_pattern_target(&mut self) -> RunResult<Pattern> {
        if self.is(&TokenKind::LBracket) {
            return self.parse_array_pattern();
        }
        if self.is(&TokenKind::LBrace) {
            return self.parse_object_pattern();
        }
        let expr = self.parse_lvalue_chain()?;
        match expr {
            Expr::Ident(name) => Ok(Pattern::Ident(name)),
            other => Ok(Pattern::Lvalue(Box::new(other))),
        }
    }

    /// A restricted member-chain used for pattern alias targets (`a.b`,
    /// `a[x]`) — no calls, no optional chaining (spec §4.D).
    fn parse_lvalue_chain(&mut self) -> RunResult<Expr> {
        let name = self.expect_identifier_name()?;
        let mut expr = Expr::Ident(name);
        loop {
            let loc = self.peek_loc();
            if self.is(&TokenKind::Dot) {
                self.advance();
                let prop = self.expect_identifier_name()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    prop,
                    optional: false,
                    loc,
                };
            } else if self.is(&TokenKind::LBracket) {
                self.advance();
                let index = self.parse_expr()?;
                self.expect(TokenKind::RBracket)?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                    optional: false,
                    loc,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_array_pattern(&mut self) -> RunResult<Pattern> {
        self.expect(TokenKind::LBracket)?;
        let mut elements = Vec::new();
        let mut rest = None;
        while !self.is(&TokenKind::RBracket) {
            if self.is(&TokenKind::Ellipsis) {
                self.advance();
                rest = Some(Box::new(self.parse_pattern_target()?));
                break;
            }
            let target = self.parse_pattern_target()?;
            let default = if self.is(&TokenKind::Assign) {
                self.advance();
                Some(self.parse_ternary()?)
            } else {
                None
            };
            elements.push(ArrayPatternElement { target, default });
            if self.is(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RBracket)?;
        Ok(Pattern::Array { elements, rest })
    }

    fn parse_object_pattern(&mut self) -> RunResult<Pattern> {
        self.expect(TokenKind::LBrace)?;
        let mut props = Vec::new();
        let mut rest = None;
        while !self.is(&TokenKind::RBrace) {
            if self.is(&TokenKind::Ellipsis) {
                self.advance();
                rest = Some(self.expect_identifier_name()?);
                break;
            }
            let key = self.expect_identifier_name()?;
            let target = if self.is(&TokenKind::Colon) {
                self.advance();
                self.parse_pattern_target()?
            } else {
                Pattern::Ident(key.clone())
            };
            let default = if self.is(&TokenKind::Assign) {
                self.advance();
                Some(self.parse_ternary()?)
            } else {
                None
            };
            props.push(ObjectPatternProp { key, target, default });
            if self.is(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Pattern::Object { props, rest })
    }

    // ---- params / args ---------------------------------------------------

    fn parse_params_until_rparen(&mut self) -> RunResult<Params> {
        let mut normal: Vec<Param> = Vec::new();
        let mut rest = None;
        while !self.is(&TokenKind::RParen) {
            if self.is(&TokenKind::Ellipsis) {
                self.advance();
                let name = self.expect_identifier_name()?;
                rest = Some(name);
                if self.is(&TokenKind::Comma) {
                    return Err(self.error("rest parameter must be last"));
                }
                break;
            }
            let name = self.expect_identifier_name()?;
            if normal.iter().any(|p| p.name == name) {
                return Err(self.error(format!("duplicate parameter name '{name}'")));
            }
            let default = if self.is(&TokenKind::Assign) {
                self.advance();
                Some(self.parse_ternary()?)
            } else {
                None
            };
            normal.push(Param { name, default });
            if self.is(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        Ok(Params { normal, rest })
    }

    fn parse_args_until_rparen(&mut self) -> RunResult<Vec<Arg>> {
        let mut args = Vec::new();
        while !self.is(&TokenKind::RParen) {
            let name = if matches!(self.peek_kind(), TokenKind::Identifier(_)) && self.is_colon_at(1) {
                let n = self.expect_identifier_name()?;
                self.expect(TokenKind::Colon)?;
                Some(n)
            } else {
                None
            };
            let value = self.parse_ternary()?;
            args.push(Arg { name, value });
            if self.is(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(args)
    }

    fn is_colon_at(&self, offset: usize) -> bool {
        matches!(self.kind_at(offset), TokenKind::Colon)
    }

    // ---- expressions ------------------------------------------------------

    fn parse_expr(&mut self) -> RunResult<Expr> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> RunResult<Expr> {
        let target = self.parse_ternary()?;
        let loc = self.peek_loc();
        if let Some(op) = self.match_assign_op() {
            let value = self.parse_assignment()?;
            return Ok(Expr::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
                loc,
            });
        }
        Ok(target)
    }

    /// Also the entry point for call-argument and pattern-default parsing
    /// (spec §4.D Params/Args grammar uses `Ternary`), which is why arrow
    /// functions are attempted here rather than one level up.
    fn parse_ternary(&mut self) -> RunResult<Expr> {
        if let Some(arrow) = self.try_parse_arrow()? {
            return Ok(arrow);
        }
        let cond = self.parse_nullish()?;
        if self.is(&TokenKind::Question) {
            self.advance();
            let then_branch = self.parse_assignment()?;
            self.expect(TokenKind::Colon)?;
            let else_branch = self.parse_assignment()?;
            return Ok(Expr::Ternary {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            });
        }
        Ok(cond)
    }

    fn try_parse_arrow(&mut self) -> RunResult<Option<Expr>> {
        let start = self.pos;
        if let TokenKind::Identifier(name) = self.peek_kind().clone() {
            if matches!(self.kind_at(1), TokenKind::Arrow) {
                self.advance();
                self.advance();
                let params = Params {
                    normal: vec![Param { name, default: None }],
                    rest: None,
                };
                let body = self.parse_arrow_body()?;
                return Ok(Some(Expr::Arrow { params, body }));
            }
            return Ok(None);
        }
        if self.is(&TokenKind::LParen) {
            self.advance();
            let params = match self.parse_params_until_rparen() {
                Ok(p) => p,
                Err(_) => {
                    self.pos = start;
                    return Ok(None);
                }
            };
            if !self.is(&TokenKind::RParen) {
                self.pos = start;
                return Ok(None);
            }
            self.advance();
            if !self.is(&TokenKind::Arrow) {
                self.pos = start;
                return Ok(None);
            }
            self.advance();
            let body = self.parse_arrow_body()?;
            return Ok(Some(Expr::Arrow { params, body }));
        }
        Ok(None)
    }

    fn parse_arrow_body(&mut self) -> RunResult<ArrowBody> {
        if self.is(&TokenKind::LBrace) {
            Ok(ArrowBody::Block(self.parse_block()?))
        } else {
            Ok(ArrowBody::Expr(Box::new(self.parse_assignment()?)))
        }
    }

    fn parse_nullish(&mut self) -> RunResult<Expr> {
        let mut left = self.parse_or()?;
        while self.is(&TokenKind::Nullish) {
            self.advance();
            let right = self.parse_or()?;
            left = Expr::Logical {
                op: LogicalOp::Nullish,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> RunResult<Expr> {
        let mut left = self.parse_and()?;
        while self.is(&TokenKind::OrOr) {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> RunResult<Expr> {
        let mut left = self.parse_equality()?;
        while self.is(&TokenKind::AndAnd) {
            self.advance();
            let right = self.parse_equality()?;
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> RunResult<Expr> {
        let mut left = self.parse_relational()?;
        loop {
            let loc = self.peek_loc();
            let op = match self.peek_kind() {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::NotEq => BinOp::NotEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                loc,
            };
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> RunResult<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let loc = self.peek_loc();
            let op = match self.peek_kind() {
                TokenKind::Lt => BinOp::Lt,
                TokenKind::LtEq => BinOp::LtEq,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::GtEq => BinOp::GtEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                loc,
            };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> RunResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let loc = self.peek_loc();
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                loc,
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> RunResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let loc = self.peek_loc();
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                loc,
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> RunResult<Expr> {
        let loc = self.peek_loc();
        match self.peek_kind() {
            TokenKind::Minus => {
                self.advance();
                let expr = Box::new(self.parse_unary()?);
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    expr,
                    loc,
                })
            }
            TokenKind::Bang => {
                self.advance();
                let expr = Box::new(self.parse_unary()?);
                Ok(Expr::Unary {
                    op: UnaryOp::Not,
                    expr,
                    loc,
                })
            }
            _ => self.parse_member_chain(),
        }
    }

    fn parse_member_chain(&mut self) -> RunResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            let loc = self.peek_loc();
            match self.peek_kind() {
                TokenKind::Dot => {
                    self.advance();
                    let prop = self.expect_identifier_name()?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        prop,
                        optional: false,
                        loc,
                    };
                }
                TokenKind::QuestionDot => {
                    self.advance();
                    let prop = self.expect_identifier_name()?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        prop,
                        optional: true,
                        loc,
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(TokenKind::RBracket)?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                        optional: false,
                        loc,
                    };
                }
                TokenKind::QuestionDotBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(TokenKind::RBracket)?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                        optional: true,
                        loc,
                    };
                }
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_args_until_rparen()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        optional: false,
                        loc,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> RunResult<Expr> {
        let loc = self.peek_loc();
        match self.peek_kind().clone() {
            TokenKind::Number(lit) => {
                self.advance();
                Ok(Expr::Number(literal_to_number(&lit)))
            }
            TokenKind::StringLit(raw) => {
                self.advance();
                self.parse_interpolated_string(&raw, loc)
            }
            TokenKind::RawStringLit(raw) => {
                self.advance();
                Ok(Expr::Str(raw))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Bool(false))
            }
            TokenKind::Nil => {
                self.advance();
                Ok(Expr::Nil)
            }
            TokenKind::This => {
                self.advance();
                Ok(Expr::This)
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Expr::Ident(name))
            }
            TokenKind::Fn => self.parse_fn_expr(),
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_object_literal(),
            other => Err(self.error(format!("unexpected token {other:?}"))),
        }
    }

    fn parse_fn_expr(&mut self) -> RunResult<Expr> {
        self.expect(TokenKind::Fn)?;
        let name = if matches!(self.peek_kind(), TokenKind::Identifier(_)) {
            Some(self.expect_identifier_name()?)
        } else {
            None
        };
        self.expect(TokenKind::LParen)?;
        let params = self.parse_params_until_rparen()?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_block()?;
        Ok(Expr::FnExpr { name, params, body })
    }

    fn parse_array_literal(&mut self) -> RunResult<Expr> {
        self.expect(TokenKind::LBracket)?;
        let mut items = Vec::new();
        while !self.is(&TokenKind::RBracket) {
            if self.is(&TokenKind::Comma) {
                // elision: a hole in the literal evaluates to nil
                items.push(Expr::Nil);
                self.advance();
                continue;
            }
            items.push(self.parse_ternary()?);
            if self.is(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RBracket)?;
        Ok(Expr::Array(items))
    }

    fn parse_object_literal(&mut self) -> RunResult<Expr> {
        self.expect(TokenKind::LBrace)?;
        let mut entries = Vec::new();
        while !self.is(&TokenKind::RBrace) {
            let key = if self.is(&TokenKind::LBracket) {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RBracket)?;
                ObjectKey::Computed(Box::new(expr))
            } else {
                ObjectKey::Ident(self.expect_identifier_name()?)
            };
            self.expect(TokenKind::Colon)?;
            let value = self.parse_ternary()?;
            entries.push((key, value));
            if self.is(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Expr::Object(entries))
    }

    /// Re-scans a literal string's `${...}` markers into a left-associated
    /// `+` chain (spec §4.D). Literal segments go through `decode_escapes`;
    /// expression segments are sub-lexed and parsed as full expressions.
    fn parse_interpolated_string(&mut self, raw: &str, loc: CodeLoc) -> RunResult<Expr> {
        let segments = split_interpolation(raw, loc, &self.file)?;
        let mut result: Option<Expr> = None;
        for segment in segments {
            let piece = match segment {
                Segment::Literal(text) => Expr::Str(decode_escapes(&text)?),
                Segment::Expr(src) => {
                    let tokens = Lexer::new(&src, &self.file).tokenize()?;
                    let mut sub = Parser {
                        tokens,
                        pos: 0,
                        file: self.file.clone(),
                    };
                    let expr = sub.parse_expr()?;
                    if !sub.is(&TokenKind::Eof) {
                        return Err(RunError::parse("invalid interpolation expression", loc, self.file.clone()));
                    }
                    expr
                }
            };
            result = Some(match result {
                None => piece,
                Some(acc) => Expr::Binary {
                    op: BinOp::Add,
                    left: Box::new(acc),
                    right: Box::new(piece),
                    loc,
                },
            });
        }
        Ok(result.unwrap_or(Expr::Str(String::new())))
    }
}

fn literal_to_number(lit: &NumberLiteral) -> Number {
    match lit {
        NumberLiteral::Int(i) => Number::Int(*i),
        NumberLiteral::BigInt(b) => Number::BigInt(b.clone()).normalize(),
        NumberLiteral::Float(f) => Number::Float(*f),
    }
}

enum Segment {
    Literal(String),
    Expr(String),
}

/// Bracket-matched scan of `${...}` markers, respecting nested `"`-strings
/// with backslash-escapes inside the interpolated region (spec §4.D).
fn split_interpolation(raw: &str, loc: CodeLoc, file: &str) -> RunResult<Vec<Segment>> {
    let chars: Vec<char> = raw.chars().collect();
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '$' && chars.get(i + 1) == Some(&'{') {
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            i += 2;
            let mut depth = 1i32;
            let mut inner = String::new();
            while depth > 0 {
                match chars.get(i) {
                    None => return Err(RunError::parse("unterminated interpolation", loc, file.to_owned())),
                    Some('{') => {
                        depth += 1;
                        inner.push('{');
                        i += 1;
                    }
                    Some('}') => {
                        depth -= 1;
                        if depth > 0 {
                            inner.push('}');
                        }
                        i += 1;
                    }
                    Some('"') => {
                        inner.push('"');
                        i += 1;
                        while chars.get(i).is_some_and(|c| *c != '"') {
                            if chars[i] == '\\' && i + 1 < chars.len() {
                                inner.push(chars[i]);
                                inner.push(chars[i + 1]);
                                i += 2;
                            } else {
                                inner.push(chars[i]);
                                i += 1;
                            }
                        }
                        if chars.get(i).is_some() {
                            inner.push('"');
                            i += 1;
                        }
                    }
                    Some(c) => {
                        inner.push(*c);
                        i += 1;
                    }
                }
            }
            segments.push(Segment::Expr(inner));
        } else if chars[i] == '\\' && i + 1 < chars.len() {
            literal.push(chars[i]);
            literal.push(chars[i + 1]);
            i += 2;
        } else {
            literal.push(chars[i]);
            i += 1;
        }
    }
    if !literal.is_empty() || segments.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one_expr(src: &str) -> Expr {
        let program = parse(&format!("{src};"), "test").unwrap();
        match program.into_iter().next().unwrap() {
            Stmt::Expr(e) => e,
            other => panic!("expected expr statement, got {other:?}"),
        }
    }

    #[test]
    fn parses_arithmetic_precedence() {
        let expr = parse_one_expr("1 + 2 * 3");
        match expr {
            Expr::Binary {
                op: BinOp::Add, right, ..
            } => assert!(matches!(*right, Expr::Binary { op: BinOp::Mul, .. })),
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn parses_ternary_and_nullish() {
        let expr = parse_one_expr("a ?? b ? c : d");
        assert!(matches!(expr, Expr::Ternary { .. }));
    }

    #[test]
    fn parses_arrow_single_ident() {
        let expr = parse_one_expr("x => x + 1");
        assert!(matches!(expr, Expr::Arrow { .. }));
    }

    #[test]
    fn parses_arrow_paren_params() {
        let expr = parse_one_expr("(a, b = 1) => a + b");
        match expr {
            Expr::Arrow { params, .. } => assert_eq!(params.normal.len(), 2),
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn rewinds_grouping_expression_on_failed_arrow_speculation() {
        let expr = parse_one_expr("(1 + 2) * 3");
        assert!(matches!(expr, Expr::Binary { op: BinOp::Mul, .. }));
    }

    #[test]
    fn parses_optional_chaining() {
        let expr = parse_one_expr("a?.b?.[0]");
        assert!(matches!(expr, Expr::Index { optional: true, .. }));
    }

    #[test]
    fn parses_named_call_arguments() {
        let expr = parse_one_expr("f(x: 1, 2)");
        match expr {
            Expr::Call { args, .. } => {
                assert_eq!(args[0].name.as_deref(), Some("x"));
                assert_eq!(args[1].name, None);
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn parses_array_destructuring_declaration() {
        let program = parse("let [a, b = 2, ...r] = [1, , 3, 4];", "test").unwrap();
        match &program[0] {
            Stmt::VarDecl { declarators, .. } => match &declarators[0].pattern {
                Pattern::Array { elements, rest } => {
                    assert_eq!(elements.len(), 2);
                    assert!(rest.is_some());
                }
                other => panic!("unexpected pattern: {other:?}"),
            },
            other => panic!("unexpected stmt: {other:?}"),
        }
    }

    #[test]
    fn disambiguates_destructuring_assign_statement_from_block() {
        let program = parse("{ a, b } = obj;", "test").unwrap();
        assert!(matches!(program[0], Stmt::DestructuringAssignStmt { .. }));
        let program = parse("{ let x = 1; }", "test").unwrap();
        assert!(matches!(program[0], Stmt::Block(_)));
    }

    #[test]
    fn classifies_classic_vs_each_for() {
        let program = parse("for (let i = 0; i < 1; i += 1) {}", "test").unwrap();
        assert!(matches!(program[0], Stmt::ForClassic { .. }));
        let program = parse("for (let x of xs) {}", "test").unwrap();
        assert!(matches!(program[0], Stmt::ForEach { .. }));
    }

    #[test]
    fn parses_string_interpolation_into_add_chain() {
        let expr = parse_one_expr(r#""hi ${1+1}!""#);
        assert!(matches!(expr, Expr::Binary { op: BinOp::Add, .. }));
    }

    #[test]
    fn raw_string_skips_interpolation() {
        let expr = parse_one_expr(r#""""hi ${x}""""#);
        assert!(matches!(expr, Expr::Str(_)));
    }
}
