//! Error kinds and propagation plumbing (spec §7).

use std::fmt;

use strum::{Display, IntoStaticStr};

use crate::token::CodeLoc;
use crate::value::Value;

/// Result type alias for operations that can produce a runtime error.
pub type RunResult<T> = Result<T, RunError>;

/// The family an error belongs to, matching spec §7's four error kinds.
/// `UserThrow` carries no message of its own — the thrown value is kept in
/// `RunError::thrown` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum ExcKind {
    LexError,
    ParseError,
    RuntimeError,
    UserThrow,
}

/// A single entry in the call-stack trail attached to a `RunError`, mirroring
/// spec §4.E's "stack of call frames (function_name, call-site span)".
#[derive(Debug, Clone, PartialEq)]
pub struct StackFrame {
    pub function_name: String,
    pub at: CodeLoc,
    pub file: String,
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at function {} ({}:{})", self.function_name, self.file, self.at)
    }
}

/// A compile-time or run-time error, carrying the nearest source span and,
/// for runtime errors encountered inside a call, the active call-frame
/// stack (spec §4.E "Error propagation and attachment").
#[derive(Debug, Clone, PartialEq)]
pub struct RunError {
    pub kind: ExcKind,
    pub message: String,
    pub at: Option<CodeLoc>,
    pub file: String,
    pub stack: Vec<StackFrame>,
    /// Set only for `ExcKind::UserThrow`: the value passed to `throw`.
    pub thrown: Option<Value>,
}

impl RunError {
    pub fn lex(message: String, at: CodeLoc, file: String) -> Self {
        Self {
            kind: ExcKind::LexError,
            message,
            at: Some(at),
            file,
            stack: Vec::new(),
            thrown: None,
        }
    }

    pub fn simple_lex(message: impl Into<String>) -> Self {
        Self {
            kind: ExcKind::LexError,
            message: message.into(),
            at: None,
            file: String::new(),
            stack: Vec::new(),
            thrown: None,
        }
    }

    pub fn parse(message: impl Into<String>, at: CodeLoc, file: impl Into<String>) -> Self {
        Self {
            kind: ExcKind::ParseError,
            message: message.into(),
            at: Some(at),
            file: file.into(),
            stack: Vec::new(),
            thrown: None,
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self {
            kind: ExcKind::RuntimeError,
            message: message.into(),
            at: None,
            file: String::new(),
            stack: Vec::new(),
            thrown: None,
        }
    }

    pub fn user_throw(value: Value) -> Self {
        Self {
            kind: ExcKind::UserThrow,
            message: String::new(),
            at: None,
            file: String::new(),
            stack: Vec::new(),
            thrown: Some(value),
        }
    }

    /// Attaches a source location if one isn't already recorded — the
    /// *nearest* span wins, matching spec's "captures the nearest span".
    pub fn with_loc(mut self, at: CodeLoc, file: &str) -> Self {
        if self.at.is_none() {
            self.at = Some(at);
            self.file = file.to_owned();
        }
        self
    }

    pub fn push_frame(mut self, frame: StackFrame) -> Self {
        self.stack.push(frame);
        self
    }

    /// Builds the `{ name:"RuntimeError", message, at, stack }` error object
    /// spec §4.E/§6 says `catch` binds for non-`throw` runtime errors.
    pub fn to_error_object(&self) -> Value {
        use indexmap::IndexMap;
        let mut map = IndexMap::new();
        map.insert("name".to_owned(), Value::from("RuntimeError"));
        map.insert("message".to_owned(), Value::from(self.message.clone()));
        let at = match self.at {
            Some(loc) => format!("{}:{}", self.file, loc),
            None => String::new(),
        };
        map.insert("at".to_owned(), Value::from(at));
        let stack: Vec<Value> = self.stack.iter().map(|f| Value::from(f.to_string())).collect();
        map.insert("stack".to_owned(), Value::array(stack));
        Value::object(map)
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.at {
            Some(loc) => write!(f, "{}: {} ({}:{})", self.kind, self.message, self.file, loc)?,
            None => write!(f, "{}: {}", self.kind, self.message)?,
        }
        for frame in &self.stack {
            write!(f, "\n  {frame}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RunError {}
