//! MiniDyn: a dynamically-typed, expression-oriented scripting language.
//!
//! The crate is organized the way a small language implementation usually
//! is: [`lexer`] and [`parser`] turn source text into an [`ast::Program`],
//! [`interpreter`] walks that tree directly, while [`bytecode`] offers an
//! alternate compile-and-run path for the subset of the language it
//! supports. Both engines share [`value`], [`env`], and [`ops`] so they
//! agree on semantics. [`builtins`] installs the standard library into a
//! fresh [`env::Environment`], and [`module`] resolves `require(...)` calls
//! against the filesystem.

pub mod ast;
pub mod bytecode;
pub mod builtins;
pub mod env;
pub mod exception;
pub mod function;
pub mod interpreter;
pub mod lexer;
pub mod module;
pub mod number;
pub mod ops;
pub mod parser;
pub mod token;
pub mod value;

pub use exception::{RunError, RunResult};
pub use interpreter::Interpreter;
pub use module::FsModuleLoader;
pub use value::Value;

/// Parses and runs a complete program in a fresh interpreter rooted at
/// `file`'s directory for `require` resolution. Convenience entry point for
/// the CLI and for embedding; nothing here a caller couldn't assemble from
/// [`parser::parse`] and [`Interpreter`] directly.
pub fn run_source(source: &str, file: &str) -> RunResult<Value> {
    let program = parser::parse(source, file)?;
    let mut interp = Interpreter::new(Box::new(FsModuleLoader));
    interp.run_program(&program, file)
}
