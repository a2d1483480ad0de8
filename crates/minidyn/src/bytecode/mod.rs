//! Bytecode compiler + stack VM (spec §4.F): compiles the supported subset
//! of function bodies to a compact opcode stream, falling back to the
//! tree-walker for anything wider.

pub mod chunk;
pub mod compiler;
pub mod opcode;
pub mod vm;

pub use chunk::Chunk;
pub use compiler::CompileBody;
