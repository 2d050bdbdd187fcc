//! Bytecode primitives: growable chunk, constant pool, opcode set, plus the
//! tooling built on top (assembler, disassembler, validator, executor).

/// Capacity policy shared by every growable buffer.
pub mod growth;
/// Values and the constant array.
pub mod value;
/// Instruction tags.
pub mod opcode;
/// Chunk: code, line table, constants.
pub mod chunk;
/// Decoding and structural validation.
pub mod helpers;
/// Textual listings.
pub mod disasm;
/// Minimal textual assembler.
pub mod asm;
/// Stack-based executor.
pub mod runtime;

pub use chunk::{Chunk, LineRuns};
pub use growth::{GrowError, MIN_CAPACITY};
pub use opcode::{OpCode, UnknownOpcode};
pub use value::{Value, ValueArray};
