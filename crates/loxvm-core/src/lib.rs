//! loxvm-core — storage and tooling for a small bytecode VM
//!
//! Provides:
//! - `ValueArray`, `Value`: append-only constant pool
//! - `Chunk`: code bytes + per-byte line table + embedded constants
//! - `OpCode`: closed instruction tag set
//! - Assembler (`asm`), disassembler (`disasm`), validator (`helpers`),
//!   executor (`runtime`)
//! - `CoreError` + alias `CoreResult<T>`
//!
//! Features:
//! - `serde` (default): derive on values, opcodes, decoded instructions, `VmConfig`
//! - `tracing` (default): growth / assembly / dispatch events

#![deny(missing_docs)]

/* ─────────────────────────── Public modules ─────────────────────────── */

/// Bytecode primitives (chunk, assembler, disassembler, helpers, runtime).
pub mod bytecode;

/// Shortcut to the textual disassembler.
pub use bytecode::disasm;
/// Shortcut to the assembler.
pub use bytecode::asm;
/// Shortcut to the validation helpers.
pub use bytecode::helpers;
/// Shortcut to the executor.
pub use bytecode::runtime;

pub use bytecode::{Chunk, GrowError, OpCode, Value, ValueArray};

/* ─────────────────────────── Errors ─────────────────────────── */

use thiserror::Error;

/// Common result alias.
pub type CoreResult<T> = core::result::Result<T, CoreError>;

/// Any error produced by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Buffer growth failed.
    #[error(transparent)]
    Grow(#[from] GrowError),
    /// Assembly source rejected.
    #[error(transparent)]
    Asm(#[from] asm::AsmError),
    /// Chunk failed structural validation.
    #[error(transparent)]
    Validation(#[from] helpers::ValidationError),
    /// Execution failed.
    #[error(transparent)]
    Runtime(#[from] runtime::RuntimeError),
}

/* ─────────────────────────── Prelude ─────────────────────────── */

/// Convenient glob import of the key types and functions.
pub mod prelude {
    pub use super::{
        asm::{assemble, AsmError},
        disasm::{disassemble_chunk, disassemble_compact, disassemble_instruction},
        helpers::{instructions, validate_chunk, Instruction, ValidationError},
        runtime::{RuntimeError, Vm, VmConfig},
        Chunk, CoreError, CoreResult, GrowError, OpCode, Value, ValueArray,
    };
}

/* ─────────────────────────── Tests ─────────────────────────── */
#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn errors_fold_into_core_error() {
        let err: CoreError = assemble("JUMP").unwrap_err().into();
        assert!(matches!(err, CoreError::Asm(AsmError::UnknownInstruction { .. })));
        assert_eq!(err.to_string(), "line 1: unknown instruction `JUMP`");
    }

    #[test]
    fn pipeline_through_core_result() -> CoreResult<()> {
        let chunk = assemble("CONSTANT 4\nCONSTANT 2\nMULTIPLY\nRETURN")?;
        validate_chunk(&chunk)?;
        let out = Vm::new(VmConfig::default()).interpret(&chunk)?;
        assert_eq!(out, Some(Value(8.0)));
        Ok(())
    }
}
