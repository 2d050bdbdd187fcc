//! Textual disassembly of a chunk.
//!
//! Listing format, one instruction per line:
//!
//! ```text
//! == demo ==
//! 0000    1 OP_CONSTANT         0 '1.2'
//! 0002    | OP_NEGATE
//! 0003    2 OP_RETURN
//! ```
//!
//! `|` marks a byte on the same source line as the previous one.

use core::fmt::Write;

use super::{
    chunk::Chunk,
    helpers::{decode_at, DecodeError},
    opcode::OpCode,
};

/// Full listing with a `== name ==` header.
#[must_use]
pub fn disassemble_chunk(chunk: &Chunk, name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {name} ==");
    let mut offset = 0;
    while offset < chunk.len() {
        offset = disassemble_instruction(chunk, offset, &mut out);
    }
    out
}

/// Writes the instruction at `offset` to `out` and returns the offset of
/// the next one.
///
/// Undecodable bytes are printed and skipped, so a listing always covers
/// the whole chunk.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    let _ = write!(out, "{offset:04} ");
    let line = chunk.line(offset).unwrap_or_default();
    if offset > 0 && chunk.line(offset - 1) == Some(line) {
        out.push_str("   | ");
    } else {
        let _ = write!(out, "{line:4} ");
    }

    match decode_at(chunk, offset) {
        None => {
            out.push_str("<end of chunk>\n");
            offset
        }
        Some(Ok(ins)) => {
            write_body(chunk, ins.op, ins.operand, out);
            ins.next_offset()
        }
        Some(Err(DecodeError::UnknownOpcode { byte, .. })) => {
            let _ = writeln!(out, "Unknown opcode {byte}");
            offset + 1
        }
        Some(Err(DecodeError::TruncatedOperand { op, .. })) => {
            let _ = writeln!(out, "{op} <truncated>");
            chunk.len()
        }
    }
}

/// One line per instruction, without line numbers.
#[must_use]
pub fn disassemble_compact(chunk: &Chunk) -> String {
    let mut out = String::new();
    let mut offset = 0;
    while let Some(item) = decode_at(chunk, offset) {
        let _ = write!(out, "{offset:04}: ");
        match item {
            Ok(ins) => {
                write_body(chunk, ins.op, ins.operand, &mut out);
                offset = ins.next_offset();
            }
            Err(DecodeError::UnknownOpcode { byte, .. }) => {
                let _ = writeln!(out, "Unknown opcode {byte}");
                offset += 1;
            }
            Err(DecodeError::TruncatedOperand { op, .. }) => {
                let _ = writeln!(out, "{op} <truncated>");
                break;
            }
        }
    }
    out
}

fn write_body(chunk: &Chunk, op: OpCode, operand: Option<u8>, out: &mut String) {
    match (op, operand) {
        (OpCode::Constant, Some(index)) => {
            let _ = write!(out, "{:<16} {index:4} ", op.mnemonic());
            match chunk.constant(usize::from(index)) {
                Some(value) => {
                    let _ = writeln!(out, "'{value}'");
                }
                None => out.push_str("<missing>\n"),
            }
        }
        (
            OpCode::Constant
            | OpCode::Return
            | OpCode::Add
            | OpCode::Subtract
            | OpCode::Multiply
            | OpCode::Divide
            | OpCode::Negate,
            _,
        ) => {
            let _ = writeln!(out, "{}", op.mnemonic());
        }
    }
}
