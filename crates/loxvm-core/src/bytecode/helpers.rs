//! Instruction decoding and structural validation reused by tooling and the
//! executor.
//!
//! The chunk itself accepts any byte; these helpers are where a byte stream
//! is checked against the instruction format.

#[cfg(feature = "serde")]
use serde::Serialize;
use thiserror::Error;

use super::{chunk::Chunk, opcode::OpCode};

/// One decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Instruction {
    /// Offset of the opcode byte.
    pub offset: usize,
    /// Source line of the opcode byte.
    pub line: u32,
    /// Decoded tag.
    pub op: OpCode,
    /// Operand byte, for opcodes that take one.
    pub operand: Option<u8>,
}

impl Instruction {
    /// Encoded size in bytes.
    #[must_use]
    pub const fn size(&self) -> usize { 1 + self.op.operand_len() }

    /// Offset of the following instruction.
    #[must_use]
    pub const fn next_offset(&self) -> usize { self.offset + self.size() }
}

/// Byte stream that does not follow the instruction format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Byte at an instruction boundary that names no opcode.
    #[error("unknown opcode {byte} at offset {offset}")]
    UnknownOpcode {
        /// Offending offset.
        offset: usize,
        /// Raw byte.
        byte: u8,
    },
    /// Opcode whose operand bytes run past the end of the code.
    #[error("{op} at offset {offset} is missing its operand")]
    TruncatedOperand {
        /// Offset of the opcode.
        offset: usize,
        /// Opcode missing its operand.
        op: OpCode,
    },
}

impl DecodeError {
    /// Offset of the faulty instruction.
    #[must_use]
    pub const fn offset(&self) -> usize {
        match self {
            Self::UnknownOpcode { offset, .. } | Self::TruncatedOperand { offset, .. } => *offset,
        }
    }
}

/// Problem found by [`validate_chunk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The code is not a well-formed instruction sequence.
    #[error("line {line}: {source}")]
    Decode {
        /// Line of the faulty byte.
        line: u32,
        /// Underlying decoding error.
        source: DecodeError,
    },
    /// An operand refers past the end of the constant pool.
    #[error("line {line}: constant {index} at offset {offset} is out of range (pool holds {len})")]
    ConstantOutOfRange {
        /// Offset of the instruction.
        offset: usize,
        /// Line of the instruction.
        line: u32,
        /// Encoded index.
        index: usize,
        /// Pool size.
        len: usize,
    },
}

/// Decodes the instruction starting at `offset`.
///
/// Returns `None` once `offset` is at or past the end of the code.
#[must_use]
pub fn decode_at(chunk: &Chunk, offset: usize) -> Option<Result<Instruction, DecodeError>> {
    let byte = chunk.byte(offset)?;
    let line = chunk.line(offset).unwrap_or_default();
    let Ok(op) = OpCode::try_from(byte) else {
        return Some(Err(DecodeError::UnknownOpcode { offset, byte }));
    };
    let operand = match op.operand_len() {
        0 => None,
        _ => match chunk.byte(offset + 1) {
            Some(b) => Some(b),
            None => return Some(Err(DecodeError::TruncatedOperand { offset, op })),
        },
    };
    Some(Ok(Instruction { offset, line, op, operand }))
}

/// Iterates instructions from offset 0.
///
/// Stops after the first decoding error.
#[must_use]
pub fn instructions(chunk: &Chunk) -> Instructions<'_> {
    Instructions { chunk, offset: 0, failed: false }
}

/// Iterator returned by [`instructions`].
#[derive(Debug, Clone)]
pub struct Instructions<'a> {
    chunk: &'a Chunk,
    offset: usize,
    failed: bool,
}

impl Iterator for Instructions<'_> {
    type Item = Result<Instruction, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = decode_at(self.chunk, self.offset)?;
        match &item {
            Ok(ins) => self.offset = ins.next_offset(),
            Err(_) => self.failed = true,
        }
        Some(item)
    }
}

/// Start offsets of every decodable instruction.
#[must_use]
pub fn instruction_offsets(chunk: &Chunk) -> Vec<usize> {
    instructions(chunk).map_while(Result::ok).map(|ins| ins.offset).collect()
}

/// Checks that the code decodes cleanly and that every constant operand
/// points inside the pool.
///
/// # Errors
/// The first [`ValidationError`] met in code order.
pub fn validate_chunk(chunk: &Chunk) -> Result<(), ValidationError> {
    let len = chunk.constants().len();
    for item in instructions(chunk) {
        let ins = item.map_err(|source| ValidationError::Decode {
            line: chunk.line(source.offset()).unwrap_or_default(),
            source,
        })?;
        if let (OpCode::Constant, Some(operand)) = (ins.op, ins.operand) {
            let index = usize::from(operand);
            if index >= len {
                return Err(ValidationError::ConstantOutOfRange {
                    offset: ins.offset,
                    line: ins.line,
                    index,
                    len,
                });
            }
        }
    }
    Ok(())
}
