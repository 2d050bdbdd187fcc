//! Stack-based executor for chunks.
//!
//! Reads the chunk, never mutates it. Decoding problems, dangling constant
//! indices and stack misuse are caught here, at dispatch time.

#[cfg(feature = "serde")]
use serde::Deserialize;
use thiserror::Error;

use super::{
    chunk::Chunk,
    helpers::{decode_at, DecodeError, Instruction},
    opcode::OpCode,
    value::Value,
};

/// Default value stack depth.
pub const DEFAULT_STACK_MAX: usize = 256;

/// Executor settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default, deny_unknown_fields))]
pub struct VmConfig {
    /// Maximum number of values on the stack.
    pub stack_max: usize,
    /// Emit a `trace` event (stack + instruction) before each dispatch.
    pub trace: bool,
}

impl Default for VmConfig {
    fn default() -> Self { Self { stack_max: DEFAULT_STACK_MAX, trace: false } }
}

/// Failure while running a chunk. Every variant carries the source line of
/// the faulty instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// The code is not a well-formed instruction sequence.
    #[error("[line {line}] {source}")]
    Decode {
        /// Line of the faulty byte.
        line: u32,
        /// Underlying decoding error.
        source: DecodeError,
    },
    /// `OP_CONSTANT` refers past the end of the pool.
    #[error("[line {line}] constant {index} out of range (pool holds {len})")]
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
    /// Not enough operands on the stack.
    #[error("[line {line}] stack underflow in {op}")]
    StackUnderflow {
        /// Offset of the instruction.
        offset: usize,
        /// Line of the instruction.
        line: u32,
        /// Instruction that popped.
        op: OpCode,
    },
    /// Push past [`VmConfig::stack_max`].
    #[error("[line {line}] stack overflow (max {max})")]
    StackOverflow {
        /// Offset of the instruction.
        offset: usize,
        /// Line of the instruction.
        line: u32,
        /// Configured depth.
        max: usize,
    },
}

impl RuntimeError {
    /// Source line of the faulty instruction.
    #[must_use]
    pub const fn line(&self) -> u32 {
        match self {
            Self::Decode { line, .. }
            | Self::ConstantOutOfRange { line, .. }
            | Self::StackUnderflow { line, .. }
            | Self::StackOverflow { line, .. } => *line,
        }
    }
}

/// Value-stack machine.
#[derive(Debug, Clone, Default)]
pub struct Vm {
    config: VmConfig,
    stack: Vec<Value>,
}

impl Vm {
    /// Builds an executor with an empty stack.
    #[must_use]
    pub const fn new(config: VmConfig) -> Self { Self { config, stack: Vec::new() } }

    /// Active settings.
    #[must_use]
    pub const fn config(&self) -> &VmConfig { &self.config }

    /// Stack left by the last run (bottom first).
    #[must_use]
    pub fn stack(&self) -> &[Value] { &self.stack }

    /// Runs `chunk` from offset 0.
    ///
    /// Returns the value popped by `OP_RETURN` (`None` if the stack was
    /// empty), or `None` when execution runs off the end of the code.
    ///
    /// # Errors
    /// [`RuntimeError`] on the first malformed instruction, dangling
    /// constant index, stack underflow or overflow.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, fields(bytes = chunk.len())))]
    pub fn interpret(&mut self, chunk: &Chunk) -> Result<Option<Value>, RuntimeError> {
        self.stack.clear();
        let mut ip = 0;
        while let Some(item) = decode_at(chunk, ip) {
            let ins = item.map_err(|source| RuntimeError::Decode {
                line: chunk.line(source.offset()).unwrap_or_default(),
                source,
            })?;
            if self.config.trace {
                self.trace(chunk, ip);
            }
            ip = ins.next_offset();

            match ins.op {
                OpCode::Constant => {
                    let index = usize::from(ins.operand.unwrap_or_default());
                    let value = chunk.constant(index).ok_or(RuntimeError::ConstantOutOfRange {
                        offset: ins.offset,
                        line: ins.line,
                        index,
                        len: chunk.constants().len(),
                    })?;
                    self.push(&ins, value)?;
                }
                OpCode::Return => return Ok(self.stack.pop()),
                OpCode::Add => self.binary(&ins, |a, b| a + b)?,
                OpCode::Subtract => self.binary(&ins, |a, b| a - b)?,
                OpCode::Multiply => self.binary(&ins, |a, b| a * b)?,
                OpCode::Divide => self.binary(&ins, |a, b| a / b)?,
                OpCode::Negate => {
                    let a = self.pop(&ins)?;
                    self.push(&ins, Value(-a.0))?;
                }
            }
        }
        Ok(None)
    }

    fn push(&mut self, ins: &Instruction, value: Value) -> Result<(), RuntimeError> {
        if self.stack.len() >= self.config.stack_max {
            return Err(RuntimeError::StackOverflow {
                offset: ins.offset,
                line: ins.line,
                max: self.config.stack_max,
            });
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self, ins: &Instruction) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow { offset: ins.offset, line: ins.line, op: ins.op })
    }

    fn binary(&mut self, ins: &Instruction, f: impl FnOnce(f64, f64) -> f64) -> Result<(), RuntimeError> {
        if self.stack.len() < 2 {
            return Err(RuntimeError::StackUnderflow { offset: ins.offset, line: ins.line, op: ins.op });
        }
        let b = self.pop(ins)?;
        let a = self.pop(ins)?;
        self.push(ins, Value(f(a.0, b.0)))
    }

    #[cfg(feature = "tracing")]
    fn trace(&self, chunk: &Chunk, offset: usize) {
        use core::fmt::Write;

        let mut stack = String::new();
        for v in &self.stack {
            let _ = write!(stack, "[ {v} ]");
        }
        let mut line = String::new();
        super::disasm::disassemble_instruction(chunk, offset, &mut line);
        tracing::trace!(stack = %stack, "{}", line.trim_end());
    }

    #[cfg(not(feature = "tracing"))]
    #[allow(clippy::unused_self)]
    fn trace(&self, _chunk: &Chunk, _offset: usize) {}
}
