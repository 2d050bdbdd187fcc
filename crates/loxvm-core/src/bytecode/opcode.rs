//! Closed set of instruction tags.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Operation encoded by the first byte of an instruction.
///
/// Discriminants are the on-chunk encoding and never change order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum OpCode {
    /// Push the constant whose index is the following byte.
    Constant = 0,
    /// Leave the current chunk.
    Return = 1,
    /// `a + b`.
    Add = 2,
    /// `a - b`.
    Subtract = 3,
    /// `a * b`.
    Multiply = 4,
    /// `a / b`.
    Divide = 5,
    /// `-a`.
    Negate = 6,
}

/// Byte that does not name any [`OpCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown opcode {0}")]
pub struct UnknownOpcode(pub u8);

impl OpCode {
    /// Every opcode, in discriminant order.
    pub const ALL: [Self; 7] = [
        Self::Constant,
        Self::Return,
        Self::Add,
        Self::Subtract,
        Self::Multiply,
        Self::Divide,
        Self::Negate,
    ];

    /// Number of operand bytes following the opcode.
    #[must_use]
    pub const fn operand_len(self) -> usize {
        match self {
            Self::Constant => 1,
            Self::Return | Self::Add | Self::Subtract | Self::Multiply | Self::Divide | Self::Negate => 0,
        }
    }

    /// Name used by listings.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Constant => "OP_CONSTANT",
            Self::Return => "OP_RETURN",
            Self::Add => "OP_ADD",
            Self::Subtract => "OP_SUBTRACT",
            Self::Multiply => "OP_MULTIPLY",
            Self::Divide => "OP_DIVIDE",
            Self::Negate => "OP_NEGATE",
        }
    }

    /// Looks an opcode up by its bare name (`"ADD"`, `"constant"`, …).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.mnemonic()[3..].eq_ignore_ascii_case(name))
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> Self { op as u8 }
}

impl TryFrom<u8> for OpCode {
    type Error = UnknownOpcode;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Self::ALL.get(usize::from(byte)).copied().ok_or(UnknownOpcode(byte))
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.mnemonic()) }
}
