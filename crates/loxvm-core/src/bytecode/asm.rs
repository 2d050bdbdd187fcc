//! Tiny textual assembler, used by the CLI tools and tests to build chunks
//! without a full compiler.
//!
//! ```text
//! ; comments start with ';'
//! CONSTANT 1.2
//! CONSTANT 3.4
//! ADD
//! @7 NEGATE      ; '@n' overrides the recorded source line
//! RETURN
//! ```
//!
//! Every emitted byte is tagged with the line of the statement that produced
//! it. Mnemonics are case-insensitive and may carry an `OP_` prefix.

use thiserror::Error;

use super::{chunk::Chunk, opcode::OpCode, value::Value};

/// Largest constant index a one-byte operand can encode.
pub const MAX_CONSTANT_INDEX: usize = u8::MAX as usize;

/// Assembly failure, with the 1-based line of the offending statement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsmError {
    /// Mnemonic that names no opcode.
    #[error("line {line}: unknown instruction `{name}`")]
    UnknownInstruction {
        /// Statement line.
        line: usize,
        /// Mnemonic as written.
        name: String,
    },
    /// `CONSTANT` without a parsable number.
    #[error("line {line}: expected a number, found `{found}`")]
    InvalidNumber {
        /// Statement line.
        line: usize,
        /// Text found instead.
        found: String,
    },
    /// Extra tokens after an instruction.
    #[error("line {line}: unexpected `{found}` after {op}")]
    TrailingInput {
        /// Statement line.
        line: usize,
        /// Instruction that was complete.
        op: OpCode,
        /// First extra token.
        found: String,
    },
    /// `@` prefix without a valid line number.
    #[error("line {line}: invalid line override `{found}`")]
    InvalidLineOverride {
        /// Statement line.
        line: usize,
        /// Override as written.
        found: String,
    },
    /// Constant pool grew past what a one-byte operand can address.
    #[error("line {line}: too many constants in one chunk (max {})", MAX_CONSTANT_INDEX + 1)]
    TooManyConstants {
        /// Statement line.
        line: usize,
    },
}

/// Assembles `source` into a fresh [`Chunk`].
///
/// # Errors
/// The first [`AsmError`] in source order.
#[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all))]
pub fn assemble(source: &str) -> Result<Chunk, AsmError> {
    let mut chunk = Chunk::new();
    for (idx, raw) in source.lines().enumerate() {
        assemble_line(&mut chunk, idx + 1, raw)?;
    }
    #[cfg(feature = "tracing")]
    tracing::debug!(bytes = chunk.len(), constants = chunk.constants().len(), "assembled");
    Ok(chunk)
}

fn assemble_line(chunk: &mut Chunk, line_no: usize, raw: &str) -> Result<(), AsmError> {
    let stmt = raw.split_once(';').map_or(raw, |(code, _)| code);
    let mut tokens = stmt.split_whitespace().peekable();

    let mut src_line = u32::try_from(line_no).unwrap_or(u32::MAX);
    if let Some(tok) = tokens.peek().copied() {
        if let Some(n) = tok.strip_prefix('@') {
            src_line = n.parse().map_err(|_| AsmError::InvalidLineOverride {
                line: line_no,
                found: tok.to_owned(),
            })?;
            tokens.next();
        }
    }

    let Some(name) = tokens.next() else {
        return Ok(());
    };
    let bare = match name.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("OP_") => &name[3..],
        _ => name,
    };
    let op = OpCode::from_name(bare).ok_or_else(|| AsmError::UnknownInstruction {
        line: line_no,
        name: name.to_owned(),
    })?;

    match op {
        OpCode::Constant => {
            let text = tokens.next().unwrap_or_default();
            let number: f64 = text.parse().map_err(|_| AsmError::InvalidNumber {
                line: line_no,
                found: text.to_owned(),
            })?;
            if chunk.constants().len() > MAX_CONSTANT_INDEX {
                return Err(AsmError::TooManyConstants { line: line_no });
            }
            let index = chunk.add_constant(Value(number));
            chunk.write(op, src_line);
            chunk.write(u8::try_from(index).map_err(|_| AsmError::TooManyConstants { line: line_no })?, src_line);
        }
        OpCode::Return | OpCode::Add | OpCode::Subtract | OpCode::Multiply | OpCode::Divide | OpCode::Negate => {
            chunk.write(op, src_line);
        }
    }

    match tokens.next() {
        Some(extra) => Err(AsmError::TrailingInput { line: line_no, op, found: extra.to_owned() }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn assembles_with_source_lines() {
        let chunk = assemble("CONSTANT 1.5\n\n; comment\nconstant 2\nop_add ; sum\nRETURN\n").unwrap();
        assert_eq!(chunk.code(), &[0, 0, 0, 1, 2, 1]);
        assert_eq!(chunk.lines(), &[1, 1, 4, 4, 5, 6]);
        assert_eq!(chunk.constants().as_slice(), &[Value(1.5), Value(2.0)]);
    }

    #[test]
    fn line_override_applies_to_every_byte() {
        let chunk = assemble("@40 CONSTANT 1\n@41 NEGATE").unwrap();
        assert_eq!(chunk.lines(), &[40, 40, 41]);
    }

    #[test]
    fn empty_source_gives_empty_chunk() {
        assert_eq!(assemble("").unwrap(), Chunk::new());
        assert_eq!(assemble("  ; nothing\n").unwrap(), Chunk::new());
    }

    #[test]
    fn reports_bad_statements() {
        assert_eq!(
            assemble("RETURN\nPRINT").unwrap_err(),
            AsmError::UnknownInstruction { line: 2, name: "PRINT".into() }
        );
        assert_eq!(
            assemble("CONSTANT pi").unwrap_err(),
            AsmError::InvalidNumber { line: 1, found: "pi".into() }
        );
        assert_eq!(
            assemble("CONSTANT").unwrap_err(),
            AsmError::InvalidNumber { line: 1, found: String::new() }
        );
        assert_eq!(
            assemble("ADD 3").unwrap_err(),
            AsmError::TrailingInput { line: 1, op: OpCode::Add, found: "3".into() }
        );
        assert_eq!(
            assemble("@x RETURN").unwrap_err(),
            AsmError::InvalidLineOverride { line: 1, found: "@x".into() }
        );
    }

    #[test]
    fn constant_pool_is_capped_by_operand_width() {
        let src = "CONSTANT 0\n".repeat(MAX_CONSTANT_INDEX + 1);
        let chunk = assemble(&src).unwrap();
        assert_eq!(chunk.constants().len(), 256);
        assert_eq!(chunk.code()[chunk.len() - 1], 255);

        let err = assemble(&format!("{src}CONSTANT 1")).unwrap_err();
        assert_eq!(err, AsmError::TooManyConstants { line: 257 });
        assert_eq!(err.to_string(), "line 257: too many constants in one chunk (max 256)");
    }
}
