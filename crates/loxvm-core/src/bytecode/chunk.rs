//! Bytecode chunk: code bytes, per-byte line table and constant pool.

use core::ops::Range;

use super::{
    growth::{grow_capacity, reserve_total, GrowError},
    value::{Value, ValueArray},
};

/// Compiled unit handed from the compiler to the executor.
///
/// `code` and `lines` always have the same length: `lines[i]` is the source
/// line of `code[i]`. Both buffers grow together under one tracked capacity.
/// Nothing here validates opcodes or constant indices; that is the job of
/// whoever emits or runs the bytes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chunk {
    code: Vec<u8>,
    lines: Vec<u32>,
    capacity: usize,
    constants: ValueArray,
}

impl Chunk {
    /// Empty chunk; nothing is allocated until the first write.
    #[must_use]
    pub const fn new() -> Self {
        Self { code: Vec::new(), lines: Vec::new(), capacity: 0, constants: ValueArray::new() }
    }

    /// Appends one byte (opcode or raw operand) tagged with its source line.
    ///
    /// Allocation failure is fatal, see [`GrowError::fatal`].
    pub fn write(&mut self, byte: impl Into<u8>, line: u32) {
        if let Err(err) = self.try_write(byte, line) {
            err.fatal();
        }
    }

    /// Same as [`Chunk::write`] but reports growth failure.
    ///
    /// # Errors
    /// [`GrowError`] when the shared capacity cannot grow; the chunk is
    /// unchanged in that case.
    pub fn try_write(&mut self, byte: impl Into<u8>, line: u32) -> Result<(), GrowError> {
        if self.code.len() == self.capacity {
            let new_capacity = grow_capacity(self.capacity);
            reserve_total(&mut self.code, new_capacity)?;
            reserve_total(&mut self.lines, new_capacity)?;
            #[cfg(feature = "tracing")]
            tracing::trace!(old = self.capacity, new = new_capacity, "chunk grown");
            self.capacity = new_capacity;
        }
        self.code.push(byte.into());
        self.lines.push(line);
        Ok(())
    }

    /// Appends a constant and returns the index to encode as operand.
    pub fn add_constant(&mut self, value: Value) -> usize {
        self.constants.write(value);
        self.constants.len() - 1
    }

    /// Same as [`Chunk::add_constant`] but reports growth failure.
    ///
    /// # Errors
    /// [`GrowError`] from the constant pool.
    pub fn try_add_constant(&mut self, value: Value) -> Result<usize, GrowError> {
        self.constants.try_write(value)?;
        Ok(self.constants.len() - 1)
    }

    /// Releases code, lines and constants together.
    pub fn free(&mut self) {
        #[cfg(feature = "tracing")]
        tracing::debug!(bytes = self.code.len(), constants = self.constants.len(), "chunk freed");
        self.code = Vec::new();
        self.lines = Vec::new();
        self.capacity = 0;
        self.constants.free();
    }

    /// Number of code bytes (equals the number of line entries).
    #[must_use]
    pub fn len(&self) -> usize { self.code.len() }

    /// Whether no byte has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.code.is_empty() }

    /// Tracked capacity shared by the code and line buffers.
    #[must_use]
    pub const fn capacity(&self) -> usize { self.capacity }

    /// Raw code bytes.
    #[must_use]
    pub fn code(&self) -> &[u8] { &self.code }

    /// Line table, parallel to [`Chunk::code`].
    #[must_use]
    pub fn lines(&self) -> &[u32] { &self.lines }

    /// Byte at `offset`.
    #[must_use]
    pub fn byte(&self, offset: usize) -> Option<u8> { self.code.get(offset).copied() }

    /// Source line of the byte at `offset`.
    #[must_use]
    pub fn line(&self, offset: usize) -> Option<u32> { self.lines.get(offset).copied() }

    /// Constant pool.
    #[must_use]
    pub const fn constants(&self) -> &ValueArray { &self.constants }

    /// Constant at `index`.
    #[must_use]
    pub fn constant(&self, index: usize) -> Option<Value> { self.constants.get(index) }

    /// Iterates maximal spans of bytes sharing a line.
    #[must_use]
    pub fn line_runs(&self) -> LineRuns<'_> { LineRuns { lines: &self.lines, index: 0 } }
}

/// Iterator returned by [`Chunk::line_runs`], yielding `(start..end, line)`.
#[derive(Debug, Clone)]
pub struct LineRuns<'a> {
    lines: &'a [u32],
    index: usize,
}

impl Iterator for LineRuns<'_> {
    type Item = (Range<usize>, u32);

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.index;
        let line = *self.lines.get(start)?;
        let run = self.lines[start..].iter().take_while(|&&l| l == line).count();
        self.index = start + run;
        Some((start..self.index, line))
    }
}
