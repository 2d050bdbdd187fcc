//! Workload builders shared by the loxvm benchmarks.

use loxvm_core::{Chunk, OpCode, Value};

/// Chunk summing `terms` constants, then returning the total.
///
/// Every constant gets its own pool slot; indices wrap at 256 so the
/// operand always fits in one byte.
#[must_use]
pub fn sum_chunk(terms: usize) -> Chunk {
    let mut chunk = Chunk::new();
    for i in (0..=u8::MAX).take(terms) {
        chunk.add_constant(Value(f64::from(i)));
    }
    for (i, index) in (0..terms).zip((0..=u8::MAX).cycle()) {
        let line = u32::try_from(i / 4 + 1).unwrap_or(u32::MAX);
        chunk.write(OpCode::Constant, line);
        chunk.write(index, line);
        if i > 0 {
            chunk.write(OpCode::Add, line);
        }
    }
    chunk.write(OpCode::Return, u32::MAX);
    chunk
}
