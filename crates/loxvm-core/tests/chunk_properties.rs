//! Property tests for chunk storage: ordering, lockstep growth, constant
//! indices and reuse after `free`.

use loxvm_core::bytecode::{growth::grow_capacity, Chunk, Value, ValueArray, MIN_CAPACITY};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn expected_capacity(len: usize) -> usize {
    let mut cap = 0;
    while cap < len {
        cap = grow_capacity(cap);
    }
    cap
}

proptest! {
    #[test]
    fn writes_are_stored_in_call_order(writes in prop::collection::vec((any::<u8>(), any::<u32>()), 0..600)) {
        let mut chunk = Chunk::new();
        for &(byte, line) in &writes {
            chunk.write(byte, line);
        }
        prop_assert_eq!(chunk.len(), writes.len());
        prop_assert_eq!(chunk.code().len(), chunk.lines().len());
        for (offset, &(byte, line)) in writes.iter().enumerate() {
            prop_assert_eq!(chunk.byte(offset), Some(byte));
            prop_assert_eq!(chunk.line(offset), Some(line));
        }
        prop_assert_eq!(chunk.capacity(), expected_capacity(writes.len()));
    }

    #[test]
    fn kth_constant_gets_index_k(values in prop::collection::vec(-1e9f64..1e9, 0..400)) {
        let mut chunk = Chunk::new();
        for (k, &v) in values.iter().enumerate() {
            prop_assert_eq!(chunk.add_constant(Value(v)), k);
        }
        for (k, &v) in values.iter().enumerate() {
            prop_assert_eq!(chunk.constant(k), Some(Value(v)));
        }
        prop_assert!(chunk.is_empty());
    }

    #[test]
    fn growth_never_moves_earlier_elements(prefix in prop::collection::vec(any::<i32>(), 1..200), extra in any::<i32>()) {
        let mut arr = ValueArray::new();
        for &v in &prefix {
            arr.write(Value(f64::from(v)));
        }
        let before = arr.as_slice().to_vec();
        arr.write(Value(f64::from(extra)));
        prop_assert_eq!(&arr.as_slice()[..before.len()], before.as_slice());
        prop_assert_eq!(arr.get(prefix.len()), Some(Value(f64::from(extra))));
        prop_assert!(arr.len() <= arr.capacity());
    }

    #[test]
    fn runs_cover_every_offset(lines in prop::collection::vec(0u32..5, 0..100)) {
        let mut chunk = Chunk::new();
        for &line in &lines {
            chunk.write(0u8, line);
        }
        let mut next = 0;
        for (range, line) in chunk.line_runs() {
            prop_assert_eq!(range.start, next);
            prop_assert!(range.end > range.start);
            for offset in range.clone() {
                prop_assert_eq!(chunk.line(offset), Some(line));
            }
            if range.end < lines.len() {
                prop_assert_ne!(lines[range.end], line);
            }
            next = range.end;
        }
        prop_assert_eq!(next, lines.len());
    }
}

#[test]
fn freed_chunk_is_indistinguishable_from_new() {
    let mut chunk = Chunk::new();
    for i in 0..50u8 {
        chunk.write(i, u32::from(i));
        chunk.add_constant(Value(f64::from(i)));
    }
    chunk.free();
    assert_eq!(chunk, Chunk::new());
    assert_eq!(chunk.capacity(), 0);
    assert_eq!(chunk.constants().capacity(), 0);
    assert_eq!(chunk.byte(0), None);
    assert_eq!(chunk.constant(0), None);

    chunk.free();
    assert_eq!(chunk, Chunk::new());

    chunk.write(1u8, 1);
    assert_eq!(chunk.capacity(), MIN_CAPACITY);
    assert_eq!(chunk.add_constant(Value(2.0)), 0);
}

#[test]
fn try_variants_succeed_on_normal_sizes() {
    let mut chunk = Chunk::new();
    chunk.try_write(0u8, 1).unwrap();
    assert_eq!(chunk.try_add_constant(Value(1.0)).unwrap(), 0);
    let mut arr = ValueArray::default();
    arr.try_write(Value(0.5)).unwrap();
    assert_eq!(arr.len(), 1);
}
