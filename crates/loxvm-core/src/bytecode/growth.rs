//! Capacity policy shared by the growable buffers of a chunk.
//!
//! Buffers track their own capacity instead of relying on whatever `Vec`
//! decides to allocate: the sequence `0 → 8 → 16 → 32 → …` is part of the
//! public contract (amortized O(1) append, at most O(log n) reallocations).

use core::alloc::Layout;

use thiserror::Error;

/// Capacity reserved on the first growth of an empty buffer.
pub const MIN_CAPACITY: usize = 8;

/// Next capacity for a buffer whose `capacity` is exhausted.
///
/// Anything below [`MIN_CAPACITY`] jumps straight to it, otherwise the
/// capacity doubles. Saturates at `usize::MAX`, which the allocation step
/// then rejects as [`GrowError::CapacityOverflow`].
#[must_use]
pub const fn grow_capacity(capacity: usize) -> usize {
    if capacity < MIN_CAPACITY {
        MIN_CAPACITY
    } else {
        capacity.saturating_mul(2)
    }
}

/// Failure while growing a backing buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GrowError {
    /// The requested element count does not fit in a valid allocation.
    #[error("capacity overflow: cannot hold {requested} elements")]
    CapacityOverflow {
        /// Capacity that was requested.
        requested: usize,
    },
    /// The allocator refused the request.
    #[error("allocation of {} bytes failed (capacity {requested})", .layout.size())]
    AllocFailed {
        /// Capacity that was requested.
        requested: usize,
        /// Layout handed to the allocator.
        layout: Layout,
    },
}

impl GrowError {
    /// Ends the process the way the standard collections do: panic on
    /// capacity overflow, global allocation-error handler otherwise.
    ///
    /// # Panics
    /// Always, for [`GrowError::CapacityOverflow`].
    pub fn fatal(self) -> ! {
        match self {
            Self::CapacityOverflow { .. } => panic!("{self}"),
            Self::AllocFailed { layout, .. } => std::alloc::handle_alloc_error(layout),
        }
    }
}

/// Makes room in `buf` for exactly `new_capacity` elements.
///
/// `buf` is left untouched on error.
pub(crate) fn reserve_total<T>(buf: &mut Vec<T>, new_capacity: usize) -> Result<(), GrowError> {
    let layout = Layout::array::<T>(new_capacity)
        .map_err(|_| GrowError::CapacityOverflow { requested: new_capacity })?;
    let additional = new_capacity.saturating_sub(buf.len());
    buf.try_reserve_exact(additional)
        .map_err(|_| GrowError::AllocFailed { requested: new_capacity, layout })
}
