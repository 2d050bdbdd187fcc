//! Runtime values and the append-only constant array.

use core::{fmt, ops::Index, slice};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::growth::{grow_capacity, reserve_total, GrowError};

/// Scalar manipulated by the VM.
///
/// Opaque to the storage layer: chunks copy it around and hand it back by
/// index, only the executor looks inside.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct Value(pub f64);

impl Value {
    /// Underlying number.
    #[must_use]
    pub const fn as_f64(self) -> f64 { self.0 }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self { Self(v) }
}

impl From<Value> for f64 {
    fn from(v: Value) -> Self { v.0 }
}

/// Significant digits shown by [`Value`]'s `Display`.
const DISPLAY_DIGITS: usize = 6;

impl fmt::Display for Value {
    /// `%g` rendering: 6 significant digits, trailing zeros dropped,
    /// exponent form below `1e-4` or from `1e6` on.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        if v.is_nan() {
            return f.write_str("nan");
        }
        if v.is_infinite() {
            return f.write_str(if v < 0.0 { "-inf" } else { "inf" });
        }
        // Rounding to the shown precision first fixes the exponent
        // (`999999.7` becomes `1e+06`).
        let sci = format!("{v:.prec$e}", prec = DISPLAY_DIGITS - 1);
        let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
        let exp: i32 = exp.parse().unwrap_or_default();
        match usize::try_from(exp) {
            Ok(e) if e < DISPLAY_DIGITS => {
                f.write_str(trim_fraction(&format!("{v:.prec$}", prec = DISPLAY_DIGITS - 1 - e)))
            }
            Err(_) if exp >= -4 => {
                let prec = DISPLAY_DIGITS - 1 + usize::try_from(-exp).unwrap_or_default();
                f.write_str(trim_fraction(&format!("{v:.prec$}")))
            }
            _ => {
                let sign = if exp < 0 { '-' } else { '+' };
                write!(f, "{}e{sign}{:02}", trim_fraction(mantissa), exp.unsigned_abs())
            }
        }
    }
}

fn trim_fraction(digits: &str) -> &str {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}

/// Append-only sequence of constants with stable 0-based indices.
///
/// Capacity is tracked explicitly and follows
/// [`grow_capacity`](super::growth::grow_capacity).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueArray {
    values: Vec<Value>,
    capacity: usize,
}

impl ValueArray {
    /// Empty array; nothing is allocated until the first write.
    #[must_use]
    pub const fn new() -> Self { Self { values: Vec::new(), capacity: 0 } }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize { self.values.len() }

    /// Whether the array holds no value.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    /// Tracked capacity (0 until the first write).
    #[must_use]
    pub const fn capacity(&self) -> usize { self.capacity }

    /// Appends `value`, growing the backing storage when full.
    ///
    /// Allocation failure is fatal, see [`GrowError::fatal`].
    pub fn write(&mut self, value: Value) {
        if let Err(err) = self.try_write(value) {
            err.fatal();
        }
    }

    /// Appends `value`, reporting a growth failure instead of aborting.
    ///
    /// # Errors
    /// [`GrowError`] when the new capacity cannot be allocated; the array is
    /// unchanged in that case.
    pub fn try_write(&mut self, value: Value) -> Result<(), GrowError> {
        if self.values.len() == self.capacity {
            let new_capacity = grow_capacity(self.capacity);
            reserve_total(&mut self.values, new_capacity)?;
            #[cfg(feature = "tracing")]
            tracing::trace!(old = self.capacity, new = new_capacity, "value array grown");
            self.capacity = new_capacity;
        }
        self.values.push(value);
        Ok(())
    }

    /// Value stored at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Value> { self.values.get(index).copied() }

    /// Contiguous view in insertion order.
    #[must_use]
    pub fn as_slice(&self) -> &[Value] { &self.values }

    /// Iterates values in insertion order.
    #[must_use]
    pub fn iter(&self) -> slice::Iter<'_, Value> { self.values.iter() }

    /// Releases the backing storage and returns to the empty state.
    pub fn free(&mut self) {
        self.values = Vec::new();
        self.capacity = 0;
    }
}

impl Index<usize> for ValueArray {
    type Output = Value;

    fn index(&self, index: usize) -> &Value { &self.values[index] }
}

impl<'a> IntoIterator for &'a ValueArray {
    type Item = &'a Value;
    type IntoIter = slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter { self.iter() }
}
