//! Keys and values are allocated once per run and rewritten in place, so a sample never
//! includes allocator work.

use std::{collections::TryReserveError, io::Write};

use thiserror::Error;

/// A buffer of the configured size could not be reserved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot allocate {len}-byte buffer: {source}")]
pub struct AllocError {
    /// Requested length in bytes.
    pub len: usize,
    #[source]
    source: TryReserveError,
}

/// Zeroed buffer of exactly `len` bytes, or an error instead of an allocator abort.
pub(crate) fn zeroed(len: usize) -> Result<Vec<u8>, AllocError> {
    let mut bytes = reserve(len)?;
    bytes.resize(len, 0);
    Ok(bytes)
}

/// Empty buffer with room for `len` bytes.
pub(crate) fn reserve(len: usize) -> Result<Vec<u8>, AllocError> {
    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(len)
        .map_err(|source| AllocError { len, source })?;
    Ok(bytes)
}

/// Number of decimal digits needed to print `index`.
pub fn decimal_width(index: usize) -> usize {
    index.checked_ilog10().map_or(1, |digits| digits as usize + 1)
}

/// Fixed-length object key.
///
/// Starts zeroed. [`KeyBuffer::set_index`] zero-fills the key and then copies the decimal
/// digits of an object index into its leading bytes, so a shorter index never inherits
/// digits from a longer one written before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBuffer {
    bytes: Box<[u8]>,
}

impl KeyBuffer {
    /// Zeroed key of `len` bytes.
    pub fn new(len: usize) -> Result<Self, AllocError> {
        Ok(Self {
            bytes: zeroed(len)?.into_boxed_slice(),
        })
    }

    /// Reset every byte to zero.
    pub fn zero(&mut self) {
        self.bytes.fill(0);
    }

    /// Key of object `index`: its ASCII digits followed by zero bytes.
    ///
    /// Digits beyond the key length are dropped; configurations are validated so that
    /// this never happens during a run.
    pub fn set_index(&mut self, index: usize) {
        self.zero();
        let mut rest: &mut [u8] = &mut self.bytes;
        // Writing into a slice only fails once it is full, after the leading digits landed.
        let _ = write!(rest, "{index}");
    }

    /// Current key contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Fixed-length, all-zero object value. Only its length matters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueBuffer {
    bytes: Box<[u8]>,
}

impl ValueBuffer {
    /// Zeroed value of `len` bytes.
    pub fn new(len: usize) -> Result<Self, AllocError> {
        Ok(Self {
            bytes: zeroed(len)?.into_boxed_slice(),
        })
    }

    /// Value contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::{decimal_width, reserve, KeyBuffer, ValueBuffer};

    #[test]
    fn widths() {
        assert_eq!(decimal_width(0), 1);
        assert_eq!(decimal_width(9), 1);
        assert_eq!(decimal_width(10), 2);
        assert_eq!(decimal_width(999), 3);
        assert_eq!(decimal_width(usize::MAX), usize::MAX.to_string().len());
    }

    #[test]
    fn index_prefix_then_zeros() {
        let mut key = KeyBuffer::new(5).unwrap();
        assert_eq!(key.as_bytes(), &[0; 5]);

        key.set_index(42);
        assert_eq!(key.as_bytes(), b"42\0\0\0");
    }

    #[test]
    fn shorter_index_clears_previous_digits() {
        let mut key = KeyBuffer::new(4).unwrap();
        key.set_index(123);
        key.set_index(7);
        assert_eq!(key.as_bytes(), b"7\0\0\0");

        key.zero();
        assert_eq!(key.as_bytes(), &[0; 4]);
    }

    #[test]
    fn digits_truncated_to_key_length() {
        let mut key = KeyBuffer::new(1).unwrap();
        key.set_index(10);
        assert_eq!(key.as_bytes(), b"1");
    }

    #[test]
    fn empty_value_is_allowed() {
        let value = ValueBuffer::new(0).unwrap();
        assert_eq!(value.as_bytes(), &[] as &[u8]);
        assert_eq!(ValueBuffer::new(100).unwrap().as_bytes(), &[0; 100]);
    }

    #[test]
    fn oversized_allocation_is_an_error() {
        let err = reserve(usize::MAX).unwrap_err();
        assert_eq!(err.len, usize::MAX);
        assert!(ValueBuffer::new(usize::MAX).is_err());
        assert!(KeyBuffer::new(usize::MAX).is_err());
    }
}
