//! Strided input views.
//!
//! Batched operations accept their per-entry inputs as strided arrays: a base
//! plus a byte stride between consecutive logical elements. A stride of zero
//! repeats the first element, letting a caller apply one collection (or one
//! limit) to a whole batch without materializing it N times. Interleaved
//! structure-of-arrays layouts pass a raw byte base with the record stride.

use std::marker::PhantomData;

use crate::arena::Scalar;
use crate::error::{DbError, DbResult};

/// A read-only strided view over `T` elements.
#[derive(Debug, Clone, Copy)]
pub struct Strided<'a, T: Scalar> {
    repr: Repr<'a, T>,
}

#[derive(Debug, Clone, Copy)]
enum Repr<'a, T: Scalar> {
    /// Stride 0: one value stands for every element.
    Repeated(T),
    /// Dense, contiguous elements.
    Slice(&'a [T]),
    /// Raw little-endian bytes with an arbitrary byte stride.
    Bytes {
        data: &'a [u8],
        stride: usize,
        _marker: PhantomData<fn() -> T>,
    },
}

impl<'a, T: Scalar> Strided<'a, T> {
    /// A stride-0 view repeating `value` for every element.
    #[must_use]
    pub fn repeated(value: T) -> Self {
        Self {
            repr: Repr::Repeated(value),
        }
    }

    /// A dense view over a slice; element `i` is `slice[i]`.
    #[must_use]
    pub fn from_slice(slice: &'a [T]) -> Self {
        Self {
            repr: Repr::Slice(slice),
        }
    }

    /// A view over raw bytes: element `i` is decoded from
    /// `data[i * stride ..][..T::SIZE]`, little-endian.
    ///
    /// The stride must fit a whole element. Stride-0 repetition goes through
    /// [`Strided::repeated`] instead, so a zero stride is rejected here.
    pub fn from_bytes(data: &'a [u8], stride: usize) -> DbResult<Self> {
        if stride < T::SIZE {
            return Err(DbError::invalid_argument(format!(
                "stride of {stride} bytes can't step over {}-byte elements",
                T::SIZE
            )));
        }
        Ok(Self {
            repr: Repr::Bytes {
                data,
                stride,
                _marker: PhantomData,
            },
        })
    }

    /// Whether this view repeats one element (logical stride 0).
    #[must_use]
    pub fn is_repeated(&self) -> bool {
        matches!(self.repr, Repr::Repeated(_))
    }

    /// Element at `index`.
    ///
    /// # Panics
    ///
    /// Panics if the backing slice or byte buffer is too short for `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> T {
        match self.repr {
            Repr::Repeated(value) => value,
            Repr::Slice(slice) => slice[index],
            Repr::Bytes { data, stride, .. } => {
                let at = index * stride;
                T::decode(&data[at..at + T::SIZE])
            }
        }
    }

    /// Checks that the view can serve `count` elements.
    pub fn check_count(&self, count: usize, what: &str) -> DbResult<()> {
        let capacity = match self.repr {
            Repr::Repeated(_) => return Ok(()),
            Repr::Slice(slice) => slice.len(),
            Repr::Bytes { data, stride, .. } => {
                if data.len() < T::SIZE {
                    0
                } else {
                    (data.len() - T::SIZE) / stride + 1
                }
            }
        };
        if capacity < count {
            return Err(DbError::invalid_argument(format!(
                "{what} holds {capacity} elements, {count} requested"
            )));
        }
        Ok(())
    }

    /// Iterates the first `count` elements.
    pub fn iter(&self, count: usize) -> impl Iterator<Item = T> + '_ {
        (0..count).map(move |i| self.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_serves_any_index() {
        let v = Strided::repeated(42_i64);
        assert!(v.is_repeated());
        assert_eq!(v.get(0), 42);
        assert_eq!(v.get(1_000), 42);
        v.check_count(usize::MAX, "keys").unwrap();
    }

    #[test]
    fn slice_view() {
        let keys = [1_i64, 2, 3];
        let v = Strided::from_slice(&keys);
        assert!(!v.is_repeated());
        assert_eq!(v.iter(3).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(v.check_count(4, "keys").is_err());
    }

    #[test]
    fn interleaved_bytes() {
        // Two records of (i64 key, u32 len) each: stride 12.
        let mut data = Vec::new();
        for (key, len) in [(10_i64, 3_u32), (20, 4)] {
            data.extend_from_slice(&key.to_le_bytes());
            data.extend_from_slice(&len.to_le_bytes());
        }
        let keys = Strided::<i64>::from_bytes(&data, 12).unwrap();
        let lens = Strided::<u32>::from_bytes(&data[8..], 12).unwrap();
        assert_eq!(keys.get(1), 20);
        assert_eq!(lens.get(0), 3);
        keys.check_count(2, "keys").unwrap();
        assert!(keys.check_count(3, "keys").is_err());
    }

    #[test]
    fn undersized_stride_rejected() {
        let data = [0_u8; 16];
        assert!(Strided::<i64>::from_bytes(&data, 4).is_err());
    }
}
