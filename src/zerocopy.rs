//! Bounds-checked little-endian reads directly out of a byte buffer.
//!
//! Documents are always normalized to little-endian before they are viewed,
//! so everything here reads little-endian regardless of the platform.  None
//! of the types need to be aligned in the buffer.
//!
//! The function names follow a short scheme:
//!
//! - `bb*`. All functions start with `bb`; think "byte buffer".
//! - `*rd*`. Reads data into a new instance.
//! - `*rf*`. References bytes in place (zero-copy).
//! - `*_at`. Reads at a fixed offset instead of advancing a cursor.
use crate::{BymlErr, FormatErr};

/// Bounds check that returns [`FormatErr::OutOfBounds`] on failure.
#[inline(always)]
pub(crate) fn bounds_check<T>(buffer: &T, to: usize) -> Result<(), BymlErr>
where
  T: AsRef<[u8]> + ?Sized,
{
  if to > buffer.as_ref().len() {
    let err = FormatErr::OutOfBounds {
      index:  to,
      length: buffer.as_ref().len(),
    };
    Err(err!(trace, BymlErr::InvalidFormat(err)))
  } else {
    Ok(())
  }
}

/// `start + len`, failing when either overflows or exceeds the buffer.
#[inline(always)]
pub(crate) fn checked_end<T>(
  buffer: &T,
  start: usize,
  len: usize,
) -> Result<usize, BymlErr>
where
  T: AsRef<[u8]> + ?Sized,
{
  let end = start.checked_add(len).ok_or_else(|| {
    err!(
      trace,
      BymlErr::InvalidFormat(FormatErr::OutOfBounds {
        index:  usize::MAX,
        length: buffer.as_ref().len(),
      })
    )
  })?;
  bounds_check(buffer, end)?;
  Ok(end)
}

/// Rounds `n` up to a multiple of four.
#[inline(always)]
pub(crate) const fn round_to_u32(n: usize) -> usize {
  (n + 3) & !3
}

/// Rounds `n` up to a multiple of `alignment`, which must be a power of two.
#[inline(always)]
pub(crate) const fn round_to(n: usize, alignment: usize) -> usize {
  (n + alignment - 1) & !(alignment - 1)
}

/// References `len` bytes at `cursor`, advancing the cursor past them.
#[inline]
pub fn bbrfs<'a>(
  source: &'a [u8],
  cursor: &mut usize,
  len: usize,
) -> Result<&'a [u8], BymlErr> {
  let end = checked_end(source, *cursor, len)?;
  let bytes = &source[*cursor..end];
  *cursor = end;
  Ok(bytes)
}

/// A primitive that can be read from a little-endian byte buffer.
pub trait ZeroCopy: Copy + Sized {
  /// Number of bytes occupied in a buffer.
  const SIZE: usize;

  /// Converts exactly [`Self::SIZE`] little-endian bytes.
  ///
  /// Callers must pass a slice of exactly `SIZE` bytes.
  fn from_le_slice(bytes: &[u8]) -> Self;

  /// Reads a value at `cursor`, advancing the cursor past it.
  #[inline]
  fn bbrd(source: &[u8], cursor: &mut usize) -> Result<Self, BymlErr> {
    let bytes = bbrfs(source, cursor, Self::SIZE)?;
    Ok(Self::from_le_slice(bytes))
  }

  /// Reads a value at a fixed offset.
  #[inline]
  fn bbrd_at(source: &[u8], offset: usize) -> Result<Self, BymlErr> {
    let mut cursor = offset;
    Self::bbrd(source, &mut cursor)
  }
}

macro_rules! gen_zc_prim {
  ($($prim:ty),*) => {
    $(
      impl ZeroCopy for $prim {
        const SIZE: usize = core::mem::size_of::<$prim>();

        #[inline(always)]
        fn from_le_slice(bytes: &[u8]) -> Self {
          let mut array = [0u8; core::mem::size_of::<$prim>()];
          array.copy_from_slice(bytes);
          <$prim>::from_le_bytes(array)
        }
      }
    )*
  };
}

gen_zc_prim!(u8, u16, u32, u64, i32, i64, f32, f64);

/// Reads the low 24 bits stored in the first three bytes at `offset`.
#[inline]
pub(crate) fn bbrd_u24_at(source: &[u8], offset: usize) -> Result<u32, BymlErr> {
  let mut cursor = offset;
  let bytes = bbrfs(source, &mut cursor, 3)?;
  Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0]))
}
