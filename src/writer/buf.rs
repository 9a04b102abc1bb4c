use crate::{zerocopy::round_to, BymlErr, Endianness};
use alloc::vec::Vec;

/// A growable output buffer that writes integers in a fixed byte order.
pub(crate) struct WriteBuf {
  bytes:      Vec<u8>,
  endianness: Endianness,
}

macro_rules! gen_write {
  ($($name:ident, $ty:ty;)*) => {
    $(
      #[inline]
      pub(crate) fn $name(&mut self, value: $ty) {
        match self.endianness {
          Endianness::Little => self.bytes.extend_from_slice(&value.to_le_bytes()),
          Endianness::Big => self.bytes.extend_from_slice(&value.to_be_bytes()),
        }
      }
    )*
  };
}

impl WriteBuf {
  pub(crate) fn new(endianness: Endianness) -> Self {
    WriteBuf {
      bytes: Vec::new(),
      endianness,
    }
  }

  pub(crate) fn position(&self) -> usize {
    self.bytes.len()
  }

  /// The current position as a 32-bit offset.
  pub(crate) fn offset(&self) -> Result<u32, BymlErr> {
    u32::try_from(self.bytes.len())
      .map_err(|_| err!(debug, BymlErr::TooLarge(self.bytes.len())))
  }

  gen_write! {
    write_u32, u32;
    write_i32, i32;
    write_u64, u64;
    write_i64, i64;
  }

  pub(crate) fn write_u8(&mut self, value: u8) {
    self.bytes.push(value);
  }

  /// Writes the low 24 bits of `value`.
  pub(crate) fn write_u24(&mut self, value: u32) {
    let bytes = value.to_le_bytes();
    match self.endianness {
      Endianness::Little => self.bytes.extend_from_slice(&bytes[..3]),
      Endianness::Big => self.bytes.extend_from_slice(&[bytes[2], bytes[1], bytes[0]]),
    }
  }

  pub(crate) fn write_bytes(&mut self, bytes: &[u8]) {
    self.bytes.extend_from_slice(bytes);
  }

  /// Appends `count` zero bytes.
  pub(crate) fn skip(&mut self, count: usize) {
    self.bytes.resize(self.bytes.len() + count, 0);
  }

  /// Pads with zeros up to a multiple of `alignment` (a power of two).
  pub(crate) fn align(&mut self, alignment: usize) {
    let len = self.bytes.len();
    self.skip(round_to(len, alignment) - len);
  }

  /// Overwrites a previously written 32-bit slot.
  pub(crate) fn patch_u32(&mut self, at: usize, value: u32) -> Result<(), BymlErr> {
    let bytes = match self.endianness {
      Endianness::Little => value.to_le_bytes(),
      Endianness::Big => value.to_be_bytes(),
    };
    self.patch_bytes(at, &bytes)
  }

  pub(crate) fn patch_bytes(&mut self, at: usize, bytes: &[u8]) -> Result<(), BymlErr> {
    let slot = self
      .bytes
      .get_mut(at..at + bytes.len())
      .ok_or_else(|| err!(error, BymlErr::InternalError))?;
    slot.copy_from_slice(bytes);
    Ok(())
  }

  pub(crate) fn into_inner(self) -> Vec<u8> {
    self.bytes
  }
}
