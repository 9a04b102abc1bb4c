//! Fixed-layout records: the document header, container headers, and entries.
//!
//! Each record knows which of its byte ranges hold multi-byte integers, which
//! is all the byte-order normalization pass needs to know about it.
use crate::{
  util::debug::ShortHexDump,
  zerocopy::{bbrd_u24_at, bounds_check, checked_end, ZeroCopy},
  BymlErr, BymlType, Endianness, FormatErr, MAX_VERSION, MIN_VERSION,
};
use core::fmt::{Debug, Formatter};

/// A record whose integer fields can be byte-swapped in place.
pub(crate) trait StructReverser {
  /// Size of the whole record in bytes.
  const SIZE: usize;

  /// `(start, end)` byte ranges of each multi-byte field.
  const FIELDS: &'static [(usize, usize)];

  /// Reverses every field of the record starting at `offset`.
  fn reverse_at(data: &mut [u8], offset: usize) -> Result<(), BymlErr> {
    let end = checked_end(data, offset, Self::SIZE)?;
    let record = &mut data[offset..end];
    for &(start, end) in Self::FIELDS {
      record[start..end].reverse();
    }
    Ok(())
  }
}

/// The 16-byte header at the start of every document.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct BymlHeader {
  pub magic:               [u8; 2],
  pub version:             u16,
  /// Offset of the key table, or zero when there are no keys.
  pub key_table_offset:    u32,
  /// Offset of the string table, or zero when there are no strings.
  pub string_table_offset: u32,
  /// Offset of the root container, or zero for a `Null` root.
  pub root_node_offset:    u32,
}

impl BymlHeader {
  pub const SIZE: usize = 16;

  /// Reads the header in whatever byte order its magic announces.
  pub fn read(data: &[u8]) -> Result<(Self, Endianness), BymlErr> {
    ensure!(
      data.len() >= Self::SIZE,
      debug,
      BymlErr::InvalidFormat(FormatErr::TooSmall(data.len()))
    );
    let magic = [data[0], data[1]];
    let endianness = Endianness::from_magic(magic)
      .ok_or_else(|| err!(debug, BymlErr::InvalidFormat(FormatErr::Magic(magic))))?;
    let u16_at = |at: usize| {
      let bytes = [data[at], data[at + 1]];
      match endianness {
        Endianness::Little => u16::from_le_bytes(bytes),
        Endianness::Big => u16::from_be_bytes(bytes),
      }
    };
    let u32_at = |at: usize| {
      let bytes = [data[at], data[at + 1], data[at + 2], data[at + 3]];
      match endianness {
        Endianness::Little => u32::from_le_bytes(bytes),
        Endianness::Big => u32::from_be_bytes(bytes),
      }
    };
    let header = BymlHeader {
      magic,
      version: u16_at(2),
      key_table_offset: u32_at(4),
      string_table_offset: u32_at(8),
      root_node_offset: u32_at(12),
    };
    Ok((header, endianness))
  }

  /// Fails unless the version is one the reader understands.
  pub fn check_version(&self) -> Result<(), BymlErr> {
    ensure!(
      (MIN_VERSION..=MAX_VERSION).contains(&self.version),
      debug,
      BymlErr::InvalidFormat(FormatErr::UnsupportedVersion(self.version))
    );
    Ok(())
  }

  /// Serializes the header in the requested byte order.
  pub fn to_bytes(&self, endianness: Endianness) -> [u8; Self::SIZE] {
    let mut bytes = [0u8; Self::SIZE];
    bytes[0..2].copy_from_slice(&self.magic);
    match endianness {
      Endianness::Little => {
        bytes[2..4].copy_from_slice(&self.version.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.key_table_offset.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.string_table_offset.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.root_node_offset.to_le_bytes());
      },
      Endianness::Big => {
        bytes[2..4].copy_from_slice(&self.version.to_be_bytes());
        bytes[4..8].copy_from_slice(&self.key_table_offset.to_be_bytes());
        bytes[8..12].copy_from_slice(&self.string_table_offset.to_be_bytes());
        bytes[12..16].copy_from_slice(&self.root_node_offset.to_be_bytes());
      },
    }
    bytes
  }
}

impl StructReverser for BymlHeader {
  const SIZE: usize = 16;
  const FIELDS: &'static [(usize, usize)] = &[(2, 4), (4, 8), (8, 12), (12, 16)];
}

impl Debug for BymlHeader {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("BymlHeader")
      .field("magic", &ShortHexDump(&self.magic, 0))
      .field("version", &self.version)
      .field("key_table_offset", &self.key_table_offset)
      .field("string_table_offset", &self.string_table_offset)
      .field("root_node_offset", &self.root_node_offset)
      .finish()
  }
}

/// The 4-byte header of containers and string tables: a tag and a 24-bit
/// count.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ContainerHeader {
  pub node_type: BymlType,
  pub count:     u32,
}

impl ContainerHeader {
  pub const SIZE: usize = 4;

  /// Reads a normalized (little-endian) container header.
  pub fn read(data: &[u8], offset: usize) -> Result<Self, BymlErr> {
    bounds_check(data, offset.saturating_add(Self::SIZE))?;
    let node_type = BymlType::try_from(u8::bbrd_at(data, offset)?)?;
    let count = bbrd_u24_at(data, offset + 1)?;
    Ok(ContainerHeader { node_type, count })
  }
}

impl StructReverser for ContainerHeader {
  const SIZE: usize = 4;
  const FIELDS: &'static [(usize, usize)] = &[(1, 4)];
}

/// A string-keyed map entry: 24-bit key index, tag byte, value slot.
pub(crate) struct MapEntry;

impl MapEntry {
  pub(crate) const SIZE: usize = 8;
}

impl StructReverser for MapEntry {
  const SIZE: usize = 8;
  const FIELDS: &'static [(usize, usize)] = &[(0, 3), (4, 8)];
}

/// A 32-bit hash map entry: hash, value slot.
pub(crate) struct HashMap32Entry;

impl StructReverser for HashMap32Entry {
  const SIZE: usize = 8;
  const FIELDS: &'static [(usize, usize)] = &[(0, 4), (4, 8)];
}

/// A 64-bit hash map entry: hash, value slot.
pub(crate) struct HashMap64Entry;

impl StructReverser for HashMap64Entry {
  const SIZE: usize = 12;
  const FIELDS: &'static [(usize, usize)] = &[(0, 8), (8, 12)];
}

/// A lone 4-byte integer, such as a value slot or table offset.
pub(crate) struct Word;

impl StructReverser for Word {
  const SIZE: usize = 4;
  const FIELDS: &'static [(usize, usize)] = &[(0, 4)];
}

/// A lone 8-byte integer or double.
pub(crate) struct DoubleWord;

impl StructReverser for DoubleWord {
  const SIZE: usize = 8;
  const FIELDS: &'static [(usize, usize)] = &[(0, 8)];
}
