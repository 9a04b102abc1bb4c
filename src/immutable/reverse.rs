//! In-place conversion of big-endian documents to little-endian.
//!
//! Views only ever read little-endian data.  A big-endian document is walked
//! once from its root, byte-swapping every header, entry, value slot, and
//! special payload exactly once.  Nodes may be shared between several parents
//! (the writer deduplicates them), so every offset that has been swapped is
//! remembered and skipped when it is reached again.  The magic is rewritten
//! to `YB` when the pass completes, leaving a genuine little-endian document.
use crate::{
  header::{
    BymlHeader, ContainerHeader, DoubleWord, HashMap32Entry, HashMap64Entry,
    MapEntry, StructReverser, Word,
  },
  zerocopy::{checked_end, round_to_u32, ZeroCopy},
  BymlErr, BymlType, Endianness, FormatErr, BYML_MAGIC_LE, MAX_NODE_DEPTH,
};
use alloc::collections::BTreeSet;
use log::trace;

/// Normalizes `data` to little-endian in place.
///
/// Returns the byte order the document had before normalization.  Little
/// endian documents are validated but left untouched.
pub(crate) fn normalize(data: &mut [u8]) -> Result<Endianness, BymlErr> {
  let (header, endianness) = BymlHeader::read(data)?;
  header.check_version()?;
  if endianness == Endianness::Little {
    return Ok(endianness);
  }

  trace!("Normalizing big-endian document of {} bytes", data.len());
  BymlHeader::reverse_at(data, 0)?;

  let mut reverser = Reverser {
    data,
    visited: BTreeSet::new(),
  };
  for table in [header.key_table_offset, header.string_table_offset] {
    if table != 0 && reverser.visited.insert(table) {
      reverser.reverse_string_table(table as usize)?;
    }
  }
  if header.root_node_offset != 0 {
    let root = header.root_node_offset;
    reverser.visited.insert(root);
    reverser.reverse_container(root as usize, 0)?;
  }

  reverser.data[0..2].copy_from_slice(&BYML_MAGIC_LE);
  Ok(endianness)
}

struct Reverser<'a> {
  data:    &'a mut [u8],
  /// Offsets of nodes and tables already swapped.
  visited: BTreeSet<u32>,
}

impl<'a> Reverser<'a> {
  fn reverse_string_table(&mut self, offset: usize) -> Result<(), BymlErr> {
    ContainerHeader::reverse_at(self.data, offset)?;
    let header = ContainerHeader::read(self.data, offset)?;
    ensure!(
      header.node_type == BymlType::StringTable,
      debug,
      BymlErr::InvalidFormat(FormatErr::StringTableExpected(
        header.node_type.into()
      ))
    );
    // `count + 1` offsets; the last marks the end of the final string.
    for i in 0..=header.count as usize {
      Word::reverse_at(self.data, offset + ContainerHeader::SIZE + i * 4)?;
    }
    Ok(())
  }

  fn reverse_container(
    &mut self,
    offset: usize,
    depth: usize,
  ) -> Result<(), BymlErr> {
    ensure!(
      depth <= MAX_NODE_DEPTH,
      debug,
      BymlErr::InvalidFormat(FormatErr::NodeDepth)
    );
    ContainerHeader::reverse_at(self.data, offset)?;
    let header = ContainerHeader::read(self.data, offset)?;
    let count = header.count as usize;
    let entries = offset + ContainerHeader::SIZE;

    match header.node_type {
      BymlType::HashMap32 => {
        let types = checked_end(&*self.data, entries, count * 8)?;
        checked_end(&*self.data, types, count)?;
        for i in 0..count {
          let entry = entries + i * 8;
          HashMap32Entry::reverse_at(self.data, entry)?;
          let tag = BymlType::try_from(self.data[types + i])?;
          let value = u32::bbrd_at(self.data, entry + 4)?;
          self.reverse_node(value, tag, depth)?;
        }
      },
      BymlType::HashMap64 => {
        let types = checked_end(&*self.data, entries, count * 12)?;
        checked_end(&*self.data, types, count)?;
        for i in 0..count {
          let entry = entries + i * 12;
          HashMap64Entry::reverse_at(self.data, entry)?;
          let tag = BymlType::try_from(self.data[types + i])?;
          let value = u32::bbrd_at(self.data, entry + 8)?;
          self.reverse_node(value, tag, depth)?;
        }
      },
      BymlType::Array => {
        let values = round_to_u32(checked_end(&*self.data, entries, count)?);
        checked_end(&*self.data, values, count * 4)?;
        for i in 0..count {
          let slot = values + i * 4;
          Word::reverse_at(self.data, slot)?;
          let tag = BymlType::try_from(self.data[entries + i])?;
          let value = u32::bbrd_at(self.data, slot)?;
          self.reverse_node(value, tag, depth)?;
        }
      },
      BymlType::Map => {
        checked_end(&*self.data, entries, count * MapEntry::SIZE)?;
        for i in 0..count {
          let entry = entries + i * MapEntry::SIZE;
          MapEntry::reverse_at(self.data, entry)?;
          let tag = BymlType::try_from(self.data[entry + 3])?;
          let value = u32::bbrd_at(self.data, entry + 4)?;
          self.reverse_node(value, tag, depth)?;
        }
      },
      other => {
        return Err(err!(debug, BymlErr::UnsupportedType(other)));
      },
    }
    Ok(())
  }

  /// Swaps the node a value slot points at, unless the slot is inline.
  fn reverse_node(
    &mut self,
    value: u32,
    tag: BymlType,
    depth: usize,
  ) -> Result<(), BymlErr> {
    if tag.is_value() || !self.visited.insert(value) {
      return Ok(());
    }
    let offset = value as usize;
    match tag {
      t if t.is_container() => self.reverse_container(offset, depth + 1),
      BymlType::Binary => Word::reverse_at(self.data, offset),
      BymlType::BinaryAligned => {
        Word::reverse_at(self.data, offset)?;
        Word::reverse_at(self.data, offset + 4)
      },
      BymlType::Int64 | BymlType::UInt64 | BymlType::Double => {
        DoubleWord::reverse_at(self.data, offset)
      },
      other => Err(err!(debug, BymlErr::UnsupportedType(other))),
    }
  }
}
