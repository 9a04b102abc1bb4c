//! Serialization of owned trees.
//!
//! Writing happens in two passes over an arena.  The collect pass walks the
//! tree once, interning every map key and string value and recording each
//! non-inline node with its structural hash and the arena ids of its
//! children.  The emit pass then lays out the header, the two string tables,
//! and the nodes breadth-first within each container: a container's value
//! slots are written as placeholders, and each referenced node is written
//! (or found already written) afterwards and its offset patched into the
//! slot.  Identical subtrees are written once and shared.
mod buf;
mod cache;

use self::{
  buf::WriteBuf,
  cache::{NodeCache, NodeId},
};
use crate::{
  header::BymlHeader,
  nodes::{structural_hash, Byml},
  util::log::OkOrLog,
  BymlErr, BymlType, Endianness, FormatErr, MAX_CONTAINER_ITEMS, MAX_VERSION,
  MIN_VERSION,
};
use alloc::{collections::BTreeMap, vec::Vec};
use core::ops::Range;
use log::{debug, Level};
use smallvec::SmallVec;

/// Settings for [`Byml::to_binary_with`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BymlWriteOptions {
  pub endianness: Endianness,
  pub version:    u16,
}

impl Default for BymlWriteOptions {
  fn default() -> Self {
    BymlWriteOptions {
      endianness: Endianness::Little,
      version:    MAX_VERSION,
    }
  }
}

impl BymlWriteOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_endianness(mut self, endianness: Endianness) -> Self {
    self.endianness = endianness;
    self
  }

  pub fn with_version(mut self, version: u16) -> Self {
    self.version = version;
    self
  }
}

impl Byml {
  /// Serializes this tree as a complete document.
  pub fn to_binary(
    &self,
    endianness: Endianness,
    version: u16,
  ) -> Result<Vec<u8>, BymlErr> {
    BymlWriter::write(self, BymlWriteOptions { endianness, version })
  }

  pub fn to_binary_with(
    &self,
    options: &BymlWriteOptions,
  ) -> Result<Vec<u8>, BymlErr> {
    BymlWriter::write(self, *options)
  }

  /// Serializes to memory, then hands the finished document to `writer` in a
  /// single call.
  #[cfg(feature = "std")]
  pub fn write_binary<W: std::io::Write>(
    &self,
    writer: &mut W,
    options: &BymlWriteOptions,
  ) -> std::io::Result<()> {
    let bytes = self
      .to_binary_with(options)
      .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
    writer.write_all(&bytes)
  }
}

/// A non-inline node found by the collect pass.
struct CollectedNode<'t> {
  node:     &'t Byml,
  hash:     u128,
  /// Range of this node's entries in [`BymlWriter::children`].
  children: Range<usize>,
}

struct BymlWriter<'t> {
  options:  BymlWriteOptions,
  /// Map keys, to be numbered in sorted order.
  keys:     BTreeMap<&'t str, u32>,
  /// String values, to be numbered in sorted order.
  strings:  BTreeMap<&'t str, u32>,
  nodes:    Vec<CollectedNode<'t>>,
  /// Per child, in write order: its arena id, or `None` when inline.
  children: Vec<Option<NodeId>>,
  cache:    NodeCache,
  buf:      WriteBuf,
}

impl<'t> BymlWriter<'t> {
  fn write(root: &'t Byml, options: BymlWriteOptions) -> Result<Vec<u8>, BymlErr> {
    let root_type = root.node_type();
    ensure!(
      root_type.is_container() || root_type == BymlType::Null,
      debug,
      BymlErr::InvalidRootType(root_type)
    );
    ensure!(
      (MIN_VERSION..=MAX_VERSION).contains(&options.version),
      debug,
      BymlErr::InvalidFormat(FormatErr::UnsupportedVersion(options.version))
    );

    let mut writer = BymlWriter {
      options,
      keys: BTreeMap::new(),
      strings: BTreeMap::new(),
      nodes: Vec::new(),
      children: Vec::new(),
      cache: NodeCache::default(),
      buf: WriteBuf::new(options.endianness),
    };
    let (root_hash, root_id) = writer.collect(root);
    writer.number_strings()?;

    writer.buf.skip(BymlHeader::SIZE);
    let key_table_offset = write_string_table(&mut writer.buf, &writer.keys)?;
    let string_table_offset =
      write_string_table(&mut writer.buf, &writer.strings)?;
    let root_node_offset = match root_id {
      Some(id) => {
        let offset = writer.buf.offset()?;
        writer.cache.insert(root_hash, id, offset);
        writer.write_node(id)?;
        offset
      },
      None => 0,
    };

    let header = BymlHeader {
      magic: options.endianness.magic(),
      version: options.version,
      key_table_offset,
      string_table_offset,
      root_node_offset,
    };
    writer
      .buf
      .patch_bytes(0, &header.to_bytes(options.endianness))?;

    debug!(
      "Wrote {:?} document: {} nodes ({} shared), {} keys, {} strings, {} bytes",
      writer.options.endianness,
      writer.nodes.len(),
      writer.cache.hits(),
      writer.keys.len(),
      writer.strings.len(),
      writer.buf.position(),
    );
    Ok(writer.buf.into_inner())
  }

  /// Records `node` and its subtree; returns its structural hash and, unless
  /// it is stored inline, its arena id.
  fn collect(&mut self, node: &'t Byml) -> (u128, Option<NodeId>) {
    match node {
      Byml::String(s) => {
        self.strings.insert(s.as_str(), 0);
      },
      Byml::Map(map) => {
        for key in map.keys() {
          self.keys.insert(key.as_str(), 0);
        }
      },
      _ => {},
    }

    let mut child_ids = SmallVec::<Option<NodeId>, 8>::new();
    let hash = structural_hash(node, &mut |child| {
      let (hash, id) = self.collect(child);
      child_ids.push(id);
      hash
    });
    if node.node_type().is_value() {
      return (hash, None);
    }

    let start = self.children.len();
    self.children.extend(child_ids);
    self.nodes.push(CollectedNode {
      node,
      hash,
      children: start..self.children.len(),
    });
    (hash, Some(self.nodes.len() - 1))
  }

  /// Numbers keys and strings by their position in sorted order.
  fn number_strings(&mut self) -> Result<(), BymlErr> {
    for table in [&mut self.keys, &mut self.strings] {
      ensure!(
        table.len() <= MAX_CONTAINER_ITEMS,
        debug,
        BymlErr::TooManyItems {
          num_items: table.len(),
          allowed:   MAX_CONTAINER_ITEMS,
        }
      );
      ensure!(
        !table.keys().any(|s| s.contains('\0')),
        debug,
        BymlErr::EmbeddedNul
      );
      for (index, value) in table.values_mut().enumerate() {
        *value = index as u32;
      }
    }
    Ok(())
  }

  fn write_node(&mut self, id: NodeId) -> Result<(), BymlErr> {
    let (node, children) = {
      let collected = &self.nodes[id];
      (collected.node, collected.children.clone())
    };
    let mut staged = SmallVec::<(usize, NodeId), 8>::new();

    match node {
      Byml::HashMap32(map) => {
        write_container_header(&mut self.buf, BymlType::HashMap32, map.len())?;
        for ((hash, child), index) in map.iter().zip(children) {
          self.buf.write_u32(*hash);
          let child_id = self.children[index];
          self.write_slot(child, child_id, &mut staged)?;
        }
        for child in map.values() {
          self.buf.write_u8(child.node_type().into());
        }
        self.buf.align(4);
      },
      Byml::HashMap64(map) => {
        write_container_header(&mut self.buf, BymlType::HashMap64, map.len())?;
        for ((hash, child), index) in map.iter().zip(children) {
          self.buf.write_u64(*hash);
          let child_id = self.children[index];
          self.write_slot(child, child_id, &mut staged)?;
        }
        for child in map.values() {
          self.buf.write_u8(child.node_type().into());
        }
        self.buf.align(4);
      },
      Byml::Array(array) => {
        write_container_header(&mut self.buf, BymlType::Array, array.len())?;
        for child in array {
          self.buf.write_u8(child.node_type().into());
        }
        self.buf.align(4);
        for (child, index) in array.iter().zip(children) {
          let child_id = self.children[index];
          self.write_slot(child, child_id, &mut staged)?;
        }
      },
      Byml::Map(map) => {
        write_container_header(&mut self.buf, BymlType::Map, map.len())?;
        for ((key, child), index) in map.iter().zip(children) {
          let key_index = self
            .keys
            .get(key.as_str())
            .copied()
            .ok_or_log(Level::Error, BymlErr::InternalError)?;
          self.buf.write_u24(key_index);
          self.buf.write_u8(child.node_type().into());
          let child_id = self.children[index];
          self.write_slot(child, child_id, &mut staged)?;
        }
      },
      Byml::Binary(data) => {
        self.buf.write_u32(u32::try_from(data.len())?);
        self.buf.write_bytes(data);
        self.buf.align(4);
      },
      Byml::BinaryAligned { data, alignment } => {
        self.buf.write_u32(u32::try_from(data.len())?);
        self.buf.write_u32(*alignment);
        self.buf.write_bytes(data);
        self.buf.align(4);
      },
      Byml::Int64(value) => self.buf.write_i64(*value),
      Byml::UInt64(value) => self.buf.write_u64(*value),
      Byml::Double(value) => self.buf.write_u64(value.to_bits()),
      // Inline values never receive an arena id.
      _ => return Err(err!(error, BymlErr::InternalError)),
    }

    self.write_staged(staged)
  }

  /// Writes a child's value slot: the value itself when inline, otherwise a
  /// placeholder to be patched once the child has an offset.
  fn write_slot(
    &mut self,
    child: &'t Byml,
    child_id: Option<NodeId>,
    staged: &mut SmallVec<(usize, NodeId), 8>,
  ) -> Result<(), BymlErr> {
    match child_id {
      Some(id) => {
        staged.push((self.buf.position(), id));
        self.buf.write_u32(0);
        Ok(())
      },
      None => self.write_value(child),
    }
  }

  fn write_value(&mut self, node: &'t Byml) -> Result<(), BymlErr> {
    match node {
      Byml::String(s) => {
        let index = self
          .strings
          .get(s.as_str())
          .copied()
          .ok_or_log(Level::Error, BymlErr::InternalError)?;
        self.buf.write_u32(index);
      },
      Byml::Bool(value) => self.buf.write_u32(*value as u32),
      Byml::Int(value) => self.buf.write_i32(*value),
      Byml::Float(value) => self.buf.write_u32(value.to_bits()),
      Byml::UInt32(value) => self.buf.write_u32(*value),
      Byml::Null => self.buf.write_u32(0),
      other => {
        return Err(err!(
          debug,
          BymlErr::UnsupportedValueType(other.node_type())
        ))
      },
    }
    Ok(())
  }

  /// Writes (or reuses) each staged child and patches its slot.
  fn write_staged(
    &mut self,
    staged: SmallVec<(usize, NodeId), 8>,
  ) -> Result<(), BymlErr> {
    for (slot, id) in staged {
      let (node, hash) = (self.nodes[id].node, self.nodes[id].hash);
      let nodes = &self.nodes;
      let offset = match self.cache.lookup(hash, |other| nodes[other].node == node) {
        Some(offset) => offset,
        None => {
          if let Byml::BinaryAligned { alignment, .. } = node {
            self.align_payload(*alignment)?;
          }
          let offset = self.buf.offset()?;
          self.cache.insert(hash, id, offset);
          self.write_node(id)?;
          offset
        },
      };
      self.buf.patch_u32(slot, offset)?;
    }
    Ok(())
  }

  /// Pads so an aligned payload, which follows its 8-byte length and
  /// alignment fields, starts on a multiple of `alignment`.
  fn align_payload(&mut self, alignment: u32) -> Result<(), BymlErr> {
    match alignment {
      0 | 1 => Ok(()),
      a if a.is_power_of_two() => {
        let payload = self.buf.position() + 8;
        let padding = payload.wrapping_neg() & (a as usize - 1);
        self.buf.skip(padding);
        Ok(())
      },
      a => Err(err!(debug, BymlErr::InvalidAlignment(a))),
    }
  }
}

fn write_container_header(
  buf: &mut WriteBuf,
  node_type: BymlType,
  count: usize,
) -> Result<(), BymlErr> {
  ensure!(
    count <= MAX_CONTAINER_ITEMS,
    debug,
    BymlErr::TooManyItems {
      num_items: count,
      allowed:   MAX_CONTAINER_ITEMS,
    }
  );
  buf.write_u8(node_type.into());
  buf.write_u24(count as u32);
  Ok(())
}

/// Writes a key or string table, returning its offset (zero when empty).
fn write_string_table(
  buf: &mut WriteBuf,
  table: &BTreeMap<&str, u32>,
) -> Result<u32, BymlErr> {
  if table.is_empty() {
    return Ok(0);
  }
  let start = buf.offset()?;
  write_container_header(buf, BymlType::StringTable, table.len())?;
  let mut offset = 4 + 4 * (table.len() + 1);
  buf.write_u32(u32::try_from(offset)?);
  for s in table.keys() {
    offset += s.len() + 1;
    buf.write_u32(u32::try_from(offset)?);
  }
  for s in table.keys() {
    buf.write_bytes(s.as_bytes());
    buf.write_u8(0);
  }
  buf.align(4);
  Ok(start)
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{
    nodes::{BymlArray, BymlMap},
    util::{debug::HexDump, test::init_test_logger},
  };
  use alloc::{string::ToString, vec};

  #[test]
  fn empty_map_layout() -> Result<(), BymlErr> {
    init_test_logger();
    let bytes = Byml::Map(BymlMap::new()).to_binary(Endianness::Little, 2)?;
    assert_eq!(
      bytes,
      [
        b'Y', b'B', 0x02, 0x00, // magic, version
        0x00, 0x00, 0x00, 0x00, // no keys
        0x00, 0x00, 0x00, 0x00, // no strings
        0x10, 0x00, 0x00, 0x00, // root
        0xC1, 0x00, 0x00, 0x00, // empty map
      ]
    );
    Ok(())
  }

  #[test]
  fn null_root() -> Result<(), BymlErr> {
    let bytes = Byml::Null.to_binary(Endianness::Big, 3)?;
    assert_eq!(bytes.len(), BymlHeader::SIZE);
    assert_eq!(&bytes[..4], &[b'B', b'Y', 0x00, 0x03]);
    assert_eq!(&bytes[12..], &[0, 0, 0, 0]);
    Ok(())
  }

  #[test]
  fn map_with_string_layout() -> Result<(), BymlErr> {
    init_test_logger();
    let mut map = BymlMap::new();
    map.insert("k".to_string(), Byml::String("v".into()));
    let bytes = Byml::Map(map).to_binary(Endianness::Little, 2)?;
    log::debug!("{:?}", HexDump(&bytes));
    let expected: &[u8] = &[
      b'Y', b'B', 0x02, 0x00, //
      0x10, 0x00, 0x00, 0x00, // key table
      0x20, 0x00, 0x00, 0x00, // string table
      0x30, 0x00, 0x00, 0x00, // root
      0xC2, 0x01, 0x00, 0x00, // key table: 1 entry
      0x0C, 0x00, 0x00, 0x00, // "k"
      0x0E, 0x00, 0x00, 0x00, // end
      b'k', 0x00, 0x00, 0x00, //
      0xC2, 0x01, 0x00, 0x00, // string table: 1 entry
      0x0C, 0x00, 0x00, 0x00, // "v"
      0x0E, 0x00, 0x00, 0x00, // end
      b'v', 0x00, 0x00, 0x00, //
      0xC1, 0x01, 0x00, 0x00, // map of 1
      0x00, 0x00, 0x00, 0xA0, // key 0, string
      0x00, 0x00, 0x00, 0x00, // string 0
    ];
    assert_eq!(bytes, expected);
    Ok(())
  }

  #[test]
  fn shared_subtrees_written_once() -> Result<(), BymlErr> {
    let shared = Byml::Array(vec![Byml::Int64(1), Byml::Int64(2)]);
    let mut map = BymlMap::new();
    map.insert("a".into(), shared.clone());
    map.insert("b".into(), shared);
    let root = Byml::Map(map);
    let bytes = root.to_binary(Endianness::Little, 2)?;

    let view = crate::ImmutableByml::from_slice(&bytes)?;
    let map = view.root().get_map()?;
    let a = map.get_by_key("a")?.ok_or(BymlErr::InternalError)?;
    let b = map.get_by_key("b")?.ok_or(BymlErr::InternalError)?;
    assert_eq!(a.raw_value(), b.raw_value());
    let items = a.get_array()?;
    assert_eq!(items.len(), 2);
    assert_eq!(items.get(1).ok_or(BymlErr::InternalError)?.get_i64()?, 2);
    Ok(())
  }

  #[test]
  fn rejects_before_writing() {
    assert_eq!(
      Byml::Int(1).to_binary(Endianness::Little, 2),
      Err(BymlErr::InvalidRootType(BymlType::Int))
    );
    assert_eq!(
      Byml::Array(BymlArray::new()).to_binary(Endianness::Little, 8),
      Err(BymlErr::InvalidFormat(FormatErr::UnsupportedVersion(8)))
    );
    let odd = Byml::Array(vec![Byml::BinaryAligned {
      data:      vec![1],
      alignment: 12,
    }]);
    assert_eq!(
      odd.to_binary(Endianness::Little, 2),
      Err(BymlErr::InvalidAlignment(12))
    );
  }

  #[test]
  fn rejects_nul_in_strings() -> Result<(), BymlErr> {
    let mut value = BymlMap::new();
    value.insert("k".to_string(), Byml::from("a\0b"));
    assert_eq!(
      Byml::Map(value).to_binary(Endianness::Little, 2),
      Err(BymlErr::EmbeddedNul)
    );

    let mut key = BymlMap::new();
    key.insert("a\0b".to_string(), Byml::Int(1));
    assert_eq!(
      Byml::Array(vec![Byml::Map(key)]).to_binary(Endianness::Big, 2),
      Err(BymlErr::EmbeddedNul)
    );

    let mut clean = BymlMap::new();
    clean.insert("k".to_string(), Byml::from("ab"));
    assert!(Byml::Map(clean).to_binary(Endianness::Big, 2).is_ok());
    Ok(())
  }

  #[test]
  fn aligned_payload() -> Result<(), BymlErr> {
    let root = Byml::Array(vec![
      Byml::Binary(vec![1, 2, 3]),
      Byml::BinaryAligned {
        data:      vec![9; 5],
        alignment: 0x20,
      },
    ]);
    let bytes = root.to_binary(Endianness::Big, 7)?;
    let mut normalized = bytes.clone();
    let view = crate::ImmutableByml::new(&mut normalized)?;
    let array = view.root().get_array()?;
    let aligned = array.get(1).ok_or(BymlErr::InternalError)?;
    let (data, alignment) = aligned.get_binary_aligned()?;
    assert_eq!((data, alignment), (&[9u8; 5][..], 0x20));
    assert_eq!((aligned.raw_value() + 8) % 0x20, 0);
    Ok(())
  }
}
