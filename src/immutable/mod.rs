//! Zero-copy views over a serialized document.
//!
//! An [`ImmutableByml`] borrows the document bytes; every view handed out by
//! it ([`BymlView`], [`ImmutableBymlMap`], [`ImmutableBymlArray`],
//! [`ImmutableBymlHashMap`], [`BymlStringTable`]) is a small `Copy` value that
//! reads straight from that buffer.  Nothing is decoded until it is asked for.
//!
//! Views only read little-endian data.  [`ImmutableByml::new`] takes the
//! buffer mutably and normalizes a big-endian document in place first;
//! [`ImmutableByml::from_slice`] accepts only documents that are already
//! little-endian.
mod array;
mod hash_map;
mod map;
pub(crate) mod reverse;
mod string_table;

pub use self::{
  array::ImmutableBymlArray,
  hash_map::{
    HashKey, ImmutableBymlHashMap, ImmutableBymlHashMap32,
    ImmutableBymlHashMap64,
  },
  map::ImmutableBymlMap,
  string_table::BymlStringTable,
};
use crate::{
  header::{BymlHeader, ContainerHeader},
  util::debug::HexDump,
  zerocopy::{bbrfs, ZeroCopy},
  BymlErr, BymlType, Endianness, FormatErr, MAX_NODE_DEPTH,
  MAX_VISITS_PER_BYTE,
};
use core::{
  cell::Cell,
  fmt::{Debug, Formatter},
};

/// The buffer and string tables every view needs to resolve its contents.
#[derive(Copy, Clone)]
pub(crate) struct DocumentRef<'a> {
  pub(crate) data:    &'a [u8],
  pub(crate) keys:    BymlStringTable<'a>,
  pub(crate) strings: BymlStringTable<'a>,
}

impl<'a> DocumentRef<'a> {
  pub(crate) fn key(&self, index: u32) -> Result<&'a str, BymlErr> {
    ensure!(
      (index as usize) < self.keys.len(),
      debug,
      BymlErr::InvalidFormat(FormatErr::KeyIndex(index))
    );
    self.keys.get(index as usize)
  }

  pub(crate) fn string(&self, index: u32) -> Result<&'a str, BymlErr> {
    ensure!(
      (index as usize) < self.strings.len(),
      debug,
      BymlErr::InvalidFormat(FormatErr::StringIndex(index))
    );
    self.strings.get(index as usize)
  }
}

/// Converts a tag byte already checked when its container view was built.
pub(crate) fn validated_tag(byte: u8) -> BymlType {
  BymlType::try_from(byte).unwrap_or(BymlType::Null)
}

/// Checks every tag byte in a container's type array.
pub(crate) fn validate_tags<'t>(
  tags: impl IntoIterator<Item = &'t u8>,
) -> Result<(), BymlErr> {
  for tag in tags {
    BymlType::try_from(*tag)?;
  }
  Ok(())
}

/// Limits one recursive walk over a view, both in depth and in the total
/// number of nodes visited.
pub(crate) struct NodeBudget {
  remaining: Cell<usize>,
}

impl NodeBudget {
  pub(crate) fn for_document(data: &[u8]) -> Self {
    NodeBudget {
      remaining: Cell::new(data.len().saturating_mul(MAX_VISITS_PER_BYTE)),
    }
  }

  /// Only the depth is limited; for walks over owned trees.
  pub(crate) fn unlimited() -> Self {
    NodeBudget {
      remaining: Cell::new(usize::MAX),
    }
  }

  /// Accounts for one node at `depth`.
  pub(crate) fn visit(&self, depth: usize) -> Result<(), BymlErr> {
    ensure!(
      depth <= MAX_NODE_DEPTH,
      debug,
      BymlErr::InvalidFormat(FormatErr::NodeDepth)
    );
    let remaining = self.remaining.get();
    ensure!(
      remaining > 0,
      debug,
      BymlErr::InvalidFormat(FormatErr::TooManyNodes)
    );
    self.remaining.set(remaining - 1);
    Ok(())
  }
}

/// A read-only document borrowed from a byte buffer.
#[derive(Copy, Clone)]
pub struct ImmutableByml<'a> {
  doc:        DocumentRef<'a>,
  header:     BymlHeader,
  endianness: Endianness,
  root:       BymlView<'a>,
}

impl<'a> ImmutableByml<'a> {
  /// Views a document of either byte order.
  ///
  /// A big-endian document is rewritten in place as little-endian before it
  /// is viewed; [`Self::endianness`] still reports the stored order.
  pub fn new(data: &'a mut [u8]) -> Result<Self, BymlErr> {
    let endianness = reverse::normalize(data)?;
    let data: &'a [u8] = data;
    let (header, _) = BymlHeader::read(data)?;
    Self::parse(data, header, endianness)
  }

  /// Views an already little-endian document without modifying it.
  pub fn from_slice(data: &'a [u8]) -> Result<Self, BymlErr> {
    let (header, endianness) = BymlHeader::read(data)?;
    header.check_version()?;
    ensure!(
      endianness == Endianness::Little,
      debug,
      BymlErr::InvalidFormat(FormatErr::NotNormalized)
    );
    Self::parse(data, header, endianness)
  }

  /// `header` must already be read from the normalized `data` and have its
  /// version checked.
  fn parse(
    data: &'a [u8],
    header: BymlHeader,
    endianness: Endianness,
  ) -> Result<Self, BymlErr> {
    let doc = DocumentRef {
      data,
      keys: BymlStringTable::load(data, header.key_table_offset)?,
      strings: BymlStringTable::load(data, header.string_table_offset)?,
    };

    let root = match header.root_node_offset {
      0 => BymlView::new(doc, 0, BymlType::Null),
      offset => {
        let root_header = ContainerHeader::read(data, offset as usize)?;
        let root_type = root_header.node_type;
        if root_type.is_unsupported() {
          return Err(err!(debug, BymlErr::UnsupportedType(root_type)));
        }
        ensure!(
          root_type.is_container(),
          debug,
          BymlErr::InvalidRootType(root_type)
        );
        BymlView::new(doc, offset, root_type)
      },
    };

    Ok(ImmutableByml {
      doc,
      header,
      endianness,
      root,
    })
  }

  pub fn header(&self) -> &BymlHeader {
    &self.header
  }

  pub fn version(&self) -> u16 {
    self.header.version
  }

  /// Byte order of the document as it was stored.
  pub fn endianness(&self) -> Endianness {
    self.endianness
  }

  pub fn root(&self) -> BymlView<'a> {
    self.root
  }

  pub fn key_table(&self) -> BymlStringTable<'a> {
    self.doc.keys
  }

  pub fn string_table(&self) -> BymlStringTable<'a> {
    self.doc.strings
  }

  /// The normalized document bytes.
  pub fn as_bytes(&self) -> &'a [u8] {
    self.doc.data
  }
}

impl<'a> Debug for ImmutableByml<'a> {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    let alternate = f.alternate();
    let mut b = f.debug_struct("ImmutableByml");
    b.field("header", &self.header)
      .field("endianness", &self.endianness)
      .field("keys", &self.doc.keys.len())
      .field("strings", &self.doc.strings.len())
      .field("root", &self.root);
    if alternate {
      b.field("data", &HexDump(self.doc.data));
    }
    b.finish()
  }
}

/// A single node: its tag plus the contents of its 4-byte value slot.
///
/// For inline types the slot is the value itself.  For everything else it is
/// the offset of the node's payload.
#[derive(Copy, Clone)]
pub struct BymlView<'a> {
  doc:       DocumentRef<'a>,
  value:     u32,
  node_type: BymlType,
}

impl<'a> BymlView<'a> {
  pub(crate) fn new(doc: DocumentRef<'a>, value: u32, node_type: BymlType) -> Self {
    BymlView {
      doc,
      value,
      node_type,
    }
  }

  pub fn node_type(&self) -> BymlType {
    self.node_type
  }

  pub fn is_null(&self) -> bool {
    self.node_type == BymlType::Null
  }

  /// The raw value slot.
  pub fn raw_value(&self) -> u32 {
    self.value
  }

  fn check_type(&self, expected: BymlType) -> Result<(), BymlErr> {
    if self.node_type == expected {
      Ok(())
    } else if self.node_type == BymlType::Null {
      Err(err!(debug, BymlErr::NullAccess { expected }))
    } else {
      Err(err!(
        debug,
        BymlErr::TypeMismatch {
          expected,
          observed: self.node_type,
        }
      ))
    }
  }

  /// Type-checks a container and confirms its header agrees with the tag.
  fn container_offset(&self, expected: BymlType) -> Result<usize, BymlErr> {
    self.check_type(expected)?;
    let offset = self.value as usize;
    let header = ContainerHeader::read(self.doc.data, offset)?;
    ensure!(
      header.node_type == expected,
      debug,
      BymlErr::TypeMismatch {
        expected,
        observed: header.node_type,
      }
    );
    Ok(offset)
  }

  pub fn get_hash_map32(&self) -> Result<ImmutableBymlHashMap32<'a>, BymlErr> {
    let offset = self.container_offset(BymlType::HashMap32)?;
    ImmutableBymlHashMap::new(self.doc, offset)
  }

  pub fn get_hash_map64(&self) -> Result<ImmutableBymlHashMap64<'a>, BymlErr> {
    let offset = self.container_offset(BymlType::HashMap64)?;
    ImmutableBymlHashMap::new(self.doc, offset)
  }

  pub fn get_array(&self) -> Result<ImmutableBymlArray<'a>, BymlErr> {
    let offset = self.container_offset(BymlType::Array)?;
    ImmutableBymlArray::new(self.doc, offset)
  }

  pub fn get_map(&self) -> Result<ImmutableBymlMap<'a>, BymlErr> {
    let offset = self.container_offset(BymlType::Map)?;
    ImmutableBymlMap::new(self.doc, offset)
  }

  /// The key or string table this node points at.
  pub fn get_string_table(&self) -> Result<BymlStringTable<'a>, BymlErr> {
    self.check_type(BymlType::StringTable)?;
    BymlStringTable::load(self.doc.data, self.value)
  }

  /// A budget for one walk over the document this view belongs to.
  pub(crate) fn walk_budget(&self) -> NodeBudget {
    NodeBudget::for_document(self.doc.data)
  }

  /// Index of the value in the document's string table.
  pub fn get_string_index(&self) -> Result<u32, BymlErr> {
    self.check_type(BymlType::String)?;
    Ok(self.value)
  }

  pub fn get_string(&self) -> Result<&'a str, BymlErr> {
    self.doc.string(self.get_string_index()?)
  }

  pub fn get_binary(&self) -> Result<&'a [u8], BymlErr> {
    self.check_type(BymlType::Binary)?;
    let mut cursor = self.value as usize;
    let len = u32::bbrd(self.doc.data, &mut cursor)?;
    bbrfs(self.doc.data, &mut cursor, len as usize)
  }

  /// The payload and its alignment requirement.
  pub fn get_binary_aligned(&self) -> Result<(&'a [u8], u32), BymlErr> {
    self.check_type(BymlType::BinaryAligned)?;
    let mut cursor = self.value as usize;
    let len = u32::bbrd(self.doc.data, &mut cursor)?;
    let alignment = u32::bbrd(self.doc.data, &mut cursor)?;
    let data = bbrfs(self.doc.data, &mut cursor, len as usize)?;
    Ok((data, alignment))
  }

  pub fn get_bool(&self) -> Result<bool, BymlErr> {
    self.check_type(BymlType::Bool)?;
    Ok(self.value != 0)
  }

  pub fn get_int(&self) -> Result<i32, BymlErr> {
    self.check_type(BymlType::Int)?;
    Ok(self.value as i32)
  }

  pub fn get_float(&self) -> Result<f32, BymlErr> {
    self.check_type(BymlType::Float)?;
    Ok(f32::from_bits(self.value))
  }

  pub fn get_u32(&self) -> Result<u32, BymlErr> {
    self.check_type(BymlType::UInt32)?;
    Ok(self.value)
  }

  pub fn get_i64(&self) -> Result<i64, BymlErr> {
    self.check_type(BymlType::Int64)?;
    i64::bbrd_at(self.doc.data, self.value as usize)
  }

  pub fn get_u64(&self) -> Result<u64, BymlErr> {
    self.check_type(BymlType::UInt64)?;
    u64::bbrd_at(self.doc.data, self.value as usize)
  }

  pub fn get_double(&self) -> Result<f64, BymlErr> {
    self.check_type(BymlType::Double)?;
    f64::bbrd_at(self.doc.data, self.value as usize)
  }
}

impl<'a> Debug for BymlView<'a> {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    match self.node_type {
      BymlType::String => match self.get_string() {
        Ok(s) => write!(f, "String({:?})", s),
        Err(err) => write!(f, "String({:?})", err),
      },
      BymlType::Binary => match self.get_binary() {
        Ok(data) => f.debug_tuple("Binary").field(&HexDump(data)).finish(),
        Err(err) => write!(f, "Binary({:?})", err),
      },
      BymlType::BinaryAligned => match self.get_binary_aligned() {
        Ok((data, alignment)) => f
          .debug_struct("BinaryAligned")
          .field("alignment", &alignment)
          .field("data", &HexDump(data))
          .finish(),
        Err(err) => write!(f, "BinaryAligned({:?})", err),
      },
      BymlType::Bool => write!(f, "Bool({})", self.value != 0),
      BymlType::Int => write!(f, "Int({})", self.value as i32),
      BymlType::Float => write!(f, "Float({:?})", f32::from_bits(self.value)),
      BymlType::UInt32 => write!(f, "UInt32({})", self.value),
      BymlType::Int64 => write!(f, "Int64({:?})", self.get_i64()),
      BymlType::UInt64 => write!(f, "UInt64({:?})", self.get_u64()),
      BymlType::Double => write!(f, "Double({:?})", self.get_double()),
      BymlType::Null => write!(f, "Null"),
      other => write!(f, "{:?}@{:#x}", other, self.value),
    }
  }
}
