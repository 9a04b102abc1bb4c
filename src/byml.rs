//! Node tags, byte order, and the error type shared by every BYML operation.
use core::{
  fmt::{Debug, Display, Formatter},
  num::TryFromIntError,
  str::Utf8Error,
};

/// Magic bytes at the start of a little-endian document.
pub const BYML_MAGIC_LE: [u8; 2] = *b"YB";

/// Magic bytes at the start of a big-endian document.
pub const BYML_MAGIC_BE: [u8; 2] = *b"BY";

/// Oldest format revision accepted by the reader and writer.
pub const MIN_VERSION: u16 = 2;

/// Newest format revision accepted by the reader and writer.
pub const MAX_VERSION: u16 = 7;

/// Container counts are stored in 24 bits.
pub const MAX_CONTAINER_ITEMS: usize = 0x00FF_FFFF;

/// Nesting limit applied when walking untrusted documents.
///
/// Offsets may point backwards, so a malicious document can describe a cycle.
/// Every recursive walk over a view counts its depth against this limit.
pub const MAX_NODE_DEPTH: usize = 256;

/// Nodes a single walk over a view may visit per byte of the document.
///
/// Shared nodes are visited once per path that reaches them, so a small
/// document whose containers point at each other repeatedly can describe a
/// tree exponentially larger than itself.  Walks fail once they exceed this
/// many visits per document byte.
pub const MAX_VISITS_PER_BYTE: usize = 256;

/// The one-byte tag identifying the kind of every node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum BymlType {
  /// Map keyed by 32-bit hashes.
  HashMap32 = 0x20,
  /// Map keyed by 64-bit hashes.
  HashMap64 = 0x21,
  /// Relocated variant of [`Self::HashMap32`]; recognized, never read.
  RelocatedHashMap32 = 0x30,
  /// Relocated variant of [`Self::HashMap64`]; recognized, never read.
  RelocatedHashMap64 = 0x31,
  /// Index into the document's string table.
  String = 0xA0,
  Binary = 0xA1,
  BinaryAligned = 0xA2,
  Array = 0xC0,
  /// Map keyed by strings from the document's key table.
  Map = 0xC1,
  /// Header of a key or string table; never a value.
  StringTable = 0xC2,
  /// Recognized, never read.
  RemappedMap = 0xC4,
  /// Recognized, never read.
  RelocatedStringTable = 0xC5,
  /// Recognized, never read.
  MonoTypedArray = 0xC8,
  Bool = 0xD0,
  Int = 0xD1,
  Float = 0xD2,
  UInt32 = 0xD3,
  Int64 = 0xD4,
  UInt64 = 0xD5,
  Double = 0xD6,
  Null = 0xFF,
}

impl BymlType {
  /// Types whose payload lives in a separate node with its own header.
  pub const fn is_container(self) -> bool {
    matches!(
      self,
      BymlType::HashMap32
        | BymlType::HashMap64
        | BymlType::Array
        | BymlType::Map
    )
  }

  /// Types stored directly in a container's 4-byte value slot.
  pub const fn is_value(self) -> bool {
    matches!(
      self,
      BymlType::String
        | BymlType::Bool
        | BymlType::Int
        | BymlType::Float
        | BymlType::UInt32
        | BymlType::Null
    )
  }

  /// Non-container types whose value slot holds an offset to the payload.
  pub const fn is_special(self) -> bool {
    matches!(
      self,
      BymlType::Binary
        | BymlType::BinaryAligned
        | BymlType::Int64
        | BymlType::UInt64
        | BymlType::Double
    )
  }

  /// Types recognized by the format but never read or written here.
  pub const fn is_unsupported(self) -> bool {
    matches!(
      self,
      BymlType::RelocatedHashMap32
        | BymlType::RelocatedHashMap64
        | BymlType::RemappedMap
        | BymlType::RelocatedStringTable
        | BymlType::MonoTypedArray
    )
  }
}

impl TryFrom<u8> for BymlType {
  type Error = BymlErr;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      0x20 => BymlType::HashMap32,
      0x21 => BymlType::HashMap64,
      0x30 => BymlType::RelocatedHashMap32,
      0x31 => BymlType::RelocatedHashMap64,
      0xA0 => BymlType::String,
      0xA1 => BymlType::Binary,
      0xA2 => BymlType::BinaryAligned,
      0xC0 => BymlType::Array,
      0xC1 => BymlType::Map,
      0xC2 => BymlType::StringTable,
      0xC4 => BymlType::RemappedMap,
      0xC5 => BymlType::RelocatedStringTable,
      0xC8 => BymlType::MonoTypedArray,
      0xD0 => BymlType::Bool,
      0xD1 => BymlType::Int,
      0xD2 => BymlType::Float,
      0xD3 => BymlType::UInt32,
      0xD4 => BymlType::Int64,
      0xD5 => BymlType::UInt64,
      0xD6 => BymlType::Double,
      0xFF => BymlType::Null,
      unknown => {
        return Err(err!(
          debug,
          BymlErr::InvalidFormat(FormatErr::UnknownNodeType(unknown))
        ))
      },
    })
  }
}

impl From<BymlType> for u8 {
  fn from(value: BymlType) -> Self {
    value as u8
  }
}

impl Display for BymlType {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    Debug::fmt(self, f)
  }
}

/// Byte order of a serialized document.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Endianness {
  #[default]
  Little,
  Big,
}

impl Endianness {
  /// The magic bytes announcing this byte order.
  pub const fn magic(self) -> [u8; 2] {
    match self {
      Endianness::Little => BYML_MAGIC_LE,
      Endianness::Big => BYML_MAGIC_BE,
    }
  }

  /// Detects the byte order from a document's first two bytes.
  pub fn from_magic(magic: [u8; 2]) -> Option<Self> {
    match magic {
      BYML_MAGIC_LE => Some(Endianness::Little),
      BYML_MAGIC_BE => Some(Endianness::Big),
      _ => None,
    }
  }
}

/// Structural problems found while reading a document.
#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FormatErr {
  /// Fewer bytes than a header.
  TooSmall(usize),

  /// The first two bytes are neither `YB` nor `BY`.
  Magic([u8; 2]),

  UnsupportedVersion(u16),

  /// An offset or length pointed past the end of the buffer.
  OutOfBounds {
    index:  usize,
    length: usize,
  },

  UnknownNodeType(u8),

  /// A key or string table offset pointed at something other than a table.
  StringTableExpected(u8),

  /// A map entry referenced a key past the end of the key table.
  KeyIndex(u32),

  /// A string value referenced a string past the end of the string table.
  StringIndex(u32),

  InvalidUtf8,

  /// A table entry was not NUL terminated.
  MissingNul(u32),

  /// Nesting exceeded [`MAX_NODE_DEPTH`].
  NodeDepth,

  /// A walk visited more nodes than [`MAX_VISITS_PER_BYTE`] allows.
  TooManyNodes,

  /// A big-endian buffer was handed to a reader that does not normalize.
  NotNormalized,
}

/// Errors from reading, writing, or accessing BYML data.
#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BymlErr {
  /// The input bytes are not a well-formed document.
  InvalidFormat(FormatErr),

  /// An accessor for one type was called on a node of another.
  TypeMismatch {
    expected: BymlType,
    observed: BymlType,
  },

  /// A typed accessor was called on a `Null` node.
  NullAccess {
    expected: BymlType,
  },

  /// The node type is recognized by the format but cannot be read.
  UnsupportedType(BymlType),

  /// Only containers or `Null` may be the root of a document.
  InvalidRootType(BymlType),

  /// A node that cannot be stored inline was written as a value.
  UnsupportedValueType(BymlType),

  /// A container or table holds more entries than 24 bits can count.
  TooManyItems {
    num_items: usize,
    allowed:   usize,
  },

  /// The output grew past what 32-bit offsets can address.
  TooLarge(usize),

  /// A key or string value holds a NUL byte, which the string tables use
  /// as a terminator.
  EmbeddedNul,

  /// A [`crate::Byml::BinaryAligned`] alignment that is not a power of two.
  InvalidAlignment(u32),

  /// Internal bookkeeping went wrong; this is a bug.
  InternalError,
}

impl Display for BymlErr {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    Debug::fmt(self, f)
  }
}

impl Display for FormatErr {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    Debug::fmt(self, f)
  }
}

#[cfg(feature = "std")]
impl std::error::Error for BymlErr {}

impl From<FormatErr> for BymlErr {
  fn from(src: FormatErr) -> Self {
    BymlErr::InvalidFormat(src)
  }
}

impl From<Utf8Error> for BymlErr {
  fn from(_src: Utf8Error) -> Self {
    BymlErr::InvalidFormat(FormatErr::InvalidUtf8)
  }
}

impl From<TryFromIntError> for BymlErr {
  fn from(_value: TryFromIntError) -> Self {
    BymlErr::TooLarge(u32::MAX as usize + 1)
  }
}
