//! The owned, mutable document tree.
//!
//! A [`Byml`] owns its whole subtree.  Maps are kept in key order and hash
//! maps in hash order, which is the order the writer emits them in.
mod hash;
mod materialize;

pub(crate) use self::hash::structural_hash;

use crate::{BymlErr, BymlType};
use alloc::{collections::BTreeMap, string::String, vec::Vec};

pub type BymlMap = BTreeMap<String, Byml>;
pub type BymlArray = Vec<Byml>;
pub type BymlHashMap32 = BTreeMap<u32, Byml>;
pub type BymlHashMap64 = BTreeMap<u64, Byml>;

/// A node of an owned document.
///
/// Equality and hashing are structural.  Floats compare by bit pattern, so a
/// `NaN` equals itself and `0.0` differs from `-0.0`.
#[derive(Clone, Debug, Default)]
pub enum Byml {
  HashMap32(BymlHashMap32),
  HashMap64(BymlHashMap64),
  String(String),
  Binary(Vec<u8>),
  /// A payload the writer places at an offset that is a multiple of
  /// `alignment`.
  BinaryAligned {
    data:      Vec<u8>,
    alignment: u32,
  },
  Array(BymlArray),
  Map(BymlMap),
  Bool(bool),
  Int(i32),
  Float(f32),
  UInt32(u32),
  Int64(i64),
  UInt64(u64),
  Double(f64),
  #[default]
  Null,
}

macro_rules! byml_accessors {
  ($($get:ident, $get_mut:ident, $variant:ident, $ty:ty;)*) => {
    $(
      pub fn $get(&self) -> Result<&$ty, BymlErr> {
        match self {
          Byml::$variant(value) => Ok(value),
          other => Err(other.mismatch(BymlType::$variant)),
        }
      }

      pub fn $get_mut(&mut self) -> Result<&mut $ty, BymlErr> {
        match self {
          Byml::$variant(value) => Ok(value),
          other => Err(other.mismatch(BymlType::$variant)),
        }
      }
    )*
  };
}

macro_rules! byml_copy_accessors {
  ($($get:ident, $variant:ident, $ty:ty;)*) => {
    $(
      pub fn $get(&self) -> Result<$ty, BymlErr> {
        match self {
          Byml::$variant(value) => Ok(*value),
          other => Err(other.mismatch(BymlType::$variant)),
        }
      }
    )*
  };
}

impl Byml {
  /// The tag this node is written with.
  pub fn node_type(&self) -> BymlType {
    match self {
      Byml::HashMap32(_) => BymlType::HashMap32,
      Byml::HashMap64(_) => BymlType::HashMap64,
      Byml::String(_) => BymlType::String,
      Byml::Binary(_) => BymlType::Binary,
      Byml::BinaryAligned { .. } => BymlType::BinaryAligned,
      Byml::Array(_) => BymlType::Array,
      Byml::Map(_) => BymlType::Map,
      Byml::Bool(_) => BymlType::Bool,
      Byml::Int(_) => BymlType::Int,
      Byml::Float(_) => BymlType::Float,
      Byml::UInt32(_) => BymlType::UInt32,
      Byml::Int64(_) => BymlType::Int64,
      Byml::UInt64(_) => BymlType::UInt64,
      Byml::Double(_) => BymlType::Double,
      Byml::Null => BymlType::Null,
    }
  }

  pub fn is_null(&self) -> bool {
    matches!(self, Byml::Null)
  }

  fn mismatch(&self, expected: BymlType) -> BymlErr {
    match self {
      Byml::Null => err!(debug, BymlErr::NullAccess { expected }),
      other => err!(
        debug,
        BymlErr::TypeMismatch {
          expected,
          observed: other.node_type(),
        }
      ),
    }
  }

  byml_accessors! {
    get_hash_map32, get_hash_map32_mut, HashMap32, BymlHashMap32;
    get_hash_map64, get_hash_map64_mut, HashMap64, BymlHashMap64;
    get_string, get_string_mut, String, String;
    get_binary, get_binary_mut, Binary, Vec<u8>;
    get_array, get_array_mut, Array, BymlArray;
    get_map, get_map_mut, Map, BymlMap;
  }

  byml_copy_accessors! {
    get_bool, Bool, bool;
    get_int, Int, i32;
    get_float, Float, f32;
    get_u32, UInt32, u32;
    get_i64, Int64, i64;
    get_u64, UInt64, u64;
    get_double, Double, f64;
  }

  /// The payload and its alignment.
  pub fn get_binary_aligned(&self) -> Result<(&[u8], u32), BymlErr> {
    match self {
      Byml::BinaryAligned { data, alignment } => Ok((data, *alignment)),
      other => Err(other.mismatch(BymlType::BinaryAligned)),
    }
  }

  /// Number of children of a container; zero for everything else.
  pub fn len(&self) -> usize {
    match self {
      Byml::HashMap32(map) => map.len(),
      Byml::HashMap64(map) => map.len(),
      Byml::Array(array) => array.len(),
      Byml::Map(map) => map.len(),
      _ => 0,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Children in the order they are written.
  pub fn children(&self) -> impl Iterator<Item = &Byml> + '_ {
    let (hash32, hash64, array, map) = match self {
      Byml::HashMap32(map) => (Some(map.values()), None, None, None),
      Byml::HashMap64(map) => (None, Some(map.values()), None, None),
      Byml::Array(array) => (None, None, Some(array.iter()), None),
      Byml::Map(map) => (None, None, None, Some(map.values())),
      _ => (None, None, None, None),
    };
    hash32
      .into_iter()
      .flatten()
      .chain(hash64.into_iter().flatten())
      .chain(array.into_iter().flatten())
      .chain(map.into_iter().flatten())
  }
}

macro_rules! byml_from {
  ($($ty:ty => $variant:ident;)*) => {
    $(
      impl From<$ty> for Byml {
        fn from(value: $ty) -> Self {
          Byml::$variant(value)
        }
      }
    )*
  };
}

byml_from! {
  BymlHashMap32 => HashMap32;
  BymlHashMap64 => HashMap64;
  String => String;
  Vec<u8> => Binary;
  BymlArray => Array;
  BymlMap => Map;
  bool => Bool;
  i32 => Int;
  f32 => Float;
  u32 => UInt32;
  i64 => Int64;
  u64 => UInt64;
  f64 => Double;
}

impl From<&str> for Byml {
  fn from(value: &str) -> Self {
    Byml::String(value.into())
  }
}

impl<T: Into<Byml>> From<Option<T>> for Byml {
  fn from(value: Option<T>) -> Self {
    value.map_or(Byml::Null, Into::into)
  }
}
