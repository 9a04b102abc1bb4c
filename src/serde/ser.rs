use crate::{
  immutable::{BymlView, NodeBudget},
  nodes::Byml,
  BymlType,
};
use serde::{
  ser::{Error, SerializeMap, SerializeSeq, SerializeStruct},
  Serialize, Serializer,
};

/// Name and field names used for [`Byml::BinaryAligned`].
const BINARY_ALIGNED: &str = "BinaryAligned";
const ALIGNMENT_FIELD: &str = "Alignment";
const DATA_FIELD: &str = "Data";

/// Serializes a byte slice as bytes rather than as a sequence of `u8`.
struct Bytes<'a>(&'a [u8]);

impl<'a> Serialize for Bytes<'a> {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_bytes(self.0)
  }
}

fn serialize_aligned<S: Serializer>(
  serializer: S,
  data: &[u8],
  alignment: u32,
) -> Result<S::Ok, S::Error> {
  let mut s = serializer.serialize_struct(BINARY_ALIGNED, 2)?;
  s.serialize_field(ALIGNMENT_FIELD, &alignment)?;
  s.serialize_field(DATA_FIELD, &Bytes(data))?;
  s.end()
}

impl Serialize for Byml {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      Byml::HashMap32(map) => serializer.collect_map(map),
      Byml::HashMap64(map) => serializer.collect_map(map),
      Byml::String(s) => serializer.serialize_str(s),
      Byml::Binary(data) => serializer.serialize_bytes(data),
      Byml::BinaryAligned { data, alignment } => {
        serialize_aligned(serializer, data, *alignment)
      },
      Byml::Array(array) => serializer.collect_seq(array),
      Byml::Map(map) => serializer.collect_map(map),
      Byml::Bool(value) => serializer.serialize_bool(*value),
      Byml::Int(value) => serializer.serialize_i32(*value),
      Byml::Float(value) => serializer.serialize_f32(*value),
      Byml::UInt32(value) => serializer.serialize_u32(*value),
      Byml::Int64(value) => serializer.serialize_i64(*value),
      Byml::UInt64(value) => serializer.serialize_u64(*value),
      Byml::Double(value) => serializer.serialize_f64(*value),
      Byml::Null => serializer.serialize_unit(),
    }
  }
}

/// Views serialize exactly like the tree they would materialize into, without
/// materializing it.  Malformed nodes surface as the serializer's custom
/// error.
impl<'a> Serialize for BymlView<'a> {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    Nested(*self, &self.walk_budget(), 0).serialize(serializer)
  }
}

/// A view at a given nesting depth, sharing the budget of its walk.
struct Nested<'a, 'b>(BymlView<'a>, &'b NodeBudget, usize);

impl<'a, 'b> Serialize for Nested<'a, 'b> {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let Nested(view, budget, depth) = *self;
    budget.visit(depth).map_err(S::Error::custom)?;
    let child = |view| Nested(view, budget, depth + 1);
    match view.node_type() {
      BymlType::HashMap32 => {
        let map = view.get_hash_map32().map_err(S::Error::custom)?;
        let mut s = serializer.serialize_map(Some(map.len()))?;
        for (hash, value) in map.iter() {
          s.serialize_entry(&hash, &child(value))?;
        }
        s.end()
      },
      BymlType::HashMap64 => {
        let map = view.get_hash_map64().map_err(S::Error::custom)?;
        let mut s = serializer.serialize_map(Some(map.len()))?;
        for (hash, value) in map.iter() {
          s.serialize_entry(&hash, &child(value))?;
        }
        s.end()
      },
      BymlType::Array => {
        let array = view.get_array().map_err(S::Error::custom)?;
        let mut s = serializer.serialize_seq(Some(array.len()))?;
        for value in array.iter() {
          s.serialize_element(&child(value))?;
        }
        s.end()
      },
      BymlType::Map => {
        let map = view.get_map().map_err(S::Error::custom)?;
        let mut s = serializer.serialize_map(Some(map.len()))?;
        for entry in map.iter() {
          let (key, value) = entry.map_err(S::Error::custom)?;
          s.serialize_entry(key, &child(value))?;
        }
        s.end()
      },
      BymlType::String => {
        serializer.serialize_str(view.get_string().map_err(S::Error::custom)?)
      },
      BymlType::Binary => {
        serializer.serialize_bytes(view.get_binary().map_err(S::Error::custom)?)
      },
      BymlType::BinaryAligned => {
        let (data, alignment) =
          view.get_binary_aligned().map_err(S::Error::custom)?;
        serialize_aligned(serializer, data, alignment)
      },
      BymlType::Bool => {
        serializer.serialize_bool(view.get_bool().map_err(S::Error::custom)?)
      },
      BymlType::Int => {
        serializer.serialize_i32(view.get_int().map_err(S::Error::custom)?)
      },
      BymlType::Float => {
        serializer.serialize_f32(view.get_float().map_err(S::Error::custom)?)
      },
      BymlType::UInt32 => {
        serializer.serialize_u32(view.get_u32().map_err(S::Error::custom)?)
      },
      BymlType::Int64 => {
        serializer.serialize_i64(view.get_i64().map_err(S::Error::custom)?)
      },
      BymlType::UInt64 => {
        serializer.serialize_u64(view.get_u64().map_err(S::Error::custom)?)
      },
      BymlType::Double => {
        serializer.serialize_f64(view.get_double().map_err(S::Error::custom)?)
      },
      BymlType::Null => serializer.serialize_unit(),
      other => Err(S::Error::custom(format_args!(
        "cannot serialize node type {}",
        other
      ))),
    }
  }
}
