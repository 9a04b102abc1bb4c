use crate::nodes::{Byml, BymlArray, BymlMap};
use alloc::{
  string::{String, ToString},
  vec::Vec,
};
use core::fmt::Formatter;
use serde::{
  de::{Error, MapAccess, SeqAccess, Visitor},
  Deserialize, Deserializer,
};

/// Deserializes any self-describing input into a tree.
///
/// - Integers take the narrowest type that holds them, preferring signed:
///   Int32, then UInt32, then Int64, then UInt64.
/// - `f32` input becomes Float; `f64` input becomes Float when it converts
///   exactly and Double otherwise.
/// - Strings and chars become String, bytes become Binary.
/// - Unit and `None` become Null; `Some(T)` is read as `T`.
/// - Sequences become Array.  Maps become Map, with keys read as strings.
///
/// Hash maps and aligned binaries are never produced: formats that serde
/// reads generically cannot tell them apart from ordinary maps.
impl<'de> Deserialize<'de> for Byml {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    deserializer.deserialize_any(BymlVisitor)
  }
}

struct BymlVisitor;

impl<'de> Visitor<'de> for BymlVisitor {
  type Value = Byml;

  fn expecting(&self, f: &mut Formatter) -> core::fmt::Result {
    f.write_str("a BYML value")
  }

  fn visit_bool<E: Error>(self, v: bool) -> Result<Byml, E> {
    Ok(Byml::Bool(v))
  }

  fn visit_i64<E: Error>(self, v: i64) -> Result<Byml, E> {
    Ok(if let Ok(v) = i32::try_from(v) {
      Byml::Int(v)
    } else if let Ok(v) = u32::try_from(v) {
      Byml::UInt32(v)
    } else {
      Byml::Int64(v)
    })
  }

  fn visit_u64<E: Error>(self, v: u64) -> Result<Byml, E> {
    match i64::try_from(v) {
      Ok(v) => self.visit_i64(v),
      Err(_) => Ok(Byml::UInt64(v)),
    }
  }

  fn visit_f32<E: Error>(self, v: f32) -> Result<Byml, E> {
    Ok(Byml::Float(v))
  }

  fn visit_f64<E: Error>(self, v: f64) -> Result<Byml, E> {
    let narrow = v as f32;
    Ok(if narrow as f64 == v || v.is_nan() {
      Byml::Float(narrow)
    } else {
      Byml::Double(v)
    })
  }

  fn visit_char<E: Error>(self, v: char) -> Result<Byml, E> {
    Ok(Byml::String(v.to_string()))
  }

  fn visit_str<E: Error>(self, v: &str) -> Result<Byml, E> {
    Ok(Byml::String(v.to_string()))
  }

  fn visit_string<E: Error>(self, v: String) -> Result<Byml, E> {
    Ok(Byml::String(v))
  }

  fn visit_bytes<E: Error>(self, v: &[u8]) -> Result<Byml, E> {
    Ok(Byml::Binary(v.to_vec()))
  }

  fn visit_byte_buf<E: Error>(self, v: Vec<u8>) -> Result<Byml, E> {
    Ok(Byml::Binary(v))
  }

  fn visit_unit<E: Error>(self) -> Result<Byml, E> {
    Ok(Byml::Null)
  }

  fn visit_none<E: Error>(self) -> Result<Byml, E> {
    Ok(Byml::Null)
  }

  fn visit_some<D>(self, deserializer: D) -> Result<Byml, D::Error>
  where
    D: Deserializer<'de>,
  {
    Byml::deserialize(deserializer)
  }

  fn visit_seq<A>(self, mut seq: A) -> Result<Byml, A::Error>
  where
    A: SeqAccess<'de>,
  {
    let hint = seq.size_hint().unwrap_or(0).min(4096);
    let mut array = BymlArray::with_capacity(hint);
    while let Some(value) = seq.next_element()? {
      array.push(value);
    }
    Ok(Byml::Array(array))
  }

  fn visit_map<A>(self, mut access: A) -> Result<Byml, A::Error>
  where
    A: MapAccess<'de>,
  {
    let mut map = BymlMap::new();
    while let Some((key, value)) = access.next_entry::<MapKey, Byml>()? {
      map.insert(key.0, value);
    }
    Ok(Byml::Map(map))
  }
}

/// A map key; scalar keys are converted to their text form.
struct MapKey(String);

impl<'de> Deserialize<'de> for MapKey {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    deserializer.deserialize_any(MapKeyVisitor)
  }
}

struct MapKeyVisitor;

impl<'de> Visitor<'de> for MapKeyVisitor {
  type Value = MapKey;

  fn expecting(&self, f: &mut Formatter) -> core::fmt::Result {
    f.write_str("a string or scalar map key")
  }

  fn visit_bool<E: Error>(self, v: bool) -> Result<MapKey, E> {
    Ok(MapKey(v.to_string()))
  }

  fn visit_i64<E: Error>(self, v: i64) -> Result<MapKey, E> {
    Ok(MapKey(v.to_string()))
  }

  fn visit_u64<E: Error>(self, v: u64) -> Result<MapKey, E> {
    Ok(MapKey(v.to_string()))
  }

  fn visit_f64<E: Error>(self, v: f64) -> Result<MapKey, E> {
    Ok(MapKey(v.to_string()))
  }

  fn visit_char<E: Error>(self, v: char) -> Result<MapKey, E> {
    Ok(MapKey(v.to_string()))
  }

  fn visit_str<E: Error>(self, v: &str) -> Result<MapKey, E> {
    Ok(MapKey(v.to_string()))
  }

  fn visit_string<E: Error>(self, v: String) -> Result<MapKey, E> {
    Ok(MapKey(v))
  }
}
