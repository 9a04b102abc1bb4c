//! Integration with the `serde` library.
//!
//! Mappings for [`Serialize`](serde::Serialize), implemented for both
//! [`Byml`](crate::Byml) and [`BymlView`](crate::immutable::BymlView):
//!
//! - Maps are serialized as maps with string keys, and hash maps as maps with
//!   integer keys.
//! - Arrays are serialized as sequences.
//! - Binary is serialized as bytes.  BinaryAligned is serialized as a struct
//!   named `BinaryAligned` with fields `Alignment` and `Data`.
//! - Every scalar is serialized as the matching primitive, and Null as unit.
//!
//! [`Deserialize`](serde::Deserialize) is implemented for `Byml` only, and
//! reads any self-describing format.  Integers take the narrowest node type
//! that holds them, and hash maps come back as ordinary maps.
#[warn(missing_docs)]
pub(crate) mod de;
#[warn(missing_docs)]
pub(crate) mod ser;

#[cfg(test)]
mod test {
  use crate::{
    immutable::ImmutableByml,
    nodes::{Byml, BymlHashMap32, BymlMap},
    util::test::init_test_logger,
    BymlErr, Endianness,
  };
  use alloc::{string::ToString, vec};

  fn sample() -> Byml {
    let mut hashes = BymlHashMap32::new();
    hashes.insert(7, Byml::Null);
    let mut map = BymlMap::new();
    map.insert("Count".to_string(), Byml::Int(3));
    map.insert(
      "Items".to_string(),
      Byml::Array(vec![Byml::from("Apple"), Byml::Bool(true)]),
    );
    map.insert("Hashes".to_string(), Byml::HashMap32(hashes));
    map.insert("Big".to_string(), Byml::UInt64(u64::MAX));
    Byml::Map(map)
  }

  #[test]
  fn view_serializes_like_tree() -> Result<(), BymlErr> {
    init_test_logger();
    let tree = sample();
    for endianness in [Endianness::Little, Endianness::Big] {
      let mut bytes = tree.to_binary(endianness, 3)?;
      let view = ImmutableByml::new(&mut bytes)?;
      let from_view = serde_yaml::to_string(&view.root()).ok();
      let from_tree = serde_yaml::to_string(&tree).ok();
      assert!(from_tree.is_some());
      assert_eq!(from_view, from_tree);
    }
    Ok(())
  }

  #[test]
  fn deserialize_widens() {
    let text = "[1, 4294967295, -5000000000, 18446744073709551615, 1.5, 0.1, \
                Apple, null]";
    let parsed: Byml = serde_yaml::from_str(text).unwrap();
    assert_eq!(
      parsed,
      Byml::Array(vec![
        Byml::Int(1),
        Byml::UInt32(u32::MAX),
        Byml::Int64(-5_000_000_000),
        Byml::UInt64(u64::MAX),
        Byml::Float(1.5),
        Byml::Double(0.1),
        Byml::from("Apple"),
        Byml::Null,
      ])
    );
  }

  #[test]
  fn deserialize_reads_hash_maps_as_maps() {
    let tree = sample();
    let text = serde_yaml::to_string(&tree).unwrap();
    let parsed: Byml = serde_yaml::from_str(&text).unwrap();
    let map = parsed.get_map().unwrap();
    assert_eq!(map["Count"], Byml::Int(3));
    assert_eq!(map["Big"], Byml::UInt64(u64::MAX));
    let hashes = map["Hashes"].get_map().unwrap();
    assert_eq!(hashes["7"], Byml::Null);
  }
}
