#![allow(clippy::approx_constant)]
use byml::{
  materialize, parse_binary, serialize_binary, view_binary, Byml, BymlArray,
  BymlErr, BymlHashMap32, BymlHashMap64, BymlMap, BymlType, BymlWriteOptions,
  Endianness, FormatErr, ImmutableByml, YamlConfig,
};

fn init_logger() {
  let _ = env_logger::builder().is_test(true).try_init();
}

/// A tree holding every node type at least once.
fn every_tag() -> Byml {
  let mut hash32 = BymlHashMap32::new();
  hash32.insert(0x7fff_ffff, Byml::Float(3.14));
  hash32.insert(0, Byml::Bool(true));

  let mut hash64 = BymlHashMap64::new();
  hash64.insert(u64::MAX, Byml::from("far"));
  hash64.insert(1, Byml::Null);

  let mut player = BymlMap::new();
  player.insert("Name".into(), Byml::from("Link"));
  player.insert("Title".into(), Byml::from(""));
  player.insert("Motto".into(), Byml::from("it's dangerous: take this"));

  let mut root = BymlMap::new();
  root.insert(
    "Scalars".into(),
    Byml::Array(vec![
      Byml::Int(-1),
      Byml::UInt32(0xdead_beef),
      Byml::Int64(i64::MIN),
      Byml::UInt64(u64::MAX),
      Byml::Double(-0.25),
      Byml::Float(f32::INFINITY),
      Byml::Bool(false),
      Byml::Null,
    ]),
  );
  root.insert("Binary".into(), Byml::Binary(vec![0, 1, 2, 3, 4]));
  root.insert(
    "Aligned".into(),
    Byml::BinaryAligned {
      data:      vec![0x42, 0x69, 0x6E],
      alignment: 16,
    },
  );
  root.insert("Hash32".into(), Byml::HashMap32(hash32));
  root.insert("Hash64".into(), Byml::HashMap64(hash64));
  root.insert("Player".into(), Byml::Map(player));
  root.insert("EmptyMap".into(), Byml::Map(BymlMap::new()));
  root.insert("EmptyArray".into(), Byml::Array(BymlArray::new()));
  root.insert("Unicode".into(), Byml::from("héllo wörld"));
  Byml::Map(root)
}

#[test]
fn every_tag_both_orders_all_versions() -> Result<(), BymlErr> {
  init_logger();
  let tree = every_tag();
  for endianness in [Endianness::Little, Endianness::Big] {
    for version in 2..=7 {
      let bytes = serialize_binary(&tree, endianness, version)?;
      assert_eq!(parse_binary(&bytes)?, tree);

      let mut buffer = bytes.clone();
      let view = view_binary(&mut buffer)?;
      assert_eq!(view.version(), version);
      assert_eq!(view.endianness(), endianness);
      assert_eq!(materialize(&view)?, tree);
    }
  }
  Ok(())
}

#[test]
fn big_endian_normalizes_to_little_endian_bytes() -> Result<(), BymlErr> {
  let tree = every_tag();
  let little = tree.to_binary(Endianness::Little, 2)?;
  let mut big = tree.to_binary(Endianness::Big, 2)?;
  assert_ne!(little, big);
  assert_eq!(&big[..2], b"BY");

  {
    let view = ImmutableByml::new(&mut big)?;
    assert_eq!(view.as_bytes(), &little[..]);
  }
  assert_eq!(&big[..2], b"YB");
  Ok(())
}

#[test]
fn from_slice_requires_little_endian() -> Result<(), BymlErr> {
  let big = every_tag().to_binary(Endianness::Big, 2)?;
  assert_eq!(
    ImmutableByml::from_slice(&big).err(),
    Some(BymlErr::InvalidFormat(FormatErr::NotNormalized))
  );
  Ok(())
}

#[test]
fn map_keys_in_byte_order() -> Result<(), BymlErr> {
  let mut map = BymlMap::new();
  for (i, key) in ["b", "Ä", "_", "a", "B"].into_iter().enumerate() {
    map.insert(key.into(), Byml::Int(i as i32));
  }
  let bytes = Byml::Map(map).to_binary(Endianness::Little, 2)?;
  let view = ImmutableByml::from_slice(&bytes)?;

  let keys = view
    .root()
    .get_map()?
    .iter()
    .map(|entry| entry.map(|(key, _)| key))
    .collect::<Result<Vec<_>, _>>()?;
  assert_eq!(keys, ["B", "_", "a", "b", "Ä"]);

  let table = view.key_table().iter().collect::<Result<Vec<_>, _>>()?;
  assert_eq!(table, keys);

  let map = view.root().get_map()?;
  assert_eq!(map.get_by_key("Ä")?.map(|v| v.get_int()).transpose()?, Some(1));
  assert!(map.get_by_key("c")?.is_none());
  Ok(())
}

#[test]
fn equal_subtrees_written_once() -> Result<(), BymlErr> {
  let make = || {
    Byml::Array(vec![Byml::from("same"), Byml::Int64(5), Byml::Double(0.5)])
  };
  let mut map = BymlMap::new();
  map.insert("first".into(), make());
  map.insert("second".into(), make());
  map.insert("third".into(), Byml::Array(vec![Byml::from("other")]));
  let shared = Byml::Map(map);
  let bytes = shared.to_binary(Endianness::Little, 2)?;

  let view = ImmutableByml::from_slice(&bytes)?;
  let map = view.root().get_map()?;
  let slot = |key| -> Result<u32, BymlErr> {
    let node = map.get_by_key(key)?.ok_or(BymlErr::InternalError)?;
    Ok(node.raw_value())
  };
  assert_eq!(slot("first")?, slot("second")?);
  assert_ne!(slot("first")?, slot("third")?);

  // A second equal subtree costs one key and one map entry, nothing more.
  let mut one = BymlMap::new();
  one.insert("first".into(), make());
  let mut two = one.clone();
  two.insert("second".into(), make());
  let one = Byml::Map(one).to_binary(Endianness::Little, 2)?;
  let two = Byml::Map(two).to_binary(Endianness::Little, 2)?;
  // Key table: one more offset, and "second\0" pads "first\0" out to 16.
  let key_table_growth = 4 + 8;
  let map_entry = 8;
  assert_eq!(two.len() - one.len(), key_table_growth + map_entry);
  Ok(())
}

#[test]
fn empty_containers_are_bare_headers() -> Result<(), BymlErr> {
  let tree = Byml::Array(vec![
    Byml::Map(BymlMap::new()),
    Byml::Array(BymlArray::new()),
    Byml::HashMap32(BymlHashMap32::new()),
    Byml::HashMap64(BymlHashMap64::new()),
  ]);
  let bytes = tree.to_binary(Endianness::Big, 2)?;
  let mut buffer = bytes.clone();
  let view = ImmutableByml::new(&mut buffer)?;
  let array = view.root().get_array()?;
  let tags = [
    BymlType::Map,
    BymlType::Array,
    BymlType::HashMap32,
    BymlType::HashMap64,
  ];
  for (child, tag) in array.iter().zip(tags) {
    assert_eq!(child.node_type(), tag);
    let offset = child.raw_value() as usize;
    let header = &view.as_bytes()[offset..offset + 4];
    assert_eq!(header, &[u8::from(tag), 0, 0, 0]);
  }
  assert_eq!(parse_binary(&bytes)?, tree);
  Ok(())
}

#[test]
fn int_and_string_scenario() -> Result<(), BymlErr> {
  let mut map = BymlMap::new();
  map.insert("B".into(), Byml::from("hello"));
  map.insert("A".into(), Byml::Int(1_073_741_823));
  let bytes = serialize_binary(&Byml::Map(map), Endianness::Little, 2)?;

  let decoded = parse_binary(&bytes)?;
  let map = decoded.get_map()?;
  assert_eq!(map.len(), 2);
  let entries = map.iter().collect::<Vec<_>>();
  assert_eq!(entries[0], (&"A".to_string(), &Byml::Int(1_073_741_823)));
  assert_eq!(entries[1], (&"B".to_string(), &Byml::from("hello")));
  Ok(())
}

#[test]
fn hash_map_scenario_keeps_float_bits() -> Result<(), BymlErr> {
  let mut hashes = BymlHashMap32::new();
  hashes.insert(0x7fff_ffff, Byml::Float(3.14));
  hashes.insert(0x0000_0000, Byml::Bool(true));
  let bytes = Byml::HashMap32(hashes).to_binary(Endianness::Big, 2)?;

  let mut buffer = bytes.clone();
  let view = view_binary(&mut buffer)?;
  let map = view.root().get_hash_map32()?;
  let entries = map.iter().collect::<Vec<_>>();
  assert_eq!(entries.len(), 2);
  assert_eq!(entries[0].0, 0);
  assert_eq!(entries[0].1.node_type(), BymlType::Bool);
  assert!(entries[0].1.get_bool()?);
  assert_eq!(entries[1].0, 0x7fff_ffff);
  assert_eq!(entries[1].1.node_type(), BymlType::Float);
  assert_eq!(entries[1].1.get_float()?.to_bits(), 3.14f32.to_bits());
  assert!(map.get_by_hash(0x7fff_ffff).is_some());
  assert!(map.get_by_hash(5).is_none());
  Ok(())
}

#[test]
fn aligned_binary_scenario() -> Result<(), BymlErr> {
  let aligned = Byml::BinaryAligned {
    data:      vec![0x42, 0x69, 0x6E],
    alignment: 16,
  };
  let tree = Byml::Array(vec![Byml::Int(7), aligned.clone()]);
  for endianness in [Endianness::Little, Endianness::Big] {
    let bytes = tree.to_binary(endianness, 7)?;
    let decoded = parse_binary(&bytes)?;
    assert_eq!(decoded.get_array()?[1], aligned);
    assert_eq!(
      decoded.get_array()?[1].get_binary_aligned()?,
      (&[0x42, 0x69, 0x6E][..], 16)
    );
  }
  Ok(())
}

#[test]
fn write_options_and_writer() -> Result<(), BymlErr> {
  let tree = every_tag();
  let options = BymlWriteOptions::new()
    .with_endianness(Endianness::Big)
    .with_version(4);
  let bytes = tree.to_binary_with(&options)?;
  assert_eq!(bytes, tree.to_binary(Endianness::Big, 4)?);

  let mut sink = Vec::new();
  tree.write_binary(&mut sink, &options).map_err(|_| BymlErr::InternalError)?;
  assert_eq!(sink, bytes);

  let defaults = tree.to_binary_with(&BymlWriteOptions::default())?;
  assert_eq!(&defaults[..4], &[b'Y', b'B', 7, 0]);
  assert_eq!(Byml::from_binary(&defaults)?, tree);
  Ok(())
}

#[test]
fn accessor_errors() -> Result<(), BymlErr> {
  let mut map = BymlMap::new();
  map.insert("Nothing".into(), Byml::Null);
  map.insert("Number".into(), Byml::Int(3));
  let bytes = Byml::Map(map).to_binary(Endianness::Little, 2)?;
  let view = ImmutableByml::from_slice(&bytes)?;
  let map = view.root().get_map()?;

  let nothing = map.get_by_key("Nothing")?.ok_or(BymlErr::InternalError)?;
  assert_eq!(
    nothing.get_int(),
    Err(BymlErr::NullAccess {
      expected: BymlType::Int,
    })
  );
  let number = map.get_by_key("Number")?.ok_or(BymlErr::InternalError)?;
  assert_eq!(
    number.get_string(),
    Err(BymlErr::TypeMismatch {
      expected: BymlType::String,
      observed: BymlType::Int,
    })
  );
  assert_eq!(
    Byml::Null.get_map().err(),
    Some(BymlErr::NullAccess {
      expected: BymlType::Map,
    })
  );
  Ok(())
}

#[test]
fn null_root_round_trips() -> Result<(), BymlErr> {
  for endianness in [Endianness::Little, Endianness::Big] {
    let bytes = Byml::Null.to_binary(endianness, 2)?;
    assert_eq!(bytes.len(), 16);
    assert_eq!(parse_binary(&bytes)?, Byml::Null);
  }
  Ok(())
}

#[test]
fn text_round_trip_through_view() -> Result<(), byml::TextErr> {
  init_logger();
  let tree = every_tag();
  for endianness in [Endianness::Little, Endianness::Big] {
    let mut bytes = tree.to_binary(endianness, 2)?;
    let view = view_binary(&mut bytes)?;
    for limit in [1, 8, 100] {
      let config = YamlConfig {
        inline_container_max_count: limit,
      };
      let text = view.to_text(&config)?;
      assert_eq!(text, tree.to_text(&config)?);
      assert_eq!(Byml::from_text(&text)?, tree);
    }
  }
  Ok(())
}

/// A little-endian document of `levels` arrays that each hold the next array
/// twice, ending in an array of two ints.
fn shared_chain(levels: usize) -> Vec<u8> {
  let mut bytes = Vec::new();
  bytes.extend_from_slice(b"YB");
  bytes.extend_from_slice(&2u16.to_le_bytes());
  bytes.extend_from_slice(&[0; 8]);
  bytes.extend_from_slice(&0x10u32.to_le_bytes());
  for level in 0..levels {
    let next = (0x10 + 16 * (level + 1)) as u32;
    bytes.extend_from_slice(&[0xC0, 2, 0, 0, 0xC0, 0xC0, 0, 0]);
    bytes.extend_from_slice(&next.to_le_bytes());
    bytes.extend_from_slice(&next.to_le_bytes());
  }
  bytes.extend_from_slice(&[0xC0, 2, 0, 0, 0xD1, 0xD1, 0, 0]);
  bytes.extend_from_slice(&1i32.to_le_bytes());
  bytes.extend_from_slice(&2i32.to_le_bytes());
  bytes
}

#[test]
fn shared_chain_expands() -> Result<(), BymlErr> {
  let mut expected = Byml::Array(vec![Byml::Int(1), Byml::Int(2)]);
  for _ in 0..6 {
    expected = Byml::Array(vec![expected.clone(), expected]);
  }
  assert_eq!(parse_binary(&shared_chain(6))?, expected);
  Ok(())
}

#[test]
fn shared_chain_blowup_is_rejected() -> Result<(), BymlErr> {
  init_logger();
  let bytes = shared_chain(40);
  let too_many = BymlErr::InvalidFormat(FormatErr::TooManyNodes);
  assert_eq!(parse_binary(&bytes), Err(too_many));

  let document = ImmutableByml::from_slice(&bytes)?;
  assert_eq!(document.to_mutable(), Err(too_many));
  assert_eq!(document.root().get_array()?.to_mutable(), Err(too_many));
  assert_eq!(document.to_text(&YamlConfig::default()), Err(too_many));
  assert!(serde_yaml::to_string(&document.root()).is_err());
  Ok(())
}

#[test]
fn nul_in_strings_is_rejected() {
  let mut map = BymlMap::new();
  map.insert("k".into(), Byml::from("a\0b"));
  assert_eq!(
    serialize_binary(&Byml::Map(map), Endianness::Little, 2),
    Err(BymlErr::EmbeddedNul)
  );
}

#[test]
fn long_keys_survive_text() -> Result<(), byml::TextErr> {
  let long = "k".repeat(1100);
  let quoted = "it's ".repeat(220);
  let mut inner = BymlMap::new();
  inner.insert(long.clone(), Byml::Int(1));
  let mut root = BymlMap::new();
  root.insert(long, Byml::Map(inner));
  root.insert(quoted, Byml::Array(vec![Byml::Bool(true)]));
  let tree = Byml::Map(root);
  for limit in [1, 8] {
    let config = YamlConfig {
      inline_container_max_count: limit,
    };
    let text = tree.to_text(&config)?;
    assert!(text.starts_with("? "));
    assert_eq!(Byml::from_text(&text)?, tree);
  }
  Ok(())
}
