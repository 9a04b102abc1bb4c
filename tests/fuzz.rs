use byml::{
  parse_binary, serialize_binary, view_binary, Byml, BymlErr, BymlHashMap32,
  BymlMap, Endianness, FormatErr, YamlConfig,
};
use proptest::prelude::*;

/// Printable text with the characters that force quoting or escaping.
const TEXT: &str = "[ -~\t\n\u{e9}\u{3042}\u{1F600}]{0,12}";

fn float() -> impl Strategy<Value = f32> {
  prop_oneof![any::<f32>(), Just(f32::NAN), Just(-0.0f32), Just(f32::INFINITY)]
}

fn double() -> impl Strategy<Value = f64> {
  prop_oneof![any::<f64>(), Just(f64::NAN), Just(-0.0f64), Just(f64::NEG_INFINITY)]
}

fn number() -> impl Strategy<Value = Byml> {
  prop_oneof![
    any::<i32>().prop_map(Byml::Int),
    float().prop_map(Byml::Float),
    any::<u32>().prop_map(Byml::UInt32),
    any::<i64>().prop_map(Byml::Int64),
    any::<u64>().prop_map(Byml::UInt64),
    double().prop_map(Byml::Double),
  ]
}

fn scalar() -> impl Strategy<Value = Byml> {
  prop_oneof![
    1 => TEXT.prop_map(Byml::String),
    1 => prop::collection::vec(any::<u8>(), 0..16).prop_map(Byml::Binary),
    1 => (
      prop::collection::vec(any::<u8>(), 0..16),
      prop::sample::select(vec![0u32, 1, 4, 8, 16, 64]),
    )
      .prop_map(|(data, alignment)| Byml::BinaryAligned { data, alignment }),
    1 => any::<bool>().prop_map(Byml::Bool),
    3 => number(),
    1 => Just(Byml::Null),
  ]
}

fn container(
  inner: impl Strategy<Value = Byml> + Clone,
) -> impl Strategy<Value = Byml> {
  prop_oneof![
    prop::collection::vec(inner.clone(), 0..6).prop_map(Byml::Array),
    prop::collection::btree_map(TEXT, inner.clone(), 0..6).prop_map(Byml::Map),
    prop::collection::btree_map(any::<u32>(), inner.clone(), 0..6)
      .prop_map(Byml::HashMap32),
    prop::collection::btree_map(any::<u64>(), inner, 0..6)
      .prop_map(Byml::HashMap64),
  ]
}

/// Any tree that can be the root of a document.
fn document() -> impl Strategy<Value = Byml> {
  container(scalar().prop_recursive(3, 32, 6, |inner| container(inner)))
}

/// Text has one spelling for NaN, so every NaN reads back as the canonical
/// one.
fn canonical_nans(node: Byml) -> Byml {
  match node {
    Byml::Float(value) if value.is_nan() => Byml::Float(f32::NAN),
    Byml::Double(value) if value.is_nan() => Byml::Double(f64::NAN),
    Byml::Array(array) => {
      Byml::Array(array.into_iter().map(canonical_nans).collect())
    },
    Byml::Map(map) => Byml::Map(
      map
        .into_iter()
        .map(|(key, value)| (key, canonical_nans(value)))
        .collect(),
    ),
    Byml::HashMap32(map) => Byml::HashMap32(
      map
        .into_iter()
        .map(|(key, value)| (key, canonical_nans(value)))
        .collect(),
    ),
    Byml::HashMap64(map) => Byml::HashMap64(
      map
        .into_iter()
        .map(|(key, value)| (key, canonical_nans(value)))
        .collect(),
    ),
    other => other,
  }
}

fn sample() -> Byml {
  let mut hashes = BymlHashMap32::new();
  hashes.insert(0x1234_5678, Byml::UInt64(9));
  hashes.insert(2, Byml::from("two"));
  let mut map = BymlMap::new();
  map.insert("Hashes".into(), Byml::HashMap32(hashes));
  map.insert(
    "List".into(),
    Byml::Array(vec![
      Byml::Int(1),
      Byml::Double(2.5),
      Byml::Binary(vec![7; 6]),
      Byml::BinaryAligned {
        data:      vec![1, 2, 3],
        alignment: 8,
      },
    ]),
  );
  map.insert("Name".into(), Byml::from("sample"));
  Byml::Map(map)
}

fn endianness() -> impl Strategy<Value = Endianness> {
  prop_oneof![Just(Endianness::Little), Just(Endianness::Big)]
}

proptest! {
  #[test]
  fn arbitrary_trees_round_trip_binary(
    tree in document(),
    endianness in endianness(),
    version in 2u16..=7
  ) {
    let bytes = serialize_binary(&tree, endianness, version)?;
    prop_assert_eq!(parse_binary(&bytes)?, tree.clone());

    let mut buffer = bytes;
    let view = view_binary(&mut buffer)?;
    prop_assert_eq!(view.to_mutable()?, tree);
  }

  #[test]
  fn arbitrary_trees_round_trip_text(
    tree in document(),
    limit in 1usize..10
  ) {
    let tree = canonical_nans(tree);
    let config = YamlConfig {
      inline_container_max_count: limit,
    };
    let text = tree.to_text(&config)?;
    let parsed = Byml::from_text(&text);
    prop_assert!(parsed.is_ok(), "{:?} from\n{}", parsed, text);
    prop_assert_eq!(parsed.ok(), Some(tree.clone()));

    let bytes = serialize_binary(&tree, Endianness::Big, 3)?;
    let mut buffer = bytes;
    let view = view_binary(&mut buffer)?;
    prop_assert_eq!(view.to_text(&config)?, text);
  }

  #[test]
  fn arbitrary_bytes_never_panic(
    bytes in prop::collection::vec(any::<u8>(), 0..512)
  ) {
    let _ = parse_binary(&bytes);
    let mut buffer = bytes.clone();
    if let Ok(view) = view_binary(&mut buffer) {
      let _ = view.to_mutable();
      let _ = view.to_text(&YamlConfig::default());
    }
  }

  #[test]
  fn arbitrary_body_behind_valid_header(
    big in any::<bool>(),
    version in 2u16..=7,
    body in prop::collection::vec(any::<u8>(), 0..512)
  ) {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(if big { b"BY" } else { b"YB" });
    if big {
      bytes.extend_from_slice(&version.to_be_bytes());
    } else {
      bytes.extend_from_slice(&version.to_le_bytes());
    }
    bytes.extend_from_slice(&body);
    let _ = parse_binary(&bytes);
  }

  #[test]
  fn truncated_documents_fail_cleanly(
    endianness in endianness(),
    cut in any::<prop::sample::Index>()
  ) {
    let tree = sample();
    let bytes = tree.to_binary(endianness, 2).unwrap();
    let len = cut.index(bytes.len());
    match parse_binary(&bytes[..len]) {
      // Only trailing padding was cut.
      Ok(decoded) => prop_assert_eq!(decoded, tree),
      Err(error) => prop_assert!(
        matches!(error, BymlErr::InvalidFormat(_)),
        "unexpected error {:?}",
        error
      ),
    }
  }

  #[test]
  fn corrupted_magic_is_rejected(
    endianness in endianness(),
    magic in any::<[u8; 2]>()
  ) {
    prop_assume!(&magic != b"YB" && &magic != b"BY");
    let mut bytes = sample().to_binary(endianness, 2).unwrap();
    bytes[..2].copy_from_slice(&magic);
    prop_assert_eq!(
      parse_binary(&bytes),
      Err(BymlErr::InvalidFormat(FormatErr::Magic(magic)))
    );
  }

  #[test]
  fn flipped_bytes_never_panic(
    endianness in endianness(),
    flips in prop::collection::vec((any::<prop::sample::Index>(), any::<u8>()), 1..8)
  ) {
    let mut bytes = sample().to_binary(endianness, 2).unwrap();
    for (at, value) in flips {
      let at = at.index(bytes.len());
      bytes[at] ^= value;
    }
    if let Ok(tree) = parse_binary(&bytes) {
      let _ = tree.to_binary(Endianness::Little, 2);
    }
  }

  #[test]
  fn arbitrary_text_never_panics(text in ".{0,128}") {
    let _ = Byml::from_text(&text);
  }
}
