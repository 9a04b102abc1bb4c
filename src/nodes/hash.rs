//! Structural equality and hashing of owned nodes.
//!
//! The 128-bit structural hash is what the writer keys its deduplication
//! cache on.  A container's hash combines its own tag, every key, and the
//! structural hash of every child, so two subtrees hash alike exactly when
//! they would serialize to the same bytes (barring collisions).
use crate::nodes::Byml;
use core::hash::{Hash, Hasher};
use siphasher::sip128::{Hasher128, SipHasher13};

/// Hashes `node` given the structural hash of each of its children.
///
/// `child_hash` is called once per child, in write order, which lets callers
/// that walk the tree anyway (such as the writer) reuse the hashes they have
/// already computed.
pub(crate) fn structural_hash<'n, F>(node: &'n Byml, child_hash: &mut F) -> u128
where
  F: FnMut(&'n Byml) -> u128,
{
  let mut hasher = SipHasher13::new();
  hasher.write_u8(node.node_type().into());
  match node {
    Byml::HashMap32(map) => {
      hasher.write_usize(map.len());
      for (hash, child) in map {
        hasher.write_u32(*hash);
        hasher.write_u128(child_hash(child));
      }
    },
    Byml::HashMap64(map) => {
      hasher.write_usize(map.len());
      for (hash, child) in map {
        hasher.write_u64(*hash);
        hasher.write_u128(child_hash(child));
      }
    },
    Byml::Array(array) => {
      hasher.write_usize(array.len());
      for child in array {
        hasher.write_u128(child_hash(child));
      }
    },
    Byml::Map(map) => {
      hasher.write_usize(map.len());
      for (key, child) in map {
        key.hash(&mut hasher);
        hasher.write_u128(child_hash(child));
      }
    },
    scalar => hash_scalar(scalar, &mut hasher),
  }
  hasher.finish128().as_u128()
}

fn hash_scalar<H: Hasher>(node: &Byml, state: &mut H) {
  match node {
    Byml::String(s) => s.hash(state),
    Byml::Binary(data) => data.hash(state),
    Byml::BinaryAligned { data, alignment } => {
      data.hash(state);
      state.write_u32(*alignment);
    },
    Byml::Bool(value) => state.write_u8(*value as u8),
    Byml::Int(value) => state.write_i32(*value),
    Byml::Float(value) => state.write_u32(value.to_bits()),
    Byml::UInt32(value) => state.write_u32(*value),
    Byml::Int64(value) => state.write_i64(*value),
    Byml::UInt64(value) => state.write_u64(*value),
    Byml::Double(value) => state.write_u64(value.to_bits()),
    _ => {},
  }
}

impl Byml {
  /// A 128-bit structural hash of this node and everything beneath it.
  pub fn value_hash(&self) -> u128 {
    structural_hash(self, &mut |child| child.value_hash())
  }
}

impl PartialEq for Byml {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Byml::HashMap32(a), Byml::HashMap32(b)) => a == b,
      (Byml::HashMap64(a), Byml::HashMap64(b)) => a == b,
      (Byml::String(a), Byml::String(b)) => a == b,
      (Byml::Binary(a), Byml::Binary(b)) => a == b,
      (
        Byml::BinaryAligned {
          data: a,
          alignment: a_alignment,
        },
        Byml::BinaryAligned {
          data: b,
          alignment: b_alignment,
        },
      ) => a_alignment == b_alignment && a == b,
      (Byml::Array(a), Byml::Array(b)) => a == b,
      (Byml::Map(a), Byml::Map(b)) => a == b,
      (Byml::Bool(a), Byml::Bool(b)) => a == b,
      (Byml::Int(a), Byml::Int(b)) => a == b,
      (Byml::Float(a), Byml::Float(b)) => a.to_bits() == b.to_bits(),
      (Byml::UInt32(a), Byml::UInt32(b)) => a == b,
      (Byml::Int64(a), Byml::Int64(b)) => a == b,
      (Byml::UInt64(a), Byml::UInt64(b)) => a == b,
      (Byml::Double(a), Byml::Double(b)) => a.to_bits() == b.to_bits(),
      (Byml::Null, Byml::Null) => true,
      _ => false,
    }
  }
}

impl Eq for Byml {}

impl Hash for Byml {
  fn hash<H: Hasher>(&self, state: &mut H) {
    state.write_u8(self.node_type().into());
    match self {
      Byml::HashMap32(map) => map.hash(state),
      Byml::HashMap64(map) => map.hash(state),
      Byml::Array(array) => array.hash(state),
      Byml::Map(map) => map.hash(state),
      scalar => hash_scalar(scalar, state),
    }
  }
}

#[cfg(test)]
mod test {
  use crate::nodes::{Byml, BymlArray, BymlHashMap32, BymlMap};
  use alloc::vec;

  fn sample() -> Byml {
    let mut map = BymlMap::new();
    map.insert("name".into(), Byml::String("Link".into()));
    map.insert("items".into(), Byml::Array(vec![Byml::Int(1), Byml::Float(0.5)]));
    Byml::Map(map)
  }

  #[test]
  fn equal_trees_hash_equal() {
    assert_eq!(sample(), sample());
    assert_eq!(sample().value_hash(), sample().value_hash());
  }

  #[test]
  fn differences_change_hash() {
    let mut changed = sample();
    if let Byml::Map(map) = &mut changed {
      map.insert("name".into(), Byml::String("Zelda".into()));
    }
    assert_ne!(sample(), changed);
    assert_ne!(sample().value_hash(), changed.value_hash());

    // Same payload, different tag.
    assert_ne!(Byml::Int(1).value_hash(), Byml::UInt32(1).value_hash());
    assert_ne!(
      Byml::Array(BymlArray::new()).value_hash(),
      Byml::HashMap32(BymlHashMap32::new()).value_hash()
    );
  }

  #[test]
  fn floats_by_bits() {
    assert_eq!(Byml::Float(f32::NAN), Byml::Float(f32::NAN));
    assert_ne!(Byml::Double(0.0), Byml::Double(-0.0));
    assert_ne!(Byml::Double(0.0).value_hash(), Byml::Double(-0.0).value_hash());
  }
}
