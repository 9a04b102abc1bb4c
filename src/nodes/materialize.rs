//! Copying views into owned trees.
use crate::{
  immutable::{
    BymlView, HashKey, ImmutableByml, ImmutableBymlArray, ImmutableBymlHashMap,
    ImmutableBymlMap, NodeBudget,
  },
  nodes::{Byml, BymlArray, BymlMap},
  BymlErr, BymlType,
};
use alloc::{collections::BTreeMap, string::String};

impl<'a> ImmutableByml<'a> {
  /// Copies the whole document into an owned tree.
  pub fn to_mutable(&self) -> Result<Byml, BymlErr> {
    self.root().to_mutable()
  }
}

impl<'a> BymlView<'a> {
  /// Copies this node and everything beneath it into an owned tree.
  pub fn to_mutable(&self) -> Result<Byml, BymlErr> {
    materialize_node(self, &self.walk_budget(), 0)
  }
}

impl<'a> ImmutableBymlMap<'a> {
  pub fn to_mutable(&self) -> Result<BymlMap, BymlErr> {
    self.to_mutable_at(&self.walk_budget(), 0)
  }

  fn to_mutable_at(
    &self,
    budget: &NodeBudget,
    depth: usize,
  ) -> Result<BymlMap, BymlErr> {
    let mut map = BymlMap::new();
    for entry in self.iter() {
      let (key, value) = entry?;
      let value = materialize_node(&value, budget, depth + 1)?;
      map.insert(String::from(key), value);
    }
    Ok(map)
  }
}

impl<'a> ImmutableBymlArray<'a> {
  pub fn to_mutable(&self) -> Result<BymlArray, BymlErr> {
    self.to_mutable_at(&self.walk_budget(), 0)
  }

  fn to_mutable_at(
    &self,
    budget: &NodeBudget,
    depth: usize,
  ) -> Result<BymlArray, BymlErr> {
    self
      .iter()
      .map(|value| materialize_node(&value, budget, depth + 1))
      .collect()
  }
}

impl<'a, K: HashKey> ImmutableBymlHashMap<'a, K> {
  pub fn to_mutable(&self) -> Result<BTreeMap<K, Byml>, BymlErr> {
    self.to_mutable_at(&self.walk_budget(), 0)
  }

  fn to_mutable_at(
    &self,
    budget: &NodeBudget,
    depth: usize,
  ) -> Result<BTreeMap<K, Byml>, BymlErr> {
    self
      .iter()
      .map(|(hash, value)| {
        Ok((hash, materialize_node(&value, budget, depth + 1)?))
      })
      .collect()
  }
}

fn materialize_node(
  view: &BymlView,
  budget: &NodeBudget,
  depth: usize,
) -> Result<Byml, BymlErr> {
  budget.visit(depth)?;
  Ok(match view.node_type() {
    BymlType::HashMap32 => {
      Byml::HashMap32(view.get_hash_map32()?.to_mutable_at(budget, depth)?)
    },
    BymlType::HashMap64 => {
      Byml::HashMap64(view.get_hash_map64()?.to_mutable_at(budget, depth)?)
    },
    BymlType::Array => Byml::Array(view.get_array()?.to_mutable_at(budget, depth)?),
    BymlType::Map => Byml::Map(view.get_map()?.to_mutable_at(budget, depth)?),
    BymlType::String => Byml::String(view.get_string()?.into()),
    BymlType::Binary => Byml::Binary(view.get_binary()?.into()),
    BymlType::BinaryAligned => {
      let (data, alignment) = view.get_binary_aligned()?;
      Byml::BinaryAligned {
        data: data.into(),
        alignment,
      }
    },
    BymlType::Bool => Byml::Bool(view.get_bool()?),
    BymlType::Int => Byml::Int(view.get_int()?),
    BymlType::Float => Byml::Float(view.get_float()?),
    BymlType::UInt32 => Byml::UInt32(view.get_u32()?),
    BymlType::Int64 => Byml::Int64(view.get_i64()?),
    BymlType::UInt64 => Byml::UInt64(view.get_u64()?),
    BymlType::Double => Byml::Double(view.get_double()?),
    BymlType::Null => Byml::Null,
    other => return Err(err!(debug, BymlErr::UnsupportedType(other))),
  })
}
