use alloc::collections::BTreeMap;
use log::trace;
use smallvec::SmallVec;

/// Index of a collected node in the writer's arena.
pub(crate) type NodeId = usize;

/// Offsets of nodes already written, keyed by structural hash.
///
/// A hash may be shared by unequal nodes, so every hit is confirmed by the
/// caller before its offset is reused.
#[derive(Default)]
pub(crate) struct NodeCache {
  written: BTreeMap<u128, SmallVec<(NodeId, u32), 1>>,
  hits:    usize,
}

impl NodeCache {
  /// The offset of an already written node equal to the one being written.
  pub(crate) fn lookup<F>(&mut self, hash: u128, is_equal: F) -> Option<u32>
  where
    F: Fn(NodeId) -> bool,
  {
    let candidates = self.written.get(&hash)?;
    let offset = candidates
      .iter()
      .find(|(id, _)| is_equal(*id))
      .map(|(_, offset)| *offset)?;
    self.hits += 1;
    trace!("Reusing node at {:#x}", offset);
    Some(offset)
  }

  pub(crate) fn insert(&mut self, hash: u128, id: NodeId, offset: u32) {
    self.written.entry(hash).or_default().push((id, offset));
  }

  /// Number of times a node was shared instead of written again.
  pub(crate) fn hits(&self) -> usize {
    self.hits
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn confirms_hits() {
    let mut cache = NodeCache::default();
    cache.insert(7, 0, 0x40);
    cache.insert(7, 1, 0x80);
    assert_eq!(cache.lookup(7, |id| id == 1), Some(0x80));
    assert_eq!(cache.lookup(7, |_| false), None);
    assert_eq!(cache.lookup(8, |_| true), None);
    assert_eq!(cache.hits(), 1);
  }
}
