use crate::{
  header::{ContainerHeader, MapEntry},
  immutable::{
    validate_tags, validated_tag, BymlView, DocumentRef, NodeBudget,
  },
  zerocopy::checked_end,
  BymlErr, FormatErr,
};
use core::{
  cmp::Ordering,
  fmt::{Debug, Formatter},
};

/// A string-keyed map, viewed in place.
///
/// Entries are sorted by key, and keys are indices into the document's key
/// table, which is itself sorted.
#[derive(Copy, Clone)]
pub struct ImmutableBymlMap<'a> {
  doc:     DocumentRef<'a>,
  entries: &'a [u8],
}

impl<'a> ImmutableBymlMap<'a> {
  pub(crate) fn new(doc: DocumentRef<'a>, offset: usize) -> Result<Self, BymlErr> {
    let header = ContainerHeader::read(doc.data, offset)?;
    let start = offset + ContainerHeader::SIZE;
    let end =
      checked_end(doc.data, start, header.count as usize * MapEntry::SIZE)?;
    let entries = &doc.data[start..end];
    validate_tags(entries.chunks_exact(MapEntry::SIZE).map(|entry| &entry[3]))?;
    Ok(ImmutableBymlMap { doc, entries })
  }

  pub fn len(&self) -> usize {
    self.entries.len() / MapEntry::SIZE
  }

  /// A budget for one walk over the document this view belongs to.
  pub(crate) fn walk_budget(&self) -> NodeBudget {
    NodeBudget::for_document(self.doc.data)
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  fn key_index(entry: &[u8]) -> u32 {
    u32::from_le_bytes([entry[0], entry[1], entry[2], 0])
  }

  fn decode(&self, entry: &'a [u8]) -> Result<(&'a str, BymlView<'a>), BymlErr> {
    let key = self.doc.key(Self::key_index(entry))?;
    let value = u32::from_le_bytes([entry[4], entry[5], entry[6], entry[7]]);
    Ok((key, BymlView::new(self.doc, value, validated_tag(entry[3]))))
  }

  fn entry(&self, index: usize) -> Result<&'a [u8], BymlErr> {
    ensure!(
      index < self.len(),
      debug,
      BymlErr::InvalidFormat(FormatErr::OutOfBounds {
        index,
        length: self.len(),
      })
    );
    let start = index * MapEntry::SIZE;
    Ok(&self.entries[start..start + MapEntry::SIZE])
  }

  /// The key and value of the entry at `index`, in key order.
  pub fn get(&self, index: usize) -> Result<(&'a str, BymlView<'a>), BymlErr> {
    self.decode(self.entry(index)?)
  }

  /// Looks up a value by key.
  ///
  /// The key is located in the key table first, and then the entries are
  /// binary searched by key index.
  pub fn get_by_key(&self, key: &str) -> Result<Option<BymlView<'a>>, BymlErr> {
    let Some(key_index) = self.doc.keys.position(key)? else {
      return Ok(None);
    };
    let key_index = key_index as u32;
    let (mut low, mut high) = (0, self.len());
    while low < high {
      let mid = low + (high - low) / 2;
      let entry = self.entry(mid)?;
      match Self::key_index(entry).cmp(&key_index) {
        Ordering::Less => low = mid + 1,
        Ordering::Greater => high = mid,
        Ordering::Equal => return Ok(Some(self.decode(entry)?.1)),
      }
    }
    Ok(None)
  }

  pub fn contains_key(&self, key: &str) -> Result<bool, BymlErr> {
    Ok(self.get_by_key(key)?.is_some())
  }

  /// Entries in key order; each fails only if its key cannot be resolved.
  pub fn iter(
    &self,
  ) -> impl Iterator<Item = Result<(&'a str, BymlView<'a>), BymlErr>>
       + Clone
       + DoubleEndedIterator
       + ExactSizeIterator
       + 'a {
    let map = *self;
    self
      .entries
      .chunks_exact(MapEntry::SIZE)
      .map(move |entry| map.decode(entry))
  }
}

impl<'a> Debug for ImmutableBymlMap<'a> {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    let mut map = f.debug_map();
    for entry in self.iter() {
      match entry {
        Ok((key, value)) => map.entry(&key, &value),
        Err(err) => map.entry(&"?", &err),
      };
    }
    map.finish()
  }
}
