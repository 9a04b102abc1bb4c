use crate::{
  header::ContainerHeader,
  immutable::{
    validate_tags, validated_tag, BymlView, DocumentRef, NodeBudget,
  },
  zerocopy::{checked_end, round_to_u32, ZeroCopy},
  BymlErr, BymlType,
};
use core::{
  cmp::Ordering,
  fmt::{Debug, Formatter, LowerHex},
  marker::PhantomData,
};

/// The integer hash keying a hash map.
pub trait HashKey: ZeroCopy + Ord + Debug + LowerHex + 'static {
  /// Tag of the container keyed by this hash width.
  const NODE_TYPE: BymlType;
}

impl HashKey for u32 {
  const NODE_TYPE: BymlType = BymlType::HashMap32;
}

impl HashKey for u64 {
  const NODE_TYPE: BymlType = BymlType::HashMap64;
}

/// A hash-keyed map, viewed in place.
///
/// Entries (hash, then value slot) are sorted by hash and followed by a tag
/// byte per entry.
#[derive(Copy, Clone)]
pub struct ImmutableBymlHashMap<'a, K: HashKey> {
  doc:     DocumentRef<'a>,
  entries: &'a [u8],
  types:   &'a [u8],
  _key:    PhantomData<K>,
}

pub type ImmutableBymlHashMap32<'a> = ImmutableBymlHashMap<'a, u32>;
pub type ImmutableBymlHashMap64<'a> = ImmutableBymlHashMap<'a, u64>;

impl<'a, K: HashKey> ImmutableBymlHashMap<'a, K> {
  const ENTRY_SIZE: usize = K::SIZE + 4;

  pub(crate) fn new(doc: DocumentRef<'a>, offset: usize) -> Result<Self, BymlErr> {
    let header = ContainerHeader::read(doc.data, offset)?;
    let count = header.count as usize;
    let entries_start = offset + ContainerHeader::SIZE;
    let entries_end =
      checked_end(doc.data, entries_start, count * Self::ENTRY_SIZE)?;
    let types_end = checked_end(doc.data, entries_end, count)?;
    // The type array is padded out to a 4-byte boundary.
    checked_end(doc.data, round_to_u32(types_end), 0)?;
    let types = &doc.data[entries_end..types_end];
    validate_tags(types)?;
    Ok(ImmutableBymlHashMap {
      doc,
      entries: &doc.data[entries_start..entries_end],
      types,
      _key: PhantomData,
    })
  }

  pub fn len(&self) -> usize {
    self.types.len()
  }

  /// A budget for one walk over the document this view belongs to.
  pub(crate) fn walk_budget(&self) -> NodeBudget {
    NodeBudget::for_document(self.doc.data)
  }

  pub fn is_empty(&self) -> bool {
    self.types.is_empty()
  }

  fn decode(doc: DocumentRef<'a>, entry: &[u8], tag: u8) -> (K, BymlView<'a>) {
    let hash = K::from_le_slice(&entry[..K::SIZE]);
    let value = u32::from_le_slice(&entry[K::SIZE..]);
    (hash, BymlView::new(doc, value, validated_tag(tag)))
  }

  pub fn get(&self, index: usize) -> Option<(K, BymlView<'a>)> {
    let tag = *self.types.get(index)?;
    let start = index * Self::ENTRY_SIZE;
    let entry = self.entries.get(start..start + Self::ENTRY_SIZE)?;
    Some(Self::decode(self.doc, entry, tag))
  }

  fn hash_at(&self, index: usize) -> K {
    let start = index * Self::ENTRY_SIZE;
    K::from_le_slice(&self.entries[start..start + K::SIZE])
  }

  /// Looks up a value by hash with a binary search over the sorted entries.
  pub fn get_by_hash(&self, hash: K) -> Option<BymlView<'a>> {
    let (mut low, mut high) = (0, self.len());
    while low < high {
      let mid = low + (high - low) / 2;
      match self.hash_at(mid).cmp(&hash) {
        Ordering::Less => low = mid + 1,
        Ordering::Greater => high = mid,
        Ordering::Equal => return self.get(mid).map(|(_, view)| view),
      }
    }
    None
  }

  pub fn iter(
    &self,
  ) -> impl Iterator<Item = (K, BymlView<'a>)>
       + Clone
       + DoubleEndedIterator
       + ExactSizeIterator
       + 'a {
    let doc = self.doc;
    self
      .entries
      .chunks_exact(Self::ENTRY_SIZE)
      .zip(self.types.iter())
      .map(move |(entry, tag)| Self::decode(doc, entry, *tag))
  }
}

impl<'a, K: HashKey> Debug for ImmutableBymlHashMap<'a, K> {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    let mut map = f.debug_map();
    for (hash, value) in self.iter() {
      map.entry(&format_args!("{:#x}", hash), &value);
    }
    map.finish()
  }
}
