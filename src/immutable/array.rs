use crate::{
  header::ContainerHeader,
  immutable::{
    validate_tags, validated_tag, BymlView, DocumentRef, NodeBudget,
  },
  zerocopy::{checked_end, round_to_u32},
  BymlErr,
};
use core::fmt::{Debug, Formatter};

/// An array, viewed in place: a tag byte per element, then the value slots.
#[derive(Copy, Clone)]
pub struct ImmutableBymlArray<'a> {
  doc:    DocumentRef<'a>,
  types:  &'a [u8],
  values: &'a [u8],
}

impl<'a> ImmutableBymlArray<'a> {
  pub(crate) fn new(doc: DocumentRef<'a>, offset: usize) -> Result<Self, BymlErr> {
    let header = ContainerHeader::read(doc.data, offset)?;
    let count = header.count as usize;
    let types_start = offset + ContainerHeader::SIZE;
    let types_end = checked_end(doc.data, types_start, count)?;
    let values_start = round_to_u32(types_end);
    let values_end = checked_end(doc.data, values_start, count * 4)?;
    let types = &doc.data[types_start..types_end];
    validate_tags(types)?;
    Ok(ImmutableBymlArray {
      doc,
      types,
      values: &doc.data[values_start..values_end],
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

  fn decode(doc: DocumentRef<'a>, tag: u8, slot: &[u8]) -> BymlView<'a> {
    let value = u32::from_le_bytes([slot[0], slot[1], slot[2], slot[3]]);
    BymlView::new(doc, value, validated_tag(tag))
  }

  pub fn get(&self, index: usize) -> Option<BymlView<'a>> {
    let tag = *self.types.get(index)?;
    let slot = self.values.get(index * 4..index * 4 + 4)?;
    Some(Self::decode(self.doc, tag, slot))
  }

  pub fn iter(
    &self,
  ) -> impl Iterator<Item = BymlView<'a>>
       + Clone
       + DoubleEndedIterator
       + ExactSizeIterator
       + 'a {
    let doc = self.doc;
    self
      .types
      .iter()
      .zip(self.values.chunks_exact(4))
      .map(move |(tag, slot)| Self::decode(doc, *tag, slot))
  }
}

impl<'a> Debug for ImmutableBymlArray<'a> {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    f.debug_list().entries(self.iter()).finish()
  }
}
