use crate::{
  header::ContainerHeader,
  zerocopy::{bbrd_u24_at, checked_end, ZeroCopy},
  BymlErr, BymlType, FormatErr,
};
use core::{
  cmp::Ordering,
  fmt::{Debug, Formatter},
};

/// A sorted table of NUL-terminated strings, viewed in place.
///
/// Documents carry two of these: one for map keys and one for string values.
/// A document without keys or strings has an empty table.
#[derive(Copy, Clone)]
pub struct BymlStringTable<'a> {
  data:   &'a [u8],
  offset: usize,
  count:  usize,
}

impl<'a> BymlStringTable<'a> {
  pub(crate) fn empty(data: &'a [u8]) -> Self {
    BymlStringTable {
      data,
      offset: 0,
      count: 0,
    }
  }

  /// Views the table at `offset`; zero means the table is absent.
  pub(crate) fn load(data: &'a [u8], offset: u32) -> Result<Self, BymlErr> {
    if offset == 0 {
      return Ok(Self::empty(data));
    }
    let offset = offset as usize;
    let tag = u8::bbrd_at(data, offset)?;
    ensure!(
      tag == u8::from(BymlType::StringTable),
      debug,
      BymlErr::InvalidFormat(FormatErr::StringTableExpected(tag))
    );
    let count = bbrd_u24_at(data, offset + 1)? as usize;
    checked_end(data, offset + ContainerHeader::SIZE, (count + 1) * 4)?;
    Ok(BymlStringTable {
      data,
      offset,
      count,
    })
  }

  pub fn len(&self) -> usize {
    self.count
  }

  pub fn is_empty(&self) -> bool {
    self.count == 0
  }

  /// Absolute position of the string at `index`, or of the table's end when
  /// `index == len()`.
  fn string_start(&self, index: usize) -> Result<usize, BymlErr> {
    let relative = u32::bbrd_at(
      self.data,
      self.offset + ContainerHeader::SIZE + index * 4,
    )?;
    Ok(self.offset + relative as usize)
  }

  /// The raw bytes of a string, without its terminating NUL.
  pub fn get_bytes(&self, index: usize) -> Result<&'a [u8], BymlErr> {
    ensure!(
      index < self.count,
      debug,
      BymlErr::InvalidFormat(FormatErr::StringIndex(index as u32))
    );
    let start = self.string_start(index)?;
    let end = self.string_start(index + 1)?;
    ensure!(
      start <= end,
      debug,
      BymlErr::InvalidFormat(FormatErr::OutOfBounds {
        index:  start,
        length: end,
      })
    );
    checked_end(self.data, start, end - start)?;
    let bytes = &self.data[start..end];
    match bytes.iter().position(|byte| *byte == 0) {
      Some(nul) => Ok(&bytes[..nul]),
      None => Err(err!(
        debug,
        BymlErr::InvalidFormat(FormatErr::MissingNul(index as u32))
      )),
    }
  }

  pub fn get(&self, index: usize) -> Result<&'a str, BymlErr> {
    Ok(core::str::from_utf8(self.get_bytes(index)?)?)
  }

  /// Finds the index of `value` by binary search.
  ///
  /// Tables are sorted by byte order, so this only finds entries in tables
  /// that honor that ordering.
  pub fn position(&self, value: &str) -> Result<Option<usize>, BymlErr> {
    let target = value.as_bytes();
    let (mut low, mut high) = (0, self.count);
    while low < high {
      let mid = low + (high - low) / 2;
      match self.get_bytes(mid)?.cmp(target) {
        Ordering::Less => low = mid + 1,
        Ordering::Greater => high = mid,
        Ordering::Equal => return Ok(Some(mid)),
      }
    }
    Ok(None)
  }

  pub fn iter(
    &self,
  ) -> impl Iterator<Item = Result<&'a str, BymlErr>>
       + Clone
       + DoubleEndedIterator
       + ExactSizeIterator
       + 'a {
    let table = *self;
    (0..self.count).map(move |index| table.get(index))
  }
}

impl<'a> Debug for BymlStringTable<'a> {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    let mut list = f.debug_list();
    for entry in self.iter() {
      match entry {
        Ok(s) => list.entry(&s),
        Err(err) => list.entry(&err),
      };
    }
    list.finish()
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use alloc::vec::Vec;

  /// A little-endian table at offset 4, preceded by padding.
  fn table(strings: &[&str]) -> Vec<u8> {
    let mut data = Vec::from([0u8; 4]);
    data.push(0xC2);
    data.extend_from_slice(&(strings.len() as u32).to_le_bytes()[..3]);
    let mut offset = 4 + 4 * (strings.len() as u32 + 1);
    data.extend_from_slice(&offset.to_le_bytes());
    for s in strings {
      offset += s.len() as u32 + 1;
      data.extend_from_slice(&offset.to_le_bytes());
    }
    for s in strings {
      data.extend_from_slice(s.as_bytes());
      data.push(0);
    }
    data
  }

  #[test]
  fn lookup() -> Result<(), BymlErr> {
    let data = table(&["", "Alpha", "beta", "gamma"]);
    let table = BymlStringTable::load(&data, 4)?;
    assert_eq!(table.len(), 4);
    assert_eq!(table.get(0)?, "");
    assert_eq!(table.get(2)?, "beta");
    assert_eq!(table.position("gamma")?, Some(3));
    assert_eq!(table.position("Alpha")?, Some(1));
    assert_eq!(table.position("alpha")?, None);
    assert_eq!(
      table.get(4),
      Err(BymlErr::InvalidFormat(FormatErr::StringIndex(4)))
    );
    let all = table.iter().collect::<Result<Vec<_>, _>>()?;
    assert_eq!(all, ["", "Alpha", "beta", "gamma"]);
    Ok(())
  }

  #[test]
  fn absent_and_malformed() -> Result<(), BymlErr> {
    let data = table(&["x"]);
    assert!(BymlStringTable::load(&data, 0)?.is_empty());
    assert_eq!(
      BymlStringTable::load(&data, 0).map(|t| t.len()),
      Ok(0)
    );
    assert!(matches!(
      BymlStringTable::load(&data, 1),
      Err(BymlErr::InvalidFormat(FormatErr::StringTableExpected(_)))
    ));

    let mut unterminated = data.clone();
    let last = unterminated.len() - 1;
    unterminated[last] = b'y';
    let table = BymlStringTable::load(&unterminated, 4)?;
    assert_eq!(
      table.get(0),
      Err(BymlErr::InvalidFormat(FormatErr::MissingNul(0)))
    );
    Ok(())
  }
}
