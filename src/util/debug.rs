use alloc::{format, string::String};
use core::fmt::{Debug, Display, Formatter, Write};

/// A container for `&[u8]` that formats itself as a hex dump on output via
/// [`Debug`] and [`Display`].
///
/// Each line holds 16 bytes in groups of four, labelled with its offset.
pub(crate) struct HexDump<'a>(pub &'a [u8]);

const HEX_DUMP_LINE: usize = 16;

impl<'a> Display for HexDump<'a> {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    Debug::fmt(self, f)
  }
}

impl<'a> Debug for HexDump<'a> {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    let mut b = f.debug_struct("[u8]");
    let mut line = String::with_capacity(3 * HEX_DUMP_LINE + 4);
    for (number, chunk) in self.0.chunks(HEX_DUMP_LINE).enumerate() {
      line.clear();
      for (i, byte) in chunk.iter().enumerate() {
        if i != 0 && i % 4 == 0 {
          line.push(' ');
        }
        write!(&mut line, "{:02X}", byte)?;
      }
      let offset = format!("{:04X}", number * HEX_DUMP_LINE);
      b.field(offset.as_str(), &line.as_str());
    }
    b.finish()
  }
}

/// Hex dump for short (i.e., single-line) byte strings.
///
/// The output will be a continuous string of hex digits, interleaved by a `:`
/// character every `self.1` bytes.  A group size of zero never interleaves.
pub(crate) struct ShortHexDump<'a>(pub &'a [u8], pub usize);

impl<'a> Debug for ShortHexDump<'a> {
  fn fmt(&self, f: &mut Formatter) -> core::fmt::Result {
    for (i, byte) in self.0.iter().enumerate() {
      if self.1 != 0 && i != 0 && i % self.1 == 0 {
        write!(f, ":")?;
      }
      write!(f, "{:02X}", byte)?;
    }
    Ok(())
  }
}

impl<'a> Display for ShortHexDump<'a> {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    Debug::fmt(self, f)
  }
}
