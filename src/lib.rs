//! Reading and writing BYML documents.
//!
//! BYML is a binary tree format: a document holds a root container (a map,
//! an array, or a hash map) whose children are containers, strings, binary
//! blobs, or scalars.  All strings and map keys live in two sorted tables at
//! the start of the document and nodes refer to them by index.
//!
//! This crate offers three ways to work with a document:
//!
//! - [`ImmutableByml`] is a zero-copy view over a byte buffer.  Nothing is
//!   decoded until it is accessed.  Big-endian buffers are converted to
//!   little-endian in place first.
//! - [`Byml`] is an owned tree that can be edited freely.  It is built by
//!   materializing a view, from YAML text, or by hand.
//! - [`Byml::to_binary`] writes a tree back out in either byte order.
//!   Identical subtrees are written once and shared.
//!
//! ```
//! use byml::{Byml, BymlMap, Endianness};
//!
//! let mut map = BymlMap::new();
//! map.insert("Name".into(), Byml::from("Link"));
//! map.insert("Hp".into(), Byml::Int(12));
//!
//! let bytes = byml::serialize_binary(&Byml::Map(map), Endianness::Big, 2)?;
//! let tree = byml::parse_binary(&bytes)?;
//! assert_eq!(tree.get_map()?["Hp"], Byml::Int(12));
//! # Ok::<(), byml::BymlErr>(())
//! ```
#![no_std]
// Used for generated documentation to reference feature requirements.
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

/// Internal Macros
#[macro_use]
mod macros;

mod byml;
pub mod header;
pub mod immutable;
pub mod nodes;
#[cfg(feature = "serde")]
mod serde;
#[cfg(feature = "yaml")]
#[cfg_attr(docsrs, doc(cfg(feature = "yaml")))]
pub mod text;
mod util;
pub mod writer;
pub mod zerocopy;

pub use self::{
  byml::*,
  immutable::{BymlView, ImmutableByml},
  nodes::{Byml, BymlArray, BymlHashMap32, BymlHashMap64, BymlMap},
  writer::BymlWriteOptions,
};
#[cfg(feature = "yaml")]
pub use self::text::{TextErr, YamlConfig};

use crate::util::log::LogErr;
use alloc::vec::Vec;
use log::Level;

/// Reads a binary document into an owned tree.
///
/// Little-endian input is read in place.  Big-endian input is copied once and
/// the copy is converted before reading.
pub fn parse_binary(data: &[u8]) -> Result<Byml, BymlErr> {
  match ImmutableByml::from_slice(data) {
    Ok(document) => materialize(&document),
    Err(BymlErr::InvalidFormat(FormatErr::NotNormalized)) => {
      let mut owned = data.to_vec();
      let document = ImmutableByml::new(&mut owned).log_err(Level::Debug)?;
      materialize(&document)
    },
    Err(error) => Err(error),
  }
}

/// Writes `root` as a binary document in the given byte order and version.
pub fn serialize_binary(
  root: &Byml,
  endianness: Endianness,
  version: u16,
) -> Result<Vec<u8>, BymlErr> {
  root.to_binary(endianness, version)
}

/// Converts `data` to little-endian in place if needed and returns a view over
/// it.
///
/// The buffer is modified even when the view cannot be built, so it should be
/// discarded after an error.
pub fn view_binary(data: &mut [u8]) -> Result<ImmutableByml<'_>, BymlErr> {
  ImmutableByml::new(data)
}

/// Copies every node reachable from the root of `document` into a tree.
pub fn materialize(document: &ImmutableByml<'_>) -> Result<Byml, BymlErr> {
  document.to_mutable()
}

impl Byml {
  /// Reads a binary document; see [`parse_binary`].
  pub fn from_binary(data: &[u8]) -> Result<Byml, BymlErr> {
    parse_binary(data)
  }
}
