//! Conversion between documents and their YAML text form.
//!
//! Types that YAML cannot express on its own carry local tags: `!u` for
//! UInt32, `!l` for Int64, `!ul` for UInt64, `!d` for Double, `!h32` and
//! `!h64` for hash maps.  Binary payloads use `!!binary`, and aligned ones use
//! `!!file {Alignment: n, Data: ...}`.  Int32, Float32, Bool, Null, and String
//! are plain YAML scalars.
mod emit;
mod parse;

use self::emit::YamlEmitter;
use crate::{immutable::ImmutableByml, nodes::Byml, BymlErr};
use alloc::string::String;
use core::fmt::{Debug, Display, Formatter};

/// Settings for YAML emission.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct YamlConfig {
  /// Containers with at least this many children are written in block style.
  /// Smaller containers without nested containers are written inline.
  pub inline_container_max_count: usize,
}

impl Default for YamlConfig {
  fn default() -> Self {
    YamlConfig {
      inline_container_max_count: 8,
    }
  }
}

/// Errors from converting text into a document.
#[derive(Debug)]
pub enum TextErr {
  /// The converted tree failed a document-level check.
  Byml(BymlErr),
  /// The text is not well-formed YAML.
  Yaml(serde_yaml::Error),
  /// A `!!binary` or `!!file` payload is not valid base64.
  Base64(base64::DecodeError),
  /// A tag other than the ones this format defines.
  UnknownTag(String),
  /// A tagged value does not fit its tag, such as `!u -1`.
  InvalidValue(String),
  /// A map key that is not a scalar, or a hash key that is not an integer.
  InvalidKey(String),
}

impl Display for TextErr {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    match self {
      TextErr::Byml(err) => Display::fmt(err, f),
      TextErr::Yaml(err) => Display::fmt(err, f),
      TextErr::Base64(err) => Display::fmt(err, f),
      other => Debug::fmt(other, f),
    }
  }
}

impl std::error::Error for TextErr {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      TextErr::Byml(err) => Some(err),
      TextErr::Yaml(err) => Some(err),
      TextErr::Base64(err) => Some(err),
      _ => None,
    }
  }
}

impl From<BymlErr> for TextErr {
  fn from(src: BymlErr) -> Self {
    TextErr::Byml(src)
  }
}

impl From<serde_yaml::Error> for TextErr {
  fn from(src: serde_yaml::Error) -> Self {
    TextErr::Yaml(src)
  }
}

impl From<base64::DecodeError> for TextErr {
  fn from(src: base64::DecodeError) -> Self {
    TextErr::Base64(src)
  }
}

impl Byml {
  /// Writes this tree as a YAML document.
  pub fn to_text(&self, config: &YamlConfig) -> Result<String, BymlErr> {
    YamlEmitter::emit(config, self)
  }

  /// Reads a YAML document into a tree.
  pub fn from_text(text: &str) -> Result<Byml, TextErr> {
    parse::parse_document(text)
  }
}

impl<'a> ImmutableByml<'a> {
  /// Writes the document as YAML straight from the view.
  pub fn to_text(&self, config: &YamlConfig) -> Result<String, BymlErr> {
    YamlEmitter::emit(config, self.root())
  }
}
