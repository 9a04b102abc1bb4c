//! YAML emission for owned trees and views alike.
use crate::{
  immutable::{BymlView, NodeBudget},
  nodes::Byml,
  text::YamlConfig,
  BymlErr, BymlType,
};
use alloc::{format, string::String};
use base64::{engine::general_purpose::STANDARD, Engine};

/// A leaf value ready to be printed.
pub(crate) enum Scalar<'n> {
  String(&'n str),
  Binary(&'n [u8]),
  BinaryAligned(&'n [u8], u32),
  Bool(bool),
  Int(i32),
  Float(f32),
  UInt32(u32),
  Int64(i64),
  UInt64(u64),
  Double(f64),
  Null,
}

/// How a child is addressed by its parent.
pub(crate) enum ChildKey<'n> {
  Index,
  Key(&'n str),
  Hash32(u32),
  Hash64(u64),
}

type ChildFn<'f, 'n, N> = dyn FnMut(ChildKey<'n>, N) -> Result<(), BymlErr> + 'f;

/// Anything that can be printed as a YAML node.
pub(crate) trait TextNode<'n>: Sized {
  fn node_type(&self) -> BymlType;
  /// Bounds a walk starting at this node.
  fn budget(&self) -> NodeBudget;
  fn len(&self) -> Result<usize, BymlErr>;
  /// The leaf value; only called for non-containers.
  fn scalar(&self) -> Result<Scalar<'n>, BymlErr>;
  /// Visits children in write order.
  fn for_each_child(&self, f: &mut ChildFn<'_, 'n, Self>) -> Result<(), BymlErr>;
}

impl<'n> TextNode<'n> for &'n Byml {
  fn node_type(&self) -> BymlType {
    Byml::node_type(self)
  }

  fn budget(&self) -> NodeBudget {
    NodeBudget::unlimited()
  }

  fn len(&self) -> Result<usize, BymlErr> {
    Ok(Byml::len(self))
  }

  fn scalar(&self) -> Result<Scalar<'n>, BymlErr> {
    let node: &'n Byml = *self;
    Ok(match node {
      Byml::String(s) => Scalar::String(s),
      Byml::Binary(data) => Scalar::Binary(data),
      Byml::BinaryAligned { data, alignment } => {
        Scalar::BinaryAligned(data, *alignment)
      },
      Byml::Bool(value) => Scalar::Bool(*value),
      Byml::Int(value) => Scalar::Int(*value),
      Byml::Float(value) => Scalar::Float(*value),
      Byml::UInt32(value) => Scalar::UInt32(*value),
      Byml::Int64(value) => Scalar::Int64(*value),
      Byml::UInt64(value) => Scalar::UInt64(*value),
      Byml::Double(value) => Scalar::Double(*value),
      Byml::Null => Scalar::Null,
      other => {
        return Err(err!(debug, BymlErr::UnsupportedType(other.node_type())))
      },
    })
  }

  fn for_each_child(&self, f: &mut ChildFn<'_, 'n, Self>) -> Result<(), BymlErr> {
    let node: &'n Byml = *self;
    match node {
      Byml::HashMap32(map) => {
        for (hash, child) in map {
          f(ChildKey::Hash32(*hash), child)?;
        }
      },
      Byml::HashMap64(map) => {
        for (hash, child) in map {
          f(ChildKey::Hash64(*hash), child)?;
        }
      },
      Byml::Array(array) => {
        for child in array {
          f(ChildKey::Index, child)?;
        }
      },
      Byml::Map(map) => {
        for (key, child) in map {
          f(ChildKey::Key(key), child)?;
        }
      },
      _ => {},
    }
    Ok(())
  }
}

impl<'a> TextNode<'a> for BymlView<'a> {
  fn node_type(&self) -> BymlType {
    BymlView::node_type(self)
  }

  fn budget(&self) -> NodeBudget {
    self.walk_budget()
  }

  fn len(&self) -> Result<usize, BymlErr> {
    Ok(match BymlView::node_type(self) {
      BymlType::HashMap32 => self.get_hash_map32()?.len(),
      BymlType::HashMap64 => self.get_hash_map64()?.len(),
      BymlType::Array => self.get_array()?.len(),
      BymlType::Map => self.get_map()?.len(),
      _ => 0,
    })
  }

  fn scalar(&self) -> Result<Scalar<'a>, BymlErr> {
    Ok(match BymlView::node_type(self) {
      BymlType::String => Scalar::String(self.get_string()?),
      BymlType::Binary => Scalar::Binary(self.get_binary()?),
      BymlType::BinaryAligned => {
        let (data, alignment) = self.get_binary_aligned()?;
        Scalar::BinaryAligned(data, alignment)
      },
      BymlType::Bool => Scalar::Bool(self.get_bool()?),
      BymlType::Int => Scalar::Int(self.get_int()?),
      BymlType::Float => Scalar::Float(self.get_float()?),
      BymlType::UInt32 => Scalar::UInt32(self.get_u32()?),
      BymlType::Int64 => Scalar::Int64(self.get_i64()?),
      BymlType::UInt64 => Scalar::UInt64(self.get_u64()?),
      BymlType::Double => Scalar::Double(self.get_double()?),
      BymlType::Null => Scalar::Null,
      other => return Err(err!(debug, BymlErr::UnsupportedType(other))),
    })
  }

  fn for_each_child(&self, f: &mut ChildFn<'_, 'a, Self>) -> Result<(), BymlErr> {
    match BymlView::node_type(self) {
      BymlType::HashMap32 => {
        for (hash, child) in self.get_hash_map32()?.iter() {
          f(ChildKey::Hash32(hash), child)?;
        }
      },
      BymlType::HashMap64 => {
        for (hash, child) in self.get_hash_map64()?.iter() {
          f(ChildKey::Hash64(hash), child)?;
        }
      },
      BymlType::Array => {
        for child in self.get_array()?.iter() {
          f(ChildKey::Index, child)?;
        }
      },
      BymlType::Map => {
        for entry in self.get_map()?.iter() {
          let (key, child) = entry?;
          f(ChildKey::Key(key), child)?;
        }
      },
      _ => {},
    }
    Ok(())
  }
}

/// Writes one document as YAML.
pub(crate) struct YamlEmitter<'c> {
  out:    String,
  config: &'c YamlConfig,
  budget: NodeBudget,
}

impl<'c> YamlEmitter<'c> {
  pub(crate) fn emit<'n, N: TextNode<'n>>(
    config: &'c YamlConfig,
    root: N,
  ) -> Result<String, BymlErr> {
    let mut emitter = YamlEmitter {
      out: String::new(),
      config,
      budget: root.budget(),
    };
    if emitter.is_block(&root)? {
      if let Some(tag) = hash_tag(root.node_type()) {
        emitter.out.push_str(tag);
        emitter.out.push('\n');
      }
      emitter.block_body(&root, 0, 0)?;
    } else {
      emitter.inline(&root, 0)?;
      emitter.out.push('\n');
    }
    Ok(emitter.out)
  }

  /// Non-empty containers that are large or hold other containers are
  /// written in block style; everything else is written inline.
  fn is_block<'n, N: TextNode<'n>>(&self, node: &N) -> Result<bool, BymlErr> {
    if !node.node_type().is_container() {
      return Ok(false);
    }
    let len = node.len()?;
    if len == 0 {
      return Ok(false);
    }
    if len >= self.config.inline_container_max_count {
      return Ok(true);
    }
    let mut nested = false;
    node.for_each_child(&mut |_, child| {
      nested |= child.node_type().is_container();
      Ok(())
    })?;
    Ok(nested)
  }

  fn block_body<'n, N: TextNode<'n>>(
    &mut self,
    node: &N,
    indent: usize,
    depth: usize,
  ) -> Result<(), BymlErr> {
    self.budget.visit(depth)?;
    node.for_each_child(&mut |key, child| {
      for _ in 0..indent {
        self.out.push_str("  ");
      }
      match key {
        ChildKey::Index => self.out.push('-'),
        ChildKey::Key(key) => {
          let (key, explicit) = render_key(key);
          if explicit {
            self.out.push_str("? ");
            self.out.push_str(&key);
            self.out.push('\n');
            for _ in 0..indent {
              self.out.push_str("  ");
            }
          } else {
            self.out.push_str(&key);
          }
          self.out.push(':');
        },
        ChildKey::Hash32(hash) => self.out.push_str(&format!("0x{:08x}:", hash)),
        ChildKey::Hash64(hash) => self.out.push_str(&format!("0x{:016x}:", hash)),
      }
      self.block_value(&child, indent + 1, depth + 1)
    })
  }

  /// Writes the rest of a block entry line after its key or dash.
  fn block_value<'n, N: TextNode<'n>>(
    &mut self,
    node: &N,
    indent: usize,
    depth: usize,
  ) -> Result<(), BymlErr> {
    if self.is_block(node)? {
      if let Some(tag) = hash_tag(node.node_type()) {
        self.out.push(' ');
        self.out.push_str(tag);
      }
      self.out.push('\n');
      self.block_body(node, indent, depth)
    } else {
      self.out.push(' ');
      self.inline(node, depth)?;
      self.out.push('\n');
      Ok(())
    }
  }

  fn inline<'n, N: TextNode<'n>>(
    &mut self,
    node: &N,
    depth: usize,
  ) -> Result<(), BymlErr> {
    self.budget.visit(depth)?;
    let node_type = node.node_type();
    if !node_type.is_container() {
      let scalar = node.scalar()?;
      push_scalar(&mut self.out, &scalar);
      return Ok(());
    }

    if let Some(tag) = hash_tag(node_type) {
      self.out.push_str(tag);
      self.out.push(' ');
    }
    let (open, close) = match node_type {
      BymlType::Array => ('[', ']'),
      _ => ('{', '}'),
    };
    self.out.push(open);
    let mut first = true;
    node.for_each_child(&mut |key, child| {
      if !first {
        self.out.push_str(", ");
      }
      first = false;
      match key {
        ChildKey::Index => {},
        ChildKey::Key(key) => {
          let (key, explicit) = render_key(key);
          if explicit {
            self.out.push_str("? ");
          }
          self.out.push_str(&key);
          self.out.push_str(": ");
        },
        ChildKey::Hash32(hash) => {
          self.out.push_str(&format!("0x{:08x}: ", hash))
        },
        ChildKey::Hash64(hash) => {
          self.out.push_str(&format!("0x{:016x}: ", hash))
        },
      }
      self.inline(&child, depth + 1)
    })?;
    self.out.push(close);
    Ok(())
  }
}

fn hash_tag(node_type: BymlType) -> Option<&'static str> {
  match node_type {
    BymlType::HashMap32 => Some("!h32"),
    BymlType::HashMap64 => Some("!h64"),
    _ => None,
  }
}

fn push_scalar(out: &mut String, scalar: &Scalar) {
  match scalar {
    Scalar::String(s) => push_string(out, s),
    Scalar::Binary(data) => {
      out.push_str("!!binary ");
      push_base64(out, data);
    },
    Scalar::BinaryAligned(data, alignment) => {
      out.push_str(&format!("!!file {{Alignment: {}, Data: ", alignment));
      push_base64(out, data);
      out.push('}');
    },
    Scalar::Bool(value) => out.push_str(if *value { "true" } else { "false" }),
    Scalar::Int(value) => out.push_str(&format!("{}", value)),
    Scalar::Float(value) => push_float(out, *value as f64, format!("{:?}", value)),
    Scalar::UInt32(value) => out.push_str(&format!("!u 0x{:x}", value)),
    Scalar::Int64(value) => out.push_str(&format!("!l {}", value)),
    Scalar::UInt64(value) => out.push_str(&format!("!ul 0x{:x}", value)),
    Scalar::Double(value) => {
      out.push_str("!d ");
      push_float(out, *value, format!("{:?}", value));
    },
    Scalar::Null => out.push_str("null"),
  }
}

/// Base64 text is quoted unless it starts with a letter, since otherwise it
/// could read back as a number or be empty.
fn push_base64(out: &mut String, data: &[u8]) {
  let encoded = STANDARD.encode(data);
  let plain = encoded.starts_with(|c: char| c.is_ascii_alphabetic())
    && !RESERVED_WORDS
      .iter()
      .any(|word| word.eq_ignore_ascii_case(&encoded));
  if plain {
    out.push_str(&encoded);
  } else {
    out.push('\'');
    out.push_str(&encoded);
    out.push('\'');
  }
}

/// `finite` is the shortest round-tripping decimal form of `value`, which
/// always carries a `.` or an exponent.
fn push_float(out: &mut String, value: f64, finite: String) {
  if value.is_nan() {
    out.push_str(".nan");
  } else if value == f64::INFINITY {
    out.push_str(".inf");
  } else if value == f64::NEG_INFINITY {
    out.push_str("-.inf");
  } else {
    out.push_str(&finite);
  }
}

/// Words a YAML reader would resolve to a bool or null.
const RESERVED_WORDS: &[&str] =
  &["true", "false", "yes", "no", "on", "off", "y", "n", "null"];

fn is_plain_safe(s: &str) -> bool {
  let mut chars = s.chars();
  let Some(first) = chars.next() else {
    return false;
  };
  (first.is_ascii_alphabetic() || first == '_')
    && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/'))
    && !RESERVED_WORDS
      .iter()
      .any(|word| word.eq_ignore_ascii_case(s))
}

/// libyaml drops a key candidate once it runs past this many characters, so
/// longer keys need an explicit `?` indicator.
const MAX_IMPLICIT_KEY_LEN: usize = 1024;

/// The key as it is written, and whether it must be marked with `?`.
fn render_key(key: &str) -> (String, bool) {
  let mut text = String::new();
  push_string(&mut text, key);
  let explicit = text.chars().count() >= MAX_IMPLICIT_KEY_LEN;
  (text, explicit)
}

/// Characters YAML cannot carry literally inside a quoted scalar, either
/// because they are not printable or because they act as line breaks.
fn needs_escape(c: char) -> bool {
  c.is_control()
    || matches!(c, '\u{2028}' | '\u{2029}' | '\u{feff}' | '\u{fffe}' | '\u{ffff}')
}

/// Writes a string plain when it would read back as the same string, and
/// quoted otherwise.
pub(crate) fn push_string(out: &mut String, s: &str) {
  if is_plain_safe(s) {
    out.push_str(s);
  } else if s.chars().any(needs_escape) {
    out.push('"');
    for c in s.chars() {
      match c {
        '"' => out.push_str("\\\""),
        '\\' => out.push_str("\\\\"),
        '\n' => out.push_str("\\n"),
        '\t' => out.push_str("\\t"),
        '\r' => out.push_str("\\r"),
        '\0' => out.push_str("\\0"),
        c if needs_escape(c) => out.push_str(&format!("\\u{:04x}", c as u32)),
        c => out.push(c),
      }
    }
    out.push('"');
  } else {
    out.push('\'');
    out.push_str(&s.replace('\'', "''"));
    out.push('\'');
  }
}
