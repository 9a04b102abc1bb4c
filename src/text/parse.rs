//! YAML parsing into owned trees, by way of [`serde_yaml::Value`].
use crate::{
  nodes::{Byml, BymlHashMap32, BymlHashMap64, BymlMap},
  text::TextErr,
};
use alloc::{
  string::{String, ToString},
  vec::Vec,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_yaml::{value::TaggedValue, Mapping, Number, Value};

/// Redefines the `!!` handle as a local prefix, so that `!!binary` and
/// `!!file` keep their tags through [`serde_yaml`], which only reports local
/// tags.
const SECONDARY_HANDLE: &str = "%TAG !! !\n";

pub(crate) fn parse_document(text: &str) -> Result<Byml, TextErr> {
  let text = text.trim_start_matches('\u{feff}');
  let value: Value = match with_local_handle(text) {
    Some(text) => serde_yaml::from_str(&text)?,
    None => serde_yaml::from_str(text)?,
  };
  parse_value(&value)
}

/// Prefixes `text` with [`SECONDARY_HANDLE`].  Documents that carry their own
/// directives are left alone.
fn with_local_handle(text: &str) -> Option<String> {
  let first_line = text
    .lines()
    .map(str::trim_end)
    .find(|line| !line.is_empty() && !line.starts_with('#'));
  let has_marker = match first_line {
    Some(line) if line.starts_with('%') => return None,
    Some(line) => {
      line == "---" || line.starts_with("--- ") || line.starts_with("---\t")
    },
    None => false,
  };
  let mut prefixed = String::with_capacity(text.len() + 16);
  prefixed.push_str(SECONDARY_HANDLE);
  if !has_marker {
    prefixed.push_str("---\n");
  }
  prefixed.push_str(text);
  Some(prefixed)
}

fn parse_value(value: &Value) -> Result<Byml, TextErr> {
  Ok(match value {
    Value::Null => Byml::Null,
    Value::Bool(value) => Byml::Bool(*value),
    Value::Number(number) => parse_number(number)?,
    Value::String(s) => Byml::String(s.clone()),
    Value::Sequence(sequence) => Byml::Array(
      sequence
        .iter()
        .map(parse_value)
        .collect::<Result<Vec<_>, _>>()?,
    ),
    Value::Mapping(mapping) => {
      let mut map = BymlMap::new();
      for (key, value) in mapping {
        map.insert(map_key(key)?, parse_value(value)?);
      }
      Byml::Map(map)
    },
    Value::Tagged(tagged) => parse_tagged(tagged)?,
  })
}

/// Untagged integers take the narrowest type that holds them, preferring
/// signed: Int32, then UInt32, then Int64, then UInt64.
fn parse_number(number: &Number) -> Result<Byml, TextErr> {
  if let Some(value) = number.as_i64() {
    return Ok(if let Ok(value) = i32::try_from(value) {
      Byml::Int(value)
    } else if let Ok(value) = u32::try_from(value) {
      Byml::UInt32(value)
    } else {
      Byml::Int64(value)
    });
  }
  if let Some(value) = number.as_u64() {
    return Ok(Byml::UInt64(value));
  }
  match number.as_f64() {
    Some(value) => Ok(Byml::Float(value as f32)),
    None => Err(TextErr::InvalidValue(number.to_string())),
  }
}

fn map_key(key: &Value) -> Result<String, TextErr> {
  match key {
    Value::String(s) => Ok(s.clone()),
    Value::Number(number) => Ok(number.to_string()),
    Value::Bool(value) => Ok(value.to_string()),
    Value::Null => Ok(String::from("null")),
    other => Err(TextErr::InvalidKey(describe(other))),
  }
}

fn describe(value: &Value) -> String {
  serde_yaml::to_string(value)
    .map(|text| text.trim_end().to_string())
    .unwrap_or_else(|_| String::from("?"))
}

/// The tag name without its `!` or `tag:yaml.org,2002:` prefix.
fn tag_name(tagged: &TaggedValue) -> String {
  let tag = tagged.tag.to_string();
  let tag = tag.trim_start_matches('!');
  tag.strip_prefix("tag:yaml.org,2002:").unwrap_or(tag).to_string()
}

fn parse_tagged(tagged: &TaggedValue) -> Result<Byml, TextErr> {
  let name = tag_name(tagged);
  let value = &tagged.value;
  let invalid = || TextErr::InvalidValue(describe(value));
  Ok(match name.as_str() {
    "s" | "s32" => {
      Byml::Int(i32::try_from(signed_arg(value)?).map_err(|_| invalid())?)
    },
    "u" | "u32" => {
      Byml::UInt32(u32::try_from(unsigned_arg(value)?).map_err(|_| invalid())?)
    },
    "l" | "s64" => Byml::Int64(signed_arg(value)?),
    "ul" | "u64" => Byml::UInt64(unsigned_arg(value)?),
    "f" | "f32" => Byml::Float(float_arg(value)? as f32),
    "d" | "f64" => Byml::Double(float_arg(value)?),
    "str" => Byml::String(scalar_text(value).ok_or_else(invalid)?),
    "int" | "float" | "bool" | "null" | "map" | "seq" => parse_value(value)?,
    "binary" => Byml::Binary(base64_arg(value)?),
    "file" => {
      let Value::Mapping(mapping) = value else {
        return Err(invalid());
      };
      let alignment = field(mapping, "Alignment").ok_or_else(invalid)?;
      let data = field(mapping, "Data").ok_or_else(invalid)?;
      Byml::BinaryAligned {
        data:      base64_arg(data)?,
        alignment: u32::try_from(unsigned_arg(alignment)?)
          .map_err(|_| invalid())?,
      }
    },
    "h32" => {
      let mut map = BymlHashMap32::new();
      for (key, child) in hash_entries(value)? {
        let hash = u32::try_from(unsigned_arg(key)?)
          .map_err(|_| TextErr::InvalidKey(describe(key)))?;
        map.insert(hash, parse_value(child)?);
      }
      Byml::HashMap32(map)
    },
    "h64" => {
      let mut map = BymlHashMap64::new();
      for (key, child) in hash_entries(value)? {
        map.insert(unsigned_arg(key)?, parse_value(child)?);
      }
      Byml::HashMap64(map)
    },
    _ => return Err(TextErr::UnknownTag(name)),
  })
}

fn scalar_text(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Number(number) => Some(number.to_string()),
    Value::Bool(value) => Some(value.to_string()),
    Value::Null => Some(String::from("null")),
    _ => None,
  }
}

fn field<'v>(mapping: &'v Mapping, name: &str) -> Option<&'v Value> {
  mapping.iter().find_map(|(key, value)| match key {
    Value::String(key) if key == name => Some(value),
    _ => None,
  })
}

/// Entries of a hash map; a bare tag with no content is an empty map.
fn hash_entries(value: &Value) -> Result<Vec<(&Value, &Value)>, TextErr> {
  match value {
    Value::Mapping(mapping) => Ok(mapping.iter().collect()),
    Value::Null => Ok(Vec::new()),
    other => Err(TextErr::InvalidValue(describe(other))),
  }
}

/// Integer text, in decimal or `0x` hexadecimal.
fn parse_integer_text<T>(text: &str) -> Option<T>
where
  T: TryFrom<i128>,
{
  let text = text.trim();
  let (negative, digits) = match text.strip_prefix('-') {
    Some(rest) => (true, rest),
    None => (false, text.strip_prefix('+').unwrap_or(text)),
  };
  let magnitude = match digits
    .strip_prefix("0x")
    .or_else(|| digits.strip_prefix("0X"))
  {
    Some(hex) => i128::from_str_radix(hex, 16).ok()?,
    None => digits.parse::<i128>().ok()?,
  };
  T::try_from(if negative { -magnitude } else { magnitude }).ok()
}

fn signed_arg(value: &Value) -> Result<i64, TextErr> {
  let parsed = match value {
    Value::Number(number) => number.as_i64(),
    Value::String(text) => parse_integer_text(text),
    _ => None,
  };
  parsed.ok_or_else(|| TextErr::InvalidValue(describe(value)))
}

fn unsigned_arg(value: &Value) -> Result<u64, TextErr> {
  let parsed = match value {
    Value::Number(number) => number.as_u64(),
    Value::String(text) => parse_integer_text(text),
    _ => None,
  };
  parsed.ok_or_else(|| TextErr::InvalidValue(describe(value)))
}

fn float_arg(value: &Value) -> Result<f64, TextErr> {
  let parsed = match value {
    Value::Number(number) => number.as_f64(),
    Value::String(text) => match text.trim() {
      ".nan" | ".NaN" | ".NAN" => Some(f64::NAN),
      ".inf" | ".Inf" | ".INF" | "+.inf" => Some(f64::INFINITY),
      "-.inf" | "-.Inf" | "-.INF" => Some(f64::NEG_INFINITY),
      other => other.parse().ok(),
    },
    _ => None,
  };
  parsed.ok_or_else(|| TextErr::InvalidValue(describe(value)))
}

fn base64_arg(value: &Value) -> Result<Vec<u8>, TextErr> {
  match value {
    Value::String(text) => {
      let compact = text.split_whitespace().collect::<String>();
      Ok(STANDARD.decode(compact)?)
    },
    Value::Null => Ok(Vec::new()),
    other => Err(TextErr::InvalidValue(describe(other))),
  }
}
