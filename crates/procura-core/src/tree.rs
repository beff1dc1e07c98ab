//! Generic attribute tree produced by decoding either XML dialect.
//!
//! A [`RawTree`] is transient: the normalizer walks known paths in it and
//! discards it. It still serializes to plain JSON (scalars as strings, nodes
//! as objects, lists as arrays) so the decoded document can be kept for
//! inspection.

use std::fmt;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Key under which element text is stored when the element also has attributes.
pub const TEXT_KEY: &str = "#text";

/// Prefix marking attribute keys.
pub const ATTR_PREFIX: char = '@';

#[derive(Debug, Clone, PartialEq)]
pub enum RawTree {
    Scalar(String),
    Node(Mapping),
    /// Repeated sibling elements sharing a name.
    List(Vec<RawTree>),
}

/// Insertion-ordered string-keyed mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapping {
    entries: Vec<(String, RawTree)>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. A replaced key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: RawTree) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Insert, turning a repeated key into a [`RawTree::List`].
    pub fn append(&mut self, key: impl Into<String>, value: RawTree) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, RawTree::List(items))) => items.push(value),
            Some((_, slot)) => {
                let first = std::mem::replace(slot, RawTree::List(Vec::with_capacity(2)));
                if let RawTree::List(items) = slot {
                    items.push(first);
                    items.push(value);
                }
            }
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&RawTree> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawTree)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, RawTree)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (K, RawTree)>>(iter: I) -> Self {
        let mut mapping = Mapping::new();
        for (k, v) in iter {
            mapping.insert(k, v);
        }
        mapping
    }
}

impl Default for RawTree {
    fn default() -> Self {
        Self::empty()
    }
}

impl RawTree {
    /// The empty document: what a missing or malformed file decodes to.
    pub fn empty() -> Self {
        RawTree::Node(Mapping::new())
    }

    pub fn scalar(value: impl Into<String>) -> Self {
        RawTree::Scalar(value.into())
    }

    /// True only for a node without entries.
    pub fn is_empty(&self) -> bool {
        matches!(self, RawTree::Node(m) if m.is_empty())
    }

    pub fn as_node(&self) -> Option<&Mapping> {
        match self {
            RawTree::Node(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            RawTree::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Child lookup on a node; `None` for scalars and lists.
    pub fn get(&self, key: &str) -> Option<&RawTree> {
        self.as_node()?.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Follow a chain of child keys.
    pub fn path(&self, keys: &[&str]) -> Option<&RawTree> {
        keys.iter().try_fold(self, |node, key| node.get(key))
    }

    /// Element text: the scalar itself, or the `#text` entry of a node.
    pub fn text(&self) -> Option<&str> {
        match self {
            RawTree::Scalar(s) => Some(s),
            RawTree::Node(m) => m.get(TEXT_KEY).and_then(RawTree::as_scalar),
            RawTree::List(_) => None,
        }
    }

    /// Attribute value stored under `@name`.
    pub fn attr(&self, name: &str) -> Option<&str> {
        let node = self.as_node()?;
        node.iter()
            .find(|(k, _)| k.strip_prefix(ATTR_PREFIX) == Some(name))
            .and_then(|(_, v)| v.as_scalar())
    }
}

/// Collapse the one-or-many ambiguity of repeated XML elements.
///
/// Absent values and empty scalars (empty elements) become an empty list, a
/// list yields its items, anything else is a list of one.
pub fn to_list(value: Option<&RawTree>) -> Vec<&RawTree> {
    match value {
        None => Vec::new(),
        Some(RawTree::List(items)) => items.iter().collect(),
        Some(RawTree::Scalar(s)) if s.trim().is_empty() => Vec::new(),
        Some(other) => vec![other],
    }
}

impl Serialize for RawTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RawTree::Scalar(s) => serializer.serialize_str(s),
            RawTree::Node(m) => m.serialize(serializer),
            RawTree::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

impl Serialize for Mapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct RawTreeVisitor;

impl<'de> Visitor<'de> for RawTreeVisitor {
    type Value = RawTree;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a string, an object, or an array")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<RawTree, E> {
        Ok(RawTree::scalar(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<RawTree, E> {
        Ok(RawTree::Scalar(v))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<RawTree, E> {
        Ok(RawTree::Scalar(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<RawTree, E> {
        Ok(RawTree::Scalar(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<RawTree, E> {
        Ok(RawTree::Scalar(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<RawTree, E> {
        Ok(RawTree::Scalar(v.to_string()))
    }

    fn visit_unit<E: de::Error>(self) -> Result<RawTree, E> {
        Ok(RawTree::Scalar(String::new()))
    }

    fn visit_none<E: de::Error>(self) -> Result<RawTree, E> {
        Ok(RawTree::Scalar(String::new()))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<RawTree, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(RawTree::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RawTree, A::Error> {
        let mut mapping = Mapping::new();
        while let Some((key, value)) = map.next_entry::<String, RawTree>()? {
            mapping.insert(key, value);
        }
        Ok(RawTree::Node(mapping))
    }
}

impl<'de> Deserialize<'de> for RawTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RawTreeVisitor)
    }
}
