//! Immutable payload nodes of a device data tree

use crate::Path;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Leaf values carried by the data tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    Empty,
    Boolean(bool),
    Integer(i64),
    String(String),
    Bytes(Vec<u8>),
}

impl Value {
    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Empty => "empty",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => write!(f, "[empty]"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value.into())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

/// A node of the device data tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalizedNode {
    /// Single value
    Leaf(Value),
    /// Ordered set of values
    LeafList(Vec<Value>),
    /// Named children
    Container(BTreeMap<String, NormalizedNode>),
}

impl NormalizedNode {
    pub fn leaf(value: impl Into<Value>) -> Self {
        NormalizedNode::Leaf(value.into())
    }

    pub fn container<I, K>(children: I) -> Self
    where
        I: IntoIterator<Item = (K, NormalizedNode)>,
        K: Into<String>,
    {
        NormalizedNode::Container(children.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn as_leaf(&self) -> Option<&Value> {
        match self {
            NormalizedNode::Leaf(value) => Some(value),
            _ => None,
        }
    }

    pub fn child(&self, name: &str) -> Option<&NormalizedNode> {
        match self {
            NormalizedNode::Container(children) => children.get(name),
            _ => None,
        }
    }

    /// Merge `other` into this node
    ///
    /// Containers merge child by child; any other combination is replaced
    /// by `other`.
    pub fn merge(self, other: NormalizedNode) -> NormalizedNode {
        match (self, other) {
            (NormalizedNode::Container(mut mine), NormalizedNode::Container(theirs)) => {
                for (name, node) in theirs {
                    let merged = match mine.remove(&name) {
                        Some(existing) => existing.merge(node),
                        None => node,
                    };
                    mine.insert(name, merged);
                }
                NormalizedNode::Container(mine)
            }
            (_, other) => other,
        }
    }
}

/// A payload node paired with the path it is written at or read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatedNode {
    pub path: Path,
    pub node: NormalizedNode,
}

impl LocatedNode {
    pub fn new(path: Path, node: NormalizedNode) -> Self {
        Self { path, node }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_containers() {
        let base = NormalizedNode::container([
            ("mtu", NormalizedNode::leaf(1500)),
            ("name", NormalizedNode::leaf("eth0")),
        ]);
        let update = NormalizedNode::container([
            ("mtu", NormalizedNode::leaf(9000)),
            ("enabled", NormalizedNode::leaf(true)),
        ]);

        let merged = base.merge(update);
        assert_eq!(merged.child("mtu"), Some(&NormalizedNode::leaf(9000)));
        assert_eq!(merged.child("name"), Some(&NormalizedNode::leaf("eth0")));
        assert_eq!(merged.child("enabled"), Some(&NormalizedNode::leaf(true)));
    }

    #[test]
    fn test_merge_leaf_replaces() {
        let merged = NormalizedNode::leaf(1).merge(NormalizedNode::leaf(2));
        assert_eq!(merged, NormalizedNode::leaf(2));
    }

    #[test]
    fn test_serde_shape() {
        let node = LocatedNode::new("/a/b".parse().unwrap(), NormalizedNode::leaf(1));
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["path"], serde_json::json!(["a", "b"]));
    }
}
