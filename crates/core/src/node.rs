//! Structured tree values
//!
//! A `Node` is the recursively defined value addressed by a `Path`: a scalar
//! leaf, a leaf-list of scalars, a container of named children, or a keyed
//! list. List entries are containers; they are logically identified by the
//! key fields the schema declares for the list, not by position.

use crate::value::Value;
use std::collections::BTreeMap;

/// A structured tree value
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A scalar leaf value
    Leaf(Value),
    /// An ordered collection of scalar values
    LeafList(Vec<Value>),
    /// A container of named children
    Container(BTreeMap<String, Node>),
    /// A keyed list; every entry is a container
    List(Vec<Node>),
}

impl Node {
    /// Build a leaf from any value convertible into [`Value`]
    pub fn leaf(value: impl Into<Value>) -> Self {
        Node::Leaf(value.into())
    }

    /// Build a leaf-list from scalar values
    pub fn leaf_list<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Node::LeafList(values.into_iter().map(Into::into).collect())
    }

    /// Build a container from named children
    pub fn container<I, S>(children: I) -> Self
    where
        I: IntoIterator<Item = (S, Node)>,
        S: Into<String>,
    {
        Node::Container(children.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a list from entries; callers are expected to pass containers
    pub fn list<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = Node>,
    {
        Node::List(entries.into_iter().collect())
    }

    /// Get the container children if this is a container
    pub fn as_container(&self) -> Option<&BTreeMap<String, Node>> {
        match self {
            Node::Container(children) => Some(children),
            _ => None,
        }
    }

    /// Get the entries if this is a list
    pub fn as_list(&self) -> Option<&[Node]> {
        match self {
            Node::List(entries) => Some(entries),
            _ => None,
        }
    }

    /// Get the leaf value if this is a leaf
    pub fn as_leaf(&self) -> Option<&Value> {
        match self {
            Node::Leaf(value) => Some(value),
            _ => None,
        }
    }

    /// Look up a child by name if this is a container
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.as_container().and_then(|c| c.get(name))
    }

    /// The kind of this node, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Leaf(_) => "leaf",
            Node::LeafList(_) => "leaf-list",
            Node::Container(_) => "container",
            Node::List(_) => "list",
        }
    }
}
