//! Shared test fixtures
//!
//! A small schema exercising every node kind: a top container with a keyed
//! list (holding a choice and a nested keyed list), a leaf-list, and a
//! second top-level container whose content is choice-selected.

use crate::store::TreeStore;
use treestore_core::{Module, Node, Path, SchemaContext, SchemaNode};
use treestore_engine::DocumentEngine;

/// Name of the fixture module
pub const MODULE_NAME: &str = "test-model";
/// Namespace of the fixture module
pub const NAMESPACE: &str = "urn:test:datastore:model";
/// Revision of the fixture module
pub const REVISION: &str = "2024-07-01";

/// Fixture schema context with a single module
pub fn schema() -> SchemaContext {
    let nested_list = SchemaNode::list(
        ["name"],
        [("name", SchemaNode::Leaf), ("type", SchemaNode::Leaf)],
    );
    let top_level_list = SchemaNode::list(
        ["name"],
        [
            ("name", SchemaNode::Leaf),
            (
                "choice-in-list",
                SchemaNode::choice([
                    ("simple", vec![("simple", SchemaNode::Leaf)]),
                    ("extended", vec![("extended-id", SchemaNode::Leaf)]),
                ]),
            ),
            ("nested-list", nested_list),
        ],
    );
    let top = SchemaNode::container([
        ("top-level-list", top_level_list),
        ("top-level-leaf-list", SchemaNode::LeafList),
    ]);
    let choice_container = SchemaNode::container([(
        "identifier",
        SchemaNode::choice([
            ("simple", vec![("simple-id", SchemaNode::Leaf)]),
            (
                "extended",
                vec![
                    ("extended-id", SchemaNode::Leaf),
                    ("extended-name", SchemaNode::Leaf),
                ],
            ),
        ]),
    )]);

    SchemaContext::new(vec![Module {
        name: MODULE_NAME.to_string(),
        namespace: NAMESPACE.to_string(),
        revision: Some(REVISION.to_string()),
        children: [
            ("top".to_string(), top),
            ("choice-container".to_string(), choice_container),
        ]
        .into_iter()
        .collect(),
    }])
}

/// Collection name of the fixture module
pub fn collection_name() -> String {
    format!("{}@{}", NAMESPACE, REVISION)
}

/// A datastore over a fresh in-memory engine and the fixture schema
pub fn store() -> TreeStore {
    TreeStore::new(DocumentEngine::new(), schema())
}

/// Path of the fixture's top container
pub fn top_path() -> Path {
    Path::top(MODULE_NAME, "top")
}

/// Path of one top-level list entry
pub fn entry_path(name: &str) -> Path {
    top_path().node("top-level-list").entry([("name", name)])
}

/// Path of one nested list entry under a top-level entry
pub fn nested_entry_path(name: &str, nested_name: &str) -> Path {
    entry_path(name).node("nested-list").entry([("name", nested_name)])
}

/// A minimal top-level list entry
pub fn list_entry(name: &str) -> Node {
    Node::container([("name", Node::leaf(name))])
}

/// A nested list entry with its type leaf
pub fn nested_entry(name: &str) -> Node {
    Node::container([
        ("name", Node::leaf(name)),
        ("type", Node::leaf("test-type")),
    ])
}

/// A populated top container: `outer` list entries each holding `nested`
/// nested entries, plus a two-element leaf-list
pub fn top_with_lists(outer: usize, nested: usize) -> Node {
    let entries = (0..outer).map(|i| {
        Node::container([
            ("name", Node::leaf(format!("test-{}", i))),
            (
                "nested-list",
                Node::list((0..nested).map(|j| nested_entry(&format!("nest-test-{}", j)))),
            ),
        ])
    });
    Node::container([
        ("top-level-list", Node::list(entries)),
        ("top-level-leaf-list", Node::leaf_list(["leaf-0", "leaf-1"])),
    ])
}
