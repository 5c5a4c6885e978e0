//! Treestore: a schema-described tree datastore over a document engine
//!
//! The tree data model (containers, keyed lists, leaves, with choice-typed
//! fields in the schema) is stored as nested documents, one collection per
//! schema module, in two stores: intended configuration and observed
//! operational state. All access goes through transactions; committed
//! writes can be observed through the change feed.
//!
//! The facade re-exports the member crates:
//! - `treestore-core`: paths, nodes, values, the schema model, errors
//! - `treestore-engine`: the embedded document engine
//! - `treestore-datastore`: mapping, compilation, codec, merge, transactions
//! - `treestore-feed`: change notification bridge and publisher

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use treestore_core::{
    Document, Module, Node, Path, Result, SchemaContext, SchemaNode, Step, StoreError, StoreType,
    Value,
};
pub use treestore_datastore::{ReadTransaction, ReadWriteTransaction, TreeStore, WriteTransaction};
pub use treestore_engine::DocumentEngine;
pub use treestore_feed::{
    ChangeFeedBridge, ChangeKind, FeedRegistration, TreeChange, TreeChangeListener,
    TreeChangePublisher,
};

/// Test fixtures shared with the integration tests
pub use treestore_datastore::testing;
