//! Schema-described tree datastore over a document engine
//!
//! This crate is the translation layer: it maps structured paths onto the
//! nested-document layout of the backing engine and compiles reads, puts,
//! merges, and deletes into pipelines and update operations. Data of every
//! schema module lives in its own collection, in two databases (intended
//! configuration and observed operational state).
//!
//! Consumers interact through [`TreeStore`] and its transaction handles;
//! the mapper, compilers, codec, and merge engine underneath are public for
//! reuse by the change feed.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod compile;
pub mod mapper;
pub mod merge;
pub mod store;
pub mod testing;
pub mod transaction;

pub use store::TreeStore;
pub use transaction::{ReadTransaction, ReadWriteTransaction, WriteTransaction};

pub use treestore_core::{Node, Path, StoreType};
