//! Embedded document engine
//!
//! An in-process document database exposing exactly the capability set the
//! datastore layer compiles against:
//! - aggregation pipelines with unwind/match/project stages
//! - update operations: field-set, field-unset, array-push, array-pull,
//!   with positional array filters and upsert
//! - client sessions with multi-statement start/commit/abort transactions
//! - per-collection change streams delivering the full resulting document
//!   for inserts and updates
//!
//! Documents live in two databases, one per [`StoreType`]; each database
//! holds named collections of documents.

pub mod apply;
pub mod changes;
pub mod collection;
pub mod engine;
pub mod pipeline;
pub mod session;
pub mod update;

pub use changes::{ChangeEvent, ChangeOperation, ChangeStream};
pub use engine::DocumentEngine;
pub use session::{ClientSession, SessionState};
pub use pipeline::Stage;
pub use update::{ArrayFilter, UpdateOp, UpdateOptions};

pub use treestore_core::StoreType;
