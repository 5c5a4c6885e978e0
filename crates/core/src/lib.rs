//! Core types for the treestore datastore
//!
//! This crate defines the foundational types used throughout the system:
//! - Path: structured path addressing a node in the schema tree
//! - Node: structured tree value (leaves, containers, keyed lists)
//! - Value / Document: the document wire form stored by the engine
//! - SchemaContext / SchemaNode: the externally supplied schema model
//! - StoreType: the two logical stores (configuration, operational)
//! - StoreError: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod node;
pub mod path;
pub mod schema;
pub mod store_type;
pub mod value;

pub use error::{Result, StoreError};
pub use node::Node;
pub use path::{Path, Step};
pub use schema::{Module, SchemaContext, SchemaNode};
pub use store_type::StoreType;
pub use value::{Document, Value};
