//! Change feed: data change notifications for the tree datastore
//!
//! Committed writes surface to registered listeners as decoded top-level
//! subtrees. Delivery is per schema module: the bridge holds one engine
//! change stream per (store, collection) with at least one listener, and a
//! publisher fans decoded changes out by path ancestry.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bridge;
pub mod publisher;

pub use bridge::{ChangeFeedBridge, FeedRegistration};
pub use publisher::{
    ChangeKind, ListenerRegistration, TreeChange, TreeChangeListener, TreeChangePublisher,
};
